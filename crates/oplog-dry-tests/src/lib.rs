// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Test doubles for the collaborators the bridge talks to.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake
//! - [`engine`] - Shared-store log engine with real record shapes
//! - [`space`] - Remote space acting as store and gateway, with scripted failures
//! - [`fixtures`] - Linear and branching logs, space mirroring
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod fixtures;
pub mod space;

pub use config::InMemoryConfigStore;
pub use engine::{MemoryLog, MemoryLogEngine, TestSigner, DEFAULT_SCHEME};
pub use fixtures::{branching_log, linear_log, mirror_into_space, Branching, FIXTURE_SIGNER};
pub use space::MemorySpace;
