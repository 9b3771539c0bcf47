// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP gateway fetcher with ordered fallback.

use std::time::Duration;

use async_trait::async_trait;
use oplog_app_core::{BridgeSettings, ConfigError};
use oplog_cid::{remote_cid_of, RemoteCid};
use tracing::{debug, warn};

use crate::remote::{BlockFetcher, RemoteError};

/// Largest block body accepted from a gateway unless overridden.
pub const DEFAULT_MAX_BLOCK_BYTES: usize = 4 * 1024 * 1024;

/// Fetches blocks from `{gateway}/{cid}`, trying each gateway in order.
///
/// Each attempt is bounded by its own timeout; there is no overall deadline.
/// A response whose bytes do not hash to the requested CID counts as a
/// failed attempt, and so does a body larger than the block size cap.
#[derive(Clone, Debug)]
pub struct GatewayFetcher {
    client: reqwest::Client,
    gateways: Vec<String>,
    attempt_timeout: Duration,
    max_block_bytes: usize,
}

impl GatewayFetcher {
    /// Fetcher over `gateways` with a per-attempt timeout.
    pub fn new(gateways: Vec<String>, attempt_timeout: Duration) -> Result<Self, RemoteError> {
        if gateways.is_empty() {
            return Err(RemoteError::Rejected("no gateways configured".into()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            gateways,
            attempt_timeout,
            max_block_bytes: DEFAULT_MAX_BLOCK_BYTES,
        })
    }

    /// Replace the block size cap.
    #[must_use]
    pub const fn with_max_block_bytes(mut self, max_block_bytes: usize) -> Self {
        self.max_block_bytes = max_block_bytes;
        self
    }

    /// Fetcher configured from bridge settings.
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Self::new(
            settings.gateways.clone(),
            Duration::from_millis(settings.gateway_timeout_ms),
        )
        .map_err(|err| ConfigError::Other(err.to_string()))
    }

    /// Gateways in attempt order.
    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// URL of `cid` on `gateway`.
    pub fn url_for(gateway: &str, cid: &RemoteCid) -> String {
        format!("{}/{cid}", gateway.trim_end_matches('/'))
    }

    async fn attempt(&self, gateway: &str, cid: &RemoteCid) -> Result<Vec<u8>, String> {
        let url = Self::url_for(gateway, cid);
        let request = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| err.to_string())?;
            let status = response.status();
            if !status.is_success() {
                return Err(format!("HTTP {status}"));
            }
            self.read_capped(response).await
        };
        let bytes = tokio::time::timeout(self.attempt_timeout, request)
            .await
            .map_err(|_| format!("timed out after {:?}", self.attempt_timeout))??;
        let computed = remote_cid_of(&bytes).map_err(|err| err.to_string())?;
        if computed != *cid {
            return Err(format!("content hashes to {computed}"));
        }
        Ok(bytes)
    }
}

impl GatewayFetcher {
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, String> {
        let cap = self.max_block_bytes;
        let too_large = || format!("body exceeds {cap} bytes");
        if let Some(length) = response.content_length() {
            if length > u64::try_from(cap).unwrap_or(u64::MAX) {
                return Err(too_large());
            }
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| err.to_string())? {
            if body.len() + chunk.len() > cap {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl BlockFetcher for GatewayFetcher {
    async fn fetch(&self, cid: &RemoteCid) -> Result<Vec<u8>, RemoteError> {
        let mut last = String::new();
        for gateway in &self.gateways {
            debug!(%cid, gateway = %gateway, "gateway attempt");
            match self.attempt(gateway, cid).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    warn!(%cid, gateway = %gateway, error = %err, "gateway attempt failed");
                    last = err;
                }
            }
        }
        Err(RemoteError::BlockUnavailable {
            cid: *cid,
            attempts: self.gateways.len(),
            last,
        })
    }
}
