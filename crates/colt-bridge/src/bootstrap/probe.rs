//! Reachability probes.

use std::sync::Arc;

use colt_config::{Config, ProbeMode};
use reqwest::blocking::Client;
use tracing::debug;

use super::BOOTSTRAP_TARGET;
use crate::rpc::{RpcError, RpcTransport, build_client};

/// Decides whether the remote tool is currently answering.
pub trait Probe {
    /// Performs one blocking probe bounded by the transport timeout.
    fn is_reachable(&self) -> bool;
}

/// Issues the `ping` method; any answer other than a connection failure
/// counts, including a fault.
pub struct PingProbe {
    transport: Arc<dyn RpcTransport>,
}

impl PingProbe {
    /// Probes through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }
}

impl Probe for PingProbe {
    fn is_reachable(&self) -> bool {
        match self.transport.invoke("ping", &[]) {
            Ok(_) => true,
            Err(error) if error.is_unreachable() => {
                debug!(target: BOOTSTRAP_TARGET, %error, "ping probe failed");
                false
            }
            Err(error) => {
                debug!(target: BOOTSTRAP_TARGET, %error, "ping answered with an error");
                true
            }
        }
    }
}

/// Fetches the unauthenticated sentinel document over plain HTTP.
pub struct SentinelProbe {
    client: Client,
    url: String,
}

impl SentinelProbe {
    /// Builds a probe for the sentinel endpoint in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, RpcError> {
        let endpoint = config.sentinel_endpoint();
        Ok(Self {
            client: build_client(config, &endpoint)?,
            url: endpoint.to_string(),
        })
    }
}

impl Probe for SentinelProbe {
    fn is_reachable(&self) -> bool {
        match self.client.get(self.url.as_str()).send() {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                debug!(target: BOOTSTRAP_TARGET, %error, url = %self.url, "sentinel probe failed");
                false
            }
        }
    }
}

/// Builds the probe selected by `config.probe_mode`.
///
/// # Errors
///
/// Returns [`RpcError::Transport`] when the sentinel client cannot be built.
pub fn probe_for(
    config: &Config,
    transport: Arc<dyn RpcTransport>,
) -> Result<Box<dyn Probe>, RpcError> {
    Ok(match config.probe_mode {
        ProbeMode::Ping => Box::new(PingProbe::new(transport)),
        ProbeMode::Sentinel => Box::new(SentinelProbe::from_config(config)?),
    })
}
