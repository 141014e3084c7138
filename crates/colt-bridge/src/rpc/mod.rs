//! Request/response exchange with the remote tool over HTTP.
//!
//! Each call POSTs a `{id, method, params}` JSON envelope to the configured
//! endpoint and interprets the `{result, error}` reply. The transport never
//! retries; reachability policy lives in the bootstrapper.

mod envelope;
mod error;

use std::sync::atomic::{AtomicU64, Ordering};

use colt_config::{Config, HttpEndpoint};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

pub use error::{RpcError, RpcFault};

pub(crate) use envelope::decode_response;
use envelope::RpcRequest;

const RPC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::rpc");

/// A synchronous call into the remote tool.
pub trait RpcTransport: Send + Sync {
    /// Invokes `method` with positional `params` and returns the opaque result.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Fault`] when the remote tool reports an error and
    /// the other variants when the exchange itself fails.
    fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, RpcError>;
}

/// JSON-over-HTTP transport backed by a blocking `reqwest` client.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Builds a transport for the RPC endpoint and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, RpcError> {
        let endpoint = config.rpc_endpoint();
        let client = build_client(config, &endpoint)?;
        Ok(Self::with_client(client, &endpoint))
    }

    /// Builds a transport for `endpoint` using an existing client.
    #[must_use]
    pub fn with_client(client: Client, endpoint: &HttpEndpoint) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Endpoint every request is POSTed to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RpcTransport for HttpTransport {
    fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest { id, method, params };
        let body = serde_json::to_vec(&request).map_err(|source| RpcError::Encode {
            method: method.to_owned(),
            source,
        })?;
        debug!(target: RPC_TARGET, id, method, endpoint = %self.endpoint, "sending request");

        let transport_error = |source: reqwest::Error| RpcError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        };
        let response = self
            .client
            .post(self.endpoint.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(&transport_error)?;
        let status = response.status();
        let text = response.text().map_err(&transport_error)?;

        match decode_response(method, &text) {
            Err(RpcError::Decode { .. }) if !status.is_success() => Err(RpcError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            }),
            outcome => {
                debug!(target: RPC_TARGET, id, method, ok = outcome.is_ok(), "response received");
                outcome
            }
        }
    }
}

/// Builds the blocking HTTP client shared by the transport and probes.
///
/// # Errors
///
/// Returns [`RpcError::Transport`] when the client cannot be built.
pub(crate) fn build_client(config: &Config, endpoint: &HttpEndpoint) -> Result<Client, RpcError> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|source| RpcError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })
}
