//! Error types for remote procedure calls.

use std::fmt;

use thiserror::Error;

/// A fault reported by the remote tool in the `error` member of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFault {
    /// Fully qualified exception type, when the remote tool supplied one.
    pub type_name: Option<String>,
    /// Human-readable message; empty when the remote tool sent none.
    pub message: String,
}

impl RpcFault {
    /// Builds a fault carrying an exception type name.
    #[must_use]
    pub fn typed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            message: message.into(),
        }
    }

    /// Builds a fault with only a message.
    #[must_use]
    pub fn untyped(message: impl Into<String>) -> Self {
        Self {
            type_name: None,
            message: message.into(),
        }
    }

    /// Returns true when the fault's type name equals `type_name`.
    #[must_use]
    pub fn is_type(&self, type_name: &str) -> bool {
        self.type_name.as_deref() == Some(type_name)
    }
}

impl fmt::Display for RpcFault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(formatter, "[{type_name}] {}", self.message),
            None => formatter.write_str(&self.message),
        }
    }
}

impl std::error::Error for RpcFault {}

/// Errors raised while exchanging a request with the remote tool.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a response: refused, reset or timed out.
    #[error("failed to reach {endpoint}: {source}")]
    Transport {
        /// Endpoint the request was sent to.
        endpoint: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The remote tool answered with a non-success status and no JSON body.
    #[error("{endpoint} answered with HTTP status {status}")]
    Status {
        /// Endpoint the request was sent to.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not a JSON response envelope.
    #[error("failed to decode response from '{method}': {source}")]
    Decode {
        /// Method whose response failed to decode.
        method: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The request body could not be serialised.
    #[error("failed to encode request for '{method}': {source}")]
    Encode {
        /// Method being invoked.
        method: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The remote tool reported a fault.
    #[error(transparent)]
    Fault(RpcFault),
}

impl RpcError {
    /// Returns true when the remote tool could not be contacted at all.
    ///
    /// Only this class of failure means "not yet reachable" to the
    /// bootstrapper; a fault proves the remote tool is listening.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns the remote fault, if this error carries one.
    #[must_use]
    pub const fn fault(&self) -> Option<&RpcFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}
