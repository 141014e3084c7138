//! JSON request and response envelopes spoken by the remote tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RpcError, RpcFault};

/// Body POSTed for each call.
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub(crate) id: u64,
    pub(crate) method: &'a str,
    pub(crate) params: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Interprets a response body.
///
/// A present, non-null `error` wins over `result`. A response carrying
/// neither (or a `null` result) yields JSON `null`.
pub(crate) fn decode_response(method: &str, body: &str) -> Result<Value, RpcError> {
    let response: RpcResponse =
        serde_json::from_str(body).map_err(|source| RpcError::Decode {
            method: method.to_owned(),
            source,
        })?;
    if let Some(error) = response.error {
        return Err(RpcError::Fault(fault_from_value(error)));
    }
    Ok(response.result.unwrap_or(Value::Null))
}

fn fault_from_value(error: Value) -> RpcFault {
    match error {
        Value::Object(object) => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let type_name = object
                .get("data")
                .and_then(|data| data.get("exceptionTypeName"))
                .and_then(Value::as_str)
                .map(str::to_owned);
            RpcFault { type_name, message }
        }
        Value::String(message) => RpcFault::untyped(message),
        other => RpcFault::untyped(other.to_string()),
    }
}
