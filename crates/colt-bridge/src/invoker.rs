//! Non-blocking RPC calls gated on a bootstrap sequence.

use serde_json::Value;
use tracing::debug;

use crate::bridge::Bridge;
use crate::event_loop::LoopClosed;
use crate::rpc::RpcError;

const INVOKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::invoker");

impl Bridge {
    /// Queues `method` behind a bootstrap sequence and returns immediately.
    ///
    /// Even the first probe happens on a later turn of the loop. `callback`
    /// receives the call's outcome exactly once, unless bootstrapping fails,
    /// in which case the failure goes to the output sink instead.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] when the owning loop has been dropped.
    pub fn invoke_async<F>(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
        callback: F,
    ) -> Result<(), LoopClosed>
    where
        F: FnOnce(&mut Self, Result<Value, RpcError>) + Send + 'static,
    {
        self.handle().invoke_async(method, params, callback)
    }

    pub(crate) fn invoke_when_reachable<F>(
        &mut self,
        method: String,
        params: Vec<Value>,
        callback: F,
    ) where
        F: FnOnce(&mut Self, Result<Value, RpcError>) + 'static,
    {
        self.bootstrap(
            (method, params, callback),
            |bridge, (name, args, deliver)| {
                let outcome = bridge.call(&name, &args);
                debug!(target: INVOKER_TARGET, method = %name, ok = outcome.is_ok(), "call completed");
                deliver(bridge, outcome);
            },
        );
    }

    /// Performs a blocking call on the loop thread.
    ///
    /// # Errors
    ///
    /// Propagates the transport's [`RpcError`].
    pub fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        self.transport.invoke(method, params)
    }
}
