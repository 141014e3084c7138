//! Single-consumer task queue and timer wheel driving the bridge.
//!
//! Every piece of work that touches the [`Bridge`] runs on the thread that
//! owns the [`EventLoop`]: tasks posted through a [`LoopHandle`] from any
//! thread, and timers scheduled by the bridge itself. Nothing else mutates
//! bridge state, so the output sink and project model need no locking.

mod timers;

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::bridge::Bridge;
use crate::rpc::RpcError;

pub use timers::TimerId;
pub(crate) use timers::TimerQueue;

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::event_loop");

/// Work posted to the loop from any thread.
pub type Task = Box<dyn FnOnce(&mut Bridge) + Send + 'static>;

/// Work scheduled from the loop thread itself.
pub(crate) type LocalTask = Box<dyn FnOnce(&mut Bridge) + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

/// Raised when posting to a loop that no longer exists.
#[derive(Debug, Error)]
#[error("the bridge event loop has shut down")]
pub struct LoopClosed;

/// Cloneable, thread-safe handle for posting work to an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    sender: Sender<Message>,
}

impl LoopHandle {
    /// Queues `task` to run on the loop thread.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] when the loop has been dropped.
    pub fn post<F>(&self, task: F) -> Result<(), LoopClosed>
    where
        F: FnOnce(&mut Bridge) + Send + 'static,
    {
        self.sender
            .send(Message::Run(Box::new(task)))
            .map_err(|_| LoopClosed)
    }

    /// Asks the loop to return from [`EventLoop::run`].
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] when the loop has been dropped.
    pub fn shutdown(&self) -> Result<(), LoopClosed> {
        self.sender.send(Message::Shutdown).map_err(|_| LoopClosed)
    }

    /// Calls `method` once the remote tool is reachable, without blocking.
    ///
    /// `callback` runs on the loop thread with the call's outcome. It is
    /// never invoked when bootstrapping times out or the launch fails.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] when the loop has been dropped.
    pub fn invoke_async<F>(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
        callback: F,
    ) -> Result<(), LoopClosed>
    where
        F: FnOnce(&mut Bridge, Result<Value, RpcError>) + Send + 'static,
    {
        let method = method.into();
        self.post(move |bridge| bridge.invoke_when_reachable(method, params, callback))
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Owns the [`Bridge`] and drains its task and timer queues.
pub struct EventLoop {
    bridge: Bridge,
    receiver: Receiver<Message>,
    /// Shutdown taken off the queue by `run_pending`, held for the next turn.
    stopped: bool,
}

impl EventLoop {
    pub(crate) fn assemble(build: impl FnOnce(LoopHandle) -> Bridge) -> Self {
        let (sender, receiver) = unbounded();
        let bridge = build(LoopHandle { sender });
        Self {
            bridge,
            receiver,
            stopped: false,
        }
    }

    /// Returns a handle for posting work from other threads.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.bridge.handle().clone()
    }

    /// Shared access to the bridge between turns.
    #[must_use]
    pub const fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Exclusive access to the bridge between turns.
    pub const fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    /// Runs until a shutdown message arrives.
    pub fn run(&mut self) {
        debug!(target: LOOP_TARGET, "event loop started");
        while let Flow::Continue = self.turn(None) {}
        debug!(target: LOOP_TARGET, "event loop stopped");
    }

    /// Runs until `done` holds, a shutdown message arrives or `timeout`
    /// elapses. Returns whether `done` held when the loop returned.
    pub fn run_until<P>(&mut self, mut done: P, timeout: Duration) -> bool
    where
        P: FnMut(&Bridge) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.bridge) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            if let Flow::Stop = self.turn(Some(deadline)) {
                return done(&self.bridge);
            }
        }
    }

    /// Runs every queued task and every timer already due, then returns.
    ///
    /// A shutdown message stops the drain and is kept, so the next
    /// [`EventLoop::run`] or [`EventLoop::run_until`] returns at once.
    pub fn run_pending(&mut self) {
        if self.stopped {
            return;
        }
        loop {
            self.fire_due_timers();
            match self.receiver.try_recv() {
                Ok(Message::Run(task)) => task(&mut self.bridge),
                Ok(Message::Shutdown) => {
                    self.stopped = true;
                    return;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return,
            }
        }
    }

    fn turn(&mut self, limit: Option<Instant>) -> Flow {
        if std::mem::take(&mut self.stopped) {
            return Flow::Stop;
        }
        self.fire_due_timers();
        let wake = match (self.bridge.timers().next_deadline(), limit) {
            (Some(timer), Some(cap)) => Some(timer.min(cap)),
            (timer, cap) => timer.or(cap),
        };
        let received = match wake {
            Some(deadline) => self.receiver.recv_deadline(deadline),
            None => self
                .receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Message::Run(task)) => {
                task(&mut self.bridge);
                Flow::Continue
            }
            Err(RecvTimeoutError::Timeout) => Flow::Continue,
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => Flow::Stop,
        }
    }

    fn fire_due_timers(&mut self) {
        while let Some(task) = self.bridge.timers_mut().pop_due(Instant::now()) {
            task(&mut self.bridge);
        }
    }
}
