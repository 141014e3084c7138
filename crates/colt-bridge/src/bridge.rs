//! The bridge context owned by the event loop.
//!
//! [`Bridge`] bundles the collaborators every operation needs (transport,
//! probe, launcher, output sink, settings store) with the mutable state of
//! the bootstrapper, the error-log watcher and the open project. Operations
//! are implemented as `impl Bridge` blocks in their own modules.

use std::fmt::Display;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use colt_config::Config;
use thiserror::Error;
use tracing::warn;

use crate::bootstrap::{BootstrapSlot, Launcher, Probe, SystemLauncher, probe_for};
use crate::event_loop::{EventLoop, LocalTask, LoopHandle, TimerId, TimerQueue};
use crate::project::Project;
use crate::rpc::{HttpTransport, RpcError, RpcTransport};
use crate::session::{DeclinePrompt, ShortCodePrompt};
use crate::settings::{JsonFileStore, Settings, TokenStore};
use crate::sink::{OutputSink, Severity, WriterSink};
use crate::watcher::WatchState;

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Errors raised while assembling a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The HTTP transport or probe client could not be built.
    #[error(transparent)]
    Transport(#[from] RpcError),
}

/// Shared state of the remote-tool bridge. Lives on the event-loop thread.
pub struct Bridge {
    pub(crate) config: Config,
    handle: LoopHandle,
    timers: TimerQueue,
    pub(crate) sink: Box<dyn OutputSink>,
    pub(crate) transport: Arc<dyn RpcTransport>,
    pub(crate) probe: Box<dyn Probe>,
    pub(crate) launcher: Box<dyn Launcher>,
    pub(crate) bootstrap: BootstrapSlot,
    pub(crate) watch: WatchState,
    pub(crate) project: Option<Project>,
    pub(crate) settings: Settings,
    pub(crate) store: Box<dyn TokenStore>,
    pub(crate) prompt: Box<dyn ShortCodePrompt>,
}

impl Bridge {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for posting work back onto this bridge's loop.
    #[must_use]
    pub const fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    /// The project currently open in the IDE, if any.
    #[must_use]
    pub const fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    /// Persisted user settings as currently held in memory.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub(crate) const fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub(crate) const fn timers_mut(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub(crate) fn schedule<F>(&mut self, delay: Duration, task: F) -> TimerId
    where
        F: FnOnce(&mut Self) + 'static,
    {
        let task: LocalTask = Box::new(task);
        self.timers.schedule(delay, task)
    }

    pub(crate) fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Writes a single fault line to the output sink.
    pub(crate) fn report_fault(&mut self, fault: impl Display) {
        let line = fault.to_string();
        warn!(target: BRIDGE_TARGET, fault = %line, "reporting fault");
        self.sink.emit(Severity::Fault, &line);
    }

    pub(crate) fn report_info(&mut self, note: impl Display) {
        self.sink.emit(Severity::Info, &note.to_string());
    }
}

/// Assembles a [`Bridge`] inside a fresh [`EventLoop`].
///
/// Collaborators not supplied explicitly are derived from the configuration:
/// an HTTP transport, the configured probe, the OS file-association launcher
/// and a JSON settings file.
pub struct BridgeBuilder {
    config: Config,
    sink: Option<Box<dyn OutputSink>>,
    transport: Option<Arc<dyn RpcTransport>>,
    probe: Option<Box<dyn Probe>>,
    launcher: Option<Box<dyn Launcher>>,
    store: Option<Box<dyn TokenStore>>,
    prompt: Option<Box<dyn ShortCodePrompt>>,
    project: Option<Project>,
}

impl BridgeBuilder {
    /// Starts a builder from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sink: None,
            transport: None,
            probe: None,
            launcher: None,
            store: None,
            prompt: None,
            project: None,
        }
    }

    /// Sets the output sink; defaults to standard output.
    #[must_use]
    pub fn sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Sets the RPC transport; defaults to [`HttpTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the reachability probe; defaults to the configured probe mode.
    #[must_use]
    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Sets the launcher; defaults to [`SystemLauncher`].
    #[must_use]
    pub fn launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    /// Sets the settings store; defaults to [`JsonFileStore`].
    #[must_use]
    pub fn store(mut self, store: impl TokenStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Sets the short-code prompt; defaults to declining every request.
    #[must_use]
    pub fn prompt(mut self, prompt: impl ShortCodePrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Opens `project` as soon as the bridge is assembled.
    #[must_use]
    pub fn project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    /// Builds the bridge and the loop that owns it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when a default HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<EventLoop, BridgeError> {
        let Self {
            config,
            sink,
            transport,
            probe,
            launcher,
            store,
            prompt,
            project,
        } = self;

        let transport: Arc<dyn RpcTransport> = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_config(&config)?),
        };
        let probe = match probe {
            Some(probe) => probe,
            None => probe_for(&config, Arc::clone(&transport))?,
        };
        let store = store.unwrap_or_else(|| {
            Box::new(JsonFileStore::new(config.settings_path.clone())) as Box<dyn TokenStore>
        });
        let settings = store.load().unwrap_or_else(|error| {
            warn!(target: BRIDGE_TARGET, %error, "ignoring unreadable settings");
            Settings::default()
        });
        let sink = sink.unwrap_or_else(|| Box::new(WriterSink::new(io::stdout())));
        let launcher = launcher.unwrap_or_else(|| Box::new(SystemLauncher));
        let prompt = prompt.unwrap_or_else(|| Box::new(DeclinePrompt));

        let mut event_loop = EventLoop::assemble(|handle| Bridge {
            config,
            handle,
            timers: TimerQueue::default(),
            sink,
            transport,
            probe,
            launcher,
            bootstrap: BootstrapSlot::default(),
            watch: WatchState::default(),
            project: None,
            settings,
            store,
            prompt,
        });
        if let Some(project) = project {
            event_loop.bridge_mut().open_project(project);
        }
        Ok(event_loop)
    }
}
