//! Probe, launch and wait for the remote tool.
//!
//! A bootstrap sequence probes once. When the remote tool answers, the
//! continuation runs immediately. Otherwise an empty `<uuid>.colt` file is
//! created and handed to the OS so its file association starts the remote
//! tool, and the bridge re-probes on a fixed interval until it answers or the
//! attempt budget runs out. Only one sequence is live at a time: starting a
//! new one abandons the previous one without resuming it.

mod error;
mod launch;
mod probe;

use tracing::{debug, info, warn};

use crate::bridge::Bridge;
use crate::event_loop::{LocalTask, TimerId};

pub use error::BootstrapError;
pub use launch::{Launcher, SystemLauncher};
pub(crate) use launch::LaunchFile;
pub use probe::{PingProbe, Probe, SentinelProbe, probe_for};

pub(crate) const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Observable progress of the most recent bootstrap sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BootstrapState {
    /// No sequence has run yet.
    #[default]
    Idle,
    /// The initial probe is in flight.
    Probing,
    /// The placeholder file is being created and opened.
    Launching,
    /// Waiting for the launched tool; `attempt` failed re-probes so far.
    Waiting {
        /// Failed re-probes so far.
        attempt: u32,
    },
    /// The remote tool answered and the continuation ran.
    Reachable,
    /// The attempt budget ran out.
    TimedOut,
    /// The placeholder could not be created or opened.
    LaunchFailed,
}

impl BootstrapState {
    /// Returns true once the sequence can make no further progress.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Reachable | Self::TimedOut | Self::LaunchFailed)
    }
}

struct ActiveAttempt {
    generation: u64,
    attempts: u32,
    timer: Option<TimerId>,
    _launch_file: LaunchFile,
    resume: LocalTask,
}

#[derive(Default)]
pub(crate) struct BootstrapSlot {
    state: BootstrapState,
    generation: u64,
    active: Option<ActiveAttempt>,
}

impl Bridge {
    /// State of the most recent bootstrap sequence.
    #[must_use]
    pub const fn bootstrap_state(&self) -> BootstrapState {
        self.bootstrap.state
    }

    /// Probes the remote tool once, without launching it.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.probe.is_reachable()
    }

    /// Runs `continuation` with `payload` once the remote tool is reachable.
    ///
    /// The continuation runs synchronously when the first probe succeeds.
    /// It is dropped unrun when the sequence times out, fails to launch or is
    /// superseded by a later call.
    pub fn bootstrap<T, F>(&mut self, payload: T, continuation: F)
    where
        T: 'static,
        F: FnOnce(&mut Self, T) + 'static,
    {
        self.supersede_bootstrap();
        let generation = self.bootstrap.generation;

        self.bootstrap.state = BootstrapState::Probing;
        if self.probe.is_reachable() {
            debug!(target: BOOTSTRAP_TARGET, generation, "remote tool already reachable");
            self.bootstrap.state = BootstrapState::Reachable;
            continuation(self, payload);
            return;
        }

        self.bootstrap.state = BootstrapState::Launching;
        let launch_file = match self.launch() {
            Ok(file) => file,
            Err(error) => {
                self.bootstrap.state = BootstrapState::LaunchFailed;
                self.report_fault(error);
                return;
            }
        };

        let resume: LocalTask = Box::new(move |bridge: &mut Self| continuation(bridge, payload));
        self.bootstrap.active = Some(ActiveAttempt {
            generation,
            attempts: 0,
            timer: None,
            _launch_file: launch_file,
            resume,
        });
        self.bootstrap.state = BootstrapState::Waiting { attempt: 0 };
        self.schedule_probe(generation);
    }

    fn launch(&self) -> Result<LaunchFile, BootstrapError> {
        let directory = self.config.launch_directory();
        let launch_file = LaunchFile::create(&directory, &self.config.launch_extension)?;
        self.launcher
            .open(launch_file.path())
            .map_err(|source| BootstrapError::Launch {
                path: launch_file.path().to_path_buf(),
                source,
            })?;
        info!(target: BOOTSTRAP_TARGET, file = %launch_file.path(), "launch requested");
        Ok(launch_file)
    }

    fn supersede_bootstrap(&mut self) {
        self.bootstrap.generation += 1;
        if let Some(previous) = self.bootstrap.active.take() {
            if let Some(timer) = previous.timer {
                self.cancel_timer(timer);
            }
            info!(
                target: BOOTSTRAP_TARGET,
                generation = previous.generation,
                "abandoning superseded bootstrap"
            );
        }
    }

    fn schedule_probe(&mut self, generation: u64) {
        let interval = self.config.probe_interval();
        let timer = self.schedule(interval, move |bridge| bridge.on_probe_tick(generation));
        if let Some(active) = self.bootstrap.active.as_mut() {
            active.timer = Some(timer);
        }
    }

    fn on_probe_tick(&mut self, generation: u64) {
        let Some(active) = self.bootstrap.active.as_mut() else {
            return;
        };
        if active.generation != generation {
            return;
        }
        active.timer = None;

        if self.probe.is_reachable() {
            let Some(finished) = self.bootstrap.active.take() else {
                return;
            };
            info!(
                target: BOOTSTRAP_TARGET,
                generation,
                attempts = finished.attempts,
                "remote tool became reachable"
            );
            self.bootstrap.state = BootstrapState::Reachable;
            let ActiveAttempt {
                _launch_file: launch_file,
                resume,
                ..
            } = finished;
            resume(self);
            drop(launch_file);
            return;
        }

        let Some(active) = self.bootstrap.active.as_mut() else {
            return;
        };
        active.attempts += 1;
        let attempts = active.attempts;
        if attempts > self.config.max_attempts {
            self.bootstrap.active = None;
            self.bootstrap.state = BootstrapState::TimedOut;
            warn!(target: BOOTSTRAP_TARGET, generation, attempts, "bootstrap timed out");
            self.report_fault(BootstrapError::TimedOut {
                attempts,
                interval_ms: self.config.probe_interval_ms,
            });
            return;
        }
        self.bootstrap.state = BootstrapState::Waiting { attempt: attempts };
        self.schedule_probe(generation);
    }
}
