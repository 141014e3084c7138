//! Debounced tailing of the remote tool's compile error log.
//!
//! The bridge subscribes to change notifications on the project's working
//! folder. Writes to the log file arm a short debounce timer on the loop;
//! when it expires the log is read, remapped line by line and forwarded to
//! the output sink. Every subscription carries a session number so events
//! queued by a previous subscription are ignored once it is replaced.

mod cursor;
mod remap;

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use colt_config::LogPolicy;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bridge::Bridge;
use crate::event_loop::{LoopHandle, TimerId};
use crate::project::Project;
use crate::sink::Severity;

pub(crate) use cursor::LogCursor;
pub use remap::{DiagnosticLine, PathRemap, remap_line};

const WATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::watcher");

/// Errors raised while (re)pointing the log watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The working folder could not be created.
    #[error("failed to create working folder {path}: {source}")]
    CreateFolder {
        /// Folder that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The change subscription could not be established.
    #[error("failed to watch {path}: {source}")]
    Subscribe {
        /// Directory that could not be watched.
        path: Utf8PathBuf,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
}

/// Mutable watcher state held by the bridge.
#[derive(Default)]
pub(crate) struct WatchState {
    subscription: Option<RecommendedWatcher>,
    directory: Option<Utf8PathBuf>,
    session: u64,
    pending: Option<TimerId>,
    cursor: LogCursor,
}

impl Bridge {
    /// Points the change subscription at `directory`.
    ///
    /// Any previous subscription and pending debounce timer are dropped
    /// first, and the suffix cursor starts over.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Subscribe`] when the platform watcher refuses the
    /// directory. The bridge is left without a subscription in that case.
    pub fn start_watching(&mut self, directory: &Utf8Path) -> Result<(), WatchError> {
        self.stop_watching();
        let session = self.watch.session;
        let subscription = subscribe(
            directory,
            self.handle().clone(),
            self.config.log_file_name.clone(),
            session,
        )?;
        self.watch.subscription = Some(subscription);
        self.watch.directory = Some(directory.to_path_buf());
        debug!(target: WATCH_TARGET, %directory, session, "watching for log changes");
        Ok(())
    }

    /// Drops the subscription and any pending debounce timer.
    pub fn on_project_closed(&mut self) {
        self.stop_watching();
        self.project = None;
    }

    /// Opens `project`, replacing the current one, and watches its working
    /// folder when it already exists.
    pub fn open_project(&mut self, project: Project) {
        self.on_project_closed();
        debug!(target: WATCH_TARGET, project = %project.name, "project opened");
        self.project = Some(project);
        if let Err(error) = self.watch_working_folder(false) {
            self.report_fault(error);
        }
    }

    /// Watches the open project's working folder, creating it when asked.
    ///
    /// Returns whether a subscription is now active. Without an open project
    /// nothing is watched.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] when the folder cannot be created or watched.
    pub fn watch_working_folder(&mut self, create: bool) -> Result<bool, WatchError> {
        self.stop_watching();
        let Some(project) = self.project.as_ref() else {
            return Ok(false);
        };
        let directory = self.config.working_directory(&project.root);
        if create && !directory.exists() {
            fs::create_dir_all(&directory).map_err(|source| WatchError::CreateFolder {
                path: directory.clone(),
                source,
            })?;
        }
        if !directory.is_dir() {
            debug!(target: WATCH_TARGET, %directory, "working folder absent; not watching");
            return Ok(false);
        }
        self.start_watching(&directory)?;
        Ok(true)
    }

    /// Clears stale diagnostics when a source file is saved while watching.
    pub fn on_file_saved(&mut self) {
        if self.is_watching() {
            self.sink.clear();
        }
    }

    /// Directory currently watched, if any.
    #[must_use]
    pub fn watched_directory(&self) -> Option<&Utf8Path> {
        self.watch.directory.as_deref()
    }

    /// Whether a change subscription is active.
    #[must_use]
    pub const fn is_watching(&self) -> bool {
        self.watch.subscription.is_some()
    }

    pub(crate) const fn watch_session(&self) -> u64 {
        self.watch.session
    }

    /// Whether a debounce timer is armed.
    #[must_use]
    pub const fn has_pending_debounce(&self) -> bool {
        self.watch.pending.is_some()
    }

    /// Reads the log now and forwards its diagnostics.
    pub fn process_log(&mut self) {
        let Some(directory) = self.watch.directory.as_ref() else {
            return;
        };
        let path = directory.join(&self.config.log_file_name);
        if self.config.log_policy == LogPolicy::ClearAndResend {
            self.sink.clear();
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) => {
                warn!(target: WATCH_TARGET, %path, %error, "could not read error log");
                return;
            }
        };
        let fresh = match self.config.log_policy {
            LogPolicy::ClearAndResend => content,
            LogPolicy::Suffix => self.watch.cursor.advance(&content),
        };

        let remap = PathRemap::for_project(&self.config.incremental_marker, self.project.as_ref());
        let mut forwarded = 0_usize;
        let mut remapped = false;
        for line in fresh.split(['\r', '\n']).filter(|line| !line.is_empty()) {
            let diagnostic = remap_line(line, &remap);
            remapped |= diagnostic.is_remapped();
            self.sink.emit(Severity::Error, diagnostic.text());
            forwarded += 1;
        }
        debug!(target: WATCH_TARGET, %path, forwarded, remapped, "error log processed");
        if remapped && self.config.reveal_diagnostics {
            self.sink.reveal();
        }
    }

    pub(crate) fn on_log_changed(&mut self, session: u64) {
        if session != self.watch.session || !self.is_watching() {
            debug!(target: WATCH_TARGET, session, "dropping stale change event");
            return;
        }
        if self.watch.pending.is_some() {
            return;
        }
        let delay = self.config.debounce();
        let timer = self.schedule(delay, move |bridge| bridge.on_debounce_expired(session));
        self.watch.pending = Some(timer);
    }

    fn on_debounce_expired(&mut self, session: u64) {
        self.watch.pending = None;
        if session != self.watch.session {
            return;
        }
        self.process_log();
    }

    fn stop_watching(&mut self) {
        if let Some(timer) = self.watch.pending.take() {
            self.cancel_timer(timer);
        }
        if self.watch.subscription.take().is_some() {
            debug!(target: WATCH_TARGET, session = self.watch.session, "subscription dropped");
        }
        self.watch.directory = None;
        self.watch.cursor.reset();
        self.watch.session = self.watch.session.wrapping_add(1);
    }
}

fn subscribe(
    directory: &Utf8Path,
    handle: LoopHandle,
    log_file_name: String,
    session: u64,
) -> Result<RecommendedWatcher, WatchError> {
    let subscribe_error = |source: notify::Error| WatchError::Subscribe {
        path: directory.to_path_buf(),
        source,
    };
    let mut watcher = notify::recommended_watcher(move |outcome: notify::Result<Event>| {
        match outcome {
            Ok(event) if is_log_write(&event, &log_file_name) => {
                if handle
                    .post(move |bridge| bridge.on_log_changed(session))
                    .is_err()
                {
                    debug!(target: WATCH_TARGET, "loop closed; change event dropped");
                }
            }
            Ok(_) => {}
            Err(error) => warn!(target: WATCH_TARGET, %error, "watch error"),
        }
    })
    .map_err(&subscribe_error)?;
    watcher
        .watch(directory.as_std_path(), RecursiveMode::NonRecursive)
        .map_err(&subscribe_error)?;
    Ok(watcher)
}

fn is_log_write(event: &Event, log_file_name: &str) -> bool {
    matches!(event.kind, EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.ends_with(log_file_name))
}
