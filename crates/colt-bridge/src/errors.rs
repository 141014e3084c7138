//! Errors surfaced by the command-line runtime.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::event_loop::LoopClosed;
use crate::project::ProjectError;
use crate::telemetry::TelemetryError;
use crate::watcher::WatchError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("this command needs --project")]
    MissingProject,
    #[error("invalid JSON parameter '{text}': {source}")]
    InvalidParameter {
        text: String,
        source: serde_json::Error,
    },
    #[error("working folder {0} does not exist; pass --create to make it")]
    NothingToWatch(Utf8PathBuf),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    LoopClosed(#[from] LoopClosed),
}
