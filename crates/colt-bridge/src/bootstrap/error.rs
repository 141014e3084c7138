//! Error types for bootstrap sequences.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures that end a bootstrap sequence without reaching the remote tool.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The placeholder file used to trigger the launch could not be created.
    #[error("failed to create launch file {path}: {source}")]
    CreateLaunchFile {
        /// Path of the placeholder file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The operating system refused to open the placeholder file.
    #[error(
        "failed to launch the remote tool through {path}; is an application associated with this file type? ({source})"
    )]
    Launch {
        /// Path of the placeholder file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The remote tool never answered within the attempt budget.
    #[error("timed out waiting for the remote tool after {attempts} probes every {interval_ms} ms")]
    TimedOut {
        /// Number of failed re-probes.
        attempts: u32,
        /// Interval between probes.
        interval_ms: u64,
    },
}
