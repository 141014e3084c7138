//! Launching the remote tool through an OS file association.

use std::fs::{self, OpenOptions};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::BOOTSTRAP_TARGET;
use super::error::BootstrapError;

/// Asks the operating system to open a file with its associated application.
pub trait Launcher {
    /// Opens `path`.
    ///
    /// # Errors
    ///
    /// Returns the OS error when no handler is registered or spawning fails.
    fn open(&self, path: &Utf8Path) -> io::Result<()>;
}

/// Launches through the desktop's default file associations.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, path: &Utf8Path) -> io::Result<()> {
        open::that(path.as_os_str())
    }
}

/// An empty, uniquely named placeholder file removed when dropped.
#[derive(Debug)]
pub(crate) struct LaunchFile {
    path: Utf8PathBuf,
}

impl LaunchFile {
    pub(crate) fn create(directory: &Utf8Path, extension: &str) -> Result<Self, BootstrapError> {
        let path = directory.join(format!("{}.{extension}", Uuid::new_v4()));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_std_path())
            .map_err(|source| BootstrapError::CreateLaunchFile {
                path: path.clone(),
                source,
            })?;
        info!(target: BOOTSTRAP_TARGET, file = %path, "launch file created");
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for LaunchFile {
    fn drop(&mut self) {
        match fs::remove_file(self.path.as_std_path()) {
            Ok(()) => debug!(target: BOOTSTRAP_TARGET, file = %self.path, "launch file removed"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: BOOTSTRAP_TARGET,
                file = %self.path,
                %error,
                "failed to remove launch file"
            ),
        }
    }
}
