//! Authorisation with the remote tool and the project actions built on it.
//!
//! Every action first runs a bootstrap sequence. With a stored security
//! token the action proceeds; without one the authorisation flow runs
//! instead and the user repeats the action afterwards. Remote faults that
//! say the token or short code is invalid drop the stored token so the next
//! action asks again.

mod prompt;

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::project::{Project, ProjectError};
use crate::rpc::RpcError;
use crate::settings::SettingsError;
use crate::watcher::WatchError;

pub use prompt::{DeclinePrompt, ReaderPrompt, ShortCodePrompt};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Fault type raised when the entered short code is wrong.
pub const INVALID_SHORT_CODE: &str = "codeOrchestra.lcs.rpc.security.InvalidShortCodeException";
/// Fault type raised when the stored security token is no longer accepted.
pub const INVALID_AUTH_TOKEN: &str = "codeOrchestra.lcs.rpc.security.InvalidAuthTokenException";

const SHORT_CODE_LENGTH: usize = 4;
const CLIENT_DESCRIPTION: &str = "COLT bridge";

/// Something the user can ask the remote tool to do with the open project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    /// Send the project description and open it.
    ExportAndOpen,
    /// Open the project file exported earlier.
    OpenExisting,
    /// Open the project and run a production compilation.
    ProductionBuild,
}

/// Whether the authorisation flow produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorisation {
    /// A token was issued and stored.
    Granted,
    /// The user gave no code, or one of the wrong length.
    Declined,
}

/// Errors raised by the authorisation flow and project actions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The action needs an open project.
    #[error("no project is open")]
    NoProject,
    /// The action needs a security token.
    #[error("not authorised with COLT; run the authorisation first")]
    NotAuthorised,
    /// No exported project file exists yet.
    #[error("no COLT project found in {directory}; export the project first")]
    NoProjectFile {
        /// Working folder that was searched.
        directory: Utf8PathBuf,
    },
    /// An older exported project file could not be removed.
    #[error("failed to remove stale project file {path}: {source}")]
    RemoveStale {
        /// File that could not be removed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The project description could not be serialised.
    #[error("failed to encode the project description: {0}")]
    Describe(#[source] serde_json::Error),
    /// A remote call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The token could not be persisted.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The working folder could not be watched.
    #[error(transparent)]
    Watch(#[from] WatchError),
    /// The compiler configuration could not be exported.
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl Bridge {
    /// Runs the authorisation flow once the remote tool is reachable.
    pub fn authorize(&mut self) {
        self.bootstrap((), |bridge, ()| bridge.authorize_now());
    }

    /// Runs `action` once the remote tool is reachable, or the authorisation
    /// flow when no token is stored.
    ///
    /// `run` chooses whether a compilation starts straight away; `None`
    /// falls back to the stored auto-run preference.
    pub fn run_action(&mut self, action: ProjectAction, run: Option<bool>) {
        let live = run.unwrap_or(self.settings.auto_run);
        if self.settings.security_token.is_some() {
            self.bootstrap((action, live), |bridge, (chosen, start)| {
                bridge.perform(chosen, start);
            });
        } else {
            debug!(target: SESSION_TARGET, ?action, "no token stored; authorising instead");
            self.bootstrap((), |bridge, ()| bridge.authorize_now());
        }
    }

    /// Performs `action` immediately, reporting any failure to the sink.
    pub fn perform(&mut self, action: ProjectAction, run: bool) {
        let outcome = match action {
            ProjectAction::ExportAndOpen => self.export_and_open(run),
            ProjectAction::OpenExisting => self.open_in_tool(run),
            ProjectAction::ProductionBuild => self.production_build(run),
        };
        if let Err(error) = outcome {
            self.report_session_error(error);
        }
    }

    /// Asks for a short code and exchanges it for a security token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a remote call fails or the token cannot
    /// be stored.
    pub fn try_authorize(&mut self) -> Result<Authorisation, SessionError> {
        self.call("requestShortCode", &[json!(CLIENT_DESCRIPTION)])?;
        let Some(code) = self.prompt.short_code() else {
            return Ok(Authorisation::Declined);
        };
        if code.chars().count() != SHORT_CODE_LENGTH {
            debug!(target: SESSION_TARGET, "short code has the wrong length");
            return Ok(Authorisation::Declined);
        }
        let issued = token_text(self.call("obtainAuthToken", &[json!(code)])?);
        self.settings.security_token = Some(issued);
        self.store.save(&self.settings)?;
        info!(target: SESSION_TARGET, "security token stored");
        Ok(Authorisation::Granted)
    }

    /// Sends the open project to the remote tool and opens it there.
    ///
    /// Older exported project files in the working folder are removed once
    /// the remote tool accepted the new one.
    /// With `full_config` set, a copy of the IDE's compiler configuration
    /// goes along as the custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when there is no project or token, or when a
    /// remote call or file operation fails.
    pub fn export_and_open(&mut self, run: bool) -> Result<(), SessionError> {
        let token = self.security_token()?;
        let project = self.open_project_or_fail()?;
        self.watch_working_folder(true)?;

        let directory = self.config.working_directory(&project.root);
        let file_name = format!("{}.{}", Uuid::new_v4(), self.config.launch_extension);
        let mut descriptor = project.descriptor(directory.join(&file_name));
        if self.config.full_config {
            descriptor.custom_config_path = Some(project.write_config_copy()?);
        }
        let description = serde_json::to_value(&descriptor).map_err(SessionError::Describe)?;
        self.call("createProject", &[json!(token), description])?;
        remove_stale_project_files(&directory, &file_name, &self.config.launch_extension)?;
        self.report_info(format_args!("exported {} to COLT", project.name));

        if run {
            self.call("runBaseCompilation", &[json!(token)])?;
        }
        Ok(())
    }

    /// Opens the previously exported project file in the remote tool.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoProjectFile`] when nothing has been exported
    /// yet, or another [`SessionError`] when a remote call fails.
    pub fn open_in_tool(&mut self, run: bool) -> Result<(), SessionError> {
        let token = self.security_token()?;
        let project = self.open_project_or_fail()?;
        self.watch_working_folder(true)?;

        let file = self
            .find_project_file()
            .ok_or_else(|| SessionError::NoProjectFile {
                directory: self.config.working_directory(&project.root),
            })?;
        self.call("loadProject", &[json!(token), json!(file)])?;
        self.report_info(format_args!("opened {file} in COLT"));

        if run {
            self.call("runBaseCompilation", &[json!(token)])?;
        }
        Ok(())
    }

    /// Opens the project, then asks for a production compilation.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Bridge::open_in_tool`] and the compilation
    /// request.
    pub fn production_build(&mut self, run: bool) -> Result<(), SessionError> {
        self.open_in_tool(false)?;
        let token = self.security_token()?;
        self.call("runProductionCompilation", &[json!(token), json!(run)])?;
        Ok(())
    }

    /// First exported project file in the working folder, if any.
    #[must_use]
    pub fn find_project_file(&self) -> Option<Utf8PathBuf> {
        let project = self.project.as_ref()?;
        let directory = self.config.working_directory(&project.root);
        project_files(&directory, &self.config.launch_extension)
            .ok()?
            .into_iter()
            .next()
    }

    /// Reports `error`, dropping the stored token when the remote tool
    /// rejected it or the short code.
    pub fn handle_rpc_fault(&mut self, error: &RpcError) {
        let rejected = error.fault().is_some_and(|fault| {
            fault.is_type(INVALID_SHORT_CODE) || fault.is_type(INVALID_AUTH_TOKEN)
        });
        if rejected && self.settings.security_token.take().is_some() {
            info!(target: SESSION_TARGET, "security token rejected; cleared");
            if let Err(save_error) = self.store.save(&self.settings) {
                warn!(target: SESSION_TARGET, error = %save_error, "could not persist cleared token");
            }
        }
        self.report_fault(error);
    }

    fn authorize_now(&mut self) {
        match self.try_authorize() {
            Ok(Authorisation::Granted) => self.report_info("authorised with COLT"),
            Ok(Authorisation::Declined) => self.report_info("authorisation cancelled"),
            Err(error) => self.report_session_error(error),
        }
    }

    fn report_session_error(&mut self, error: SessionError) {
        match error {
            SessionError::Rpc(rpc) => self.handle_rpc_fault(&rpc),
            other => self.report_fault(other),
        }
    }

    fn security_token(&self) -> Result<String, SessionError> {
        self.settings
            .security_token
            .clone()
            .ok_or(SessionError::NotAuthorised)
    }

    fn open_project_or_fail(&self) -> Result<Project, SessionError> {
        self.project.clone().ok_or(SessionError::NoProject)
    }
}

fn token_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn project_files(directory: &Utf8Path, extension: &str) -> io::Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in directory.read_dir_utf8()? {
        let path = entry?.into_path();
        if path.extension() == Some(extension) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn remove_stale_project_files(
    directory: &Utf8Path,
    keep: &str,
    extension: &str,
) -> Result<(), SessionError> {
    let stale = project_files(directory, extension).map_err(|source| SessionError::RemoveStale {
        path: directory.to_path_buf(),
        source,
    })?;
    for path in stale.into_iter().filter(|path| path.file_name() != Some(keep)) {
        debug!(target: SESSION_TARGET, %path, "removing stale project file");
        fs::remove_file(&path).map_err(|source| SessionError::RemoveStale { path, source })?;
    }
    Ok(())
}
