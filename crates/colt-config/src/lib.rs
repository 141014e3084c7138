//! Layered configuration shared by the COLT bridge library and binary.
//!
//! Values are resolved from built-in defaults, an optional configuration file
//! (`--config-path`), `COLT_*` environment variables and command-line flags,
//! in increasing order of precedence.

mod defaults;
mod endpoint;
mod modes;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_INCREMENTAL_MARKER, DEFAULT_LAUNCH_EXTENSION,
    DEFAULT_LOG_FILE_NAME, DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROBE_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RPC_HOST, DEFAULT_RPC_PATH, DEFAULT_RPC_PORT,
    DEFAULT_SENTINEL_PATH, DEFAULT_SENTINEL_PORT, DEFAULT_WORKING_FOLDER, default_log_filter_string,
    default_log_format, default_log_policy, default_probe_mode, default_settings_path,
};
pub use endpoint::{EndpointParseError, HttpEndpoint};
pub use modes::{LogFormat, LogPolicy, ModeParseError, ProbeMode};

/// Resolved bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "COLT")]
pub struct Config {
    /// Host of the remote tool's services.
    #[ortho_config(default = defaults::default_rpc_host())]
    pub rpc_host: String,
    /// Port of the JSON RPC service.
    #[ortho_config(default = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,
    /// Request path of the JSON RPC service.
    #[ortho_config(default = defaults::default_rpc_path())]
    pub rpc_path: String,
    /// Port serving the sentinel document.
    #[ortho_config(default = DEFAULT_SENTINEL_PORT)]
    pub sentinel_port: u16,
    /// Path of the sentinel document.
    #[ortho_config(default = defaults::default_sentinel_path())]
    pub sentinel_path: String,
    /// Reachability probe used by the bootstrapper.
    #[ortho_config(default = default_probe_mode())]
    pub probe_mode: ProbeMode,
    /// Upper bound for one HTTP exchange in milliseconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Delay between probes while waiting for a launch, in milliseconds.
    #[ortho_config(default = DEFAULT_PROBE_INTERVAL_MS)]
    pub probe_interval_ms: u64,
    /// Failed re-probes tolerated before the bootstrap times out.
    #[ortho_config(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Coalescing window for log-file change events, in milliseconds.
    #[ortho_config(default = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,
    /// Working folder of the remote tool, relative to the project root.
    #[ortho_config(default = defaults::default_working_folder())]
    pub working_folder: Utf8PathBuf,
    /// Name of the compiler error log inside the working folder.
    #[ortho_config(default = defaults::default_log_file_name())]
    pub log_file_name: String,
    /// Marker naming the remote tool's incremental source mirror.
    #[ortho_config(default = defaults::default_incremental_marker())]
    pub incremental_marker: String,
    /// Extension of the placeholder file used to launch the remote tool.
    #[ortho_config(default = defaults::default_launch_extension())]
    pub launch_extension: String,
    /// Directory receiving placeholder files; the system temp dir when unset.
    pub launch_dir: Option<Utf8PathBuf>,
    /// Location of the persisted settings file.
    #[ortho_config(default = default_settings_path())]
    pub settings_path: Utf8PathBuf,
    /// How successive error-log versions are forwarded.
    #[ortho_config(default = default_log_policy())]
    pub log_policy: LogPolicy,
    /// Ask the output sink to come to the foreground after remapped errors.
    #[ortho_config(default = false)]
    pub reveal_diagnostics: bool,
    /// Export the IDE's full compiler configuration along with the project.
    ///
    /// The project must have been built once so that
    /// `obj/<Name>Config.xml` exists.
    #[ortho_config(default = false)]
    pub full_config: bool,
    /// Log filter expression for the tracing subscriber.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the tracing subscriber.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_host: defaults::default_rpc_host(),
            rpc_port: DEFAULT_RPC_PORT,
            rpc_path: defaults::default_rpc_path(),
            sentinel_port: DEFAULT_SENTINEL_PORT,
            sentinel_path: defaults::default_sentinel_path(),
            probe_mode: default_probe_mode(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            working_folder: defaults::default_working_folder(),
            log_file_name: defaults::default_log_file_name(),
            incremental_marker: defaults::default_incremental_marker(),
            launch_extension: defaults::default_launch_extension(),
            launch_dir: None,
            settings_path: default_settings_path(),
            log_policy: default_log_policy(),
            reveal_diagnostics: false,
            full_config: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint of the JSON RPC service.
    #[must_use]
    pub fn rpc_endpoint(&self) -> HttpEndpoint {
        HttpEndpoint::new(self.rpc_host.as_str(), self.rpc_port, &self.rpc_path)
    }

    /// Endpoint of the sentinel document.
    #[must_use]
    pub fn sentinel_endpoint(&self) -> HttpEndpoint {
        HttpEndpoint::new(
            self.rpc_host.as_str(),
            self.sentinel_port,
            &self.sentinel_path,
        )
    }

    /// Bound applied to each HTTP exchange.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Interval between bootstrap probes.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Debounce window for log-file change events.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Directory receiving launch placeholder files.
    #[must_use]
    pub fn launch_directory(&self) -> Utf8PathBuf {
        self.launch_dir.clone().unwrap_or_else(|| {
            Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("."))
        })
    }

    /// Working folder resolved against `project_root` unless already absolute.
    #[must_use]
    pub fn working_directory(&self, project_root: &Utf8Path) -> Utf8PathBuf {
        if self.working_folder.is_absolute() {
            self.working_folder.clone()
        } else {
            project_root.join(&self.working_folder)
        }
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
