use camino::Utf8PathBuf;

use crate::modes::{LogFormat, LogPolicy, ProbeMode};

/// Loopback host the remote tool listens on.
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Port of the remote tool's JSON RPC service.
pub const DEFAULT_RPC_PORT: u16 = 8092;

/// Request path of the remote tool's JSON RPC service.
pub const DEFAULT_RPC_PATH: &str = "/rpc/coltService";

/// Port serving the unauthenticated sentinel document.
pub const DEFAULT_SENTINEL_PORT: u16 = 8091;

/// Path of the sentinel document fetched by the sentinel probe.
pub const DEFAULT_SENTINEL_PATH: &str = "/crossdomain.xml";

/// Upper bound for a single RPC exchange, including probes.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;

/// Delay between reachability probes while waiting for a launch.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1_000;

/// Failed re-probes tolerated before a bootstrap sequence times out.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Coalescing delay applied to bursts of log-file change events.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Project-relative folder holding the remote tool's project files and logs.
pub const DEFAULT_WORKING_FOLDER: &str = "colt";

/// Name of the compiler error log written by the remote tool.
pub const DEFAULT_LOG_FILE_NAME: &str = "compile_errors.log";

/// Marker identifying paths inside the remote tool's incremental mirror.
pub const DEFAULT_INCREMENTAL_MARKER: &str = "colt\\incremental";

/// Extension registered with the OS for the remote tool's project files.
pub const DEFAULT_LAUNCH_EXTENSION: &str = "colt";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned RPC host used where allocation is required (e.g. serde).
#[must_use]
pub fn default_rpc_host() -> String {
    DEFAULT_RPC_HOST.to_owned()
}

/// Owned RPC path used where allocation is required.
#[must_use]
pub fn default_rpc_path() -> String {
    DEFAULT_RPC_PATH.to_owned()
}

/// Owned sentinel path used where allocation is required.
#[must_use]
pub fn default_sentinel_path() -> String {
    DEFAULT_SENTINEL_PATH.to_owned()
}

/// Default working folder, relative to the project root.
#[must_use]
pub fn default_working_folder() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_WORKING_FOLDER)
}

/// Owned log file name.
#[must_use]
pub fn default_log_file_name() -> String {
    DEFAULT_LOG_FILE_NAME.to_owned()
}

/// Owned incremental-mirror marker.
#[must_use]
pub fn default_incremental_marker() -> String {
    DEFAULT_INCREMENTAL_MARKER.to_owned()
}

/// Owned launch-file extension.
#[must_use]
pub fn default_launch_extension() -> String {
    DEFAULT_LAUNCH_EXTENSION.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default reachability probe.
#[must_use]
pub const fn default_probe_mode() -> ProbeMode {
    ProbeMode::Ping
}

/// Default error-log forwarding policy.
#[must_use]
pub const fn default_log_policy() -> LogPolicy {
    LogPolicy::ClearAndResend
}

/// Location of the persisted settings file (security token, auto-run flag).
///
/// Falls back to the system temporary directory when the platform exposes no
/// configuration directory.
#[must_use]
pub fn default_settings_path() -> Utf8PathBuf {
    let base = dirs::config_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .or_else(|| Utf8PathBuf::from_path_buf(std::env::temp_dir()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/tmp"));
    base.join("colt-bridge").join("settings.json")
}
