//! Separates configuration flags from the command line.
//!
//! Configuration flags lead the argument list. They are handed to the
//! layered loader while the remainder, starting at the first token that is
//! not a configuration flag, is parsed as the command.

use std::ffi::{OsStr, OsString};

use colt_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// Flags understood by the configuration loader, and whether each expects a
/// value. Keep in step with the fields of [`Config`].
const CONFIG_CLI_FLAGS: &[(&str, bool)] = &[
    ("--config-path", true),
    ("--rpc-host", true),
    ("--rpc-port", true),
    ("--rpc-path", true),
    ("--sentinel-port", true),
    ("--sentinel-path", true),
    ("--probe-mode", true),
    ("--request-timeout-ms", true),
    ("--probe-interval-ms", true),
    ("--max-attempts", true),
    ("--debounce-ms", true),
    ("--working-folder", true),
    ("--log-file-name", true),
    ("--incremental-marker", true),
    ("--launch-extension", true),
    ("--launch-dir", true),
    ("--settings-path", true),
    ("--log-policy", true),
    ("--reveal-diagnostics", false),
    ("--full-config", false),
    ("--log-filter", true),
    ("--log-format", true),
];

pub(crate) trait ConfigLoader {
    /// Resolves configuration from defaults, file, environment and `args`.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    Valued,
    Switch,
    Inline,
}

fn classify(argument: &OsStr) -> Option<FlagKind> {
    let text = argument.to_str()?;
    let (flag, inline) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text, false),
    };
    let (_, takes_value) = *CONFIG_CLI_FLAGS.iter().find(|(known, _)| *known == flag)?;
    Some(match (inline, takes_value) {
        (true, _) => FlagKind::Inline,
        (false, true) => FlagKind::Valued,
        (false, false) => FlagKind::Switch,
    })
}

/// Configuration arguments (program name first) and where the command starts.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut config_arguments: Vec<OsString> = args.first().cloned().into_iter().collect();
    let mut command_start = config_arguments.len();
    let mut remaining = args.iter().skip(command_start);

    while let Some(argument) = remaining.next() {
        match classify(argument) {
            Some(FlagKind::Valued) => {
                config_arguments.push(argument.clone());
                command_start += 1;
                if let Some(value) = remaining.next() {
                    config_arguments.push(value.clone());
                    command_start += 1;
                }
            }
            Some(FlagKind::Switch | FlagKind::Inline) => {
                config_arguments.push(argument.clone());
                command_start += 1;
            }
            None => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

/// Program name followed by the command tokens.
pub(crate) fn command_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}
