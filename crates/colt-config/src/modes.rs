//! Enumerated configuration switches.
//!
//! Each enum parses case-insensitively from its snake_case name so the same
//! spelling works in configuration files, environment variables and CLI
//! flags.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// How the bridge decides whether the remote tool is reachable.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProbeMode {
    /// Issue the `ping` RPC method; any answer, including a fault, counts.
    #[default]
    Ping,
    /// Fetch the sentinel document over plain HTTP.
    Sentinel,
}

/// How successive versions of the error log reach the output sink.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogPolicy {
    /// Clear the sink and resend every line of the log on each pass.
    #[default]
    ClearAndResend,
    /// Forward only the content appended since the previous pass.
    Suffix,
}

/// Errors encountered while parsing a configuration switch from text.
pub type ModeParseError = strum::ParseError;
