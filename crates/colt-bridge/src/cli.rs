//! Command-line definitions for the bridge binary.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Drives a COLT live-compilation instance from the command line.
#[derive(Parser, Debug)]
#[command(name = "colt-bridge", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// JSON description of the project to work with.
    #[arg(long, value_name = "FILE")]
    pub(crate) project: Option<Utf8PathBuf>,
    /// What to do.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Bridge operations exposed on the command line.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Reports whether COLT answers, without starting it.
    Status,
    /// Starts COLT if needed and waits until it answers.
    Start,
    /// Calls a remote method; each parameter is a JSON value.
    Call {
        /// Remote method name.
        method: String,
        /// Positional parameters as JSON.
        #[arg(value_name = "JSON", allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Exchanges a short code shown by COLT for a security token.
    Authorize,
    /// Sends the project to COLT and opens it.
    Export {
        /// Start a live session straight away.
        #[arg(long)]
        run: bool,
    },
    /// Opens the project exported earlier.
    Open {
        /// Start a live session straight away.
        #[arg(long)]
        run: bool,
    },
    /// Opens the project and runs a production build.
    Build {
        /// Run the build output afterwards.
        #[arg(long)]
        run: bool,
    },
    /// Forwards compile errors from the working folder until interrupted.
    Watch {
        /// Create the working folder when it is missing.
        #[arg(long)]
        create: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["colt-bridge", "status"])]
    #[case(&["colt-bridge", "--project", "game.json", "export", "--run"])]
    #[case(&["colt-bridge", "call", "loadProject", "\"tok\"", "-1"])]
    fn commands_parse(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_ok());
    }

    #[test]
    fn a_command_is_required() {
        assert!(Cli::try_parse_from(["colt-bridge"]).is_err());
    }
}
