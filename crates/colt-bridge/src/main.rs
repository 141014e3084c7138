//! Entry point of the `colt-bridge` binary.
//!
//! Argument handling, configuration and the bridge itself live in the
//! library; see [`colt_bridge::run`].

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    colt_bridge::run(std::env::args_os(), &mut stdout, &mut stderr)
}
