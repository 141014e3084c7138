//! Bridge between an IDE and a locally running COLT live-compilation service.
//!
//! The bridge speaks COLT's JSON protocol over HTTP, starts COLT through the
//! operating system's file association when it is not running, and tails the
//! compile error log COLT writes, forwarding remapped diagnostics to an
//! [`OutputSink`]. All of this runs on a single [`EventLoop`] thread.
//!
//! [`run`] is the entry point of the `colt-bridge` binary; the other items
//! let an embedding editor assemble a [`Bridge`] with its own collaborators.

pub mod bootstrap;
pub mod bridge;
mod cli;
mod config;
mod errors;
pub mod event_loop;
mod invoker;
pub mod project;
pub mod rpc;
pub mod session;
pub mod settings;
pub mod sink;
pub mod telemetry;
pub mod watcher;

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use colt_config::Config;
use serde_json::Value;

pub use bootstrap::BootstrapState;
pub use bridge::{Bridge, BridgeBuilder, BridgeError};
pub use event_loop::{EventLoop, LoopClosed, LoopHandle};
pub use project::Project;
pub use rpc::{HttpTransport, RpcError, RpcFault, RpcTransport};
pub use session::ProjectAction;
pub use sink::{MemorySink, OutputSink, Severity, WriterSink};

use cli::{Cli, CliCommand};
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use session::ReaderPrompt;

const WATCH_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

/// Runs the command line in `args`, writing results to `stdout` and
/// failures to `stderr`.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
        Ok(cli) => cli,
        Err(error)
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    match loader
        .load(&split.config_arguments)
        .and_then(|config| execute(cli, config, stdout))
    {
        Ok(code) => code,
        Err(error) => report(stderr, &error),
    }
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "{error}");
    ExitCode::FAILURE
}

/// Copies captured sink lines to the caller's stdout.
struct Console<'a, W: Write> {
    captured: MemorySink,
    out: WriterSink<&'a mut W>,
    faults: usize,
}

impl<W: Write> Console<'_, W> {
    fn flush(&mut self) {
        for entry in self.captured.drain() {
            if entry.severity == Severity::Fault {
                self.faults += 1;
            }
            self.out.emit(entry.severity, &entry.line);
        }
    }

    fn exit_code(&mut self, succeeded: bool) -> ExitCode {
        self.flush();
        if succeeded && self.faults == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: Cli, config: Config, stdout: &mut W) -> Result<ExitCode, AppError> {
    telemetry::initialise(&config)?;
    if cli.project.is_none() && needs_project(&cli.command) {
        return Err(AppError::MissingProject);
    }
    let budget = bootstrap_budget(&config);
    let captured = MemorySink::new();
    let mut builder = BridgeBuilder::new(config)
        .sink(captured.clone())
        .prompt(ReaderPrompt::new(io::stdin().lock(), io::stderr()));
    if let Some(path) = cli.project.as_deref() {
        builder = builder.project(Project::load(path)?);
    }
    let mut event_loop = builder.build()?;
    let mut console = Console {
        captured,
        out: WriterSink::new(stdout),
        faults: 0,
    };

    match cli.command {
        CliCommand::Status => {
            let reachable = event_loop.bridge().is_reachable();
            let note = if reachable {
                "COLT is running"
            } else {
                "COLT is not running"
            };
            event_loop.bridge_mut().report_info(note);
            Ok(console.exit_code(reachable))
        }
        CliCommand::Start => {
            event_loop
                .bridge_mut()
                .bootstrap((), |bridge, ()| bridge.report_info("COLT is running"));
            let reachable = settle(&mut event_loop, budget);
            Ok(console.exit_code(reachable))
        }
        CliCommand::Call { method, params } => {
            let values = parse_parameters(&params)?;
            let answered = call(&mut event_loop, method, values, budget)?;
            Ok(console.exit_code(answered))
        }
        CliCommand::Authorize => {
            event_loop.bridge_mut().authorize();
            let reachable = settle(&mut event_loop, budget);
            let granted = event_loop.bridge().settings().security_token.is_some();
            Ok(console.exit_code(reachable && granted))
        }
        CliCommand::Export { run } => Ok(act(
            &mut event_loop,
            &mut console,
            ProjectAction::ExportAndOpen,
            run,
            budget,
        )),
        CliCommand::Open { run } => Ok(act(
            &mut event_loop,
            &mut console,
            ProjectAction::OpenExisting,
            run,
            budget,
        )),
        CliCommand::Build { run } => Ok(act(
            &mut event_loop,
            &mut console,
            ProjectAction::ProductionBuild,
            run,
            budget,
        )),
        CliCommand::Watch { create } => watch(&mut event_loop, &mut console, create),
    }
}

const fn needs_project(command: &CliCommand) -> bool {
    matches!(
        command,
        CliCommand::Export { .. }
            | CliCommand::Open { .. }
            | CliCommand::Build { .. }
            | CliCommand::Watch { .. }
    )
}

/// Upper bound on one bootstrap sequence: every probe may take the full
/// request timeout on top of the probe interval.
fn bootstrap_budget(config: &Config) -> Duration {
    (config.probe_interval() + config.request_timeout())
        .saturating_mul(config.max_attempts.saturating_add(3))
}

fn settle(event_loop: &mut EventLoop, budget: Duration) -> bool {
    event_loop.run_until(|bridge| bridge.bootstrap_state().is_settled(), budget);
    event_loop.bridge().bootstrap_state() == BootstrapState::Reachable
}

fn parse_parameters(params: &[String]) -> Result<Vec<Value>, AppError> {
    params
        .iter()
        .map(|text| {
            serde_json::from_str(text).map_err(|source| AppError::InvalidParameter {
                text: text.clone(),
                source,
            })
        })
        .collect()
}

fn call(
    event_loop: &mut EventLoop,
    method: String,
    params: Vec<Value>,
    budget: Duration,
) -> Result<bool, AppError> {
    let answered = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&answered);
    event_loop
        .handle()
        .invoke_async(method, params, move |bridge, outcome| {
            match outcome {
                Ok(value) => {
                    bridge.report_info(value);
                    flag.store(true, Ordering::SeqCst);
                }
                Err(error) => bridge.handle_rpc_fault(&error),
            }
        })?;
    event_loop.run_until(
        |bridge| {
            answered.load(Ordering::SeqCst)
                || matches!(
                    bridge.bootstrap_state(),
                    BootstrapState::TimedOut | BootstrapState::LaunchFailed
                )
                || (bridge.bootstrap_state() == BootstrapState::Reachable
                    && bridge.pending_timers() == 0)
        },
        budget,
    );
    Ok(answered.load(Ordering::SeqCst))
}

fn act<W: Write>(
    event_loop: &mut EventLoop,
    console: &mut Console<'_, W>,
    action: ProjectAction,
    run: bool,
    budget: Duration,
) -> ExitCode {
    event_loop
        .bridge_mut()
        .run_action(action, run.then_some(true));
    let reachable = settle(event_loop, budget);
    console.exit_code(reachable)
}

fn watch<W: Write>(
    event_loop: &mut EventLoop,
    console: &mut Console<'_, W>,
    create: bool,
) -> Result<ExitCode, AppError> {
    let bridge = event_loop.bridge_mut();
    if !bridge.watch_working_folder(create)? {
        let missing = bridge
            .project()
            .map(|project| bridge.config().working_directory(&project.root))
            .unwrap_or_default();
        return Err(AppError::NothingToWatch(missing));
    }
    if let Some(directory) = bridge.watched_directory() {
        let note = format!("watching {directory}");
        bridge.report_info(note);
    }
    while event_loop.bridge().is_watching() {
        event_loop.run_until(|_| false, WATCH_FLUSH_INTERVAL);
        console.flush();
    }
    Ok(console.exit_code(true))
}
