//! Test support for bridge unit and behavioural coverage.
//!
//! Supplies doubles for every collaborator, a loopback stand-in for COLT and
//! the world shared by the BDD steps, so individual tests stay focused on
//! their assertions.

mod doubles;
mod fake_tool;

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use colt_config::{Config, ProbeMode};
use rstest::fixture;
use serde_json::Value;
use tempfile::TempDir;

use crate::project::Project;
use crate::rpc::RpcError;
use crate::sink::Severity;
use crate::{AppError, ConfigLoader, run_with_loader};

pub(crate) use doubles::{
    Harness, HarnessBuilder, QueuedPrompt, RecordingLauncher, ScriptedProbe, StubTransport,
};
pub(crate) use fake_tool::{CannedResponse, FakeTool, RecordedRequest, closed_port};

/// Bound applied to every loop run driven by a scenario.
pub(super) const SCENARIO_TIMEOUT: Duration = Duration::from_secs(3);

/// A config loader that returns a fixed configuration.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// A project tree with one source folder and an existing working folder.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn with_source(relative: &str) -> Result<Self> {
        let dir = TempDir::new().context("workspace dir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non UTF-8 temp dir {}", path.display()))?;
        let source = root.join("src").join(relative);
        if let Some(parent) = source.parent() {
            fs::create_dir_all(parent).context("create source folder")?;
        }
        fs::write(&source, "package {}").context("write source file")?;
        fs::create_dir_all(root.join("colt")).context("create working folder")?;
        Ok(Self { _dir: dir, root })
    }

    pub(super) fn project(&self) -> Project {
        let mut project = Project::new(self.root.clone(), "Scenario");
        project.source_folders = vec!["src".into()];
        project
    }

    pub(super) fn source_folder(&self) -> Utf8PathBuf {
        self.root.join("src")
    }

    pub(super) fn append_log(&self, line: &str) -> Result<()> {
        let log = self.root.join("colt").join("compile_errors.log");
        let mut text = fs::read_to_string(&log).unwrap_or_default();
        text.push_str(line);
        text.push('\n');
        fs::write(&log, text).context("write error log")
    }
}

type Delivered = Arc<Mutex<Vec<Result<Value, String>>>>;

/// State shared by the steps of one scenario.
pub(super) struct TestWorld {
    pub(super) config: Config,
    _settings_dir: TempDir,
    tool: Option<FakeTool>,
    builder: Option<HarnessBuilder>,
    harness: Option<Harness>,
    launcher: RecordingLauncher,
    delivered: Delivered,
    workspace: Option<Workspace>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    status: Option<ExitCode>,
}

impl TestWorld {
    fn new() -> Result<Self> {
        let settings_dir = TempDir::new().context("settings dir")?;
        let settings_path = Utf8Path::from_path(settings_dir.path())
            .context("non UTF-8 temp dir")?
            .join("settings.json");
        Ok(Self {
            config: Config {
                request_timeout_ms: 500,
                settings_path,
                ..Config::default()
            },
            _settings_dir: settings_dir,
            tool: None,
            builder: Some(HarnessBuilder::new()),
            harness: None,
            launcher: RecordingLauncher::default(),
            delivered: Arc::default(),
            workspace: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            status: None,
        })
    }

    /// Points both endpoints at a fake COLT answering `result`.
    pub(super) fn start_tool(&mut self, result: Value) -> Result<()> {
        let tool = FakeTool::answering(result)?;
        self.point_at(tool.port());
        self.config.probe_mode = ProbeMode::Ping;
        self.tool = Some(tool);
        Ok(())
    }

    pub(super) fn point_at(&mut self, port: u16) {
        self.config.rpc_port = port;
        self.config.sentinel_port = port;
    }

    pub(super) fn tool_methods(&self) -> Vec<String> {
        self.tool
            .as_ref()
            .map(FakeTool::rpc_methods)
            .unwrap_or_default()
    }

    pub(super) fn configure(&mut self, edit: impl FnOnce(HarnessBuilder) -> HarnessBuilder) {
        self.builder = self.builder.take().map(edit);
    }

    pub(super) fn use_failing_launcher(&mut self) {
        self.launcher = RecordingLauncher::failing();
    }

    /// Builds the harness on first use.
    pub(super) fn harness(&mut self) -> Result<&mut Harness> {
        if self.harness.is_none() {
            let builder = self.builder.take().context("harness already built")?;
            self.harness = Some(builder.launcher(self.launcher.clone()).build());
        }
        self.harness.as_mut().context("harness missing")
    }

    pub(super) fn queue_call(&mut self, method: &str) -> Result<()> {
        let delivered = Arc::clone(&self.delivered);
        let harness = self.harness()?;
        harness
            .event_loop
            .bridge()
            .invoke_async(method, Vec::new(), move |_, outcome| {
                if let Ok(mut record) = delivered.lock() {
                    record.push(outcome.map_err(|error: RpcError| error.to_string()));
                }
            })
            .context("queue call")
    }

    pub(super) fn settle_bootstrap(&mut self) -> Result<()> {
        let harness = self.harness()?;
        let settled = harness
            .event_loop
            .run_until(|bridge| bridge.bootstrap_state().is_settled(), SCENARIO_TIMEOUT);
        ensure!(settled, "bootstrap did not settle");
        Ok(())
    }

    pub(super) fn delivered(&self) -> Vec<Result<Value, String>> {
        self.delivered
            .lock()
            .map(|record| record.clone())
            .unwrap_or_default()
    }

    pub(super) fn launches(&self) -> usize {
        self.launcher.opened().len()
    }

    pub(super) fn built(&self) -> Result<&Harness> {
        self.harness.as_ref().context("harness not built")
    }

    pub(super) fn lines_at(&self, severity: Severity) -> Result<Vec<String>> {
        Ok(self.built()?.sink.lines_at(severity))
    }

    pub(super) fn create_workspace(&mut self, relative: &str) -> Result<()> {
        self.workspace = Some(Workspace::with_source(relative)?);
        Ok(())
    }

    pub(super) fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().context("no workspace")
    }

    pub(super) fn open_workspace(&mut self) -> Result<()> {
        let project = self.workspace()?.project();
        self.harness()?.event_loop.bridge_mut().open_project(project);
        Ok(())
    }

    /// Signals a log change on the current subscription and waits for the
    /// debounced pass.
    pub(super) fn flush_log_changes(&mut self) -> Result<()> {
        let harness = self.harness()?;
        let bridge = harness.event_loop.bridge_mut();
        let session = bridge.watch_session();
        bridge.on_log_changed(session);
        let settled = harness
            .event_loop
            .run_until(|bridge| !bridge.has_pending_debounce(), SCENARIO_TIMEOUT);
        ensure!(settled, "debounce window never closed");
        Ok(())
    }

    /// Runs the binary's entry point in-process with `args`.
    pub(super) fn run_cli(&mut self, args: &str) {
        let argv: Vec<OsString> = std::iter::once("colt-bridge")
            .chain(args.split_whitespace())
            .map(OsString::from)
            .collect();
        self.stdout.clear();
        self.stderr.clear();
        let loader = StaticConfigLoader::new(self.config.clone());
        self.status = Some(run_with_loader(
            argv,
            &mut self.stdout,
            &mut self.stderr,
            &loader,
        ));
    }

    pub(super) fn exit_status(&self) -> Result<ExitCode> {
        self.status.context("the bridge has not run")
    }

    pub(super) fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout not UTF-8")
    }

    pub(super) fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr not UTF-8")
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new().expect("test world"))
}
