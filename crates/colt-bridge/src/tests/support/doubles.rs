//! Test doubles for the bridge's collaborators.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use colt_config::Config;
use serde_json::Value;
use tempfile::TempDir;

use crate::bootstrap::{Launcher, Probe};
use crate::bridge::BridgeBuilder;
use crate::event_loop::EventLoop;
use crate::rpc::{RpcError, RpcTransport};
use crate::session::ShortCodePrompt;
use crate::settings::{MemoryStore, Settings};
use crate::sink::MemorySink;

/// Answers probes from a script, then repeats a fallback answer.
#[derive(Clone)]
pub(crate) struct ScriptedProbe {
    answers: Arc<Mutex<VecDeque<bool>>>,
    fallback: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub(crate) fn new(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn always(answer: bool) -> Self {
        Self::new([], answer)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for ScriptedProbe {
    fn is_reachable(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(self.fallback)
    }
}

/// Records every file it is asked to open, and whether it existed then.
#[derive(Clone, Default)]
pub(crate) struct RecordingLauncher {
    opened: Arc<Mutex<Vec<(Utf8PathBuf, bool)>>>,
    fail: bool,
}

impl RecordingLauncher {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn opened(&self) -> Vec<(Utf8PathBuf, bool)> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, path: &Utf8Path) -> io::Result<()> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((path.to_path_buf(), path.exists()));
        }
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no application is associated with this file type",
            ));
        }
        Ok(())
    }
}

type Responder = dyn Fn(&str, &[Value]) -> Result<Value, RpcError> + Send + Sync;

/// Records calls and answers them with a closure.
#[derive(Clone)]
pub(crate) struct StubTransport {
    calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    responder: Arc<Responder>,
}

impl StubTransport {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    pub(crate) fn answering(value: Value) -> Self {
        Self::new(move |_, _| Ok(value.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }
}

impl RpcTransport for StubTransport {
    fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((method.to_owned(), params.to_vec()));
        }
        (self.responder)(method, params)
    }
}

/// Hands out queued short codes.
#[derive(Clone, Default)]
pub(crate) struct QueuedPrompt {
    codes: Arc<Mutex<VecDeque<Option<String>>>>,
    asked: Arc<AtomicUsize>,
}

impl QueuedPrompt {
    pub(crate) fn with(codes: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        Self {
            codes: Arc::new(Mutex::new(
                codes.into_iter().map(|code| code.map(str::to_owned)).collect(),
            )),
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl ShortCodePrompt for QueuedPrompt {
    fn short_code(&mut self) -> Option<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.codes
            .lock()
            .ok()
            .and_then(|mut codes| codes.pop_front())
            .flatten()
    }
}

/// Bridge assembled from doubles, with handles kept for inspection.
pub(crate) struct Harness {
    pub(crate) event_loop: EventLoop,
    pub(crate) sink: MemorySink,
    pub(crate) probe: ScriptedProbe,
    pub(crate) launcher: RecordingLauncher,
    pub(crate) transport: StubTransport,
    pub(crate) store: MemoryStore,
    pub(crate) prompt: QueuedPrompt,
    pub(crate) launch_dir: TempDir,
}

pub(crate) struct HarnessBuilder {
    config: Config,
    probe: ScriptedProbe,
    launcher: RecordingLauncher,
    transport: StubTransport,
    remote: Option<Arc<dyn RpcTransport>>,
    settings: Settings,
    prompt: QueuedPrompt,
}

impl HarnessBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: Config {
                probe_interval_ms: 5,
                max_attempts: 3,
                debounce_ms: 20,
                ..Config::default()
            },
            probe: ScriptedProbe::always(true),
            launcher: RecordingLauncher::default(),
            transport: StubTransport::answering(Value::Null),
            remote: None,
            settings: Settings::default(),
            prompt: QueuedPrompt::default(),
        }
    }

    pub(crate) fn config(mut self, edit: impl FnOnce(&mut Config)) -> Self {
        edit(&mut self.config);
        self
    }

    pub(crate) fn probe(mut self, probe: ScriptedProbe) -> Self {
        self.probe = probe;
        self
    }

    pub(crate) fn launcher(mut self, launcher: RecordingLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    pub(crate) fn transport(mut self, transport: StubTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the recording stub with an arbitrary transport.
    pub(crate) fn remote(mut self, remote: Arc<dyn RpcTransport>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub(crate) fn token(mut self, token: &str) -> Self {
        self.settings.security_token = Some(token.to_owned());
        self
    }

    pub(crate) fn prompt(mut self, prompt: QueuedPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub(crate) fn build(self) -> Harness {
        let launch_dir = TempDir::new().expect("launch dir");
        let mut config = self.config;
        config.launch_dir = Some(
            Utf8PathBuf::from_path_buf(launch_dir.path().to_path_buf()).expect("utf8 temp dir"),
        );
        let sink = MemorySink::new();
        let store = MemoryStore::new(self.settings);
        let transport = self
            .remote
            .unwrap_or_else(|| Arc::new(self.transport.clone()) as Arc<dyn RpcTransport>);
        let event_loop = BridgeBuilder::new(config)
            .sink(sink.clone())
            .transport(transport)
            .probe(self.probe.clone())
            .launcher(self.launcher.clone())
            .store(store.clone())
            .prompt(self.prompt.clone())
            .build()
            .expect("bridge builds");
        Harness {
            event_loop,
            sink,
            probe: self.probe,
            launcher: self.launcher,
            transport: self.transport,
            store,
            prompt: self.prompt,
            launch_dir,
        }
    }
}

impl Harness {
    pub(crate) fn launch_dir_entries(&self) -> usize {
        std::fs::read_dir(self.launch_dir.path())
            .map(Iterator::count)
            .unwrap_or_default()
    }
}
