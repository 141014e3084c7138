//! BDD step definitions for the bridge's behavioural tests.
//!
//! Bootstrap and error-log scenarios drive a [`Harness`] built from doubles;
//! command-line scenarios run the binary's entry point against a fake COLT.

use super::support::*;
use crate::bootstrap::BootstrapState;
use crate::sink::Severity;

use std::cell::RefCell;
use std::process::ExitCode;

use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

fn unquote(text: &str) -> &str {
    text.trim_matches('"')
}

fn mirror_line(file: &str) -> String {
    format!(
        r"C:\build\colt\incremental\{}(10): col 3 Error: Type was not found.",
        file.replace('/', r"\")
    )
}

#[given("COLT is already running")]
fn given_running(world: &RefCell<TestWorld>) {
    world.borrow_mut().configure(|builder| {
        builder
            .probe(ScriptedProbe::always(true))
            .transport(StubTransport::answering(json!({ "state": "ready" })))
    });
}

#[given("COLT starts after {failures} failed probes")]
fn given_slow_start(world: &RefCell<TestWorld>, failures: usize) {
    let answers = std::iter::repeat_n(false, failures + 1);
    world.borrow_mut().configure(|builder| {
        builder
            .probe(ScriptedProbe::new(answers, true))
            .transport(StubTransport::answering(json!({ "state": "ready" })))
    });
}

#[given("COLT never starts")]
fn given_never_starts(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .configure(|builder| builder.probe(ScriptedProbe::always(false)));
}

#[given("the launcher cannot open files")]
fn given_failing_launcher(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_launcher();
}

#[when("a remote call to {method} is queued")]
fn when_call_queued(world: &RefCell<TestWorld>, method: String) {
    world
        .borrow_mut()
        .queue_call(unquote(&method))
        .expect("call queued");
}

#[when("the loop runs until the bootstrap settles")]
fn when_bootstrap_settles(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .settle_bootstrap()
        .expect("bootstrap settled");
}

#[then("the call result is delivered")]
fn then_result_delivered(world: &RefCell<TestWorld>) {
    let delivered = world.borrow().delivered();
    assert_eq!(delivered, vec![Ok(json!({ "state": "ready" }))]);
}

#[then("no call result is delivered")]
fn then_nothing_delivered(world: &RefCell<TestWorld>) {
    assert!(world.borrow().delivered().is_empty());
}

#[then("{count} launch files were opened")]
fn then_launches(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().launches(), count);
}

#[then("the launch directory is empty")]
fn then_launch_dir_empty(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let harness = state.built().expect("harness");
    assert_eq!(harness.launch_dir_entries(), 0);
}

#[then("the bootstrap ends as {outcome}")]
fn then_bootstrap_state(world: &RefCell<TestWorld>, outcome: String) {
    let expected = match unquote(&outcome) {
        "reachable" => BootstrapState::Reachable,
        "timed out" => BootstrapState::TimedOut,
        "launch failed" => BootstrapState::LaunchFailed,
        other => panic!("unknown bootstrap state {other}"),
    };
    let state = world.borrow();
    let harness = state.built().expect("harness");
    assert_eq!(harness.event_loop.bridge().bootstrap_state(), expected);
}

#[then("a fault containing {text} is reported")]
fn then_fault_reported(world: &RefCell<TestWorld>, text: String) {
    let faults = world.borrow().lines_at(Severity::Fault).expect("faults");
    let snippet = unquote(&text);
    assert!(
        faults.iter().any(|line| line.contains(snippet)),
        "no fault containing {snippet:?} in {faults:?}"
    );
}

#[given("a project whose source folder holds {file}")]
fn given_workspace(world: &RefCell<TestWorld>, file: String) {
    world
        .borrow_mut()
        .create_workspace(unquote(&file))
        .expect("workspace created");
}

#[given("remapped diagnostics are revealed")]
fn given_reveal(world: &RefCell<TestWorld>) {
    world.borrow_mut().configure(|builder| {
        builder.config(|config| config.reveal_diagnostics = true)
    });
}

#[when("the project is opened")]
fn when_project_opened(world: &RefCell<TestWorld>) {
    world.borrow_mut().open_workspace().expect("project opened");
}

#[when("COLT logs an error in {file}")]
fn when_error_logged(world: &RefCell<TestWorld>, file: String) {
    let state = world.borrow();
    state
        .workspace()
        .and_then(|workspace| workspace.append_log(&mirror_line(unquote(&file))))
        .expect("log written");
}

#[when("the log settles")]
fn when_log_settles(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .flush_log_changes()
        .expect("log processed");
}

#[when("the project is closed")]
fn when_project_closed(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .harness()
        .expect("harness")
        .event_loop
        .bridge_mut()
        .on_project_closed();
}

#[then("the diagnostics point at {file} in the source folder")]
fn then_remapped(world: &RefCell<TestWorld>, file: String) {
    let state = world.borrow();
    let source = state.workspace().expect("workspace").source_folder();
    let relative = unquote(&file).replace('/', r"\");
    let expected = format!(r"C:\build\{source}\{relative}(10): col 3 Error: Type was not found.");
    let lines = state.lines_at(Severity::Error).expect("diagnostics");
    assert_eq!(lines, vec![expected]);
}

#[then("the diagnostics still mention the incremental mirror")]
fn then_passthrough(world: &RefCell<TestWorld>) {
    let lines = world.borrow().lines_at(Severity::Error).expect("diagnostics");
    assert_eq!(lines, vec![mirror_line("com/Missing.as")]);
}

#[then("the diagnostics view was revealed")]
fn then_revealed(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    assert!(state.built().expect("harness").sink.reveal_count() > 0);
}

#[then("the working folder is not watched")]
fn then_not_watching(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let bridge = state.built().expect("harness").event_loop.bridge();
    assert!(!bridge.is_watching());
    assert!(bridge.project().is_none());
}

#[given("a fake COLT answering {result}")]
fn given_fake_tool(world: &RefCell<TestWorld>, result: String) {
    let value: Value = serde_json::from_str(unquote(&result)).expect("result is JSON");
    world
        .borrow_mut()
        .start_tool(value)
        .expect("fake COLT started");
}

#[given("nothing is listening for COLT")]
fn given_nothing_listening(world: &RefCell<TestWorld>) {
    world.borrow_mut().point_at(closed_port());
}

#[when("the bridge is run with {args}")]
fn when_bridge_runs(world: &RefCell<TestWorld>, args: String) {
    world.borrow_mut().run_cli(unquote(&args));
}

#[then("the bridge succeeds")]
fn then_succeeds(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let status = state.exit_status().expect("status");
    assert_eq!(
        status,
        ExitCode::SUCCESS,
        "stdout: {:?} stderr: {:?}",
        state.stdout_text(),
        state.stderr_text()
    );
}

#[then("the bridge fails")]
fn then_fails(world: &RefCell<TestWorld>) {
    assert_eq!(
        world.borrow().exit_status().expect("status"),
        ExitCode::FAILURE
    );
}

#[then("stdout contains {text}")]
fn then_stdout_contains(world: &RefCell<TestWorld>, text: String) {
    let stdout = world.borrow().stdout_text().expect("stdout");
    let snippet = unquote(&text);
    assert!(stdout.contains(snippet), "stdout {stdout:?} lacks {snippet:?}");
}

#[then("stderr contains {text}")]
fn then_stderr_contains(world: &RefCell<TestWorld>, text: String) {
    let stderr = world.borrow().stderr_text().expect("stderr");
    let snippet = unquote(&text);
    assert!(stderr.contains(snippet), "stderr {stderr:?} lacks {snippet:?}");
}

#[then("COLT received a {method} call")]
fn then_tool_received(world: &RefCell<TestWorld>, method: String) {
    let methods = world.borrow().tool_methods();
    assert!(
        methods.iter().any(|name| name == unquote(&method)),
        "calls received: {methods:?}"
    );
}

#[then("COLT received no calls")]
fn then_tool_idle(world: &RefCell<TestWorld>) {
    assert!(world.borrow().tool_methods().is_empty());
}

#[scenario(path = "tests/features/bootstrap.feature")]
fn bootstrap_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/error_log.feature")]
fn error_log_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/command_line.feature")]
fn command_line_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}
