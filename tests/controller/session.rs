use crate::common::{controller, line_of, linear, FakeAdapter, NoSource, PROGRAM};
use std::path::Path;
use stepback::controller::{Controller, SessionState};
use stepback::source::absolute_path;

#[test]
fn test_stop_without_session() {
    let (mut controller, _) = controller(linear(5));
    let outcome = controller.stop();
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    // and again
    assert!(controller.stop().success);
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_start_records_entry_snapshot() {
    let (mut controller, adapter) = controller(linear(5));
    assert_eq!(controller.state(), SessionState::Idle);

    let outcome = controller.start(None);
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(line_of(&outcome), Some(1));
    assert_eq!(adapter.stop_on_entry(), vec![true]);
    assert_eq!(controller.history().len(), 1);
    assert!(!controller.can_step_back());
    assert_eq!(controller.state(), SessionState::Stopped);

    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.file(), absolute_path(Path::new(PROGRAM)));
    assert_eq!(snapshot.location.function, "<module>");
    assert_eq!(snapshot.frames.len(), 1);
    // globals, dunder names and synthetic groups are filtered out
    let names: Vec<_> = snapshot.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["line"]);
    assert_eq!(snapshot.variables[0].value, "1");
    assert_eq!(snapshot.variables[0].type_label.as_deref(), Some("int"));

    let excerpt = snapshot.excerpt.unwrap();
    let numbers: Vec<_> = excerpt.lines.iter().map(|l| l.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(excerpt.lines[0].current);
    assert!(excerpt.to_string().starts_with("→    1 | line 1\n"));
}

#[test]
fn test_start_without_target() {
    let (mut controller, adapter) = controller(linear(5));
    controller.set_default_target(None);

    let outcome = controller.start(None);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("no target"));
    assert_eq!(adapter.launches(), 0);
}

#[test]
fn test_start_unknown_program_kind() {
    let (mut controller, adapter) = controller(linear(5));

    let outcome = controller.start(Some(Path::new("notes.txt")));
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().starts_with("launch failed"));
    assert_eq!(adapter.launches(), 0);
    assert!(!controller.is_live());
}

#[test]
fn test_start_launch_failure() {
    let (mut controller, adapter) = controller(linear(5));
    adapter.set_fail_launch(true);

    let outcome = controller.start(None);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("adapter refused to start"));
    assert!(!controller.is_live());

    adapter.set_fail_launch(false);
    assert!(controller.start(None).success);
}

#[test]
fn test_operations_need_session() {
    let (mut controller, adapter) = controller(linear(5));

    for outcome in [
        controller.step_over(),
        controller.step_into(),
        controller.step_out(),
        controller.continue_execution(),
        controller.continue_to_line(3),
        controller.get_state(),
        controller.evaluate("line"),
        controller.step_back(),
    ] {
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no debug session is running"));
        assert!(outcome.snapshot.is_none());
    }
    assert!(adapter.requests().is_empty());
}

#[test]
fn test_restart_replaces_session() {
    let (mut controller, adapter) = controller(linear(5));
    controller.start(None);
    controller.step_over();
    controller.step_over();
    assert_eq!(controller.history().len(), 3);

    let outcome = controller.start(None);
    assert_eq!(line_of(&outcome), Some(1));
    assert_eq!(controller.history().len(), 1);
    assert_eq!(adapter.launches(), 2);
}

#[test]
fn test_unsolicited_termination() {
    let (mut controller, adapter) = controller(linear(5));
    controller.start(None);
    controller.step_over();
    adapter.kill();

    let outcome = controller.step_over();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("no debug session is running"));
    assert!(!controller.is_live());
    assert!(controller.history().is_empty());
    assert_eq!(controller.state(), SessionState::Ended);
}

#[test]
fn test_termination_visible_before_next_operation() {
    let (mut controller, adapter) = controller(linear(5));
    controller.start_targeted(None, 2, 4);
    controller.step_over();
    assert!(controller.can_step_back());
    adapter.kill();

    // read-only accessors see the termination right away
    assert!(!controller.is_live());
    assert!(!controller.can_step_back());
    assert!(controller.history().is_empty());
    assert_eq!(controller.range(), None);
    assert_eq!(controller.state(), SessionState::Ended);

    // the next operation cleans up
    assert!(!controller.step_back().success);
    assert_eq!(controller.state(), SessionState::Ended);
    assert!(controller.history().is_empty());
}

#[test]
fn test_program_end() {
    let (mut controller, _) = controller(linear(2));
    controller.start(None);
    assert_eq!(line_of(&controller.step_over()), Some(2));

    let outcome = controller.step_over();
    assert!(outcome.success);
    assert!(outcome.snapshot.is_none());
    assert_eq!(outcome.payload.unwrap()["status"], "ended");
    assert!(!controller.is_live());
    assert!(controller.history().is_empty());
}

#[test]
fn test_start_without_stop_event() {
    let (mut controller, adapter) = controller(linear(3));
    adapter.set_stall(true);
    let outcome = controller.start(None);
    assert!(outcome.success);
    assert_eq!(outcome.payload.unwrap()["status"], "noNewState");
    assert!(controller.is_live());
    assert!(controller.history().is_empty());

    // adapter dies before the program ever stops
    adapter.kill();
    assert!(!controller.get_state().success);
    assert!(!controller.is_live());
}

#[test]
fn test_step_timeout_is_soft() {
    let (mut controller, adapter) = controller(linear(5));
    controller.start(None);
    adapter.set_stall(true);

    let outcome = controller.step_over();
    assert!(outcome.success);
    assert!(outcome.snapshot.is_none());
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["status"], "noNewState");
    assert!(payload["reason"].as_str().unwrap().contains("no stop event"));
    assert!(controller.is_live());
    assert_eq!(controller.history().len(), 1);
}

#[test]
fn test_missing_source_is_not_fatal() {
    let adapter = FakeAdapter::new(linear(5));
    let mut controller = Controller::new(Box::new(adapter), crate::common::test_config())
        .with_source_reader(Box::new(NoSource));

    let outcome = controller.start(Some(Path::new(PROGRAM)));
    assert!(outcome.success);
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.line(), 1);
    assert!(snapshot.excerpt.is_none());
}

#[test]
fn test_get_state() {
    let (mut controller, _) = controller(linear(5));
    controller.start(None);
    controller.step_over();

    let outcome = controller.get_state();
    assert!(outcome.success);
    assert_eq!(line_of(&outcome), Some(2));
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["historyLength"], 2);
    assert_eq!(payload["canStepBack"], true);
    // inspection does not grow history
    assert_eq!(controller.history().len(), 2);
}

#[test]
fn test_evaluate() {
    let (mut controller, _) = controller(linear(5));
    controller.start(None);
    controller.step_over();

    let outcome = controller.evaluate("line");
    assert!(outcome.success);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["result"], "2");
    assert_eq!(payload["type"], "int");

    let outcome = controller.evaluate("x");
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("name 'x' is not defined"));
    // a failed evaluation keeps the session
    assert!(controller.is_live());
}

#[test]
fn test_stop_ends_session() {
    let (mut controller, _) = controller(linear(5));
    controller.start(None);
    controller.step_over();

    assert!(controller.stop().success);
    assert!(!controller.is_live());
    assert!(controller.history().is_empty());
    assert_eq!(controller.state(), SessionState::Ended);
    assert!(controller.stop().success);
}
