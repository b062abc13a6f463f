use crate::common::{call, controller, line_of, linear, top};
use std::path::PathBuf;
use stepback::controller::SessionState;

#[test]
fn test_history_grows_by_one_per_step() {
    let (mut controller, _) = controller(linear(10));
    controller.start(None);

    for n in 1..=6 {
        let outcome = controller.step_over();
        assert!(outcome.success);
        assert_eq!(line_of(&outcome), Some(n + 1));
        assert_eq!(controller.history().len(), 1 + n as usize);
        assert!(controller.can_step_back());
    }
}

#[test]
fn test_step_into_and_out() {
    let trace = vec![
        top(1),
        top(2),
        call(10, "helper"),
        call(11, "helper"),
        top(3),
        top(4),
    ];
    let (mut controller, _) = controller(trace);
    controller.start(None);
    assert_eq!(line_of(&controller.step_over()), Some(2));

    let outcome = controller.step_into();
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.line(), 10);
    assert_eq!(snapshot.location.function, "helper");
    // innermost frame first, caller last
    assert_eq!(snapshot.frames.len(), 2);
    assert_eq!(snapshot.frames[0].name, "helper");
    assert_eq!(snapshot.frames[1].line, 2);

    let outcome = controller.step_out();
    assert_eq!(line_of(&outcome), Some(3));
    assert_eq!(controller.history().len(), 4);
}

#[test]
fn test_step_over_skips_call() {
    let trace = vec![
        top(1),
        top(2),
        call(10, "helper"),
        call(11, "helper"),
        top(3),
    ];
    let (mut controller, _) = controller(trace);
    controller.start(None);
    controller.step_over();

    assert_eq!(line_of(&controller.step_over()), Some(3));
}

#[test]
fn test_continue_to_breakpoint() {
    let (mut controller, adapter) = controller(linear(8));

    let outcome = controller.set_breakpoints(&PathBuf::from("prog.py"), &[4]);
    assert!(outcome.success);
    assert_eq!(outcome.payload.as_ref().unwrap()["pending"], true);

    controller.start(None);
    assert_eq!(adapter.breakpoints("prog.py"), vec![4]);

    let outcome = controller.continue_execution();
    assert_eq!(line_of(&outcome), Some(4));
    assert_eq!(controller.history().len(), 2);

    let outcome = controller.continue_execution();
    assert!(outcome.success);
    assert_eq!(outcome.payload.unwrap()["status"], "ended");
    assert!(!controller.is_live());
    assert!(!outcome.target_complete);
}

#[test]
fn test_continue_to_line() {
    let (mut controller, adapter) = controller(linear(8));
    controller.set_breakpoints(&PathBuf::from("prog.py"), &[7]);
    controller.start(None);

    let outcome = controller.continue_to_line(5);
    assert!(outcome.success);
    assert_eq!(line_of(&outcome), Some(5));
    // temporary breakpoint is gone, the user one stays
    assert_eq!(adapter.breakpoints("prog.py"), vec![7]);

    assert_eq!(line_of(&controller.continue_execution()), Some(7));
}

#[test]
fn test_continue_to_user_breakpoint_line() {
    let (mut controller, adapter) = controller(linear(8));
    controller.set_breakpoints(&PathBuf::from("prog.py"), &[5]);
    controller.start(None);

    assert_eq!(line_of(&controller.continue_to_line(5)), Some(5));
    assert_eq!(adapter.breakpoints("prog.py"), vec![5]);
}

#[test]
fn test_state_transitions() {
    let (mut controller, adapter) = controller(linear(4));
    assert_eq!(controller.state(), SessionState::Idle);
    controller.start(None);
    assert_eq!(controller.state(), SessionState::Stopped);

    adapter.set_stall(true);
    controller.step_over();
    assert_eq!(controller.state(), SessionState::Running);

    controller.stop();
    assert_eq!(controller.state(), SessionState::Ended);
}
