use crate::common::{controller, controller_with, line_of, linear, test_config, top};
use stepback::controller::{LineRange, SessionState};

#[test]
fn test_step_back_scenario() {
    let (mut controller, adapter) = controller(linear(5));
    let outcome = controller.start(None);
    assert_eq!(line_of(&outcome), Some(1));
    assert_eq!(controller.history().len(), 1);

    for _ in 0..3 {
        controller.step_over();
    }
    assert_eq!(controller.history().len(), 4);
    assert_eq!(controller.history().latest().map(|s| s.line()), Some(4));

    let outcome = controller.step_back();
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(line_of(&outcome), Some(3));
    assert_eq!(controller.history().len(), 3);
    assert_eq!(adapter.launches(), 2);
    assert!(controller.is_live());

    // replayed state is the current one
    assert_eq!(line_of(&controller.get_state()), Some(3));
    // and stepping goes on from there
    assert_eq!(line_of(&controller.step_over()), Some(4));
    assert_eq!(controller.history().len(), 4);
}

#[test]
fn test_step_back_at_beginning() {
    let (mut controller, adapter) = controller(linear(5));
    controller.start(None);

    let outcome = controller.step_back();
    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("already at the beginning of the recorded history")
    );
    assert_eq!(adapter.launches(), 1);
    assert_eq!(controller.history().len(), 1);
    assert!(controller.is_live());
}

#[test]
fn test_step_back_until_beginning_terminates() {
    let (mut controller, _) = controller(linear(10));
    controller.start(None);
    for _ in 0..6 {
        controller.step_over();
    }

    let mut expected_line = 6;
    while controller.can_step_back() {
        let before = controller.history().len();
        let outcome = controller.step_back();
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(controller.history().len(), before - 1);
        assert_eq!(line_of(&outcome), Some(expected_line));
        expected_line -= 1;
    }
    assert_eq!(controller.history().len(), 1);
    assert!(!controller.step_back().success);
}

#[test]
fn test_replay_exhausted_when_program_changes() {
    let (mut controller, adapter) = controller(linear(10));
    controller.start(None);
    for _ in 0..5 {
        controller.step_over();
    }
    assert_eq!(controller.history().len(), 6);

    // the program takes a shorter path on the next run
    adapter.relaunch_with(linear(3));
    let outcome = controller.step_back();
    assert!(!outcome.success);
    assert!(outcome
        .error
        .unwrap()
        .starts_with("program ended before replay reached line 5"));
    assert!(!controller.is_live());
    // history keeps its shortened form
    assert_eq!(controller.history().len(), 5);
}

#[test]
fn test_replay_ceiling() {
    let mut config = test_config();
    config.replay.max_steps = 3;
    let (mut controller, adapter) = controller_with(linear(10), config);
    controller.start(None);
    for _ in 0..6 {
        controller.step_over();
    }

    let outcome = controller.step_back();
    assert!(!outcome.success);
    assert!(!controller.is_live());
    assert!(outcome
        .error
        .unwrap()
        .starts_with("program ended before replay reached line 6"));
    // six forward steps, then exactly `max_steps` replay steps
    assert_eq!(adapter.count_requests("next"), 6 + 3);
    assert_eq!(controller.history().len(), 6);
}

#[test]
fn test_targeted_replay_reinstalls_range() {
    let (mut controller, adapter) = controller(linear(25));
    controller.start_targeted(None, 10, 15);
    for _ in 0..3 {
        controller.step_over();
    }
    assert_eq!(controller.history().len(), 4);

    let outcome = controller.step_back();
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(line_of(&outcome), Some(12));
    assert_eq!(outcome.range, Some(LineRange { start: 10, end: 15 }));
    assert_eq!(adapter.stop_on_entry(), vec![false, false]);
    assert_eq!(adapter.breakpoints("prog.py"), (10..=15).collect::<Vec<_>>());
    assert_eq!(controller.history().len(), 3);
}

#[test]
fn test_replay_stops_at_first_occurrence() {
    // loop body on lines 2..=3 runs twice
    let trace = [1, 2, 3, 2, 3, 4].into_iter().map(top).collect();
    let (mut controller, _) = controller(trace);
    controller.start(None);
    for _ in 0..4 {
        controller.step_over();
    }
    assert_eq!(controller.history().latest().map(|s| s.line()), Some(3));

    let outcome = controller.step_back();
    assert_eq!(line_of(&outcome), Some(2));
    assert_eq!(controller.history().len(), 4);
}

#[test]
fn test_replay_survives_stalled_step() {
    let (mut controller, adapter) = controller(linear(6));
    controller.start(None);
    for _ in 0..3 {
        controller.step_over();
    }
    assert_eq!(controller.history().len(), 4);

    // first replay step gets no stop event, the retry does
    adapter.stall_steps(1);
    let outcome = controller.step_back();
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(line_of(&outcome), Some(3));
    assert!(controller.is_live());
    assert_eq!(controller.history().len(), 3);
    // three forward steps, one stalled replay step, two replay steps
    assert_eq!(adapter.count_requests("next"), 3 + 1 + 2);
}

#[test]
fn test_replay_transport_error_ends_session() {
    let (mut controller, adapter) = controller(linear(6));
    controller.start(None);
    for _ in 0..3 {
        controller.step_over();
    }

    adapter.set_fail_steps(true);
    let outcome = controller.step_back();
    assert!(!outcome.success);
    assert!(outcome
        .error
        .unwrap()
        .contains("adapter connection lost"));
    assert_eq!(adapter.launches(), 2);
    assert!(!controller.is_live());
    assert_eq!(controller.state(), SessionState::Ended);
    assert_eq!(outcome.range, None);
    // history keeps its shortened form
    assert_eq!(controller.history().len(), 3);
}
