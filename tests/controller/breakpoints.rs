use crate::common::{controller, linear};
use std::path::Path;

#[test]
fn test_set_breakpoints_replaces_user_lines() {
    let (mut controller, adapter) = controller(linear(10));
    controller.start(None);

    let outcome = controller.set_breakpoints(Path::new("prog.py"), &[3, 5]);
    assert!(outcome.success);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["pending"], false);
    assert_eq!(payload["breakpoints"].as_array().unwrap().len(), 2);
    assert_eq!(payload["breakpoints"][0]["verified"], true);
    assert_eq!(adapter.breakpoints("prog.py"), vec![3, 5]);

    controller.set_breakpoints(Path::new("prog.py"), &[6]);
    assert_eq!(adapter.breakpoints("prog.py"), vec![6]);

    controller.set_breakpoints(Path::new("prog.py"), &[]);
    assert!(adapter.breakpoints("prog.py").is_empty());
}

#[test]
fn test_breakpoints_survive_restart() {
    let (mut controller, adapter) = controller(linear(10));
    controller.set_breakpoints(Path::new("prog.py"), &[8]);
    controller.start(None);
    controller.stop();

    controller.start(None);
    assert_eq!(adapter.breakpoints("prog.py"), vec![8]);
    assert_eq!(
        controller.continue_execution().snapshot.map(|s| s.line()),
        Some(8)
    );
}

#[test]
fn test_pending_breakpoints_listed() {
    let (mut controller, _) = controller(linear(10));
    let outcome = controller.set_breakpoints(Path::new("other.py"), &[1, 2, 2]);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload["pending"], true);
    let lines: Vec<_> = payload["breakpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|bp| bp["line"].as_u64().unwrap())
        .collect();
    assert_eq!(lines, vec![1, 2]);
    assert_eq!(payload["breakpoints"][0]["owner"], "user");
}
