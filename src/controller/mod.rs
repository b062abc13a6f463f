//! Debug session controller.
//!
//! Drives one adapter session at a time: start/stop, stepping, inspection,
//! range-targeted execution and replay-based step back. Every public operation
//! returns an [`Outcome`], errors never escape as panics or `Err`.
//!
//! Operations take `&mut self`, so a controller can't be driven concurrently;
//! wrap it into a mutex to share it between threads.

pub mod breakpoint;
pub mod history;
pub mod range;
pub mod session;
pub mod snapshot;
pub mod sync;

pub use breakpoint::{Breakpoint, BreakpointStore, Owner};
pub use history::History;
pub use range::{LineRange, TargetedRange};
pub use session::{Session, SessionState};
pub use snapshot::{Frame, Location, Snapshot, SourceExcerpt, Variable};

use crate::config::Config;
use crate::controller::snapshot::Assembler;
use crate::controller::sync::{StopOutcome, StopSynchronizer};
use crate::dap::Transport;
use crate::error::Error;
use crate::source::{absolute_path, FsSourceReader, SourceReader};
use crate::weak_error;
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Uniform result of every controller operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    /// The operation stepped out of the targeted range.
    pub target_complete: bool,
    /// Targeted range still active after the operation.
    pub range: Option<LineRange>,
}

impl Outcome {
    fn ok() -> Self {
        Self {
            success: true,
            payload: None,
            error: None,
            snapshot: None,
            target_complete: false,
            range: None,
        }
    }

    fn with_payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::ok()
        }
    }

    fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Self::ok()
        }
    }

    fn failure(e: &Error) -> Self {
        Self {
            success: false,
            error: Some(e.to_string()),
            ..Self::ok()
        }
    }

    fn from_step(step: Step) -> Self {
        match step {
            Step::Stopped(snapshot) => Self::with_snapshot(snapshot),
            Step::NoNewState(timeout) => Self::with_payload(json!({
                "status": "noNewState",
                "reason": Error::Timeout(timeout).to_string(),
            })),
            Step::Ended => Self::with_payload(json!({ "status": "ended" })),
        }
    }
}

/// Kind of forward execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Over,
    Into,
    Out,
    Continue,
}

impl StepKind {
    fn command(self) -> &'static str {
        match self {
            StepKind::Over => "next",
            StepKind::Into => "stepIn",
            StepKind::Out => "stepOut",
            StepKind::Continue => "continue",
        }
    }
}

/// What a forward execution request led to.
#[derive(Debug)]
pub(crate) enum Step {
    /// Program paused, snapshot is recorded.
    Stopped(Snapshot),
    /// No stop event within the timeout, program is probably still running.
    NoNewState(Duration),
    /// Program finished, session is over.
    Ended,
}

pub struct Controller {
    transport: Box<dyn Transport>,
    source: Box<dyn SourceReader>,
    config: Config,
    sync: StopSynchronizer,
    default_target: Option<PathBuf>,
    session: Option<Session>,
    state: SessionState,
    history: History,
    range: Option<TargetedRange>,
    breakpoints: BreakpointStore,
}

impl Controller {
    pub fn new(transport: Box<dyn Transport>, config: Config) -> Self {
        Self {
            transport,
            source: Box::new(FsSourceReader),
            history: History::new(config.history.capacity),
            config,
            sync: StopSynchronizer::default(),
            default_target: None,
            session: None,
            state: SessionState::Idle,
            range: None,
            breakpoints: BreakpointStore::default(),
        }
    }

    pub fn with_source_reader(self, source: Box<dyn SourceReader>) -> Self {
        Self { source, ..self }
    }

    /// Program used when an operation gets no explicit target.
    pub fn set_default_target(&mut self, target: Option<PathBuf>) {
        self.default_target = target;
    }

    /// Start a session stopped at the program entry.
    pub fn start(&mut self, target: Option<&Path>) -> Outcome {
        self.reap();
        let result = self.start_session(target).map(Outcome::from_step);
        self.respond(result)
    }

    /// Start a session that runs freely until it reaches `[start, end]`.
    pub fn start_targeted(&mut self, target: Option<&Path>, start: u32, end: u32) -> Outcome {
        self.reap();
        let result = self
            .start_range(target, LineRange { start, end })
            .map(Outcome::from_step);
        self.respond(result)
    }

    /// Drop the targeted range, if any. Never fails.
    pub fn clear_targeted(&mut self) -> Outcome {
        self.reap();
        self.clear_range();
        self.respond(Ok(Outcome::ok()))
    }

    /// Replace the user breakpoints of a file.
    pub fn set_breakpoints(&mut self, file: &Path, lines: &[u32]) -> Outcome {
        self.reap();
        let result = self.replace_user_breakpoints(file, lines);
        self.respond(result.map(Outcome::with_payload))
    }

    pub fn step_over(&mut self) -> Outcome {
        self.reap();
        let result = self.step(StepKind::Over);
        self.respond(result)
    }

    pub fn step_into(&mut self) -> Outcome {
        self.reap();
        let result = self.step(StepKind::Into);
        self.respond(result)
    }

    pub fn step_out(&mut self) -> Outcome {
        self.reap();
        let result = self.step(StepKind::Out);
        self.respond(result)
    }

    pub fn continue_execution(&mut self) -> Outcome {
        self.reap();
        let result = self.step(StepKind::Continue);
        self.respond(result)
    }

    /// Continue until `line` of the session program (or another stop).
    pub fn continue_to_line(&mut self, line: u32) -> Outcome {
        self.reap();
        let result = self.run_to_line(line);
        self.respond(result)
    }

    /// Return to the previous recorded location by replaying the program.
    pub fn step_back(&mut self) -> Outcome {
        self.reap();
        let result = self.replay_back().map(Outcome::with_snapshot);
        self.respond(result)
    }

    /// Snapshot of the current state, not recorded into history.
    pub fn get_state(&mut self) -> Outcome {
        self.reap();
        let result = self.require_session().and_then(|_| {
            let snapshot = self.assembler()?.capture()?;
            Ok(Outcome {
                payload: Some(json!({
                    "historyLength": self.history.len(),
                    "canStepBack": self.history.can_step_back(),
                })),
                ..Outcome::with_snapshot(snapshot)
            })
        });
        self.respond(result)
    }

    /// Evaluate an expression in the innermost frame.
    pub fn evaluate(&mut self, expression: &str) -> Outcome {
        self.reap();
        let result = self.evaluate_expression(expression);
        self.respond(result.map(Outcome::with_payload))
    }

    /// Stop the session. Safe to call without a session.
    pub fn stop(&mut self) -> Outcome {
        self.reap();
        self.end_session();
        self.respond(Ok(Outcome::ok()))
    }

    pub fn can_step_back(&self) -> bool {
        self.is_live() && self.history.can_step_back()
    }

    pub fn history(&self) -> &History {
        if self.is_dead() {
            return &history::ENDED;
        }
        &self.history
    }

    pub fn state(&self) -> SessionState {
        if self.is_dead() {
            return SessionState::Ended;
        }
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.session.is_some() && !self.is_dead()
    }

    /// Currently active targeted range.
    pub fn range(&self) -> Option<LineRange> {
        if self.is_dead() {
            return None;
        }
        self.range.as_ref().map(|targeted| targeted.range)
    }

    /// Program terminated on its own and the next operation has not cleaned up yet.
    /// Accessors already report the session as over.
    fn is_dead(&self) -> bool {
        self.session.is_some() && self.sync.is_terminated()
    }

    /// Drain program output collected since the last call.
    pub fn take_output(&self) -> Vec<String> {
        self.sync.take_output()
    }

    fn respond(&mut self, result: Result<Outcome, Error>) -> Outcome {
        let mut outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => {
                error!(target: "controller", "{e:#}, session is over");
                Outcome::failure(&e)
            }
            Err(e) => {
                warn!(target: "controller", "{e:#}");
                Outcome::failure(&e)
            }
        };
        outcome.range = self.range();
        outcome
    }

    fn assembler(&self) -> Result<Assembler<'_>, Error> {
        let session = self.require_session()?;
        Ok(Assembler {
            transport: self.transport.as_ref(),
            source: self.source.as_ref(),
            thread_id: session.thread_id,
            stack_depth: self.config.snapshot.stack_depth,
            excerpt_radius: self.config.snapshot.excerpt_radius,
        })
    }

    /// Issue a forward execution request and wait for the resulting stop.
    fn drive(&mut self, kind: StepKind, timeout: Duration) -> Result<StopOutcome, Error> {
        let thread_id = self.require_session()?.thread_id;
        let wait = self.sync.arm();
        self.state = SessionState::Running;
        if let Err(e) = self
            .transport
            .request(kind.command(), json!({ "threadId": thread_id }))
        {
            self.state = SessionState::Stopped;
            return Err(e.into());
        }
        Ok(wait.wait(timeout))
    }

    /// Turn a stop outcome into a [`Step`], record a snapshot on stop.
    fn settle(&mut self, outcome: StopOutcome, timeout: Duration) -> Result<Step, Error> {
        match outcome {
            StopOutcome::Stopped { reason, thread_id } => {
                debug!(target: "controller", "stopped: {reason}");
                self.on_stopped(thread_id);
                let snapshot = self.assembler()?.capture()?;
                self.history.record(snapshot.clone());
                Ok(Step::Stopped(snapshot))
            }
            StopOutcome::Terminated => {
                self.end_session();
                Ok(Step::Ended)
            }
            StopOutcome::TimedOut if !self.transport.is_active() => {
                self.end_session();
                Ok(Step::Ended)
            }
            StopOutcome::TimedOut => Ok(Step::NoNewState(timeout)),
        }
    }

    fn step(&mut self, kind: StepKind) -> Result<Outcome, Error> {
        self.require_session()?;
        let timeout = match kind {
            StepKind::Continue if self.range.is_some() => self.config.timeouts.targeted(),
            _ => self.config.timeouts.step(),
        };
        let outcome = self.drive(kind, timeout)?;
        self.after_step(outcome, timeout)
    }

    fn after_step(&mut self, outcome: StopOutcome, timeout: Duration) -> Result<Outcome, Error> {
        let had_range = self.range.is_some();
        let step = self.settle(outcome, timeout)?;
        let complete = match &step {
            Step::Stopped(snapshot) => self.check_range_exit(snapshot),
            Step::Ended => had_range,
            Step::NoNewState(_) => false,
        };
        Ok(Outcome {
            target_complete: complete,
            ..Outcome::from_step(step)
        })
    }

    fn run_to_line(&mut self, line: u32) -> Result<Outcome, Error> {
        let target = self.require_session()?.target.clone();
        let cursor = self.breakpoints.set(&target, &[line], Owner::Cursor);
        if let Err(e) = self.breakpoints.push(self.transport.as_ref(), &target) {
            self.breakpoints.remove(&cursor);
            return Err(e);
        }

        let timeout = self.config.timeouts.targeted();
        let outcome = self.drive(StepKind::Continue, timeout);

        self.breakpoints.remove(&cursor);
        if self.session.is_some() {
            weak_error!(
                self.breakpoints.push(self.transport.as_ref(), &target),
                "remove cursor breakpoint:"
            );
        }
        self.after_step(outcome?, timeout)
    }

    fn replace_user_breakpoints(&mut self, file: &Path, lines: &[u32]) -> Result<Value, Error> {
        let file = absolute_path(file);
        let previous = self.breakpoints.owned_by(&file, Owner::User);
        self.breakpoints.remove(&previous);
        let installed = self.breakpoints.set(&file, lines, Owner::User);

        if self.session.is_none() {
            return Ok(json!({ "breakpoints": installed, "pending": true }));
        }
        let body = self.breakpoints.push(self.transport.as_ref(), &file)?;
        Ok(json!({
            "breakpoints": body.get("breakpoints").cloned().unwrap_or(Value::Array(vec![])),
            "pending": false,
        }))
    }

    fn evaluate_expression(&self, expression: &str) -> Result<Value, Error> {
        let frame_id = self.assembler()?.top_frame_id()?;
        let body = self.transport.request(
            "evaluate",
            json!({ "expression": expression, "frameId": frame_id, "context": "repl" }),
        )?;
        Ok(json!({
            "result": body.get("result").cloned().unwrap_or(Value::Null),
            "type": body.get("type").cloned().unwrap_or(Value::Null),
        }))
    }
}
