//! Execution history and replay-based step back.
//!
//! Adapters can only step forward, so going back means: forget the latest snapshot,
//! restart the program and step over until the line of the (new) latest snapshot is reached.
//! This assumes the program takes the same path on every run.

use crate::controller::sync::StopOutcome;
use crate::controller::{Controller, StepKind};
use crate::controller::snapshot::Snapshot;
use crate::error::Error;
use log::{debug, info, warn};

/// Ordered snapshots of the current session. Index 0 is the entry snapshot.
#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    capacity: usize,
}

/// History of a session that is already over.
pub(super) static ENDED: History = History {
    entries: Vec::new(),
    capacity: 2,
};

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![],
            capacity: capacity.max(2),
        }
    }

    /// Append a snapshot. When full, the oldest snapshot after the entry one is evicted.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.entries.push(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.remove(1);
        }
    }

    pub fn can_step_back(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn pop_latest(&mut self) -> Option<Snapshot> {
        self.entries.pop()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

impl Controller {
    /// Go back to the previous recorded location by replaying the program.
    pub(super) fn replay_back(&mut self) -> Result<Snapshot, Error> {
        let session = self.require_session()?.clone();
        if !self.history.can_step_back() {
            return Err(Error::AtBeginning);
        }

        self.history.pop_latest();
        let target_line = self
            .history
            .latest()
            .map(Snapshot::line)
            .ok_or(Error::AtBeginning)?;
        let targeted = self.range.is_some();
        info!(target: "replay", "replay {} up to line {target_line}", session.target.display());

        self.teardown();
        let first = match self.launch_replay(&session.target, targeted) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.abandon_replay();
                return Err(e);
            }
        };
        if let StopOutcome::Terminated = first {
            self.abandon_replay();
            return Err(Error::ReplayExhausted {
                target_line,
                reached: None,
            });
        }

        let mut reached = self.assembler()?.location().ok().map(|loc| loc.line);
        let mut steps = 0;
        while reached.map_or(true, |line| line < target_line) {
            if steps == self.config.replay.max_steps {
                warn!(target: "replay", "replay ceiling of {steps} steps hit");
                self.abandon_replay();
                return Err(Error::ReplayExhausted {
                    target_line,
                    reached,
                });
            }
            steps += 1;

            let outcome = match self.drive(StepKind::Over, self.config.timeouts.step()) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.abandon_replay();
                    return Err(e);
                }
            };
            match outcome {
                StopOutcome::Stopped { thread_id, .. } => {
                    self.on_stopped(thread_id);
                    reached = self.assembler()?.location().ok().map(|loc| loc.line);
                    debug!(target: "replay", "replay step {steps}: line {reached:?}");
                }
                StopOutcome::TimedOut if self.transport.is_active() => {
                    debug!(target: "replay", "replay step {steps} timed out, retry");
                }
                StopOutcome::TimedOut | StopOutcome::Terminated => {
                    self.abandon_replay();
                    return Err(Error::ReplayExhausted {
                        target_line,
                        reached,
                    });
                }
            }
        }

        info!(target: "replay", "replay reached line {target_line} in {steps} steps");
        self.assembler()?.capture()
    }

    /// Replay could not reach its target: the session is over, the shortened history stays.
    fn abandon_replay(&mut self) {
        self.teardown();
        self.clear_range();
    }
}
