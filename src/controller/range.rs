use crate::controller::breakpoint::{Breakpoint, Owner};
use crate::controller::snapshot::Snapshot;
use crate::controller::{Controller, Step};
use crate::error::Error;
use crate::source::same_source;
use crate::weak_error;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Inclusive line interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn lines(&self) -> Vec<u32> {
        (self.start..=self.end).collect()
    }
}

/// Scope of a targeted execution: the session should pause on every line of `range`
/// inside `file`.
#[derive(Debug, Clone)]
pub struct TargetedRange {
    pub file: PathBuf,
    pub range: LineRange,
    /// Breakpoints installed to cover the range, removed on exit.
    pub installed: Vec<Breakpoint>,
}

impl TargetedRange {
    /// True when the snapshot stepped past the end of the range.
    /// Reaching the last line itself is still in range.
    pub fn is_exited_by(&self, snapshot: &Snapshot) -> bool {
        snapshot.line() > self.range.end && same_source(snapshot.file(), &self.file)
    }
}

impl Controller {
    /// Arm a range on the target file and run until the first stop inside it.
    pub(super) fn start_range(
        &mut self,
        target: Option<&Path>,
        range: LineRange,
    ) -> Result<Step, Error> {
        if range.start == 0 || range.start > range.end {
            return Err(Error::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let target = self.resolve_target(target)?;
        self.end_session();

        self.breakpoints.clear_file(&target);
        let installed = self.breakpoints.set(&target, &range.lines(), Owner::Range);
        self.range = Some(TargetedRange {
            file: target.clone(),
            range,
            installed,
        });
        info!(
            target: "controller",
            "targeted run of {} on lines {}..={}",
            target.display(),
            range.start,
            range.end
        );

        let timeout = self.config.timeouts.targeted();
        let outcome = match self.launch(&target, false, timeout) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.clear_range();
                return Err(e);
            }
        };
        self.settle(outcome, timeout)
    }

    /// Clear the range if the snapshot is past its end. Return true if so.
    pub(super) fn check_range_exit(&mut self, snapshot: &Snapshot) -> bool {
        let exited = self
            .range
            .as_ref()
            .is_some_and(|targeted| targeted.is_exited_by(snapshot));
        if exited {
            info!(target: "controller", "targeted range exited at line {}", snapshot.line());
            self.clear_range();
        }
        exited
    }

    /// Remove range breakpoints and forget the range. Idempotent.
    pub(super) fn clear_range(&mut self) {
        let Some(targeted) = self.range.take() else {
            return;
        };
        self.breakpoints.remove(&targeted.installed);
        if self.session.is_some() {
            weak_error!(
                self.breakpoints.push(self.transport.as_ref(), &targeted.file),
                "remove range breakpoints:"
            );
        }
    }
}
