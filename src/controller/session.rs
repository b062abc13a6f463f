use crate::controller::sync::StopOutcome;
use crate::controller::{Controller, Step};
use crate::dap::protocol::ThreadsBody;
use crate::dap::LaunchRequest;
use crate::error::Error;
use crate::muted_error;
use crate::source::absolute_path;
use log::info;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Used until an adapter reports the real thread.
const DEFAULT_THREAD_ID: i64 = 1;

/// One live run of a target program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub target: PathBuf,
    /// The single thread of interest.
    pub thread_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Nothing started yet.
    Idle,
    /// Program runs, no stop observed since the last request.
    Running,
    /// Program paused and can be inspected.
    Stopped,
    /// Last session is over.
    Ended,
}

impl Controller {
    /// Program to run, absolute so it matches the paths adapters report.
    pub(super) fn resolve_target(&self, target: Option<&Path>) -> Result<PathBuf, Error> {
        target
            .or(self.session.as_ref().map(|s| s.target.as_path()))
            .or(self.default_target.as_deref())
            .map(absolute_path)
            .ok_or(Error::NoTarget)
    }

    pub(super) fn start_session(&mut self, target: Option<&Path>) -> Result<Step, Error> {
        let target = self.resolve_target(target)?;
        self.end_session();

        let timeout = self.config.timeouts.start();
        let outcome = self.launch(&target, true, timeout)?;
        self.settle(outcome, timeout)
    }

    /// Start an adapter and the program, wait for the first stop.
    pub(super) fn launch(
        &mut self,
        target: &Path,
        stop_on_entry: bool,
        timeout: Duration,
    ) -> Result<StopOutcome, Error> {
        let config = self.config.resolve(target).ok_or_else(|| {
            Error::LaunchFailed(format!("no debug adapter configured for {}", target.display()))
        })?;
        let request = LaunchRequest {
            config,
            program: target.to_path_buf(),
            stop_on_entry,
            breakpoints: self.breakpoints.sources(),
        };

        let events = self.sync.open_epoch();
        let wait = self.sync.arm();
        if let Err(e) = self.transport.launch(&request, events) {
            self.sync.close_epoch();
            self.transport.shutdown();
            return Err(Error::LaunchFailed(format!("{e:#}")));
        }

        info!(target: "controller", "session started: {}", target.display());
        self.session = Some(Session {
            target: target.to_path_buf(),
            thread_id: DEFAULT_THREAD_ID,
        });
        self.state = SessionState::Running;
        Ok(wait.wait(timeout))
    }

    /// Relaunch for a replay, history is kept as is.
    pub(super) fn launch_replay(
        &mut self,
        target: &Path,
        targeted: bool,
    ) -> Result<StopOutcome, Error> {
        let timeout = if targeted {
            self.config.timeouts.targeted()
        } else {
            self.config.timeouts.start()
        };
        let outcome = self.launch(target, !targeted, timeout)?;
        if let StopOutcome::Stopped { thread_id, .. } = &outcome {
            self.on_stopped(*thread_id);
        }
        Ok(outcome)
    }

    pub(super) fn on_stopped(&mut self, thread_id: Option<i64>) {
        let thread_id = thread_id.or_else(|| self.first_thread());
        if let Some(session) = self.session.as_mut() {
            if let Some(id) = thread_id {
                session.thread_id = id;
            }
        }
        self.state = SessionState::Stopped;
    }

    fn first_thread(&self) -> Option<i64> {
        let body = muted_error!(self.transport.request("threads", json!({})))?;
        let threads: ThreadsBody = muted_error!(serde_json::from_value(body))?;
        threads.threads.first().map(|t| t.id)
    }

    pub(super) fn require_session(&self) -> Result<&Session, Error> {
        self.session.as_ref().ok_or(Error::NoSession)
    }

    /// Close adapter and forget the session. History and range are left untouched.
    pub(super) fn teardown(&mut self) {
        self.sync.close_epoch();
        self.transport.shutdown();
        if self.session.take().is_some() {
            self.state = SessionState::Ended;
        }
    }

    /// Session is over: adapter closed, range and history dropped.
    pub(super) fn end_session(&mut self) {
        if let Some(session) = &self.session {
            info!(target: "controller", "session ended: {}", session.target.display());
        }
        self.clear_range();
        self.teardown();
        self.history.clear();
    }

    /// Process a termination the adapter reported between operations.
    pub(super) fn reap(&mut self) {
        if self.sync.take_terminated() && self.session.is_some() {
            info!(target: "controller", "program terminated");
            self.end_session();
        }
    }
}
