//! Bridges asynchronous adapter events into a blocking "wait until stopped" primitive.
//!
//! There is a single waiter slot: arming a new wait replaces (and thereby cancels) the
//! previous one. Each launch opens a new epoch, events produced by an adapter of a
//! previous epoch are dropped.

use crate::dap::{AdapterEvent, EventSink};
use log::{debug, info};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Program output kept when nobody drains it.
const OUTPUT_LIMIT: usize = 1024;

/// Result of a wait for a stop event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Program paused and can be inspected.
    Stopped {
        reason: String,
        thread_id: Option<i64>,
    },
    /// Program (or adapter) finished.
    Terminated,
    /// No event within the timeout.
    TimedOut,
}

#[derive(Default)]
struct Shared {
    epoch: u64,
    waiter: Option<SyncSender<StopOutcome>>,
    terminated: bool,
    output: VecDeque<String>,
}

#[derive(Default, Clone)]
pub struct StopSynchronizer {
    shared: Arc<Mutex<Shared>>,
}

impl StopSynchronizer {
    /// Start a new epoch and return the event sink for the adapter of this epoch.
    pub fn open_epoch(&self) -> EventSink {
        let epoch = {
            let mut shared = self.shared.lock().unwrap();
            shared.epoch += 1;
            shared.waiter = None;
            shared.terminated = false;
            shared.epoch
        };
        let sync = self.clone();
        Arc::new(move |event| sync.notify(epoch, event))
    }

    /// Drop the current epoch, events of a closed adapter are ignored from now on.
    pub fn close_epoch(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.epoch += 1;
        shared.waiter = None;
        shared.terminated = false;
    }

    /// Arm the waiter slot. Must be called before a request that may produce a stop event.
    pub fn arm(&self) -> StopWait {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut shared = self.shared.lock().unwrap();
        if shared.waiter.replace(tx).is_some() {
            debug!(target: "controller", "replace pending stop waiter");
        }
        StopWait { rx }
    }

    /// Return true (once) if the program terminated since the last call.
    pub fn take_terminated(&self) -> bool {
        std::mem::take(&mut self.shared.lock().unwrap().terminated)
    }

    /// Like [`Self::take_terminated`] but leaves the flag for the next operation to process.
    pub fn is_terminated(&self) -> bool {
        self.shared.lock().unwrap().terminated
    }

    /// Drain collected program output.
    pub fn take_output(&self) -> Vec<String> {
        self.shared.lock().unwrap().output.drain(..).collect()
    }

    fn notify(&self, epoch: u64, event: AdapterEvent) {
        let mut shared = self.shared.lock().unwrap();
        if shared.epoch != epoch {
            debug!(target: "controller", "drop stale event {event:?}");
            return;
        }

        match event {
            AdapterEvent::Stopped { reason, thread_id } => match shared.waiter.take() {
                Some(waiter) => {
                    let _ = waiter.try_send(StopOutcome::Stopped { reason, thread_id });
                }
                None => debug!(target: "controller", "stop event ({reason}) without waiter"),
            },
            AdapterEvent::Exited { code } => {
                info!(target: "controller", "program exited with code {code}");
                Self::terminate(&mut shared);
            }
            AdapterEvent::Terminated => Self::terminate(&mut shared),
            AdapterEvent::Output { category, output } => {
                if category != "telemetry" {
                    info!(target: "debuggee", "{}", output.trim_end());
                    if shared.output.len() == OUTPUT_LIMIT {
                        shared.output.pop_front();
                    }
                    shared.output.push_back(output);
                }
            }
            AdapterEvent::Continued | AdapterEvent::Initialized => {}
        }
    }

    fn terminate(shared: &mut Shared) {
        shared.terminated = true;
        if let Some(waiter) = shared.waiter.take() {
            let _ = waiter.try_send(StopOutcome::Terminated);
        }
    }
}

/// Pending wait for the next stop event.
pub struct StopWait {
    rx: Receiver<StopOutcome>,
}

impl StopWait {
    /// Block until a stop (or termination) event arrives, or the timeout expires.
    pub fn wait(self, timeout: Duration) -> StopOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => StopOutcome::TimedOut,
            // slot was replaced or the epoch closed
            Err(RecvTimeoutError::Disconnected) => StopOutcome::TimedOut,
        }
    }
}
