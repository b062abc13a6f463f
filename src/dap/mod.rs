//! Debug adapter protocol side of the controller: wire types, framing and the
//! [`Transport`] abstraction over a running adapter.

pub mod client;
pub mod protocol;
pub mod tracer;
pub mod transport;

pub use client::{ClientOptions, DapClient};
pub use protocol::AdapterEvent;

use crate::config::LaunchConfig;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Callback receiving adapter events. Invoked from a transport-owned thread.
pub type EventSink = Arc<dyn Fn(AdapterEvent) + Send + Sync>;

/// All breakpoint lines of a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBreakpoints {
    pub path: PathBuf,
    pub lines: Vec<u32>,
}

impl SourceBreakpoints {
    /// Arguments of a DAP `setBreakpoints` request.
    pub fn to_arguments(&self) -> Value {
        serde_json::json!({
            "source": { "path": self.path },
            "breakpoints": self.lines.iter().map(|line| serde_json::json!({ "line": line })).collect::<Vec<_>>(),
        })
    }
}

/// Everything an adapter needs to start a program.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub config: LaunchConfig,
    pub program: PathBuf,
    pub stop_on_entry: bool,
    /// Breakpoints installed before the program starts running.
    pub breakpoints: Vec<SourceBreakpoints>,
}

impl LaunchRequest {
    /// Arguments of a DAP `launch` request.
    pub fn to_arguments(&self) -> Value {
        let mut args = self.config.adapter.launch.clone();
        args.insert("program".into(), Value::from(self.program.to_string_lossy()));
        args.insert("stopOnEntry".into(), Value::Bool(self.stop_on_entry));
        if let Some(cwd) = self.program.parent().filter(|p| !p.as_os_str().is_empty()) {
            args.entry("cwd")
                .or_insert_with(|| Value::from(cwd.to_string_lossy()));
        }
        Value::Object(args)
    }
}

/// Request/event channel to a debug adapter.
pub trait Transport: Send + Sync {
    /// Start an adapter and the program. Adapter events are delivered into `events` until
    /// the next launch or shutdown.
    fn launch(&self, request: &LaunchRequest, events: EventSink) -> anyhow::Result<()>;

    /// Send a request and wait for its response. Return the response body,
    /// an unsuccessful response is an error with the adapter message.
    fn request(&self, command: &str, arguments: Value) -> anyhow::Result<Value>;

    /// True if an adapter session is running.
    fn is_active(&self) -> bool;

    /// Stop adapter and program, never fails.
    fn shutdown(&self);
}
