//! Raw DAP traffic dump, enabled with `--trace-dap`.

use anyhow::Context;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToAdapter,
    FromAdapter,
}

impl Direction {
    fn arrow(self) -> &'static str {
        match self {
            Direction::ToAdapter => "->",
            Direction::FromAdapter => "<-",
        }
    }
}

/// Shared handle to a trace file. Every message becomes one `-> {..}` or `<- {..}` line.
#[derive(Clone)]
pub struct DapTrace {
    file: Arc<Mutex<File>>,
}

impl DapTrace {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open trace file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn record(&self, direction: Direction, message: &Value) {
        let mut file = self.file.lock().unwrap();
        // best effort
        _ = writeln!(file, "{} {message}", direction.arrow());
    }
}
