//! DAP message framing.
//! Works on top of any byte stream (adapter stdio pipes or TCP socket).

use crate::dap::tracer::{DapTrace, Direction};
use anyhow::anyhow;
use serde_json::Value;
use std::io::{BufRead, Read, Write};

/// Reads `Content-Length` framed DAP messages.
pub struct MessageReader<R> {
    reader: R,
    tracer: Option<DapTrace>,
}

impl<R: BufRead> MessageReader<R> {
    pub fn new(reader: R, tracer: Option<DapTrace>) -> Self {
        Self { reader, tracer }
    }

    /// Read a single DAP message (with Content-Length framing).
    pub fn read_message(&mut self) -> anyhow::Result<Value> {
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            let read_n = self.reader.read_line(&mut line)?;
            if read_n == 0 {
                return Err(anyhow!("DAP connection closed"));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if content_length.is_some() {
                    break;
                }
                continue;
            }
            if let Some(v) = line.strip_prefix("Content-Length:") {
                content_length = Some(v.trim().parse()?);
            }
        }

        let len = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        let msg: Value = serde_json::from_slice(&buf)?;
        if let Some(tracer) = &self.tracer {
            tracer.record(Direction::FromAdapter, &msg);
        }
        Ok(msg)
    }
}

/// Write a single DAP message (with Content-Length framing).
pub fn write_message(
    writer: &mut impl Write,
    message: &Value,
    tracer: Option<&DapTrace>,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(message)?;
    if let Some(tracer) = tracer {
        tracer.record(Direction::ToAdapter, message);
    }
    write!(writer, "Content-Length: {}\r\n\r\n", payload.len())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}
