use crate::dap::protocol::{ScopesBody, StackFrame, StackTraceBody, VariablesBody};
use crate::dap::Transport;
use crate::error::Error;
use crate::source::SourceReader;
use crate::weak_error;
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;

/// Debugpy (and a few others) group some variables under synthetic entries.
const SYNTHETIC_GROUPS: [&str; 3] = ["special variables", "function variables", "class variables"];

/// Program location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub function: String,
}

/// A call stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub name: String,
    pub file: Option<PathBuf>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub type_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcerptLine {
    pub number: u32,
    pub text: String,
    pub current: bool,
}

/// A few source lines around the current line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceExcerpt {
    pub lines: Vec<ExcerptLine>,
}

impl SourceExcerpt {
    fn new(first_line: u32, current: u32, lines: Vec<String>) -> Self {
        Self {
            lines: lines
                .into_iter()
                .zip(first_line..)
                .map(|(text, number)| ExcerptLine {
                    number,
                    text,
                    current: number == current,
                })
                .collect(),
        }
    }
}

impl fmt::Display for SourceExcerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            let marker = if line.current { '→' } else { ' ' };
            writeln!(f, "{marker} {:>4} | {}", line.number, line.text)?;
        }
        Ok(())
    }
}

/// Immutable view of a paused program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub location: Location,
    /// Innermost frame first.
    pub frames: Vec<Frame>,
    pub variables: Vec<Variable>,
    pub excerpt: Option<SourceExcerpt>,
}

impl Snapshot {
    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn file(&self) -> &Path {
        &self.location.file
    }
}

/// Collects a [`Snapshot`] of the stopped thread.
pub struct Assembler<'a> {
    pub transport: &'a dyn Transport,
    pub source: &'a dyn SourceReader,
    pub thread_id: i64,
    pub stack_depth: u32,
    pub excerpt_radius: u32,
}

impl<'a> Assembler<'a> {
    pub fn capture(&self) -> Result<Snapshot, Error> {
        let stack = self.stack_trace(self.stack_depth)?;
        let top = stack
            .first()
            .ok_or_else(|| Error::Protocol(anyhow::anyhow!("empty call stack")))?;
        let location = location_of(top)?;
        let top_frame_id = top.id;

        // variables and the excerpt are best-effort and independent of each other
        let (variables, excerpt) = thread::scope(|s| {
            let variables = s.spawn(|| self.variables(top_frame_id));
            let excerpt = self.excerpt(&location);
            let variables = match variables.join() {
                Ok(result) => weak_error!(result, "variables:").unwrap_or_default(),
                Err(_) => vec![],
            };
            (variables, excerpt)
        });

        Ok(Snapshot {
            location,
            frames: stack.iter().map(frame_of).collect(),
            variables,
            excerpt,
        })
    }

    /// Current location only (top of the stack).
    pub fn location(&self) -> Result<Location, Error> {
        let stack = self.stack_trace(1)?;
        let top = stack
            .first()
            .ok_or_else(|| Error::Protocol(anyhow::anyhow!("empty call stack")))?;
        location_of(top)
    }

    /// Id of the innermost frame.
    pub fn top_frame_id(&self) -> Result<i64, Error> {
        let stack = self.stack_trace(1)?;
        stack
            .first()
            .map(|frame| frame.id)
            .ok_or_else(|| Error::Protocol(anyhow::anyhow!("empty call stack")))
    }

    fn stack_trace(&self, levels: u32) -> Result<Vec<StackFrame>, Error> {
        let body = self.transport.request(
            "stackTrace",
            json!({ "threadId": self.thread_id, "startFrame": 0, "levels": levels }),
        )?;
        let body: StackTraceBody = serde_json::from_value(body).context("stackTrace body")?;
        Ok(body.stack_frames)
    }

    fn variables(&self, frame_id: i64) -> anyhow::Result<Vec<Variable>> {
        let body = self
            .transport
            .request("scopes", json!({ "frameId": frame_id }))?;
        let scopes: ScopesBody = serde_json::from_value(body).context("scopes body")?;

        let mut variables = vec![];
        for scope in scopes
            .scopes
            .iter()
            .filter(|scope| !scope.name.to_lowercase().contains("global"))
        {
            let body = self.transport.request(
                "variables",
                json!({ "variablesReference": scope.variables_reference }),
            )?;
            let body: VariablesBody = serde_json::from_value(body).context("variables body")?;
            variables.extend(
                body.variables
                    .into_iter()
                    .filter(|v| !v.name.starts_with("__"))
                    .filter(|v| !SYNTHETIC_GROUPS.contains(&v.name.as_str()))
                    .map(|v| Variable {
                        name: v.name,
                        value: v.value,
                        type_label: v.type_name,
                    }),
            );
        }
        Ok(variables)
    }

    fn excerpt(&self, location: &Location) -> Option<SourceExcerpt> {
        let first = location.line.saturating_sub(self.excerpt_radius).max(1);
        let last = location.line + self.excerpt_radius;
        let lines = weak_error!(
            self.source.read_lines(&location.file, first, last),
            "source excerpt:"
        )?;
        if lines.is_empty() {
            return None;
        }
        Some(SourceExcerpt::new(first, location.line, lines))
    }
}

fn location_of(frame: &StackFrame) -> Result<Location, Error> {
    let file = frame
        .source
        .as_ref()
        .and_then(|source| source.path.as_deref().or(source.name.as_deref()))
        .ok_or_else(|| Error::Protocol(anyhow::anyhow!("top frame `{}` has no source", frame.name)))?;
    Ok(Location {
        file: PathBuf::from(file),
        line: frame.line.max(0) as u32,
        function: frame.name.clone(),
    })
}

fn frame_of(frame: &StackFrame) -> Frame {
    Frame {
        name: frame.name.clone(),
        file: frame
            .source
            .as_ref()
            .and_then(|source| source.path.as_ref())
            .map(PathBuf::from),
        line: frame.line.max(0) as u32,
    }
}
