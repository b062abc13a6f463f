use crate::dap::{SourceBreakpoints, Transport};
use crate::error::Error;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Who installed a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    /// Set through the public breakpoint API.
    User,
    /// Covers a targeted line range.
    Range,
    /// Temporary, for run-to-line.
    Cursor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub file: PathBuf,
    pub line: u32,
    pub owner: Owner,
}

/// Breakpoints known to the controller. A line may be shared by several owners,
/// it stays installed in the adapter while at least one owner remains.
#[derive(Debug, Default)]
pub struct BreakpointStore {
    files: BTreeMap<PathBuf, BTreeMap<u32, BTreeSet<Owner>>>,
}

impl BreakpointStore {
    /// Add breakpoints for `owner`, return exactly what was added.
    pub fn set(&mut self, file: &Path, lines: &[u32], owner: Owner) -> Vec<Breakpoint> {
        let entry = self.files.entry(file.to_path_buf()).or_default();
        lines
            .iter()
            .filter(|line| entry.entry(**line).or_default().insert(owner))
            .map(|line| Breakpoint {
                file: file.to_path_buf(),
                line: *line,
                owner,
            })
            .collect()
    }

    /// Remove exactly the given breakpoints, breakpoints of other owners are untouched.
    pub fn remove(&mut self, breakpoints: &[Breakpoint]) {
        for bp in breakpoints {
            let Some(lines) = self.files.get_mut(&bp.file) else {
                continue;
            };
            if let Some(owners) = lines.get_mut(&bp.line) {
                owners.remove(&bp.owner);
                if owners.is_empty() {
                    lines.remove(&bp.line);
                }
            }
            if lines.is_empty() {
                self.files.remove(&bp.file);
            }
        }
    }

    /// All breakpoints of a file, one entry per owner.
    pub fn list_existing(&self, file: &Path) -> Vec<Breakpoint> {
        self.files
            .get(file)
            .into_iter()
            .flatten()
            .flat_map(|(line, owners)| {
                owners.iter().map(move |owner| Breakpoint {
                    file: file.to_path_buf(),
                    line: *line,
                    owner: *owner,
                })
            })
            .collect()
    }

    /// Breakpoints of a file that belong to `owner`.
    pub fn owned_by(&self, file: &Path, owner: Owner) -> Vec<Breakpoint> {
        self.list_existing(file)
            .into_iter()
            .filter(|bp| bp.owner == owner)
            .collect()
    }

    /// Forget every breakpoint of a file.
    pub fn clear_file(&mut self, file: &Path) {
        self.files.remove(file);
    }

    /// Distinct lines with at least one breakpoint.
    pub fn lines(&self, file: &Path) -> Vec<u32> {
        self.files
            .get(file)
            .map(|lines| lines.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Everything, grouped by source, for a launch.
    pub fn sources(&self) -> Vec<SourceBreakpoints> {
        self.files
            .iter()
            .map(|(path, lines)| SourceBreakpoints {
                path: path.clone(),
                lines: lines.keys().copied().collect(),
            })
            .collect()
    }

    /// Send the current line set of a file to the adapter.
    pub fn push(&self, transport: &dyn Transport, file: &Path) -> Result<Value, Error> {
        let source = SourceBreakpoints {
            path: file.to_path_buf(),
            lines: self.lines(file),
        };
        Ok(transport.request("setBreakpoints", source.to_arguments())?)
    }
}
