use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Source code access used to annotate snapshots.
pub trait SourceReader: Send + Sync {
    /// Read lines `start..=end` (1-based) of a file. The range is clamped to the file length.
    fn read_lines(&self, file: &Path, start: u32, end: u32) -> io::Result<Vec<String>>;
}

/// Absolute form of a source path, the way adapters report it in stack frames.
/// Symlinks are resolved when the file exists.
pub fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// True if both paths name the same source file.
pub fn same_source(a: &Path, b: &Path) -> bool {
    a == b || absolute_path(a) == absolute_path(b)
}

/// Reads sources straight from the file system.
#[derive(Default, Clone, Copy)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_lines(&self, file: &Path, start: u32, end: u32) -> io::Result<Vec<String>> {
        let text = fs::read_to_string(file)?;
        let start = start.max(1) as usize;
        if (end as usize) < start {
            return Ok(vec![]);
        }
        Ok(text
            .lines()
            .skip(start - 1)
            .take(end as usize - start + 1)
            .map(ToOwned::to_owned)
            .collect())
    }
}
