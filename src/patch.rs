//! Patch planning and application.
//!
//! Pending edits are grouped per file in discovery order, then each file is
//! rewritten line by line. Columns in an edit refer to the pre-edit line,
//! which is only safe because the classifier guarantees at most one edit
//! per physical line; that coupling must hold for the splice to be correct.
//!
//! Files are patched sequentially and a failure aborts the remaining run.
//! Files already written stay written: there is no rollback.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

use crate::allocate::LOC_MARKER;

/// Suffix appended to the source path when debug output is enabled.
pub const DEBUG_OUTPUT_SUFFIX: &str = ".tagged";

/// How an edit rewrites its target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Replace the first existing `#loc:<id>` marker on the line.
    Replace,
    /// Splice a new marker in at the given byte column.
    Insert { col: u32 },
}

/// One scheduled line rewrite. Created by the allocator, consumed exactly
/// once by [`PatchApplier`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a PendingEdit does nothing until applied"]
pub struct PendingEdit {
    pub path: PathBuf,
    /// Target line, 1-based.
    pub line: u32,
    /// The ID to write (without the marker prefix).
    pub id: String,
    pub mode: EditMode,
}

/// Where patched output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Write to `<path>.tagged` next to the source, leaving it untouched.
    #[default]
    DebugSuffix,
    /// Overwrite the source file atomically.
    InPlace,
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: edit targets a line past the end of the file", .path.display())]
    LineOutOfRange { path: PathBuf, line: u32 },

    #[error("{}:{line}: insertion column {col} is not a character boundary of the line", .path.display())]
    ColumnOutOfRange { path: PathBuf, line: u32, col: u32 },

    #[error("{}:{line}: expected an existing #loc:<id> tag to replace", .path.display())]
    MissingMarker { path: PathBuf, line: u32 },
}

/// Group pending edits by file, preserving the order in which both files
/// and edits were first produced. Files without edits never appear.
pub fn plan_by_file(edits: Vec<PendingEdit>) -> IndexMap<PathBuf, Vec<PendingEdit>> {
    let mut plan: IndexMap<PathBuf, Vec<PendingEdit>> = IndexMap::new();
    for edit in edits {
        plan.entry(edit.path.clone()).or_default().push(edit);
    }
    plan
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"#loc:[A-Za-z0-9_]+").expect("invalid localization marker regex")
    })
}

/// Applies grouped edits file by file.
#[derive(Debug, Clone, Default)]
pub struct PatchApplier {
    output: OutputMode,
}

impl PatchApplier {
    pub fn new(output: OutputMode) -> Self {
        Self { output }
    }

    /// Apply every file's edits in plan order, returning the paths written.
    pub fn apply_all(
        &self,
        plan: &IndexMap<PathBuf, Vec<PendingEdit>>,
    ) -> Result<Vec<PathBuf>, PatchError> {
        let mut written = Vec::with_capacity(plan.len());
        for (path, edits) in plan {
            written.push(self.apply_file(path, edits)?);
        }
        Ok(written)
    }

    /// Rewrite one file in memory, then write it out. Returns the output
    /// path (the source itself, or its debug sibling).
    pub fn apply_file(&self, path: &Path, edits: &[PendingEdit]) -> Result<PathBuf, PatchError> {
        let content = fs::read_to_string(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

        for edit in edits {
            let idx = edit.line.saturating_sub(1) as usize;
            let line = lines
                .get_mut(idx)
                .ok_or_else(|| PatchError::LineOutOfRange {
                    path: path.to_path_buf(),
                    line: edit.line,
                })?;
            *line = rewrite_line(line, edit)?;
        }

        let out_path = match self.output {
            OutputMode::InPlace => path.to_path_buf(),
            OutputMode::DebugSuffix => debug_output_path(path),
        };
        let joined = lines.join("\n");
        match self.output {
            OutputMode::InPlace => atomic_write(path, joined.as_bytes()),
            OutputMode::DebugSuffix => fs::write(&out_path, joined.as_bytes()),
        }
        .map_err(|source| PatchError::Write {
            path: out_path.clone(),
            source,
        })?;

        Ok(out_path)
    }
}

fn rewrite_line(line: &str, edit: &PendingEdit) -> Result<String, PatchError> {
    match edit.mode {
        EditMode::Replace => {
            let m = marker_regex()
                .find(line)
                .ok_or_else(|| PatchError::MissingMarker {
                    path: edit.path.clone(),
                    line: edit.line,
                })?;
            let mut rewritten = String::with_capacity(line.len());
            rewritten.push_str(&line[..m.start()]);
            rewritten.push_str(LOC_MARKER);
            rewritten.push_str(&edit.id);
            rewritten.push_str(&line[m.end()..]);
            Ok(rewritten)
        }
        EditMode::Insert { col } => {
            let col = col as usize;
            if col > line.len() || !line.is_char_boundary(col) {
                return Err(PatchError::ColumnOutOfRange {
                    path: edit.path.clone(),
                    line: edit.line,
                    col: col as u32,
                });
            }
            let (head, tail) = line.split_at(col);
            let mut rewritten = String::with_capacity(line.len() + LOC_MARKER.len() + edit.id.len() + 2);
            rewritten.push_str(head);
            // Whitespace-safe insertion: pad on the left when butting
            // against text, and on the right when butting against a tag.
            if head.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
                rewritten.push(' ');
            }
            rewritten.push_str(LOC_MARKER);
            rewritten.push_str(&edit.id);
            if tail.starts_with('#') {
                rewritten.push(' ');
            }
            rewritten.push_str(tail);
            Ok(rewritten)
        }
    }
}

/// Sibling path for debug output: the fixed suffix appended to the full
/// file name, extension included.
fn debug_output_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(DEBUG_OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Atomic file write: tempfile in the same directory + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut temp = tempfile::NamedTempFile::new_in(parent.unwrap_or_else(|| Path::new(".")))?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
