//! Eligibility classification of text runs.
//!
//! Walks a parsed document in depth-first order and filters leaf text runs
//! down to the ones that may carry a localization tag. Enforces the
//! one-run-per-physical-line invariant the patch applier relies on: edits
//! are computed against pre-edit columns, so a second edit on the same line
//! would be corrupted. Classification therefore fails hard instead.

use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::script::{Document, NodeId, NodeKind};
use crate::tagspan;

/// A text run that passed every eligibility rule.
///
/// Produced by [`Classifier::classify`], consumed exactly once by the
/// allocator; never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRun {
    pub node: NodeId,
    /// File ID the run's position refers to (may differ from the document's
    /// root file when the run came from an include).
    pub file: String,
    /// Path of that file, for the patch applier.
    pub path: PathBuf,
    /// Line the marker edit targets (the run's end line, 1-based).
    pub line: u32,
    /// Byte column just past the run's raw text on that line.
    pub end_col: u32,
    /// The run's text, trimmed of surrounding whitespace.
    pub text: String,
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("{file}:{line}: more than one localizable text run on this line")]
    DuplicateLine { file: String, line: u32 },

    #[error("no source path registered for file id '{file}'")]
    UnregisteredFile { file: String },
}

/// Stateful classifier shared across all documents of a run.
///
/// Tracks which source files have already been fully classified, so shared
/// includes reached through several documents are only processed once. The
/// set grows monotonically and never shrinks.
#[derive(Debug, Default)]
pub struct Classifier {
    visited: HashSet<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited_files(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Classify one document, returning eligible runs in document order.
    ///
    /// Eligibility rules, short-circuiting at the first failure:
    /// 1. reject whitespace-only text (pure layout);
    /// 2. reject text inside an open tag span (tag content is never
    ///    localizable);
    /// 3. reject text whose immediate parent is a code-evaluation context;
    /// 4. fail the run if another eligible run was already accepted at the
    ///    same (file, line) in this pass;
    /// 5. silently skip files already classified by a prior document.
    ///
    /// File IDs seen during the scan enter the visited set only after the
    /// whole document completes, so runs within one document are all
    /// considered even when they share a file.
    pub fn classify(&mut self, doc: &Document) -> Result<Vec<EligibleRun>, ClassifyError> {
        let mut runs = Vec::new();
        let mut accepted: HashSet<(String, u32)> = HashSet::new();

        for id in doc.iter_depth_first() {
            let node = doc.node(id);
            let NodeKind::Text { text } = &node.kind else {
                continue;
            };

            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if tagspan::is_inside_tag(doc, id) {
                continue;
            }
            if let Some(parent) = node.parent {
                if matches!(doc.node(parent).kind, NodeKind::CodeContext { .. }) {
                    continue;
                }
            }
            let key = (node.pos.file.clone(), node.pos.start_line);
            if accepted.contains(&key) {
                return Err(ClassifyError::DuplicateLine {
                    file: key.0,
                    line: key.1,
                });
            }
            if self.visited.contains(&node.pos.file) {
                continue;
            }

            let path = doc
                .source_path(&node.pos.file)
                .ok_or_else(|| ClassifyError::UnregisteredFile {
                    file: node.pos.file.clone(),
                })?
                .to_path_buf();
            accepted.insert(key);
            runs.push(EligibleRun {
                node: id,
                file: node.pos.file.clone(),
                path,
                line: node.pos.end_line,
                end_col: node.pos.end_col,
                text: trimmed.to_string(),
            });
        }

        self.visited
            .extend(doc.source_files().map(str::to_string));
        Ok(runs)
    }
}
