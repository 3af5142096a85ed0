//! Run orchestration: parse, classify, allocate, patch.
//!
//! A run is two strictly ordered phases. Planning parses every input,
//! classifies the documents, and allocates IDs; any parse or classification
//! failure aborts before a single file has been touched. Applying then
//! patches files one by one; a patch failure aborts the rest of the run but
//! earlier files stay written.

use std::path::PathBuf;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::allocate::{IdAllocator, DEFAULT_SUFFIX_LEN};
use crate::classify::{Classifier, ClassifyError};
use crate::patch::{self, EditMode, OutputMode, PatchApplier, PatchError, PendingEdit};
use crate::script::{self, ParseError};
use crate::table::StringTable;

/// Caller-facing knobs for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Regenerate every ID, discarding existing tags.
    pub retag_all: bool,
    /// Where patched files go. Defaults to debug-suffix siblings.
    pub output: OutputMode,
    /// Length of the random ID suffix.
    pub suffix_len: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retag_all: false,
            output: OutputMode::default(),
            suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Everything a run decided before touching any file.
#[derive(Debug)]
pub struct SyncPlan {
    /// ID → text for every eligible run, kept or fresh, in document order.
    pub table: StringTable,
    /// Pending edits grouped per file in discovery order.
    pub edits: IndexMap<PathBuf, Vec<PendingEdit>>,
    /// Runs whose existing ID was kept untouched.
    pub kept: usize,
    /// Fresh markers to insert.
    pub inserted: usize,
    /// Existing markers to overwrite.
    pub replaced: usize,
}

impl SyncPlan {
    pub fn edit_count(&self) -> usize {
        self.edits.values().map(Vec::len).sum()
    }

    /// True when applying would not change any file.
    pub fn is_noop(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct SyncReport {
    pub table: StringTable,
    pub files_written: Vec<PathBuf>,
    pub kept: usize,
    pub inserted: usize,
    pub replaced: usize,
}

/// Plan a run with an entropy-seeded ID generator.
pub fn plan_sync(inputs: &[PathBuf], options: &SyncOptions) -> Result<SyncPlan, SyncError> {
    plan_sync_with_rng(inputs, options, StdRng::from_entropy())
}

/// Plan a run with a caller-supplied random source (seedable for tests).
pub fn plan_sync_with_rng<R: Rng>(
    inputs: &[PathBuf],
    options: &SyncOptions,
    rng: R,
) -> Result<SyncPlan, SyncError> {
    // Parse everything up front: a parse failure anywhere must abort the
    // run before classification starts.
    let docs = inputs
        .iter()
        .map(|path| script::parse_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut classifier = Classifier::new();
    let mut allocator = IdAllocator::with_rng(rng, options.retag_all).suffix_len(options.suffix_len);
    let mut table = StringTable::new();
    let mut pending = Vec::new();
    let mut kept = 0;
    let mut inserted = 0;
    let mut replaced = 0;

    for doc in &docs {
        for run in classifier.classify(doc)? {
            match allocator.allocate(doc, &run, &mut table) {
                None => kept += 1,
                Some(edit) => {
                    match edit.mode {
                        EditMode::Insert { .. } => inserted += 1,
                        EditMode::Replace => replaced += 1,
                    }
                    pending.push(edit);
                }
            }
        }
    }

    Ok(SyncPlan {
        table,
        edits: patch::plan_by_file(pending),
        kept,
        inserted,
        replaced,
    })
}

/// Apply a plan's edits to disk.
pub fn apply_plan(plan: SyncPlan, options: &SyncOptions) -> Result<SyncReport, SyncError> {
    let applier = PatchApplier::new(options.output);
    let files_written = applier.apply_all(&plan.edits)?;
    Ok(SyncReport {
        table: plan.table,
        files_written,
        kept: plan.kept,
        inserted: plan.inserted,
        replaced: plan.replaced,
    })
}

/// Full run: plan, then apply.
pub fn run_sync(inputs: &[PathBuf], options: &SyncOptions) -> Result<SyncReport, SyncError> {
    apply_plan(plan_sync(inputs, options)?, options)
}

/// Full run with a caller-supplied random source.
pub fn run_sync_with_rng<R: Rng>(
    inputs: &[PathBuf],
    options: &SyncOptions,
    rng: R,
) -> Result<SyncReport, SyncError> {
    apply_plan(plan_sync_with_rng(inputs, options, rng)?, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_plan_reports_kept_and_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.scn");
        fs::write(&path, "Bonjour #loc:main_XXXX\nHello\n").unwrap();

        let plan = plan_sync_with_rng(&[path], &SyncOptions::default(), seeded()).unwrap();
        assert_eq!(plan.kept, 1);
        assert_eq!(plan.inserted, 1);
        assert_eq!(plan.replaced, 0);
        assert_eq!(plan.edit_count(), 1);
        assert_eq!(plan.table.get("main_XXXX"), Some("Bonjour"));
    }

    #[test]
    fn test_plan_failure_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.scn");
        let bad = dir.path().join("bad.scn");
        fs::write(&good, "Hello\n").unwrap();
        fs::write(&bad, "Hey [b]x[/b] y\n").unwrap();

        let options = SyncOptions {
            output: OutputMode::InPlace,
            ..SyncOptions::default()
        };
        let err = run_sync_with_rng(&[good.clone(), bad], &options, seeded()).unwrap_err();
        assert!(matches!(err, SyncError::Classify(_)));
        // The classification failure in the second document must prevent
        // the first document's edit from being written.
        assert_eq!(fs::read_to_string(&good).unwrap(), "Hello\n");
    }

    #[test]
    fn test_shared_include_classified_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shared.scn"), "Shared line\n").unwrap();
        fs::write(dir.path().join("a.scn"), "@include shared.scn\nA line\n").unwrap();
        fs::write(dir.path().join("b.scn"), "@include shared.scn\nB line\n").unwrap();

        let plan = plan_sync_with_rng(
            &[dir.path().join("a.scn"), dir.path().join("b.scn")],
            &SyncOptions::default(),
            seeded(),
        )
        .unwrap();

        // shared.scn contributes exactly one edit even though both root
        // documents pull it in.
        assert_eq!(plan.inserted, 3);
        assert_eq!(plan.table.len(), 3);
        let shared_edits: usize = plan
            .edits
            .iter()
            .filter(|(path, _)| path.ends_with("shared.scn"))
            .map(|(_, edits)| edits.len())
            .sum();
        assert_eq!(shared_edits, 1);
    }

    #[test]
    fn test_missing_input_is_parse_error() {
        let err = plan_sync(&[PathBuf::from("/nonexistent/x.scn")], &SyncOptions::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }
}
