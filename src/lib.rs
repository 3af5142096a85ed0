//! Loctag: localization-tag synchronization for scene scripts
//!
//! Assigns and maintains stable localization IDs for the natural-language
//! lines of narrative scripts. Each eligible text run gets an inline
//! `#loc:<id>` marker whose ID is derived from the run's structural
//! location (file and enclosing scopes), so re-running the tool on an
//! edited script reuses existing IDs instead of reassigning them.
//!
//! # Architecture
//!
//! A run is a single synchronous pass through four stages: the parser
//! builds a typed document tree, the [`classify::Classifier`] filters text
//! runs down to the taggable ones, the [`allocate::IdAllocator`] decides
//! keep-vs-mint per run and fills the [`table::StringTable`], and the
//! patch planner/applier rewrite the source lines. Intelligence lives in
//! classification and allocation; application is a dumb line splice.
//!
//! # Safety
//!
//! - Parse and classification failures abort before any file is written
//! - In-place output is written atomically (tempfile + fsync + rename)
//! - Debug-suffix output (the default) never touches the sources
//! - The one-run-per-line invariant keeps pre-edit columns valid
//!
//! # Example
//!
//! ```no_run
//! use loctag::{run_sync, SyncOptions};
//! use std::path::PathBuf;
//!
//! let report = run_sync(&[PathBuf::from("intro.scn")], &SyncOptions::default())?;
//! println!("{} new tags, {} kept", report.inserted, report.kept);
//! # Ok::<(), loctag::SyncError>(())
//! ```

pub mod allocate;
pub mod classify;
pub mod patch;
pub mod script;
pub mod sync;
pub mod table;
pub mod tagspan;

// Re-exports
pub use allocate::{IdAllocator, DEFAULT_SUFFIX_LEN, LOC_MARKER};
pub use classify::{Classifier, ClassifyError, EligibleRun};
pub use patch::{
    plan_by_file, EditMode, OutputMode, PatchApplier, PatchError, PendingEdit,
    DEBUG_OUTPUT_SUFFIX,
};
pub use script::{parse_file, parse_str, Document, NodeId, NodeKind, ParseError, SourcePos};
pub use sync::{
    apply_plan, plan_sync, plan_sync_with_rng, run_sync, run_sync_with_rng, SyncError,
    SyncOptions, SyncPlan, SyncReport,
};
pub use table::StringTable;
