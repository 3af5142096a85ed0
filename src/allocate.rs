//! Location-ID allocation.
//!
//! Decides, for each eligible run, whether to keep an existing inline ID or
//! mint a fresh one, and records the run's text in the string table either
//! way. IDs are scope-prefixed (`<file>_<scope>_<suffix>`) so re-running the
//! tool on an edited script reuses IDs instead of reassigning them.

use rand::Rng;

use crate::classify::EligibleRun;
use crate::patch::{EditMode, PendingEdit};
use crate::script::Document;
use crate::table::StringTable;
use crate::tagspan;

/// Written form of the localization marker, as it appears on source lines.
pub const LOC_MARKER: &str = "#loc:";

/// The marker's tag-text form inside the parsed tree (the `#` itself is the
/// tag-start delimiter, so the text sibling begins at `loc:`).
pub const LOC_TAG_PREFIX: &str = "loc:";

/// Default length of the random ID suffix.
pub const DEFAULT_SUFFIX_LEN: usize = 4;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Allocates localization IDs for eligible runs.
///
/// Generic over the random source so tests can seed it. Suffix uniqueness
/// is statistical only: no check is made against IDs already in the table,
/// so two draws can collide and the later run's text wins.
#[derive(Debug)]
pub struct IdAllocator<R: Rng> {
    rng: R,
    suffix_len: usize,
    retag_all: bool,
}

impl<R: Rng> IdAllocator<R> {
    pub fn with_rng(rng: R, retag_all: bool) -> Self {
        Self {
            rng,
            suffix_len: DEFAULT_SUFFIX_LEN,
            retag_all,
        }
    }

    pub fn suffix_len(mut self, len: usize) -> Self {
        self.suffix_len = len;
        self
    }

    /// Decide the run's final ID, record it in the table, and return the
    /// pending edit when the source line needs rewriting.
    ///
    /// An existing inline ID is kept untouched unless retag-all is on.
    /// Otherwise a fresh ID is composed and scheduled: `Replace` when the
    /// line already carries a localization tag, `Insert` at the run's end
    /// column when it does not.
    pub fn allocate(
        &mut self,
        doc: &Document,
        run: &EligibleRun,
        table: &mut StringTable,
    ) -> Option<PendingEdit> {
        let existing = existing_id(doc, run);

        if let Some(id) = &existing {
            if !self.retag_all {
                table.insert(id.clone(), run.text.clone());
                return None;
            }
        }

        let id = self.compose_id(doc, run);
        let mode = match existing {
            Some(_) => EditMode::Replace,
            None => EditMode::Insert { col: run.end_col },
        };
        table.insert(id.clone(), run.text.clone());
        Some(PendingEdit {
            path: run.path.clone(),
            line: run.line,
            id,
            mode,
        })
    }

    fn compose_id(&mut self, doc: &Document, run: &EligibleRun) -> String {
        let mut id = String::with_capacity(run.file.len() + 1 + self.suffix_len);
        id.push_str(&run.file);
        id.push('_');
        for name in doc.ancestry(run.node) {
            id.push_str(name);
            id.push('_');
        }
        for _ in 0..self.suffix_len {
            let idx = self.rng.gen_range(0..SUFFIX_ALPHABET.len());
            id.push(SUFFIX_ALPHABET[idx] as char);
        }
        id
    }
}

/// The run's existing inline ID, if a localization tag follows it.
///
/// The first tag text after the run that starts with the marker prefix
/// yields the ID: the prefix is stripped and the remainder truncated to the
/// identifier charset `[A-Za-z0-9_]`.
fn existing_id(doc: &Document, run: &EligibleRun) -> Option<String> {
    tagspan::tags_after(doc, run.node)
        .into_iter()
        .find_map(|text| {
            let rest = text.strip_prefix(LOC_TAG_PREFIX)?;
            let id: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            (!id.is_empty()).then_some(id)
        })
}
