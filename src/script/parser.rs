//! Line-oriented parser for the scene-script format.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! == name          top-level section (NamedScope)
//! -- name          sub-section of the current section (NamedScope)
//! // ...           comment
//! @include path    splice another script at this point (include-once)
//! $name = expr     assignment; string literals in expr become Text children
//! anything else    dialogue line
//! ```
//!
//! Within a dialogue line, `[x]`/`[/x]` markup becomes flat `TagMarker`
//! nodes, `{expr}` becomes a `CodeContext` with the expression as a Text
//! child, and `#text` becomes a start `TagMarker` followed by the tag text
//! (running to the next `#` or end of line, never explicitly closed).
//! Everything else is raw text runs with byte-accurate end columns.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::ast::{CodeKind, Document, NodeId, NodeKind, SourcePos};

/// File extension for scene scripts.
pub const SCRIPT_EXTENSION: &str = "scn";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: u32,
        message: String,
    },
}

/// Parse a script file, following `@include` directives, into one document.
pub fn parse_file(path: &Path) -> Result<Document, ParseError> {
    let mut doc = Document::new();
    let mut session = ParseSession::default();
    session.parse_path(&mut doc, path, None)?;
    Ok(doc)
}

/// Parse in-memory script text under the given file ID.
///
/// `@include` is rejected here since there is no directory to resolve
/// against; use [`parse_file`] for file-backed scripts.
pub fn parse_str(text: &str, file_id: &str) -> Result<Document, ParseError> {
    let mut doc = Document::new();
    doc.register_source(file_id, format!("{file_id}.{SCRIPT_EXTENSION}"));
    let mut session = ParseSession::default();
    session.parse_source(&mut doc, file_id, None, text, None)?;
    Ok(doc)
}

/// One parse run over a root script and everything it includes.
#[derive(Default)]
struct ParseSession {
    included: HashSet<PathBuf>,
}

impl ParseSession {
    fn parse_path(
        &mut self,
        doc: &mut Document,
        path: &Path,
        base: Option<NodeId>,
    ) -> Result<(), ParseError> {
        let canonical = path.canonicalize().map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Include-once: a script already spliced into this document is
        // skipped, which also makes include cycles impossible.
        if !self.included.insert(canonical) {
            return Ok(());
        }

        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_id = file_id_of(path);
        doc.register_source(&file_id, path);
        let include_dir = path.parent().map(Path::to_path_buf);
        self.parse_source(doc, &file_id, include_dir.as_deref(), &text, base)
    }

    fn parse_source(
        &mut self,
        doc: &mut Document,
        file_id: &str,
        include_dir: Option<&Path>,
        text: &str,
        base: Option<NodeId>,
    ) -> Result<(), ParseError> {
        let mut section: Option<NodeId> = None;
        let mut subsection: Option<NodeId> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("==") {
                let name = rest.trim();
                validate_scope_name(name, file_id, line_no)?;
                section = Some(doc.push(
                    NodeKind::NamedScope { name: name.into() },
                    SourcePos::line(file_id, line_no, line.len() as u32),
                    base,
                ));
                subsection = None;
            } else if let Some(rest) = trimmed.strip_prefix("--") {
                let name = rest.trim();
                validate_scope_name(name, file_id, line_no)?;
                subsection = Some(doc.push(
                    NodeKind::NamedScope { name: name.into() },
                    SourcePos::line(file_id, line_no, line.len() as u32),
                    section.or(base),
                ));
            } else if trimmed.starts_with("//") {
                doc.push(
                    NodeKind::Other,
                    SourcePos::line(file_id, line_no, line.len() as u32),
                    subsection.or(section).or(base),
                );
            } else if let Some(rest) = trimmed.strip_prefix("@include") {
                let target = rest.trim();
                if target.is_empty() {
                    return Err(ParseError::Syntax {
                        file: file_id.into(),
                        line: line_no,
                        message: "include directive missing a path".into(),
                    });
                }
                let Some(dir) = include_dir else {
                    return Err(ParseError::Syntax {
                        file: file_id.into(),
                        line: line_no,
                        message: "include requires a file-backed script".into(),
                    });
                };
                self.parse_path(doc, &dir.join(target), subsection.or(section).or(base))?;
            } else if trimmed.starts_with('$') {
                parse_assignment(doc, subsection.or(section).or(base), file_id, line_no, line);
            } else {
                parse_dialogue(doc, subsection.or(section).or(base), file_id, line_no, line);
            }
        }

        Ok(())
    }
}

/// File IDs are the path stem; they namespace localization IDs.
pub fn file_id_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".into())
}

fn validate_scope_name(name: &str, file: &str, line: u32) -> Result<(), ParseError> {
    if name.is_empty() {
        return Err(ParseError::Syntax {
            file: file.into(),
            line,
            message: "scope header missing a name".into(),
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ParseError::Syntax {
            file: file.into(),
            line,
            message: format!("scope name '{name}' must match [A-Za-z0-9_]+"),
        });
    }
    Ok(())
}

/// `$name = expr` line: the whole line is a code context, with every
/// double-quoted literal in it attached as a Text child.
fn parse_assignment(
    doc: &mut Document,
    parent: Option<NodeId>,
    file_id: &str,
    line_no: u32,
    line: &str,
) {
    let ctx = doc.push(
        NodeKind::CodeContext {
            kind: CodeKind::Assignment,
        },
        SourcePos::line(file_id, line_no, line.len() as u32),
        parent,
    );

    let mut literal_start: Option<usize> = None;
    for (off, c) in line.char_indices() {
        if c != '"' {
            continue;
        }
        match literal_start.take() {
            None => literal_start = Some(off + 1),
            Some(start) => {
                doc.push(
                    NodeKind::Text {
                        text: line[start..off].into(),
                    },
                    SourcePos::line(file_id, line_no, off as u32),
                    Some(ctx),
                );
            }
        }
    }
}

/// Tokenize one dialogue line into a sibling stream under an `Other`
/// container, so tag-depth counting never bleeds across lines.
fn parse_dialogue(
    doc: &mut Document,
    parent: Option<NodeId>,
    file_id: &str,
    line_no: u32,
    line: &str,
) {
    let container = doc.push(
        NodeKind::Other,
        SourcePos::line(file_id, line_no, line.len() as u32),
        parent,
    );

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let len = line.len();
    let mut i = 0;
    let mut run_start = 0;

    while i < chars.len() {
        let (off, c) = chars[i];
        match c {
            '[' => {
                let Some(rel) = chars[i + 1..].iter().position(|&(_, c)| c == ']') else {
                    i += 1;
                    continue;
                };
                push_text(doc, container, file_id, line_no, line, run_start, off);
                let close = i + 1 + rel;
                let inner = &line[off + 1..chars[close].0];
                let end = chars[close].0 + 1;
                doc.push(
                    NodeKind::TagMarker {
                        is_start: !inner.starts_with('/'),
                    },
                    SourcePos::line(file_id, line_no, end as u32),
                    Some(container),
                );
                i = close + 1;
                run_start = end;
            }
            '{' => {
                let Some(rel) = chars[i + 1..].iter().position(|&(_, c)| c == '}') else {
                    i += 1;
                    continue;
                };
                push_text(doc, container, file_id, line_no, line, run_start, off);
                let close = i + 1 + rel;
                let inner_end = chars[close].0;
                let end = inner_end + 1;
                let ctx = doc.push(
                    NodeKind::CodeContext {
                        kind: CodeKind::Interpolation,
                    },
                    SourcePos::line(file_id, line_no, end as u32),
                    Some(container),
                );
                if inner_end > off + 1 {
                    doc.push(
                        NodeKind::Text {
                            text: line[off + 1..inner_end].into(),
                        },
                        SourcePos::line(file_id, line_no, inner_end as u32),
                        Some(ctx),
                    );
                }
                i = close + 1;
                run_start = end;
            }
            '#' => {
                push_text(doc, container, file_id, line_no, line, run_start, off);
                doc.push(
                    NodeKind::TagMarker { is_start: true },
                    SourcePos::line(file_id, line_no, (off + 1) as u32),
                    Some(container),
                );
                // Tag text runs to the next '#' or end of line; there is no
                // closing marker, the open counter simply stays positive.
                let text_end = chars[i + 1..]
                    .iter()
                    .position(|&(_, c)| c == '#')
                    .map(|rel| chars[i + 1 + rel].0)
                    .unwrap_or(len);
                push_text(doc, container, file_id, line_no, line, off + 1, text_end);
                while i < chars.len() && chars[i].0 < text_end {
                    i += 1;
                }
                run_start = text_end;
            }
            _ => i += 1,
        }
    }

    push_text(doc, container, file_id, line_no, line, run_start, len);
}

fn push_text(
    doc: &mut Document,
    container: NodeId,
    file_id: &str,
    line_no: u32,
    line: &str,
    start: usize,
    end: usize,
) {
    if end > start {
        doc.push(
            NodeKind::Text {
                text: line[start..end].into(),
            },
            SourcePos::line(file_id, line_no, end as u32),
            Some(container),
        );
    }
}
