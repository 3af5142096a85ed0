//! Scene-script document tree and parser.

pub mod ast;
pub mod parser;

pub use ast::{CodeKind, Document, Node, NodeId, NodeKind, SourcePos};
pub use parser::{file_id_of, parse_file, parse_str, ParseError, SCRIPT_EXTENSION};
