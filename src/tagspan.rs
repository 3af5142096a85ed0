//! Tag-region queries over a node's sibling list.
//!
//! Tag spans are flat: `TagMarker` nodes in the sibling stream open and
//! close regions, tracked as a running signed counter in sibling order.
//! Both queries are pure functions of the sibling list and the node's
//! position in it; they hold no state.

use crate::script::{Document, NodeId, NodeKind};

/// Whether `node` sits inside an open tag span.
///
/// Scans all siblings strictly before `node`, +1 per start marker and -1
/// per end marker. Negative counters from unbalanced markup are tolerated
/// and read as "not inside a tag".
pub fn is_inside_tag(doc: &Document, node: NodeId) -> bool {
    let mut depth = 0i32;
    for &sib in doc.siblings(node) {
        if sib == node {
            break;
        }
        if let NodeKind::TagMarker { is_start } = doc.node(sib).kind {
            depth += if is_start { 1 } else { -1 };
        }
    }
    depth > 0
}

/// Text of every tag-region sibling after `node`, in sibling order.
///
/// Runs the same counter over the siblings strictly after `node` and
/// collects the text of each Text sibling encountered while the counter
/// is positive. The scan always runs to the end of the (finite) list.
pub fn tags_after<'d>(doc: &'d Document, node: NodeId) -> Vec<&'d str> {
    let mut depth = 0i32;
    let mut tags = Vec::new();
    let mut seen_self = false;
    for &sib in doc.siblings(node) {
        if sib == node {
            seen_self = true;
            continue;
        }
        if !seen_self {
            continue;
        }
        match &doc.node(sib).kind {
            NodeKind::TagMarker { is_start } => depth += if *is_start { 1 } else { -1 },
            NodeKind::Text { text } if depth > 0 => tags.push(text.as_str()),
            _ => {}
        }
    }
    tags
}
