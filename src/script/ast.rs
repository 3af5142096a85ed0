use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source position of a node: file ID plus line/column of its extent.
///
/// Lines are 1-based. `end_col` is the byte offset into the end line just
/// past the node's text, which is where an inline marker would be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourcePos {
    pub fn new(file: impl Into<String>, start_line: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
            end_col,
        }
    }

    /// Position spanning a single line.
    pub fn line(file: impl Into<String>, line: u32, end_col: u32) -> Self {
        Self::new(file, line, line, end_col)
    }
}

/// Flavor of code-evaluation context a text run can be nested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// `$name = expr` line; string literals in `expr` are children.
    Assignment,
    /// `{expr}` inline interpolation within a dialogue line.
    Interpolation,
}

/// Closed set of node kinds in the parsed script tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A leaf run of raw text.
    Text { text: String },
    /// A flat tag delimiter in the sibling stream. Nesting is tracked as a
    /// running counter over sibling order, not as real tree structure.
    TagMarker { is_start: bool },
    /// Named structural container (`== section` / `-- subsection`); its name
    /// contributes to the scope prefix of every text run beneath it.
    NamedScope { name: String },
    /// Code-evaluation context; text inside one is never localizable.
    CodeContext { kind: CodeKind },
    /// Structural filler: dialogue-line containers and comments.
    Other,
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: SourcePos,
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ordered forest of typed script nodes with parent links.
///
/// Nodes live in a flat arena and refer to each other by [`NodeId`], so
/// parent back-references need no shared ownership. The document also keeps
/// a registry mapping each file ID it was built from to the file's path,
/// since included content carries positions in its own file.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    sources: HashMap<String, PathBuf>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a root) and return its id.
    pub fn push(&mut self, kind: NodeKind, pos: SourcePos, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            pos,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// The sibling list containing `id`: its parent's children, or the
    /// document roots for top-level nodes.
    pub fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).parent {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    /// Names of every enclosing [`NodeKind::NamedScope`], outermost first.
    pub fn ancestry(&self, id: NodeId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cursor = self.node(id).parent;
        while let Some(p) = cursor {
            let node = self.node(p);
            if let NodeKind::NamedScope { name } = &node.kind {
                names.push(name.as_str());
            }
            cursor = node.parent;
        }
        names.reverse();
        names
    }

    /// Depth-first traversal in document order.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.children(id).iter().rev());
            Some(id)
        })
    }

    /// Record which path a file ID was read from.
    pub fn register_source(&mut self, file: impl Into<String>, path: impl Into<PathBuf>) {
        self.sources.entry(file.into()).or_insert_with(|| path.into());
    }

    pub fn source_path(&self, file: &str) -> Option<&Path> {
        self.sources.get(file).map(PathBuf::as_path)
    }

    /// File IDs this document was assembled from, in arbitrary order.
    pub fn source_files(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32) -> SourcePos {
        SourcePos::line("test", line, 0)
    }

    #[test]
    fn test_push_and_parent_links() {
        let mut doc = Document::new();
        let scope = doc.push(
            NodeKind::NamedScope {
                name: "intro".into(),
            },
            pos(1),
            None,
        );
        let text = doc.push(
            NodeKind::Text {
                text: "Hello".into(),
            },
            pos(2),
            Some(scope),
        );

        assert_eq!(doc.node(text).parent, Some(scope));
        assert_eq!(doc.children(scope), &[text]);
        assert_eq!(doc.roots(), &[scope]);
    }

    #[test]
    fn test_ancestry_outermost_first() {
        let mut doc = Document::new();
        let outer = doc.push(
            NodeKind::NamedScope {
                name: "intro".into(),
            },
            pos(1),
            None,
        );
        let inner = doc.push(
            NodeKind::NamedScope {
                name: "greeting".into(),
            },
            pos(2),
            Some(outer),
        );
        let line = doc.push(NodeKind::Other, pos(3), Some(inner));
        let text = doc.push(
            NodeKind::Text {
                text: "Hello".into(),
            },
            pos(3),
            Some(line),
        );

        assert_eq!(doc.ancestry(text), vec!["intro", "greeting"]);
        assert!(doc.ancestry(outer).is_empty());
    }

    #[test]
    fn test_siblings_of_root_are_roots() {
        let mut doc = Document::new();
        let a = doc.push(NodeKind::Other, pos(1), None);
        let b = doc.push(NodeKind::Other, pos(2), None);
        assert_eq!(doc.siblings(a), &[a, b]);
        assert_eq!(doc.siblings(b), &[a, b]);
    }

    #[test]
    fn test_depth_first_is_document_order() {
        let mut doc = Document::new();
        let scope = doc.push(
            NodeKind::NamedScope {
                name: "intro".into(),
            },
            pos(1),
            None,
        );
        let line1 = doc.push(NodeKind::Other, pos(2), Some(scope));
        let t1 = doc.push(
            NodeKind::Text { text: "a".into() },
            pos(2),
            Some(line1),
        );
        let line2 = doc.push(NodeKind::Other, pos(3), Some(scope));

        let order: Vec<NodeId> = doc.iter_depth_first().collect();
        assert_eq!(order, vec![scope, line1, t1, line2]);
    }

    #[test]
    fn test_source_registry_first_registration_wins() {
        let mut doc = Document::new();
        doc.register_source("main", "/a/main.scn");
        doc.register_source("main", "/b/main.scn");
        assert_eq!(
            doc.source_path("main"),
            Some(Path::new("/a/main.scn"))
        );
        assert_eq!(doc.source_path("missing"), None);
    }
}
