//! Arena-backed document tree.
//!
//! Every node lives in a single `Vec<Node>` owned by the [`Document`] and is
//! addressed by [`NodeId`]. Parent and child relationships are plain indices,
//! so moving a subtree between documents is a copy of indices rather than a
//! rewrite of shared back-references.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::attributes::{AttributeList, Attributes};
use crate::diagnostics::{Cursor, Diagnostic, Severity};
use crate::ids::{scan_references, CrossReference};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Document,
    Section,
    Paragraph,
    Admonition,
    List,
    Listing,
    Literal,
    Example,
    Sidebar,
    Quote,
    Open,
    Pass,
    Table,
    ThematicBreak,
    PageBreak,
    AttributeEntry,
    BlockMacro,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Section => "section",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Admonition => "admonition",
            NodeKind::List => "list",
            NodeKind::Listing => "listing",
            NodeKind::Literal => "literal",
            NodeKind::Example => "example",
            NodeKind::Sidebar => "sidebar",
            NodeKind::Quote => "quote",
            NodeKind::Open => "open",
            NodeKind::Pass => "pass",
            NodeKind::Table => "table",
            NodeKind::ThematicBreak => "thematic-break",
            NodeKind::PageBreak => "page-break",
            NodeKind::AttributeEntry => "attribute-entry",
            NodeKind::BlockMacro => "block-macro",
        }
    }

    /// Kinds whose lines may carry cross references.
    fn has_inline_content(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Admonition | NodeKind::List | NodeKind::Table
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural classification of a section, derived from doctype and level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Part,
    Chapter,
    Section,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Doctype {
    #[default]
    Article,
    Book,
}

impl FromStr for Doctype {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "article" => Ok(Doctype::Article),
            "book" => Ok(Doctype::Book),
            _ => Err(()),
        }
    }
}

/// Safe mode levels, numbered like Asciidoctor's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    Unsafe = 0,
    #[default]
    Safe = 1,
    Server = 10,
    Secure = 20,
}

impl SafeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SafeMode::Unsafe => "unsafe",
            SafeMode::Safe => "safe",
            SafeMode::Server => "server",
            SafeMode::Secure => "secure",
        }
    }
}

impl FromStr for SafeMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unsafe" => Ok(SafeMode::Unsafe),
            "safe" => Ok(SafeMode::Safe),
            "server" => Ok(SafeMode::Server),
            "secure" => Ok(SafeMode::Secure),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Section depth; blocks carry the level of their enclosing section.
    pub level: usize,
    pub id: Option<String>,
    pub generated_id: bool,
    pub reftext: Option<String>,
    pub title: Option<String>,
    pub section_kind: Option<SectionKind>,
    pub attributes: AttributeList,
    pub lines: Vec<String>,
    pub delimiter: Option<String>,
    /// Source line in this document; `None` for nodes grafted from elsewhere.
    pub line: Option<usize>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            parent: None,
            children: Vec::new(),
            level: 0,
            id: None,
            generated_id: false,
            reftext: None,
            title: None,
            section_kind: None,
            attributes: AttributeList::default(),
            lines: Vec::new(),
            delimiter: None,
            line: None,
        }
    }

    pub fn is_section(&self) -> bool {
        self.kind == NodeKind::Section
    }
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    attributes: Attributes,
    catalog: BTreeMap<String, NodeId>,
    /// Ids already reported as duplicates; rebuilding the catalog stays quiet about them.
    duplicate_ids: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
    safe_mode: SafeMode,
    source_path: Option<PathBuf>,
}

impl Document {
    pub fn new(safe_mode: SafeMode, attributes: Attributes, source_path: Option<PathBuf>) -> Self {
        let mut attributes = attributes;
        attributes.set_default("doctype", "article");
        attributes.set_default("sectids", "");
        attributes.set_default("idprefix", "_");
        attributes.set_default("idseparator", "_");
        attributes.set_default("safe-mode-name", safe_mode.as_str());

        Document {
            nodes: vec![Node::new(NodeKind::Document)],
            attributes,
            catalog: BTreeMap::new(),
            duplicate_ids: BTreeSet::new(),
            diagnostics: Vec::new(),
            safe_mode,
            source_path,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.nodes[0].title.as_deref()
    }

    pub fn safe_mode(&self) -> SafeMode {
        self.safe_mode
    }

    pub fn doctype(&self) -> Doctype {
        self.attribute("doctype")
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// The id used when deriving child ids; `None` for the document root.
    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.node(node).id.as_deref()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// Append `node` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Pre-order walk of `start` and everything beneath it.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            ordered.push(current);
            for child in self.node(current).children.iter().rev() {
                stack.push(*child);
            }
        }
        ordered
    }

    pub fn sections(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.node(*id).is_section())
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.catalog.get(id).copied()
    }

    pub fn catalog(&self) -> &BTreeMap<String, NodeId> {
        &self.catalog
    }

    /// Register `id` for `node`. A taken id is reported once and left pointing
    /// at its first owner.
    pub fn register_id(&mut self, id: &str, node: NodeId) -> bool {
        if let Some(existing) = self.catalog.get(id) {
            if *existing != node && self.duplicate_ids.insert(id.to_string()) {
                let cursor = self.node(node).line.map(|line| self.cursor(line));
                self.warn(cursor, format!("id assigned to block already in use: {id}"));
            }
            return false;
        }
        self.catalog.insert(id.to_string(), node);
        true
    }

    /// Re-walk the tree and rebuild the id registry from the nodes that are
    /// actually reachable from the root.
    pub fn rebuild_catalog(&mut self) {
        self.catalog.clear();
        for node in self.descendants(self.root()) {
            if let Some(id) = self.node(node).id.clone() {
                self.register_id(&id, node);
            }
        }
    }

    /// Copy the subtree rooted at `source_node` in `source` beneath `parent`,
    /// returning the id of the copied subtree root.
    pub fn graft(&mut self, source: &Document, source_node: NodeId, parent: NodeId) -> NodeId {
        let mut copy = source.node(source_node).clone();
        copy.children = Vec::new();
        copy.line = None;
        let grafted = self.append(parent, copy);
        for child in &source.node(source_node).children {
            self.graft(source, *child, grafted);
        }
        grafted
    }

    /// Move the subtree rooted at `node` so that `node` sits at `level`.
    pub fn relevel(&mut self, node: NodeId, level: usize) {
        let delta = level as isize - self.node(node).level as isize;
        if delta == 0 {
            return;
        }
        for id in self.descendants(node) {
            let current = self.nodes[id.0].level as isize;
            self.nodes[id.0].level = (current + delta).max(0) as usize;
        }
    }

    /// Section classification for `level` under this document's doctype.
    pub fn section_kind_for(&self, level: usize) -> SectionKind {
        match (self.doctype(), level) {
            (Doctype::Book, 0) => SectionKind::Part,
            (Doctype::Book, 1) => SectionKind::Chapter,
            _ => SectionKind::Section,
        }
    }

    /// Recompute section classification for every section under `start`.
    pub fn classify_sections(&mut self, start: NodeId) {
        for id in self.descendants(start) {
            if self.node(id).is_section() {
                let kind = self.section_kind_for(self.node(id).level);
                self.nodes[id.0].section_kind = Some(kind);
            }
        }
    }

    /// Cross references found in paragraphs, admonitions, lists and tables.
    pub fn references(&self) -> Vec<CrossReference> {
        let mut found = Vec::new();
        for id in self.descendants(self.root()) {
            let node = self.node(id);
            if !node.kind.has_inline_content() {
                continue;
            }
            for line in &node.lines {
                scan_references(line, id, &mut found);
            }
        }
        found
    }

    /// In-document references whose target id is not registered.
    pub fn unresolved_references(&self) -> Vec<CrossReference> {
        self.references()
            .into_iter()
            .filter(|reference| {
                !reference.target.contains(".adoc") && !self.catalog.contains_key(&reference.target)
            })
            .collect()
    }

    pub fn cursor(&self, line: usize) -> Cursor {
        Cursor::new(self.source_path.clone(), line)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Warning)
    }

    /// Take over diagnostics already reported by `other`, such as a fragment
    /// parsed on this document's behalf, relocated to `cursor`. They are not
    /// logged again.
    pub fn adopt_diagnostics(&mut self, other: &Document, cursor: Option<Cursor>) {
        self.diagnostics
            .extend(other.diagnostics.iter().map(|diagnostic| Diagnostic {
                cursor: cursor.clone(),
                ..diagnostic.clone()
            }));
        self.duplicate_ids
            .extend(other.duplicate_ids.iter().cloned());
    }

    pub fn info(&mut self, cursor: Option<Cursor>, message: impl Into<String>) {
        self.record(Severity::Info, cursor, message.into());
    }

    pub fn warn(&mut self, cursor: Option<Cursor>, message: impl Into<String>) {
        self.record(Severity::Warning, cursor, message.into());
    }

    pub fn error(&mut self, cursor: Option<Cursor>, message: impl Into<String>) {
        self.record(Severity::Error, cursor, message.into());
    }

    fn record(&mut self, severity: Severity, cursor: Option<Cursor>, message: String) {
        let location = cursor
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match severity {
            Severity::Info => info!(%location, "{message}"),
            Severity::Warning => warn!(%location, "{message}"),
            Severity::Error => error!(%location, "{message}"),
        }
        self.diagnostics.push(Diagnostic {
            severity,
            message,
            cursor,
        });
    }
}
