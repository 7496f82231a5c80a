use serde::Serialize;

use crate::document::{Document, Node, NodeId, NodeKind, SectionKind};
use crate::heading::section_marker;

/// Serialise the tree back to AsciiDoc.
///
/// Section levels are written as they sit in the tree, so `leveloffset`
/// entries are dropped. Only explicit ids are written; generated ids are
/// derived again when the output is parsed.
pub fn to_asciidoc(document: &Document) -> String {
    let mut out = String::new();
    let root = document.node(document.root());

    if let Some(title) = &root.title {
        out.push_str("= ");
        out.push_str(title);
        out.push('\n');
    }
    for line in &root.lines {
        if is_leveloffset_entry(line) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }

    let mut blocks = Vec::new();
    for child in document.children(document.root()) {
        write_node(document, *child, &mut blocks);
    }

    if !out.is_empty() && !blocks.is_empty() {
        out.push('\n');
    }
    out.push_str(&blocks.join("\n"));
    out
}

fn write_node(document: &Document, id: NodeId, blocks: &mut Vec<String>) {
    let node = document.node(id);
    let mut block = String::new();

    if node.kind == NodeKind::AttributeEntry {
        match node.lines.first() {
            Some(line) if !is_leveloffset_entry(line) => {
                block.push_str(line);
                block.push('\n');
                blocks.push(block);
            }
            _ => {}
        }
        return;
    }

    write_metadata(node, &mut block);

    match node.kind {
        NodeKind::Section => {
            block.push_str(&section_marker(node.level));
            block.push(' ');
            block.push_str(node.title.as_deref().unwrap_or_default());
            block.push('\n');
            blocks.push(block);
            for child in &node.children {
                write_node(document, *child, blocks);
            }
            return;
        }
        NodeKind::ThematicBreak => block.push_str("'''\n"),
        NodeKind::PageBreak => block.push_str("<<<\n"),
        _ => {
            if let Some(delimiter) = &node.delimiter {
                block.push_str(delimiter);
                block.push('\n');
            }
            for line in &node.lines {
                block.push_str(line);
                block.push('\n');
            }
            if let Some(delimiter) = &node.delimiter {
                block.push_str(delimiter);
                block.push('\n');
            }
        }
    }

    blocks.push(block);
}

fn write_metadata(node: &Node, block: &mut String) {
    if let Some(id) = node.id.as_deref().filter(|_| !node.generated_id) {
        block.push_str("[[");
        block.push_str(id);
        if let Some(reftext) = &node.reftext {
            block.push(',');
            block.push_str(reftext);
        }
        block.push_str("]]\n");
    }

    if node.kind != NodeKind::BlockMacro && !node.attributes.is_empty() {
        block.push('[');
        block.push_str(node.attributes.raw());
        block.push_str("]\n");
    }

    if node.kind != NodeKind::Section {
        if let Some(title) = &node.title {
            block.push('.');
            block.push_str(title);
            block.push('\n');
        }
    }
}

fn is_leveloffset_entry(line: &str) -> bool {
    line.starts_with(":leveloffset") || line.starts_with(":!leveloffset")
}

/// Indented section outline, numbered when `sectnums` is set.
pub fn outline(document: &Document) -> String {
    let numbered = document.has_attribute("sectnums");
    let mut counters: Vec<usize> = Vec::new();
    let mut out = String::new();

    if let Some(title) = document.title() {
        out.push_str(title);
        out.push('\n');
    }

    for id in document.sections() {
        let node = document.node(id);
        let level = node.level;
        out.push_str(&"  ".repeat(level.saturating_sub(1)));

        if numbered && level > 0 && node.section_kind != Some(SectionKind::Part) {
            counters.truncate(level);
            counters.resize(level, 0);
            counters[level - 1] += 1;
            let number: Vec<String> = counters.iter().map(ToString::to_string).collect();
            out.push_str(&number.join("."));
            out.push_str(". ");
        } else if level == 0 {
            counters.clear();
        }

        out.push_str(node.title.as_deref().unwrap_or_default());
        if let Some(anchor) = &node.id {
            out.push_str(" [");
            out.push_str(anchor);
            out.push(']');
        }
        out.push('\n');
    }

    out
}

#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_kind: Option<SectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Owned, serialisable view of the tree rooted at the document.
pub fn to_tree(document: &Document) -> TreeNode {
    tree_node(document, document.root())
}

fn tree_node(document: &Document, id: NodeId) -> TreeNode {
    let node = document.node(id);
    TreeNode {
        kind: node.kind,
        id: node.id.clone(),
        title: node.title.clone(),
        level: node.level,
        section_kind: node.section_kind,
        line: node.line,
        lines: if node.kind == NodeKind::Document {
            Vec::new()
        } else {
            node.lines.clone()
        },
        children: node
            .children
            .iter()
            .map(|child| tree_node(document, *child))
            .collect(),
    }
}
