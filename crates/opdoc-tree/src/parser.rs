//! Line-oriented parser building a [`Document`] from AsciiDoc source.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::attributes::{parse_attribute_entry, AttributeEntry, AttributeList, Attributes};
use crate::document::{Document, Node, NodeId, NodeKind, SafeMode};
use crate::extensions::{Extensions, IncludeProcessor, MacroInvocation};
use crate::heading::{detect_section_title, SectionTitle};
use crate::ids::{generate_id, unique_id};
use crate::line::{lines_from_str, LineRecord};

static BLOCK_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\[([A-Za-z_:][\w:.-]*)(?:,\s*(.+?))?\]\]$").expect("valid regex")
});

static BLOCK_ATTRIBUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\[\]\s][^\]]*|)\]$").expect("valid regex"));

static BLOCK_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.([^\s.].*)$").expect("valid regex"));

static BLOCK_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][\w-]*)::(\S*?)\[(.*)\]$").expect("valid regex"));

static ADMONITION_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s").expect("valid regex"));

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\*+|-|\.+|\d+\.)\s+\S").expect("valid regex"));

const ADMONITION_STYLES: [&str; 5] = ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub safe_mode: SafeMode,
    /// API attributes; locked entries win over the document's own entries.
    pub attributes: Attributes,
    pub extensions: Extensions,
    pub source_path: Option<PathBuf>,
    /// Level of the node the parsed content will be attached under.
    pub parent_level: usize,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_safe_mode(mut self, safe_mode: SafeMode) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set_locked(name, value);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_parent_level(mut self, level: usize) -> Self {
        self.parent_level = level;
        self
    }
}

/// Parse `input` into a document. Problems in the source are recorded as
/// diagnostics on the returned document rather than failing the load.
#[instrument(level = "debug", skip_all, fields(path = ?options.source_path))]
pub fn load(input: &str, options: LoadOptions) -> Document {
    let LoadOptions {
        safe_mode,
        attributes,
        extensions,
        source_path,
        parent_level,
    } = options;

    let document = Document::new(safe_mode, attributes, source_path);
    let mut parser = Parser::new(lines_from_str(input), document, &extensions, parent_level);
    parser.parse_header();
    parser.run_preprocessors();
    parser.parse_body();
    let document = parser.finish();
    debug!(
        nodes = document.len(),
        diagnostics = document.diagnostics().len(),
        "document loaded"
    );
    document
}

/// Read and parse a file, deriving `docdir`, `docfile` and `docname` from its
/// location unless they were supplied.
pub fn load_file(path: &Path, mut options: LoadOptions) -> Result<Document, LoadError> {
    let input = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if let Some(dir) = absolute.parent() {
        options
            .attributes
            .set_default("docdir", dir.display().to_string());
    }
    options
        .attributes
        .set_default("docfile", absolute.display().to_string());
    if let Some(stem) = absolute.file_stem() {
        options
            .attributes
            .set_default("docname", stem.to_string_lossy().into_owned());
    }
    if options.source_path.is_none() {
        options.source_path = Some(path.to_path_buf());
    }

    Ok(load(&input, options))
}

/// Block metadata collected from anchor, attribute and title lines, waiting
/// for the block it belongs to.
#[derive(Default)]
struct Pending {
    id: Option<String>,
    reftext: Option<String>,
    attributes: AttributeList,
    title: Option<String>,
}

struct Parser<'a> {
    lines: Vec<LineRecord>,
    pos: usize,
    document: Document,
    extensions: &'a Extensions,
    sections: Vec<NodeId>,
    pending: Pending,
    leveloffset: isize,
    parent_level: usize,
}

impl<'a> Parser<'a> {
    fn new(
        lines: Vec<LineRecord>,
        document: Document,
        extensions: &'a Extensions,
        parent_level: usize,
    ) -> Self {
        let leveloffset = document
            .attribute("leveloffset")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);
        let root = document.root();
        Parser {
            lines,
            pos: 0,
            document,
            extensions,
            sections: vec![root],
            pending: Pending::default(),
            leveloffset,
            parent_level,
        }
    }

    fn finish(self) -> Document {
        self.document
    }

    fn parse_header(&mut self) {
        let root = self.document.root();
        let mut seen_title = false;

        while let Some(record) = self.lines.get(self.pos).cloned() {
            let text = record.text.as_str();

            if text.trim().is_empty() {
                if seen_title {
                    self.pos += 1;
                    break;
                }
                self.pos += 1;
                continue;
            }

            if is_comment_delimiter(text) {
                self.skip_comment_block(&record);
                continue;
            }

            if is_line_comment(text) {
                self.pos += 1;
                continue;
            }

            if let Some(entry) = parse_attribute_entry(text) {
                self.apply_entry(entry, &record);
                self.document.node_mut(root).lines.push(text.to_string());
                self.pos += 1;
                continue;
            }

            if !seen_title {
                if let Some(heading) = detect_section_title(text) {
                    if heading.markers == 1 {
                        let title = self.document.attributes().substitute(&heading.title);
                        self.document.node_mut(root).title = Some(title.clone());
                        self.document.attributes_mut().set_default("doctitle", title);
                        seen_title = true;
                        self.pos += 1;
                        continue;
                    }
                }
            }

            break;
        }
    }

    fn run_preprocessors(&mut self) {
        for preprocessor in self.extensions.preprocessors() {
            if let Err(err) = preprocessor.process(&mut self.document) {
                self.document.warn(
                    None,
                    format!("{} preprocessor failed: {err}", preprocessor.name()),
                );
            }
        }
    }

    fn parse_body(&mut self) {
        while let Some(record) = self.lines.get(self.pos).cloned() {
            let text = record.text.as_str();

            if text.trim().is_empty() {
                self.pos += 1;
                continue;
            }

            if is_comment_delimiter(text) {
                self.skip_comment_block(&record);
                continue;
            }

            if is_line_comment(text) {
                self.pos += 1;
                continue;
            }

            if let Some(entry) = parse_attribute_entry(text) {
                self.apply_entry(entry, &record);
                let mut node = Node::new(NodeKind::AttributeEntry);
                node.lines.push(text.to_string());
                self.append_block(node, &record);
                self.pos += 1;
                continue;
            }

            if let Some(caps) = BLOCK_ANCHOR.captures(text) {
                self.pending.id = Some(caps[1].to_string());
                self.pending.reftext = caps.get(2).map(|m| m.as_str().to_string());
                self.pos += 1;
                continue;
            }

            if let Some(caps) = BLOCK_ATTRIBUTES.captures(text) {
                let list = AttributeList::parse(&caps[1]);
                if let Some(id) = list.id() {
                    self.pending.id = Some(id.to_string());
                }
                self.pending.attributes = list;
                self.pos += 1;
                continue;
            }

            if let Some(caps) = BLOCK_TITLE.captures(text) {
                self.pending.title = Some(caps[1].to_string());
                self.pos += 1;
                continue;
            }

            if let Some(heading) = detect_section_title(text) {
                self.parse_section(heading, &record);
                self.pos += 1;
                continue;
            }

            if let Some(caps) = BLOCK_MACRO.captures(text) {
                let name = caps[1].to_string();
                let target = caps[2].to_string();
                let raw = caps[3].to_string();
                self.parse_block_macro(name, target, &raw, &record);
                self.pos += 1;
                continue;
            }

            if let Some(kind) = delimited_kind(text) {
                self.parse_delimited(kind, &record);
                continue;
            }

            match text.trim_end() {
                "'''" => {
                    self.append_block(Node::new(NodeKind::ThematicBreak), &record);
                    self.pos += 1;
                }
                "<<<" => {
                    self.append_block(Node::new(NodeKind::PageBreak), &record);
                    self.pos += 1;
                }
                _ => self.parse_paragraph(&record),
            }
        }
    }

    fn current_parent(&self) -> NodeId {
        self.sections
            .last()
            .copied()
            .unwrap_or_else(|| self.document.root())
    }

    fn level_of(&self, node: NodeId) -> usize {
        if node == self.document.root() {
            self.parent_level
        } else {
            self.document.node(node).level
        }
    }

    fn apply_entry(&mut self, entry: AttributeEntry, record: &LineRecord) {
        if entry.name() == "leveloffset" {
            self.apply_leveloffset(&entry);
        }

        let applied = match entry {
            AttributeEntry::Set { name, value } => {
                let value = self.document.attributes().substitute(&value);
                self.document.attributes_mut().set(name, value)
            }
            AttributeEntry::Unset { name } => {
                let locked = self.document.attributes().is_locked(&name);
                self.document.attributes_mut().unset(&name);
                !locked
            }
        };

        if !applied {
            debug!(line = record.number, "attribute entry ignored, locked by API");
        }
    }

    fn apply_leveloffset(&mut self, entry: &AttributeEntry) {
        if self.document.attributes().is_locked("leveloffset") {
            return;
        }
        self.leveloffset = match entry {
            AttributeEntry::Unset { .. } => 0,
            AttributeEntry::Set { value, .. } => {
                let value = value.trim();
                let parsed = value.trim_start_matches('+').parse::<isize>().unwrap_or(0);
                if value.starts_with('+') || value.starts_with('-') {
                    self.leveloffset + parsed
                } else {
                    parsed
                }
            }
        };
    }

    fn parse_section(&mut self, heading: SectionTitle, record: &LineRecord) {
        let level = (heading.level() as isize + self.leveloffset).max(0) as usize;

        while self.sections.len() > 1 {
            let top = self.current_parent();
            if self.document.node(top).level >= level {
                self.sections.pop();
            } else {
                break;
            }
        }

        let parent = self.current_parent();
        let expected = self.level_of(parent) + 1;
        if level > expected {
            let cursor = self.document.cursor(record.number);
            self.document.warn(
                Some(cursor),
                format!("section title out of sequence: expected level {expected}, got level {level}"),
            );
        }

        let pending = std::mem::take(&mut self.pending);
        let title = self.document.attributes().substitute(&heading.title);
        let mut node = Node::new(NodeKind::Section);
        node.level = level;
        node.section_kind = Some(self.document.section_kind_for(level));
        node.reftext = pending.reftext;
        node.attributes = pending.attributes;
        node.line = Some(record.number);

        let id = match pending.id {
            Some(id) => Some(id),
            None if self.document.has_attribute("sectids") => {
                let prefix = self.document.attribute("idprefix").unwrap_or_default();
                let separator = self.document.attribute("idseparator").unwrap_or_default();
                let base = generate_id(&title, prefix, separator);
                node.generated_id = true;
                Some(unique_id(base, separator, self.document.catalog()))
            }
            None => None,
        };
        node.title = Some(title);
        node.id = id.clone();

        let section = self.document.append(parent, node);
        if let Some(id) = id {
            self.document.register_id(&id, section);
        }
        self.sections.push(section);
    }

    fn parse_block_macro(&mut self, name: String, target: String, raw: &str, record: &LineRecord) {
        let parent = self.current_parent();
        let attributes = AttributeList::parse(raw);

        if name == "include" {
            if let Some(processor) = self.extensions.find_include(&target) {
                let invocation = MacroInvocation {
                    name,
                    target,
                    attributes,
                    parent,
                    cursor: self.document.cursor(record.number),
                };
                self.push_include(processor.as_ref(), &invocation, record);
                return;
            }
        }

        let Some(processor) = self.extensions.find_block_macro(&name) else {
            let mut node = Node::new(NodeKind::BlockMacro);
            node.lines.push(record.text.clone());
            node.attributes = attributes;
            self.append_block(node, record);
            return;
        };

        let pending = std::mem::take(&mut self.pending);
        if pending.id.is_some() || pending.title.is_some() || !pending.attributes.is_empty() {
            debug!(macro_name = %name, id = ?pending.id, "block metadata before macro dropped");
        }
        let invocation = MacroInvocation {
            name: name.clone(),
            target,
            attributes,
            parent,
            cursor: self.document.cursor(record.number),
        };
        debug!(macro_name = %name, target = %invocation.target, "processing block macro");

        if let Err(err) = processor.process(&invocation, &mut self.document) {
            self.document
                .error(Some(invocation.cursor), format!("{name} block macro failed: {err}"));
        }
    }

    /// Replace the include line with the processor's text so it is parsed
    /// in place. Included lines report the include line's number.
    fn push_include(
        &mut self,
        processor: &dyn IncludeProcessor,
        invocation: &MacroInvocation,
        record: &LineRecord,
    ) {
        debug!(processor = processor.name(), target = %invocation.target, "processing include");
        match processor.process(invocation, &mut self.document) {
            Ok(text) => {
                let included = lines_from_str(&text).into_iter().map(|line| LineRecord {
                    text: line.text,
                    number: record.number,
                });
                let at = self.pos + 1;
                self.lines.splice(at..at, included);
            }
            Err(err) => self.document.error(
                Some(invocation.cursor.clone()),
                format!("include::{} failed: {err}", invocation.target),
            ),
        }
    }

    fn parse_delimited(&mut self, kind: NodeKind, record: &LineRecord) {
        let delimiter = record.text.trim_end().to_string();
        let mut node = Node::new(kind);
        node.delimiter = Some(delimiter.clone());
        self.pos += 1;

        let mut closed = false;
        while let Some(line) = self.lines.get(self.pos) {
            self.pos += 1;
            if line.text.trim_end() == delimiter {
                closed = true;
                break;
            }
            node.lines.push(line.text.clone());
        }

        if !closed {
            let cursor = self.document.cursor(record.number);
            self.document
                .warn(Some(cursor), format!("unterminated {kind} block"));
        }

        self.append_block(node, record);
    }

    fn parse_paragraph(&mut self, record: &LineRecord) {
        let mut lines = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.text.trim().is_empty() || (!lines.is_empty() && starts_block(&line.text)) {
                break;
            }
            lines.push(line.text.clone());
            self.pos += 1;
        }

        let styled_admonition = self
            .pending
            .attributes
            .style()
            .is_some_and(|style| ADMONITION_STYLES.contains(&style));
        let kind = if styled_admonition || ADMONITION_PARAGRAPH.is_match(&lines[0]) {
            NodeKind::Admonition
        } else if LIST_ITEM.is_match(&lines[0]) {
            NodeKind::List
        } else {
            NodeKind::Paragraph
        };

        let mut node = Node::new(kind);
        node.lines = lines;
        self.append_block(node, record);
    }

    fn skip_comment_block(&mut self, record: &LineRecord) {
        let delimiter = record.text.trim_end().to_string();
        self.pos += 1;
        while let Some(line) = self.lines.get(self.pos) {
            self.pos += 1;
            if line.text.trim_end() == delimiter {
                return;
            }
        }
        let cursor = self.document.cursor(record.number);
        self.document
            .warn(Some(cursor), "unterminated comment block");
    }

    /// Attach a block to the current section, consuming pending metadata.
    fn append_block(&mut self, mut node: Node, record: &LineRecord) -> NodeId {
        let parent = self.current_parent();
        let pending = std::mem::take(&mut self.pending);
        node.level = self.document.node(parent).level;
        node.line = Some(record.number);
        node.reftext = pending.reftext;
        node.title = pending.title;
        if node.attributes.is_empty() {
            node.attributes = pending.attributes;
        }
        node.id = pending.id;

        let id = node.id.clone();
        let appended = self.document.append(parent, node);
        if let Some(id) = id {
            self.document.register_id(&id, appended);
        }
        appended
    }
}

fn is_comment_delimiter(text: &str) -> bool {
    let trimmed = text.trim_end();
    trimmed.len() >= 4 && trimmed.chars().all(|ch| ch == '/')
}

fn is_line_comment(text: &str) -> bool {
    text.starts_with("//") && !text.starts_with("///")
}

/// Lines that end a paragraph when they follow paragraph text.
fn starts_block(text: &str) -> bool {
    delimited_kind(text).is_some() || BLOCK_ANCHOR.is_match(text) || BLOCK_ATTRIBUTES.is_match(text)
}

fn delimited_kind(text: &str) -> Option<NodeKind> {
    let trimmed = text.trim_end();
    if trimmed == "--" {
        return Some(NodeKind::Open);
    }
    if trimmed == "|===" {
        return Some(NodeKind::Table);
    }
    if trimmed.len() < 4 {
        return None;
    }

    let first = trimmed.chars().next()?;
    if !trimmed.chars().all(|ch| ch == first) {
        return None;
    }

    match first {
        '-' => Some(NodeKind::Listing),
        '.' => Some(NodeKind::Literal),
        '=' => Some(NodeKind::Example),
        '*' => Some(NodeKind::Sidebar),
        '_' => Some(NodeKind::Quote),
        '+' => Some(NodeKind::Pass),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_delimiters() {
        assert_eq!(delimited_kind("----"), Some(NodeKind::Listing));
        assert_eq!(delimited_kind("......"), Some(NodeKind::Literal));
        assert_eq!(delimited_kind("--"), Some(NodeKind::Open));
        assert_eq!(delimited_kind("|==="), Some(NodeKind::Table));
        assert_eq!(delimited_kind("---"), None);
        assert_eq!(delimited_kind("-=-="), None);
    }

    #[test]
    fn relative_leveloffset_accumulates() {
        let document = load(
            "= Doc\n\n:leveloffset: +1\n\n= Shifted\n\n:leveloffset: +1\n\n= Deeper\n\n:leveloffset!:\n\n== Plain\n",
            LoadOptions::new(),
        );
        let levels: Vec<_> = document
            .sections()
            .into_iter()
            .map(|id| document.node(id).level)
            .collect();
        assert_eq!(levels, vec![1, 2, 1]);
    }

    #[test]
    fn comment_lines_are_skipped() {
        let document = load("// note\n////\n== Hidden\n////\n\nVisible\n", LoadOptions::new());
        assert!(document.sections().is_empty());
        let root = document.root();
        assert_eq!(document.children(root).len(), 1);
    }
}
