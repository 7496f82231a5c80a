//! A small AsciiDoc document engine: a line-based parser producing an arena
//! tree, attribute handling, diagnostics, and block macro extensions.

mod attributes;
mod diagnostics;
mod document;
mod extensions;
mod heading;
mod ids;
mod line;
mod parser;
mod writer;

pub use attributes::{parse_attribute_entry, AttributeEntry, AttributeList, Attributes};
pub use diagnostics::{Cursor, Diagnostic, Severity};
pub use document::{Doctype, Document, Node, NodeId, NodeKind, SafeMode, SectionKind};
pub use extensions::{
    BlockMacroProcessor, ExtensionError, Extensions, IncludeProcessor, MacroInvocation,
    Preprocessor,
};
pub use heading::{detect_section_title, section_marker, SectionTitle, MAX_SECTION_MARKERS};
pub use ids::{generate_id, unique_id, CrossReference};
pub use parser::{load, load_file, LoadError, LoadOptions};
pub use writer::{outline, to_asciidoc, to_tree, TreeNode};
