//! The `operation` block macro.
//!
//! `operation::<name>[snippets='a,b']` expands into one sub-section per
//! snippet found under `<snippets>/<name>/`, nested one level below the
//! section that contains the macro.

use std::path::{Path, PathBuf};

use opdoc_tree::{
    BlockMacroProcessor, Cursor, Document, ExtensionError, MacroInvocation, NodeId,
    MAX_SECTION_MARKERS,
};
use tracing::{debug, instrument};

use crate::compose::{compose, parse_fragment};
use crate::render::render;
use crate::selector::select;
use crate::splice::splice;
use crate::title::title_for;

/// Deepest level a snippet section can be written at.
pub(crate) const MAX_SNIPPET_LEVEL: usize = MAX_SECTION_MARKERS - 1;

/// One expansion of the macro, with attribute references already resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation: String,
    pub snippets_dir: PathBuf,
    /// Raw `snippets` attribute; `None` or blank selects every snippet.
    pub snippets: Option<String>,
    pub cursor: Option<Cursor>,
}

/// Select, render, parse and splice the snippets of one operation beneath
/// `parent`. Problems are recorded as warnings on `document`; nothing here
/// aborts the build. Returns the inserted node ids.
#[instrument(level = "debug", skip(document), fields(operation = %request.operation))]
pub fn compose_operation_section(
    request: &OperationRequest,
    document: &mut Document,
    parent: NodeId,
) -> Vec<NodeId> {
    let parent_level = document.node(parent).level;
    let level = (parent_level + 1).min(MAX_SNIPPET_LEVEL);
    let section_id = document.id_of(parent).unwrap_or_default().to_string();

    let snippets = select(
        &request.operation,
        &request.snippets_dir,
        request.snippets.as_deref(),
    );
    debug!(count = snippets.len(), dir = %request.snippets_dir.display(), "selected snippets");

    let rendered = snippets
        .iter()
        .map(|snippet| {
            let title = title_for(&snippet.name, document.attributes());
            render(snippet, &title, level, &section_id, &request.operation)
        })
        .collect();

    let composition = compose(rendered, &request.operation, &request.snippets_dir);
    for warning in composition.warnings {
        document.warn(request.cursor.clone(), warning);
    }

    let fragment = parse_fragment(&composition.text, document, parent_level);
    document.adopt_diagnostics(&fragment, request.cursor.clone());

    splice(&fragment, document, parent)
}

/// Base directory for snippets: the `snippets` attribute, resolved against
/// `docdir` when relative.
pub fn snippets_dir(document: &Document) -> PathBuf {
    let configured = PathBuf::from(document.attribute("snippets").unwrap_or_default());
    if configured.is_absolute() {
        return configured;
    }
    match document.attribute("docdir") {
        Some(docdir) => Path::new(docdir).join(configured),
        None => configured,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OperationBlockMacro;

impl BlockMacroProcessor for OperationBlockMacro {
    fn name(&self) -> &str {
        "operation"
    }

    fn process(
        &self,
        invocation: &MacroInvocation,
        document: &mut Document,
    ) -> Result<(), ExtensionError> {
        let request = OperationRequest {
            operation: document.attributes().substitute(&invocation.target),
            snippets_dir: snippets_dir(document),
            snippets: invocation.attributes.get("snippets").map(str::to_string),
            cursor: Some(invocation.cursor.clone()),
        };
        compose_operation_section(&request, document, invocation.parent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opdoc_tree::{Attributes, SafeMode};

    #[test]
    fn relative_snippets_dir_resolves_against_docdir() {
        let mut attributes = Attributes::new();
        attributes.set("docdir", "/project/docs");
        attributes.set("snippets", "../build/generated-snippets");
        let document = Document::new(SafeMode::Safe, attributes, None);
        assert_eq!(
            snippets_dir(&document),
            PathBuf::from("/project/docs/../build/generated-snippets")
        );

        let mut attributes = Attributes::new();
        attributes.set("docdir", "/project/docs");
        attributes.set("snippets", "/abs/snippets");
        let document = Document::new(SafeMode::Safe, attributes, None);
        assert_eq!(snippets_dir(&document), PathBuf::from("/abs/snippets"));
    }
}
