use std::path::Path;

use opdoc_tree::{load, Document, Extensions, LoadOptions};

use crate::render::RenderedSnippet;

/// Fragment text for one operation and the warnings raised while building it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Concatenate rendered snippets in selection order. With nothing selected the
/// fragment is a single placeholder line and a warning naming the directory
/// that was searched.
pub fn compose(rendered: Vec<RenderedSnippet>, operation: &str, snippets_dir: &Path) -> Composition {
    if rendered.is_empty() {
        return Composition {
            text: format!("No snippets found for operation::{operation}\n"),
            warnings: vec![format!(
                "No snippets were found for operation {operation} in {}",
                snippets_dir.display()
            )],
        };
    }

    let mut composition = Composition::default();
    for snippet in rendered {
        composition.text.push_str(&snippet.text);
        composition.warnings.extend(snippet.warning);
    }
    composition
}

/// Parse fragment text as content destined for a node at `parent_level`.
///
/// The fragment inherits the enclosing document's safe mode and attributes,
/// except `leveloffset`: the text already carries absolute levels. No
/// extensions are registered, so macros inside snippets stay inert.
pub fn parse_fragment(text: &str, document: &Document, parent_level: usize) -> Document {
    let options = LoadOptions::new()
        .with_safe_mode(document.safe_mode())
        .with_attributes(document.attributes().without(&["leveloffset"]))
        .with_extensions(Extensions::new())
        .with_parent_level(parent_level);
    load(text, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opdoc_tree::Attributes;
    use opdoc_tree::SafeMode;

    #[test]
    fn empty_selection_yields_placeholder_without_heading() {
        let composition = compose(Vec::new(), "get-widget", Path::new("/snippets"));
        assert_eq!(composition.text, "No snippets found for operation::get-widget\n");
        assert_eq!(
            composition.warnings,
            vec!["No snippets were found for operation get-widget in /snippets".to_string()]
        );
    }

    #[test]
    fn concatenates_in_order_and_collects_warnings() {
        let rendered = vec![
            RenderedSnippet {
                text: "first\n".into(),
                warning: None,
            },
            RenderedSnippet {
                text: "second\n".into(),
                warning: Some("missing".into()),
            },
        ];
        let composition = compose(rendered, "op", Path::new("/s"));
        assert_eq!(composition.text, "first\nsecond\n");
        assert_eq!(composition.warnings, vec!["missing".to_string()]);
    }

    #[test]
    fn fragment_ignores_enclosing_leveloffset() {
        let mut attributes = Attributes::new();
        attributes.set("leveloffset", "+1");
        attributes.set("product", "Widgets");
        let document = Document::new(SafeMode::Server, attributes, None);

        let fragment = parse_fragment("[[_x]]\n== {product} request\n\nBody\n", &document, 0);
        let section = fragment.sections()[0];
        assert_eq!(fragment.node(section).level, 1);
        assert_eq!(fragment.node(section).title.as_deref(), Some("Widgets request"));
        assert_eq!(fragment.safe_mode(), SafeMode::Server);
        assert!(fragment.diagnostics().is_empty());
    }
}
