//! `include::restdocs:<operation>[snippets='a, b', level=N]`.
//!
//! The include form names its snippets explicitly and writes each heading
//! with `level` markers (four by default). Its text is parsed where the
//! include line stood, so headings carry generated ids rather than anchors.

use opdoc_tree::{Document, ExtensionError, IncludeProcessor, MacroInvocation, MAX_SECTION_MARKERS};
use tracing::debug;

use crate::operation::snippets_dir;
use crate::render::render_section;
use crate::selector::select;
use crate::title::title_for;

const TARGET_PREFIX: &str = "restdocs:";
const DEFAULT_MARKERS: usize = 4;

#[derive(Clone, Copy, Debug, Default)]
pub struct SnippetIncludeProcessor;

impl IncludeProcessor for SnippetIncludeProcessor {
    fn name(&self) -> &str {
        "restdocs-include"
    }

    fn handles(&self, target: &str) -> bool {
        target.starts_with(TARGET_PREFIX)
    }

    fn process(
        &self,
        invocation: &MacroInvocation,
        document: &mut Document,
    ) -> Result<String, ExtensionError> {
        let markers = heading_markers(invocation.attributes.get("level"))?;
        let target = invocation
            .target
            .strip_prefix(TARGET_PREFIX)
            .unwrap_or(&invocation.target);
        let operation = document.attributes().substitute(target);

        let Some(names) = invocation
            .attributes
            .get("snippets")
            .filter(|names| !names.trim().is_empty())
        else {
            debug!(%operation, "include names no snippets");
            return Ok(String::new());
        };

        let dir = snippets_dir(document);
        let mut text = String::new();
        for snippet in select(&operation, &dir, Some(names)) {
            let title = title_for(&snippet.name, document.attributes());
            let rendered = render_section(&snippet, &title, markers - 1, &operation);
            if let Some(warning) = rendered.warning {
                document.warn(Some(invocation.cursor.clone()), warning);
            }
            text.push_str(&rendered.text);
            text.push('\n');
        }
        Ok(text)
    }
}

/// Number of `=` markers for each snippet heading.
fn heading_markers(level: Option<&str>) -> Result<usize, ExtensionError> {
    let Some(raw) = level else {
        return Ok(DEFAULT_MARKERS);
    };
    match raw.trim().parse::<usize>() {
        Ok(markers) if (1..=MAX_SECTION_MARKERS).contains(&markers) => Ok(markers),
        _ => Err(ExtensionError::Failed(format!(
            "level must be between 1 and {MAX_SECTION_MARKERS}, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_four_markers() {
        assert_eq!(heading_markers(None).unwrap(), 4);
        assert_eq!(heading_markers(Some("2")).unwrap(), 2);
    }

    #[test]
    fn rejects_levels_outside_heading_range() {
        for raw in ["0", "7", "deep"] {
            let err = heading_markers(Some(raw)).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("level must be between 1 and 6, got '{raw}'")
            );
        }
    }

    #[test]
    fn handles_only_restdocs_targets() {
        let processor = SnippetIncludeProcessor;
        assert!(processor.handles("restdocs:get-widget"));
        assert!(!processor.handles("partials/intro.adoc"));
    }
}
