use similar::TextDiff;

/// Unified diff between a source document and its assembled output, or `None`
/// when assembly changed nothing.
pub fn build_unified_diff(original: &str, assembled: &str, path: &str) -> Option<String> {
    if original == assembled {
        return None;
    }

    let diff = TextDiff::from_lines(original, assembled);
    let header_old = format!("a/{path}");
    let header_new = format!("b/{path}");
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(&header_old, &header_new)
        .to_string();
    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_none_for_identical_content() {
        assert!(build_unified_diff("== A\n", "== A\n", "index.adoc").is_none());
    }

    #[test]
    fn shows_inserted_snippet_sections() {
        let diff = build_unified_diff(
            "== A\n\noperation::op[]\n",
            "== A\n\n[[_a_links]]\n=== Links\n",
            "index.adoc",
        )
        .unwrap();
        assert!(diff.starts_with("--- a/index.adoc\n+++ b/index.adoc\n"));
        assert!(diff.contains("-operation::op[]"));
        assert!(diff.contains("+=== Links"));
    }
}
