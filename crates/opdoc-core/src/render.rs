use std::fs;

use opdoc_tree::section_marker;

use crate::selector::Snippet;

/// Text for one snippet sub-section, plus the warning to report when the
/// snippet could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedSnippet {
    pub text: String,
    pub warning: Option<String>,
}

/// Anchor id for a snippet section: `<section_id>_<name>` with the first
/// hyphen of the name turned into an underscore.
pub fn anchor_id(section_id: &str, snippet_name: &str) -> String {
    format!("{section_id}_{}", snippet_name.replacen('-', "_", 1))
}

pub fn render(
    snippet: &Snippet,
    title: &str,
    level: usize,
    section_id: &str,
    operation: &str,
) -> RenderedSnippet {
    let mut rendered = render_section(snippet, title, level, operation);
    let anchor = format!("[[{}]]\n", anchor_id(section_id, &snippet.name));
    rendered.text.insert_str(0, &anchor);
    rendered
}

/// Heading and content for a snippet, without an anchor line.
pub fn render_section(snippet: &Snippet, title: &str, level: usize, operation: &str) -> RenderedSnippet {
    let mut text = String::new();
    text.push_str(&section_marker(level));
    text.push(' ');
    text.push_str(title);
    text.push_str("\n\n");

    match fs::read_to_string(&snippet.path) {
        Ok(content) => {
            text.push_str(&content);
            if !content.ends_with('\n') {
                text.push('\n');
            }
            RenderedSnippet {
                text,
                warning: None,
            }
        }
        Err(_) => {
            text.push_str(&format!(
                "Snippet {} not found for operation::{operation}\n\n",
                snippet.name
            ));
            RenderedSnippet {
                text,
                warning: Some(format!(
                    "Snippet {} not found at {} for operation {operation}",
                    snippet.name,
                    snippet.path.display()
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn renders_anchor_heading_and_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("curl-request.adoc");
        fs::write(&path, "$ curl localhost").unwrap();
        let snippet = Snippet {
            name: "curl-request".into(),
            path,
        };

        let rendered = render(&snippet, "Curl request", 2, "_orders", "create-order");
        assert_eq!(
            rendered.text,
            "[[_orders_curl_request]]\n=== Curl request\n\n$ curl localhost\n"
        );
        assert_eq!(rendered.warning, None);
    }

    #[test]
    fn missing_file_renders_placeholder() {
        let snippet = Snippet {
            name: "links".into(),
            path: PathBuf::from("/nowhere/op/links.adoc"),
        };

        let rendered = render(&snippet, "Links", 1, "", "op");
        assert_eq!(
            rendered.text,
            "[[_links]]\n== Links\n\nSnippet links not found for operation::op\n\n"
        );
        assert_eq!(
            rendered.warning.as_deref(),
            Some("Snippet links not found at /nowhere/op/links.adoc for operation op")
        );
    }

    #[test]
    fn only_first_hyphen_becomes_underscore() {
        assert_eq!(anchor_id("_api", "request-path-parameters"), "_api_request_path-parameters");
    }
}
