use std::collections::HashMap;

use once_cell::sync::Lazy;
use opdoc_tree::Attributes;

static DEFAULT_TITLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("http-request", "HTTP request"),
        ("curl-request", "Curl request"),
        ("httpie-request", "HTTPie request"),
        ("request-body", "Request body"),
        ("request-fields", "Request fields"),
        ("http-response", "HTTP response"),
        ("response-body", "Response body"),
        ("response-fields", "Response fields"),
        ("links", "Links"),
    ])
});

/// Attribute that overrides the heading of `snippet_name`.
pub fn title_attribute(snippet_name: &str) -> String {
    format!("operation-{snippet_name}-title")
}

pub fn default_title(snippet_name: &str) -> Option<&'static str> {
    DEFAULT_TITLES.get(snippet_name).copied()
}

/// Heading for a snippet: the document's override attribute, then the
/// built-in table, then a title derived from the name itself.
pub fn title_for(snippet_name: &str, attributes: &Attributes) -> String {
    if let Some(title) = attributes.get(&title_attribute(snippet_name)) {
        return title.to_string();
    }
    if let Some(title) = default_title(snippet_name) {
        return title.to_string();
    }
    derived_title(snippet_name)
}

fn derived_title(snippet_name: &str) -> String {
    let spaced = snippet_name.replacen('-', " ", 1);
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_default_table() {
        let attributes = Attributes::new();
        assert_eq!(title_for("request-fields", &attributes), "Request fields");
        assert_eq!(title_for("httpie-request", &attributes), "HTTPie request");
        assert_eq!(title_for("links", &attributes), "Links");
    }

    #[test]
    fn derives_title_from_first_hyphen_only() {
        let attributes = Attributes::new();
        assert_eq!(title_for("custom-thing", &attributes), "Custom thing");
        assert_eq!(title_for("path-parameters-v2", &attributes), "Path parameters-v2");
        assert_eq!(title_for("x", &attributes), "X");
    }

    #[test]
    fn derived_title_lowercases_after_first_letter() {
        let attributes = Attributes::new();
        assert_eq!(title_for("HTTP-thing", &attributes), "Http thing");
        assert_eq!(title_for("path-Parameters", &attributes), "Path parameters");
    }

    #[test]
    fn override_attribute_wins() {
        let mut attributes = Attributes::new();
        attributes.set("operation-curl-request-title", "Example request");
        attributes.set("operation-custom-thing-title", "Special");
        assert_eq!(title_for("curl-request", &attributes), "Example request");
        assert_eq!(title_for("custom-thing", &attributes), "Special");
        assert_eq!(title_for("http-request", &attributes), "HTTP request");
    }
}
