use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::NodeId;

static ANGLE_XREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<([^,>\s]+)(?:,\s*([^>]*))?>>").expect("valid regex"));

static MACRO_XREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xref:([^\s\[]+)\[([^\]]*)\]").expect("valid regex"));

/// Build a section id from its title, Asciidoctor style (`HTTP request` -> `_http_request`).
pub fn generate_id(title: &str, prefix: &str, separator: &str) -> String {
    let mut id = String::from(prefix);
    let mut body = String::new();
    let mut pending_separator = false;

    for ch in title.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_separator && !body.is_empty() {
                body.push_str(separator);
            }
            pending_separator = false;
            body.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '.' {
            pending_separator = true;
        }
    }

    id.push_str(&body);
    id
}

/// Append `_2`, `_3`, ... until `base` no longer collides with a registered id.
pub fn unique_id(base: String, separator: &str, taken: &BTreeMap<String, NodeId>) -> String {
    if !taken.contains_key(&base) {
        return base;
    }

    let mut counter = 2usize;
    loop {
        let candidate = format!("{base}{separator}{counter}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Cross reference found in block content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossReference {
    pub target: String,
    pub text: Option<String>,
    pub node: NodeId,
}

pub(crate) fn scan_references(line: &str, node: NodeId, found: &mut Vec<CrossReference>) {
    for caps in ANGLE_XREF.captures_iter(line) {
        found.push(CrossReference {
            target: caps[1].to_string(),
            text: caps.get(2).map(|text| text.as_str().trim().to_string()),
            node,
        });
    }

    for caps in MACRO_XREF.captures_iter(line) {
        let target = caps[1].trim_start_matches('#').to_string();
        let text = caps[2].trim();
        found.push(CrossReference {
            target,
            text: (!text.is_empty()).then(|| text.to_string()),
            node,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_prefixed_ids() {
        assert_eq!(generate_id("HTTP request", "_", "_"), "_http_request");
        assert_eq!(generate_id("Curl  request!", "_", "_"), "_curl_request");
        assert_eq!(generate_id("São Tomé", "", "-"), "são-tomé");
    }

    #[test]
    fn deduplicates_with_counter() {
        let mut taken = BTreeMap::new();
        taken.insert("_links".to_string(), NodeId::from_index(1));
        taken.insert("_links_2".to_string(), NodeId::from_index(2));
        assert_eq!(unique_id("_links".into(), "_", &taken), "_links_3");
        assert_eq!(unique_id("_other".into(), "_", &taken), "_other");
    }

    #[test]
    fn scans_both_reference_forms() {
        let mut found = Vec::new();
        scan_references(
            "See <<_b_curl_request,the request>> and xref:#_links[links].",
            NodeId::from_index(4),
            &mut found,
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].target, "_b_curl_request");
        assert_eq!(found[0].text.as_deref(), Some("the request"));
        assert_eq!(found[1].target, "_links");
    }
}
