//! Document attributes, attribute entries, and block attribute lists.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

static ATTRIBUTE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:(!?)(\w[\w-]*)(!?):(?:[ \t]+(.*))?$").expect("valid regex"));

static ATTRIBUTE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\\)?\{(\w[\w-]*)\}").expect("valid regex"));

/// Attribute map owned by a document.
///
/// Locked attributes were supplied through the API (or command line) and win
/// over attribute entries found in the document itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    values: BTreeMap<String, String>,
    #[serde(skip)]
    locked: BTreeSet<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    /// Set an attribute unless it is locked. Returns whether the value was applied.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.locked.contains(&name) {
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    /// Set and lock an attribute so document entries cannot change it.
    pub fn set_locked(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.values.insert(name.clone(), value.into());
        self.locked.insert(name);
    }

    /// Set an attribute only when no value is present yet.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.values.contains_key(&name) || self.locked.contains(&name) {
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    pub fn unset(&mut self, name: &str) -> bool {
        if self.locked.contains(name) {
            return false;
        }
        self.values.remove(name).is_some()
    }

    /// Lock a name without giving it a value, e.g. `-a name!` on the command line.
    pub fn lock_unset(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.values.remove(&name);
        self.locked.insert(name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unlocked copy of these attributes without the named entries.
    pub fn without(&self, excluded: &[&str]) -> Attributes {
        let values = self
            .values
            .iter()
            .filter(|(name, _)| !excluded.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Attributes {
            values,
            locked: BTreeSet::new(),
        }
    }

    /// Replace `{name}` references with attribute values.
    ///
    /// Unknown references are left untouched and `\{name}` yields the literal
    /// reference.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains('{') {
            return text.to_string();
        }

        ATTRIBUTE_REFERENCE
            .replace_all(text, |caps: &Captures<'_>| {
                let name = &caps[2];
                if caps.get(1).is_some() {
                    return format!("{{{name}}}");
                }
                match self.get(name) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Parsed `:name: value` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeEntry {
    Set { name: String, value: String },
    Unset { name: String },
}

impl AttributeEntry {
    pub fn name(&self) -> &str {
        match self {
            AttributeEntry::Set { name, .. } | AttributeEntry::Unset { name } => name,
        }
    }
}

pub fn parse_attribute_entry(line: &str) -> Option<AttributeEntry> {
    let caps = ATTRIBUTE_ENTRY.captures(line)?;
    let name = caps[2].to_string();
    let negated = !caps[1].is_empty() || !caps[3].is_empty();
    if negated {
        return Some(AttributeEntry::Unset { name });
    }
    let value = caps
        .get(4)
        .map(|value| value.as_str().trim_end().to_string())
        .unwrap_or_default();
    Some(AttributeEntry::Set { name, value })
}

/// Positional and named attributes from a block attribute line or macro.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AttributeList {
    raw: String,
    positional: Vec<String>,
    named: Vec<(String, String)>,
}

impl AttributeList {
    pub fn parse(raw: &str) -> Self {
        let mut list = AttributeList {
            raw: raw.to_string(),
            ..AttributeList::default()
        };

        for entry in split_entries(raw) {
            match split_named(&entry) {
                Some((name, value)) => list.named.push((name, value)),
                None => {
                    let value = unquote(entry.trim());
                    list.positional.push(value);
                }
            }
        }

        list
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Block style from the first positional attribute, without shorthand.
    pub fn style(&self) -> Option<&str> {
        let first = self.positional(0)?;
        let end = first.find(['#', '.', '%']).unwrap_or(first.len());
        let style = &first[..end];
        (!style.is_empty()).then_some(style)
    }

    /// Id from `id=` or the `#id` shorthand in the first positional attribute.
    pub fn id(&self) -> Option<&str> {
        if let Some(id) = self.get("id") {
            return Some(id);
        }
        let first = self.positional(0)?;
        let start = first.find('#')? + 1;
        let rest = &first[start..];
        let end = rest.find(['.', '%']).unwrap_or(rest.len());
        let id = &rest[..end];
        (!id.is_empty()).then_some(id)
    }
}

fn split_entries(raw: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => entries.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }

    if !current.trim().is_empty() || !entries.is_empty() {
        entries.push(current);
    }

    entries
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .collect()
}

fn split_named(entry: &str) -> Option<(String, String)> {
    let trimmed = entry.trim();
    if trimmed.starts_with(['\'', '"']) {
        return None;
    }
    let (name, value) = trimmed.split_once('=')?;
    let name = name.trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
    {
        return None;
    }
    Some((name.to_string(), unquote(value.trim())))
}

fn unquote(value: &str) -> String {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_and_unset_entries() {
        assert_eq!(
            parse_attribute_entry(":snippets: build/generated-snippets"),
            Some(AttributeEntry::Set {
                name: "snippets".into(),
                value: "build/generated-snippets".into()
            })
        );
        assert_eq!(
            parse_attribute_entry(":sectids!:"),
            Some(AttributeEntry::Unset {
                name: "sectids".into()
            })
        );
        assert_eq!(
            parse_attribute_entry(":!sectnums:"),
            Some(AttributeEntry::Unset {
                name: "sectnums".into()
            })
        );
        assert!(parse_attribute_entry("not: an entry").is_none());
    }

    #[test]
    fn locked_attributes_ignore_document_entries() {
        let mut attributes = Attributes::new();
        attributes.set_locked("snippets", "custom");
        assert!(!attributes.set("snippets", "other"));
        assert!(!attributes.set_default("snippets", "other"));
        assert_eq!(attributes.get("snippets"), Some("custom"));
    }

    #[test]
    fn substitutes_known_references_only() {
        let mut attributes = Attributes::new();
        attributes.set("name", "some");
        assert_eq!(attributes.substitute("{name}-operation"), "some-operation");
        assert_eq!(attributes.substitute("{missing}-operation"), "{missing}-operation");
        assert_eq!(attributes.substitute("\\{name}"), "{name}");
    }

    #[test]
    fn parses_quoted_named_values_with_commas() {
        let list = AttributeList::parse("snippets='curl-request,http-request',level=3");
        assert_eq!(list.get("snippets"), Some("curl-request,http-request"));
        assert_eq!(list.get("level"), Some("3"));
        assert!(list.positional(0).is_none());
    }

    #[test]
    fn reads_style_and_id_shorthand() {
        let list = AttributeList::parse("source#example.role,bash");
        assert_eq!(list.style(), Some("source"));
        assert_eq!(list.id(), Some("example"));
        assert_eq!(list.positional(1), Some("bash"));
    }

    #[test]
    fn empty_named_value_is_kept() {
        let list = AttributeList::parse("snippets=");
        assert_eq!(list.get("snippets"), Some(""));
    }
}
