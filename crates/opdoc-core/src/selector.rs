use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

const SNIPPET_EXTENSION: &str = ".adoc";

/// One snippet file chosen for an operation. The file may not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snippet {
    pub name: String,
    pub path: PathBuf,
}

impl Snippet {
    fn new(operation_dir: &Path, name: &str) -> Self {
        Snippet {
            name: name.to_string(),
            path: operation_dir.join(format!("{name}{SNIPPET_EXTENSION}")),
        }
    }
}

/// Snippets to include for `operation`.
///
/// A non-blank `explicit` list is used as given: comma separated, caller
/// order, duplicates kept, nothing checked on disk. Otherwise every `.adoc`
/// file in `<snippets_dir>/<operation>` is included, sorted by name.
pub fn select(operation: &str, snippets_dir: &Path, explicit: Option<&str>) -> Vec<Snippet> {
    let operation_dir = snippets_dir.join(operation);

    match explicit.filter(|names| !names.trim().is_empty()) {
        Some(names) => names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Snippet::new(&operation_dir, name))
            .collect(),
        None => all_snippets(&operation_dir),
    }
}

fn all_snippets(operation_dir: &Path) -> Vec<Snippet> {
    let entries = match fs::read_dir(operation_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %operation_dir.display(), %err, "operation directory not readable");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| match entry.file_name().into_string() {
            Ok(file_name) => Some(file_name),
            Err(raw) => {
                debug!(dir = %operation_dir.display(), name = ?raw, "skipping non-UTF-8 file name");
                None
            }
        })
        .filter_map(|file_name| {
            file_name
                .strip_suffix(SNIPPET_EXTENSION)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .collect();
    names.sort();

    names
        .iter()
        .map(|name| Snippet::new(operation_dir, name))
        .collect()
}
