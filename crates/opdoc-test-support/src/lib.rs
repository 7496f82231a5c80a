//! Shared fixtures for opdoc tests: a throwaway project directory holding a
//! generated-snippets tree and the documents that reference it.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Snippets written by [`SnippetFixture::with_sample_operation`].
pub const SAMPLE_SNIPPETS: [(&str, &str); 3] = [
    ("curl-request", "[source,bash]\n----\n$ curl 'http://localhost:8080/' -i\n----\n"),
    ("http-request", "[source,http]\n----\nGET / HTTP/1.1\nHost: localhost:8080\n----\n"),
    ("http-response", "[source,http]\n----\nHTTP/1.1 200 OK\n----\n"),
];

pub struct SnippetFixture {
    dir: TempDir,
}

impl SnippetFixture {
    pub fn new() -> Self {
        SnippetFixture {
            dir: TempDir::new().expect("create fixture directory"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `<root>/build/generated-snippets`, the Gradle layout.
    pub fn snippets_dir(&self) -> PathBuf {
        self.root().join("build").join("generated-snippets")
    }

    pub fn write_snippet(&self, operation: &str, name: &str, content: &str) -> PathBuf {
        let dir = self.snippets_dir().join(operation);
        fs::create_dir_all(&dir).expect("create operation directory");
        let path = dir.join(format!("{name}.adoc"));
        fs::write(&path, content).expect("write snippet");
        path
    }

    pub fn with_snippet(self, operation: &str, name: &str, content: &str) -> Self {
        self.write_snippet(operation, name, content);
        self
    }

    pub fn with_sample_operation(self, operation: &str) -> Self {
        for (name, content) in SAMPLE_SNIPPETS {
            self.write_snippet(operation, name, content);
        }
        self
    }

    /// Write a file relative to the fixture root, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }
}

impl Default for SnippetFixture {
    fn default() -> Self {
        Self::new()
    }
}
