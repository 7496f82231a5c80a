use std::fs;
use std::path::PathBuf;

use opdoc_config::{BuildSystem, Config, OutputFormat};
use opdoc_tree::{
    load_file, outline, to_asciidoc, to_tree, Attributes, Diagnostic, Document, Extensions,
    LoadOptions, SafeMode, Severity, TreeNode,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::diff::build_unified_diff;
use crate::error::{AssembleError, AssembleResult, ExitCode};
use crate::fs::write_atomic;
use crate::include::SnippetIncludeProcessor;
use crate::operation::OperationBlockMacro;
use crate::preprocess::DefaultAttributesPreprocessor;

/// Registry used for every assembled document.
pub fn extensions(build_system: BuildSystem) -> Extensions {
    Extensions::new()
        .preprocessor(DefaultAttributesPreprocessor::new(build_system))
        .block_macro(OperationBlockMacro)
        .include_processor(SnippetIncludeProcessor)
}

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    pub safe_mode: SafeMode,
    pub build_system: BuildSystem,
    /// Snippets directory that overrides the document and build layout.
    pub snippets_dir: Option<PathBuf>,
    pub format: OutputFormat,
    /// Write the rendered output here instead of only returning it.
    pub output: Option<PathBuf>,
    pub diff: bool,
}

impl AssembleOptions {
    pub fn from_config(config: &Config) -> Self {
        AssembleOptions {
            safe_mode: config.document.safe_mode,
            build_system: config.snippets.build_system,
            format: config.output.format,
            ..AssembleOptions::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub path: PathBuf,
    /// Caller attributes; locked entries win over the document header.
    pub attributes: Attributes,
    pub options: AssembleOptions,
}

impl AssembleRequest {
    /// Request seeded from configuration. Config attributes are soft: the
    /// document header may still change them.
    pub fn from_config(path: impl Into<PathBuf>, config: &Config) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in config.document_attributes() {
            attributes.set(name, value);
        }
        if let Some(dir) = &config.snippets.directory {
            attributes.set("snippets", dir.display().to_string());
        }
        AssembleRequest {
            path: path.into(),
            attributes,
            options: AssembleOptions::from_config(config),
        }
    }
}

#[derive(Debug)]
pub struct AssembleOutcome {
    pub document: Document,
    pub output: String,
    pub diff: Option<String>,
    pub written: Option<PathBuf>,
}

impl AssembleOutcome {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.document.diagnostics()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics()
            .iter()
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }

    /// Exit status for this outcome. Diagnostics only fail the run when
    /// `fail_on_warnings` is set.
    pub fn exit_code(&self, fail_on_warnings: bool) -> ExitCode {
        if !fail_on_warnings {
            ExitCode::Success
        } else if self.count(Severity::Error) > 0 {
            ExitCode::Errors
        } else if self.count(Severity::Warning) > 0 {
            ExitCode::Warnings
        } else {
            ExitCode::Success
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: Option<&'a str>,
    tree: TreeNode,
    diagnostics: &'a [Diagnostic],
}

/// Load a document with the operation macro registered, then render it.
#[instrument(level = "info", skip_all, fields(path = %request.path.display()))]
pub fn assemble(request: AssembleRequest) -> AssembleResult<AssembleOutcome> {
    let AssembleRequest {
        path,
        mut attributes,
        options,
    } = request;

    if path.is_dir() {
        return Err(AssembleError::InvalidArguments(format!(
            "{} is a directory",
            path.display()
        )));
    }

    if let Some(dir) = &options.snippets_dir {
        attributes.set_locked("snippets", dir.display().to_string());
    }

    let load_options = LoadOptions::new()
        .with_safe_mode(options.safe_mode)
        .with_attributes(attributes)
        .with_extensions(extensions(options.build_system));
    let document = load_file(&path, load_options)?;

    let output = render_output(&document, options.format)?;

    let diff = if options.diff {
        let original = fs::read_to_string(&path).map_err(|source| AssembleError::Io {
            path: path.clone(),
            source,
        })?;
        build_unified_diff(&original, &output, &path.display().to_string())
    } else {
        None
    };

    let written = match &options.output {
        Some(target) => {
            write_atomic(target, &output).map_err(|source| AssembleError::Io {
                path: target.clone(),
                source,
            })?;
            Some(target.clone())
        }
        None => None,
    };

    info!(
        warnings = document.warnings().count(),
        written = written.is_some(),
        "assembled document"
    );

    Ok(AssembleOutcome {
        document,
        output,
        diff,
        written,
    })
}

/// Render an assembled document in the requested format.
pub fn render_output(document: &Document, format: OutputFormat) -> AssembleResult<String> {
    match format {
        OutputFormat::Adoc => Ok(to_asciidoc(document)),
        OutputFormat::Outline => Ok(outline(document)),
        OutputFormat::Json => {
            let report = JsonReport {
                title: document.title(),
                tree: to_tree(document),
                diagnostics: document.diagnostics(),
            };
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            Ok(json)
        }
    }
}
