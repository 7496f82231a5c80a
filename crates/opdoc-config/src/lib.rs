//! Configuration loader for opdoc.
//!
//! Settings are resolved with the precedence
//! override flag → working directory → git root → built-in defaults,
//! and normalised into typed structures so the assembly pipeline never reads
//! raw TOML. Every value remembers which layer supplied it, and all validation
//! problems are collected before anything is reported.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use opdoc_tree::{Doctype, SafeMode};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".opdoc.toml";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub snippets: SnippetSettings,
    pub document: DocumentSettings,
    /// Snippet name to heading title, applied as `operation-<name>-title`.
    pub titles: BTreeMap<String, String>,
    pub output: OutputSettings,
    pub sources: ConfigSources,
}

/// Where generated snippets live.
#[derive(Clone, Debug)]
pub struct SnippetSettings {
    /// Explicit snippets directory, resolved against the declaring file.
    pub directory: Option<PathBuf>,
    pub build_system: BuildSystem,
}

/// Options applied to every document load.
#[derive(Clone, Debug)]
pub struct DocumentSettings {
    pub safe_mode: SafeMode,
    pub doctype: Option<Doctype>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

/// Build tool layout used to locate the default snippets directory.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BuildSystem {
    #[default]
    Auto,
    Maven,
    Gradle,
}

impl BuildSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildSystem::Auto => "auto",
            BuildSystem::Maven => "maven",
            BuildSystem::Gradle => "gradle",
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildSystem {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(BuildSystem::Auto),
            "maven" => Ok(BuildSystem::Maven),
            "gradle" => Ok(BuildSystem::Gradle),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Adoc,
    Outline,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Adoc => "adoc",
            OutputFormat::Outline => "outline",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "adoc" | "asciidoc" => Ok(OutputFormat::Adoc),
            "outline" => Ok(OutputFormat::Outline),
            "json" => Ok(OutputFormat::Json),
            _ => Err(()),
        }
    }
}

/// Every layer that contributed to a [`Config`], lowest precedence first.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// One configuration layer. Relative paths declared in a file resolve
/// against `base_dir`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn built_in(working_dir: &Path) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir: working_dir.to_path_buf(),
        }
    }

    fn file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}", self.kind, path.display()),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSourceKind::Default => "built-in defaults",
            ConfigSourceKind::GitRoot => "repository config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "--config file",
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Extra file applied last, relative to the working directory.
    pub override_path: Option<PathBuf>,
    /// Directory to search from; the process working directory when unset.
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(self, path: impl Into<PathBuf>) -> Self {
        LoadOptions {
            override_path: Some(path.into()),
            ..self
        }
    }

    pub fn with_working_dir(self, path: impl Into<PathBuf>) -> Self {
        LoadOptions {
            working_dir: Some(path.into()),
            ..self
        }
    }

    fn resolve_working_dir(&self) -> Result<PathBuf, ConfigError> {
        let attempted = self.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let resolved = match &self.working_dir {
            Some(dir) => fs::canonicalize(dir),
            None => env::current_dir(),
        };
        resolved.map_err(|source| ConfigError::WorkingDirectory { attempted, source })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot use {attempted} as working directory: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("config file {path} does not exist")]
    OverrideNotFound { path: PathBuf },
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Resolve configuration for `options`, layering built-in defaults, the
    /// repository file, the working directory file and the override file.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = options.resolve_working_dir()?;
        let override_path = match &options.override_path {
            Some(path) if path.is_absolute() => Some(path.clone()),
            Some(path) => Some(working_dir.join(path)),
            None => None,
        };
        if let Some(path) = override_path.as_ref().filter(|path| !path.exists()) {
            return Err(ConfigError::OverrideNotFound { path: path.clone() });
        }

        let built_in = ConfigSource::built_in(&working_dir);
        let mut layers = vec![built_in.clone()];
        let mut merged = PartialConfig::defaults(&built_in);

        for source in file_layers(&working_dir, override_path) {
            let Some(path) = &source.path else { continue };
            merged.overlay(read_layer(path, &source)?);
            layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            snippets: resolved.snippets,
            document: resolved.document,
            titles: resolved.titles,
            output: resolved.output,
            sources: ConfigSources {
                working_directory: working_dir,
                layers,
            },
        })
    }

    /// Document attributes contributed by configuration, title overrides
    /// included. None of them are locked, so document entries still win.
    pub fn document_attributes(&self) -> BTreeMap<String, String> {
        let mut attributes = self.document.attributes.clone();
        if let Some(doctype) = self.document.doctype {
            let name = match doctype {
                Doctype::Article => "article",
                Doctype::Book => "book",
            };
            attributes
                .entry("doctype".into())
                .or_insert_with(|| name.into());
        }
        for (snippet, title) in &self.titles {
            attributes
                .entry(format!("operation-{snippet}-title"))
                .or_insert_with(|| title.clone());
        }
        attributes
    }
}

/// Config files that exist, in precedence order. A file reachable as more
/// than one layer is only read once, at its highest precedence.
fn file_layers(working_dir: &Path, override_path: Option<PathBuf>) -> Vec<ConfigSource> {
    let repository = working_dir
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(|root| root.join(CONFIG_FILE_NAME));
    let local = working_dir.join(CONFIG_FILE_NAME);

    let candidates = [
        (ConfigSourceKind::GitRoot, repository),
        (ConfigSourceKind::Local, Some(local)),
        (ConfigSourceKind::Override, override_path),
    ];

    let mut layers: Vec<ConfigSource> = Vec::new();
    for (index, (kind, path)) in candidates.iter().enumerate() {
        let Some(path) = path else { continue };
        let shadowed = candidates[index + 1..]
            .iter()
            .any(|(_, later)| later.as_ref() == Some(path));
        if shadowed || !path.is_file() {
            continue;
        }
        layers.push(ConfigSource::file(*kind, path.clone()));
    }
    layers
}

fn read_layer(path: &Path, source: &ConfigSource) -> Result<PartialConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    let raw = toml::from_str::<RawConfig>(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(raw.into_partial(source))
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphanumeric() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '-')
}

struct ResolvedConfig {
    snippets: SnippetSettings,
    document: DocumentSettings,
    titles: BTreeMap<String, String>,
    output: OutputSettings,
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    snippets: SnippetsPartial,
    document: DocumentPartial,
    titles: BTreeMap<String, Located<String>>,
    output: OutputPartial,
}

impl PartialConfig {
    fn defaults(source: &ConfigSource) -> Self {
        let located = |value: &str| Some(Located::new(value.to_string(), source.clone()));
        PartialConfig {
            snippets: SnippetsPartial {
                directory: None,
                build_system: located(BuildSystem::Auto.as_str()),
            },
            document: DocumentPartial {
                safe_mode: located(SafeMode::Safe.as_str()),
                ..DocumentPartial::default()
            },
            titles: BTreeMap::new(),
            output: OutputPartial {
                format: located(OutputFormat::Adoc.as_str()),
            },
        }
    }

    /// Lay `top` over `self`: set values replace, maps merge key by key.
    fn overlay(&mut self, top: PartialConfig) {
        replace_if_set(&mut self.snippets.directory, top.snippets.directory);
        replace_if_set(&mut self.snippets.build_system, top.snippets.build_system);
        replace_if_set(&mut self.document.safe_mode, top.document.safe_mode);
        replace_if_set(&mut self.document.doctype, top.document.doctype);
        self.document.attributes.extend(top.document.attributes);
        self.titles.extend(top.titles);
        replace_if_set(&mut self.output.format, top.output.format);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();

        let directory = self.snippets.directory.map(Located::into_path);
        let build_system = parse_choice(
            self.snippets.build_system,
            "snippets.build_system",
            "auto, maven, gradle",
            &mut errors,
        )
        .unwrap_or_default();

        let safe_mode = parse_choice(
            self.document.safe_mode,
            "document.safe_mode",
            "unsafe, safe, server, secure",
            &mut errors,
        )
        .unwrap_or_default();
        let doctype = self.document.doctype.and_then(|located| {
            parse_choice(
                Some(located),
                "document.doctype",
                "article, book",
                &mut errors,
            )
        });

        let mut attributes = BTreeMap::new();
        for (name, value) in self.document.attributes {
            if !is_attribute_name(&name) {
                errors.push(ConfigValidationError::at(
                    "document.attributes",
                    format!("invalid attribute name '{name}'"),
                    &value.source,
                ));
                continue;
            }
            attributes.insert(name, value.value);
        }

        let mut titles = BTreeMap::new();
        for (snippet, title) in self.titles {
            if title.value.trim().is_empty() {
                errors.push(ConfigValidationError::at(
                    "titles",
                    format!("title for snippet '{snippet}' cannot be empty"),
                    &title.source,
                ));
                continue;
            }
            titles.insert(snippet, title.value);
        }

        let format = parse_choice(
            self.output.format,
            "output.format",
            "adoc, outline, json",
            &mut errors,
        )
        .unwrap_or_default();

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            snippets: SnippetSettings {
                directory,
                build_system,
            },
            document: DocumentSettings {
                safe_mode,
                doctype,
                attributes,
            },
            titles,
            output: OutputSettings { format },
        })
    }
}

fn parse_choice<T: FromStr>(
    located: Option<Located<String>>,
    context: &str,
    expected: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> Option<T> {
    let located = located?;
    match located.value.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(ConfigValidationError::at(
                context,
                format!(
                    "unknown value '{}' (expected one of: {expected})",
                    located.value
                ),
                &located.source,
            ));
            None
        }
    }
}

#[derive(Clone, Debug, Default)]
struct SnippetsPartial {
    directory: Option<Located<PathBuf>>,
    build_system: Option<Located<String>>,
}

#[derive(Clone, Debug, Default)]
struct DocumentPartial {
    safe_mode: Option<Located<String>>,
    doctype: Option<Located<String>>,
    attributes: BTreeMap<String, Located<String>>,
}

#[derive(Clone, Debug, Default)]
struct OutputPartial {
    format: Option<Located<String>>,
}

fn replace_if_set<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// A raw value and the layer that supplied it.
#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

impl Located<PathBuf> {
    fn into_path(self) -> PathBuf {
        if self.value.is_absolute() {
            self.value
        } else {
            self.source.base_dir.join(self.value)
        }
    }
}

/// Every validation problem found while finalising configuration.
#[derive(Clone, Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|err| format!("  {err}")).collect();
        f.write_str(&lines.join("\n"))
    }
}

#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    /// Dotted key the problem belongs to, e.g. `snippets.build_system`.
    pub context: Option<String>,
    pub message: String,
    pub source: Option<ConfigSource>,
}

impl ConfigValidationError {
    fn at(context: &str, message: String, source: &ConfigSource) -> Self {
        ConfigValidationError {
            context: Some(context.to_string()),
            message,
            source: Some(source.clone()),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{context}: {}", self.message)?,
            None => f.write_str(&self.message)?,
        }
        match &self.source {
            Some(source) => write!(f, " [{source}]"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    snippets: Option<RawSnippets>,
    #[serde(default)]
    document: Option<RawDocument>,
    #[serde(default)]
    titles: BTreeMap<String, String>,
    #[serde(default)]
    output: Option<RawOutput>,
}

impl RawConfig {
    fn into_partial(self, source: &ConfigSource) -> PartialConfig {
        PartialConfig {
            snippets: self
                .snippets
                .map(|snippets| snippets.into_partial(source))
                .unwrap_or_default(),
            document: self
                .document
                .map(|document| document.into_partial(source))
                .unwrap_or_default(),
            titles: self
                .titles
                .into_iter()
                .map(|(name, title)| (name, Located::new(title, source.clone())))
                .collect(),
            output: OutputPartial {
                format: self
                    .output
                    .and_then(|output| output.format)
                    .map(|value| Located::new(value, source.clone())),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSnippets {
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default)]
    build_system: Option<String>,
}

impl RawSnippets {
    fn into_partial(self, source: &ConfigSource) -> SnippetsPartial {
        SnippetsPartial {
            directory: self
                .directory
                .map(|value| Located::new(value, source.clone())),
            build_system: self
                .build_system
                .map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    safe_mode: Option<String>,
    #[serde(default)]
    doctype: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

impl RawDocument {
    fn into_partial(self, source: &ConfigSource) -> DocumentPartial {
        DocumentPartial {
            safe_mode: self
                .safe_mode
                .map(|value| Located::new(value, source.clone())),
            doctype: self.doctype.map(|value| Located::new(value, source.clone())),
            attributes: self
                .attributes
                .into_iter()
                .map(|(name, value)| (name, Located::new(value, source.clone())))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    #[serde(default)]
    format: Option<String>,
}
