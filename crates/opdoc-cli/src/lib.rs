use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use opdoc_config::{Config, ConfigError, LoadOptions};
use opdoc_core::{
    assemble, AssembleError, AssembleOutcome, AssembleRequest, BuildSystem, ExitCode,
    OutputFormat,
};
use opdoc_tree::{Attributes, SafeMode};
use tracing::debug;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(if err.use_stderr() {
                ExitCode::InvalidArguments
            } else {
                ExitCode::Success
            });
        }
    };

    init_tracing(&cli);

    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path.clone());
    }
    let config = Config::load(load)?;
    for source in &config.sources.layers {
        debug!(kind = ?source.kind, path = ?source.path, "configuration layer");
    }

    let request = build_request(&cli, &config)?;
    let outcome = assemble(request)?;

    report(&cli, &outcome)?;
    Ok(outcome.exit_code(cli.fail_on_warnings))
}

/// Exit status for an error that escaped [`run`].
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(err) = err.downcast_ref::<AssembleError>() {
        err.exit_code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        ExitCode::Config
    } else {
        ExitCode::Io
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Expand operation:: macros into generated API snippet sections",
    long_about = None
)]
struct Cli {
    /// Path to the AsciiDoc document
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Set a document attribute (name=value, name@ to let the document override it, name! to unset)
    #[arg(short = 'a', long = "attribute", value_name = "ATTRIBUTE", action = ArgAction::Append)]
    attributes: Vec<String>,

    /// Write the assembled output to PATH
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<FormatValue>,

    /// Use this configuration file instead of discovering .opdoc.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Snippets directory; takes precedence over the document and build layout
    #[arg(long, value_name = "DIR")]
    snippets: Option<PathBuf>,

    /// Build layout used to locate generated snippets
    #[arg(long = "build-system", value_enum)]
    build_system: Option<BuildSystemValue>,

    /// Safe mode for document processing
    #[arg(long = "safe-mode", value_enum)]
    safe_mode: Option<SafeModeValue>,

    /// Print a unified diff between the source and the assembled document
    #[arg(long)]
    diff: bool,

    /// Exit non-zero when warnings or errors are reported
    #[arg(long = "fail-on-warnings")]
    fail_on_warnings: bool,

    /// Suppress diagnostics and status messages
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatValue {
    Adoc,
    Outline,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuildSystemValue {
    Auto,
    Maven,
    Gradle,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SafeModeValue {
    Unsafe,
    Safe,
    Server,
    Secure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if cli.quiet {
        "opdoc_cli=error,opdoc_core=error"
    } else {
        match cli.verbose {
            0 => "opdoc_cli=warn,opdoc_core=warn",
            1 => "opdoc_cli=debug,opdoc_core=debug,opdoc_config=debug,opdoc_tree=info",
            _ => "opdoc_cli=trace,opdoc_core=trace,opdoc_config=trace,opdoc_tree=trace",
        }
    };

    let env_filter = EnvFilter::try_from_env("OPDOC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

fn build_request(cli: &Cli, config: &Config) -> Result<AssembleRequest, AssembleError> {
    let mut request = AssembleRequest::from_config(cli.file.clone(), config);

    for raw in &cli.attributes {
        apply_attribute(&mut request.attributes, parse_attribute(raw)?);
    }

    let options = &mut request.options;
    if let Some(format) = cli.format {
        options.format = match format {
            FormatValue::Adoc => OutputFormat::Adoc,
            FormatValue::Outline => OutputFormat::Outline,
            FormatValue::Json => OutputFormat::Json,
        };
    }
    if let Some(build_system) = cli.build_system {
        options.build_system = match build_system {
            BuildSystemValue::Auto => BuildSystem::Auto,
            BuildSystemValue::Maven => BuildSystem::Maven,
            BuildSystemValue::Gradle => BuildSystem::Gradle,
        };
    }
    if let Some(safe_mode) = cli.safe_mode {
        options.safe_mode = match safe_mode {
            SafeModeValue::Unsafe => SafeMode::Unsafe,
            SafeModeValue::Safe => SafeMode::Safe,
            SafeModeValue::Server => SafeMode::Server,
            SafeModeValue::Secure => SafeMode::Secure,
        };
    }
    if let Some(dir) = &cli.snippets {
        options.snippets_dir = Some(absolute(dir)?);
    }
    options.output = cli.output.clone();
    options.diff = cli.diff;

    Ok(request)
}

/// Command-line paths are relative to the working directory, not `docdir`.
fn absolute(path: &Path) -> Result<PathBuf, AssembleError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| AssembleError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, PartialEq, Eq)]
enum AttributeArg {
    Set {
        name: String,
        value: String,
        soft: bool,
    },
    Unset {
        name: String,
        soft: bool,
    },
}

/// Parse `name`, `name=value`, `name!` or `!name`, each optionally
/// followed by `@` to make it soft.
fn parse_attribute(raw: &str) -> Result<AttributeArg, AssembleError> {
    let (entry, soft) = match raw.strip_suffix('@') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };

    let (name, value) = match entry.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (entry.trim(), None),
    };

    let unset_name = match value {
        None => name.strip_suffix('!').or_else(|| name.strip_prefix('!')),
        Some(_) => None,
    };
    let bare = unset_name.unwrap_or(name);

    let valid = !bare.is_empty()
        && bare
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(AssembleError::InvalidArguments(format!(
            "invalid attribute '{raw}': expected name=value, name! or name"
        )));
    }

    Ok(match unset_name {
        Some(name) => AttributeArg::Unset {
            name: name.to_string(),
            soft,
        },
        None => AttributeArg::Set {
            name: name.to_string(),
            value: value.unwrap_or_default().to_string(),
            soft,
        },
    })
}

fn apply_attribute(attributes: &mut Attributes, arg: AttributeArg) {
    match arg {
        AttributeArg::Set {
            name,
            value,
            soft: true,
        } => {
            attributes.set(name, value);
        }
        AttributeArg::Set {
            name,
            value,
            soft: false,
        } => attributes.set_locked(name, value),
        AttributeArg::Unset { name, soft: true } => {
            attributes.unset(&name);
        }
        AttributeArg::Unset { name, soft: false } => attributes.lock_unset(name),
    }
}

fn report(cli: &Cli, outcome: &AssembleOutcome) -> Result<()> {
    if !cli.quiet {
        for diagnostic in outcome.diagnostics() {
            eprintln!("{diagnostic}");
        }
    }

    if cli.diff {
        match &outcome.diff {
            Some(diff) => emit(diff)?,
            None if !cli.quiet => eprintln!("No changes"),
            None => {}
        }
    } else if outcome.written.is_none() {
        emit(&outcome.output)?;
    }

    if let Some(path) = &outcome.written {
        if !cli.quiet {
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn emit(content: &str) -> Result<()> {
    if content.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
