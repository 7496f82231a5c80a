use std::io;
use std::path::PathBuf;

use opdoc_config::ConfigError;
use opdoc_tree::LoadError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Warnings = 1,
    Errors = 2,
    InvalidArguments = 3,
    Io = 4,
    Config = 5,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Warnings),
            2 => Some(Self::Errors),
            3 => Some(Self::InvalidArguments),
            4 => Some(Self::Io),
            5 => Some(Self::Config),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to serialise document tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AssembleError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidArguments(_) => ExitCode::InvalidArguments,
            Self::Io { .. } | Self::Load(_) | Self::Serialize(_) => ExitCode::Io,
            Self::Config(_) => ExitCode::Config,
        }
    }
}

pub type AssembleResult<T> = Result<T, AssembleError>;

/// Failure to derive a default snippets directory from the build layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("docdir attribute not found")]
    MissingDocdir,

    #[error("pom.xml not found in '{}' or above", docdir.display())]
    PomNotFound { docdir: PathBuf },

    #[error("projectdir attribute not found")]
    MissingProjectdir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_round_trip_through_u8() {
        for code in [
            ExitCode::Success,
            ExitCode::Warnings,
            ExitCode::Errors,
            ExitCode::InvalidArguments,
            ExitCode::Io,
            ExitCode::Config,
        ] {
            assert_eq!(ExitCode::from_u8(code as u8), Some(code));
        }
        assert_eq!(ExitCode::from_u8(9), None);
    }

    #[test]
    fn resolve_errors_name_the_missing_piece() {
        let err = ResolveError::PomNotFound {
            docdir: PathBuf::from("/work/src/docs/asciidoc"),
        };
        assert_eq!(
            err.to_string(),
            "pom.xml not found in '/work/src/docs/asciidoc' or above"
        );
        assert_eq!(
            ResolveError::MissingProjectdir.to_string(),
            "projectdir attribute not found"
        );
    }
}
