//! Error types for docpress.
//!
//! Library crates use [`DocpressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docpress operations.
#[derive(Debug, thiserror::Error)]
pub enum DocpressError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A path the build depends on does not exist.
    #[error("not found: {what} {path:?}")]
    NotFound { what: &'static str, path: PathBuf },

    /// The output directory could not be created.
    #[error("cannot create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A source document is not valid UTF-8.
    #[error("source document {path:?} is not valid UTF-8: {source}")]
    Decode {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// Filesystem I/O error while reading sources or writing the combined document.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The converter could not be started at all.
    #[error("failed to run converter `{program}`: {source}")]
    ConverterSpawn {
        program: String,
        source: std::io::Error,
    },

    /// The converter ran and exited unsuccessfully. `diagnostics` is its
    /// stderr, untouched.
    #[error("converter exited with {}:\n{diagnostics}", exit_label(.code))]
    Conversion {
        code: Option<i32>,
        diagnostics: String,
    },

    /// The converter reported success but produced no usable artifact.
    #[error("verification error at {path:?}: {message}")]
    Verification { path: PathBuf, message: String },
}

/// The failure classes a build can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Assembly,
    Conversion,
    Verification,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Assembly => "assembly",
            Self::Conversion => "conversion",
            Self::Verification => "verification",
        };
        f.write_str(label)
    }
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocpressError>;

impl DocpressError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// A missing path, labelled with what it was supposed to be.
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a verification error for an artifact path.
    pub fn verification(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Verification {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Which failure class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } | Self::NotFound { .. } | Self::OutputDir { .. } => {
                ErrorCategory::Configuration
            }
            Self::Decode { .. } | Self::Io { .. } => ErrorCategory::Assembly,
            Self::ConverterSpawn { .. } | Self::Conversion { .. } => ErrorCategory::Conversion,
            Self::Verification { .. } => ErrorCategory::Verification,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
