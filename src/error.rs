use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid key '{key}': {reason}")]
    KeySyntax { key: String, reason: String },

    #[error("Type mismatch for '{key}': {reason}")]
    TypeMismatch { key: String, reason: String },

    #[error("Failed to parse {format}{}: {message}", origin_suffix(.origin))]
    Parse {
        format: &'static str,
        origin: Option<PathBuf>,
        message: String,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{format} support is not available in this build (enable the `{feature}` feature)")]
    Unsupported {
        format: &'static str,
        feature: &'static str,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    KeyNotFound,
    KeySyntax,
    TypeMismatch,
    Parse,
    InvalidValue,
    Unsupported,
    Io,
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::KeyNotFound(_) => ErrorKind::KeyNotFound,
            ConfigError::KeySyntax { .. } => ErrorKind::KeySyntax,
            ConfigError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ConfigError::Parse { .. } => ErrorKind::Parse,
            ConfigError::InvalidValue(_) => ErrorKind::InvalidValue,
            ConfigError::Unsupported { .. } => ErrorKind::Unsupported,
            ConfigError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn key_syntax(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::KeySyntax {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::TypeMismatch {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(format: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            format,
            origin: None,
            message: message.into(),
        }
    }

    /// Attach the file a parse error originated from.
    pub(crate) fn with_origin(self, path: impl Into<PathBuf>) -> Self {
        match self {
            ConfigError::Parse {
                format, message, ..
            } => ConfigError::Parse {
                format,
                origin: Some(path.into()),
                message,
            },
            other => other,
        }
    }
}

fn origin_suffix(origin: &Option<PathBuf>) -> String {
    match origin {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}
