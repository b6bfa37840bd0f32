//! Error types for svgrework

use std::path::{Path, PathBuf};
use svgrework_cssparser::ParseError;
use svgrework_dom::DomError;
use thiserror::Error;

/// Result type alias for svgrework operations
pub type SvgReworkResult<T> = Result<T, SvgReworkError>;

/// Main error type for svgrework.
///
/// Every variant aborts the transform of the stylesheet being processed.
#[derive(Error, Debug)]
pub enum SvgReworkError {
    #[error("Cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Inline payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Markup error: {0}")]
    Dom(#[from] DomError),

    #[error("Stylesheet error: {0}")]
    Stylesheet(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SvgReworkError {
    /// Create an I/O error for `path`
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short name of the error kind, used as a log field.
    pub fn category(&self) -> &'static str {
        match self {
            SvgReworkError::Io { .. } => "io",
            SvgReworkError::Decode(_) => "decode",
            SvgReworkError::Utf8(_) => "utf8",
            SvgReworkError::Dom(_) => "markup",
            SvgReworkError::Stylesheet(_) => "stylesheet",
            SvgReworkError::Config(_) => "config",
        }
    }
}
