//! Error types for excond.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExcondError {
    #[error("Malformed method descriptor '{descriptor}': {reason}")]
    Descriptor { descriptor: String, reason: String },

    #[error("Trace error at line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExcondError {
    /// Stable numeric code, used as the CLI exit status.
    pub fn code(&self) -> i32 {
        match self {
            ExcondError::Descriptor { .. } => 10,
            ExcondError::Trace { .. } => 11,
            ExcondError::Config(_) => 12,
            ExcondError::Io(_) => 20,
            ExcondError::Json(_) => 21,
        }
    }

    pub(crate) fn descriptor(descriptor: &str, reason: impl Into<String>) -> Self {
        ExcondError::Descriptor {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn trace(line: usize, message: impl Into<String>) -> Self {
        ExcondError::Trace {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExcondError>;
