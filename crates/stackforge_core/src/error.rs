//! Error types for template construction and validation.

use thiserror::Error;

use crate::validator::ValidationFailure;

/// Result type alias for builder operations.
pub type DslResult<T> = Result<T, DslError>;

/// Errors that can occur while building or validating a template.
#[derive(Error, Debug)]
pub enum DslError {
    #[error("Invalid arguments to {function}: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    #[error("Cannot append to non array value previously set for List type '{0}'")]
    NotAList(String),

    #[error("Cannot store entries in non map value previously set for '{0}'")]
    NotAMap(String),

    #[error("Cannot use block to declare {0}")]
    NotDeclarable(String),

    #[error("Cannot set type for {0}")]
    FixedType(String),

    #[error("{section} are not supported by {kind} templates")]
    UnsupportedSection { section: String, kind: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DslError {
    pub(crate) fn invalid_argument(function: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function,
            message: message.into(),
        }
    }
}
