use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the hyperband tooling
#[derive(Error, Debug)]
pub enum HbError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration generation errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(
        "configuration space exhausted: only {generated} of {requested} distinct configurations \
         could be generated (gave up after {max_retries} retries)"
    )]
    SpaceExhausted {
        generated: usize,
        requested: usize,
        max_retries: u32,
    },

    #[error("Invalid search space: {message}")]
    InvalidSpace { message: String },
}

/// Errors raised while reconstructing the status of a search
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Search directory not found: {}", path.display())]
    SearchNotFound { path: PathBuf },

    #[error("Malformed result file {}: {content:?} is not a number", path.display())]
    MalformedResult { path: PathBuf, content: String },
}

/// Template loading and rendering errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template {name} not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("Template {template}: no value for variable '{name}'")]
    MissingVariable { template: String, name: String },

    #[error("Template {template}: unterminated placeholder at byte {offset}")]
    Unterminated { template: String, offset: usize },
}

/// Result type alias for hyperband operations
pub type HbResult<T> = Result<T, HbError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::HbError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HbError::Config(format!($($arg)*))
    };
}
