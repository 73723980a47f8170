//! Error types for template operations.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while parsing, rendering or validating templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Missing value: {0}")]
    MissingValue(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Filter '{name}': {message}")]
    Filter { name: String, message: String },

    #[error("Function '{name}': {message}")]
    Function { name: String, message: String },

    #[error("File not found in any files directory: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] strata_core::CoreError),
}
