use thiserror::Error;

/// Errors that can occur during context engine operations.
#[derive(Error, Debug)]
pub enum ContextEngineError {
    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("not found: {message} (path: {path})")]
    NotFound { message: String, path: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{collaborator} unavailable: {message}")]
    External {
        collaborator: String,
        message: String,
    },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("parse error: {message} (path: {path})")]
    Parse { message: String, path: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results using `ContextEngineError`.
pub type Result<T> = std::result::Result<T, ContextEngineError>;
