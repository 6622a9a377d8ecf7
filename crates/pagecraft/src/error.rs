//! Error types for the pagecraft engine.

use thiserror::Error;

use crate::store::StoreError;

/// All errors that can occur in pagecraft
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Template key not allowed: '{key}'")]
    KeyNotAllowed { key: String },

    #[error("Template not found: '{key}'")]
    NotFound { key: String },

    #[error("A template with key '{key}' already exists")]
    DuplicateKey { key: String },

    #[error("Cannot derive a template key from name '{name}'")]
    InvalidName { name: String },

    #[error("Unknown version '{selector}', expected 'draft' or 'published'")]
    InvalidVersion { selector: String },

    #[error("Classroom-scoped templates need a classroom in the render context")]
    MissingTenant,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Stylesheet compilation failed: {message}")]
    Css { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pagecraft operations
pub type Result<T> = std::result::Result<T, BuilderError>;
