//! Error types for the cartographer core library.

use std::path::PathBuf;

/// Top-level error enum for the cartographer core library.
///
/// Per-file syntax and read failures are not errors: they are collected as
/// [`ParseWarning`](crate::models::ParseWarning) values on the built model.
#[derive(Debug, thiserror::Error)]
pub enum CartographerError {
    #[error("Source path {} is not a valid directory.", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Element with FQN '{0}' is already registered.")]
    DuplicateFqn(String),

    #[error("Child with name '{name}' already exists under '{parent}'.")]
    DuplicateSiblingName { parent: String, name: String },

    #[error("Invalid element name: {0:?}")]
    InvalidName(String),

    #[error("No project is loaded.")]
    ModelNotLoaded,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CartographerResult<T> = Result<T, CartographerError>;
