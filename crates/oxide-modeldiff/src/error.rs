//! Error types for the migration generator.

use std::path::PathBuf;

/// Errors that can occur while generating migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The database could not be reached at all.
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    /// A catalog query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading the model registry, writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The model registry file could not be parsed.
    #[error("Failed to parse model registry '{path}': {source}")]
    Registry {
        /// Path to the registry file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A model with the same name was already registered.
    #[error("Model '{0}' is already registered")]
    DuplicateModel(String),

    /// Invalid run configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A catalog lookup returned no row where one was expected.
    #[error("Column '{table}.{column}' not found in catalog")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for migration generation.
pub type Result<T> = std::result::Result<T, MigrateError>;
