//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration errors (invalid YAML, missing fields, etc.).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for a run that finished with degraded, failed or cancelled tables.
pub const EXIT_PARTIAL_FAILURE: u8 = 2;
/// Exit code for connection failures.
pub const EXIT_CONNECTION_ERROR: u8 = 3;
/// Exit code for source (SQLite) failures.
pub const EXIT_SOURCE_ERROR: u8 = 4;
/// Exit code for target (PostgreSQL) failures.
pub const EXIT_TARGET_ERROR: u8 = 5;
/// Exit code for a table name missing from the registry.
pub const EXIT_UNKNOWN_TABLE: u8 = 6;
/// Exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for serialization errors.
pub const EXIT_SERIALIZATION_ERROR: u8 = 8;
/// Exit code for a cancelled run (SIGINT convention).
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to open the source or target connection.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Table name is not part of the registry.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Query or row-shape failure while reading from the source.
    #[error("Extraction failed for table {table}: {message}")]
    Extraction { table: String, message: String },

    /// Bulk insert failure for a single batch.
    #[error("Load failed for table {table}: {message}")]
    Load { table: String, message: String },

    /// Source database error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an Extraction error
    pub fn extraction(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Extraction {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Load error
    pub fn load(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Load {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::UnknownTable(_) => EXIT_UNKNOWN_TABLE,
            MigrateError::Extraction { .. } | MigrateError::Source(_) => EXIT_SOURCE_ERROR,
            MigrateError::Load { .. } | MigrateError::Target(_) => EXIT_TARGET_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Json(_) => EXIT_SERIALIZATION_ERROR,
            MigrateError::Cancelled => EXIT_CANCELLED,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
