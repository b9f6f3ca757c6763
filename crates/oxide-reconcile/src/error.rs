//! Error types for schema reconciliation.

use std::path::PathBuf;

use sqlx::error::ErrorKind as DbErrorKind;

/// Coarse classification of a [`ReconcileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server is older than the dialect supports.
    UnsupportedVersion,
    /// Driver-level failure: begin, commit, or a statement.
    Connection,
    /// The database rejected a statement because of a constraint.
    IntegrityViolation,
    /// The desired model or the live catalog is inconsistent.
    Schema,
    /// Configuration could not be loaded.
    Config,
}

/// Errors that can occur while reconciling a schema.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The server version is below the dialect's minimum.
    #[error("unsupported {dialect} version: {version} (minimum {minimum})")]
    UnsupportedVersion {
        /// Dialect name.
        dialect: &'static str,
        /// Version reported by the server.
        version: String,
        /// Minimum supported version.
        minimum: String,
    },

    /// Driver-level failure.
    #[error("database error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A constraint violation reported by the database.
    #[error("integrity violation: {0}")]
    IntegrityViolation(#[source] sqlx::Error),

    /// A catalog query returned rows of an unexpected shape.
    #[error("unexpected catalog data: {0}")]
    Catalog(String),

    /// The desired schema breaks one of the model invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The dialect has no mapping for a column type.
    #[error("unsupported type {ty} for column '{column}'")]
    UnsupportedType {
        /// Column name.
        column: String,
        /// Semantic type.
        ty: String,
    },

    /// The live primary key does not match the desired one.
    #[error("cannot change primary key for table '{table}'")]
    PrimaryKeyChanged {
        /// Table name.
        table: String,
    },

    /// The global type registry has no free slot left.
    #[error("max number of types exceeded: {max}")]
    TooManyTypes {
        /// Registry capacity.
        max: usize,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while reading a configuration file.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::Connection(_) => ErrorKind::Connection,
            Self::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
            Self::Catalog(_)
            | Self::InvalidSchema(_)
            | Self::UnsupportedType { .. }
            | Self::PrimaryKeyChanged { .. }
            | Self::TooManyTypes { .. } => ErrorKind::Schema,
            Self::Config(_) | Self::Io { .. } | Self::Serialization(_) => ErrorKind::Config,
        }
    }
}

impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        let integrity = match &err {
            sqlx::Error::Database(db) => matches!(
                db.kind(),
                DbErrorKind::UniqueViolation
                    | DbErrorKind::ForeignKeyViolation
                    | DbErrorKind::NotNullViolation
                    | DbErrorKind::CheckViolation
            ),
            _ => false,
        };
        if integrity {
            Self::IntegrityViolation(err)
        } else {
            Self::Connection(err)
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
