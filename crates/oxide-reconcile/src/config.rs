//! Schema files.
//!
//! A schema file is a JSON document holding the desired tables and,
//! optionally, the migration options:
//!
//! ```json
//! {
//!   "options": { "drop_column": true },
//!   "tables": [
//!     { "name": "users", "columns": [{ "name": "id", "type": "int", "increment": true }],
//!       "primary_key": ["id"] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::options::MigrateOptions;
use crate::schema::Table;

/// Desired tables and options loaded from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Migration options.
    #[serde(default)]
    pub options: MigrateOptions,
    /// Desired tables, in migration order.
    pub tables: Vec<Table>,
}

impl ReconcileConfig {
    /// Reads a schema file and validates every table in it.
    ///
    /// Cross-table checks (duplicate names, foreign key targets) run when the
    /// tables are handed to [`Migrate::create`](crate::migrate::Migrate::create).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ReconcileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if config.tables.is_empty() {
            return Err(ReconcileError::Config(format!(
                "{} declares no tables",
                path.display()
            )));
        }
        for table in &config.tables {
            table.validate()?;
        }
        Ok(config)
    }
}
