//! Options resolved once per [`Migrate::create`](crate::migrate::Migrate::create) call.

use serde::{Deserialize, Serialize};

/// Options controlling destructive changes and ID allocation.
///
/// Every option defaults to `false`: without them the engine only adds and
/// widens, it never removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// Drop live columns that are absent from the desired table.
    pub drop_column: bool,
    /// Drop unique indexes on columns no longer marked unique.
    pub drop_index: bool,
    /// Allocate a disjoint primary key range per table.
    pub global_unique_id: bool,
}

impl MigrateOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables column removal.
    #[must_use]
    pub fn with_drop_column(mut self, enabled: bool) -> Self {
        self.drop_column = enabled;
        self
    }

    /// Enables or disables unique index removal.
    #[must_use]
    pub fn with_drop_index(mut self, enabled: bool) -> Self {
        self.drop_index = enabled;
        self
    }

    /// Enables or disables global unique ID allocation.
    #[must_use]
    pub fn with_global_unique_id(mut self, enabled: bool) -> Self {
        self.global_unique_id = enabled;
        self
    }
}
