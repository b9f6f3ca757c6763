//! Desired schema model.
//!
//! These types describe the tables the caller wants to exist. They are built
//! before a migration starts and are only read by the engine.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

/// Semantic column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Boolean.
    Bool,
    /// Platform integer (64-bit).
    Int,
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// Platform unsigned integer (64-bit).
    Uint,
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit unsigned integer.
    Uint16,
    /// 32-bit unsigned integer.
    Uint32,
    /// 64-bit unsigned integer.
    Uint64,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Character data, bounded or unbounded depending on `size`.
    String,
    /// Binary data.
    Bytes,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// Timestamp.
    Time,
    /// One of a fixed set of string values.
    Enum,
}

impl ColumnType {
    /// Returns the type name used in messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Time => "time",
            Self::Enum => "enum",
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal, rendered quoted.
    String(String),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL literal for this value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Foreign key action for ON DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted).
    #[default]
    NoAction,
    /// Restrict (same as NoAction but checked immediately).
    Restrict,
    /// Cascade the delete to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A desired column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column carries a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Whether the column is an auto-generated identity.
    #[serde(default)]
    pub increment: bool,
    /// Default value.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Byte or character budget for variable length types.
    #[serde(default)]
    pub size: Option<u64>,
    /// Allowed values for enum columns.
    #[serde(default)]
    pub enums: Vec<String>,
    /// Literal type overrides keyed by dialect name.
    #[serde(default)]
    pub schema_type: BTreeMap<String, String>,
}

impl Column {
    /// Creates a non-null column.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            unique: false,
            increment: false,
            default: None,
            size: None,
            enums: Vec::new(),
            schema_type: BTreeMap::new(),
        }
    }

    /// Allows NULL values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as an auto-generated identity.
    #[must_use]
    pub fn increment(mut self) -> Self {
        self.increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the size budget.
    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the enum values.
    #[must_use]
    pub fn enums<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums = values.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the SQL type for one dialect.
    #[must_use]
    pub fn schema_type(mut self, dialect: impl Into<String>, ty: impl Into<String>) -> Self {
        self.schema_type.insert(dialect.into(), ty.into());
        self
    }
}

/// A desired foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub symbol: String,
    /// Columns of the owning table.
    pub columns: Vec<String>,
    /// Referenced table (may be the owning table).
    pub ref_table: String,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

impl ForeignKey {
    /// Creates a foreign key from `columns` to `ref_table(ref_columns)`.
    #[must_use]
    pub fn new<C, R>(
        symbol: impl Into<String>,
        columns: C,
        ref_table: impl Into<String>,
        ref_columns: R,
    ) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            symbol: symbol.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.into_iter().map(Into::into).collect(),
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// A desired table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Primary key column names, in key order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a column and appends it to the primary key.
    #[must_use]
    pub fn primary(mut self, column: Column) -> Self {
        self.primary_key.push(column.name.clone());
        self.columns.push(column);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns whether `name` is part of the primary key.
    #[must_use]
    pub fn is_primary(&self, name: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == name)
    }

    /// Returns the single auto-increment primary key column, if the table has one.
    #[must_use]
    pub fn identity_column(&self) -> Option<&Column> {
        match self.primary_key.as_slice() {
            [pk] => self.get_column(pk).filter(|c| c.increment),
            _ => None,
        }
    }

    /// Checks the model invariants of this table in isolation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ReconcileError::InvalidSchema(msg));

        if self.name.is_empty() {
            return invalid("table name cannot be empty".to_string());
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return invalid(format!(
                    "duplicate column '{}' in table '{}'",
                    column.name, self.name
                ));
            }
            if column.increment && !self.is_primary(&column.name) {
                return invalid(format!(
                    "increment column '{}.{}' must be part of the primary key",
                    self.name, column.name
                ));
            }
            if column.ty == ColumnType::Enum && column.enums.is_empty() {
                return invalid(format!(
                    "enum column '{}.{}' has no values",
                    self.name, column.name
                ));
            }
        }

        for pk in &self.primary_key {
            if self.get_column(pk).is_none() {
                return invalid(format!(
                    "primary key column '{}' is not a column of '{}'",
                    pk, self.name
                ));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
                return invalid(format!(
                    "foreign key '{}' has {} columns but references {}",
                    fk.symbol,
                    fk.columns.len(),
                    fk.ref_columns.len()
                ));
            }
            if let Some(missing) = fk.columns.iter().find(|c| self.get_column(c).is_none()) {
                return invalid(format!(
                    "foreign key '{}' uses unknown column '{}'",
                    fk.symbol, missing
                ));
            }
        }

        Ok(())
    }
}
