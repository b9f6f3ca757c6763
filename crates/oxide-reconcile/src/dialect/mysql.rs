//! MySQL dialect.

use crate::conn::{Row, Statement};
use crate::error::{ReconcileError, Result};
use crate::schema::{Column, ColumnType};

use super::{ConstraintKind, Dialect};

/// Oldest supported server version.
const MIN_VERSION: (u32, u32, u32) = (5, 6, 0);

/// Largest size stored as `varchar(n)`.
const MAX_VARCHAR_SIZE: u64 = (1 << 16) - 1;

/// Default `varchar` length.
const DEFAULT_VARCHAR_SIZE: u64 = 255;

/// MySQL dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_text_type(ty: &str) -> bool {
        ty.ends_with("text") || ty.ends_with("blob") || ty == "json"
    }
}

/// Parses the leading `major.minor.patch` of a version string such as
/// `8.0.19-log` or `5.7.31-0ubuntu0.18.04.1`.
fn parse_version(raw: &str) -> Option<(u32, u32, u32)> {
    let numeric = raw
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()?;
    let mut parts = numeric.split('.').map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(std::result::Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(std::result::Result::ok).unwrap_or(0);
    Some((major, minor, patch))
}

/// Removes the display width from integer types: `bigint(20) unsigned`
/// becomes `bigint unsigned`.
fn strip_display_width(ty: &str) -> String {
    const INTEGERS: [&str; 5] = ["tinyint", "smallint", "mediumint", "int", "bigint"];
    match ty.split_once('(') {
        Some((base, rest)) if INTEGERS.contains(&base) => match rest.split_once(')') {
            Some((_, tail)) => format!("{base}{tail}"),
            None => ty.to_string(),
        },
        _ => ty.to_string(),
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn max_identifier_len(&self) -> usize {
        64
    }

    fn version_query(&self) -> Statement {
        Statement::new("SELECT VERSION()")
    }

    fn check_version(&self, rows: &[Row]) -> Result<()> {
        let raw = rows
            .first()
            .ok_or_else(|| ReconcileError::Catalog("VERSION() returned no rows".into()))?
            .text(0)?;
        let version = parse_version(&raw)
            .ok_or_else(|| ReconcileError::Catalog(format!("malformed mysql version: {raw}")))?;
        if version < MIN_VERSION {
            let (major, minor, patch) = MIN_VERSION;
            return Err(ReconcileError::UnsupportedVersion {
                dialect: self.name(),
                version: raw,
                minimum: format!("{major}.{minor}.{patch}"),
            });
        }
        Ok(())
    }

    fn table_exists_query(&self, table: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = (SELECT DATABASE()) AND TABLE_NAME = ?",
        )
        .arg(table)
    }

    fn columns_query(&self, table: &str) -> Statement {
        Statement::new(
            "SELECT column_name, column_type, is_nullable, column_default \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = (SELECT DATABASE()) AND TABLE_NAME = ? \
             ORDER BY ordinal_position",
        )
        .arg(table)
    }

    fn indexes_query(&self, table: &str) -> Statement {
        Statement::new(
            "SELECT index_name, column_name, index_name = 'PRIMARY', non_unique = 0, seq_in_index \
             FROM INFORMATION_SCHEMA.STATISTICS \
             WHERE TABLE_SCHEMA = (SELECT DATABASE()) AND TABLE_NAME = ? \
             ORDER BY index_name, seq_in_index",
        )
        .arg(table)
    }

    fn constraint_exists_query(&self, kind: ConstraintKind, name: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS \
             WHERE TABLE_SCHEMA = (SELECT DATABASE()) \
             AND CONSTRAINT_TYPE = ? AND CONSTRAINT_NAME = ?",
        )
        .arg(kind.as_str())
        .arg(name)
    }

    fn sql_type(&self, column: &Column) -> Result<String> {
        let ty = match column.ty {
            ColumnType::Bool => "boolean".to_string(),
            ColumnType::Int8 => "tinyint".to_string(),
            ColumnType::Uint8 => "tinyint unsigned".to_string(),
            ColumnType::Int16 => "smallint".to_string(),
            ColumnType::Uint16 => "smallint unsigned".to_string(),
            ColumnType::Int32 => "int".to_string(),
            ColumnType::Uint32 => "int unsigned".to_string(),
            ColumnType::Int | ColumnType::Int64 => "bigint".to_string(),
            ColumnType::Uint | ColumnType::Uint64 => "bigint unsigned".to_string(),
            ColumnType::Float32 => "float".to_string(),
            ColumnType::Float64 => "double".to_string(),
            ColumnType::String => match column.size {
                Some(size) if size > MAX_VARCHAR_SIZE => "longtext".to_string(),
                Some(size) if size > 0 => format!("varchar({size})"),
                _ => format!("varchar({DEFAULT_VARCHAR_SIZE})"),
            },
            ColumnType::Enum => {
                if column.enums.is_empty() {
                    return Err(ReconcileError::UnsupportedType {
                        column: column.name.clone(),
                        ty: column.ty.as_str().to_string(),
                    });
                }
                let values: Vec<String> = column
                    .enums
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect();
                format!("enum({})", values.join(","))
            }
            ColumnType::Bytes => match column.size {
                Some(size) if size <= (1 << 8) - 1 => "tinyblob",
                None => "blob",
                Some(size) if size <= (1 << 16) - 1 => "blob",
                Some(size) if size <= (1 << 24) - 1 => "mediumblob",
                Some(_) => "longblob",
            }
            .to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::Time => "timestamp".to_string(),
        };
        Ok(ty)
    }

    fn canonical_type(&self, raw: &str) -> String {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered == "tinyint(1)" || lowered == "bool" {
            return "boolean".to_string();
        }
        if lowered.starts_with("enum(") {
            // Catalogs print `enum('a','b')`, hand-written overrides may not.
            let mut out = String::with_capacity(lowered.len());
            let mut quoted = false;
            for c in raw.trim().chars() {
                if c == '\'' {
                    quoted = !quoted;
                }
                if quoted || !c.is_whitespace() {
                    out.push(if quoted { c } else { c.to_ascii_lowercase() });
                }
            }
            return out;
        }
        let stripped = strip_display_width(&lowered);
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn identity_clause(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn supports_default(&self, column: &Column) -> bool {
        self.column_type(column)
            .map(|ty| !Self::is_text_type(&ty.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn create_table_suffix(&self) -> &'static str {
        " CHARACTER SET utf8mb4"
    }

    fn alter_column(&self, column: &Column) -> Result<Vec<String>> {
        let mut def = format!(
            "MODIFY COLUMN {} {} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)?,
            if column.nullable { "NULL" } else { "NOT NULL" }
        );
        if let Some(default) = &column.default {
            if self.supports_default(column) {
                def.push_str(&format!(" DEFAULT {}", default.to_sql()));
            }
        }
        Ok(vec![def])
    }

    // Unique constraints are indexes in MySQL.
    fn unique_constraints(&self) -> bool {
        false
    }

    fn drop_unique(&self, table: &str, name: &str, _constraint: bool) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        ))
    }

    fn restart_identity(&self, table: &str, _column: &str, start: u64) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} AUTO_INCREMENT = {}",
            self.quote_identifier(table),
            start
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::Value;
    use crate::schema::Table;

    fn dialect() -> MySqlDialect {
        MySqlDialect::new()
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("8.0.19"), Some((8, 0, 19)));
        assert_eq!(parse_version("5.7.31-0ubuntu0.18.04.1"), Some((5, 7, 31)));
        assert_eq!(parse_version("5.6.10-log"), Some((5, 6, 10)));
        assert_eq!(parse_version("10"), Some((10, 0, 0)));
        assert_eq!(parse_version("MariaDB"), None);
    }

    #[test]
    fn test_check_version() {
        let rows = |v: &str| vec![Row::new(vec![Value::from(v)])];
        assert!(dialect().check_version(&rows("8.0.19")).is_ok());
        assert!(dialect().check_version(&rows("5.6.0")).is_ok());
        assert!(matches!(
            dialect().check_version(&rows("5.5.62")),
            Err(ReconcileError::UnsupportedVersion { .. })
        ));
        assert!(matches!(
            dialect().check_version(&rows("unknown")),
            Err(ReconcileError::Catalog(_))
        ));
    }

    #[test]
    fn test_type_mapping() {
        let d = dialect();
        let ty = |c: Column| d.column_type(&c).unwrap();
        assert_eq!(ty(Column::new("a", ColumnType::Int)), "bigint");
        assert_eq!(ty(Column::new("a", ColumnType::Uint32)), "int unsigned");
        assert_eq!(ty(Column::new("a", ColumnType::String)), "varchar(255)");
        assert_eq!(ty(Column::new("a", ColumnType::String).size(100)), "varchar(100)");
        assert_eq!(ty(Column::new("a", ColumnType::String).size(1 << 16)), "longtext");
        assert_eq!(ty(Column::new("a", ColumnType::Bytes).size(100)), "tinyblob");
        assert_eq!(ty(Column::new("a", ColumnType::Bytes)), "blob");
        assert_eq!(ty(Column::new("a", ColumnType::Bytes).size(1_000_000)), "mediumblob");
        assert_eq!(ty(Column::new("a", ColumnType::Bytes).size(1 << 30)), "longblob");
        assert_eq!(
            ty(Column::new("a", ColumnType::Enum).enums(["a", "b"])),
            "enum('a','b')"
        );
        assert_eq!(ty(Column::new("a", ColumnType::Uuid)), "char(36)");
        assert!(d.column_type(&Column::new("a", ColumnType::Enum)).is_err());
    }

    #[test]
    fn test_canonical_type() {
        let d = dialect();
        assert_eq!(d.canonical_type("bigint(20)"), "bigint");
        assert_eq!(d.canonical_type("bigint(20) unsigned"), "bigint unsigned");
        assert_eq!(d.canonical_type("int(11)"), "int");
        assert_eq!(d.canonical_type("tinyint(1)"), "boolean");
        assert_eq!(d.canonical_type("varchar(255)"), "varchar(255)");
        assert_eq!(d.canonical_type("ENUM('a', 'b c')"), "enum('a','b c')");
    }

    #[test]
    fn test_create_table() {
        let table = Table::new("users")
            .primary(Column::new("id", ColumnType::Int).increment())
            .column(Column::new("name", ColumnType::String).nullable())
            .column(Column::new("bio", ColumnType::String).size(1 << 20).default("none"))
            .column(Column::new("age", ColumnType::Int).default(10_i64));
        assert_eq!(
            dialect().create_table(&table).unwrap().sql,
            "CREATE TABLE IF NOT EXISTS `users`(`id` bigint AUTO_INCREMENT NOT NULL, \
             `name` varchar(255) NULL, `bio` longtext NOT NULL, `age` bigint NOT NULL DEFAULT 10, \
             PRIMARY KEY(`id`)) CHARACTER SET utf8mb4"
        );
    }

    #[test]
    fn test_alter_statements() {
        let d = dialect();
        let clauses = d
            .alter_column(&Column::new("name", ColumnType::String).nullable())
            .unwrap();
        assert_eq!(
            d.alter_table("users", &clauses).sql,
            "ALTER TABLE `users` MODIFY COLUMN `name` varchar(255) NULL"
        );
        assert!(!d.unique_constraints());
        assert_eq!(
            d.drop_unique("users", "users_age", true).sql,
            "ALTER TABLE `users` DROP INDEX `users_age`"
        );
        assert_eq!(
            d.restart_identity("groups", "id", 1 << 32).sql,
            "ALTER TABLE `groups` AUTO_INCREMENT = 4294967296"
        );
        assert_eq!(
            d.insert("oxide_types", &["type".to_string()]),
            "INSERT INTO `oxide_types` (`type`) VALUES (?)"
        );
    }
}
