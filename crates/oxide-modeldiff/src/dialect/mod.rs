//! Database dialect implementations.
//!
//! A dialect renders table specs and schema differences as SQL. Every
//! rendering method is a pure function of its inputs and returns an empty
//! string when there is nothing to emit.

mod postgres;

pub use postgres::PostgresDialect;

use crate::diff::SchemaDifference;
use crate::schema::{ColumnSpec, TableSpec};

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Column lines emitted for the base-fields block.
    fn base_field_definitions(&self) -> &'static [&'static str];

    /// Generates the full `CREATE TABLE` script, including trailing foreign
    /// key, index and comment statements.
    fn create_table_sql(&self, table: &TableSpec) -> String;

    /// Generates the statement reversing [`MigrationDialect::create_table_sql`].
    fn drop_table_sql(&self, table: &str) -> String;

    /// Generates one `ALTER TABLE` statement applying the differences.
    fn alter_table_sql(&self, table: &str, differences: &[SchemaDifference]) -> String;

    /// Generates the statement undoing the reversible differences.
    fn rollback_sql(&self, table: &str, differences: &[SchemaDifference]) -> String;

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut parts = vec![column.name.clone(), column.sql_type.name().to_string()];

        if column.not_null {
            parts.push("NOT NULL".to_string());
        }

        if column.unique {
            parts.push("UNIQUE".to_string());
        }

        if let Some(ref default) = column.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }

        parts.join(" ")
    }

    /// Name of the index requested on a column.
    fn index_name(&self, column: &ColumnSpec) -> String {
        column
            .index
            .as_ref()
            .and_then(|idx| idx.name.clone())
            .unwrap_or_else(|| format!("idx_{}", column.name))
    }
}
