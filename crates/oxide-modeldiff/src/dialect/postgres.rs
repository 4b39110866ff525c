//! PostgreSQL dialect for migrations.

use tracing::warn;

use crate::diff::SchemaDifference;
use crate::schema::{TableSpec, quote_literal};

use super::MigrationDialect;

const BASE_FIELD_DEFINITIONS: [&str; 4] = [
    "id BIGSERIAL PRIMARY KEY",
    "created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP",
    "updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP",
    "deleted_at TIMESTAMP NULL",
];

/// PostgreSQL migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Statements that follow the `CREATE TABLE`: foreign keys, then indexes,
    /// then comments.
    fn trailing_statements(&self, table: &TableSpec) -> Vec<String> {
        let name = &table.name;
        let mut statements = Vec::new();

        for column in &table.columns {
            if let Some(ref fk) = column.foreign_key {
                statements.push(format!(
                    "ALTER TABLE {name} ADD FOREIGN KEY ({}) REFERENCES {}({});",
                    column.name, fk.table, fk.column
                ));
            }
        }

        for column in &table.columns {
            if let Some(ref idx) = column.index {
                let unique = if idx.unique { "UNIQUE " } else { "" };
                statements.push(format!(
                    "CREATE {unique}INDEX {} ON {name} ({});",
                    self.index_name(column),
                    column.name
                ));
            }
        }

        for column in &table.columns {
            if let Some(ref comment) = column.comment {
                statements.push(format!(
                    "COMMENT ON COLUMN {name}.{} IS {};",
                    column.name,
                    quote_literal(comment)
                ));
            }
        }

        statements
    }
}

impl MigrationDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn base_field_definitions(&self) -> &'static [&'static str] {
        &BASE_FIELD_DEFINITIONS
    }

    fn create_table_sql(&self, table: &TableSpec) -> String {
        let mut lines: Vec<String> = Vec::new();

        if table.base_fields {
            lines.extend(self.base_field_definitions().iter().map(|l| (*l).to_string()));
        }

        lines.extend(
            table
                .columns
                .iter()
                .filter(|c| !table.shadows_base_field(c))
                .map(|c| self.column_definition(c)),
        );

        let primary_key = table.primary_key();
        if !primary_key.is_empty() {
            if table.base_fields {
                // id is already the inline primary key
                warn!(
                    table = %table.name,
                    columns = ?primary_key,
                    "Ignoring primaryKey tags on a table with base fields"
                );
            } else {
                lines.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));
            }
        }

        if lines.is_empty() {
            return String::new();
        }

        let mut sql = format!("CREATE TABLE {} (\n{}\n);", table.name, lines.join(",\n"));
        for statement in self.trailing_statements(table) {
            sql.push('\n');
            sql.push_str(&statement);
        }
        sql
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {table};")
    }

    fn alter_table_sql(&self, table: &str, differences: &[SchemaDifference]) -> String {
        let clauses: Vec<String> = differences
            .iter()
            .map(|difference| match difference {
                SchemaDifference::AddColumn { name, sql_type } => {
                    format!("ADD COLUMN {name} {sql_type}")
                }
                SchemaDifference::AlterColumnType { name, new_sql_type } => {
                    format!("ALTER COLUMN {name} TYPE {new_sql_type}")
                }
            })
            .collect();

        alter_statement(table, &clauses)
    }

    fn rollback_sql(&self, table: &str, differences: &[SchemaDifference]) -> String {
        // The previous type of an altered column is not known, so only
        // additions can be undone.
        let clauses: Vec<String> = differences
            .iter()
            .filter_map(|difference| match difference {
                SchemaDifference::AddColumn { name, .. } => Some(format!("DROP COLUMN {name}")),
                SchemaDifference::AlterColumnType { .. } => None,
            })
            .collect();

        alter_statement(table, &clauses)
    }
}

fn alter_statement(table: &str, clauses: &[String]) -> String {
    if clauses.is_empty() {
        return String::new();
    }
    format!("ALTER TABLE {table}\n{};", clauses.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, DefaultValue, SqlType};

    fn add(name: &str) -> SchemaDifference {
        SchemaDifference::AddColumn {
            name: name.to_string(),
            sql_type: SqlType::Text,
        }
    }

    fn alter(name: &str) -> SchemaDifference {
        SchemaDifference::AlterColumnType {
            name: name.to_string(),
            new_sql_type: SqlType::BigInt,
        }
    }

    #[test]
    fn test_create_table_with_base_fields() {
        let dialect = PostgresDialect::new();
        let table = TableSpec::new("users")
            .with_base_fields()
            .column(ColumnSpec::new("name", SqlType::Text))
            .column(ColumnSpec::new("email", SqlType::Text));

        assert_eq!(
            dialect.create_table_sql(&table),
            "CREATE TABLE users (\n\
             id BIGSERIAL PRIMARY KEY,\n\
             created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,\n\
             updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,\n\
             deleted_at TIMESTAMP NULL,\n\
             name TEXT,\n\
             email TEXT\n\
             );"
        );
    }

    #[test]
    fn test_column_definition_constraints() {
        let dialect = PostgresDialect::new();
        let column = ColumnSpec::new("status", SqlType::Text)
            .not_null()
            .unique()
            .default(DefaultValue::parse("pending"));

        assert_eq!(
            dialect.column_definition(&column),
            "status TEXT NOT NULL UNIQUE DEFAULT 'pending'"
        );
    }

    #[test]
    fn test_numeric_default_is_not_rewritten() {
        let dialect = PostgresDialect::new();
        let column = ColumnSpec::new("code", SqlType::Text).default(DefaultValue::parse("007"));

        assert_eq!(dialect.column_definition(&column), "code TEXT DEFAULT 007");
    }

    #[test]
    fn test_base_field_columns_not_repeated() {
        let dialect = PostgresDialect::new();
        let table = TableSpec::new("users")
            .with_base_fields()
            .column(ColumnSpec::new("id", SqlType::BigInt))
            .column(ColumnSpec::new("created_at", SqlType::Timestamp))
            .column(ColumnSpec::new("name", SqlType::Text));

        let sql = dialect.create_table_sql(&table);
        assert_eq!(sql.matches("id ").count(), 1);
        assert_eq!(sql.matches("created_at").count(), 1);
        assert!(sql.contains("deleted_at TIMESTAMP NULL,\nname TEXT\n);"));
    }

    #[test]
    fn test_explicit_primary_key() {
        let dialect = PostgresDialect::new();
        let table = TableSpec::new("memberships")
            .column(ColumnSpec::new("user_id", SqlType::BigInt).primary_key())
            .column(ColumnSpec::new("group_id", SqlType::BigInt).primary_key());

        let sql = dialect.create_table_sql(&table);
        assert!(sql.ends_with("group_id BIGINT,\nPRIMARY KEY (user_id, group_id)\n);"));
    }

    #[test]
    fn test_primary_key_tag_ignored_with_base_fields() {
        let dialect = PostgresDialect::new();
        let table = TableSpec::new("codes")
            .with_base_fields()
            .column(ColumnSpec::new("code", SqlType::Text).primary_key());

        let sql = dialect.create_table_sql(&table);
        assert!(!sql.contains("PRIMARY KEY ("));
        assert!(sql.contains("id BIGSERIAL PRIMARY KEY"));
    }

    #[test]
    fn test_trailing_statements_order() {
        let dialect = PostgresDialect::new();
        let table = TableSpec::new("order_items")
            .column(ColumnSpec::new("note", SqlType::Text).comment("Buyer's note"))
            .column(ColumnSpec::new("sku", SqlType::Text).indexed())
            .column(ColumnSpec::new("order_id", SqlType::BigInt).references("Orders", "order_id"));

        let sql = dialect.create_table_sql(&table);
        let lines: Vec<&str> = sql.lines().collect();
        let tail = &lines[lines.len() - 3..];

        assert_eq!(
            tail,
            [
                "ALTER TABLE order_items ADD FOREIGN KEY (order_id) REFERENCES Orders(order_id);",
                "CREATE INDEX idx_sku ON order_items (sku);",
                "COMMENT ON COLUMN order_items.note IS 'Buyer''s note';",
            ]
        );
    }

    #[test]
    fn test_empty_table_yields_no_sql() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.create_table_sql(&TableSpec::new("nothing")), "");
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(
            PostgresDialect::new().drop_table_sql("users"),
            "DROP TABLE IF EXISTS users;"
        );
    }

    #[test]
    fn test_alter_and_rollback() {
        let dialect = PostgresDialect::new();
        let differences = vec![add("email"), alter("age"), add("nickname")];

        assert_eq!(
            dialect.alter_table_sql("users", &differences),
            "ALTER TABLE users\nADD COLUMN email TEXT,\nALTER COLUMN age TYPE BIGINT,\nADD COLUMN nickname TEXT;"
        );
        assert_eq!(
            dialect.rollback_sql("users", &differences),
            "ALTER TABLE users\nDROP COLUMN email,\nDROP COLUMN nickname;"
        );
    }

    #[test]
    fn test_rollback_of_type_changes_is_empty() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.rollback_sql("users", &[alter("age")]), "");
    }

    #[test]
    fn test_empty_differences() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.alter_table_sql("users", &[]), "");
        assert_eq!(dialect.rollback_sql("users", &[]), "");
    }
}
