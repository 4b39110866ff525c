//! Live schema introspection.
//!
//! The generator only ever reads the catalog: whether a table exists, whether
//! a column exists, and the type the catalog reports for a column.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Checks whether a table exists.
pub const TABLE_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)";

/// Checks whether a column exists.
pub const COLUMN_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.columns WHERE table_name = $1 AND column_name = $2)";

/// Reads the reported data type of a column.
pub const COLUMN_TYPE_SQL: &str =
    "SELECT data_type FROM information_schema.columns WHERE table_name = $1 AND column_name = $2";

/// An existing column as observed in the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Data type as reported by the catalog.
    pub reported_sql_type: String,
}

impl LiveColumn {
    /// Creates a live column.
    #[must_use]
    pub fn new(name: impl Into<String>, reported_sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reported_sql_type: reported_sql_type.into(),
        }
    }
}

/// Read-only access to the database catalog.
pub trait SchemaCatalog: Send + Sync {
    /// Returns whether the table exists.
    fn table_exists(&self, table: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Returns whether the column exists in the table.
    fn column_exists(&self, table: &str, column: &str)
    -> impl Future<Output = Result<bool>> + Send;

    /// Returns the reported data type of the column.
    fn column_type(&self, table: &str, column: &str)
    -> impl Future<Output = Result<String>> + Send;
}

/// Catalog backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database with a single connection.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Connection`] when the database is unreachable.
    pub async fn connect_with(options: PgConnectOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(MigrateError::Connection)?;
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SchemaCatalog for PgCatalog {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        debug!(table, "Checking table");
        let (exists,): (bool,) = sqlx::query_as(TABLE_EXISTS_SQL)
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(COLUMN_EXISTS_SQL)
            .bind(table)
            .bind(column)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn column_type(&self, table: &str, column: &str) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as(COLUMN_TYPE_SQL)
            .bind(table)
            .bind(column)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(data_type,)| data_type)
            .ok_or_else(|| MigrateError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }
}

/// In-memory catalog.
///
/// Holds a fixed set of tables and can be told to fail specific lookups,
/// which makes it the live schema of choice in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, Vec<LiveColumn>>,
    failing_tables: BTreeSet<String>,
    failing_columns: BTreeSet<(String, String)>,
    failing_types: BTreeSet<(String, String)>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table with its columns.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>, columns: Vec<LiveColumn>) -> Self {
        self.tables.insert(name.into(), columns);
        self
    }

    /// Makes every lookup on the table fail.
    #[must_use]
    pub fn fail_table(mut self, name: impl Into<String>) -> Self {
        self.failing_tables.insert(name.into());
        self
    }

    /// Makes lookups on one column fail.
    #[must_use]
    pub fn fail_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.failing_columns.insert((table.into(), column.into()));
        self
    }

    /// Makes only the type lookup of one column fail; its existence check
    /// still succeeds.
    #[must_use]
    pub fn fail_column_type(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.failing_types.insert((table.into(), column.into()));
        self
    }

    /// Columns of a table, if it exists.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[LiveColumn]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    fn check(&self, table: &str, column: Option<&str>) -> Result<()> {
        let column_fails = column.is_some_and(|c| {
            self.failing_columns
                .contains(&(table.to_string(), c.to_string()))
        });
        if self.failing_tables.contains(table) || column_fails {
            return Err(MigrateError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn find(&self, table: &str, column: &str) -> Option<&LiveColumn> {
        self.columns(table)?.iter().find(|c| c.name == column)
    }
}

impl SchemaCatalog for MemoryCatalog {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.check(table, None)?;
        Ok(self.tables.contains_key(table))
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.check(table, Some(column))?;
        Ok(self.find(table, column).is_some())
    }

    async fn column_type(&self, table: &str, column: &str) -> Result<String> {
        self.check(table, Some(column))?;
        if self
            .failing_types
            .contains(&(table.to_string(), column.to_string()))
        {
            return Err(MigrateError::Database(sqlx::Error::PoolTimedOut));
        }
        self.find(table, column)
            .map(|c| c.reported_sql_type.clone())
            .ok_or_else(|| MigrateError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }
}
