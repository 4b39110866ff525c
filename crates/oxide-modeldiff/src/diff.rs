//! Diff engine: compares a model's columns with the live table.
//!
//! The engine is additive and corrective only. It adds missing columns and
//! fixes column types; a live column that the model does not declare is never
//! dropped. Differences come out in field declaration order.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::introspect::{LiveColumn, SchemaCatalog};
use crate::schema::{ColumnSpec, SqlType};

/// One structural change needed to reconcile a table with its model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaDifference {
    /// The column is missing from the live table.
    AddColumn {
        /// Column name.
        name: String,
        /// Column type.
        sql_type: SqlType,
    },
    /// The live column has a different type.
    AlterColumnType {
        /// Column name.
        name: String,
        /// Type the column should have.
        new_sql_type: SqlType,
    },
}

impl SchemaDifference {
    /// Name of the affected column.
    #[must_use]
    pub fn column_name(&self) -> &str {
        match self {
            Self::AddColumn { name, .. } | Self::AlterColumnType { name, .. } => name,
        }
    }

    /// Returns true if the change can be undone without extra information.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        matches!(self, Self::AddColumn { .. })
    }
}

impl fmt::Display for SchemaDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddColumn { name, sql_type } => write!(f, "add column {name} ({sql_type})"),
            Self::AlterColumnType { name, new_sql_type } => {
                write!(f, "change type of {name} to {new_sql_type}")
            }
        }
    }
}

/// Compares one column spec with what the catalog reports for it.
///
/// `live_type` is `None` when the column does not exist.
#[must_use]
pub fn compare_column(spec: &ColumnSpec, live_type: Option<&str>) -> Option<SchemaDifference> {
    match live_type {
        None => Some(SchemaDifference::AddColumn {
            name: spec.name.clone(),
            sql_type: spec.sql_type,
        }),
        Some(reported) if !spec.sql_type.matches_reported(reported) => {
            Some(SchemaDifference::AlterColumnType {
                name: spec.name.clone(),
                new_sql_type: spec.sql_type,
            })
        }
        Some(_) => None,
    }
}

/// Diffs column specs against an already loaded set of live columns.
#[must_use]
pub fn diff_live_columns(specs: &[ColumnSpec], live: &[LiveColumn]) -> Vec<SchemaDifference> {
    let live_types: HashMap<&str, &str> = live
        .iter()
        .map(|c| (c.name.as_str(), c.reported_sql_type.as_str()))
        .collect();

    specs
        .iter()
        .filter_map(|spec| compare_column(spec, live_types.get(spec.name.as_str()).copied()))
        .collect()
}

/// Diffs column specs against the live catalog, one lookup at a time.
#[derive(Debug)]
pub struct SchemaDiffer<'a, C: SchemaCatalog> {
    catalog: &'a C,
}

impl<'a, C: SchemaCatalog> SchemaDiffer<'a, C> {
    /// Creates a differ over the given catalog.
    #[must_use]
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Computes the differences for an existing table.
    ///
    /// A column whose lookup fails is logged and skipped; the remaining
    /// columns are still compared.
    pub async fn diff(&self, table: &str, columns: &[ColumnSpec]) -> Vec<SchemaDifference> {
        let mut differences = Vec::new();

        for spec in columns {
            let column = spec.name.as_str();

            let exists = match self.catalog.column_exists(table, column).await {
                Ok(exists) => exists,
                Err(e) => {
                    warn!(table, column, error = %e, "Failed to check column, skipping");
                    continue;
                }
            };

            let live_type = if exists {
                match self.catalog.column_type(table, column).await {
                    Ok(data_type) => Some(data_type),
                    Err(e) => {
                        warn!(table, column, error = %e, "Failed to read column type, skipping");
                        continue;
                    }
                }
            } else {
                None
            };

            if let Some(difference) = compare_column(spec, live_type.as_deref()) {
                debug!(table, %difference, "Schema difference");
                differences.push(difference);
            }
        }

        differences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::MemoryCatalog;

    fn specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name", SqlType::Text),
            ColumnSpec::new("email", SqlType::Text),
            ColumnSpec::new("age", SqlType::BigInt),
        ]
    }

    fn live() -> Vec<LiveColumn> {
        vec![
            LiveColumn::new("id", "bigint"),
            LiveColumn::new("legacy_flag", "boolean"),
            LiveColumn::new("name", "TEXT"),
            LiveColumn::new("age", "integer"),
        ]
    }

    #[test]
    fn test_compare_column() {
        let spec = ColumnSpec::new("email", SqlType::Text);
        assert_eq!(
            compare_column(&spec, None),
            Some(SchemaDifference::AddColumn {
                name: "email".to_string(),
                sql_type: SqlType::Text,
            })
        );
        assert_eq!(compare_column(&spec, Some("text")), None);
        assert_eq!(
            compare_column(&spec, Some("character varying")),
            Some(SchemaDifference::AlterColumnType {
                name: "email".to_string(),
                new_sql_type: SqlType::Text,
            })
        );
    }

    #[test]
    fn test_diff_follows_declaration_order() {
        let diff = diff_live_columns(&specs(), &live());
        let names: Vec<&str> = diff.iter().map(SchemaDifference::column_name).collect();
        assert_eq!(names, vec!["email", "age"]);
        assert!(matches!(diff[0], SchemaDifference::AddColumn { .. }));
        assert!(matches!(diff[1], SchemaDifference::AlterColumnType { .. }));
    }

    #[test]
    fn test_diff_is_deterministic() {
        let first = diff_live_columns(&specs(), &live());
        for _ in 0..10 {
            assert_eq!(diff_live_columns(&specs(), &live()), first);
        }
    }

    #[test]
    fn test_diff_never_drops_live_columns() {
        let diff = diff_live_columns(&specs(), &live());
        for difference in &diff {
            assert_ne!(difference.column_name(), "legacy_flag");
            assert_ne!(difference.column_name(), "id");
        }
    }

    #[test]
    fn test_matching_table_yields_nothing() {
        let live = vec![
            LiveColumn::new("name", "text"),
            LiveColumn::new("email", "Text"),
            LiveColumn::new("age", "BIGINT"),
        ];
        assert!(diff_live_columns(&specs(), &live).is_empty());
    }

    #[tokio::test]
    async fn test_differ_matches_pure_diff() {
        let catalog = MemoryCatalog::new().table("users", live());
        let differ = SchemaDiffer::new(&catalog);

        let diff = differ.diff("users", &specs()).await;
        assert_eq!(diff, diff_live_columns(&specs(), &live()));
    }

    #[tokio::test]
    async fn test_differ_skips_failing_column() {
        let catalog = MemoryCatalog::new()
            .table("users", live())
            .fail_column("users", "email");
        let differ = SchemaDiffer::new(&catalog);

        let diff = differ.diff("users", &specs()).await;
        assert_eq!(
            diff,
            vec![SchemaDifference::AlterColumnType {
                name: "age".to_string(),
                new_sql_type: SqlType::BigInt,
            }]
        );
    }

    #[tokio::test]
    async fn test_differ_skips_column_when_type_lookup_fails() {
        let catalog = MemoryCatalog::new()
            .table("users", live())
            .fail_column_type("users", "age");
        let differ = SchemaDiffer::new(&catalog);

        let mut columns = specs();
        columns.push(ColumnSpec::new("nickname", SqlType::Text));

        let diff = differ.diff("users", &columns).await;
        assert_eq!(
            diff,
            vec![
                SchemaDifference::AddColumn {
                    name: "email".to_string(),
                    sql_type: SqlType::Text,
                },
                SchemaDifference::AddColumn {
                    name: "nickname".to_string(),
                    sql_type: SqlType::Text,
                },
            ]
        );
    }

    #[test]
    fn test_reversibility() {
        let add = SchemaDifference::AddColumn {
            name: "a".to_string(),
            sql_type: SqlType::Text,
        };
        let alter = SchemaDifference::AlterColumnType {
            name: "a".to_string(),
            new_sql_type: SqlType::Text,
        };
        assert!(add.is_reversible());
        assert!(!alter.is_reversible());
    }
}
