//! Migration generator.
//!
//! Walks the model registry one model at a time: a missing table gets a
//! create/drop pair, an existing table gets an alter/rollback pair built from
//! its schema differences. A failure on one model is logged and the run moves
//! on to the next one.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::dialect::MigrationDialect;
use crate::diff::{SchemaDiffer, SchemaDifference};
use crate::error::Result;
use crate::introspect::SchemaCatalog;
use crate::model::{ModelDefinition, ModelRegistry};
use crate::naming::{DefaultNamingStrategy, NamingStrategy};
use crate::writer::{MigrationScript, MigrationWriter};

/// A forward/backward script pair for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Table name.
    pub table: String,
    /// Differences behind an alter plan; empty for a create plan.
    pub differences: Vec<SchemaDifference>,
    /// Forward script.
    pub up: MigrationScript,
    /// Backward script; may be empty when nothing can be reversed.
    pub down: MigrationScript,
}

impl MigrationPlan {
    /// Returns both scripts, forward first.
    #[must_use]
    pub fn scripts(&self) -> [MigrationScript; 2] {
        [self.up.clone(), self.down.clone()]
    }
}

/// What a model needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelPlan {
    /// The table does not exist yet.
    Create(MigrationPlan),
    /// The table exists but differs from the model.
    Alter(MigrationPlan),
    /// The table already matches the model.
    Unchanged {
        /// Table name.
        table: String,
    },
    /// The table does not exist and the model declares no column.
    Empty {
        /// Table name.
        table: String,
    },
}

/// Result of processing one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Create/drop files were written.
    Created {
        /// Written files.
        paths: Vec<PathBuf>,
    },
    /// Alter/rollback files were written.
    Altered {
        /// Written files.
        paths: Vec<PathBuf>,
    },
    /// Nothing to do.
    Unchanged,
    /// The model was skipped.
    Skipped {
        /// Why the model was skipped.
        reason: String,
    },
}

impl fmt::Display for ModelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { paths } | Self::Altered { paths } => {
                let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "migration created: {}", files.join(", "))
            }
            Self::Unchanged => f.write_str("up to date"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Outcome of one model within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReport {
    /// Model name.
    pub model: String,
    /// Table name.
    pub table: String,
    /// What happened.
    pub outcome: ModelOutcome,
}

/// Per-model outcomes of a run, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per model.
    pub models: Vec<ModelReport>,
}

impl RunReport {
    /// Total number of files written (or, in dry-run mode, printed).
    #[must_use]
    pub fn files_written(&self) -> usize {
        self.models
            .iter()
            .map(|r| match &r.outcome {
                ModelOutcome::Created { paths } | ModelOutcome::Altered { paths } => paths.len(),
                ModelOutcome::Unchanged | ModelOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    /// Number of skipped models.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.models
            .iter()
            .filter(|r| matches!(r.outcome, ModelOutcome::Skipped { .. }))
            .count()
    }
}

/// Generates migrations by comparing models with a live catalog.
pub struct Migrator<C: SchemaCatalog, D: MigrationDialect> {
    catalog: C,
    dialect: D,
    naming: Box<dyn NamingStrategy>,
}

impl<C: SchemaCatalog, D: MigrationDialect> Migrator<C, D> {
    /// Creates a migrator with the default naming strategy.
    pub fn new(catalog: C, dialect: D) -> Self {
        Self {
            catalog,
            dialect,
            naming: Box::new(DefaultNamingStrategy),
        }
    }

    /// Replaces the naming strategy.
    #[must_use]
    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Table name of a model.
    #[must_use]
    pub fn table_name(&self, model: &ModelDefinition) -> String {
        model.table_name(self.naming.as_ref())
    }

    /// Computes the schema differences of a model whose table exists.
    ///
    /// Returns `None` when the table does not exist.
    pub async fn differences(
        &self,
        model: &ModelDefinition,
    ) -> Result<Option<Vec<SchemaDifference>>> {
        let spec = model.table_spec(self.naming.as_ref());
        if !self.catalog.table_exists(&spec.name).await? {
            return Ok(None);
        }
        let differ = SchemaDiffer::new(&self.catalog);
        Ok(Some(differ.diff(&spec.name, &spec.columns).await))
    }

    /// Works out what a model needs without writing anything.
    ///
    /// Fails only when the table existence check fails; column lookup
    /// failures are logged and the column is left out of the diff.
    pub async fn plan_model(&self, model: &ModelDefinition) -> Result<ModelPlan> {
        let spec = model.table_spec(self.naming.as_ref());
        let table = spec.name.clone();

        if !self.catalog.table_exists(&table).await? {
            let up_sql = self.dialect.create_table_sql(&spec);
            if up_sql.is_empty() {
                return Ok(ModelPlan::Empty { table });
            }
            let down_sql = self.dialect.drop_table_sql(&table);
            return Ok(ModelPlan::Create(MigrationPlan {
                up: MigrationScript::up(format!("create_{table}_table"), up_sql),
                down: MigrationScript::down(format!("drop_{table}_table"), down_sql),
                differences: Vec::new(),
                table,
            }));
        }

        let differences = SchemaDiffer::new(&self.catalog)
            .diff(&table, &spec.columns)
            .await;
        if differences.is_empty() {
            return Ok(ModelPlan::Unchanged { table });
        }

        let up_sql = self.dialect.alter_table_sql(&table, &differences);
        let down_sql = self.dialect.rollback_sql(&table, &differences);
        Ok(ModelPlan::Alter(MigrationPlan {
            up: MigrationScript::up(format!("alter_{table}_table"), up_sql),
            down: MigrationScript::down(format!("rollback_{table}_table"), down_sql),
            differences,
            table,
        }))
    }

    /// Processes every registered model and writes the resulting files.
    ///
    /// Only file system errors abort the run.
    pub async fn generate(
        &self,
        registry: &ModelRegistry,
        writer: &MigrationWriter,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        for model in registry.iter() {
            let table = self.table_name(model);
            debug!(model = %model.name, table = %table, "Processing model");

            let outcome = match self.plan_model(model).await {
                Err(e) => {
                    warn!(model = %model.name, table = %table, error = %e, "Failed to check table, skipping model");
                    ModelOutcome::Skipped {
                        reason: format!("introspection failed: {e}"),
                    }
                }
                Ok(ModelPlan::Empty { .. }) => {
                    warn!(model = %model.name, table = %table, "Model has no columns, no CREATE TABLE produced");
                    ModelOutcome::Skipped {
                        reason: "model declares no columns".to_string(),
                    }
                }
                Ok(ModelPlan::Unchanged { .. }) => {
                    debug!(table = %table, "No differences found");
                    ModelOutcome::Unchanged
                }
                Ok(ModelPlan::Create(plan)) => {
                    let paths = writer.write_all(&plan.scripts())?;
                    ModelOutcome::Created { paths }
                }
                Ok(ModelPlan::Alter(plan)) => {
                    if plan.down.is_empty() {
                        warn!(table = %table, "No reversible changes, down migration not written");
                    }
                    let paths = writer.write_all(&plan.scripts())?;
                    ModelOutcome::Altered { paths }
                }
            };

            info!(model = %model.name, "{outcome}");
            report.models.push(ModelReport {
                model: model.name.clone(),
                table,
                outcome,
            });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;
    use crate::introspect::{LiveColumn, MemoryCatalog};
    use crate::schema::{FieldType, SqlType};

    fn user_model() -> ModelDefinition {
        ModelDefinition::new("User")
            .base_fields()
            .field("Name", FieldType::String)
            .field("Email", FieldType::String)
    }

    fn users_table(columns: &[(&str, &str)]) -> MemoryCatalog {
        MemoryCatalog::new().table(
            "users",
            columns
                .iter()
                .map(|(name, ty)| LiveColumn::new(*name, *ty))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_plan_create() {
        let migrator = Migrator::new(MemoryCatalog::new(), PostgresDialect::new());
        let plan = migrator.plan_model(&user_model()).await.unwrap();

        let ModelPlan::Create(plan) = plan else {
            panic!("expected a create plan");
        };
        assert_eq!(plan.up.name, "create_users_table");
        assert!(plan.up.sql.starts_with("CREATE TABLE users (\n"));
        assert_eq!(plan.down.name, "drop_users_table");
        assert_eq!(plan.down.sql, "DROP TABLE IF EXISTS users;");
    }

    #[tokio::test]
    async fn test_plan_alter() {
        let catalog = users_table(&[("id", "bigint"), ("name", "text")]);
        let migrator = Migrator::new(catalog, PostgresDialect::new());
        let plan = migrator.plan_model(&user_model()).await.unwrap();

        let ModelPlan::Alter(plan) = plan else {
            panic!("expected an alter plan");
        };
        assert_eq!(
            plan.differences,
            vec![SchemaDifference::AddColumn {
                name: "email".to_string(),
                sql_type: SqlType::Text,
            }]
        );
        assert_eq!(plan.up.sql, "ALTER TABLE users\nADD COLUMN email TEXT;");
        assert_eq!(plan.down.sql, "ALTER TABLE users\nDROP COLUMN email;");
    }

    #[tokio::test]
    async fn test_plan_unchanged() {
        let catalog = users_table(&[("name", "text"), ("email", "TEXT")]);
        let migrator = Migrator::new(catalog, PostgresDialect::new());
        let plan = migrator.plan_model(&user_model()).await.unwrap();

        assert_eq!(
            plan,
            ModelPlan::Unchanged {
                table: "users".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_plan_empty_model() {
        let migrator = Migrator::new(MemoryCatalog::new(), PostgresDialect::new());
        let plan = migrator
            .plan_model(&ModelDefinition::new("Ghost"))
            .await
            .unwrap();

        assert_eq!(
            plan,
            ModelPlan::Empty {
                table: "ghosts".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_differences_for_missing_table() {
        let migrator = Migrator::new(MemoryCatalog::new(), PostgresDialect::new());
        assert_eq!(migrator.differences(&user_model()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_generate_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());

        let catalog = MemoryCatalog::new().fail_table("users");
        let migrator = Migrator::new(catalog, PostgresDialect::new());

        let mut registry = ModelRegistry::new();
        registry.register(user_model()).unwrap();
        registry
            .register(ModelDefinition::new("Post").field("Title", FieldType::String))
            .unwrap();

        let report = migrator.generate(&registry, &writer).await.unwrap();

        assert_eq!(report.models.len(), 2);
        assert!(matches!(
            report.models[0].outcome,
            ModelOutcome::Skipped { .. }
        ));
        assert!(matches!(
            report.models[1].outcome,
            ModelOutcome::Created { ref paths } if paths.len() == 2
        ));
        assert_eq!(report.files_written(), 2);
        assert_eq!(report.skipped(), 1);
    }

    #[tokio::test]
    async fn test_generate_type_change_writes_only_up() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());

        let catalog = users_table(&[("name", "text"), ("email", "character varying")]);
        let migrator = Migrator::new(catalog, PostgresDialect::new());

        let mut registry = ModelRegistry::new();
        registry.register(user_model()).unwrap();

        let report = migrator.generate(&registry, &writer).await.unwrap();
        let ModelOutcome::Altered { ref paths } = report.models[0].outcome else {
            panic!("expected altered outcome");
        };
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().ends_with("_alter_users_table.up.sql"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ModelOutcome::Unchanged.to_string(), "up to date");
        assert_eq!(
            ModelOutcome::Skipped {
                reason: "model declares no columns".to_string()
            }
            .to_string(),
            "skipped: model declares no columns"
        );
    }
}
