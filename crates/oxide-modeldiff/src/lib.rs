//! Migration generation from model definitions.
//!
//! `oxide-modeldiff` compares declared models with the live schema of a
//! PostgreSQL database and writes paired forward/backward SQL migrations for
//! whatever differs:
//! - A model whose table is missing gets a `CREATE TABLE` script and a
//!   `DROP TABLE` script
//! - A model whose table exists gets one `ALTER TABLE` adding missing columns
//!   and fixing column types, plus a script dropping the added columns
//! - Live columns the model does not declare are never dropped
//!
//! # Architecture
//!
//! - **Schema** - Field types, the type mapper and column specs
//! - **Tags** - Parses field annotations (`not null;unique;default:0`)
//! - **Model** - Model definitions and the registry
//! - **Introspect** - Read-only catalog queries against the live database
//! - **Diff** - Computes schema differences in field declaration order
//! - **Dialect** - Renders CREATE/DROP/ALTER/rollback SQL
//! - **Writer** - Writes timestamped `.up.sql`/`.down.sql` files
//! - **Migrator** - Drives the per-model loop
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_modeldiff::prelude::*;
//!
//! let mut registry = ModelRegistry::new();
//! registry.register(
//!     ModelDefinition::new("User")
//!         .base_fields()
//!         .field("Name", FieldType::String)
//!         .field_with_tag("Email", FieldType::String, "unique;not null"),
//! )?;
//!
//! let catalog = PgCatalog::connect_with(config.connect_options()?).await?;
//! let migrator = Migrator::new(catalog, PostgresDialect::new());
//! let report = migrator
//!     .generate(&registry, &MigrationWriter::new("migrations"))
//!     .await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Write migrations for every model in models.json
//! oxide-modeldiff --user app --dbname shop generate
//!
//! # Print the SQL instead of writing files
//! oxide-modeldiff --user app --dbname shop generate --dry-run
//!
//! # Show the schema differences only
//! oxide-modeldiff --database-url postgres://app@localhost/shop diff
//! ```

pub mod config;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod introspect;
pub mod migrator;
pub mod model;
pub mod naming;
pub mod schema;
pub mod tags;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::dialect::{MigrationDialect, PostgresDialect};
    pub use crate::diff::{SchemaDiffer, SchemaDifference, diff_live_columns};
    pub use crate::error::{MigrateError, Result};
    pub use crate::introspect::{LiveColumn, MemoryCatalog, PgCatalog, SchemaCatalog};
    pub use crate::migrator::{
        MigrationPlan, Migrator, ModelOutcome, ModelPlan, ModelReport, RunReport,
    };
    pub use crate::model::{FieldDefinition, ModelDefinition, ModelRegistry};
    pub use crate::naming::{DefaultNamingStrategy, NamingStrategy};
    pub use crate::schema::{ColumnSpec, DefaultValue, FieldType, SqlType, TableSpec};
    pub use crate::tags::FieldConstraints;
    pub use crate::writer::{Direction, MigrationScript, MigrationWriter};
}
