//! Example: Blog Application Models
//!
//! This example declares the models of a small blog, compares them with an
//! in-memory copy of a live schema and prints the migrations that would be
//! written. No database is needed.
//!
//! Run with: cargo run --example blog_models -p oxide-modeldiff

use oxide_modeldiff::prelude::*;

// =============================================================================
// Model Definitions
// =============================================================================

fn user() -> ModelDefinition {
    ModelDefinition::new("User")
        .base_fields()
        .field_with_tag("Username", FieldType::String, "unique;not null")
        .field_with_tag("Email", FieldType::String, "not null;index")
        .field_with_tag("IsActive", FieldType::Boolean, "not null;default:true")
}

fn post() -> ModelDefinition {
    ModelDefinition::new("Post")
        .base_fields()
        .field_with_tag("AuthorID", FieldType::UnsignedInteger, "not null;foreignKey:users")
        .field_with_tag("Title", FieldType::String, "not null;comment:Headline shown in lists")
        .field("Body", FieldType::String)
        .field("PublishedAt", FieldType::Timestamp)
}

fn comment() -> ModelDefinition {
    ModelDefinition::new("Comment")
        .base_fields()
        .field_with_tag("PostID", FieldType::UnsignedInteger, "not null;foreignKey:posts")
        .field("Body", FieldType::String)
        .field("Score", FieldType::Float)
}

// =============================================================================
// The "live" database: users exists but is behind, posts is current
// =============================================================================

fn live_schema() -> MemoryCatalog {
    MemoryCatalog::new()
        .table(
            "users",
            vec![
                LiveColumn::new("id", "bigint"),
                LiveColumn::new("username", "character varying"),
                LiveColumn::new("email", "text"),
            ],
        )
        .table(
            "posts",
            vec![
                LiveColumn::new("author_id", "bigint"),
                LiveColumn::new("title", "text"),
                LiveColumn::new("body", "text"),
                LiveColumn::new("published_at", "timestamp without time zone"),
            ],
        )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!(" OXIDE-MODELDIFF: Blog Application Example");
    println!("{}", "=".repeat(70));
    println!();

    let mut registry = ModelRegistry::new();
    registry.register_all([user(), post(), comment()])?;

    let migrator = Migrator::new(live_schema(), PostgresDialect::new());

    for model in registry.iter() {
        println!("[{}]", model.name);
        match migrator.plan_model(model).await? {
            ModelPlan::Create(plan) | ModelPlan::Alter(plan) => {
                for script in plan.scripts() {
                    if script.is_empty() {
                        println!("-- {} ({}): nothing to reverse", script.name, script.direction);
                    } else {
                        println!("-- {} ({})\n{}", script.name, script.direction, script.sql);
                    }
                }
            }
            ModelPlan::Unchanged { table } => println!("-- {table} is up to date"),
            ModelPlan::Empty { table } => println!("-- {table} has no columns"),
        }
        println!();
    }

    Ok(())
}
