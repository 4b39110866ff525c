//! oxide-modeldiff CLI
//!
//! Command-line tool generating SQL migrations from model definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use oxide_modeldiff::prelude::*;

/// Generates database migrations from model definitions.
#[derive(Parser)]
#[command(name = "oxide-modeldiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database port.
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Database user.
    #[arg(long, default_value = "")]
    user: String,

    /// Database password.
    #[arg(long, env = "PGPASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Database name.
    #[arg(long, default_value = "")]
    dbname: String,

    /// SSL mode.
    #[arg(long, default_value = "disable")]
    sslmode: String,

    /// Connection URL, overrides host/port/user/password/dbname.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Output directory for migration files.
    #[arg(short, long, default_value = "migrations")]
    output: PathBuf,

    /// JSON file declaring the models.
    #[arg(short, long, default_value = "models.json")]
    models: PathBuf,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate migration files for every model.
    Generate {
        /// Print the SQL instead of writing files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the schema differences without generating SQL.
    Diff,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        host: cli.host,
        port: cli.port,
        user: cli.user,
        password: cli.password,
        dbname: cli.dbname,
        sslmode: cli.sslmode,
        database_url: cli.database_url,
        output_dir: cli.output,
        models_path: cli.models,
        debug: cli.debug,
        dry_run: matches!(cli.command, Commands::Generate { dry_run: true }),
    };

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = config.connect_options()?;
    let registry = ModelRegistry::from_json_file(&config.models_path)?;
    if registry.is_empty() {
        info!(path = %config.models_path.display(), "No models registered, nothing to do");
        return Ok(());
    }

    // Without schema access there is nothing meaningful to do
    let catalog = PgCatalog::connect_with(options).await?;
    let migrator = Migrator::new(catalog, PostgresDialect::new());

    match cli.command {
        Commands::Generate { .. } => {
            let writer = MigrationWriter::new(&config.output_dir).dry_run(config.dry_run);
            let report = migrator.generate(&registry, &writer).await?;

            println!();
            for entry in &report.models {
                println!(" {} ({}): {}", entry.model, entry.table, entry.outcome);
            }
            println!();

            if report.files_written() == 0 {
                info!("No changes detected.");
            } else if config.dry_run {
                info!("Dry run: {} file(s) not written.", report.files_written());
            } else {
                info!("Migrations generated successfully!");
            }
        }

        Commands::Diff => {
            for model in registry.iter() {
                let table = migrator.table_name(model);
                match migrator.differences(model).await {
                    Ok(None) => println!(" {} ({table}): table missing", model.name),
                    Ok(Some(differences)) if differences.is_empty() => {
                        println!(" {} ({table}): up to date", model.name);
                    }
                    Ok(Some(differences)) => {
                        println!(" {} ({table}):", model.name);
                        for difference in &differences {
                            println!("   - {difference}");
                        }
                    }
                    Err(e) => {
                        warn!(model = %model.name, table = %table, error = %e, "Failed to check table, skipping model");
                    }
                }
            }
        }
    }

    Ok(())
}
