//! Run configuration.

use std::path::PathBuf;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use tracing::Level;

use crate::error::{MigrateError, Result};

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub dbname: String,
    /// SSL mode (`disable`, `prefer`, `require`, ...).
    pub sslmode: String,
    /// Full connection URL; takes precedence over the individual settings.
    pub database_url: Option<String>,
    /// Directory migration files are written to.
    pub output_dir: PathBuf,
    /// JSON model registry.
    pub models_path: PathBuf,
    /// Verbose logging.
    pub debug: bool,
    /// Print SQL instead of writing files.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            dbname: String::new(),
            sslmode: "disable".to_string(),
            database_url: None,
            output_dir: PathBuf::from("migrations"),
            models_path: PathBuf::from("models.json"),
            debug: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// Maximum log level for this run.
    #[must_use]
    pub fn log_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Builds the connection options, checking that the required settings
    /// are present.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidConfig`] for a malformed URL, a missing
    /// user or database name, or an unknown SSL mode.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(ref url) = self.database_url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| MigrateError::InvalidConfig(format!("bad database URL: {e}")));
        }

        if self.user.is_empty() || self.dbname.is_empty() {
            return Err(MigrateError::InvalidConfig(
                "database user and name are required".to_string(),
            ));
        }

        let ssl_mode = PgSslMode::from_str(&self.sslmode).map_err(|_| {
            MigrateError::InvalidConfig(format!("unknown sslmode '{}'", self.sslmode))
        })?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.dbname)
            .ssl_mode(ssl_mode);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        Ok(options)
    }
}
