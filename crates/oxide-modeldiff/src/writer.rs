//! Migration file writer.
//!
//! Each script is written to `<output_dir>/<timestamp>_<name>.<up|down>.sql`.
//! Empty scripts are skipped rather than written as no-op files.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Timestamp prefix format of migration files.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Whether a script applies or reverts a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Forward migration.
    Up,
    /// Backward migration.
    Down,
}

impl Direction {
    /// File suffix for this direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SQL script waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationScript {
    /// Semantic name, e.g. `create_users_table`.
    pub name: String,
    /// SQL text; empty means nothing to write.
    pub sql: String,
    /// Direction of the script.
    pub direction: Direction,
}

impl MigrationScript {
    /// Creates a forward script.
    #[must_use]
    pub fn up(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            direction: Direction::Up,
        }
    }

    /// Creates a backward script.
    #[must_use]
    pub fn down(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            direction: Direction::Down,
        }
    }

    /// Returns true if there is no SQL to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// File name of this script at the given time.
    #[must_use]
    pub fn file_name(&self, timestamp: &NaiveDateTime) -> String {
        format!(
            "{}_{}.{}.sql",
            timestamp.format(TIMESTAMP_FORMAT),
            self.name,
            self.direction
        )
    }
}

/// Writes migration scripts to a directory.
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    output_dir: PathBuf,
    dry_run: bool,
}

impl MigrationWriter {
    /// Creates a writer for the given directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            dry_run: false,
        }
    }

    /// Enables dry-run mode (scripts are printed, nothing is written).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns whether dry-run mode is on.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Writes the scripts with one shared timestamp, taken now.
    pub fn write_all(&self, scripts: &[MigrationScript]) -> Result<Vec<PathBuf>> {
        self.write_all_at(scripts, Local::now().naive_local())
    }

    /// Writes the scripts with the given timestamp.
    ///
    /// Returns the paths of the non-empty scripts. In dry-run mode these are
    /// the paths that would have been written.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Io`](crate::error::MigrateError::Io) when the output directory or a file
    /// cannot be written.
    pub fn write_all_at(
        &self,
        scripts: &[MigrationScript],
        timestamp: NaiveDateTime,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for script in scripts {
            if let Some(path) = self.write_at(script, &timestamp)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn write_at(
        &self,
        script: &MigrationScript,
        timestamp: &NaiveDateTime,
    ) -> Result<Option<PathBuf>> {
        if script.is_empty() {
            debug!(
                name = %script.name,
                direction = %script.direction,
                "Skipping empty migration file"
            );
            return Ok(None);
        }

        let path = self.output_dir.join(script.file_name(timestamp));

        if self.dry_run {
            println!("-- {}", path.display());
            println!("{}\n", script.sql);
            return Ok(Some(path));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::write(&path, &script.sql)?;
        info!(path = %path.display(), "Created migration file");
        debug!(sql = %script.sql, "Migration content");

        Ok(Some(path))
    }
}
