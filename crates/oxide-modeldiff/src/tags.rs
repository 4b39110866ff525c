//! Field annotation parsing.
//!
//! Fields carry their constraints as a single annotation string in the
//! GORM tag format, e.g. `"not null;unique;default:0;comment:Login count"`.
//! The string is split on `;` into `key[:value]` tokens. Keys are matched
//! case-insensitively, values are kept verbatim and unknown keys are ignored.

use serde::{Deserialize, Serialize};

use crate::schema::{ForeignKeyRef, IndexRequest};

/// Column referenced by `foreignKey:` when no `references:` is given.
pub const DEFAULT_REFERENCED_COLUMN: &str = "id";

/// Structured constraints parsed from a field annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// `primaryKey`.
    pub primary_key: bool,
    /// `unique`.
    pub unique: bool,
    /// `not null`.
    pub not_null: bool,
    /// Raw `default:` literal.
    pub default: Option<String>,
    /// `index`, `index:<name>`, `uniqueIndex`, `uniqueIndex:<name>`.
    pub index: Option<IndexRequest>,
    /// `foreignKey:<table>` with optional `references:<column>`.
    pub foreign_key: Option<ForeignKeyRef>,
    /// `comment:<text>`.
    pub comment: Option<String>,
    /// `column:<name>` override.
    pub column: Option<String>,
    /// `-`: the field is not a column.
    pub ignored: bool,
}

impl FieldConstraints {
    /// Parses an annotation string. Never fails; an empty string yields no
    /// constraints.
    #[must_use]
    pub fn parse(annotation: &str) -> Self {
        let mut constraints = Self::default();
        let mut references: Option<String> = None;

        for token in annotation.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let (key, value) = match token.split_once(':') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (token, None),
            };
            let value = value.filter(|v| !v.is_empty());

            match normalize_key(key).as_str() {
                "-" => constraints.ignored = true,
                "primarykey" | "primary_key" => constraints.primary_key = true,
                "unique" => constraints.unique = true,
                "not null" | "notnull" => constraints.not_null = true,
                "default" => {
                    if let Some(v) = value {
                        constraints.default = Some(v.to_string());
                    }
                }
                "index" => {
                    constraints.index = Some(IndexRequest {
                        name: value.map(str::to_string),
                        unique: false,
                    });
                }
                "uniqueindex" => {
                    constraints.index = Some(IndexRequest {
                        name: value.map(str::to_string),
                        unique: true,
                    });
                }
                "foreignkey" => {
                    if let Some(table) = value {
                        constraints.foreign_key = Some(ForeignKeyRef {
                            table: table.to_string(),
                            column: DEFAULT_REFERENCED_COLUMN.to_string(),
                        });
                    }
                }
                "references" => references = value.map(str::to_string),
                "comment" => constraints.comment = value.map(str::to_string),
                "column" => constraints.column = value.map(str::to_string),
                _ => {}
            }
        }

        if let (Some(fk), Some(column)) = (constraints.foreign_key.as_mut(), references) {
            fk.column = column;
        }

        constraints
    }

    /// Returns true if no constraint was recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lower-cases a key and collapses inner whitespace (`NOT  NULL` -> `not null`).
fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
