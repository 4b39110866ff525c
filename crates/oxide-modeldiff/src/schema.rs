//! Schema representation types.
//!
//! A model field carries a [`FieldType`]; the type mapper turns it into a
//! [`SqlType`], and together with the parsed tag constraints this yields a
//! [`ColumnSpec`], the unit the diff engine and the DDL generator work on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column names produced by the base-fields block, in declaration order.
pub const BASE_FIELD_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Semantic type of a model field.
///
/// Parsing from a string never fails: unknown names are kept as
/// [`FieldType::Other`] and map to `TEXT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Signed integer of any width.
    Integer,
    /// Unsigned integer of any width.
    UnsignedInteger,
    /// Text.
    String,
    /// Boolean.
    Boolean,
    /// Floating point of any precision.
    Float,
    /// Date and time.
    Timestamp,
    /// The auto-managed `id`/`created_at`/`updated_at`/`deleted_at` block.
    BaseFields,
    /// Any other struct-like type.
    Other(String),
}

impl FieldType {
    /// Maps the semantic type to its SQL column type.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        match self {
            Self::Integer | Self::UnsignedInteger => SqlType::BigInt,
            Self::String => SqlType::Text,
            Self::Boolean => SqlType::Boolean,
            Self::Float => SqlType::DoublePrecision,
            Self::Timestamp => SqlType::Timestamp,
            Self::BaseFields | Self::Other(_) => SqlType::Text,
        }
    }

    /// Returns true for the base-fields marker.
    #[must_use]
    pub fn is_base_fields(&self) -> bool {
        matches!(self, Self::BaseFields)
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "int8" | "int16" | "int32" | "int64" | "integer" | "i8" | "i16" | "i32"
            | "i64" => Self::Integer,
            "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "u8" | "u16" | "u32" | "u64"
            | "unsigned" => Self::UnsignedInteger,
            "string" | "text" => Self::String,
            "bool" | "boolean" => Self::Boolean,
            "float" | "float32" | "float64" | "f32" | "f64" | "double" => Self::Float,
            "time" | "time.time" | "timestamp" | "datetime" => Self::Timestamp,
            "base_fields" | "gorm.model" | "model" => Self::BaseFields,
            _ => Self::Other(name.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("int"),
            Self::UnsignedInteger => f.write_str("uint"),
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("bool"),
            Self::Float => f.write_str("float64"),
            Self::Timestamp => f.write_str("time"),
            Self::BaseFields => f.write_str("base_fields"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// SQL column types emitted by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 64-bit integer.
    BigInt,
    /// Unbounded text.
    Text,
    /// Boolean.
    Boolean,
    /// Double precision floating point.
    DoublePrecision,
    /// Timestamp without time zone.
    Timestamp,
}

impl SqlType {
    /// Returns the SQL type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BigInt => "BIGINT",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::DoublePrecision => "DOUBLE PRECISION",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Returns true if a type reported by the catalog denotes this type.
    ///
    /// The comparison is case-insensitive and understands the long forms
    /// PostgreSQL uses in `information_schema.columns.data_type`.
    #[must_use]
    pub fn matches_reported(&self, reported: &str) -> bool {
        normalize_reported_type(reported).eq_ignore_ascii_case(self.name())
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Folds catalog aliases onto the names used by [`SqlType::name`].
#[must_use]
pub fn normalize_reported_type(reported: &str) -> String {
    let lowered = reported.trim().to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "timestamp without time zone" => "timestamp",
        "int8" => "bigint",
        "bool" => "boolean",
        "float8" => "double precision",
        other => other,
    };
    canonical.to_string()
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default, quoted on output.
    String(String),
    /// SQL expression or pre-quoted literal, copied as-is.
    Expression(String),
}

impl DefaultValue {
    /// Classifies a raw `default:` literal.
    ///
    /// Boolean and numeric literals keep their original spelling, so
    /// `007` stays `007` rather than becoming `7`. Only bare words that are
    /// not SQL are wrapped in quotes.
    #[must_use]
    pub fn parse(literal: &str) -> Self {
        let trimmed = literal.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper == "NULL" {
            return Self::Null;
        }
        if upper == "TRUE"
            || upper == "FALSE"
            || is_numeric_literal(trimmed)
            || is_quoted(trimmed)
            || upper.starts_with("CURRENT_")
            || is_function_call(trimmed)
        {
            return Self::Expression(trimmed.to_string());
        }
        Self::String(trimmed.to_string())
    }

    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => quote_literal(s),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

fn is_numeric_literal(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.parse::<f64>().is_ok()
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'')
}

fn is_function_call(s: &str) -> bool {
    match s.find('(') {
        Some(open) if open > 0 && s.ends_with(')') => s[..open]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Single-quotes a string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Reference from a column to another table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: String,
    /// Referenced column (`id` unless given explicitly).
    pub column: String,
}

/// A standalone index requested on one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRequest {
    /// Explicit index name; `idx_<column>` when absent.
    pub name: Option<String>,
    /// Whether this is a unique index.
    pub unique: bool,
}

/// Canonical description of one column derived from a model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column carries NOT NULL.
    pub not_null: bool,
    /// Whether the column carries UNIQUE.
    pub unique: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Whether this column is part of an explicit primary key.
    pub primary_key: bool,
    /// Standalone index on this column.
    pub index: Option<IndexRequest>,
    /// Foreign key reference.
    pub foreign_key: Option<ForeignKeyRef>,
    /// Column comment.
    pub comment: Option<String>,
}

impl ColumnSpec {
    /// Creates a plain nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            not_null: false,
            unique: false,
            default: None,
            primary_key: false,
            index: None,
            foreign_key: None,
            comment: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Requests an index named `idx_<column>`.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.index = Some(IndexRequest::default());
        self
    }

    /// Adds a foreign key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Attaches a comment.
    #[must_use]
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }
}

/// All columns a model contributes to its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Whether the base-fields block is present.
    pub base_fields: bool,
    /// Explicit columns in declaration order.
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Creates an empty table spec.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_fields: false,
            columns: Vec::new(),
        }
    }

    /// Adds the base-fields block.
    #[must_use]
    pub fn with_base_fields(mut self) -> Self {
        self.base_fields = true;
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Returns true if the model contributes no column at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.base_fields && self.columns.is_empty()
    }

    /// Names of the explicitly tagged primary key columns.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if an explicit column repeats a base-fields column.
    #[must_use]
    pub fn shadows_base_field(&self, column: &ColumnSpec) -> bool {
        self.base_fields && BASE_FIELD_COLUMNS.contains(&column.name.as_str())
    }
}
