//! Model definitions and the model registry.
//!
//! Models are declared as plain data, either through the builder methods on
//! [`ModelDefinition`] or by loading a JSON document with
//! [`ModelRegistry::from_json_file`]:
//!
//! ```json
//! {
//!   "models": [
//!     {
//!       "name": "User",
//!       "fields": [
//!         { "name": "Model", "type": "base_fields" },
//!         { "name": "Name", "type": "string" },
//!         { "name": "Email", "type": "string", "tag": "unique;not null" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::naming::NamingStrategy;
use crate::schema::{ColumnSpec, DefaultValue, FieldType, TableSpec};
use crate::tags::FieldConstraints;

/// One declared attribute of a model.
///
/// The annotation is parsed once, when the field is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct FieldDefinition {
    /// Field name as declared on the model.
    pub name: String,
    /// Semantic type.
    pub field_type: FieldType,
    /// Raw annotation string.
    pub tag: String,
    /// Constraints parsed from `tag`.
    pub constraints: FieldConstraints,
}

#[derive(Serialize, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    tag: String,
}

impl From<RawField> for FieldDefinition {
    fn from(raw: RawField) -> Self {
        Self::new(raw.name, raw.field_type, raw.tag)
    }
}

impl From<FieldDefinition> for RawField {
    fn from(field: FieldDefinition) -> Self {
        Self {
            name: field.name,
            field_type: field.field_type,
            tag: field.tag,
        }
    }
}

impl FieldDefinition {
    /// Creates a field and parses its annotation.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let constraints = FieldConstraints::parse(&tag);
        Self {
            name: name.into(),
            field_type,
            tag,
            constraints,
        }
    }

    /// Returns true if this field is the base-fields marker.
    #[must_use]
    pub fn is_base_fields(&self) -> bool {
        self.field_type.is_base_fields()
    }

    /// Column name for this field under the given naming strategy.
    #[must_use]
    pub fn column_name(&self, naming: &dyn NamingStrategy) -> String {
        self.constraints
            .column
            .clone()
            .unwrap_or_else(|| naming.column_name(&self.name))
    }

    /// Derives the column spec, or `None` for base-fields markers and
    /// ignored fields.
    #[must_use]
    pub fn column_spec(&self, naming: &dyn NamingStrategy) -> Option<ColumnSpec> {
        if self.is_base_fields() || self.constraints.ignored {
            return None;
        }

        let c = &self.constraints;
        Some(ColumnSpec {
            name: self.column_name(naming),
            sql_type: self.field_type.sql_type(),
            not_null: c.not_null,
            unique: c.unique,
            default: c.default.as_deref().map(DefaultValue::parse),
            primary_key: c.primary_key,
            index: c.index.clone(),
            foreign_key: c.foreign_key.clone(),
            comment: c.comment.clone(),
        })
    }
}

/// A named entity with an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model name (e.g. `User`).
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl ModelDefinition {
    /// Creates a model with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds the base-fields block.
    #[must_use]
    pub fn base_fields(self) -> Self {
        self.field_with_tag("Model", FieldType::BaseFields, "")
    }

    /// Adds a field without annotation.
    #[must_use]
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field_with_tag(name, field_type, "")
    }

    /// Adds an annotated field.
    #[must_use]
    pub fn field_with_tag(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        tag: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDefinition::new(name, field_type, tag));
        self
    }

    /// Returns true if the model embeds the base-fields block.
    #[must_use]
    pub fn has_base_fields(&self) -> bool {
        self.fields.iter().any(FieldDefinition::is_base_fields)
    }

    /// Table name under the given naming strategy.
    #[must_use]
    pub fn table_name(&self, naming: &dyn NamingStrategy) -> String {
        naming.table_name(&self.name)
    }

    /// Derives the table spec for this model.
    #[must_use]
    pub fn table_spec(&self, naming: &dyn NamingStrategy) -> TableSpec {
        let mut spec = TableSpec::new(self.table_name(naming));
        spec.base_fields = self.has_base_fields();

        for column in self.fields.iter().filter_map(|f| f.column_spec(naming)) {
            if spec.shadows_base_field(&column) {
                warn!(
                    model = %self.name,
                    column = %column.name,
                    "Column already provided by base fields, ignoring"
                );
                continue;
            }
            spec.columns.push(column);
        }
        spec
    }
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    models: Vec<ModelDefinition>,
}

/// The ordered set of models a run works on.
///
/// Populated once before the run; each model name may appear only once.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDefinition>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateModel`] if the name is taken.
    pub fn register(&mut self, model: ModelDefinition) -> Result<()> {
        if self.get(&model.name).is_some() {
            return Err(MigrateError::DuplicateModel(model.name));
        }
        self.models.push(model);
        Ok(())
    }

    /// Registers several models, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        models: impl IntoIterator<Item = ModelDefinition>,
    ) -> Result<()> {
        for model in models {
            self.register(model)?;
        }
        Ok(())
    }

    /// Parses a registry from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::new();
        registry.register_all(document.models)?;
        Ok(registry)
    }

    /// Loads a registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not a valid registry document,
    /// or declares the same model twice.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let document: RegistryDocument =
            serde_json::from_str(&json).map_err(|source| MigrateError::Registry {
                path: path.to_path_buf(),
                source,
            })?;
        let mut registry = Self::new();
        registry.register_all(document.models)?;
        Ok(registry)
    }

    /// Gets a model by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Iterates over models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.iter()
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no model is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DefaultNamingStrategy;
    use crate::schema::SqlType;

    fn user_model() -> ModelDefinition {
        ModelDefinition::new("User")
            .base_fields()
            .field("Name", FieldType::String)
            .field_with_tag("Email", FieldType::String, "unique;not null")
    }

    #[test]
    fn test_table_spec_skips_base_fields() {
        let spec = user_model().table_spec(&DefaultNamingStrategy);

        assert_eq!(spec.name, "users");
        assert!(spec.base_fields);
        assert_eq!(spec.columns.len(), 2);
        assert_eq!(spec.columns[0].name, "name");
        assert_eq!(spec.columns[1].name, "email");
        assert!(spec.columns[1].unique);
        assert!(spec.columns[1].not_null);
    }

    #[test]
    fn test_base_fields_tag_is_not_processed() {
        let model = ModelDefinition::new("Item").field_with_tag(
            "Model",
            FieldType::BaseFields,
            "primaryKey;index",
        );
        let spec = model.table_spec(&DefaultNamingStrategy);
        assert!(spec.base_fields);
        assert!(spec.columns.is_empty());
        assert!(spec.primary_key().is_empty());
    }

    #[test]
    fn test_column_override_and_ignored_field() {
        let model = ModelDefinition::new("Account")
            .field_with_tag("Mail", FieldType::String, "column:email_address")
            .field_with_tag("Scratch", FieldType::String, "-")
            .field_with_tag("Balance", FieldType::Float, "default:0");
        let spec = model.table_spec(&DefaultNamingStrategy);

        assert_eq!(spec.columns.len(), 2);
        assert_eq!(spec.columns[0].name, "email_address");
        assert_eq!(spec.columns[1].sql_type, SqlType::DoublePrecision);
        assert_eq!(
            spec.columns[1].default,
            Some(DefaultValue::Expression("0".to_string()))
        );
    }

    #[test]
    fn test_fields_repeating_base_columns_are_dropped() {
        let model = ModelDefinition::new("User")
            .base_fields()
            .field("ID", FieldType::Integer)
            .field("CreatedAt", FieldType::Timestamp)
            .field("Name", FieldType::String);
        let spec = model.table_spec(&DefaultNamingStrategy);

        assert_eq!(spec.columns.len(), 1);
        assert_eq!(spec.columns[0].name, "name");

        let plain = ModelDefinition::new("Legacy").field("ID", FieldType::Integer);
        assert_eq!(plain.table_spec(&DefaultNamingStrategy).columns[0].name, "id");
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ModelRegistry::new();
        registry.register(user_model()).unwrap();
        let result = registry.register(user_model());

        assert!(matches!(result, Err(MigrateError::DuplicateModel(name)) if name == "User"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "models": [
                {
                    "name": "User",
                    "fields": [
                        { "name": "Model", "type": "base_fields" },
                        { "name": "Name", "type": "string" },
                        { "name": "Age", "type": "uint8", "tag": "not null" },
                        { "name": "Avatar", "type": "image.Image" }
                    ]
                },
                { "name": "Tag", "fields": [] }
            ]
        }"#;

        let registry = ModelRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 2);

        let user = registry.get("User").unwrap();
        assert!(user.has_base_fields());
        assert_eq!(user.fields[2].field_type, FieldType::UnsignedInteger);
        assert!(user.fields[2].constraints.not_null);
        assert_eq!(
            user.fields[3].field_type,
            FieldType::Other("image.Image".to_string())
        );

        let names: Vec<&str> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Tag"]);
    }

    #[test]
    fn test_from_json_str_duplicate() {
        let json = r#"{ "models": [ { "name": "A" }, { "name": "A" } ] }"#;
        assert!(matches!(
            ModelRegistry::from_json_str(json),
            Err(MigrateError::DuplicateModel(_))
        ));
    }

    #[test]
    fn test_field_serde_roundtrip_keeps_tag() {
        let field = FieldDefinition::new("Email", FieldType::String, "unique");
        let json = serde_json::to_string(&field).unwrap();
        let back: FieldDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }
}
