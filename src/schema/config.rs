//! JSON schema descriptions.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{CodeTable, FieldDefinition, MemoryCodeTable, RecordDefinition};
use crate::geometry::GeometryFactoryCache;
use crate::types::{DataType, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub path: String,
    #[serde(default)]
    pub srid: Option<u32>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub id_fields: Vec<String>,
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min: Option<serde_json::Value>,
    #[serde(default)]
    pub max: Option<serde_json::Value>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub allowed_values: Vec<serde_json::Value>,
    #[serde(default)]
    pub code_table: Option<CodeTableConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeTableConfig {
    pub name: String,
    #[serde(default)]
    pub codes: Vec<CodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    pub id: serde_json::Value,
    pub values: Vec<serde_json::Value>,
}

impl SchemaConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse schema description")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Builds the definition, taking its geometry factory from `factories`.
    pub fn into_record_definition(&self, factories: &GeometryFactoryCache) -> Result<RecordDefinition> {
        let mut definition = RecordDefinition::new(self.path.as_str());
        for field_config in &self.fields {
            definition.add_field(field_config.to_field_definition()?);
        }
        if !self.id_fields.is_empty() {
            definition
                .set_id_field_names(self.id_fields.as_slice())
                .with_context(|| format!("Invalid id fields for {}", self.path))?;
        }
        if let Some(srid) = self.srid {
            let factory = factories.get(srid, self.scale.unwrap_or(0.0));
            definition.set_geometry_factory(factory);
        }
        log::debug!(
            "Loaded schema {} with {} fields",
            definition.path(),
            definition.field_count()
        );
        Ok(definition)
    }
}

impl FieldConfig {
    pub fn to_field_definition(&self) -> Result<FieldDefinition> {
        let Some(data_type) = DataType::from_name(&self.data_type) else {
            bail!("Unknown type '{}' for field '{}'", self.data_type, self.name);
        };
        let mut field = FieldDefinition::new(self.name.as_str(), data_type)
            .with_length(self.length.unwrap_or(0))
            .with_scale(self.scale.unwrap_or(0))
            .with_required(self.required);
        if let Some(title) = &self.title {
            field = field.with_title(title.as_str());
        }
        if let Some(description) = &self.description {
            field = field.with_description(description.as_str());
        }
        if let Some(min) = &self.min {
            field = field.with_min_value(value_from_json(min));
        }
        if let Some(max) = &self.max {
            field = field.with_max_value(value_from_json(max));
        }
        if let Some(default) = &self.default {
            field = field.with_default_value(value_from_json(default));
        }
        for allowed in &self.allowed_values {
            field = field.with_allowed_value(value_from_json(allowed));
        }
        if let Some(code_table) = &self.code_table {
            field = field.with_code_table(code_table.to_code_table());
        }
        Ok(field)
    }
}

impl CodeTableConfig {
    pub fn to_code_table(&self) -> Arc<dyn CodeTable> {
        let table = MemoryCodeTable::new(self.name.as_str());
        for code in &self.codes {
            table.add_code(
                value_from_json(&code.id),
                code.values.iter().map(value_from_json).collect(),
            );
        }
        Arc::new(table)
    }
}

/// Maps a JSON value onto the closest [`Value`]; objects are kept as text.
pub fn value_from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i)),
            None => n.as_f64().map(Value::Double).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(value_from_json).collect()),
        serde_json::Value::Object(_) => Value::String(json.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PERSON: &str = r#"{
        "path": "/TEST/PERSON",
        "srid": 3005,
        "scale": 1000.0,
        "id_fields": ["id"],
        "fields": [
            { "name": "id", "type": "long", "required": true },
            { "name": "name", "type": "varchar", "length": 10 },
            { "name": "age", "type": "integer", "min": 0, "max": 150 },
            { "name": "status", "type": "int", "code_table": {
                "name": "STATUS",
                "codes": [ { "id": 1, "values": ["Active"] }, { "id": 2, "values": ["Retired"] } ]
            } },
            { "name": "geometry", "type": "point" }
        ]
    }"#;

    #[test]
    fn test_into_record_definition() {
        let config = SchemaConfig::from_json(PERSON).unwrap();
        let cache = GeometryFactoryCache::new();
        let definition = config.into_record_definition(&cache).unwrap();

        assert_eq!(definition.field_count(), 5);
        assert_eq!(definition.field("name").unwrap().type_description(), "string(10)");
        assert_eq!(definition.id_field().unwrap().name(), "id");
        assert_eq!(definition.geometry_field().unwrap().name(), "geometry");
        assert_eq!(definition.geometry_factory().unwrap().srid(), 3005);
        assert!(Arc::ptr_eq(definition.geometry_factory().unwrap(), &cache.get(3005, 1000.0)));

        let status = definition.field("status").unwrap();
        assert_eq!(status.to_field_value(&Value::from("Retired")), Value::Int(2));
    }

    #[test]
    fn test_unknown_type_fails() {
        let config = SchemaConfig::from_json(
            r#"{ "path": "/X", "fields": [ { "name": "a", "type": "blob" } ] }"#,
        )
        .unwrap();
        let err = config.into_record_definition(&GeometryFactoryCache::new()).unwrap_err();
        assert!(err.to_string().contains("Unknown type 'blob'"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PERSON.as_bytes()).unwrap();
        let config = SchemaConfig::load(file.path()).unwrap();
        assert_eq!(config.path, "/TEST/PERSON");
        assert!(SchemaConfig::load("/nonexistent/schema.json").is_err());
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(value_from_json(&serde_json::json!(5)), Value::Int(5));
        assert_eq!(value_from_json(&serde_json::json!(5_000_000_000i64)), Value::Long(5_000_000_000));
        assert_eq!(value_from_json(&serde_json::json!(1.5)), Value::Double(1.5));
        assert_eq!(
            value_from_json(&serde_json::json!([1, "a"])),
            Value::List(vec![Value::Int(1), Value::from("a")])
        );
    }
}
