use std::collections::HashMap;
use std::sync::Arc;

use super::{CodeTable, FieldDefinition, Record};
use crate::error::{ExpressionError, ExpressionResult};
use crate::geometry::GeometryFactory;
use crate::types::Value;

/// Ordered field list for one record type.
///
/// A field's position in the list is its index. Fields are appended or
/// replaced in place, never removed, so indexes are never reused.
#[derive(Debug, Clone)]
pub struct RecordDefinition {
    path: String,
    fields: Vec<Arc<FieldDefinition>>,
    field_indexes: HashMap<String, usize>,
    geometry_field_indexes: Vec<usize>,
    id_field_indexes: Vec<usize>,
    default_values: HashMap<String, Value>,
    code_tables: HashMap<String, Arc<dyn CodeTable>>,
    geometry_factory: Option<Arc<GeometryFactory>>,
}

impl RecordDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fields: Vec::new(),
            field_indexes: HashMap::new(),
            geometry_field_indexes: Vec::new(),
            id_field_indexes: Vec::new(),
            default_values: HashMap::new(),
            code_tables: HashMap::new(),
            geometry_factory: None,
        }
    }

    /// Builds a definition from fields in order.
    pub fn with_fields(path: impl Into<String>, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let mut definition = Self::new(path);
        for field in fields {
            definition.add_field(field);
        }
        definition
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Copy of this definition under another path.
    pub fn renamed(&self, path: impl Into<String>) -> Self {
        let mut definition = self.clone();
        definition.path = path.into();
        definition
    }

    /// Last segment of the path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Appends a field, assigning the next index. A field whose name is
    /// already present replaces the existing one at its index.
    pub fn add_field(&mut self, field: FieldDefinition) -> Arc<FieldDefinition> {
        if let Some(index) = self.field_index(field.name()) {
            return self.install(index, field);
        }
        let index = self.fields.len();
        let mut field = field;
        field.set_index(index);
        self.apply_code_table_override(&mut field);
        if let Some(default) = field.default_value() {
            self.default_values
                .insert(field.name().to_lowercase(), default.clone());
        }
        if field.data_type().is_geometry() {
            self.geometry_field_indexes.push(index);
        }
        self.field_indexes.insert(field.name().to_lowercase(), index);
        let field = Arc::new(field);
        self.fields.push(Arc::clone(&field));
        field
    }

    /// Replaces the field with the same name, keeping its index.
    pub fn replace_field(&mut self, field: FieldDefinition) -> ExpressionResult<Arc<FieldDefinition>> {
        match self.field_index(field.name()) {
            Some(index) => Ok(self.install(index, field)),
            None => Err(ExpressionError::schema_resolution(field.name(), self.path.as_str())),
        }
    }

    fn install(&mut self, index: usize, mut field: FieldDefinition) -> Arc<FieldDefinition> {
        field.set_index(index);
        self.apply_code_table_override(&mut field);
        let key = field.name().to_lowercase();
        match field.default_value() {
            Some(default) => {
                self.default_values.insert(key, default.clone());
            }
            None => {
                self.default_values.remove(&key);
            }
        }
        let is_geometry = field.data_type().is_geometry();
        let registered = self.geometry_field_indexes.contains(&index);
        // Registration order decides the primary geometry field.
        if is_geometry && !registered {
            self.geometry_field_indexes.push(index);
        } else if !is_geometry && registered {
            self.geometry_field_indexes.retain(|&i| i != index);
        }
        let field = Arc::new(field);
        self.fields[index] = Arc::clone(&field);
        field
    }

    fn apply_code_table_override(&self, field: &mut FieldDefinition) {
        if field.code_table().is_some() {
            return;
        }
        if let Some(code_table) = self.code_tables.get(&field.name().to_lowercase()) {
            field.set_code_table(Arc::clone(code_table));
        }
    }

    pub fn fields(&self) -> &[Arc<FieldDefinition>] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Case-insensitive lookup.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldDefinition>> {
        self.field_index(name).map(|index| &self.fields[index])
    }

    pub fn field_at(&self, index: usize) -> Option<&Arc<FieldDefinition>> {
        self.fields.get(index)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_indexes.get(&name.to_lowercase()).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    pub fn geometry_field_indexes(&self) -> &[usize] {
        &self.geometry_field_indexes
    }

    /// The first geometry field added is the primary one.
    pub fn geometry_field_index(&self) -> Option<usize> {
        self.geometry_field_indexes.first().copied()
    }

    pub fn geometry_field(&self) -> Option<&Arc<FieldDefinition>> {
        self.geometry_field_index().map(|index| &self.fields[index])
    }

    pub fn geometry_field_names(&self) -> Vec<&str> {
        self.geometry_field_indexes
            .iter()
            .map(|&index| self.fields[index].name())
            .collect()
    }

    /// Marks the named fields as the id, in order.
    pub fn set_id_field_names<S: AsRef<str>>(&mut self, names: &[S]) -> ExpressionResult<()> {
        let mut indexes = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.field_index(name) {
                Some(index) => indexes.push(index),
                None => return Err(ExpressionError::schema_resolution(name, self.path.as_str())),
            }
        }
        self.id_field_indexes = indexes;
        Ok(())
    }

    pub fn id_field_indexes(&self) -> &[usize] {
        &self.id_field_indexes
    }

    pub fn id_fields(&self) -> Vec<&Arc<FieldDefinition>> {
        self.id_field_indexes
            .iter()
            .map(|&index| &self.fields[index])
            .collect()
    }

    /// The id field when the id is a single column.
    pub fn id_field(&self) -> Option<&Arc<FieldDefinition>> {
        match self.id_field_indexes.as_slice() {
            [index] => Some(&self.fields[*index]),
            _ => None,
        }
    }

    pub fn default_value(&self, name: &str) -> Option<&Value> {
        self.default_values.get(&name.to_lowercase())
    }

    pub fn set_default_value(&mut self, name: &str, value: impl Into<Value>) -> ExpressionResult<()> {
        let field = self
            .field(name)
            .ok_or_else(|| ExpressionError::schema_resolution(name, self.path.as_str()))?;
        let value = field.to_field_value_strict(&value.into())?;
        self.default_values.insert(name.to_lowercase(), value);
        Ok(())
    }

    /// Registers a code table override for a field.
    ///
    /// A table declared on the field itself still wins. When the field has
    /// none, the override is written onto the field so later lookups go
    /// straight through it.
    pub fn add_field_code_table(&mut self, name: &str, code_table: Arc<dyn CodeTable>) {
        let key = name.to_lowercase();
        self.code_tables.insert(key, Arc::clone(&code_table));
        if let Some(index) = self.field_index(name) {
            if self.fields[index].code_table().is_none() {
                let mut field = FieldDefinition::clone(&self.fields[index]);
                field.set_code_table(code_table);
                self.fields[index] = Arc::new(field);
            }
        }
    }

    pub fn code_table_by_field_name(&self, name: &str) -> Option<Arc<dyn CodeTable>> {
        if let Some(code_table) = self.field(name).and_then(|f| f.code_table()) {
            return Some(Arc::clone(code_table));
        }
        self.code_tables.get(&name.to_lowercase()).cloned()
    }

    pub fn geometry_factory(&self) -> Option<&Arc<GeometryFactory>> {
        self.geometry_factory.as_ref()
    }

    pub fn set_geometry_factory(&mut self, factory: Arc<GeometryFactory>) {
        self.geometry_factory = Some(factory);
    }

    /// New record with every field at its default value.
    pub fn new_record(self: &Arc<Self>) -> Record {
        Record::new(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemoryCodeTable;
    use crate::types::DataType;

    fn parcels() -> RecordDefinition {
        RecordDefinition::with_fields(
            "/LAND/PARCEL",
            [
                FieldDefinition::new("ID", DataType::Long),
                FieldDefinition::new("Name", DataType::String).with_length(30),
                FieldDefinition::new("GEOMETRY", DataType::Polygon),
                FieldDefinition::new("CENTROID", DataType::Point),
            ],
        )
    }

    #[test]
    fn test_indexes_and_case_insensitive_lookup() {
        let definition = parcels();
        assert_eq!(definition.name(), "PARCEL");
        assert_eq!(definition.field_index("name"), Some(1));
        assert_eq!(definition.field("NAME").unwrap().name(), "Name");
        assert!(definition.field("missing").is_none());
        assert_eq!(definition.field_names(), vec!["ID", "Name", "GEOMETRY", "CENTROID"]);
    }

    #[test]
    fn test_geometry_fields() {
        let definition = parcels();
        assert_eq!(definition.geometry_field_indexes(), &[2, 3]);
        assert_eq!(definition.geometry_field().unwrap().name(), "GEOMETRY");
        assert_eq!(definition.geometry_field_names(), vec!["GEOMETRY", "CENTROID"]);
    }

    #[test]
    fn test_replace_field_keeps_index() {
        let mut definition = parcels();
        let field = definition
            .replace_field(FieldDefinition::new("name", DataType::String).with_length(60))
            .unwrap();
        assert_eq!(field.index(), 1);
        assert_eq!(definition.field_count(), 4);
        assert_eq!(definition.field("Name").unwrap().length(), 60);

        let err = definition.replace_field(FieldDefinition::new("other", DataType::Int));
        assert!(err.is_err());

        let field = definition.add_field(FieldDefinition::new("AREA", DataType::Double));
        assert_eq!(field.index(), 4);
    }

    #[test]
    fn test_replaced_field_keeps_primary_geometry() {
        let mut definition = parcels();
        definition
            .replace_field(FieldDefinition::new("ID", DataType::Point))
            .unwrap();
        assert_eq!(definition.geometry_field_indexes(), &[2, 3, 0]);
        assert_eq!(definition.geometry_field().unwrap().name(), "GEOMETRY");

        definition
            .replace_field(FieldDefinition::new("GEOMETRY", DataType::String))
            .unwrap();
        assert_eq!(definition.geometry_field_indexes(), &[3, 0]);
        assert_eq!(definition.geometry_field().unwrap().name(), "CENTROID");
    }

    #[test]
    fn test_renamed_keeps_fields() {
        let definition = parcels().renamed("/LAND/LOT");
        assert_eq!(definition.name(), "LOT");
        assert_eq!(definition.field_count(), 4);
        assert_eq!(definition.geometry_field().unwrap().name(), "GEOMETRY");
    }

    #[test]
    fn test_id_fields() {
        let mut definition = parcels();
        definition.set_id_field_names(&["id"]).unwrap();
        assert_eq!(definition.id_field().unwrap().name(), "ID");
        assert!(definition.set_id_field_names(&["nope"]).is_err());
    }

    #[test]
    fn test_code_table_override_written_to_field() {
        let mut definition = RecordDefinition::with_fields(
            "/TEST/PERSON",
            [FieldDefinition::new("status", DataType::Int)],
        );
        let table: Arc<dyn CodeTable> = Arc::new(MemoryCodeTable::new("STATUS"));
        definition.add_field_code_table("STATUS", Arc::clone(&table));

        let resolved = definition.code_table_by_field_name("status").unwrap();
        assert!(Arc::ptr_eq(&resolved, &table));
        assert!(definition.field("status").unwrap().code_table().is_some());
    }

    #[test]
    fn test_replaced_field_keeps_code_table_override() {
        let mut definition = RecordDefinition::with_fields(
            "/TEST/PERSON",
            [FieldDefinition::new("status", DataType::Int)],
        );
        let table = MemoryCodeTable::new("STATUS");
        table.add_code(1, vec![Value::from("Active")]);
        definition.add_field_code_table("status", Arc::new(table));

        definition
            .replace_field(FieldDefinition::new("status", DataType::Int))
            .unwrap();
        assert!(definition.field("status").unwrap().code_table().is_some());
        definition.add_field(FieldDefinition::new("STATUS", DataType::Int));
        assert!(definition.field("status").unwrap().code_table().is_some());

        let condition = crate::sql::parse_where(Some(&definition), "status = 'Active'").unwrap();
        assert_eq!(condition.parameters(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_default_values() {
        let mut definition = RecordDefinition::with_fields(
            "/TEST/PERSON",
            [FieldDefinition::new("active", DataType::Boolean).with_default_value(true)],
        );
        assert_eq!(definition.default_value("ACTIVE"), Some(&Value::Boolean(true)));
        definition.set_default_value("active", "false").unwrap();
        assert_eq!(definition.default_value("active"), Some(&Value::Boolean(false)));
    }
}
