use std::sync::Arc;

use super::RecordDefinition;
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Value;

static NULL: Value = Value::Null;

/// Values for one record, in field-index order.
#[derive(Debug, Clone)]
pub struct Record {
    definition: Arc<RecordDefinition>,
    values: Vec<Value>,
}

impl Record {
    /// Record with each field set to its default value (or null).
    pub fn new(definition: Arc<RecordDefinition>) -> Self {
        let values = definition
            .fields()
            .iter()
            .map(|field| {
                definition
                    .default_value(field.name())
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect();
        Self { definition, values }
    }

    /// Values are coerced leniently through each field.
    pub fn from_values(definition: Arc<RecordDefinition>, values: Vec<Value>) -> Self {
        let mut record = Self::new(definition);
        for (index, value) in values.into_iter().enumerate() {
            record.set_value_at(index, value);
        }
        record
    }

    pub fn definition(&self) -> &Arc<RecordDefinition> {
        &self.definition
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named field; null for unknown names.
    pub fn value(&self, name: &str) -> &Value {
        match self.definition.field_index(name) {
            Some(index) => self.value_at(index),
            None => &NULL,
        }
    }

    pub fn value_at(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL)
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> ExpressionResult<()> {
        let index = self
            .definition
            .field_index(name)
            .ok_or_else(|| ExpressionError::schema_resolution(name, self.definition.path()))?;
        self.set_value_at(index, value.into());
        Ok(())
    }

    fn set_value_at(&mut self, index: usize, value: Value) {
        if let Some(field) = self.definition.field_at(index) {
            self.values[index] = field.to_field_value(&value);
        }
    }

    /// Checks every value against its field.
    pub fn validate(&self) -> ExpressionResult<()> {
        for (field, value) in self.definition.fields().iter().zip(&self.values) {
            field.validate(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDefinition;
    use crate::types::DataType;

    fn person() -> Arc<RecordDefinition> {
        Arc::new(RecordDefinition::with_fields(
            "/TEST/PERSON",
            [
                FieldDefinition::new("name", DataType::String).with_length(10),
                FieldDefinition::new("age", DataType::Int),
                FieldDefinition::new("active", DataType::Boolean).with_default_value(true),
            ],
        ))
    }

    #[test]
    fn test_new_record_applies_defaults() {
        let record = person().new_record();
        assert_eq!(record.value("active"), &Value::Boolean(true));
        assert_eq!(record.value("name"), &Value::Null);
        assert_eq!(record.value("unknown"), &Value::Null);
    }

    #[test]
    fn test_set_value_coerces() {
        let mut record = person().new_record();
        record.set_value("AGE", "42").unwrap();
        assert_eq!(record.value("age"), &Value::Int(42));
        assert!(record.set_value("height", 1).is_err());
    }

    #[test]
    fn test_validate() {
        let definition = person();
        let record = Record::from_values(definition.clone(), vec![Value::from("Bob"), Value::Int(30)]);
        assert!(record.validate().is_ok());

        let record = Record::from_values(definition, vec![Value::from("Bartholomew!")]);
        assert!(record.validate().is_err());
    }
}
