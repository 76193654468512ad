use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::CodeTable;
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::{compare_values, values_equal, DataType, Value};

/// Column metadata: declared type, bounds and optional code-table indirection.
///
/// Built with the `with_*` methods, then handed to
/// [`RecordDefinition::add_field`](super::RecordDefinition::add_field),
/// which assigns the index.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    name: String,
    title: String,
    description: Option<String>,
    index: usize,
    data_type: DataType,
    length: u32,
    scale: u32,
    required: bool,
    min_value: Option<Value>,
    max_value: Option<Value>,
    default_value: Option<Value>,
    allowed_values: Vec<(Value, String)>,
    code_table: Option<Arc<dyn CodeTable>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            title: title_from_name(&name),
            name,
            description: None,
            index: 0,
            data_type,
            length: 0,
            scale: 0,
            required: false,
            min_value: None,
            max_value: None,
            default_value: None,
            allowed_values: Vec::new(),
            code_table: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_min_value(mut self, value: impl Into<Value>) -> Self {
        self.min_value = Some(self.data_type.convert_lenient(&value.into()));
        self
    }

    pub fn with_max_value(mut self, value: impl Into<Value>) -> Self {
        self.max_value = Some(self.data_type.convert_lenient(&value.into()));
        self
    }

    pub fn with_default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(self.data_type.convert_lenient(&value.into()));
        self
    }

    /// Allowed value whose display text is its own plain string form.
    pub fn with_allowed_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let text = value.to_plain_string();
        self.with_allowed_value_text(value, text)
    }

    pub fn with_allowed_value_text(mut self, value: impl Into<Value>, text: impl Into<String>) -> Self {
        let value = self.data_type.convert_lenient(&value.into());
        self.allowed_values.push((value, text.into()));
        self
    }

    pub fn with_code_table(mut self, code_table: Arc<dyn CodeTable>) -> Self {
        self.code_table = Some(code_table);
        self
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_code_table(&mut self, code_table: Arc<dyn CodeTable>) {
        self.code_table = Some(code_table);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn min_value(&self) -> Option<&Value> {
        self.min_value.as_ref()
    }

    pub fn max_value(&self) -> Option<&Value> {
        self.max_value.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn allowed_values(&self) -> &[(Value, String)] {
        &self.allowed_values
    }

    pub fn code_table(&self) -> Option<&Arc<dyn CodeTable>> {
        self.code_table.as_ref()
    }

    /// `string(10)`, `decimal(10,2)`, or the bare type name.
    pub fn type_description(&self) -> String {
        match (self.length, self.scale) {
            (0, _) => self.data_type.name().to_string(),
            (length, 0) => format!("{}({})", self.data_type, length),
            (length, scale) => format!("{}({},{})", self.data_type, length, scale),
        }
    }

    /// Widest text form a value of this field can take.
    pub fn max_string_length(&self) -> Option<u32> {
        if self.length == 0 {
            return None;
        }
        if self.data_type.is_numeric() {
            let point = u32::from(self.scale > 0);
            Some(self.length + point + 1)
        } else {
            Some(self.length)
        }
    }

    /// Coerces a value into this field's type, substituting the code-table
    /// identifier when one matches.
    pub fn to_field_value_strict(&self, value: &Value) -> ExpressionResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let value = match &self.code_table {
            Some(code_table) => code_table
                .identifier_for(value)
                .unwrap_or_else(|| value.clone()),
            None => value.clone(),
        };
        self.data_type
            .convert(&value)
            .map_err(|err| err.for_field(&self.name))
    }

    /// As [`to_field_value_strict`](Self::to_field_value_strict), falling
    /// back to the unconverted value.
    pub fn to_field_value(&self, value: &Value) -> Value {
        match self.to_field_value_strict(value) {
            Ok(converted) => converted,
            Err(err) => {
                log::warn!("{}; keeping the original value", err);
                value.clone()
            }
        }
    }

    /// Coerces and checks a value against every constraint on this field.
    pub fn validate(&self, value: &Value) -> ExpressionResult<Value> {
        let value = self.to_field_value_strict(value)?;
        if value.is_null() {
            if self.required {
                return Err(self.invalid(&value, "is required"));
            }
            return Ok(value);
        }

        if let Some(code_table) = &self.code_table {
            if code_table.identifier_for(&value).is_none() {
                let reason = format!(
                    "Unable to find code for '{}' in {}",
                    value.to_plain_string(),
                    code_table.name()
                );
                return Err(self.invalid(&value, reason));
            }
            return Ok(value);
        }

        if self.data_type.is_numeric() {
            self.validate_number(&value)?;
        } else if let Value::String(text) = &value {
            let length = text.chars().count();
            if self.length > 0 && length > self.length as usize {
                let reason = format!("length {} > {}", length, self.length);
                return Err(self.invalid(&value, reason));
            }
        }

        if !self.allowed_values.is_empty()
            && !self
                .allowed_values
                .iter()
                .any(|(allowed, _)| values_equal(allowed, &value))
        {
            return Err(self.invalid(&value, "not in the list of allowed values"));
        }
        Ok(value)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    fn validate_number(&self, value: &Value) -> ExpressionResult<()> {
        let decimal = match value {
            Value::Float(_) | Value::Double(_) => Decimal::from_str(&value.to_plain_string()).ok(),
            other => other.to_decimal(),
        };
        if let Some(decimal) = decimal {
            if self.length > 0 {
                let precision = decimal.mantissa().unsigned_abs().to_string().len();
                if precision > self.length as usize {
                    let reason = format!("precision {} > {}", precision, self.length);
                    return Err(self.invalid(value, reason));
                }
                if decimal.scale() > self.scale {
                    let reason = format!("scale {} > {}", decimal.scale(), self.scale);
                    return Err(self.invalid(value, reason));
                }
            }
        }
        if let Some(min) = &self.min_value {
            if compare_values(value, min).is_some_and(|o| o.is_lt()) {
                return Err(self.invalid(value, format!("< minimum {}", min)));
            }
        }
        if let Some(max) = &self.max_value {
            if compare_values(value, max).is_some_and(|o| o.is_gt()) {
                return Err(self.invalid(value, format!("> maximum {}", max)));
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &Value, reason: impl Into<String>) -> ExpressionError {
        ExpressionError::coercion(self.name.as_str(), value, reason)
    }
}

fn title_from_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
