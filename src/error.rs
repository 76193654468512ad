//! Error types for schema resolution, literal coercion and SQL translation.

use thiserror::Error;

use crate::types::Value;

/// Errors raised while building, translating or validating query trees.
///
/// Evaluation never produces one of these; it yields `Value::Null` or
/// `false` for operands it cannot combine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Column '{name}' does not exist in {schema}")]
    SchemaResolution { name: String, schema: String },

    #[error("Invalid value {value} for {field}: {reason}")]
    Coercion {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },

    #[error("Syntax error: {message}")]
    Syntax { message: String },
}

impl ExpressionError {
    pub fn schema_resolution(name: impl Into<String>, schema: impl Into<String>) -> Self {
        ExpressionError::SchemaResolution {
            name: name.into(),
            schema: schema.into(),
        }
    }

    pub fn coercion(field: impl Into<String>, value: &Value, reason: impl Into<String>) -> Self {
        ExpressionError::Coercion {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(construct: impl Into<String>) -> Self {
        ExpressionError::UnsupportedConstruct {
            construct: construct.into(),
        }
    }

    /// Re-labels a coercion error with the field it was raised for.
    pub fn for_field(self, name: &str) -> Self {
        match self {
            ExpressionError::Coercion { value, reason, .. } => ExpressionError::Coercion {
                field: name.to_string(),
                value,
                reason,
            },
            other => other,
        }
    }
}

/// Result type for expression construction and translation.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ExpressionError::schema_resolution("agee", "/TEST/PERSON");
        assert_eq!(err.to_string(), "Column 'agee' does not exist in /TEST/PERSON");

        let err = ExpressionError::unsupported("CASE");
        assert_eq!(err.to_string(), "Unsupported construct: CASE");
    }

    #[test]
    fn test_for_field_relabels_coercion_only() {
        let err = ExpressionError::coercion("int", &Value::from("abc"), "not a number").for_field("age");
        assert!(matches!(err, ExpressionError::Coercion { ref field, .. } if field == "age"));

        let err = ExpressionError::unsupported("CASE").for_field("age");
        assert_eq!(err, ExpressionError::unsupported("CASE"));
    }
}
