//! Builder functions for query values and conditions.

use std::sync::Arc;

use super::node::{self, Column, Literal, QueryValue, QueryValueRef};
use super::operator::{ArithmeticOperator, ComparisonOperator, Function};
use crate::error::{ExpressionError, ExpressionResult};
use crate::schema::{FieldDefinition, RecordDefinition};
use crate::types::Value;

/// Type name used when a value is cast to text for case-insensitive matching
const TEXT_CAST: &str = "varchar(4000)";

/// Builder for query values and conditions
pub struct FilterBuilder;

impl FilterBuilder {
    /// Create a column reference
    pub fn column(name: impl Into<String>) -> QueryValueRef {
        Arc::new(QueryValue::Column(Column::new(name)))
    }

    /// Create a column reference resolved to a field
    pub fn field(field: &Arc<FieldDefinition>) -> QueryValueRef {
        Arc::new(QueryValue::Column(Column::from_field(field)))
    }

    /// Create a literal
    pub fn value(value: impl Into<Value>) -> QueryValueRef {
        Arc::new(QueryValue::Value(Literal::new(value)))
    }

    /// Create a literal coerced through a field
    pub fn field_value(field: &Arc<FieldDefinition>, value: impl Into<Value>) -> QueryValueRef {
        Arc::new(QueryValue::Value(Literal::for_field(field, value)))
    }

    /// Create a list of values for IN
    pub fn collection(values: Vec<QueryValueRef>) -> QueryValueRef {
        Arc::new(QueryValue::Collection(values))
    }

    pub fn compare(left: QueryValueRef, operator: ComparisonOperator, right: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Binary {
            left,
            operator,
            right,
        })
    }

    /// Create a comparison from operator text such as `"<>"`
    pub fn binary(left: QueryValueRef, operator: &str, right: QueryValueRef) -> ExpressionResult<QueryValueRef> {
        let operator = ComparisonOperator::from_sql(operator)
            .ok_or_else(|| ExpressionError::unsupported(format!("operator {}", operator)))?;
        Ok(Self::compare(left, operator, right))
    }

    pub fn equal(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::Equal, right)
    }

    pub fn not_equal(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::NotEqual, right)
    }

    pub fn less_than(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::LessThan, right)
    }

    pub fn less_than_equal(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::LessThanEqual, right)
    }

    pub fn greater_than(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::GreaterThan, right)
    }

    pub fn greater_than_equal(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::GreaterThanEqual, right)
    }

    /// Create an equality comparison (column = value)
    pub fn column_equals(name: impl Into<String>, value: impl Into<Value>) -> QueryValueRef {
        Self::equal(Self::column(name), Self::value(value))
    }

    /// Create an equality comparison against a field, coercing the value
    pub fn field_equals(field: &Arc<FieldDefinition>, value: impl Into<Value>) -> QueryValueRef {
        Self::equal(Self::field(field), Self::field_value(field, value))
    }

    pub fn column_is_null(name: impl Into<String>) -> QueryValueRef {
        Self::is_null(Self::column(name))
    }

    pub fn like(left: QueryValueRef, pattern: impl Into<Value>) -> QueryValueRef {
        Self::compare(left, ComparisonOperator::Like, Self::value(pattern))
    }

    /// Case-insensitive LIKE: `UPPER(CAST(left AS varchar(4000))) LIKE UPPER(pattern)`
    pub fn ilike(left: QueryValueRef, pattern: impl Into<Value>) -> QueryValueRef {
        let text = Self::cast(left, TEXT_CAST);
        Self::compare(Self::upper(text), ComparisonOperator::Like, Self::upper(Self::value(pattern)))
    }

    /// Create a LIKE matching values that start with `prefix`
    pub fn starts_with(left: QueryValueRef, prefix: &str) -> QueryValueRef {
        Self::like(left, format!("{}%", prefix))
    }

    /// Create a LIKE matching values that contain `text`
    pub fn contains(left: QueryValueRef, text: &str) -> QueryValueRef {
        Self::like(left, format!("%{}%", text))
    }

    pub fn between(column: QueryValueRef, min: QueryValueRef, max: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Between { column, min, max })
    }

    pub fn in_list(left: QueryValueRef, values: Vec<QueryValueRef>) -> QueryValueRef {
        Arc::new(QueryValue::In {
            left,
            values: Self::collection(values),
        })
    }

    /// Create an IN over literal values
    pub fn in_values(left: QueryValueRef, values: impl IntoIterator<Item = Value>) -> QueryValueRef {
        let values = values.into_iter().map(Self::value).collect();
        Self::in_list(left, values)
    }

    pub fn is_null(value: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::IsNull(value))
    }

    pub fn is_not_null(value: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::IsNotNull(value))
    }

    pub fn not(condition: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Not(condition))
    }

    /// Conjunction of every condition, dropping empty ones
    pub fn and(conditions: impl IntoIterator<Item = QueryValueRef>) -> QueryValueRef {
        let conditions = conditions
            .into_iter()
            .filter(|c| !c.is_empty_condition())
            .collect();
        Arc::new(QueryValue::And(conditions))
    }

    /// Disjunction of every condition, dropping empty ones
    pub fn or(conditions: impl IntoIterator<Item = QueryValueRef>) -> QueryValueRef {
        let conditions = conditions
            .into_iter()
            .filter(|c| !c.is_empty_condition())
            .collect();
        Arc::new(QueryValue::Or(conditions))
    }

    /// Always-true condition
    pub fn all() -> QueryValueRef {
        Arc::new(QueryValue::All)
    }

    pub fn parenthesis(value: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Parenthesis(value))
    }

    pub fn arithmetic_op(left: QueryValueRef, operator: ArithmeticOperator, right: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Arithmetic {
            left,
            operator,
            right,
        })
    }

    /// Create an arithmetic value from operator text such as `"+"`
    pub fn arithmetic(left: QueryValueRef, operator: &str, right: QueryValueRef) -> ExpressionResult<QueryValueRef> {
        let operator = ArithmeticOperator::from_sql(operator)
            .ok_or_else(|| ExpressionError::unsupported(format!("operator {}", operator)))?;
        Ok(Self::arithmetic_op(left, operator, right))
    }

    pub fn add(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::arithmetic_op(left, ArithmeticOperator::Add, right)
    }

    pub fn subtract(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::arithmetic_op(left, ArithmeticOperator::Subtract, right)
    }

    pub fn multiply(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::arithmetic_op(left, ArithmeticOperator::Multiply, right)
    }

    pub fn divide(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::arithmetic_op(left, ArithmeticOperator::Divide, right)
    }

    pub fn modulo(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        Self::arithmetic_op(left, ArithmeticOperator::Modulo, right)
    }

    pub fn cast(value: QueryValueRef, data_type: impl Into<String>) -> QueryValueRef {
        Arc::new(QueryValue::Cast {
            value,
            data_type: data_type.into(),
        })
    }

    /// Create a function call, checking the name and argument count
    pub fn function(name: &str, arguments: Vec<QueryValueRef>) -> ExpressionResult<QueryValueRef> {
        let function = Function::from_name(name)
            .ok_or_else(|| ExpressionError::unsupported(format!("function {}", name)))?;
        if arguments.len() != function.arity() {
            return Err(ExpressionError::unsupported(format!(
                "{} with {} arguments",
                function.name(),
                arguments.len()
            )));
        }
        Ok(Arc::new(QueryValue::Function {
            function,
            arguments,
        }))
    }

    pub fn upper(value: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Function {
            function: Function::Upper,
            arguments: vec![value],
        })
    }

    pub fn lower(value: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Function {
            function: Function::Lower,
            arguments: vec![value],
        })
    }

    pub fn envelope_intersects(first: QueryValueRef, second: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Function {
            function: Function::EnvelopeIntersects,
            arguments: vec![first, second],
        })
    }

    pub fn within_distance(first: QueryValueRef, second: QueryValueRef, distance: QueryValueRef) -> QueryValueRef {
        Arc::new(QueryValue::Function {
            function: Function::WithinDistance,
            arguments: vec![first, second, distance],
        })
    }

    /// Condition for one name/value pair.
    ///
    /// Known fields get a resolved column and a coerced literal (code-table
    /// identifiers substituted); unknown names fall back to untyped
    /// comparison. Null tests IS NULL and a list tests IN.
    pub fn name_value(definition: Option<&RecordDefinition>, name: &str, value: Value) -> QueryValueRef {
        let field = definition.and_then(|d| d.field(name));
        let column = match field {
            Some(field) => Self::field(field),
            None => Self::column(name),
        };
        let literal = |value: Value| match field {
            Some(field) => Self::field_value(field, value),
            None => Self::value(value),
        };
        match value {
            Value::Null => Self::is_null(column),
            Value::List(values) => Self::in_list(column, values.into_iter().map(literal).collect()),
            value => Self::equal(column, literal(value)),
        }
    }

    /// Conjunction of [`name_value`](Self::name_value) conditions
    pub fn and_map<S: AsRef<str>>(
        definition: Option<&RecordDefinition>,
        filter: impl IntoIterator<Item = (S, Value)>,
    ) -> QueryValueRef {
        Self::and(
            filter
                .into_iter()
                .map(|(name, value)| Self::name_value(definition, name.as_ref(), value)),
        )
    }

    /// Disjunction of [`name_value`](Self::name_value) conditions
    pub fn or_map<S: AsRef<str>>(
        definition: Option<&RecordDefinition>,
        filter: impl IntoIterator<Item = (S, Value)>,
    ) -> QueryValueRef {
        Self::or(
            filter
                .into_iter()
                .map(|(name, value)| Self::name_value(definition, name.as_ref(), value)),
        )
    }

    /// Replaces the literal at `index` (0-based, in placeholder order),
    /// returning the rewritten tree. The original tree is untouched.
    pub fn set_value(index: usize, condition: &QueryValueRef, value: impl Into<Value>) -> QueryValueRef {
        let value = value.into();
        let mut position = 0;
        replace_literal(condition, index, &value, &mut position)
    }

    /// `left AND right`, flattening into an existing conjunction
    pub fn and_also(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        node::and(left, right)
    }

    /// `left OR right`, flattening into an existing disjunction
    pub fn or_else(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
        node::or(left, right)
    }
}

fn replace_literal(node: &QueryValueRef, index: usize, value: &Value, position: &mut usize) -> QueryValueRef {
    match node.as_ref() {
        QueryValue::Value(literal) => {
            let current = *position;
            *position += 1;
            if current != index {
                return Arc::clone(node);
            }
            let literal = match literal.field() {
                Some(field) => Literal::for_field(field, value.clone()),
                None => Literal::new(value.clone()),
            };
            Arc::new(QueryValue::Value(literal))
        }
        _ => node.update_query_values(|child| replace_literal(child, index, value, position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemoryCodeTable;
    use crate::types::DataType;

    fn person() -> RecordDefinition {
        let table = MemoryCodeTable::new("STATUS");
        table.add_code(1, vec![Value::from("Active")]);
        RecordDefinition::with_fields(
            "/TEST/PERSON",
            [
                FieldDefinition::new("name", DataType::String).with_length(10),
                FieldDefinition::new("age", DataType::Int),
                FieldDefinition::new("status", DataType::Int).with_code_table(Arc::new(table)),
            ],
        )
    }

    #[test]
    fn test_binary_from_text() {
        let condition =
            FilterBuilder::binary(FilterBuilder::column("age"), "!=", FilterBuilder::value(3)).unwrap();
        assert_eq!(condition.to_sql(), "age <> ?");
        let err = FilterBuilder::binary(FilterBuilder::column("age"), "~", FilterBuilder::value(3));
        assert!(matches!(err, Err(ExpressionError::UnsupportedConstruct { .. })));
    }

    #[test]
    fn test_ilike() {
        let condition = FilterBuilder::ilike(FilterBuilder::column("name"), "bo%");
        assert_eq!(condition.to_sql(), "UPPER(CAST(name AS varchar(4000))) LIKE UPPER(?)");
    }

    #[test]
    fn test_function_arity() {
        let args = vec![FilterBuilder::column("a")];
        assert!(FilterBuilder::function("upper", args.clone()).is_ok());
        assert!(FilterBuilder::function("within_distance", args.clone()).is_err());
        assert!(FilterBuilder::function("soundex", args).is_err());
    }

    #[test]
    fn test_and_or_drop_empty_conditions() {
        let condition = FilterBuilder::and([FilterBuilder::all(), FilterBuilder::column_equals("age", 3)]);
        assert_eq!(condition.to_sql(), "age = ?");
        assert_eq!(FilterBuilder::or(Vec::new()).to_sql(), "1 = 1");
    }

    #[test]
    fn test_name_value_known_and_unknown_fields() {
        let definition = person();
        let condition = FilterBuilder::and_map(
            Some(&definition),
            [
                ("status", Value::from("active")),
                ("age", Value::List(vec![Value::from("30"), Value::Int(31)])),
                ("nickname", Value::from("Bo")),
                ("name", Value::Null),
            ],
        );
        assert_eq!(
            condition.to_sql(),
            "status = ? AND age IN (?, ?) AND nickname = ? AND name IS NULL"
        );
        assert_eq!(
            condition.parameters(),
            vec![Value::Int(1), Value::Int(30), Value::Int(31), Value::from("Bo")]
        );
    }

    #[test]
    fn test_set_value_replaces_one_literal() {
        let condition = FilterBuilder::and([
            FilterBuilder::column_equals("age", 30),
            FilterBuilder::column_equals("name", "Bob"),
        ]);
        let updated = FilterBuilder::set_value(1, &condition, "Ann");
        assert_eq!(updated.parameters(), vec![Value::Int(30), Value::from("Ann")]);
        assert_eq!(condition.parameters(), vec![Value::Int(30), Value::from("Bob")]);
        assert!(Arc::ptr_eq(updated.query_values()[0], condition.query_values()[0]));

        let unchanged = FilterBuilder::set_value(5, &condition, "Ann");
        assert!(Arc::ptr_eq(&unchanged, &condition));
    }
}
