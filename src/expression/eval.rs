//! In-memory evaluation of query values against a record.
//!
//! Evaluation never fails: operands that cannot be combined produce
//! `Value::Null`, and conditions over them test false.

use std::cmp::Ordering;

use super::node::{QueryValue, QueryValueRef};
use super::operator::{ArithmeticOperator, ComparisonOperator, Function};
use crate::geometry::BoundingBox;
use crate::schema::Record;
use crate::types::{compare_values, like_matches, values_equal, DataType, Value};

/// Evaluates query values against one record
pub struct ExpressionEvaluator<'a> {
    record: &'a Record,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Value of a node; conditions evaluate to `Value::Boolean`.
    pub fn evaluate(&self, value: &QueryValue) -> Value {
        match value {
            QueryValue::Value(literal) => literal.value().clone(),
            QueryValue::Column(column) => self.record.value(column.name()).clone(),
            QueryValue::Collection(values) => {
                Value::List(values.iter().map(|v| self.evaluate(v)).collect())
            }
            QueryValue::Cast { value, data_type } => {
                let value = self.evaluate(value);
                match DataType::from_name(data_type) {
                    Some(data_type) => data_type.convert(&value).unwrap_or(Value::Null),
                    None => value,
                }
            }
            QueryValue::Arithmetic {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left);
                let right = self.evaluate(right);
                arithmetic(&left, *operator, &right)
            }
            QueryValue::Function {
                function,
                arguments,
            } => self.evaluate_function(*function, arguments),
            QueryValue::Parenthesis(inner) => self.evaluate(inner),
            condition => Value::Boolean(self.test(condition)),
        }
    }

    /// Truth of a condition. Non-boolean values test false.
    pub fn test(&self, condition: &QueryValue) -> bool {
        match condition {
            QueryValue::All => true,
            QueryValue::And(conditions) => conditions.iter().all(|c| self.test(c)),
            // An empty disjunction is true, like an empty conjunction.
            QueryValue::Or(conditions) => {
                conditions.is_empty() || conditions.iter().any(|c| self.test(c))
            }
            QueryValue::Not(condition) => !self.test(condition),
            QueryValue::Between { column, min, max } => {
                let value = self.evaluate(column);
                let min = self.evaluate(min);
                let max = self.evaluate(max);
                if value.is_null() || min.is_null() || max.is_null() {
                    return false;
                }
                matches!(compare_values(&min, &value), Some(Ordering::Less | Ordering::Equal))
                    && matches!(compare_values(&value, &max), Some(Ordering::Less | Ordering::Equal))
            }
            QueryValue::In { left, values } => {
                let value = self.evaluate(left);
                if value.is_null() {
                    return false;
                }
                match self.evaluate(values) {
                    Value::List(items) => items.iter().any(|item| values_equal(&value, item)),
                    single => values_equal(&value, &single),
                }
            }
            QueryValue::IsNull(value) => self.evaluate(value).is_null(),
            QueryValue::IsNotNull(value) => !self.evaluate(value).is_null(),
            QueryValue::Binary {
                left,
                operator,
                right,
            } => self.compare(left, *operator, right),
            QueryValue::Parenthesis(inner) => self.test(inner),
            scalar => matches!(self.evaluate(scalar), Value::Boolean(true)),
        }
    }

    fn compare(&self, left: &QueryValueRef, operator: ComparisonOperator, right: &QueryValueRef) -> bool {
        let left = self.evaluate(left);
        let right = self.evaluate(right);
        if operator == ComparisonOperator::Like {
            if left.is_null() || right.is_null() {
                return false;
            }
            return like_matches(&left.to_plain_string(), &right.to_plain_string(), false);
        }
        let Some(ordering) = compare_values(&left, &right) else {
            return false;
        };
        match operator {
            ComparisonOperator::Equal => ordering == Ordering::Equal,
            ComparisonOperator::NotEqual => ordering != Ordering::Equal,
            ComparisonOperator::LessThan => ordering == Ordering::Less,
            ComparisonOperator::LessThanEqual => ordering != Ordering::Greater,
            ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
            ComparisonOperator::GreaterThanEqual => ordering != Ordering::Less,
            ComparisonOperator::Like => false,
        }
    }

    fn evaluate_function(&self, function: Function, arguments: &[QueryValueRef]) -> Value {
        let values: Vec<Value> = arguments.iter().map(|a| self.evaluate(a)).collect();
        match (function, values.as_slice()) {
            (Function::Upper, [value]) if !value.is_null() => {
                Value::String(value.to_plain_string().to_uppercase())
            }
            (Function::Lower, [value]) if !value.is_null() => {
                Value::String(value.to_plain_string().to_lowercase())
            }
            (Function::EnvelopeIntersects, [a, b]) => {
                Value::Boolean(BoundingBox::from_value(a).intersects(&BoundingBox::from_value(b)))
            }
            (Function::WithinDistance, [a, b, distance]) => {
                let within = match (
                    BoundingBox::from_value(a).distance(&BoundingBox::from_value(b)),
                    distance.to_f64(),
                ) {
                    (Some(actual), Some(limit)) => actual <= limit,
                    _ => false,
                };
                Value::Boolean(within)
            }
            _ => Value::Null,
        }
    }
}

/// Exact decimal arithmetic, falling back to floating point when an
/// operand or the result is outside the decimal range.
fn arithmetic(left: &Value, operator: ArithmeticOperator, right: &Value) -> Value {
    if let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) {
        if let Some(result) = operator.apply(a, b) {
            return left.with_decimal(result);
        }
    }
    match (left.to_f64(), right.to_f64()) {
        (Some(a), Some(b)) => operator
            .apply_f64(a, b)
            .map_or(Value::Null, |result| left.with_f64(result)),
        _ => Value::Null,
    }
}

impl QueryValue {
    pub fn evaluate(&self, record: &Record) -> Value {
        ExpressionEvaluator::new(record).evaluate(self)
    }

    pub fn test(&self, record: &Record) -> bool {
        ExpressionEvaluator::new(record).test(self)
    }
}

/// Record filter built from a condition
pub type Predicate = Box<dyn Fn(&Record) -> bool + Send + Sync>;

pub fn expression_to_predicate(condition: QueryValueRef) -> Predicate {
    Box::new(move |record| condition.test(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::node::{Column, Literal};
    use crate::schema::{FieldDefinition, RecordDefinition};
    use geo::point;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn literal(value: impl Into<Value>) -> QueryValueRef {
        Arc::new(QueryValue::Value(Literal::new(value)))
    }

    fn column(name: &str) -> QueryValueRef {
        Arc::new(QueryValue::Column(Column::new(name)))
    }

    fn compare(name: &str, operator: ComparisonOperator, value: impl Into<Value>) -> QueryValueRef {
        Arc::new(QueryValue::Binary {
            left: column(name),
            operator,
            right: literal(value),
        })
    }

    fn record(name: Option<&str>, age: Option<i32>) -> Record {
        let definition = Arc::new(RecordDefinition::with_fields(
            "/TEST/PERSON",
            [
                FieldDefinition::new("name", DataType::String).with_length(10),
                FieldDefinition::new("age", DataType::Int),
                FieldDefinition::new("location", DataType::Point),
            ],
        ));
        Record::from_values(
            definition,
            vec![
                Value::from(name),
                Value::from(age),
                Value::from(geo::Geometry::from(point!(x: 10.0, y: 10.0))),
            ],
        )
    }

    #[test]
    fn test_comparisons() {
        let bob = record(Some("Bob"), Some(30));
        assert!(compare("age", ComparisonOperator::Equal, 30i64).test(&bob));
        assert!(compare("age", ComparisonOperator::NotEqual, 31).test(&bob));
        assert!(compare("age", ComparisonOperator::GreaterThanEqual, 30.0).test(&bob));
        assert!(!compare("age", ComparisonOperator::LessThan, 30).test(&bob));
        assert!(compare("name", ComparisonOperator::Like, "B%").test(&bob));

        let nobody = record(None, None);
        assert!(!compare("age", ComparisonOperator::NotEqual, 30).test(&nobody));
        assert!(!compare("name", ComparisonOperator::Like, "%").test(&nobody));
    }

    #[test]
    fn test_between_requires_all_values() {
        let bob = record(Some("Bob"), Some(30));
        let between = |min: Value, max: Value| QueryValue::Between {
            column: column("age"),
            min: literal(min),
            max: literal(max),
        };
        assert!(between(Value::Int(18), Value::Int(65)).test(&bob));
        assert!(between(Value::Int(30), Value::Int(30)).test(&bob));
        assert!(!between(Value::Int(31), Value::Int(65)).test(&bob));
        assert!(!between(Value::Null, Value::Int(65)).test(&bob));
        assert!(!between(Value::Int(18), Value::Null).test(&bob));
        assert!(!between(Value::Int(18), Value::Int(65)).test(&record(Some("Bob"), None)));
    }

    #[test]
    fn test_in_list() {
        let bob = record(Some("Bob"), Some(30));
        let in_list = |items: Vec<QueryValueRef>| QueryValue::In {
            left: column("age"),
            values: Arc::new(QueryValue::Collection(items)),
        };
        assert!(in_list(vec![literal(29), literal(30)]).test(&bob));
        assert!(!in_list(vec![literal(29)]).test(&bob));
        assert!(!in_list(Vec::new()).test(&bob));
    }

    #[test]
    fn test_empty_and_or_are_true() {
        let bob = record(Some("Bob"), Some(30));
        assert!(QueryValue::And(Vec::new()).test(&bob));
        assert!(QueryValue::Or(Vec::new()).test(&bob));
        assert!(QueryValue::All.test(&bob));
        let never = compare("age", ComparisonOperator::Equal, 1);
        assert!(!QueryValue::Or(vec![never.clone()]).test(&bob));
        assert!(!QueryValue::And(vec![never]).test(&bob));
    }

    #[test]
    fn test_null_checks_and_not() {
        let nobody = record(None, None);
        assert!(QueryValue::IsNull(column("name")).test(&nobody));
        assert!(!QueryValue::IsNotNull(column("name")).test(&nobody));
        assert!(QueryValue::Not(compare("age", ComparisonOperator::Equal, 1)).test(&nobody));
    }

    #[test]
    fn test_arithmetic() {
        let bob = record(Some("Bob"), Some(30));
        let arithmetic = |left: QueryValueRef, operator, right: QueryValueRef| QueryValue::Arithmetic {
            left,
            operator,
            right,
        };
        assert_eq!(
            arithmetic(column("age"), ArithmeticOperator::Add, literal(Decimal::new(15, 1))).evaluate(&bob),
            Value::Int(31)
        );
        assert_eq!(
            arithmetic(literal(1.5), ArithmeticOperator::Multiply, column("age")).evaluate(&bob),
            Value::Double(45.0)
        );
        assert_eq!(
            arithmetic(column("age"), ArithmeticOperator::Modulo, literal(7)).evaluate(&bob),
            Value::Int(2)
        );
        assert_eq!(
            arithmetic(column("age"), ArithmeticOperator::Divide, literal(0)).evaluate(&bob),
            Value::Null
        );
        assert_eq!(
            arithmetic(column("name"), ArithmeticOperator::Add, literal(1)).evaluate(&bob),
            Value::Null
        );
    }

    #[test]
    fn test_arithmetic_beyond_decimal_range() {
        let bob = record(Some("Bob"), Some(30));
        let arithmetic = |left: QueryValueRef, operator, right: QueryValueRef| QueryValue::Arithmetic {
            left,
            operator,
            right,
        };
        assert_eq!(
            arithmetic(literal(1e30), ArithmeticOperator::Add, literal(1.0)).evaluate(&bob),
            Value::Double(1e30)
        );
        assert_eq!(
            arithmetic(literal(i64::MAX), ArithmeticOperator::Multiply, literal(2)).evaluate(&bob),
            Value::Decimal(Decimal::from(i64::MAX) * Decimal::from(2))
        );
        assert!(matches!(
            arithmetic(literal(Decimal::MAX), ArithmeticOperator::Multiply, literal(2)).evaluate(&bob),
            Value::Double(v) if v > 1.5e29
        ));
        assert_eq!(
            arithmetic(literal(1e30), ArithmeticOperator::Divide, literal(0)).evaluate(&bob),
            Value::Null
        );
    }

    #[test]
    fn test_functions() {
        let bob = record(Some("Bob"), Some(30));
        let upper = QueryValue::Function {
            function: Function::Upper,
            arguments: vec![column("name")],
        };
        assert_eq!(upper.evaluate(&bob), Value::from("BOB"));

        let near = QueryValue::Function {
            function: Function::WithinDistance,
            arguments: vec![
                column("location"),
                literal(geo::Geometry::from(point!(x: 13.0, y: 14.0))),
                literal(5.0),
            ],
        };
        assert!(near.test(&bob));

        let intersects = QueryValue::Function {
            function: Function::EnvelopeIntersects,
            arguments: vec![column("location"), literal(BoundingBox::new(0.0, 0.0, 5.0, 5.0))],
        };
        assert!(!intersects.test(&bob));
    }

    #[test]
    fn test_cast_and_predicate() {
        let bob = record(Some("Bob"), Some(30));
        let cast = QueryValue::Cast {
            value: column("age"),
            data_type: "varchar(10)".to_string(),
        };
        assert_eq!(cast.evaluate(&bob), Value::from("30"));

        let predicate = expression_to_predicate(compare("name", ComparisonOperator::Equal, "Bob"));
        assert!(predicate(&bob));
        assert!(!predicate(&record(Some("Ann"), Some(30))));
    }
}
