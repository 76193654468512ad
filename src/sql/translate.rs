//! Translation of parsed WHERE clauses into query values.

use std::sync::Arc;

use log::debug;

use super::ast::{BinaryOperator, Expression, UnaryOperator};
use super::parser::Parser;
use crate::error::{ExpressionError, ExpressionResult};
use crate::expression::{ArithmeticOperator, ComparisonOperator, FilterBuilder, Literal, QueryValue, QueryValueRef};
use crate::schema::{FieldDefinition, RecordDefinition};
use crate::types::Value;

/// Table name used in the wrapping statement when no definition is bound
const UNKNOWN_TABLE: &str = "Unknown";

/// Parses `clause` as the WHERE clause of a select on `definition`.
///
/// Columns are resolved against the definition; a name it does not have is
/// a [`ExpressionError::SchemaResolution`]. Without a definition columns
/// stay unresolved and literals untyped. An empty clause is the always-true
/// condition.
pub fn parse_where(definition: Option<&RecordDefinition>, clause: &str) -> ExpressionResult<QueryValueRef> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Ok(FilterBuilder::all());
    }

    let table = definition.map_or(UNKNOWN_TABLE, |d| d.name());
    let sql = format!("SELECT * FROM \"{}\" WHERE {}", table.replace('"', "\"\""), clause);
    debug!("Parsing where clause for {}: {}", table, clause);

    let statement = Parser::new(&sql)
        .and_then(|mut parser| parser.parse())
        .map_err(|err| ExpressionError::Syntax {
            message: err.to_string(),
        })?;

    match statement.where_clause {
        Some(expression) => WhereTranslator { definition }.convert_expression(expression),
        None => Ok(FilterBuilder::all()),
    }
}

struct WhereTranslator<'a> {
    definition: Option<&'a RecordDefinition>,
}

impl WhereTranslator<'_> {
    fn convert_expression(&self, expr: Expression) -> ExpressionResult<QueryValueRef> {
        match expr {
            Expression::Literal(value) => Ok(FilterBuilder::value(value)),
            Expression::Null => Ok(FilterBuilder::value(Value::Null)),
            Expression::Column(name) => self.convert_column(&name),
            Expression::QualifiedColumn(table, column) => Err(ExpressionError::unsupported(format!(
                "qualified column {}.{}",
                table, column
            ))),
            Expression::BinaryOp { left, op, right } => self.convert_binary_op(*left, op, *right),
            Expression::UnaryOp { op, operand } => self.convert_unary_op(op, *operand),
            Expression::Function { name, args } => {
                let arguments = self.convert_list(args)?;
                FilterBuilder::function(&name, arguments)
            }
            Expression::Case { .. } => Err(ExpressionError::unsupported("CASE")),
            Expression::Cast {
                expression,
                data_type,
            } => Ok(FilterBuilder::cast(self.convert_expression(*expression)?, data_type)),
            Expression::InList {
                expression,
                list,
                negated,
            } => {
                let left = self.convert_expression(*expression)?;
                let field = column_field(&left);
                let mut values = Vec::with_capacity(list.len());
                for item in list {
                    let item = self.convert_expression(item)?;
                    values.push(coerce_operand(field.as_ref(), item, "IN")?);
                }
                Ok(negate(FilterBuilder::in_list(left, values), negated))
            }
            Expression::Between {
                expression,
                low,
                high,
                negated,
            } => {
                let column = self.convert_expression(*expression)?;
                if !matches!(column.as_ref(), QueryValue::Column(_)) {
                    return Err(ExpressionError::unsupported(format!("BETWEEN on {}", column)));
                }
                let field = column_field(&column);
                let min = coerce_operand(field.as_ref(), self.convert_expression(*low)?, "BETWEEN")?;
                let max = coerce_operand(field.as_ref(), self.convert_expression(*high)?, "BETWEEN")?;
                Ok(negate(FilterBuilder::between(column, min, max), negated))
            }
            Expression::Like {
                expression,
                pattern,
                escape,
                negated,
            } => {
                if escape.is_some() {
                    return Err(ExpressionError::unsupported("LIKE ... ESCAPE"));
                }
                let left = self.convert_expression(*expression)?;
                let pattern = self.convert_expression(*pattern)?;
                let like = FilterBuilder::compare(left, ComparisonOperator::Like, pattern);
                Ok(negate(like, negated))
            }
            Expression::IsNull {
                expression,
                negated,
            } => {
                let value = self.convert_expression(*expression)?;
                if negated {
                    Ok(FilterBuilder::is_not_null(value))
                } else {
                    Ok(FilterBuilder::is_null(value))
                }
            }
            Expression::Row(items) => match items.into_iter().next() {
                Some(first) => self.convert_expression(first),
                None => Err(ExpressionError::unsupported("empty row constructor")),
            },
            Expression::Exists { .. } => Err(ExpressionError::unsupported("EXISTS")),
            Expression::Subquery(_) => Err(ExpressionError::unsupported("subquery")),
        }
    }

    fn convert_list(&self, list: Vec<Expression>) -> ExpressionResult<Vec<QueryValueRef>> {
        list.into_iter().map(|expr| self.convert_expression(expr)).collect()
    }

    fn convert_column(&self, name: &str) -> ExpressionResult<QueryValueRef> {
        match self.definition {
            Some(definition) => definition
                .field(name)
                .map(FilterBuilder::field)
                .ok_or_else(|| ExpressionError::schema_resolution(name, definition.path())),
            None => Ok(FilterBuilder::column(name)),
        }
    }

    fn convert_binary_op(&self, left: Expression, op: BinaryOperator, right: Expression) -> ExpressionResult<QueryValueRef> {
        let left = self.convert_expression(left)?;
        let right = self.convert_expression(right)?;

        match op {
            BinaryOperator::And => Ok(join(left, right, true)),
            BinaryOperator::Or => Ok(join(left, right, false)),
            BinaryOperator::Concat => Err(ExpressionError::unsupported("||")),
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => {
                let operator = ArithmeticOperator::from_sql(op.as_str())
                    .ok_or_else(|| ExpressionError::unsupported(op.as_str()))?;
                Ok(FilterBuilder::arithmetic_op(left, operator, right))
            }
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => {
                let operator = ComparisonOperator::from_sql(op.as_str())
                    .ok_or_else(|| ExpressionError::unsupported(op.as_str()))?;
                if is_true_marker(&left, operator, &right) {
                    return Ok(FilterBuilder::all());
                }
                let right = match left.as_ref() {
                    QueryValue::Column(column) => {
                        if is_null_literal(&right) {
                            return Err(ExpressionError::coercion(
                                column.name(),
                                &Value::Null,
                                format!(
                                    "values can't be null for {} use IS NULL or IS NOT NULL instead",
                                    operator.as_str()
                                ),
                            ));
                        }
                        coerce_operand(column.field(), right, operator.as_str())?
                    }
                    _ => right,
                };
                Ok(FilterBuilder::compare(left, operator, right))
            }
        }
    }

    fn convert_unary_op(&self, op: UnaryOperator, operand: Expression) -> ExpressionResult<QueryValueRef> {
        let operand = self.convert_expression(operand)?;
        match op {
            UnaryOperator::Not => Ok(FilterBuilder::not(operand)),
            UnaryOperator::Plus => Ok(operand),
            UnaryOperator::Minus => match operand.as_ref() {
                QueryValue::Value(literal) if literal.field().is_none() => negate_value(literal.value())
                    .map(FilterBuilder::value)
                    .ok_or_else(|| ExpressionError::unsupported(format!("-{}", operand))),
                _ => Err(ExpressionError::unsupported(format!("-({})", operand))),
            },
        }
    }
}

/// Joins two conditions the way they print: a run of the same operator
/// flattens into one list and the always-true marker is kept as a child.
fn join(mut left: QueryValueRef, right: QueryValueRef, conjunction: bool) -> QueryValueRef {
    let same_kind = match left.as_ref() {
        QueryValue::And(conditions) => conjunction && !conditions.is_empty(),
        QueryValue::Or(conditions) => !conjunction && !conditions.is_empty(),
        _ => false,
    };
    if same_kind {
        Arc::make_mut(&mut left).add_condition(right);
        left
    } else if conjunction {
        Arc::new(QueryValue::And(vec![left, right]))
    } else {
        Arc::new(QueryValue::Or(vec![left, right]))
    }
}

/// `1 = 1` is the text form of the always-true marker.
fn is_true_marker(left: &QueryValueRef, operator: ComparisonOperator, right: &QueryValueRef) -> bool {
    let is_one = |value: &QueryValueRef| {
        matches!(value.as_ref(), QueryValue::Value(literal)
            if literal.field().is_none() && *literal.value() == Value::Int(1))
    };
    operator == ComparisonOperator::Equal && is_one(left) && is_one(right)
}

fn column_field(value: &QueryValueRef) -> Option<Arc<FieldDefinition>> {
    match value.as_ref() {
        QueryValue::Column(column) => column.field().cloned(),
        _ => None,
    }
}

fn is_null_literal(value: &QueryValueRef) -> bool {
    matches!(value.as_ref(), QueryValue::Value(literal) if literal.value().is_null())
}

fn negate(condition: QueryValueRef, negated: bool) -> QueryValueRef {
    if negated {
        FilterBuilder::not(condition)
    } else {
        condition
    }
}

/// Coerces a literal operand through `field`, resolving code-table display
/// values (`a:b` names a multi-part code) to their identifier.
fn coerce_operand(
    field: Option<&Arc<FieldDefinition>>,
    operand: QueryValueRef,
    operator: &str,
) -> ExpressionResult<QueryValueRef> {
    let (Some(field), QueryValue::Value(literal)) = (field, operand.as_ref()) else {
        return Ok(operand);
    };
    let raw = literal.value().clone();
    if raw.is_null() {
        return Err(ExpressionError::coercion(
            field.name(),
            &raw,
            format!("values can't be null for {} use IS NULL or IS NOT NULL instead", operator),
        ));
    }

    let value = match (field.code_table(), &raw) {
        (Some(_), Value::String(text)) if text.contains(':') => {
            Value::List(text.split(':').map(Value::from).collect())
        }
        _ => raw.clone(),
    };
    let literal = Literal::for_field_strict(field, value)?;
    if literal.value().is_null() {
        let reason = format!("cannot be converted to {}", field.type_description());
        return Err(ExpressionError::coercion(field.name(), &raw, reason));
    }
    Ok(Arc::new(QueryValue::Value(literal)))
}

fn negate_value(value: &Value) -> Option<Value> {
    match value {
        Value::Short(v) => v.checked_neg().map(Value::Short),
        Value::Int(v) => v.checked_neg().map(Value::Int),
        Value::Long(v) => v.checked_neg().map(Value::Long),
        Value::Float(v) => Some(Value::Float(-v)),
        Value::Double(v) => Some(Value::Double(-v)),
        Value::Decimal(v) => Some(Value::Decimal(-*v)),
        _ => None,
    }
}
