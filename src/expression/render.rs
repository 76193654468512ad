//! Text output for query values.
//!
//! `render_to` writes parameterized SQL with a `?` per literal, and
//! `bind_parameters` walks the tree in the same order to supply the values.
//! `Display` writes the same text with literals inlined.

use std::borrow::Cow;
use std::fmt::{self, Write};

use super::node::{QueryValue, QueryValueRef};
use crate::sql::Token;
use crate::types::Value;

/// Receiver of bound parameter values; positions start at 1.
pub trait ParameterSink {
    fn bind(&mut self, position: usize, value: Value);
}

impl ParameterSink for Vec<Value> {
    fn bind(&mut self, _position: usize, value: Value) {
        self.push(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralStyle {
    Placeholder,
    Inline,
}

const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const COMPARISON: u8 = 4;
const OPERAND: u8 = 5;
const PRIMARY: u8 = 7;

impl QueryValue {
    /// Appends parameterized SQL for this node.
    pub fn render_to(&self, sql: &mut String) {
        // Writing to a String cannot fail.
        let _ = self.write_sql(sql, LiteralStyle::Placeholder);
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        self.render_to(&mut sql);
        sql
    }

    /// Binds every literal starting at `position`, in the order
    /// [`render_to`](Self::render_to) emits placeholders. Returns the next
    /// free position.
    pub fn bind_parameters(&self, position: usize, sink: &mut dyn ParameterSink) -> usize {
        match self {
            QueryValue::Value(literal) => {
                let value = literal.bound_value();
                log::trace!("Binding parameter {} = {}", position, value);
                sink.bind(position, value);
                position + 1
            }
            _ => {
                let mut position = position;
                for child in self.query_values() {
                    position = child.bind_parameters(position, sink);
                }
                position
            }
        }
    }

    /// Bound values in placeholder order.
    pub fn parameters(&self) -> Vec<Value> {
        let mut values = Vec::new();
        self.bind_parameters(1, &mut values);
        values
    }

    /// Number of placeholders [`render_to`](Self::render_to) emits.
    pub fn parameter_count(&self) -> usize {
        match self {
            QueryValue::Value(_) => 1,
            _ => self
                .query_values()
                .into_iter()
                .map(|child| child.parameter_count())
                .sum(),
        }
    }

    /// Binding strength used to decide where parentheses are needed.
    pub fn precedence(&self) -> u8 {
        match self {
            QueryValue::Or(conditions) if !conditions.is_empty() => OR,
            QueryValue::And(conditions) if !conditions.is_empty() => AND,
            QueryValue::Not(_) => NOT,
            QueryValue::All
            | QueryValue::And(_)
            | QueryValue::Or(_)
            | QueryValue::Between { .. }
            | QueryValue::In { .. }
            | QueryValue::IsNull(_)
            | QueryValue::IsNotNull(_)
            | QueryValue::Binary { .. } => COMPARISON,
            QueryValue::Arithmetic { operator, .. } => operator.precedence(),
            QueryValue::Value(_)
            | QueryValue::Column(_)
            | QueryValue::Collection(_)
            | QueryValue::Cast { .. }
            | QueryValue::Function { .. }
            | QueryValue::Parenthesis(_) => PRIMARY,
        }
    }

    fn write_sql<W: Write>(&self, out: &mut W, style: LiteralStyle) -> fmt::Result {
        match self {
            QueryValue::Value(literal) => match style {
                LiteralStyle::Placeholder => out.write_char('?'),
                LiteralStyle::Inline => write!(out, "{}", literal.display_value()),
            },
            QueryValue::Column(column) => out.write_str(&quote_name(column.name())),
            QueryValue::Collection(values) => {
                out.write_char('(')?;
                write_list(out, values, ", ", 0, style)?;
                out.write_char(')')
            }
            QueryValue::Cast { value, data_type } => {
                out.write_str("CAST(")?;
                value.write_sql(out, style)?;
                write!(out, " AS {})", data_type)
            }
            QueryValue::Arithmetic {
                left,
                operator,
                right,
            } => {
                let precedence = operator.precedence();
                write_child(out, left, precedence, style)?;
                write!(out, " {} ", operator.as_str())?;
                write_child(out, right, precedence + 1, style)
            }
            QueryValue::Function {
                function,
                arguments,
            } => {
                write!(out, "{}(", function.name())?;
                write_list(out, arguments, ", ", 0, style)?;
                out.write_char(')')
            }
            QueryValue::All => out.write_str("1 = 1"),
            QueryValue::And(conditions) if conditions.is_empty() => out.write_str("1 = 1"),
            QueryValue::Or(conditions) if conditions.is_empty() => out.write_str("1 = 1"),
            QueryValue::And(conditions) => write_list(out, conditions, " AND ", AND, style),
            QueryValue::Or(conditions) => write_list(out, conditions, " OR ", OR, style),
            QueryValue::Not(condition) => {
                out.write_str("NOT ")?;
                write_child(out, condition, NOT, style)
            }
            QueryValue::Between { column, min, max } => {
                write_child(out, column, OPERAND, style)?;
                out.write_str(" BETWEEN ")?;
                write_child(out, min, OPERAND, style)?;
                out.write_str(" AND ")?;
                write_child(out, max, OPERAND, style)
            }
            QueryValue::In { left, values } => {
                write_child(out, left, OPERAND, style)?;
                out.write_str(" IN ")?;
                values.write_sql(out, style)
            }
            QueryValue::IsNull(value) => {
                write_child(out, value, OPERAND, style)?;
                out.write_str(" IS NULL")
            }
            QueryValue::IsNotNull(value) => {
                write_child(out, value, OPERAND, style)?;
                out.write_str(" IS NOT NULL")
            }
            QueryValue::Binary {
                left,
                operator,
                right,
            } => {
                write_child(out, left, OPERAND, style)?;
                write!(out, " {} ", operator.as_str())?;
                write_child(out, right, OPERAND, style)
            }
            QueryValue::Parenthesis(value) => {
                out.write_char('(')?;
                value.write_sql(out, style)?;
                out.write_char(')')
            }
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, LiteralStyle::Inline)
    }
}

fn write_child<W: Write>(out: &mut W, child: &QueryValue, min: u8, style: LiteralStyle) -> fmt::Result {
    if child.precedence() < min {
        out.write_char('(')?;
        child.write_sql(out, style)?;
        out.write_char(')')
    } else {
        child.write_sql(out, style)
    }
}

fn write_list<W: Write>(
    out: &mut W,
    values: &[QueryValueRef],
    separator: &str,
    min: u8,
    style: LiteralStyle,
) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.write_str(separator)?;
        }
        write_child(out, value, min, style)?;
    }
    Ok(())
}

/// Leaves plain identifiers bare and double-quotes everything else.
pub fn quote_name(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && Token::keyword_from_str(name).is_none();
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}
