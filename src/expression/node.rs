//! Query value tree.
//!
//! Nodes are shared through [`QueryValueRef`] and treated as immutable once
//! built. Rewrites go through [`QueryValue::update_query_values`], which
//! keeps the original node whenever no child changed; in-place edits such
//! as [`QueryValue::add_condition`] go through `Arc::make_mut`, so a shared
//! tree is copied before it is touched.

use std::sync::Arc;

use super::operator::{ArithmeticOperator, ComparisonOperator, Function};
use crate::error::{ExpressionError, ExpressionResult};
use crate::schema::{CodeTable, FieldDefinition, RecordDefinition};
use crate::types::Value;

pub type QueryValueRef = Arc<QueryValue>;

/// Literal with its stored form and, for code-table fields, its display form.
#[derive(Debug, Clone)]
pub struct Literal {
    value: Value,
    display: Option<Value>,
    field: Option<Arc<FieldDefinition>>,
}

impl Literal {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            display: None,
            field: None,
        }
    }

    /// Binds a literal to `field`, coercing leniently.
    ///
    /// With a code table on the field, a display value is replaced by its
    /// identifier and the display value kept for text output.
    pub fn for_field(field: &Arc<FieldDefinition>, value: impl Into<Value>) -> Self {
        let raw = value.into();
        let (value, display) = match field.code_table().and_then(|table| lookup_id(table, &raw).map(|id| (table, id))) {
            Some((table, id)) => {
                let display = display_value(table.as_ref(), &id);
                (field.data_type().convert_lenient(&id), display)
            }
            None => (field.to_field_value(&raw), None),
        };
        Self {
            value,
            display,
            field: Some(Arc::clone(field)),
        }
    }

    /// As [`Literal::for_field`] but fails when the value cannot be
    /// converted or is missing from the field's code table.
    pub fn for_field_strict(field: &Arc<FieldDefinition>, value: impl Into<Value>) -> ExpressionResult<Self> {
        let raw = value.into();
        let (value, display) = match field.code_table() {
            Some(table) if !raw.is_null() => {
                let id = lookup_id(table, &raw).ok_or_else(|| {
                    let reason = format!("could not be found in the code table {}", table.name());
                    ExpressionError::coercion(field.name(), &raw, reason)
                })?;
                let value = field
                    .data_type()
                    .convert(&id)
                    .map_err(|err| err.for_field(field.name()))?;
                (value, display_value(table.as_ref(), &id))
            }
            _ => (field.to_field_value_strict(&raw)?, None),
        };
        Ok(Self {
            value,
            display,
            field: Some(Arc::clone(field)),
        })
    }

    /// Stored form, the code-table identifier when there is one.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Form shown in text output.
    pub fn display_value(&self) -> &Value {
        self.display.as_ref().unwrap_or(&self.value)
    }

    pub fn field(&self) -> Option<&Arc<FieldDefinition>> {
        self.field.as_ref()
    }

    /// Value handed to a parameter sink.
    pub fn bound_value(&self) -> Value {
        match &self.field {
            Some(field) => field.to_field_value(&self.value),
            None => self.value.clone(),
        }
    }

    fn is_bound_to(&self, field: &Arc<FieldDefinition>) -> bool {
        self.field.as_ref().is_some_and(|f| Arc::ptr_eq(f, field))
    }
}

/// Single display values as-is, multi-part ones joined with `:`.
fn display_value(table: &dyn CodeTable, id: &Value) -> Option<Value> {
    let values = table.values(id)?;
    match values.as_slice() {
        [] => None,
        [value] => Some(value.clone()),
        parts => Some(Value::String(
            parts
                .iter()
                .map(Value::to_plain_string)
                .collect::<Vec<_>>()
                .join(":"),
        )),
    }
}

fn lookup_id(table: &Arc<dyn CodeTable>, value: &Value) -> Option<Value> {
    match value {
        Value::List(parts) => table.identifier(parts),
        other => table.identifier_for(other),
    }
}

/// Column reference, resolved to a field once bound to a definition.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    field: Option<Arc<FieldDefinition>>,
}

impl Column {
    /// Surrounding double quotes are dropped.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
            Some(unquoted) => unquoted.to_string(),
            None => name,
        };
        Self { name, field: None }
    }

    pub fn from_field(field: &Arc<FieldDefinition>) -> Self {
        Self {
            name: field.name().to_string(),
            field: Some(Arc::clone(field)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> Option<&Arc<FieldDefinition>> {
        self.field.as_ref()
    }
}

/// A node of a scalar expression or condition tree.
#[derive(Debug, Clone)]
pub enum QueryValue {
    // Scalar values
    Value(Literal),
    Column(Column),
    Collection(Vec<QueryValueRef>),
    Cast {
        value: QueryValueRef,
        data_type: String,
    },
    Arithmetic {
        left: QueryValueRef,
        operator: ArithmeticOperator,
        right: QueryValueRef,
    },
    Function {
        function: Function,
        arguments: Vec<QueryValueRef>,
    },

    // Conditions
    /// Always true; stands in for "no filter".
    All,
    And(Vec<QueryValueRef>),
    Or(Vec<QueryValueRef>),
    Not(QueryValueRef),
    Between {
        column: QueryValueRef,
        min: QueryValueRef,
        max: QueryValueRef,
    },
    /// `values` is always a `Collection`.
    In {
        left: QueryValueRef,
        values: QueryValueRef,
    },
    IsNull(QueryValueRef),
    IsNotNull(QueryValueRef),
    Binary {
        left: QueryValueRef,
        operator: ComparisonOperator,
        right: QueryValueRef,
    },
    /// Grouping only; never changes meaning.
    Parenthesis(QueryValueRef),
}

impl QueryValue {
    /// Whether this node yields a boolean.
    pub fn is_condition(&self) -> bool {
        match self {
            QueryValue::Value(_)
            | QueryValue::Column(_)
            | QueryValue::Collection(_)
            | QueryValue::Cast { .. }
            | QueryValue::Arithmetic { .. } => false,
            QueryValue::Function { function, .. } => function.is_spatial(),
            QueryValue::Parenthesis(inner) => inner.is_condition(),
            _ => true,
        }
    }

    /// The always-true marker or an empty conjunction/disjunction.
    pub fn is_empty_condition(&self) -> bool {
        match self {
            QueryValue::All => true,
            QueryValue::And(conditions) | QueryValue::Or(conditions) => conditions.is_empty(),
            _ => false,
        }
    }

    /// Direct children in rendering order.
    pub fn query_values(&self) -> Vec<&QueryValueRef> {
        match self {
            QueryValue::Value(_) | QueryValue::Column(_) | QueryValue::All => Vec::new(),
            QueryValue::Collection(values)
            | QueryValue::And(values)
            | QueryValue::Or(values)
            | QueryValue::Function {
                arguments: values, ..
            } => values.iter().collect(),
            QueryValue::Cast { value, .. }
            | QueryValue::Not(value)
            | QueryValue::IsNull(value)
            | QueryValue::IsNotNull(value)
            | QueryValue::Parenthesis(value) => vec![value],
            QueryValue::Arithmetic { left, right, .. } | QueryValue::Binary { left, right, .. } => {
                vec![left, right]
            }
            QueryValue::Between { column, min, max } => vec![column, min, max],
            QueryValue::In { left, values } => vec![left, values],
        }
    }

    /// Rebuilds this node with every child passed through `f`, in
    /// rendering order.
    fn map_query_values(&self, f: &mut dyn FnMut(&QueryValueRef) -> QueryValueRef) -> QueryValue {
        match self {
            QueryValue::Value(_) | QueryValue::Column(_) | QueryValue::All => self.clone(),
            QueryValue::Collection(values) => QueryValue::Collection(values.iter().map(|v| f(v)).collect()),
            QueryValue::Cast { value, data_type } => QueryValue::Cast {
                value: f(value),
                data_type: data_type.clone(),
            },
            QueryValue::Arithmetic {
                left,
                operator,
                right,
            } => QueryValue::Arithmetic {
                left: f(left),
                operator: *operator,
                right: f(right),
            },
            QueryValue::Function {
                function,
                arguments,
            } => QueryValue::Function {
                function: *function,
                arguments: arguments.iter().map(|v| f(v)).collect(),
            },
            QueryValue::And(conditions) => QueryValue::And(conditions.iter().map(|v| f(v)).collect()),
            QueryValue::Or(conditions) => QueryValue::Or(conditions.iter().map(|v| f(v)).collect()),
            QueryValue::Not(condition) => QueryValue::Not(f(condition)),
            QueryValue::Between { column, min, max } => QueryValue::Between {
                column: f(column),
                min: f(min),
                max: f(max),
            },
            QueryValue::In { left, values } => QueryValue::In {
                left: f(left),
                values: f(values),
            },
            QueryValue::IsNull(value) => QueryValue::IsNull(f(value)),
            QueryValue::IsNotNull(value) => QueryValue::IsNotNull(f(value)),
            QueryValue::Binary {
                left,
                operator,
                right,
            } => QueryValue::Binary {
                left: f(left),
                operator: *operator,
                right: f(right),
            },
            QueryValue::Parenthesis(value) => QueryValue::Parenthesis(f(value)),
        }
    }

    /// Applies `transform` to every direct child.
    ///
    /// Returns this very node when every child comes back identical (by
    /// pointer), otherwise a new node holding the transformed children.
    pub fn update_query_values<F>(self: &Arc<Self>, mut transform: F) -> QueryValueRef
    where
        F: FnMut(&QueryValueRef) -> QueryValueRef,
    {
        let mut changed = false;
        let rebuilt = self.map_query_values(&mut |child| {
            let updated = transform(child);
            if !Arc::ptr_eq(&updated, child) {
                changed = true;
            }
            updated
        });
        if changed {
            Arc::new(rebuilt)
        } else {
            Arc::clone(self)
        }
    }

    /// Copy that shares no node with the original.
    pub fn deep_clone(&self) -> QueryValue {
        self.map_query_values(&mut |child| Arc::new(child.deep_clone()))
    }

    /// Resolves every column against `definition` and coerces literals
    /// compared with a resolved column through its field.
    ///
    /// Unknown columns are left unresolved.
    pub fn bind(self: &Arc<Self>, definition: &RecordDefinition) -> QueryValueRef {
        if let QueryValue::Column(column) = self.as_ref() {
            return match definition.field(column.name()) {
                Some(field) if column.field().is_some_and(|f| Arc::ptr_eq(f, field)) => Arc::clone(self),
                Some(field) => Arc::new(QueryValue::Column(Column::from_field(field))),
                None if column.field().is_some() => {
                    log::debug!("Column {} is not in {}", column.name(), definition.path());
                    Arc::new(QueryValue::Column(Column::new(column.name())))
                }
                None => Arc::clone(self),
            };
        }
        self.update_query_values(|child| child.bind(definition))
            .bind_literals()
    }

    fn bind_literals(self: &Arc<Self>) -> QueryValueRef {
        match self.as_ref() {
            QueryValue::Binary {
                left,
                operator,
                right,
            } if *operator != ComparisonOperator::Like => match column_field(left) {
                Some(field) => {
                    let bound = bind_literal(right, field);
                    if Arc::ptr_eq(&bound, right) {
                        Arc::clone(self)
                    } else {
                        Arc::new(QueryValue::Binary {
                            left: Arc::clone(left),
                            operator: *operator,
                            right: bound,
                        })
                    }
                }
                None => Arc::clone(self),
            },
            QueryValue::Between { column, .. } => match column_field(column) {
                Some(field) => {
                    let field = Arc::clone(field);
                    let mut position = 0;
                    self.update_query_values(|child| {
                        position += 1;
                        if position == 1 {
                            Arc::clone(child)
                        } else {
                            bind_literal(child, &field)
                        }
                    })
                }
                None => Arc::clone(self),
            },
            QueryValue::In { left, values } => match column_field(left) {
                Some(field) => {
                    let bound = values.update_query_values(|item| bind_literal(item, field));
                    if Arc::ptr_eq(&bound, values) {
                        Arc::clone(self)
                    } else {
                        Arc::new(QueryValue::In {
                            left: Arc::clone(left),
                            values: bound,
                        })
                    }
                }
                None => Arc::clone(self),
            },
            _ => Arc::clone(self),
        }
    }

    /// Appends to a conjunction or disjunction in place. Returns false,
    /// leaving the node untouched, for any other node.
    pub fn add_condition(&mut self, condition: QueryValueRef) -> bool {
        match self {
            QueryValue::And(conditions) | QueryValue::Or(conditions) => {
                conditions.push(condition);
                true
            }
            _ => false,
        }
    }
}

fn column_field(value: &QueryValueRef) -> Option<&Arc<FieldDefinition>> {
    match value.as_ref() {
        QueryValue::Column(column) => column.field(),
        _ => None,
    }
}

fn bind_literal(value: &QueryValueRef, field: &Arc<FieldDefinition>) -> QueryValueRef {
    match value.as_ref() {
        QueryValue::Value(literal) if !literal.is_bound_to(field) => Arc::new(QueryValue::Value(
            Literal::for_field(field, literal.value().clone()),
        )),
        _ => Arc::clone(value),
    }
}

/// `left AND right`, appending to `left` when it is already a conjunction.
/// An empty condition on either side yields the other side.
pub fn and(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
    combine(left, right, true)
}

/// `left OR right`, appending to `left` when it is already a disjunction.
/// An empty condition on either side yields the other side.
pub fn or(left: QueryValueRef, right: QueryValueRef) -> QueryValueRef {
    combine(left, right, false)
}

fn combine(mut left: QueryValueRef, right: QueryValueRef, conjunction: bool) -> QueryValueRef {
    if left.is_empty_condition() {
        return right;
    }
    if right.is_empty_condition() {
        return left;
    }
    let same_kind = match *left {
        QueryValue::And(_) => conjunction,
        QueryValue::Or(_) => !conjunction,
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
