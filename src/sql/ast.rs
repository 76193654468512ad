// SQL Abstract Syntax Tree (AST) definitions

use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projections: Vec<SelectItem>,
    pub table: Option<String>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    AllColumns,
    Expression(Expression, Option<String>), // expression, alias
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Literals
    Literal(Value),

    // Null literal
    Null,

    // Column reference
    Column(String),
    QualifiedColumn(String, String), // table.column

    // Binary operations
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    // Unary operations
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    // Function call
    Function {
        name: String,
        args: Vec<Expression>,
    },

    // CASE expression
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<WhenClause>,
        else_clause: Option<Box<Expression>>,
    },

    // CAST expression, type name kept as written
    Cast {
        expression: Box<Expression>,
        data_type: String,
    },

    // IN expression
    InList {
        expression: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },

    // BETWEEN expression
    Between {
        expression: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },

    // EXISTS expression
    Exists {
        subquery: Box<SelectStatement>,
        negated: bool,
    },

    // LIKE expression
    Like {
        expression: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<Box<Expression>>,
        negated: bool,
    },

    // IS NULL expression
    IsNull {
        expression: Box<Expression>,
        negated: bool,
    },

    // Row constructor: (a, b, ...)
    Row(Vec<Expression>),

    // Subquery
    Subquery(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: Expression,
    pub result: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,

    // Comparison
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl Expression {
    /// Create a literal expression from a value
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create a column reference expression
    pub fn column(name: impl Into<String>) -> Self {
        Expression::Column(name.into())
    }

    /// Create a binary operation
    pub fn binary(self, op: BinaryOperator, other: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    /// Create an equality comparison
    pub fn eq(self, other: Expression) -> Self {
        self.binary(BinaryOperator::Equal, other)
    }

    /// Create a greater than comparison
    pub fn gt(self, other: Expression) -> Self {
        self.binary(BinaryOperator::Greater, other)
    }

    /// Create an AND expression
    pub fn and(self, other: Expression) -> Self {
        self.binary(BinaryOperator::And, other)
    }

    /// Create an OR expression
    pub fn or(self, other: Expression) -> Self {
        self.binary(BinaryOperator::Or, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_builders() {
        let expr = Expression::column("age")
            .gt(Expression::literal(18))
            .and(Expression::column("status").eq(Expression::literal("active")));

        match expr {
            Expression::BinaryOp {
                op: BinaryOperator::And,
                left,
                ..
            } => assert_eq!(
                *left,
                Expression::BinaryOp {
                    left: Box::new(Expression::Column("age".to_string())),
                    op: BinaryOperator::Greater,
                    right: Box::new(Expression::Literal(Value::Int(18))),
                }
            ),
            _ => panic!("Expected AND expression"),
        }
    }

    #[test]
    fn test_operator_text() {
        assert_eq!(BinaryOperator::NotEqual.as_str(), "<>");
        assert_eq!(BinaryOperator::Concat.as_str(), "||");
    }
}
