// SQL parser - converts tokens to AST

use std::str::FromStr;

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::types::{DataType, Value};
use anyhow::{bail, Result};
use rust_decimal::Decimal;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
        })
    }

    /// Parse a complete SELECT statement
    pub fn parse(&mut self) -> Result<SelectStatement> {
        let statement = self.parse_select()?;
        if self.match_token(&Token::Semicolon) {
            self.advance();
        }
        if !self.match_token(&Token::Eof) {
            bail!("Unexpected token: {:?}", self.current_token());
        }
        Ok(statement)
    }

    /// Parse a SELECT statement
    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_token(Token::Select)?;

        let distinct = if self.match_token(&Token::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        // Parse projections
        let projections = self.parse_select_items()?;

        // Parse FROM clause
        let table = if self.match_token(&Token::From) {
            self.advance();
            Some(self.parse_table_name()?)
        } else {
            None
        };

        // Parse WHERE clause
        let where_clause = if self.match_token(&Token::Where) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(SelectStatement {
            distinct,
            projections,
            table,
            where_clause,
        })
    }

    /// Parse SELECT items
    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = vec![];

        loop {
            if self.match_token(&Token::Star) {
                self.advance();
                items.push(SelectItem::AllColumns);
            } else {
                let expr = self.parse_expression()?;
                let alias = if self.match_token(&Token::As) {
                    self.advance();
                    Some(self.expect_identifier()?)
                } else if let Token::Identifier(alias) = self.current_token() {
                    self.advance();
                    Some(alias)
                } else {
                    None
                };
                items.push(SelectItem::Expression(expr, alias));
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    /// Parse a possibly schema-qualified table name
    fn parse_table_name(&mut self) -> Result<String> {
        let mut name = self.expect_identifier()?;
        while self.match_token(&Token::Dot) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    /// Parse expression
    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = left.binary(BinaryOperator::Or, right);
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = left.binary(BinaryOperator::And, right);
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> Result<Expression> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            })
        } else {
            self.parse_comparison()
        }
    }

    /// Parse comparison expression
    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_addition()?;

        // Handle special comparison operators
        if self.match_token(&Token::Is) {
            self.advance();
            let negated = if self.match_token(&Token::Not) {
                self.advance();
                true
            } else {
                false
            };
            self.expect_token(Token::Null)?;
            return Ok(Expression::IsNull {
                expression: Box::new(left),
                negated,
            });
        }

        let negated = self.match_token(&Token::Not)
            && matches!(self.peek_token(), Token::In | Token::Between | Token::Like);
        if negated {
            self.advance();
        }

        if self.match_token(&Token::In) {
            self.advance();
            self.expect_token(Token::LeftParen)?;
            let list = if self.match_token(&Token::Select) {
                vec![Expression::Subquery(Box::new(self.parse_select()?))]
            } else {
                self.parse_expression_list()?
            };
            self.expect_token(Token::RightParen)?;
            return Ok(Expression::InList {
                expression: Box::new(left),
                list,
                negated,
            });
        }

        if self.match_token(&Token::Between) {
            self.advance();
            let low = self.parse_addition()?;
            self.expect_token(Token::And)?;
            let high = self.parse_addition()?;
            return Ok(Expression::Between {
                expression: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }

        if self.match_token(&Token::Like) {
            self.advance();
            let pattern = self.parse_addition()?;
            let escape = if self.match_token(&Token::Escape) {
                self.advance();
                Some(Box::new(self.parse_addition()?))
            } else {
                None
            };
            return Ok(Expression::Like {
                expression: Box::new(left),
                pattern: Box::new(pattern),
                escape,
                negated,
            });
        }

        // Standard comparison operators
        let op = match self.current_token() {
            Token::Equal => Some(BinaryOperator::Equal),
            Token::NotEqual => Some(BinaryOperator::NotEqual),
            Token::Less => Some(BinaryOperator::Less),
            Token::Greater => Some(BinaryOperator::Greater),
            Token::LessEqual => Some(BinaryOperator::LessEqual),
            Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_addition()?;
            Ok(left.binary(op, right))
        } else {
            Ok(left)
        }
    }

    /// Parse addition/subtraction/concatenation expression
    fn parse_addition(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplication()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Plus,
                Token::Minus => BinaryOperator::Minus,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };
            self.advance();

            let right = self.parse_multiplication()?;
            left = left.binary(op, right);
        }

        Ok(left)
    }

    /// Parse multiplication/division expression
    fn parse_multiplication(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();

            let right = self.parse_unary()?;
            left = left.binary(op, right);
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.current_token() {
            Token::Plus => UnaryOperator::Plus,
            Token::Minus => UnaryOperator::Minus,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> Result<Expression> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Literal(parse_number(&n)?))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }
            Token::DateLiteral(text) => {
                self.advance();
                Ok(Expression::Literal(DataType::Date.convert(&Value::String(text))?))
            }
            Token::TimeLiteral(text) => {
                self.advance();
                Ok(Expression::Literal(DataType::Time.convert(&Value::String(text))?))
            }
            Token::TimestampLiteral(text) => {
                self.advance();
                Ok(Expression::Literal(DataType::Timestamp.convert(&Value::String(text))?))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            Token::Identifier(name) => {
                self.advance();

                // Check for qualified column (table.column)
                if self.match_token(&Token::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    Ok(Expression::QualifiedColumn(name, column))
                }
                // Check for function call
                else if self.match_token(&Token::LeftParen) {
                    self.advance();

                    let args = if self.match_token(&Token::RightParen) {
                        vec![]
                    } else {
                        self.parse_expression_list()?
                    };
                    self.expect_token(Token::RightParen)?;

                    Ok(Expression::Function { name, args })
                } else {
                    Ok(Expression::Column(name))
                }
            }
            Token::LeftParen => {
                self.advance();

                // Check if it's a subquery
                if self.match_token(&Token::Select) {
                    let subquery = self.parse_select()?;
                    self.expect_token(Token::RightParen)?;
                    return Ok(Expression::Subquery(Box::new(subquery)));
                }

                let mut list = self.parse_expression_list()?;
                self.expect_token(Token::RightParen)?;
                if list.len() == 1 {
                    Ok(list.remove(0))
                } else {
                    Ok(Expression::Row(list))
                }
            }
            Token::Exists => {
                self.advance();
                self.expect_token(Token::LeftParen)?;
                let subquery = self.parse_select()?;
                self.expect_token(Token::RightParen)?;
                Ok(Expression::Exists {
                    subquery: Box::new(subquery),
                    negated: false,
                })
            }
            Token::Case => self.parse_case_expression(),
            Token::Cast => self.parse_cast_expression(),
            _ => bail!("Unexpected token: {:?}", self.current_token()),
        }
    }

    /// Parse CASE expression
    fn parse_case_expression(&mut self) -> Result<Expression> {
        self.expect_token(Token::Case)?;

        // Check if there's an operand
        let operand = if !self.match_token(&Token::When) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let mut when_clauses = vec![];

        while self.match_token(&Token::When) {
            self.advance();
            let condition = self.parse_expression()?;
            self.expect_token(Token::Then)?;
            let result = self.parse_expression()?;
            when_clauses.push(WhenClause { condition, result });
        }

        let else_clause = if self.match_token(&Token::Else) {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect_token(Token::End)?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parse CAST expression
    fn parse_cast_expression(&mut self) -> Result<Expression> {
        self.expect_token(Token::Cast)?;
        self.expect_token(Token::LeftParen)?;

        let expression = self.parse_expression()?;

        self.expect_token(Token::As)?;

        let data_type = self.parse_type_name()?;

        self.expect_token(Token::RightParen)?;

        Ok(Expression::Cast {
            expression: Box::new(expression),
            data_type,
        })
    }

    /// Parse a type name as written, e.g. `double precision` or `decimal(10,2)`
    fn parse_type_name(&mut self) -> Result<String> {
        let mut words = vec![self.expect_identifier()?];
        while let Token::Identifier(word) = self.current_token() {
            self.advance();
            words.push(word);
        }
        let mut name = words.join(" ");

        if self.match_token(&Token::LeftParen) {
            self.advance();
            let mut arguments = vec![self.expect_number()?];
            while self.match_token(&Token::Comma) {
                self.advance();
                arguments.push(self.expect_number()?);
            }
            self.expect_token(Token::RightParen)?;
            name.push('(');
            name.push_str(&arguments.join(","));
            name.push(')');
        }

        Ok(name)
    }

    /// Parse list of expressions
    fn parse_expression_list(&mut self) -> Result<Vec<Expression>> {
        let mut expressions = vec![];

        loop {
            expressions.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(expressions)
    }

    // Helper methods

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.tokens.get(self.position).unwrap_or(&Token::Eof) == token
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> Result<()> {
        if self.match_token(&token) {
            self.advance();
            Ok(())
        } else {
            bail!("Expected {:?}, found {:?}", token, self.current_token())
        }
    }

    /// Expect an identifier
    fn expect_identifier(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => bail!("Expected identifier, found {:?}", other),
        }
    }

    /// Expect a number
    fn expect_number(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                Ok(n)
            }
            other => bail!("Expected number, found {:?}", other),
        }
    }
}

/// Integers become the narrowest of int/long that holds them, anything with
/// a fraction an exact decimal.
fn parse_number(text: &str) -> Result<Value> {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i32>() {
            return Ok(Value::Int(i));
        }
        if let Ok(l) = text.parse::<i64>() {
            return Ok(Value::Long(l));
        }
    }
    match Decimal::from_str(text) {
        Ok(d) => Ok(Value::Decimal(d)),
        Err(_) => bail!("Invalid number: {}", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn where_clause(sql: &str) -> Expression {
        let mut parser = Parser::new(sql).unwrap();
        parser.parse().unwrap().where_clause.unwrap()
    }

    #[test]
    fn test_parse_select_simple() {
        let mut parser = Parser::new(r#"SELECT * FROM "PERSON""#).unwrap();
        let stmt = parser.parse().unwrap();
        assert_eq!(stmt.projections, vec![SelectItem::AllColumns]);
        assert_eq!(stmt.table.as_deref(), Some("PERSON"));
        assert!(stmt.where_clause.is_none());
    }

    #[test]
    fn test_parse_precedence() {
        let expr = where_clause("SELECT * FROM t WHERE a = 1 OR b = 2 AND NOT c = 3");
        match expr {
            Expression::BinaryOp {
                op: BinaryOperator::Or,
                right,
                ..
            } => match *right {
                Expression::BinaryOp {
                    op: BinaryOperator::And,
                    right,
                    ..
                } => assert!(matches!(
                    *right,
                    Expression::UnaryOp {
                        op: UnaryOperator::Not,
                        ..
                    }
                )),
                other => panic!("Expected AND, got {:?}", other),
            },
            other => panic!("Expected OR, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_negated_predicates() {
        let expr = where_clause("SELECT * FROM t WHERE a NOT BETWEEN 1 AND 5");
        assert!(matches!(expr, Expression::Between { negated: true, .. }));
        let expr = where_clause("SELECT * FROM t WHERE a NOT IN (1, 2)");
        assert!(matches!(expr, Expression::InList { negated: true, .. }));
        let expr = where_clause("SELECT * FROM t WHERE a IS NOT NULL");
        assert!(matches!(expr, Expression::IsNull { negated: true, .. }));
        let expr = where_clause("SELECT * FROM t WHERE NOT NOT a = 1");
        assert!(matches!(
            expr,
            Expression::UnaryOp {
                op: UnaryOperator::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_literals() {
        let expr = where_clause("SELECT * FROM t WHERE d = {d '2024-02-29'} AND x = 1.50 AND y = 3000000000");
        let Expression::BinaryOp { left, right: third, .. } = expr else {
            panic!("Expected AND");
        };
        let Expression::BinaryOp {
            left: first,
            right: second,
            ..
        } = *left
        else {
            panic!("Expected AND");
        };
        assert_eq!(
            *first,
            Expression::column("d").eq(Expression::literal(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            *second,
            Expression::column("x").eq(Expression::literal(Decimal::new(150, 2)))
        );
        assert_eq!(
            *third,
            Expression::column("y").eq(Expression::literal(3_000_000_000i64))
        );
    }

    #[test]
    fn test_parse_cast_type_names() {
        let expr = where_clause("SELECT * FROM t WHERE CAST(a AS varchar(4000)) = CAST(b AS double precision)");
        let Expression::BinaryOp { left, right, .. } = expr else {
            panic!("Expected comparison");
        };
        assert!(matches!(*left, Expression::Cast { ref data_type, .. } if data_type == "varchar(4000)"));
        assert!(matches!(*right, Expression::Cast { ref data_type, .. } if data_type == "double precision"));
    }

    #[test]
    fn test_parse_row_and_subquery() {
        let expr = where_clause("SELECT * FROM t WHERE (a, b) = (1, 2)");
        assert!(matches!(expr, Expression::BinaryOp { ref left, .. } if matches!(**left, Expression::Row(_))));
        let expr = where_clause("SELECT * FROM t WHERE EXISTS (SELECT * FROM u)");
        assert!(matches!(expr, Expression::Exists { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::new("SELECT * FROM t WHERE a = ").unwrap().parse().is_err());
        assert!(Parser::new("SELECT * FROM t WHERE a = 1 b").unwrap().parse().is_err());
        assert!(Parser::new("SELECT * FROM t WHERE a BETWEEN 1").unwrap().parse().is_err());
        assert!(Parser::new("SELECT * FROM t WHERE d = {d 'soon'}").unwrap().parse().is_err());
    }
}
