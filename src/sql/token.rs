// SQL tokens for lexical analysis

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Number(String),
    String(String),
    /// `{d '...'}`
    DateLiteral(String),
    /// `{t '...'}`
    TimeLiteral(String),
    /// `{ts '...'}`
    TimestampLiteral(String),

    // Keywords
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    Null,
    In,
    Exists,
    Between,
    Like,
    Escape,
    Is,
    True,
    False,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    As,
    Distinct,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,

    // Special
    Eof,
}

impl Token {
    /// Check if the token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Select
                | Token::From
                | Token::Where
                | Token::And
                | Token::Or
                | Token::Not
                | Token::Null
                | Token::In
                | Token::Exists
                | Token::Between
                | Token::Like
                | Token::Escape
                | Token::Is
                | Token::True
                | Token::False
                | Token::Case
                | Token::When
                | Token::Then
                | Token::Else
                | Token::End
                | Token::Cast
                | Token::As
                | Token::Distinct
        )
    }

    /// Convert a string to a keyword token if it matches
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            "SELECT" => Some(Token::Select),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            "NULL" => Some(Token::Null),
            "IN" => Some(Token::In),
            "EXISTS" => Some(Token::Exists),
            "BETWEEN" => Some(Token::Between),
            "LIKE" => Some(Token::Like),
            "ESCAPE" => Some(Token::Escape),
            "IS" => Some(Token::Is),
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),
            "CASE" => Some(Token::Case),
            "WHEN" => Some(Token::When),
            "THEN" => Some(Token::Then),
            "ELSE" => Some(Token::Else),
            "END" => Some(Token::End),
            "CAST" => Some(Token::Cast),
            "AS" => Some(Token::As),
            "DISTINCT" => Some(Token::Distinct),
            _ => None,
        }
    }
}
