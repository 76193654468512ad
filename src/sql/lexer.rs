// SQL lexer - tokenizes WHERE clauses and the SELECT wrapped around them

use super::token::Token;
use anyhow::{bail, Result};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                // Check for comments
                if self.current_char() == Some('-') {
                    self.skip_comment();
                    return self.next_token();
                }
                Token::Minus
            }
            '*' => {
                self.advance();
                Token::Star
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '|' => {
                self.advance();
                if self.current_char() != Some('|') {
                    bail!("Unexpected character '|' at position {}", self.position);
                }
                self.advance();
                Token::Concat
            }
            '=' => {
                self.advance();
                Token::Equal
            }
            '<' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::LessEqual
                } else if self.current_char() == Some('>') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            '!' => {
                self.advance();
                if self.current_char() != Some('=') {
                    bail!("Unexpected character '!' at position {}", self.position);
                }
                self.advance();
                Token::NotEqual
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            '.' => {
                self.advance();
                Token::Dot
            }
            '{' => self.read_escape_literal()?,
            '\'' => Token::String(self.read_string()?),
            '"' => self.read_quoted_identifier()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c => bail!("Unexpected character '{}' at position {}", c, self.position),
        };

        Ok(token)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip single-line comments starting with --
    fn skip_comment(&mut self) {
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let word = self.read_word();

        // Check if it's a keyword
        Token::keyword_from_str(&word).unwrap_or(Token::Identifier(word))
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    /// Read a quoted identifier (e.g., "table name"); `""` stands for `"`
    fn read_quoted_identifier(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut identifier = String::new();

        loop {
            match self.current_char() {
                Some('"') if self.peek() == Some('"') => {
                    identifier.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance(); // Skip closing quote
                    return Ok(Token::Identifier(identifier));
                }
                Some(ch) => {
                    identifier.push(ch);
                    self.advance();
                }
                None => bail!("Unterminated quoted identifier starting at position {}", start),
            }
        }
    }

    /// Read a string literal; `''` stands for `'`
    fn read_string(&mut self) -> Result<String> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        loop {
            match self.current_char() {
                Some('\'') if self.peek() == Some('\'') => {
                    string.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance(); // Skip closing quote
                    return Ok(string);
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => bail!("Unterminated string starting at position {}", start),
            }
        }
    }

    /// Read a JDBC-style escape literal: `{d '...'}`, `{t '...'}` or `{ts '...'}`
    fn read_escape_literal(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // Skip opening brace
        self.skip_whitespace();
        let kind = self.read_word().to_lowercase();
        self.skip_whitespace();
        if self.current_char() != Some('\'') {
            bail!("Expected quoted text in escape literal at position {}", start);
        }
        let text = self.read_string()?;
        self.skip_whitespace();
        if self.current_char() != Some('}') {
            bail!("Unterminated escape literal starting at position {}", start);
        }
        self.advance();

        match kind.as_str() {
            "d" => Ok(Token::DateLiteral(text)),
            "t" => Ok(Token::TimeLiteral(text)),
            "ts" => Ok(Token::TimestampLiteral(text)),
            _ => bail!("Unknown escape literal '{{{} ...}}' at position {}", kind, start),
        }
    }

    /// Read a number (integer or decimal)
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(number)
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(sql: &str) -> Vec<Token> {
        Lexer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("SELECT * FROM person"),
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Identifier("person".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("+ - * / % || = < > <= >= <> !="),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Concat,
                Token::Equal,
                Token::Less,
                Token::Greater,
                Token::LessEqual,
                Token::GreaterEqual,
                Token::NotEqual,
                Token::NotEqual,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens("'hello world' 'it''s fine'"),
            vec![
                Token::String("hello world".to_string()),
                Token::String("it's fine".to_string()),
                Token::Eof
            ]
        );
        assert!(Lexer::new("name = 'open").tokenize().is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("123 456.789 0.5"),
            vec![
                Token::Number("123".to_string()),
                Token::Number("456.789".to_string()),
                Token::Number("0.5".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(
            tokens(r#""my table" "column""name""#),
            vec![
                Token::Identifier("my table".to_string()),
                Token::Identifier("column\"name".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_escape_literals() {
        assert_eq!(
            tokens("{d '2024-02-29'} {t '10:30:00'} { ts '2024-02-29 10:30:00' }"),
            vec![
                Token::DateLiteral("2024-02-29".to_string()),
                Token::TimeLiteral("10:30:00".to_string()),
                Token::TimestampLiteral("2024-02-29 10:30:00".to_string()),
                Token::Eof
            ]
        );
        assert!(Lexer::new("{x '1'}").tokenize().is_err());
        assert!(Lexer::new("{d '2024-02-29'").tokenize().is_err());
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokens("age -- comment\n> 3"),
            vec![
                Token::Identifier("age".to_string()),
                Token::Greater,
                Token::Number("3".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert!(Lexer::new("age ? 3").tokenize().is_err());
    }

    #[test]
    fn test_full_clause() {
        let tokens = tokens("age > 18 AND status = 'active' AND name NOT LIKE 'B%'");

        assert_eq!(tokens[0], Token::Identifier("age".to_string()));
        assert_eq!(tokens[1], Token::Greater);
        assert_eq!(tokens[2], Token::Number("18".to_string()));
        assert_eq!(tokens[3], Token::And);
        assert_eq!(tokens[4], Token::Identifier("status".to_string()));
        assert_eq!(tokens[5], Token::Equal);
        assert_eq!(tokens[6], Token::String("active".to_string()));
        assert_eq!(tokens[7], Token::And);
        assert_eq!(tokens[8], Token::Identifier("name".to_string()));
        assert_eq!(tokens[9], Token::Not);
        assert_eq!(tokens[10], Token::Like);
        assert_eq!(tokens[11], Token::String("B%".to_string()));
        assert_eq!(tokens[12], Token::Eof);
    }
}
