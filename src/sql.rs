// SQL module - WHERE clause parsing and translation into query values

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod translate;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::*;
pub use translate::parse_where;
