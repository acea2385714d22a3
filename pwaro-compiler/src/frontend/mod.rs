//! Source text to AST: a logos tokenizer and a recursive-descent parser.

pub mod lexer;
pub mod parser;
