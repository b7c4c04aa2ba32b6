//! Filter domain language.
//!
//! Syntax:
//!   [('a', '=', 1), ('b', '!=', 'x')]  - list of leaves (implicit AND)
//!   ['&', leaf, leaf]                  - prefix AND
//!   ['|', leaf, leaf]                  - prefix OR
//!   ['!', leaf]                        - prefix NOT (pass-through)
//!   a = 1 and b = 2 or c = 3           - keyword form, becomes prefix form
//!   a is x, a is not x                 - `=` / `!=`
//!
//! Canonical output is unquoted and comma-joined: `[&,(a,=,1),(b,=,2)]`.

mod ast;
mod lexer;
mod negate;
mod parser;
mod render;

use thiserror::Error;

pub use ast::*;
pub use lexer::{Token, TokenKind, tokenize};
pub use negate::inverse_operator;
pub use parser::{Parser, ParserConfig, parse_filter, parse_filter_with};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("cannot tokenize input at offset {offset}: '{fragment}'")]
    Lex { offset: usize, fragment: String },
}
