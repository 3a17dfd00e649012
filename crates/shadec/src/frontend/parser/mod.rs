//! Recursive-descent parser producing the syntax tree

mod parser;

pub use parser::Parser;

use crate::common::CompileResult;
use crate::frontend::ast::Program;

/// Parse a whole source file
pub fn parse(source: &str) -> CompileResult<Program> {
    Parser::new(source)?.parse()
}
