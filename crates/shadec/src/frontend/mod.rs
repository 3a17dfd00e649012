//! Front end: lexing, parsing and semantic checking
//!
//! The front end turns source text into a [`ast::Program`] and checks it.
//! Code generation only ever sees programs the checker accepted.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sema;
