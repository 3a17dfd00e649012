//! Common infrastructure shared by the front end, checker and code generator

mod error;
mod span;

pub use error::{CompileError, CompileResult, DiagnosticReporter};
pub use span::Span;
