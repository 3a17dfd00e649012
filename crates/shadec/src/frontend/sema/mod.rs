//! Semantic analysis
//!
//! Type checking and validation of a parsed program. Problems are reported
//! as [`Diagnostic`]s through a [`Reporter`]; checking never stops early.

mod checker;
mod diagnostics;
mod scope;
mod typing;

pub use checker::{check, CheckedProgram, Checker};
pub use diagnostics::{Diagnostic, DiagnosticSink, LookingFor, Reporter, SemanticError};
pub use scope::{DeclRef, Scope, Storage, Symbol, SymbolKind, SymbolTable};
pub use typing::type_of;
