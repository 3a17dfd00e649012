//! Shade Compiler - semantic checker and CFG code generator for a small
//! shader language
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **Frontend** (`frontend/`): lexer, parser, syntax tree and the semantic checker
//! - **Code generation** (`codegen/`): lowering of a checked tree into IR
//! - **IR** (`ir/`): basic blocks, instructions, the builder and the binary container
//! - **Types** (`types/`): source types, swizzles and lowered IR types
//! - **Common** (`common/`): shared infrastructure (errors, spans)
//! - **Driver** (`driver/`): the end-to-end compilation session

pub mod common;
pub mod types;
pub mod frontend;
pub mod ir;
pub mod codegen;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use frontend::sema::{check, type_of, CheckedProgram, Diagnostic, Reporter};
pub use codegen::{emit, emit_program};
pub use driver::{Compilation, Session, SessionConfig};
