//! Type model for the shader language
//!
//! Source-level value types with their classification and compatibility
//! relations, swizzle validation, and the lowered IR types the code generator
//! works with.

mod ty;
mod ir_type;
pub mod swizzle;

pub use ty::Type;
pub use ir_type::{IrType, IrTypeKind};
pub use swizzle::{SwizzleCheck, SwizzleIssue};
