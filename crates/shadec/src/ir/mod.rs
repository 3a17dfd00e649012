//! Control-flow-graph intermediate representation
//!
//! Functions are lists of basic blocks; each block is a straight-line run of
//! instructions closed by exactly one terminator.

mod inst;
mod builder;
mod serialize;

pub use inst::*;
pub use builder::IrBuilder;
pub use serialize::{checksum, serialize, verify_container, CONTAINER_MAGIC, CONTAINER_VERSION};
