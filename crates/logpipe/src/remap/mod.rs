//! Declarative field remapping applied after parsing.
//!
//! - `path.rs`: dotted field paths into nested records
//! - `op.rs`: the `FieldOp` vocabulary and the `Remapper` that runs it

pub mod op;
pub mod path;

pub use op::{FieldOp, Remapper};
pub use path::FieldPath;
