//! Instruction selection from generic vector IR to fixed-point SIMD targets.
//!
//! Two hardware generations are supported:
//!
//! - `aie`: 256-bit native vectors. Adds and subtracts become shuffled
//!   `aievec.add`/`aievec.sub`, multiply-adds become `aievec.fma`.
//! - `aieml`: 512-bit native vectors. Elementwise ops, compares, selects,
//!   reductions and multiplies are lowered, going through an accumulator
//!   representation with explicit `ups`/`srs` where needed.
//!
//! ## Modules
//!
//! - `target`: generation selector, lane/width tables, accumulator types
//! - `analysis`: effective access size of strided loads
//! - `legality`: the per-generation legality oracle
//! - `patterns`: the per-generation rule sets
//! - `pass`: [`lower_vector_to_target`], the pass entry point

pub mod analysis;
mod errors;
pub mod legality;
mod options;
mod pass;
pub mod patterns;
pub mod target;

pub use errors::{LowerError, LowerErrorKind, LowerResult};
pub use legality::conversion_target;
pub use options::LowerOptions;
pub use pass::{LowerReport, lower_vector_to_target};
pub use patterns::pattern_set;
pub use target::TargetGeneration;
