//! Instruction selection from generic vector IR to fixed-point SIMD targets.
//!
//! The IR lives in [`vecsel_ir`], the target-specific rewriting in
//! [`vecsel_lower`]; this crate sequences them into a [`Pipeline`].

pub mod pipeline;

pub use pipeline::{CleanupPass, DeadCodeElimination, Pipeline, PipelineReport};
pub use vecsel_ir as ir;
pub use vecsel_lower as lower;
