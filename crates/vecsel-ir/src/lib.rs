//! Arena-based operation graph for vector instruction selection.
//!
//! All IR data (operations, values, blocks, regions, types) lives in a single
//! [`IrContext`], referenced by `Copy` entity handles. Operations are created
//! detached, spliced into blocks, and rewritten in place with RAUW. Each
//! value keeps a use-chain, so "how many users does this have" and "who reads
//! this" are O(1) queries.

pub mod analysis;
pub mod context;
pub mod dialect;
pub mod interp;
pub mod ops;
pub mod printer;
pub mod refs;
pub mod rewrite;
pub mod transforms;
pub mod types;
pub mod validation;
pub mod walk;

pub use analysis::{AnalysisManager, OpAnalysis};
pub use context::{
    BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use, ValueData,
};
pub use ops::{CombiningKind, Dialect, FloatPredicate, IntPredicate, OpKind, PermutationMap};
pub use refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use types::{Attribute, FloatFormat, Signedness, TypeData, TypeInterner, VectorShape};

// Re-export smallvec for downstream crates building operand lists.
pub use smallvec;
