//! Rewrite infrastructure.
//!
//! In-place mutation + RAUW-based rewriting driven to a fixpoint by
//! [`PatternApplicator`], with legality decided by a [`ConversionTarget`].

pub mod applicator;
pub mod conversion_target;
pub mod pattern;
pub mod rewriter;

pub use applicator::{ApplyResult, PatternApplicator, Rejection};
pub use conversion_target::{ConversionTarget, DynamicCheckFn, IllegalOp, LegalityCheck};
pub use pattern::{MatchResult, PatternSet, RewritePattern, UnsupportedInput};
pub use rewriter::PatternRewriter;
