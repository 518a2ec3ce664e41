//! Instruction selection pipeline.
//!
//! ## Stages
//!
//! ```text
//! func.func (arith.*, vector.*)
//!     │
//!     ▼
//! lower_vector_to_target ─► func.func (aievec.*, leftover arith.*)
//!     │
//!     ▼
//! cleanups (dead code elimination, caller-provided passes) ─► func.func
//! ```
//!
//! Cleanups only run after a successful lowering. A failed lowering leaves
//! the function partially rewritten.

use tracing::debug;
use vecsel_ir::transforms::dce::eliminate_dead_code;
use vecsel_ir::validation::debug_assert_valid;
use vecsel_ir::{IrContext, OpRef};
use vecsel_lower::{LowerOptions, LowerReport, LowerResult, lower_vector_to_target};

/// A pass run on a function once it has been lowered, such as CSE or
/// canonicalization.
pub trait CleanupPass {
    fn name(&self) -> &'static str;

    /// Rewrite `func` in place and return the number of changes made.
    fn run(&self, ctx: &mut IrContext, func: OpRef) -> usize;
}

/// Removes operations whose results are never used.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadCodeElimination;

impl CleanupPass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&self, ctx: &mut IrContext, func: OpRef) -> usize {
        eliminate_dead_code(ctx, func).removed_count
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineReport {
    pub lowering: LowerReport,
    /// Changes made by each cleanup, in run order.
    pub cleanups: Vec<(&'static str, usize)>,
}

pub struct Pipeline {
    options: LowerOptions,
    cleanups: Vec<Box<dyn CleanupPass>>,
}

impl Pipeline {
    /// A pipeline that only lowers.
    pub fn new(options: LowerOptions) -> Self {
        Self {
            options,
            cleanups: Vec::new(),
        }
    }

    /// A pipeline that lowers, then removes dead code.
    pub fn with_default_cleanups(options: LowerOptions) -> Self {
        Self::new(options).cleanup(DeadCodeElimination)
    }

    /// Pipeline for the generation named by `selector`.
    ///
    /// Fails on an unknown selector before anything is touched.
    pub fn from_selector(selector: &str) -> LowerResult<Self> {
        Ok(Self::with_default_cleanups(LowerOptions::from_selector(selector)?))
    }

    /// Append a cleanup; cleanups run in registration order.
    pub fn cleanup(mut self, pass: impl CleanupPass + 'static) -> Self {
        self.cleanups.push(Box::new(pass));
        self
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    pub fn run(&self, ctx: &mut IrContext, func: OpRef) -> LowerResult<PipelineReport> {
        debug!(generation = %self.options.target, "stage: lower-vector-to-target");
        let lowering = lower_vector_to_target(ctx, func, &self.options)?;

        let mut cleanups = Vec::with_capacity(self.cleanups.len());
        for pass in &self.cleanups {
            debug!(pass = pass.name(), "stage: cleanup");
            let changes = pass.run(ctx, func);
            debug_assert_valid(ctx, func, pass.name());
            cleanups.push((pass.name(), changes));
        }

        Ok(PipelineReport { lowering, cleanups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecsel_ir::dialect::{arith, func};
    use vecsel_lower::LowerErrorKind;

    #[test]
    fn unknown_selector_fails_before_lowering() {
        let err = Pipeline::from_selector("aie2p").err().unwrap();
        assert!(matches!(err.kind(), LowerErrorKind::UnknownTarget(s) if s == "aie2p"));
    }

    #[test]
    fn cleanups_are_skipped_when_lowering_fails() {
        struct Counting;

        impl CleanupPass for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }

            fn run(&self, _: &mut IrContext, _: OpRef) -> usize {
                panic!("cleanup ran after a failed lowering")
            }
        }

        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let not_a_func = arith::constant_int(&mut ctx, i32_ty, 0);
        let pipeline = Pipeline::new(LowerOptions::default()).cleanup(Counting);
        assert!(pipeline.run(&mut ctx, not_a_func).is_err());

        let (f, entry) = func::func(&mut ctx, "empty", vec![]);
        let ret = func::r#return(&mut ctx, []);
        ctx.push_op(entry, ret);
        let report = Pipeline::with_default_cleanups(LowerOptions::default())
            .run(&mut ctx, f)
            .unwrap();
        assert_eq!(report.cleanups, [("dce", 0)]);
    }
}
