//! The `lower_vector_to_target` pass.
//!
//! Rewrites every illegal operation nested in a `func.func` with the rule set
//! of the selected generation, then checks what is left against that
//! generation's legality oracle.

use tracing::{debug, warn};
use vecsel_ir::rewrite::{IllegalOp, PatternApplicator};
use vecsel_ir::validation::debug_assert_valid;
use vecsel_ir::{AnalysisManager, IrContext, OpKind, OpRef};

use crate::errors::{LowerError, LowerResult};
use crate::legality::conversion_target;
use crate::options::LowerOptions;
use crate::patterns::pattern_set;
use crate::target::TargetGeneration;

/// Outcome of a successful lowering.
#[derive(Clone, Debug, PartialEq)]
pub struct LowerReport {
    pub target: TargetGeneration,
    /// Driver iterations run.
    pub iterations: usize,
    /// Pattern rewrites applied.
    pub rewrites: usize,
    /// Operations still illegal. Only populated when
    /// [`LowerOptions::fail_on_illegal`] is off.
    pub remaining: Vec<IllegalOp>,
}

/// Lower the vector operations of `func` to target instructions.
///
/// The graph is rewritten in place and not rolled back on failure.
pub fn lower_vector_to_target(
    ctx: &mut IrContext,
    func: OpRef,
    options: &LowerOptions,
) -> LowerResult<LowerReport> {
    let kind = ctx.op_kind(func);
    if kind != OpKind::Func {
        return Err(LowerError::not_a_function(kind));
    }

    let analyses = AnalysisManager::new();
    let target = conversion_target(options.target);
    let patterns = pattern_set(options);
    debug!(
        generation = options.target.selector(),
        patterns = patterns.len(),
        "lowering vector operations"
    );

    let result = PatternApplicator::new(patterns)
        .with_max_iterations(options.max_iterations)
        .apply(ctx, func, &target, &analyses);
    debug!(
        iterations = result.iterations,
        changes = result.total_changes,
        fixpoint = result.reached_fixpoint,
        "rewrite driver finished"
    );

    if let Some(rejection) = result.rejected.first() {
        warn!(
            op = %rejection.op,
            kind = %rejection.kind,
            pattern = rejection.pattern,
            "{}",
            rejection.reason
        );
        return Err(LowerError::unsupported(
            rejection.op,
            rejection.kind,
            &rejection.reason,
        ));
    }

    let remaining = match result.verify(ctx, func, &target, &analyses) {
        Ok(()) => Vec::new(),
        Err(illegal) => {
            for op in &illegal {
                warn!(op = %op.op, kind = %op.kind, "operation left illegal");
            }
            if options.fail_on_illegal {
                return Err(LowerError::illegal_operations(illegal));
            }
            illegal
        }
    };

    debug_assert_valid(ctx, func, "lower-vector-to-target");
    Ok(LowerReport {
        target: options.target,
        iterations: result.iterations,
        rewrites: result.total_changes,
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LowerErrorKind;
    use vecsel_ir::dialect::{arith, func};

    #[test]
    fn rejects_non_function_roots() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let c = arith::constant_int(&mut ctx, i32_ty, 1);
        let err = lower_vector_to_target(&mut ctx, c, &LowerOptions::default()).unwrap_err();
        assert!(matches!(err.kind(), LowerErrorKind::NotAFunction(OpKind::Constant)));
    }

    #[test]
    fn legal_function_is_untouched() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let (f, entry) = func::func(&mut ctx, "scalar", vec![i32_ty, i32_ty]);
        let args = ctx.block_args(entry).to_vec();
        let add = arith::addi(&mut ctx, args[0], args[1]);
        let sum = ctx.op_result(add, 0);
        let ret = func::r#return(&mut ctx, [sum]);
        ctx.push_op(entry, add);
        ctx.push_op(entry, ret);

        let report = lower_vector_to_target(&mut ctx, f, &LowerOptions::default()).unwrap();
        assert_eq!(report.rewrites, 0);
        assert_eq!(report.iterations, 1);
        assert!(report.remaining.is_empty());
        assert_eq!(ctx.block(entry).ops.len(), 2);
    }
}
