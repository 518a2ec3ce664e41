//! PatternApplicator: the fixpoint rewrite driver.
//!
//! Each iteration walks the operations nested under a root operation in
//! block order, visiting nested regions before the operation that owns them.
//! Blocks are snapshotted before the walk; ops whose `parent_block` changed
//! meanwhile were replaced and are skipped. Iteration stops when a full walk
//! changes nothing or the iteration budget runs out.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use super::conversion_target::{ConversionTarget, IllegalOp, LegalityCheck};
use super::pattern::PatternSet;
use super::rewriter::{self, PatternRewriter};
use crate::analysis::AnalysisManager;
use crate::context::IrContext;
use crate::ops::OpKind;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// An operation a pattern explicitly refused to rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub op: OpRef,
    pub kind: OpKind,
    pub pattern: &'static str,
    pub reason: String,
}

/// Result of applying rewrite patterns.
#[derive(Debug)]
pub struct ApplyResult {
    /// Number of fixpoint iterations performed.
    pub iterations: usize,
    /// Total number of rewrites.
    pub total_changes: usize,
    /// Whether the fixpoint was reached (no changes in last iteration).
    pub reached_fixpoint: bool,
    pub rejected: Vec<Rejection>,
}

impl ApplyResult {
    /// Verify that no illegal operations remain.
    pub fn verify(
        &self,
        ctx: &IrContext,
        root: OpRef,
        target: &ConversionTarget,
        analyses: &AnalysisManager,
    ) -> Result<(), Vec<IllegalOp>> {
        let illegal = target.verify(ctx, root, analyses);
        if illegal.is_empty() {
            Ok(())
        } else {
            Err(illegal)
        }
    }
}

pub struct PatternApplicator {
    patterns: PatternSet,
    max_iterations: usize,
}

/// Mutable state of one `apply` call.
struct Driver<'a> {
    target: &'a ConversionTarget,
    analyses: &'a AnalysisManager,
    rejected: Vec<Rejection>,
    rejected_ops: HashSet<OpRef>,
}

impl PatternApplicator {
    pub fn new(patterns: PatternSet) -> Self {
        Self {
            patterns,
            max_iterations: 10,
        }
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Rewrite everything nested under `root` until a fixpoint.
    ///
    /// Does not verify; call [`ApplyResult::verify`] for that.
    pub fn apply(
        &self,
        ctx: &mut IrContext,
        root: OpRef,
        target: &ConversionTarget,
        analyses: &AnalysisManager,
    ) -> ApplyResult {
        let mut driver = Driver {
            target,
            analyses,
            rejected: Vec::new(),
            rejected_ops: HashSet::new(),
        };
        let mut total_changes = 0;
        let mut iterations = 0;
        let mut reached_fixpoint = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let regions = ctx.op(root).regions.to_vec();
            let mut changes = 0;
            for region in regions {
                changes += self.visit_region(ctx, region, &mut driver);
            }
            trace!(iteration = iterations, changes, "rewrite iteration");
            total_changes += changes;
            if changes == 0 {
                reached_fixpoint = true;
                break;
            }
        }

        ApplyResult {
            iterations,
            total_changes,
            reached_fixpoint,
            rejected: driver.rejected,
        }
    }

    fn visit_region(&self, ctx: &mut IrContext, region: RegionRef, driver: &mut Driver<'_>) -> usize {
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        blocks
            .into_iter()
            .map(|block| self.visit_block(ctx, block, driver))
            .sum()
    }

    fn visit_block(&self, ctx: &mut IrContext, block: BlockRef, driver: &mut Driver<'_>) -> usize {
        let mut changes = 0;
        let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();

        for op in ops {
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            let regions: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            for region in regions {
                changes += self.visit_region(ctx, region, driver);
            }
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            if self.visit_op(ctx, op, driver) {
                changes += 1;
            }
        }

        changes
    }

    /// Returns true if the operation was rewritten.
    ///
    /// Unused operations are not erased here; dead code is left to a cleanup
    /// pass so that a graph with nothing illegal sees no changes.
    fn visit_op(&self, ctx: &mut IrContext, op: OpRef, driver: &mut Driver<'_>) -> bool {
        let kind = ctx.op_kind(op);
        let legality = driver.target.is_legal(ctx, op, driver.analyses);
        if legality == LegalityCheck::Legal || driver.rejected_ops.contains(&op) {
            return false;
        }

        for pattern in self.patterns.for_kind(kind) {
            let mut rw = PatternRewriter::new(driver.analyses);
            match pattern.match_and_rewrite(ctx, op, &mut rw) {
                Ok(true) if rw.has_mutations() => {
                    debug!(%op, %kind, pattern = pattern.name(), "rewrote operation");
                    let mutations = rw.take_mutations();
                    // Cached facts about producers feeding the new ops may now be stale.
                    let touched: Vec<OpRef> = mutations
                        .new_ops()
                        .flat_map(|new_op| ctx.op_operands(new_op).to_vec())
                        .filter_map(|v| ctx.defining_op(v))
                        .collect();
                    rewriter::apply_mutations(ctx, op, mutations);
                    driver.analyses.invalidate(op);
                    for producer in touched {
                        driver.analyses.invalidate(producer);
                    }
                    return true;
                }
                Ok(_) => {}
                Err(rejection) => {
                    warn!(%op, %kind, pattern = pattern.name(), reason = %rejection, "operation rejected");
                    driver.rejected_ops.insert(op);
                    driver.rejected.push(Rejection {
                        op,
                        kind,
                        pattern: pattern.name(),
                        reason: rejection.reason,
                    });
                    return false;
                }
            }
        }

        if legality == LegalityCheck::Illegal {
            trace!(%op, %kind, "no pattern applies");
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{aievec, arith, func, vector};
    use crate::ops::Dialect;
    use crate::rewrite::pattern::{MatchResult, RewritePattern, UnsupportedInput};

    /// arith.addi → aievec.add_elem
    struct AddToAddElem;

    impl RewritePattern for AddToAddElem {
        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter<'_>,
        ) -> MatchResult {
            let [lhs, rhs] = ctx.op_operands(op) else {
                return Ok(false);
            };
            let (lhs, rhs) = (*lhs, *rhs);
            let new_op = aievec::add_elem(ctx, lhs, rhs);
            rewriter.replace_op(new_op);
            Ok(true)
        }

        fn roots(&self) -> &'static [OpKind] {
            &[OpKind::AddI]
        }
    }

    struct RejectSub;

    impl RewritePattern for RejectSub {
        fn match_and_rewrite(
            &self,
            _: &mut IrContext,
            _: OpRef,
            _: &mut PatternRewriter<'_>,
        ) -> MatchResult {
            Err(UnsupportedInput::new("subtraction is not supported"))
        }

        fn roots(&self) -> &'static [OpKind] {
            &[OpKind::SubI]
        }

        fn name(&self) -> &'static str {
            "reject-sub"
        }
    }

    fn target() -> ConversionTarget {
        let mut target = ConversionTarget::new();
        target
            .add_legal_dialect(Dialect::AieVec)
            .add_illegal_op(OpKind::AddI)
            .add_illegal_op(OpKind::SubI)
            .add_illegal_op(OpKind::MulI);
        target
    }

    #[test]
    fn rewrites_and_preserves_uses() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(16, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let add = arith::addi(&mut ctx, args[0], args[1]);
        let sum = ctx.op_result(add, 0);
        let ret = func::r#return(&mut ctx, [sum]);
        ctx.push_op(entry, add);
        ctx.push_op(entry, ret);

        let applicator = PatternApplicator::new(PatternSet::new().add(AddToAddElem));
        let target = target();
        let am = AnalysisManager::new();
        let result = applicator.apply(&mut ctx, f, &target, &am);

        assert!(result.reached_fixpoint);
        assert_eq!(result.total_changes, 1);
        assert_eq!(result.iterations, 2);
        assert!(result.verify(&ctx, f, &target, &am).is_ok());

        let ops = ctx.block(entry).ops.to_vec();
        assert_eq!(ops.len(), 2);
        assert_eq!(ctx.op_kind(ops[0]), OpKind::AddElem);
        assert_eq!(ctx.op_operands(ops[1]), &[ctx.op_result(ops[0], 0)]);
    }

    #[test]
    fn dead_ops_are_kept_and_rejections_recorded() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(16, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let dead_mul = arith::muli(&mut ctx, args[0], args[1]);
        let sub = arith::subi(&mut ctx, args[0], args[1]);
        let diff = ctx.op_result(sub, 0);
        let ret = func::r#return(&mut ctx, [diff]);
        for op in [dead_mul, sub, ret] {
            ctx.push_op(entry, op);
        }

        let applicator = PatternApplicator::new(PatternSet::new().add(RejectSub));
        let target = target();
        let am = AnalysisManager::new();
        let result = applicator.apply(&mut ctx, f, &target, &am);

        assert!(result.reached_fixpoint);
        assert_eq!(result.total_changes, 0);
        assert_eq!(
            result.rejected,
            vec![Rejection {
                op: sub,
                kind: OpKind::SubI,
                pattern: "reject-sub",
                reason: "subtraction is not supported".into(),
            }]
        );
        let illegal = result.verify(&ctx, f, &target, &am).unwrap_err();
        let illegal: Vec<OpRef> = illegal.iter().map(|i| i.op).collect();
        assert_eq!(illegal, [dead_mul, sub]);
        assert_eq!(ctx.block(entry).ops.as_slice(), &[dead_mul, sub, ret]);
    }

    #[test]
    fn unused_unknown_op_is_not_a_change() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(16, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let unused = vector::extract(&mut ctx, args[0], 2);
        let ret = func::r#return(&mut ctx, []);
        ctx.push_op(entry, unused);
        ctx.push_op(entry, ret);

        let target = target();
        let am = AnalysisManager::new();
        assert_eq!(target.is_legal(&ctx, unused, &am), LegalityCheck::Unknown);
        let applicator = PatternApplicator::new(PatternSet::new().add(AddToAddElem));
        let result = applicator.apply(&mut ctx, f, &target, &am);
        assert_eq!(result.total_changes, 0);
        assert_eq!(result.iterations, 1);
        assert_eq!(ctx.block(entry).ops.as_slice(), &[unused, ret]);
    }

    #[test]
    fn legal_graph_is_left_alone() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(16, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let add = aievec::add_elem(&mut ctx, args[0], args[1]);
        let sum = ctx.op_result(add, 0);
        let ret = func::r#return(&mut ctx, [sum]);
        ctx.push_op(entry, add);
        ctx.push_op(entry, ret);

        let applicator = PatternApplicator::new(PatternSet::new().add(AddToAddElem));
        let result = applicator.apply(&mut ctx, f, &target(), &AnalysisManager::new());
        assert_eq!(result.total_changes, 0);
        assert_eq!(result.iterations, 1);
    }
}
