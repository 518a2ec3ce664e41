//! Patterns for `arith.cmpi`/`arith.cmpf` -> `aievec.cmp` and
//! `arith.select` -> `aievec.sel`.
//!
//! The target keeps lane masks in a 32- or 64-bit unsigned scalar; the
//! boolean vectors of the input are bridged with
//! `builtin.unrealized_conversion_cast`.

use vecsel_ir::dialect::{aievec, arith, builtin};
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern, UnsupportedInput};
use vecsel_ir::{IrContext, OpKind, OpRef, TypeRef};

use super::util::{int_predicate_for_float, operand_shape, result_shape};
use crate::target::is_full_register;

/// Scalar holding one mask bit per lane.
fn mask_type(ctx: &mut IrContext, lanes: u32) -> TypeRef {
    ctx.types.uint(if lanes <= 32 { 32 } else { 64 })
}

/// Pattern for `arith.cmpi`/`arith.cmpf` -> `aievec.cmp` +
/// `builtin.unrealized_conversion_cast`.
pub struct CmpToMask {
    pub kind: OpKind,
}

impl RewritePattern for CmpToMask {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = operand_shape(ctx, op, 0) else {
            return Ok(false);
        };
        if !is_full_register(&shape) {
            return Ok(false);
        }
        let pred = if self.kind == OpKind::CmpF {
            let Some(float_pred) = arith::float_predicate(ctx, op) else {
                return Ok(false);
            };
            int_predicate_for_float(float_pred).ok_or_else(|| {
                UnsupportedInput::new(format!(
                    "float predicate '{}' has no integer counterpart",
                    float_pred.mnemonic()
                ))
            })?
        } else {
            let Some(pred) = arith::int_predicate(ctx, op) else {
                return Ok(false);
            };
            pred
        };

        let operands = ctx.op_operands(op);
        let (lhs, rhs) = (operands[0], operands[1]);
        let result_ty = ctx.op_result_types(op)[0];
        let mask_ty = mask_type(ctx, shape.lanes);
        let cmp = aievec::cmp(ctx, mask_ty, lhs, rhs, pred.mnemonic());
        let mask = rewriter.emit(ctx, cmp);
        let cast = builtin::unrealized_cast(ctx, mask, result_ty);
        rewriter.replace_op(cast);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        match self.kind {
            OpKind::CmpF => &[OpKind::CmpF],
            _ => &[OpKind::CmpI],
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            OpKind::CmpF => "CmpFToCmp",
            _ => "CmpIToCmp",
        }
    }
}

/// Pattern for `arith.select` -> `builtin.unrealized_conversion_cast` +
/// `aievec.sel`.
pub struct SelectToSel;

impl RewritePattern for SelectToSel {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        if !is_full_register(&shape) {
            return Ok(false);
        }
        let operands = ctx.op_operands(op);
        let (cond, on_true, on_false) = (operands[0], operands[1], operands[2]);

        let mask_ty = mask_type(ctx, shape.lanes);
        let mask = builtin::unrealized_cast(ctx, cond, mask_ty);
        let mask = rewriter.emit(ctx, mask);
        let sel = aievec::sel(ctx, on_true, on_false, mask);
        rewriter.replace_op(sel);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Select]
    }

    fn name(&self) -> &'static str {
        "SelectToSel"
    }
}
