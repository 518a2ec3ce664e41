//! Patterns for `arith.muli`/`arith.mulf` -> `aievec.mul_elem` (generation 2).
//!
//! A multiply whose only use is an add is left alone; the add turns the
//! pair into a multiply-accumulate instead.

use vecsel_ir::dialect::aievec;
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern};
use vecsel_ir::{IrContext, OpKind, OpRef, ValueRef};

use super::util::{
    aieml_acc, create_mul_elem, extension_source, has_single_use_by, result_shape, value_shape,
};

/// Sources of two extended operands, if both are extended from `bits`-wide lanes.
fn extended_pair(
    ctx: &IrContext,
    lhs: ValueRef,
    rhs: ValueRef,
    kind: OpKind,
) -> Option<(ValueRef, ValueRef, u32)> {
    let l = extension_source(ctx, lhs, kind)?;
    let r = extension_source(ctx, rhs, kind)?;
    let lw = value_shape(ctx, l)?.elem_bits;
    let rw = value_shape(ctx, r)?.elem_bits;
    (lw == rw).then_some((l, r, lw))
}

/// Pattern for `arith.muli` -> `aievec.mul_elem` + `aievec.srs`/`aievec.cast`.
pub struct MulIToMulElem {
    pub shift: i64,
}

impl RewritePattern for MulIToMulElem {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        if has_single_use_by(ctx, op, OpKind::AddI) {
            return Ok(false);
        }
        let (lanes, width) = shape.pair();
        let narrow = lanes == 32 && (width == 16 || width == 8);
        let wide = (lanes == 16 || lanes == 32) && width == 32;
        if !(narrow || wide) {
            return Ok(false);
        }

        let operands = ctx.op_operands(op);
        let (lhs, rhs) = (operands[0], operands[1]);
        let result_ty = ctx.op_result_types(op)[0];

        if (lanes, width) == (32, 32) {
            match extended_pair(ctx, lhs, rhs, OpKind::ExtSI) {
                Some((l, r, 8)) => {
                    let src_ty = ctx.value_ty(l);
                    let product = create_mul_elem(ctx, rewriter, l, r, src_ty, 8);
                    rewriter.replace_op(aievec::cast(ctx, result_ty, product, false));
                    return Ok(true);
                }
                Some((l, r, 16)) => {
                    let src_ty = ctx.value_ty(l);
                    let acc_ty = aieml_acc(ctx, src_ty);
                    let product = aievec::mul_elem(ctx, acc_ty, l, r);
                    let product = rewriter.emit(ctx, product);
                    rewriter.replace_op(aievec::cast(ctx, result_ty, product, false));
                    return Ok(true);
                }
                // Without narrow sources the product is taken at full width below.
                _ => {}
            }
        } else if (lanes, width) == (32, 8) {
            let product = create_mul_elem(ctx, rewriter, lhs, rhs, result_ty, 8);
            rewriter.replace_op(aievec::srs(ctx, result_ty, product, self.shift));
            return Ok(true);
        }

        let acc_ty = aieml_acc(ctx, result_ty);
        let product = aievec::mul_elem(ctx, acc_ty, lhs, rhs);
        let product = rewriter.emit(ctx, product);
        rewriter.replace_op(aievec::srs(ctx, result_ty, product, self.shift));
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::MulI]
    }

    fn name(&self) -> &'static str {
        "MulIToMulElem"
    }
}

/// Pattern for 16-lane `arith.mulf` -> `aievec.mul_elem`.
///
/// A bf16 product is narrowed with `srs`; an f32 product of two
/// bf16-extended operands is taken from the bf16 sources and cast back.
pub struct MulFToMulElem {
    pub shift: i64,
}

impl RewritePattern for MulFToMulElem {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        if has_single_use_by(ctx, op, OpKind::AddF) {
            return Ok(false);
        }
        if shape.lanes != 16 || !(shape.elem_bits == 16 || shape.elem_bits == 32) {
            return Ok(false);
        }

        let operands = ctx.op_operands(op);
        let (lhs, rhs) = (operands[0], operands[1]);
        let result_ty = ctx.op_result_types(op)[0];

        if shape.elem_bits == 16 {
            let product = create_mul_elem(ctx, rewriter, lhs, rhs, result_ty, 16);
            rewriter.replace_op(aievec::srs(ctx, result_ty, product, self.shift));
            return Ok(true);
        }

        let Some((l, r, 16)) = extended_pair(ctx, lhs, rhs, OpKind::ExtF) else {
            return Ok(false);
        };
        let src_ty = ctx.value_ty(l);
        let product = create_mul_elem(ctx, rewriter, l, r, src_ty, 16);
        rewriter.replace_op(aievec::cast(ctx, result_ty, product, false));
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::MulF]
    }

    fn name(&self) -> &'static str {
        "MulFToMulElem"
    }
}
