//! Patterns for `vector.reduction` -> log-step shift-and-combine trees.
//!
//! Each step shifts the running vector down by half of the remaining lanes
//! and combines it with itself; lane 0 holds the result at the end.
//!
//! ```text
//! %r = vector.reduction <maxsi>, %v : vector<16xi32> into i32
//! ```
//!
//! becomes four `aievec.shift` + `aievec.max` steps (shifting 32, 16, 8 and
//! 4 bytes) followed by `aievec.ext_elem` of lane 0.

use vecsel_ir::dialect::{aievec, vector};
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern};
use vecsel_ir::{CombiningKind, IrContext, OpKind, OpRef, ValueRef, VectorShape};

use super::util::{aieml_acc, i32_constant, operand_shape, reduction_tree};
use crate::target::is_elementwise_shape;

/// Combining kind and input shape of a reduction.
fn reduction_input(ctx: &IrContext, op: OpRef) -> Option<(CombiningKind, VectorShape, ValueRef)> {
    let kind = vector::combining_kind(ctx, op)?;
    let shape = operand_shape(ctx, op, 0)?;
    Some((kind, shape, ctx.op_operands(op)[0]))
}

/// Pattern for `vector.reduction <minsi|minui|minf>` -> `aievec.min` tree.
pub struct MinReduction;

impl RewritePattern for MinReduction {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some((kind, shape, input)) = reduction_input(ctx, op) else {
            return Ok(false);
        };
        if !kind.is_min() || shape.bits() != 512 {
            return Ok(false);
        }
        let tree = reduction_tree(ctx, rewriter, aievec::min, shape.lanes / 2, input);
        rewriter.replace_op(tree);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Reduction]
    }

    fn name(&self) -> &'static str {
        "MinReduction"
    }
}

/// Pattern for `vector.reduction <maxsi|maxui|maxf>` -> `aievec.max` tree.
pub struct MaxReduction;

impl RewritePattern for MaxReduction {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some((kind, shape, input)) = reduction_input(ctx, op) else {
            return Ok(false);
        };
        if !kind.is_max() || shape.bits() != 512 {
            return Ok(false);
        }
        let tree = reduction_tree(ctx, rewriter, aievec::max, shape.lanes / 2, input);
        rewriter.replace_op(tree);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Reduction]
    }

    fn name(&self) -> &'static str {
        "MaxReduction"
    }
}

/// Pattern for integer `vector.reduction <add>` -> `aievec.add_elem` tree.
///
/// A 32 x i32 input spans two registers; its halves are added first.
pub struct IntAddReduction;

impl RewritePattern for IntAddReduction {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some((kind, shape, input)) = reduction_input(ctx, op) else {
            return Ok(false);
        };
        if kind != CombiningKind::Add || shape.is_float || !is_elementwise_shape(&shape) {
            return Ok(false);
        }

        let mut shift_index = shape.lanes / 2;
        let mut value = input;
        if shape.pair() == (32, 32) {
            let half_ty = ctx.types.vector(shape.lanes / 2, shape.elem);
            let lo = aievec::ext(ctx, half_ty, input, 0);
            let lo = rewriter.emit(ctx, lo);
            let hi = aievec::ext(ctx, half_ty, input, 1);
            let hi = rewriter.emit(ctx, hi);
            let sum = aievec::add_elem(ctx, lo, hi);
            value = rewriter.emit(ctx, sum);
            shift_index /= 2;
        }
        let tree = reduction_tree(ctx, rewriter, aievec::add_elem, shift_index, value);
        rewriter.replace_op(tree);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Reduction]
    }

    fn name(&self) -> &'static str {
        "IntAddReduction"
    }
}

/// Pattern for 16 x f32 `vector.reduction <add>`. Every step adds in
/// accumulator form through `aievec.cast`.
pub struct F32AddReduction;

impl RewritePattern for F32AddReduction {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some((kind, shape, input)) = reduction_input(ctx, op) else {
            return Ok(false);
        };
        if kind != CombiningKind::Add || !shape.is_float || shape.pair() != (16, 32) {
            return Ok(false);
        }

        let vec_ty = ctx.value_ty(input);
        let mut current = input;
        let mut id = shape.lanes / 2;
        while id > 0 {
            let bytes = i32_constant(ctx, rewriter, (id * shape.elem_bits / 8) as i64);
            let shifted = aievec::shift(ctx, vec_ty, current, current, bytes, false);
            let shifted = rewriter.emit(ctx, shifted);
            let l = aievec::cast(ctx, vec_ty, current, true);
            let l = rewriter.emit(ctx, l);
            let r = aievec::cast(ctx, vec_ty, shifted, true);
            let r = rewriter.emit(ctx, r);
            let sum = aievec::add_elem(ctx, l, r);
            let sum = rewriter.emit(ctx, sum);
            let back = aievec::cast(ctx, vec_ty, sum, false);
            current = rewriter.emit(ctx, back);
            id /= 2;
        }

        let lane = i32_constant(ctx, rewriter, 0);
        let result = aievec::ext_elem(ctx, shape.elem, current, lane);
        rewriter.replace_op(result);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Reduction]
    }

    fn name(&self) -> &'static str {
        "F32AddReduction"
    }
}

/// Pattern for 16 x bf16 `vector.reduction <add>`.
///
/// The tree runs on the f32 accumulator; the narrowed result is doubled to
/// a full register before lane 0 is read.
pub struct Bf16AddReduction;

impl RewritePattern for Bf16AddReduction {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some((kind, shape, input)) = reduction_input(ctx, op) else {
            return Ok(false);
        };
        if kind != CombiningKind::Add || !shape.is_float || shape.pair() != (16, 16) {
            return Ok(false);
        }

        let vec_ty = ctx.value_ty(input);
        let acc_ty = aieml_acc(ctx, vec_ty);
        let acc_bits = ctx
            .types
            .vector_shape(acc_ty)
            .map_or(32, |acc| acc.elem_bits);

        let ups = aievec::ups(ctx, acc_ty, input, 0);
        let mut current = rewriter.emit(ctx, ups);
        let mut id = shape.lanes / 2;
        while id > 0 {
            let bytes = i32_constant(ctx, rewriter, (id * acc_bits / 8) as i64);
            let shifted = aievec::shift(ctx, acc_ty, current, current, bytes, true);
            let shifted = rewriter.emit(ctx, shifted);
            let sum = aievec::add_elem(ctx, current, shifted);
            current = rewriter.emit(ctx, sum);
            id /= 2;
        }

        let narrowed = aievec::srs(ctx, vec_ty, current, 0);
        let narrowed = rewriter.emit(ctx, narrowed);
        let doubled_ty = ctx.types.vector(shape.lanes * 2, shape.elem);
        let doubled = aievec::concat(ctx, doubled_ty, &[narrowed, narrowed]);
        let doubled = rewriter.emit(ctx, doubled);
        let lane = i32_constant(ctx, rewriter, 0);
        let result = aievec::ext_elem(ctx, shape.elem, doubled, lane);
        rewriter.replace_op(result);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Reduction]
    }

    fn name(&self) -> &'static str {
        "Bf16AddReduction"
    }
}
