//! Patterns for `arith.addi(arith.muli(a, b), c)` -> multiply-accumulate.
//!
//! - Generation 1: `aievec.ups` + `aievec.fma` + `aievec.srs`, with the left
//!   operand doubled through `aievec.concat`.
//! - Generation 2: `aievec.ups` + `aievec.fma_elem` + `aievec.srs`.
//!
//! The generation-1 `fma` can further absorb a splat of one extracted lane
//! into its `z` shuffle attributes ([`FoldBroadcastToFma`]).

use vecsel_ir::dialect::{aievec, arith, vector};
use vecsel_ir::ops::attr;
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern};
use vecsel_ir::{IrContext, OpKind, OpRef, TypeData};

use super::util::{aieml_acc, defining_op_of, mac_operands, result_shape};
use crate::target::{TargetGeneration, accumulator_type};

/// Pattern for `arith.addi(arith.muli)` -> `aievec.fma_elem` (generation 2).
pub struct MulAddToFmaElem {
    pub shift: i64,
}

impl RewritePattern for MulAddToFmaElem {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        let operands = ctx.op_operands(op);
        let Some(mac) = mac_operands(ctx, operands[0], operands[1]) else {
            return Ok(false);
        };
        if !matches!(shape.pair(), (32, 16) | (16, 32)) {
            return Ok(false);
        }

        let result_ty = ctx.op_result_types(op)[0];
        let acc_ty = ctx.value_ty(mac.acc);
        let acc_ty = aieml_acc(ctx, acc_ty);
        let ups = aievec::ups(ctx, acc_ty, mac.acc, self.shift);
        let ups = rewriter.emit(ctx, ups);
        let fma = aievec::fma_elem(ctx, mac.lhs, mac.rhs, ups, false);
        let fma = rewriter.emit(ctx, fma);
        let srs = aievec::srs(ctx, result_ty, fma, self.shift);
        rewriter.replace_op(srs);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::AddI]
    }

    fn name(&self) -> &'static str {
        "MulAddToFmaElem"
    }
}

/// Pattern for `arith.addi(arith.muli)` -> `aievec.fma` (generation 1).
pub struct MulAddToFma;

impl RewritePattern for MulAddToFma {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        let operands = ctx.op_operands(op);
        let Some(mac) = mac_operands(ctx, operands[0], operands[1]) else {
            return Ok(false);
        };

        let vec_ty = ctx.op_result_types(op)[0];
        let acc_src_ty = ctx.value_ty(mac.acc);
        let Some(acc_ty) = accumulator_type(&mut ctx.types, acc_src_ty, TargetGeneration::Aie)
        else {
            return Ok(false);
        };
        let doubled_ty = ctx.types.vector(shape.lanes * 2, shape.elem);

        let doubled = aievec::concat(ctx, doubled_ty, &[mac.lhs, mac.lhs]);
        let doubled = rewriter.emit(ctx, doubled);
        let ups = aievec::ups(ctx, acc_ty, mac.acc, 0);
        let ups = rewriter.emit(ctx, ups);
        let fma = aievec::fma(
            ctx,
            acc_ty,
            doubled,
            mac.rhs,
            ups,
            &aievec::ShuffleAttrs::default(),
            false,
        );
        let fma = rewriter.emit(ctx, fma);
        let srs = aievec::srs(ctx, vec_ty, fma, 0);
        rewriter.replace_op(srs);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::AddI]
    }

    fn name(&self) -> &'static str {
        "MulAddToFma"
    }
}

/// Pattern for `aievec.fma(concat(broadcast(extract v[p])), z)` ->
/// `aievec.fma(concat(z, 0), v)` with `zstart = p`.
///
/// The splat may sit either in the first source of the left concat or in
/// the right operand; the other side becomes the new left operand.
pub struct FoldBroadcastToFma;

impl RewritePattern for FoldBroadcastToFma {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let operands = ctx.op_operands(op).to_vec();
        let (lhs, rhs, acc) = (operands[0], operands[1], operands[2]);
        let Some(concat) = defining_op_of(ctx, lhs, OpKind::Concat) else {
            return Ok(false);
        };
        let first = ctx.op_operands(concat)[0];
        let (splat, new_lhs) = match defining_op_of(ctx, first, OpKind::Broadcast) {
            Some(b) => (b, rhs),
            None => match defining_op_of(ctx, rhs, OpKind::Broadcast) {
                Some(b) => (b, first),
                None => return Ok(false),
            },
        };
        let Some(extract) = defining_op_of(ctx, ctx.op_operands(splat)[0], OpKind::Extract) else {
            return Ok(false);
        };
        let new_rhs = ctx.op_operands(extract)[0];
        let Some(position) = vector::extract_position(ctx, extract) else {
            return Ok(false);
        };

        let concat_ty = ctx.op_result_types(concat)[0];
        let lhs_elem = ctx.types.element_type(ctx.value_ty(lhs));
        let width = match ctx.types.get(lhs_elem) {
            TypeData::Int { width, .. } => *width,
            _ => return Ok(false),
        };
        let mut shuffle = aievec::ShuffleAttrs::of(ctx, op);
        match width {
            16 => {
                shuffle.x.start = "0".into();
                shuffle.x.offsets = "0x73727170".into();
                shuffle.x.offsets_hi = "0x77767574".into();
                shuffle.x.square = "0x3120".into();
                shuffle.z.start = position.to_string();
                shuffle.z.offsets = "0".into();
                shuffle.z.offsets_hi = "0".into();
                shuffle.z.step = "1".into();
            }
            32 => {
                shuffle.x.start = "0".into();
                shuffle.x.offsets = "0x76543210".into();
                shuffle.z.start = position.to_string();
                shuffle.z.offsets = "0x00000000".into();
            }
            _ => return Ok(false),
        }
        let fmsub = ctx.bool_attr(op, attr::FMSUB).unwrap_or(false);
        let result_ty = ctx.op_result_types(op)[0];

        let lhs_ty = ctx.value_ty(new_lhs);
        let zero = arith::constant_zero(ctx, lhs_ty);
        let zero = rewriter.emit(ctx, zero);
        let padded = aievec::concat(ctx, concat_ty, &[new_lhs, zero]);
        let padded = rewriter.emit(ctx, padded);
        let fma = aievec::fma(ctx, result_ty, padded, new_rhs, acc, &shuffle, fmsub);
        rewriter.replace_op(fma);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Fma]
    }

    fn name(&self) -> &'static str {
        "FoldBroadcastToFma"
    }
}
