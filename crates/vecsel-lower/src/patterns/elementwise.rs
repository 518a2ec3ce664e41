//! Patterns for elementwise `arith` operations on vectors.
//!
//! - Generation 1: `arith.{addi,addf,subi,subf}` -> `aievec.{add,sub}` with
//!   default shuffle attributes.
//! - Generation 2: `arith.{addi,addf,subi,subf}` -> `aievec.{add,sub}_elem`,
//!   going through the accumulator when the operands are sign- or
//!   float-extended or narrower than a register.
//! - Generation 2: `arith.{minsi,maxsi,minf,maxf}` -> `aievec.{min,max}`.

use vecsel_ir::dialect::aievec;
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern};
use vecsel_ir::{IrContext, OpKind, OpRef, TypeRef, ValueRef, VectorShape};

use super::util::{
    ElemOp, aieml_acc, extension_source, gen_add_elem, is_defined_by, mac_operands, result_shape,
    value_shape,
};
use crate::target::{is_elementwise_shape, is_full_register};

fn roots_of(kind: OpKind) -> &'static [OpKind] {
    match kind {
        OpKind::AddI => &[OpKind::AddI],
        OpKind::AddF => &[OpKind::AddF],
        OpKind::SubI => &[OpKind::SubI],
        OpKind::SubF => &[OpKind::SubF],
        OpKind::MinSI => &[OpKind::MinSI],
        OpKind::MaxSI => &[OpKind::MaxSI],
        OpKind::MinF => &[OpKind::MinF],
        OpKind::MaxF => &[OpKind::MaxF],
        _ => &[],
    }
}

// ============================================================================
// Generation 1
// ============================================================================

/// Pattern for `arith.{addi,addf,subi,subf}` -> `aievec.{add,sub}`.
///
/// An integer add with exactly one multiply operand is left to the
/// multiply-accumulate rule.
pub struct ShuffledAddSub {
    pub kind: OpKind,
}

impl RewritePattern for ShuffledAddSub {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        if result_shape(ctx, op).is_none() {
            return Ok(false);
        }
        let operands = ctx.op_operands(op);
        let (lhs, rhs) = (operands[0], operands[1]);
        if self.kind == OpKind::AddI && mac_operands(ctx, lhs, rhs).is_some() {
            return Ok(false);
        }

        let ty = ctx.op_result_types(op)[0];
        let shuffle = aievec::ShuffleAttrs::default();
        let new_op = match self.kind {
            OpKind::AddI | OpKind::AddF => aievec::add(ctx, ty, lhs, rhs, &shuffle),
            _ => aievec::sub(ctx, ty, lhs, rhs, &shuffle),
        };
        rewriter.replace_op(new_op);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        roots_of(self.kind)
    }

    fn name(&self) -> &'static str {
        match self.kind {
            OpKind::AddI => "AddIToAdd",
            OpKind::AddF => "AddFToAdd",
            OpKind::SubI => "SubIToSub",
            _ => "SubFToSub",
        }
    }
}

// ============================================================================
// Generation 2
// ============================================================================

/// Pattern for `arith.{addi,addf,subi,subf}` -> `aievec.{add,sub}_elem`.
pub struct AddSubToElem {
    pub kind: OpKind,
}

impl AddSubToElem {
    fn elem_op(&self) -> ElemOp {
        match self.kind {
            OpKind::AddI | OpKind::AddF => ElemOp::Add,
            _ => ElemOp::Sub,
        }
    }
}

/// Operands and result of the add or subtract being lowered.
struct Operands {
    lhs: ValueRef,
    rhs: ValueRef,
    result_ty: TypeRef,
    shape: VectorShape,
}

impl RewritePattern for AddSubToElem {
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
        let (lhs, rhs) = (operands[0], operands[1]);
        // Left for the multiply-accumulate rule. An add of two products is
        // not fused and lowers here.
        let fuses = mac_operands(ctx, lhs, rhs).is_some()
            || is_defined_by(ctx, lhs, OpKind::MulF)
            || is_defined_by(ctx, rhs, OpKind::MulF);
        if fuses {
            return Ok(false);
        }
        let operands = Operands {
            lhs,
            rhs,
            result_ty: ctx.op_result_types(op)[0],
            shape,
        };

        let new_op = if shape.is_float {
            self.lower_float(ctx, rewriter, &operands)
        } else {
            self.lower_int(ctx, rewriter, &operands)
        };
        match new_op {
            Some(new_op) => {
                rewriter.replace_op(new_op);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn roots(&self) -> &'static [OpKind] {
        roots_of(self.kind)
    }

    fn name(&self) -> &'static str {
        match self.kind {
            OpKind::AddI => "AddIToAddElem",
            OpKind::AddF => "AddFToAddElem",
            OpKind::SubI => "SubIToSubElem",
            _ => "SubFToSubElem",
        }
    }
}

impl AddSubToElem {
    fn lower_int(
        &self,
        ctx: &mut IrContext,
        rewriter: &mut PatternRewriter<'_>,
        o: &Operands,
    ) -> Option<OpRef> {
        if !is_elementwise_shape(&o.shape) {
            return None;
        }
        let elem = self.elem_op();
        let direct_or_gen = |ctx: &mut IrContext, rewriter: &mut PatternRewriter<'_>| {
            if o.shape.bits() == 512 {
                elem.build(ctx, o.lhs, o.rhs)
            } else {
                gen_add_elem(ctx, rewriter, elem, o.lhs, o.rhs, o.result_ty)
            }
        };

        let no_defs = ctx.defining_op(o.lhs).is_none() && ctx.defining_op(o.rhs).is_none();
        if no_defs {
            return Some(direct_or_gen(ctx, rewriter));
        }
        if o.shape.elem_bits != 32 {
            return Some(elem.build(ctx, o.lhs, o.rhs));
        }

        let lhs_src = extension_source(ctx, o.lhs, OpKind::ExtSI);
        let rhs_src = extension_source(ctx, o.rhs, OpKind::ExtSI);
        let src_bits = |v: ValueRef| value_shape(ctx, v).map_or(0, |s| s.elem_bits);

        match (lhs_src, rhs_src) {
            (None, None) => Some(direct_or_gen(ctx, rewriter)),
            (Some(l), Some(r)) => {
                let (lw, rw) = (src_bits(l), src_bits(r));
                if lw != rw || !(lw == 8 || lw == 16) {
                    return Some(gen_add_elem(ctx, rewriter, elem, o.lhs, o.rhs, o.result_ty));
                }
                let acc_ty = ctx.value_ty(l);
                let acc_ty = aieml_acc(ctx, acc_ty);
                let l = emit_ups(ctx, rewriter, acc_ty, l);
                let r = emit_ups(ctx, rewriter, acc_ty, r);
                let sum = elem.build(ctx, l, r);
                let sum = rewriter.emit(ctx, sum);
                Some(aievec::cast(ctx, o.result_ty, sum, false))
            }
            (l, r) => {
                let lhs_extended = l.is_some();
                let source = l.or(r)?;
                let bits = src_bits(source);
                if !(bits == 8 || bits == 16) || bits * o.shape.lanes != 256 {
                    return Some(gen_add_elem(ctx, rewriter, elem, o.lhs, o.rhs, o.result_ty));
                }
                let other = if lhs_extended { o.rhs } else { o.lhs };
                if bits == 8 {
                    let acc_ty = ctx.value_ty(source);
                    let acc_ty = aieml_acc(ctx, acc_ty);
                    let widened = emit_ups(ctx, rewriter, acc_ty, source);
                    let other = aievec::cast(ctx, o.result_ty, other, true);
                    let other = rewriter.emit(ctx, other);
                    let (l, r) = ordered(lhs_extended, widened, other);
                    let sum = elem.build(ctx, l, r);
                    let sum = rewriter.emit(ctx, sum);
                    Some(aievec::cast(ctx, o.result_ty, sum, false))
                } else {
                    let acc_ty = aieml_acc(ctx, o.result_ty);
                    let widened = emit_ups(ctx, rewriter, acc_ty, source);
                    let other = emit_ups(ctx, rewriter, acc_ty, other);
                    let (l, r) = ordered(lhs_extended, widened, other);
                    let sum = elem.build(ctx, l, r);
                    let sum = rewriter.emit(ctx, sum);
                    Some(aievec::srs(ctx, o.result_ty, sum, 0))
                }
            }
        }
    }

    fn lower_float(
        &self,
        ctx: &mut IrContext,
        rewriter: &mut PatternRewriter<'_>,
        o: &Operands,
    ) -> Option<OpRef> {
        if o.shape.lanes != 16 {
            return None;
        }
        let elem = self.elem_op();

        match o.shape.elem_bits {
            32 => {
                let lhs_src = extension_source(ctx, o.lhs, OpKind::ExtF);
                let rhs_src = extension_source(ctx, o.rhs, OpKind::ExtF);
                match (lhs_src, rhs_src) {
                    (None, None) => {
                        Some(gen_add_elem(ctx, rewriter, elem, o.lhs, o.rhs, o.result_ty))
                    }
                    (Some(l), Some(r)) => {
                        let acc_ty = ctx.value_ty(l);
                        let acc_ty = aieml_acc(ctx, acc_ty);
                        let l = emit_ups(ctx, rewriter, acc_ty, l);
                        let r = emit_ups(ctx, rewriter, acc_ty, r);
                        let sum = elem.build(ctx, l, r);
                        let sum = rewriter.emit(ctx, sum);
                        Some(aievec::cast(ctx, o.result_ty, sum, false))
                    }
                    (l, r) => {
                        let lhs_extended = l.is_some();
                        let source = l.or(r)?;
                        let other = if lhs_extended { o.rhs } else { o.lhs };
                        let acc_ty = ctx.value_ty(source);
                        let acc_ty = aieml_acc(ctx, acc_ty);
                        let widened = emit_ups(ctx, rewriter, acc_ty, source);
                        let other = aievec::cast(ctx, o.result_ty, other, true);
                        let other = rewriter.emit(ctx, other);
                        let (l, r) = ordered(lhs_extended, widened, other);
                        let sum = elem.build(ctx, l, r);
                        let sum = rewriter.emit(ctx, sum);
                        Some(aievec::cast(ctx, o.result_ty, sum, false))
                    }
                }
            }
            16 => {
                let acc_ty = aieml_acc(ctx, o.result_ty);
                let l = emit_ups(ctx, rewriter, acc_ty, o.lhs);
                let r = emit_ups(ctx, rewriter, acc_ty, o.rhs);
                let sum = elem.build(ctx, l, r);
                let sum = rewriter.emit(ctx, sum);
                Some(aievec::srs(ctx, o.result_ty, sum, 0))
            }
            _ => None,
        }
    }
}

fn emit_ups(
    ctx: &mut IrContext,
    rewriter: &mut PatternRewriter<'_>,
    acc_ty: TypeRef,
    value: ValueRef,
) -> ValueRef {
    let ups = aievec::ups(ctx, acc_ty, value, 0);
    rewriter.emit(ctx, ups)
}

/// Put the widened operand back on the side it came from.
fn ordered(lhs_extended: bool, widened: ValueRef, other: ValueRef) -> (ValueRef, ValueRef) {
    if lhs_extended {
        (widened, other)
    } else {
        (other, widened)
    }
}

/// Pattern for `arith.{minsi,maxsi,minf,maxf}` -> `aievec.{min,max}` on
/// exactly one 512-bit register.
pub struct MinMaxToElem {
    pub kind: OpKind,
}

impl RewritePattern for MinMaxToElem {
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
        let (lhs, rhs) = (operands[0], operands[1]);
        let new_op = match self.kind {
            OpKind::MinSI | OpKind::MinF => aievec::min(ctx, lhs, rhs),
            _ => aievec::max(ctx, lhs, rhs),
        };
        rewriter.replace_op(new_op);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        roots_of(self.kind)
    }

    fn name(&self) -> &'static str {
        match self.kind {
            OpKind::MinSI => "MinSIToMin",
            OpKind::MaxSI => "MaxSIToMax",
            OpKind::MinF => "MinFToMin",
            _ => "MaxFToMax",
        }
    }
}
