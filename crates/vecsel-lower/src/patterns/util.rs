//! Helpers shared by the rewrite rules and the legality oracles.

use vecsel_ir::dialect::{aievec, arith};
use vecsel_ir::rewrite::PatternRewriter;
use vecsel_ir::{FloatPredicate, IntPredicate, IrContext, OpKind, OpRef, TypeRef, ValueRef, VectorShape};

use crate::target::{TargetGeneration, accumulator_type};

pub(crate) fn value_shape(ctx: &IrContext, value: ValueRef) -> Option<VectorShape> {
    ctx.types.vector_shape(ctx.value_ty(value))
}

/// Shape of the first result, if it is a vector.
pub(crate) fn result_shape(ctx: &IrContext, op: OpRef) -> Option<VectorShape> {
    let ty = *ctx.op_result_types(op).first()?;
    ctx.types.vector_shape(ty)
}

pub(crate) fn operand_shape(ctx: &IrContext, op: OpRef, index: usize) -> Option<VectorShape> {
    let value = *ctx.op_operands(op).get(index)?;
    value_shape(ctx, value)
}

/// The operation defining `value`, if it has kind `kind`.
pub(crate) fn defining_op_of(ctx: &IrContext, value: ValueRef, kind: OpKind) -> Option<OpRef> {
    ctx.defining_op(value)
        .filter(|&op| ctx.op_kind(op) == kind)
}

pub(crate) fn is_defined_by(ctx: &IrContext, value: ValueRef, kind: OpKind) -> bool {
    defining_op_of(ctx, value, kind).is_some()
}

/// The first result of `op` has exactly one use, and that use is an `kind` operation.
pub(crate) fn has_single_use_by(ctx: &IrContext, op: OpRef, kind: OpKind) -> bool {
    let Some(&result) = ctx.op_results(op).first() else {
        return false;
    };
    match ctx.uses(result) {
        [only] => ctx.op_kind(only.user) == kind,
        _ => false,
    }
}

/// Source of `value` when it is produced by an extension of kind `kind`.
pub(crate) fn extension_source(ctx: &IrContext, value: ValueRef, kind: OpKind) -> Option<ValueRef> {
    defining_op_of(ctx, value, kind).map(|ext| ctx.op_operands(ext)[0])
}

/// Operands of the multiply-accumulate an add of `lhs` and `rhs` can become.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MacOperands {
    pub lhs: ValueRef,
    pub rhs: ValueRef,
    pub acc: ValueRef,
}

/// If exactly one side of `lhs + rhs` is an integer multiply, the multiply's
/// operands and the other side.
pub(crate) fn mac_operands(ctx: &IrContext, lhs: ValueRef, rhs: ValueRef) -> Option<MacOperands> {
    let (mul, acc) = match (
        defining_op_of(ctx, lhs, OpKind::MulI),
        defining_op_of(ctx, rhs, OpKind::MulI),
    ) {
        (Some(mul), None) => (mul, rhs),
        (None, Some(mul)) => (mul, lhs),
        _ => return None,
    };
    let operands = ctx.op_operands(mul);
    Some(MacOperands {
        lhs: operands[0],
        rhs: operands[1],
        acc,
    })
}

/// Generation-2 accumulator type for `ty`; `ty` must be a vector.
pub(crate) fn aieml_acc(ctx: &mut IrContext, ty: TypeRef) -> TypeRef {
    accumulator_type(&mut ctx.types, ty, TargetGeneration::AieMl).unwrap_or(ty)
}

pub(crate) fn i32_constant(ctx: &mut IrContext, rewriter: &mut PatternRewriter<'_>, value: i64) -> ValueRef {
    let i32_ty = ctx.types.int(32);
    let op = arith::constant_int(ctx, i32_ty, value);
    rewriter.emit(ctx, op)
}

/// Elementwise add or subtract of the generation-2 instruction set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ElemOp {
    Add,
    Sub,
}

impl ElemOp {
    pub(crate) fn build(self, ctx: &mut IrContext, lhs: ValueRef, rhs: ValueRef) -> OpRef {
        match self {
            ElemOp::Add => aievec::add_elem(ctx, lhs, rhs),
            ElemOp::Sub => aievec::sub_elem(ctx, lhs, rhs),
        }
    }
}

/// Elementwise `op` on accumulator views of `lhs` and `rhs`, cast back to
/// `result_ty`. Returns the final cast, not yet inserted.
pub(crate) fn gen_add_elem(
    ctx: &mut IrContext,
    rewriter: &mut PatternRewriter<'_>,
    op: ElemOp,
    lhs: ValueRef,
    rhs: ValueRef,
    result_ty: TypeRef,
) -> OpRef {
    let l = aievec::cast(ctx, result_ty, lhs, true);
    let l = rewriter.emit(ctx, l);
    let r = aievec::cast(ctx, result_ty, rhs, true);
    let r = rewriter.emit(ctx, r);
    let elem = op.build(ctx, l, r);
    let elem = rewriter.emit(ctx, elem);
    aievec::cast(ctx, result_ty, elem, false)
}

/// `mul_elem` of two half-register operands.
///
/// The 8-bit and 16-bit float multipliers read a full 512-bit register, so
/// both operands are padded with a zero upper half first. Emits everything
/// and returns the accumulator-typed product.
pub(crate) fn create_mul_elem(
    ctx: &mut IrContext,
    rewriter: &mut PatternRewriter<'_>,
    lhs: ValueRef,
    rhs: ValueRef,
    src_ty: TypeRef,
    elem_bits: u32,
) -> ValueRef {
    let acc_ty = aieml_acc(ctx, src_ty);
    let elem = ctx.types.element_type(src_ty);
    let wide_ty = ctx.types.vector(512 / elem_bits, elem);

    let zero = arith::constant_zero(ctx, elem);
    let zero = rewriter.emit(ctx, zero);
    let splat = aievec::broadcast_scalar(ctx, wide_ty, zero);
    let splat = rewriter.emit(ctx, splat);
    let half = aievec::ext(ctx, src_ty, splat, 0);
    let half = rewriter.emit(ctx, half);

    let l = aievec::concat(ctx, wide_ty, &[lhs, half]);
    let l = rewriter.emit(ctx, l);
    let r = aievec::concat(ctx, wide_ty, &[rhs, half]);
    let r = rewriter.emit(ctx, r);
    let product = aievec::mul_elem(ctx, acc_ty, l, r);
    rewriter.emit(ctx, product)
}

/// Integer predicate used for a float comparison on the target.
pub(crate) fn int_predicate_for_float(pred: FloatPredicate) -> Option<IntPredicate> {
    Some(match pred {
        FloatPredicate::Ueq | FloatPredicate::Oeq => IntPredicate::Eq,
        FloatPredicate::Ugt => IntPredicate::Ugt,
        FloatPredicate::Ogt => IntPredicate::Sgt,
        FloatPredicate::Uge => IntPredicate::Uge,
        FloatPredicate::Oge => IntPredicate::Sge,
        FloatPredicate::Ult => IntPredicate::Ult,
        FloatPredicate::Olt => IntPredicate::Slt,
        FloatPredicate::Ule => IntPredicate::Ule,
        FloatPredicate::Ole => IntPredicate::Sle,
        FloatPredicate::Une | FloatPredicate::One => IntPredicate::Ne,
        FloatPredicate::AlwaysFalse
        | FloatPredicate::AlwaysTrue
        | FloatPredicate::Ord
        | FloatPredicate::Uno => return None,
    })
}

/// Log-step reduction of `value`: combine it with itself shifted down by
/// `shift_index` lanes, halving until one lane is left, then read lane 0.
/// Returns the final `ext_elem`, not yet inserted.
pub(crate) fn reduction_tree(
    ctx: &mut IrContext,
    rewriter: &mut PatternRewriter<'_>,
    combine: fn(&mut IrContext, ValueRef, ValueRef) -> OpRef,
    shift_index: u32,
    value: ValueRef,
) -> OpRef {
    debug_assert!(shift_index.is_power_of_two());
    let vec_ty = ctx.value_ty(value);
    let scalar_ty = ctx.types.element_type(vec_ty);
    let elem_bits = ctx.types.scalar_bits(scalar_ty).unwrap_or(0);

    let mut current = value;
    let mut id = shift_index;
    while id > 0 {
        let bytes = i32_constant(ctx, rewriter, (id * elem_bits / 8) as i64);
        let shifted = aievec::shift(ctx, vec_ty, current, current, bytes, false);
        let shifted = rewriter.emit(ctx, shifted);
        let step = combine(ctx, current, shifted);
        current = rewriter.emit(ctx, step);
        id /= 2;
    }

    let lane = i32_constant(ctx, rewriter, 0);
    aievec::ext_elem(ctx, scalar_ty, current, lane)
}
