//! `arith` dialect: generic scalar and elementwise vector arithmetic.

use super::same_type_binary_ops;
use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{FloatPredicate, IntPredicate, OpKind, attr};
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::types::Attribute;

/// Integer constant. For a vector type the value is splatted to every lane.
pub fn constant_int(ctx: &mut IrContext, ty: TypeRef, value: i64) -> OpRef {
    OperationDataBuilder::new(OpKind::Constant)
        .attr(attr::VALUE, value)
        .result(ty)
        .create(ctx)
}

/// Float constant. For a vector type the value is splatted to every lane.
pub fn constant_float(ctx: &mut IrContext, ty: TypeRef, value: f64) -> OpRef {
    OperationDataBuilder::new(OpKind::Constant)
        .attr(attr::VALUE, Attribute::float(value))
        .result(ty)
        .create(ctx)
}

/// All-zero constant of an integer or float scalar or vector type.
pub fn constant_zero(ctx: &mut IrContext, ty: TypeRef) -> OpRef {
    let elem = ctx.types.element_type(ty);
    if ctx.types.is_float(elem) {
        constant_float(ctx, ty, 0.0)
    } else {
        constant_int(ctx, ty, 0)
    }
}

same_type_binary_ops! {
    addi => AddI;
    addf => AddF;
    subi => SubI;
    subf => SubF;
    muli => MulI;
    mulf => MulF;
    minsi => MinSI;
    maxsi => MaxSI;
    minf => MinF;
    maxf => MaxF;
}

fn bool_result_type(ctx: &mut IrContext, operand: ValueRef) -> TypeRef {
    let ty = ctx.value_ty(operand);
    let i1 = ctx.types.int(1);
    match ctx.types.vector_shape(ty) {
        Some(shape) => ctx.types.vector(shape.lanes, i1),
        None => i1,
    }
}

pub fn cmpi(ctx: &mut IrContext, pred: IntPredicate, lhs: ValueRef, rhs: ValueRef) -> OpRef {
    let ty = bool_result_type(ctx, lhs);
    OperationDataBuilder::new(OpKind::CmpI)
        .operands([lhs, rhs])
        .attr(attr::PREDICATE, pred)
        .result(ty)
        .create(ctx)
}

pub fn cmpf(ctx: &mut IrContext, pred: FloatPredicate, lhs: ValueRef, rhs: ValueRef) -> OpRef {
    let ty = bool_result_type(ctx, lhs);
    OperationDataBuilder::new(OpKind::CmpF)
        .operands([lhs, rhs])
        .attr(attr::PREDICATE, pred)
        .result(ty)
        .create(ctx)
}

/// Lane-wise `cond ? on_true : on_false`.
pub fn select(ctx: &mut IrContext, cond: ValueRef, on_true: ValueRef, on_false: ValueRef) -> OpRef {
    let ty = ctx.value_ty(on_true);
    OperationDataBuilder::new(OpKind::Select)
        .operands([cond, on_true, on_false])
        .result(ty)
        .create(ctx)
}

/// Sign-extend integer lanes to the wider type `ty`.
pub fn extsi(ctx: &mut IrContext, value: ValueRef, ty: TypeRef) -> OpRef {
    OperationDataBuilder::new(OpKind::ExtSI)
        .operand(value)
        .result(ty)
        .create(ctx)
}

/// Extend float lanes to the wider float type `ty`.
pub fn extf(ctx: &mut IrContext, value: ValueRef, ty: TypeRef) -> OpRef {
    OperationDataBuilder::new(OpKind::ExtF)
        .operand(value)
        .result(ty)
        .create(ctx)
}

// === Accessors ===

pub fn int_predicate(ctx: &IrContext, op: OpRef) -> Option<IntPredicate> {
    match ctx.attr(op, attr::PREDICATE)? {
        Attribute::IntPredicate(p) => Some(*p),
        _ => None,
    }
}

pub fn float_predicate(ctx: &IrContext, op: OpRef) -> Option<FloatPredicate> {
    match ctx.attr(op, attr::PREDICATE)? {
        Attribute::FloatPredicate(p) => Some(*p),
        _ => None,
    }
}

/// Integer value of an `arith.constant`, if `value` is produced by one.
pub fn constant_int_value(ctx: &IrContext, value: ValueRef) -> Option<i64> {
    let op = ctx.defining_op(value)?;
    if ctx.op_kind(op) != OpKind::Constant {
        return None;
    }
    ctx.int_attr(op, attr::VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_of_vector_yields_bool_vector() {
        let mut ctx = IrContext::new();
        let i16_ty = ctx.types.int(16);
        let v_ty = ctx.types.vector(32, i16_ty);
        let a = constant_int(&mut ctx, v_ty, 1);
        let a = ctx.op_result(a, 0);
        let cmp = cmpi(&mut ctx, IntPredicate::Slt, a, a);
        assert_eq!(ctx.types.render(ctx.op_result_types(cmp)[0]), "vector<32xi1>");
        assert_eq!(int_predicate(&ctx, cmp), Some(IntPredicate::Slt));
        assert_eq!(float_predicate(&ctx, cmp), None);
    }

    #[test]
    fn constant_value_lookup() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let c = constant_int(&mut ctx, i32_ty, -5);
        let v = ctx.op_result(c, 0);
        assert_eq!(constant_int_value(&ctx, v), Some(-5));

        let bf16 = ctx.types.float(crate::types::FloatFormat::BF16);
        let z = constant_zero(&mut ctx, bf16);
        let zv = ctx.op_result(z, 0);
        assert_eq!(constant_int_value(&ctx, zv), None);
        assert_eq!(ctx.attr(z, attr::VALUE).and_then(Attribute::as_float), Some(0.0));
    }
}
