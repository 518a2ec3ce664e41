//! Legality oracles for the two hardware generations.
//!
//! Each oracle is a [`ConversionTarget`] built from plain predicate functions.
//! The target dialects are legal; the generic vector operations are illegal
//! exactly when a rule of the matching pattern set is expected to lower them.

use vecsel_ir::rewrite::ConversionTarget;
use vecsel_ir::{AnalysisManager, CombiningKind, Dialect, IrContext, OpKind, OpRef};

use crate::analysis::effective_access_size;
use crate::patterns::util::{
    defining_op_of, has_single_use_by, operand_shape, result_shape,
};
use crate::target::{TargetGeneration, is_elementwise_shape, is_full_register};

/// The legality oracle for `generation`.
pub fn conversion_target(generation: TargetGeneration) -> ConversionTarget {
    let mut target = ConversionTarget::new();
    configure_common(&mut target);
    match generation {
        TargetGeneration::Aie => configure_aie(&mut target),
        TargetGeneration::AieMl => configure_aieml(&mut target),
    }
    target
}

fn configure_common(target: &mut ConversionTarget) {
    target
        .add_legal_dialect(Dialect::AieVec)
        .add_legal_dialect(Dialect::Arith)
        .add_legal_dialect(Dialect::Func)
        .add_illegal_op(OpKind::TransferRead)
        .add_dynamic_check(OpKind::AddI, scalar_result)
        .add_dynamic_check(OpKind::AddF, scalar_result)
        .add_dynamic_check(OpKind::SubI, scalar_result)
        .add_dynamic_check(OpKind::SubF, scalar_result);
}

fn configure_aie(target: &mut ConversionTarget) {
    target
        .add_dynamic_check(OpKind::Upd, upd_fits_aie)
        .add_dynamic_check(OpKind::Fma, fma_without_pending_splat);
}

fn configure_aieml(target: &mut ConversionTarget) {
    target
        .add_legal_op(OpKind::UnrealizedCast)
        .add_dynamic_check(OpKind::Upd, upd_fits_aieml)
        .add_dynamic_check(OpKind::AddI, int_add_sub_aieml)
        .add_dynamic_check(OpKind::SubI, int_add_sub_aieml)
        .add_dynamic_check(OpKind::AddF, float_add_sub_aieml)
        .add_dynamic_check(OpKind::SubF, float_add_sub_aieml)
        .add_dynamic_check(OpKind::MulI, muli_aieml)
        .add_dynamic_check(OpKind::MulF, mulf_aieml)
        .add_dynamic_check(OpKind::MinSI, not_full_register_result)
        .add_dynamic_check(OpKind::MaxSI, not_full_register_result)
        .add_dynamic_check(OpKind::MinF, not_full_register_result)
        .add_dynamic_check(OpKind::MaxF, not_full_register_result)
        .add_dynamic_check(OpKind::Select, not_full_register_result)
        .add_dynamic_check(OpKind::CmpI, not_full_register_operand)
        .add_dynamic_check(OpKind::CmpF, not_full_register_operand)
        .add_dynamic_check(OpKind::Reduction, reduction_aieml)
        .add_dynamic_check(OpKind::Broadcast, broadcast_not_of_extract);
}

// ============================================================================
// Common
// ============================================================================

fn scalar_result(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    result_shape(ctx, op).is_none()
}

// ============================================================================
// Generation 1
// ============================================================================

fn upd_fits_aie(ctx: &IrContext, op: OpRef, analyses: &AnalysisManager) -> bool {
    effective_access_size(ctx, op, analyses) <= TargetGeneration::Aie.max_load_bits()
}

/// An `fma` is illegal while a broadcast of an extracted lane still feeds it,
/// either as the first source of its left concat or as its right operand.
fn fma_without_pending_splat(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    let operands = ctx.op_operands(op);
    let Some(concat) = defining_op_of(ctx, operands[0], OpKind::Concat) else {
        return true;
    };
    let first = ctx.op_operands(concat)[0];
    let broadcast = match defining_op_of(ctx, first, OpKind::Broadcast) {
        Some(b) => b,
        None => match defining_op_of(ctx, operands[1], OpKind::Broadcast) {
            Some(b) => b,
            None => return true,
        },
    };
    defining_op_of(ctx, ctx.op_operands(broadcast)[0], OpKind::Extract).is_none()
}

// ============================================================================
// Generation 2
// ============================================================================

fn upd_fits_aieml(ctx: &IrContext, op: OpRef, analyses: &AnalysisManager) -> bool {
    effective_access_size(ctx, op, analyses) <= TargetGeneration::AieMl.max_load_bits()
}

fn int_add_sub_aieml(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    result_shape(ctx, op).is_none_or(|shape| !is_elementwise_shape(&shape))
}

fn float_add_sub_aieml(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    result_shape(ctx, op).is_none_or(|shape| shape.lanes != 16)
}

/// A multiply feeding exactly one add stays legal so the add can fuse it.
fn muli_aieml(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    let Some(shape) = result_shape(ctx, op) else {
        return true;
    };
    if has_single_use_by(ctx, op, OpKind::AddI) {
        return true;
    }
    let (lanes, width) = shape.pair();
    let narrow = lanes == 32 && (width == 8 || width == 16);
    let wide = (lanes == 16 || lanes == 32) && width == 32;
    !(narrow || wide)
}

fn mulf_aieml(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    let Some(shape) = result_shape(ctx, op) else {
        return true;
    };
    if has_single_use_by(ctx, op, OpKind::AddF) {
        return true;
    }
    !(shape.lanes == 16 && (shape.elem_bits == 16 || shape.elem_bits == 32))
}

fn not_full_register_result(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    result_shape(ctx, op).is_none_or(|shape| !is_full_register(&shape))
}

fn not_full_register_operand(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    operand_shape(ctx, op, 0).is_none_or(|shape| !is_full_register(&shape))
}

fn reduction_aieml(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    let Some(kind) = vecsel_ir::dialect::vector::combining_kind(ctx, op) else {
        return true;
    };
    if kind == CombiningKind::Mul {
        return true;
    }
    let Some(shape) = operand_shape(ctx, op, 0) else {
        return true;
    };
    if shape.is_float {
        !(shape.lanes == 16 || shape.lanes == 32)
    } else {
        !is_elementwise_shape(&shape)
    }
}

fn broadcast_not_of_extract(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> bool {
    defining_op_of(ctx, ctx.op_operands(op)[0], OpKind::Extract).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecsel_ir::dialect::{arith, func};
    use vecsel_ir::rewrite::LegalityCheck;

    #[test]
    fn multiply_feeding_one_add_is_legal() {
        let mut ctx = IrContext::new();
        let i16_ty = ctx.types.int(16);
        let v_ty = ctx.types.vector(32, i16_ty);
        let (_, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let fused = arith::muli(&mut ctx, args[0], args[1]);
        let fused_v = ctx.op_result(fused, 0);
        let add = arith::addi(&mut ctx, fused_v, args[2]);
        let lone = arith::muli(&mut ctx, args[0], args[2]);
        for op in [fused, add, lone] {
            ctx.push_op(entry, op);
        }

        let target = conversion_target(TargetGeneration::AieMl);
        let am = AnalysisManager::new();
        assert_eq!(target.is_legal(&ctx, fused, &am), LegalityCheck::Legal);
        assert_eq!(target.is_legal(&ctx, add, &am), LegalityCheck::Illegal);
        assert_eq!(target.is_legal(&ctx, lone, &am), LegalityCheck::Illegal);

        let aie = conversion_target(TargetGeneration::Aie);
        assert_eq!(aie.is_legal(&ctx, lone, &am), LegalityCheck::Legal);
        assert_eq!(aie.is_legal(&ctx, add, &am), LegalityCheck::Illegal);
    }

    #[test]
    fn lane_width_tables_drive_legality() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v16 = ctx.types.vector(16, i32_ty);
        let v8 = ctx.types.vector(8, i32_ty);
        let (_, entry) = func::func(&mut ctx, "f", vec![v16, v8, i32_ty]);
        let args = ctx.block_args(entry).to_vec();
        let add16 = arith::addi(&mut ctx, args[0], args[0]);
        let add8 = arith::addi(&mut ctx, args[1], args[1]);
        let scalar = arith::addi(&mut ctx, args[2], args[2]);
        let max16 = arith::maxsi(&mut ctx, args[0], args[0]);
        let max8 = arith::maxsi(&mut ctx, args[1], args[1]);
        for op in [add16, add8, scalar, max16, max8] {
            ctx.push_op(entry, op);
        }

        let target = conversion_target(TargetGeneration::AieMl);
        let am = AnalysisManager::new();
        let legal = |op| target.is_legal(&ctx, op, &am);
        assert_eq!(legal(add16), LegalityCheck::Illegal);
        assert_eq!(legal(add8), LegalityCheck::Legal);
        assert_eq!(legal(scalar), LegalityCheck::Legal);
        assert_eq!(legal(max16), LegalityCheck::Illegal);
        assert_eq!(legal(max8), LegalityCheck::Legal);
    }
}
