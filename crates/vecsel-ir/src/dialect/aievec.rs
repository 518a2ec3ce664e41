//! `aievec` dialect: target vector instructions.
//!
//! Accumulator-typed values (results of `ups`, `mul_elem`, `fma_elem`,
//! `fma`, `mul`) are narrowed back to register form with `srs`, or
//! reinterpreted with `cast`.

use super::same_type_binary_ops;
use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{OpKind, attr};
use crate::refs::{OpRef, TypeRef, ValueRef};

// ============================================================================
// Shuffle attributes (generation 1)
// ============================================================================

/// Lane selection for one operand of a generation-1 instruction.
///
/// Empty strings leave the hardware default in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperandShuffle {
    pub start: String,
    pub offsets: String,
    pub offsets_hi: String,
    pub step: String,
    pub square: String,
}

/// Shuffle attributes of generation-1 `add`/`sub`/`mul`/`fma`.
/// `x` selects lanes of the first operand, `z` of the second.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShuffleAttrs {
    pub x: OperandShuffle,
    pub z: OperandShuffle,
}

impl ShuffleAttrs {
    fn apply(&self, builder: OperationDataBuilder, with_step: bool) -> OperationDataBuilder {
        let mut b = builder
            .attr(attr::XSTART, self.x.start.as_str())
            .attr(attr::XOFFSETS, self.x.offsets.as_str())
            .attr(attr::XOFFSETS_HI, self.x.offsets_hi.as_str())
            .attr(attr::XSQUARE, self.x.square.as_str())
            .attr(attr::ZSTART, self.z.start.as_str())
            .attr(attr::ZOFFSETS, self.z.offsets.as_str())
            .attr(attr::ZOFFSETS_HI, self.z.offsets_hi.as_str())
            .attr(attr::ZSQUARE, self.z.square.as_str());
        if with_step {
            b = b
                .attr(attr::XSTEP, self.x.step.as_str())
                .attr(attr::ZSTEP, self.z.step.as_str());
        }
        b
    }

    /// Read the shuffle attributes back from an operation; missing keys are empty.
    pub fn of(ctx: &IrContext, op: OpRef) -> Self {
        let get = |key: &str| ctx.str_attr(op, key).unwrap_or_default().to_string();
        Self {
            x: OperandShuffle {
                start: get(attr::XSTART),
                offsets: get(attr::XOFFSETS),
                offsets_hi: get(attr::XOFFSETS_HI),
                step: get(attr::XSTEP),
                square: get(attr::XSQUARE),
            },
            z: OperandShuffle {
                start: get(attr::ZSTART),
                offsets: get(attr::ZOFFSETS),
                offsets_hi: get(attr::ZOFFSETS_HI),
                step: get(attr::ZSTEP),
                square: get(attr::ZSQUARE),
            },
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Memory and data movement
// ============================================================================

/// Aligned load of `ty` from `source` at `indices`, written at bit `offset`
/// into the destination. With `carry`, the remaining lanes come from the
/// carried vector (the `index`-th half of a two-part load).
pub fn upd(
    ctx: &mut IrContext,
    ty: TypeRef,
    source: ValueRef,
    indices: &[ValueRef],
    offset: i64,
    index: i64,
    carry: Option<ValueRef>,
) -> OpRef {
    OperationDataBuilder::new(OpKind::Upd)
        .operand(source)
        .operands(indices.iter().copied())
        .operands(carry)
        .attr(attr::OFFSET, offset)
        .attr(attr::INDEX, index)
        .result(ty)
        .create(ctx)
}

pub fn upd_offset(ctx: &IrContext, op: OpRef) -> i64 {
    ctx.int_attr(op, attr::OFFSET).unwrap_or(0)
}

pub fn upd_index(ctx: &IrContext, op: OpRef) -> i64 {
    ctx.int_attr(op, attr::INDEX).unwrap_or(0)
}

/// Upshift `value` into the accumulator type `ty`.
pub fn ups(ctx: &mut IrContext, ty: TypeRef, value: ValueRef, shift: i64) -> OpRef {
    OperationDataBuilder::new(OpKind::Ups)
        .operand(value)
        .attr(attr::SHIFT, shift)
        .result(ty)
        .create(ctx)
}

/// Shift right, round and saturate accumulator `value` into register type `ty`.
pub fn srs(ctx: &mut IrContext, ty: TypeRef, value: ValueRef, shift: i64) -> OpRef {
    OperationDataBuilder::new(OpKind::Srs)
        .operand(value)
        .attr(attr::SHIFT, shift)
        .result(ty)
        .create(ctx)
}

/// Reinterpret between register and accumulator form. `is_res_acc` is true
/// when the result is the accumulator form.
pub fn cast(ctx: &mut IrContext, ty: TypeRef, value: ValueRef, is_res_acc: bool) -> OpRef {
    OperationDataBuilder::new(OpKind::Cast)
        .operand(value)
        .attr(attr::IS_RES_ACC, is_res_acc)
        .result(ty)
        .create(ctx)
}

pub fn concat(ctx: &mut IrContext, ty: TypeRef, sources: &[ValueRef]) -> OpRef {
    OperationDataBuilder::new(OpKind::Concat)
        .operands(sources.iter().copied())
        .result(ty)
        .create(ctx)
}

/// The `index`-th `ty`-sized slice of `source`.
pub fn ext(ctx: &mut IrContext, ty: TypeRef, source: ValueRef, index: i64) -> OpRef {
    OperationDataBuilder::new(OpKind::Ext)
        .operand(source)
        .attr(attr::INDEX, index)
        .result(ty)
        .create(ctx)
}

/// Bytes `shift..shift + size(ty)` of the concatenation `lhs ++ rhs`.
/// `shift` is an `i32` value.
pub fn shift(
    ctx: &mut IrContext,
    ty: TypeRef,
    lhs: ValueRef,
    rhs: ValueRef,
    shift: ValueRef,
    is_acc: bool,
) -> OpRef {
    OperationDataBuilder::new(OpKind::Shift)
        .operands([lhs, rhs, shift])
        .attr(attr::IS_ACC, is_acc)
        .result(ty)
        .create(ctx)
}

/// Scalar lane `index` (an `i32` value) of `source`.
pub fn ext_elem(ctx: &mut IrContext, ty: TypeRef, source: ValueRef, index: ValueRef) -> OpRef {
    OperationDataBuilder::new(OpKind::ExtElem)
        .operands([source, index])
        .result(ty)
        .create(ctx)
}

/// Splat lane `idx` of `source` across `ty`.
pub fn broadcast_lane(ctx: &mut IrContext, ty: TypeRef, source: ValueRef, idx: i64) -> OpRef {
    OperationDataBuilder::new(OpKind::BroadcastLane)
        .operand(source)
        .attr(attr::IDX, idx)
        .result(ty)
        .create(ctx)
}

pub fn broadcast_scalar(ctx: &mut IrContext, ty: TypeRef, scalar: ValueRef) -> OpRef {
    OperationDataBuilder::new(OpKind::BroadcastScalar)
        .operand(scalar)
        .result(ty)
        .create(ctx)
}

// ============================================================================
// Generation-1 arithmetic
// ============================================================================

pub fn add(
    ctx: &mut IrContext,
    ty: TypeRef,
    lhs: ValueRef,
    rhs: ValueRef,
    shuffle: &ShuffleAttrs,
) -> OpRef {
    let builder = OperationDataBuilder::new(OpKind::Add)
        .operands([lhs, rhs])
        .result(ty);
    shuffle.apply(builder, false).create(ctx)
}

pub fn sub(
    ctx: &mut IrContext,
    ty: TypeRef,
    lhs: ValueRef,
    rhs: ValueRef,
    shuffle: &ShuffleAttrs,
) -> OpRef {
    let builder = OperationDataBuilder::new(OpKind::Sub)
        .operands([lhs, rhs])
        .result(ty);
    shuffle.apply(builder, false).create(ctx)
}

pub fn mul(
    ctx: &mut IrContext,
    ty: TypeRef,
    lhs: ValueRef,
    rhs: ValueRef,
    shuffle: &ShuffleAttrs,
) -> OpRef {
    let builder = OperationDataBuilder::new(OpKind::Mul)
        .operands([lhs, rhs])
        .result(ty);
    shuffle.apply(builder, true).create(ctx)
}

/// `acc + lhs * rhs` (or `acc - lhs * rhs` with `fmsub`) over shuffled lanes.
pub fn fma(
    ctx: &mut IrContext,
    ty: TypeRef,
    lhs: ValueRef,
    rhs: ValueRef,
    acc: ValueRef,
    shuffle: &ShuffleAttrs,
    fmsub: bool,
) -> OpRef {
    let builder = OperationDataBuilder::new(OpKind::Fma)
        .operands([lhs, rhs, acc])
        .attr(attr::FMSUB, fmsub)
        .result(ty);
    shuffle.apply(builder, true).create(ctx)
}

// ============================================================================
// Generation-2 elementwise arithmetic
// ============================================================================

same_type_binary_ops! {
    add_elem => AddElem;
    sub_elem => SubElem;
    min => Min;
    max => Max;
}

/// Lane-wise multiply into accumulator type `ty`.
pub fn mul_elem(ctx: &mut IrContext, ty: TypeRef, lhs: ValueRef, rhs: ValueRef) -> OpRef {
    OperationDataBuilder::new(OpKind::MulElem)
        .operands([lhs, rhs])
        .result(ty)
        .create(ctx)
}

/// Lane-wise `acc + lhs * rhs` (or `acc - lhs * rhs` with `fmsub`).
pub fn fma_elem(
    ctx: &mut IrContext,
    lhs: ValueRef,
    rhs: ValueRef,
    acc: ValueRef,
    fmsub: bool,
) -> OpRef {
    let ty = ctx.value_ty(acc);
    OperationDataBuilder::new(OpKind::FmaElem)
        .operands([lhs, rhs, acc])
        .attr(attr::FMSUB, fmsub)
        .result(ty)
        .create(ctx)
}

/// Lane-wise compare producing a bit mask of type `ty`; `pred` is one of
/// `eq`, `ne`, `slt`, `sle`, `sgt`, `sge`, `ult`, `ule`, `ugt`, `uge`.
pub fn cmp(ctx: &mut IrContext, ty: TypeRef, lhs: ValueRef, rhs: ValueRef, pred: &str) -> OpRef {
    OperationDataBuilder::new(OpKind::Cmp)
        .operands([lhs, rhs])
        .attr(attr::PRED, pred)
        .result(ty)
        .create(ctx)
}

/// Lane-wise select: lanes whose mask bit is set come from `on_true`.
pub fn sel(
    ctx: &mut IrContext,
    on_true: ValueRef,
    on_false: ValueRef,
    mask: ValueRef,
) -> OpRef {
    let ty = ctx.value_ty(on_true);
    OperationDataBuilder::new(OpKind::Sel)
        .operands([on_true, on_false, mask])
        .result(ty)
        .create(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_attrs_round_trip_through_fma() {
        let mut ctx = IrContext::new();
        let i16_ty = ctx.types.int(16);
        let i48 = ctx.types.int(48);
        let v32 = ctx.types.vector(32, i16_ty);
        let v16 = ctx.types.vector(16, i16_ty);
        let acc_ty = ctx.types.vector(16, i48);
        let block = ctx.create_block(crate::context::BlockData::new(vec![v32, v16, acc_ty]));
        let args = ctx.block_args(block).to_vec();

        let shuffle = ShuffleAttrs {
            x: OperandShuffle {
                start: "0".into(),
                offsets: "0x73727170".into(),
                ..Default::default()
            },
            z: OperandShuffle {
                start: "3".into(),
                step: "1".into(),
                ..Default::default()
            },
        };
        let op = fma(&mut ctx, acc_ty, args[0], args[1], args[2], &shuffle, false);
        assert_eq!(ShuffleAttrs::of(&ctx, op), shuffle);
        assert_eq!(ctx.bool_attr(op, attr::FMSUB), Some(false));

        let plain = add(&mut ctx, v16, args[1], args[1], &ShuffleAttrs::default());
        assert!(ShuffleAttrs::of(&ctx, plain).is_default());
        assert_eq!(ctx.str_attr(plain, attr::XSTEP), None);
    }
}
