//! `vector` dialect: generic whole-vector operations.

use smallvec::SmallVec;

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{CombiningKind, OpKind, PermutationMap, attr};
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::types::{Attribute, TypeData};

/// Reduce all lanes of `vector` to a scalar with `kind`.
pub fn reduction(ctx: &mut IrContext, kind: CombiningKind, vector: ValueRef) -> OpRef {
    let vty = ctx.value_ty(vector);
    let elem = ctx.types.element_type(vty);
    OperationDataBuilder::new(OpKind::Reduction)
        .operand(vector)
        .attr(attr::KIND, kind)
        .result(elem)
        .create(ctx)
}

/// Splat a scalar to every lane of `ty`.
pub fn broadcast(ctx: &mut IrContext, scalar: ValueRef, ty: TypeRef) -> OpRef {
    OperationDataBuilder::new(OpKind::Broadcast)
        .operand(scalar)
        .result(ty)
        .create(ctx)
}

/// Read lane `position` of `vector` as a scalar.
pub fn extract(ctx: &mut IrContext, vector: ValueRef, position: i64) -> OpRef {
    let vty = ctx.value_ty(vector);
    let elem = ctx.types.element_type(vty);
    OperationDataBuilder::new(OpKind::Extract)
        .operand(vector)
        .attr(attr::POSITION, position)
        .result(elem)
        .create(ctx)
}

/// Strided read of `ty` from `source` starting at `indices`.
///
/// Operands are `[source, indices..., mask?]`; the number of indices equals
/// the rank of the source buffer.
pub fn transfer_read(
    ctx: &mut IrContext,
    ty: TypeRef,
    source: ValueRef,
    indices: &[ValueRef],
    map: PermutationMap,
    mask: Option<ValueRef>,
) -> OpRef {
    OperationDataBuilder::new(OpKind::TransferRead)
        .operand(source)
        .operands(indices.iter().copied())
        .operands(mask)
        .attr(attr::PERMUTATION_MAP, map)
        .result(ty)
        .create(ctx)
}

// === Accessors ===

pub fn combining_kind(ctx: &IrContext, op: OpRef) -> Option<CombiningKind> {
    match ctx.attr(op, attr::KIND)? {
        Attribute::Combining(kind) => Some(*kind),
        _ => None,
    }
}

pub fn extract_position(ctx: &IrContext, op: OpRef) -> Option<i64> {
    ctx.int_attr(op, attr::POSITION)
}

pub fn permutation_map(ctx: &IrContext, op: OpRef) -> Option<&PermutationMap> {
    match ctx.attr(op, attr::PERMUTATION_MAP)? {
        Attribute::Map(map) => Some(map),
        _ => None,
    }
}

/// Rank of a memory buffer type; zero for anything else.
pub fn memref_rank(ctx: &IrContext, ty: TypeRef) -> usize {
    match ctx.types.get(ty) {
        TypeData::MemRef { shape, .. } => shape.len(),
        _ => 0,
    }
}

/// Operand layout of a strided read or target load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemAccess {
    pub source: ValueRef,
    pub indices: SmallVec<[ValueRef; 2]>,
    /// Trailing operand after the indices: the mask of a `transfer_read`,
    /// or the carried vector of an `upd`.
    pub trailing: Option<ValueRef>,
}

/// Split the operands of a `transfer_read` or `upd` into source, indices
/// and trailing operand.
pub fn mem_access(ctx: &IrContext, op: OpRef) -> Option<MemAccess> {
    let operands = ctx.op_operands(op);
    let (&source, rest) = operands.split_first()?;
    let rank = memref_rank(ctx, ctx.value_ty(source));
    if rest.len() < rank {
        return None;
    }
    let (indices, trailing) = rest.split_at(rank);
    Some(MemAccess {
        source,
        indices: indices.into(),
        trailing: trailing.first().copied(),
    })
}
