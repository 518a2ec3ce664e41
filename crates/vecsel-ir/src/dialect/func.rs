//! `func` dialect: function containers.

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::ops::{OpKind, attr};
use crate::refs::{BlockRef, OpRef, TypeRef, ValueRef};

/// Create a `func.func` with a single entry block whose arguments have
/// `arg_types`. Returns the function and its entry block.
pub fn func(ctx: &mut IrContext, name: &str, arg_types: Vec<TypeRef>) -> (OpRef, BlockRef) {
    let entry = ctx.create_block(BlockData::new(arg_types));
    let body = ctx.create_region(RegionData::new([entry]));
    let op = OperationDataBuilder::new(OpKind::Func)
        .attr(attr::SYM_NAME, name)
        .region(body)
        .create(ctx);
    (op, entry)
}

pub fn r#return(ctx: &mut IrContext, values: impl IntoIterator<Item = ValueRef>) -> OpRef {
    OperationDataBuilder::new(OpKind::Return)
        .operands(values)
        .create(ctx)
}

pub fn name(ctx: &IrContext, func: OpRef) -> Option<&str> {
    ctx.str_attr(func, attr::SYM_NAME)
}

/// Entry block of a function body.
pub fn entry_block(ctx: &IrContext, func: OpRef) -> Option<BlockRef> {
    if ctx.op_kind(func) != OpKind::Func {
        return None;
    }
    let region = *ctx.op(func).regions.first()?;
    ctx.region(region).blocks.first().copied()
}

/// Values returned by the function's terminator, if it has one.
pub fn returned_values(ctx: &IrContext, func: OpRef) -> Vec<ValueRef> {
    entry_block(ctx, func)
        .and_then(|block| ctx.block(block).ops.last().copied())
        .filter(|&op| ctx.op_kind(op) == OpKind::Return)
        .map(|op| ctx.op_operands(op).to_vec())
        .unwrap_or_default()
}
