//! Recursive operation traversal.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::ops::OpKind;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

/// Walk all operations in a region recursively.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk all operations in a block recursively.
pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk an operation and its nested regions recursively (pre-order).
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

/// Collect every operation nested under `op` (excluding `op` itself) with the given kind.
pub fn collect_kind(ctx: &IrContext, op: OpRef, kind: OpKind) -> Vec<OpRef> {
    let mut found = Vec::new();
    for &region in &ctx.op(op).regions {
        let _ = walk_region::<()>(ctx, region, &mut |nested| {
            if ctx.op_kind(nested) == kind {
                found.push(nested);
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockData, OperationDataBuilder, RegionData};

    fn constant(ctx: &mut IrContext, value: i64) -> OpRef {
        let i32_ty = ctx.types.int(32);
        OperationDataBuilder::new(OpKind::Constant)
            .result(i32_ty)
            .attr("value", value)
            .create(ctx)
    }

    fn region_of(ctx: &mut IrContext, ops: &[OpRef]) -> RegionRef {
        let block = ctx.create_block(BlockData::new(vec![]));
        for &op in ops {
            ctx.push_op(block, op);
        }
        ctx.create_region(RegionData::new([block]))
    }

    #[test]
    fn walk_region_finds_all_ops() {
        let mut ctx = IrContext::new();
        let op1 = constant(&mut ctx, 1);
        let op2 = constant(&mut ctx, 2);
        let region = region_of(&mut ctx, &[op1, op2]);

        let mut count = 0;
        let _ = walk_region::<()>(&ctx, region, &mut |_op| {
            count += 1;
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn walk_with_early_exit() {
        let mut ctx = IrContext::new();
        let op1 = constant(&mut ctx, 1);
        let op2 = constant(&mut ctx, 2);
        let region = region_of(&mut ctx, &[op1, op2]);

        let result = walk_region(&ctx, region, &mut |op| {
            if op == op1 {
                ControlFlow::Break(op)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert_eq!(result, ControlFlow::Break(op1));
    }

    #[test]
    fn skip_does_not_descend_and_collect_kind_does() {
        let mut ctx = IrContext::new();
        let inner = constant(&mut ctx, 7);
        let inner_region = region_of(&mut ctx, &[inner]);
        let func = OperationDataBuilder::new(OpKind::Func)
            .attr("sym_name", "f")
            .region(inner_region)
            .create(&mut ctx);
        let outer_region = region_of(&mut ctx, &[func]);

        let mut seen = Vec::new();
        let _ = walk_region::<()>(&ctx, outer_region, &mut |op| {
            seen.push(op);
            ControlFlow::Continue(WalkAction::Skip)
        });
        assert_eq!(seen, vec![func]);

        assert_eq!(collect_kind(&ctx, func, OpKind::Constant), vec![inner]);
    }
}
