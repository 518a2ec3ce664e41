//! Dead code elimination.
//!
//! Removes operations whose results are never used and which have no side
//! effects. Use-chains make dead-op detection O(1) per operation.

use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Configuration for dead code elimination.
#[derive(Debug, Clone)]
pub struct DceConfig {
    /// Maximum fixpoint iterations before giving up. Default: 100.
    pub max_iterations: usize,
    /// Whether to recursively process nested regions. Default: true.
    pub recursive: bool,
}

impl Default for DceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            recursive: true,
        }
    }
}

#[derive(Debug)]
pub struct DceResult {
    /// Total number of operations removed.
    pub removed_count: usize,
    pub iterations: usize,
    /// Whether fixpoint was reached (no more changes possible).
    pub reached_fixpoint: bool,
}

/// Eliminate dead code nested under `root` using default configuration.
pub fn eliminate_dead_code(ctx: &mut IrContext, root: OpRef) -> DceResult {
    eliminate_dead_code_with_config(ctx, root, DceConfig::default())
}

pub fn eliminate_dead_code_with_config(
    ctx: &mut IrContext,
    root: OpRef,
    config: DceConfig,
) -> DceResult {
    let max_iterations = if config.max_iterations == 0 {
        100
    } else {
        config.max_iterations
    };

    let mut total_removed = 0;

    for iteration in 0..max_iterations {
        let regions: Vec<RegionRef> = ctx.op(root).regions.to_vec();
        let removed: usize = regions
            .into_iter()
            .map(|region| sweep_region(ctx, region, &config))
            .sum();

        if removed == 0 {
            return DceResult {
                removed_count: total_removed,
                iterations: iteration + 1,
                reached_fixpoint: true,
            };
        }

        total_removed += removed;
    }

    DceResult {
        removed_count: total_removed,
        iterations: max_iterations,
        reached_fixpoint: false,
    }
}

fn sweep_region(ctx: &mut IrContext, region: RegionRef, config: &DceConfig) -> usize {
    let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
    let mut removed = 0;
    for block in blocks {
        removed += sweep_block(ctx, block, config);
    }
    removed
}

/// Sweep a single block in reverse order, removing dead ops.
///
/// Iterating in reverse maximizes cascade removal: if op C uses op B's
/// result and op B uses op A's result, removing C first frees B, then A.
fn sweep_block(ctx: &mut IrContext, block: BlockRef, config: &DceConfig) -> usize {
    let mut removed = 0;

    if config.recursive {
        let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();
        for op in ops {
            let regions: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            for region in regions {
                removed += sweep_region(ctx, region, config);
            }
        }
    }

    let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();
    for &op in ops.iter().rev() {
        if is_dead(ctx, op) {
            ctx.remove_op_from_block(block, op);
            ctx.remove_op(op);
            removed += 1;
        }
    }

    removed
}

/// Pure, owns no regions, and none of its results are used.
fn is_dead(ctx: &IrContext, op: OpRef) -> bool {
    if !ctx.op_kind(op).is_pure() || !ctx.op(op).regions.is_empty() {
        return false;
    }
    ctx.op_results(op).iter().all(|&result| !ctx.has_uses(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{arith, func};

    #[test]
    fn removes_dead_chain_and_keeps_live_ops() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let (f, entry) = func::func(&mut ctx, "f", vec![i32_ty]);
        let arg = ctx.block_arg(entry, 0);

        // Dead chain: c -> add -> mul (nothing uses mul)
        let c = arith::constant_int(&mut ctx, i32_ty, 3);
        let cv = ctx.op_result(c, 0);
        let add = arith::addi(&mut ctx, arg, cv);
        let addv = ctx.op_result(add, 0);
        let mul = arith::muli(&mut ctx, addv, addv);

        // Live: sub -> return
        let sub = arith::subi(&mut ctx, arg, arg);
        let subv = ctx.op_result(sub, 0);
        let ret = func::r#return(&mut ctx, [subv]);

        for op in [c, add, mul, sub, ret] {
            ctx.push_op(entry, op);
        }

        let result = eliminate_dead_code(&mut ctx, f);
        assert_eq!(result.removed_count, 3);
        assert!(result.reached_fixpoint);
        assert_eq!(result.iterations, 2);
        assert_eq!(ctx.block(entry).ops.as_slice(), &[sub, ret]);
    }

    #[test]
    fn return_is_never_removed() {
        let mut ctx = IrContext::new();
        let (f, entry) = func::func(&mut ctx, "f", vec![]);
        let ret = func::r#return(&mut ctx, Vec::<crate::refs::ValueRef>::new());
        ctx.push_op(entry, ret);

        let result = eliminate_dead_code(&mut ctx, f);
        assert_eq!(result.removed_count, 0);
        assert_eq!(result.iterations, 1);
        assert_eq!(ctx.block(entry).ops.as_slice(), &[ret]);
    }
}
