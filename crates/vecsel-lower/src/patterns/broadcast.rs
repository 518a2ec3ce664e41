//! Pattern for `vector.broadcast(vector.extract v[p])` -> `aievec.broadcast v, p`.

use vecsel_ir::dialect::{aievec, vector};
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern};
use vecsel_ir::{IrContext, OpKind, OpRef};

use super::util::defining_op_of;

pub struct ExtractBroadcastToLane;

impl RewritePattern for ExtractBroadcastToLane {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(extract) = defining_op_of(ctx, ctx.op_operands(op)[0], OpKind::Extract) else {
            return Ok(false);
        };
        let Some(position) = vector::extract_position(ctx, extract) else {
            return Ok(false);
        };
        let source = ctx.op_operands(extract)[0];
        let ty = ctx.op_result_types(op)[0];
        rewriter.replace_op(aievec::broadcast_lane(ctx, ty, source, position));
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Broadcast]
    }

    fn name(&self) -> &'static str {
        "ExtractBroadcastToLane"
    }
}
