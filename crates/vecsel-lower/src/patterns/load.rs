//! Patterns for `vector.transfer_read` -> `aievec.upd`, and for splitting
//! oversized `aievec.upd` loads in two.
//!
//! A read whose innermost index is a constant not aligned to the vector
//! length becomes two aligned loads and a byte shift:
//!
//! ```text
//! %r = vector.transfer_read %m[%c17] : vector<32xi32>
//! ```
//!
//! becomes
//!
//! ```text
//! %a = aievec.upd %m[%c0] {index = 0, offset = 0} : vector<32xi32>
//! %b = aievec.upd %m[%c32] {index = 0, offset = 0} : vector<32xi32>
//! %s = arith.constant 68 : i32
//! %r = aievec.shift %a, %b, %s : vector<32xi32>
//! ```

use smallvec::SmallVec;
use tracing::trace;
use vecsel_ir::dialect::{aievec, arith, vector};
use vecsel_ir::rewrite::{MatchResult, PatternRewriter, RewritePattern, UnsupportedInput};
use vecsel_ir::{IrContext, OpKind, OpRef, ValueRef};

use super::util::{i32_constant, result_shape};
use crate::analysis::effective_access_size;

/// Pattern for `vector.transfer_read` -> `aievec.upd` (+ `aievec.shift`).
pub struct TransferReadToUpd;

impl RewritePattern for TransferReadToUpd {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let Some(access) = vector::mem_access(ctx, op) else {
            return Ok(false);
        };
        if access.trailing.is_some() {
            return Err(UnsupportedInput::new("masked loads are not supported"));
        }
        let Some(map) = vector::permutation_map(ctx, op) else {
            return Ok(false);
        };
        // Strided and splat reads have no single-load form.
        if !map.is_minor_identity() || map.is_constant() {
            return Ok(false);
        }
        let Some(shape) = result_shape(ctx, op) else {
            return Ok(false);
        };
        let vec_ty = ctx.op_result_types(op)[0];
        let mut indices: SmallVec<[ValueRef; 2]> = access.indices.clone();
        let Some(&innermost) = indices.last() else {
            return Ok(false);
        };

        let constant = arith::constant_int_value(ctx, innermost).filter(|&v| v != 0);
        let Some(value) = constant else {
            let upd = aievec::upd(ctx, vec_ty, access.source, &indices, 0, 0, None);
            rewriter.replace_op(upd);
            return Ok(true);
        };

        let lanes = shape.lanes as i64;
        let offset = value % lanes;
        let aligned = value / lanes * lanes;
        let shift_bytes = offset * shape.elem_bits as i64 / 8;
        trace!(%op, value, aligned, shift_bytes, "constant innermost index");

        let index_ty = ctx.value_ty(innermost);
        let last = indices.len() - 1;
        let base = arith::constant_int(ctx, index_ty, aligned);
        indices[last] = rewriter.emit(ctx, base);

        if shift_bytes == 0 {
            let upd = aievec::upd(ctx, vec_ty, access.source, &indices, 0, 0, None);
            rewriter.replace_op(upd);
            return Ok(true);
        }

        let low = aievec::upd(ctx, vec_ty, access.source, &indices, 0, 0, None);
        let low = rewriter.emit(ctx, low);
        let next = arith::constant_int(ctx, index_ty, aligned + lanes);
        indices[last] = rewriter.emit(ctx, next);
        let high = aievec::upd(ctx, vec_ty, access.source, &indices, 0, 0, None);
        let high = rewriter.emit(ctx, high);
        let bytes = i32_constant(ctx, rewriter, shift_bytes);
        let shift = aievec::shift(ctx, vec_ty, low, high, bytes, false);
        rewriter.replace_op(shift);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::TransferRead]
    }

    fn name(&self) -> &'static str {
        "TransferReadToUpd"
    }
}

/// Pattern for a long `aievec.upd` -> two `aievec.upd` filling the low and
/// high halves of the destination.
pub struct SplitUpd {
    /// Native register width; loads of at least twice this are split.
    pub max_vector_bits: u32,
}

impl RewritePattern for SplitUpd {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult {
        let effective = effective_access_size(ctx, op, rewriter.analyses());
        if effective < 2 * self.max_vector_bits {
            return Ok(false);
        }
        let Some(access) = vector::mem_access(ctx, op) else {
            return Ok(false);
        };
        let ty = ctx.op_result_types(op)[0];

        let low = aievec::upd(ctx, ty, access.source, &access.indices, 0, 0, None);
        let low = rewriter.emit(ctx, low);
        let high = aievec::upd(
            ctx,
            ty,
            access.source,
            &access.indices,
            2 * self.max_vector_bits as i64,
            1,
            Some(low),
        );
        rewriter.replace_op(high);
        Ok(true)
    }

    fn roots(&self) -> &'static [OpKind] {
        &[OpKind::Upd]
    }

    fn name(&self) -> &'static str {
        "SplitUpd"
    }
}
