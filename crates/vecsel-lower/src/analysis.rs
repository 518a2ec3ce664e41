//! Effective access size of target loads.
//!
//! A long `upd` followed by another `upd` that carries it at a nonzero
//! offset only contributes the bits up to that offset:
//!
//! ```text
//! %0 = aievec.upd %m, %i {index = 0, offset = 0} : vector<32xi32>
//! %1 = aievec.upd %m, %i, %0 {index = 1, offset = 512} : vector<32xi32>
//! ```
//!
//! On its own `%0` would access 1024 bits; carried by `%1` it accesses 512.

use tracing::trace;
use vecsel_ir::dialect::aievec;
use vecsel_ir::{AnalysisManager, IrContext, OpAnalysis, OpKind, OpRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveAccessSize {
    /// Bits actually contributed by the load.
    pub bits: u32,
}

impl OpAnalysis for EffectiveAccessSize {
    fn compute(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> Self {
        let ty = ctx.op_result_types(op)[0];
        let total = ctx.types.vector_shape(ty).map(|s| s.bits()).unwrap_or(0) as i64;
        let own = aievec::upd_offset(ctx, op);
        let result = ctx.op_result(op, 0);
        let downstream: i64 = ctx
            .uses(result)
            .iter()
            .filter(|u| ctx.op_kind(u.user) == OpKind::Upd)
            .map(|u| aievec::upd_offset(ctx, u.user))
            .sum();
        let bits = (total - own - downstream).max(0) as u32;
        trace!(%op, bits, "effective access size");
        EffectiveAccessSize { bits }
    }
}

/// Effective access size of `upd` operation `op`, memoized in `analyses`.
pub fn effective_access_size(ctx: &IrContext, op: OpRef, analyses: &AnalysisManager) -> u32 {
    analyses.get::<EffectiveAccessSize>(ctx, op).bits
}
