//! Conversion target: which operations are already in final form.
//!
//! Legality is resolved per operation kind. A kind can be statically legal,
//! statically illegal, or checked by a plain function over the concrete
//! instance. Kinds with no rule at all are `Unknown`: the driver still tries
//! their patterns, but they never fail verification.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

use tracing::trace;

use crate::analysis::AnalysisManager;
use crate::context::IrContext;
use crate::ops::{Dialect, OpKind};
use crate::refs::OpRef;
use crate::walk;

/// Result of a legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    /// The operation is legal (no conversion needed).
    Legal,
    /// The operation is illegal (must be converted).
    Illegal,
    /// No rule covers the operation.
    Unknown,
}

/// Dynamic legality predicate: returns `true` when the instance is legal.
pub type DynamicCheckFn = fn(&IrContext, OpRef, &AnalysisManager) -> bool;

#[derive(Default)]
pub struct ConversionTarget {
    legal_dialects: HashSet<Dialect>,
    legal_ops: HashSet<OpKind>,
    illegal_ops: HashSet<OpKind>,
    dynamic_checks: HashMap<OpKind, DynamicCheckFn>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_legal_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.legal_dialects.insert(dialect);
        self
    }

    pub fn add_legal_op(&mut self, kind: OpKind) -> &mut Self {
        self.illegal_ops.remove(&kind);
        self.legal_ops.insert(kind);
        self
    }

    pub fn add_illegal_op(&mut self, kind: OpKind) -> &mut Self {
        self.legal_ops.remove(&kind);
        self.illegal_ops.insert(kind);
        self
    }

    /// Register a dynamic check for `kind`, replacing any earlier one.
    pub fn add_dynamic_check(&mut self, kind: OpKind, check: DynamicCheckFn) -> &mut Self {
        self.dynamic_checks.insert(kind, check);
        self
    }

    /// Check if a specific operation is legal.
    ///
    /// Resolution order:
    /// 1. Dynamic check registered for the kind
    /// 2. Specific op rules (legal_ops / illegal_ops)
    /// 3. Legal dialects
    /// 4. Default: Unknown
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef, analyses: &AnalysisManager) -> LegalityCheck {
        let kind = ctx.op_kind(op);

        let result = if let Some(check) = self.dynamic_checks.get(&kind) {
            if check(ctx, op, analyses) {
                LegalityCheck::Legal
            } else {
                LegalityCheck::Illegal
            }
        } else if self.legal_ops.contains(&kind) {
            LegalityCheck::Legal
        } else if self.illegal_ops.contains(&kind) {
            LegalityCheck::Illegal
        } else if self.legal_dialects.contains(&kind.dialect()) {
            LegalityCheck::Legal
        } else {
            LegalityCheck::Unknown
        };
        trace!(%op, %kind, ?result, "legality");
        result
    }

    /// Collect every operation nested under `root` that is still illegal.
    pub fn verify(&self, ctx: &IrContext, root: OpRef, analyses: &AnalysisManager) -> Vec<IllegalOp> {
        let mut illegal = Vec::new();
        for &region in &ctx.op(root).regions {
            let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
                if self.is_legal(ctx, op, analyses) == LegalityCheck::Illegal {
                    illegal.push(IllegalOp {
                        op,
                        kind: ctx.op_kind(op),
                    });
                }
                ControlFlow::Continue(walk::WalkAction::Advance)
            });
        }
        illegal
    }
}

/// An illegal operation found during verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IllegalOp {
    pub op: OpRef,
    pub kind: OpKind,
}

impl fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.op)
    }
}
