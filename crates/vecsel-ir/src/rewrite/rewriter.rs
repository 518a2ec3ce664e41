//! PatternRewriter: accumulates the mutations of one rewrite.
//!
//! Patterns create detached operations through the dialect constructors and
//! record them here; the applicator splices them into the block after the
//! pattern returns.

use crate::analysis::AnalysisManager;
use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};

/// Accumulated mutations from a pattern rewrite.
pub(crate) struct Mutations {
    /// Operations to insert before the current op's position.
    pub(crate) prefix_ops: Vec<OpRef>,
    /// The replacement operation (if any).
    pub(crate) replacement: Option<OpRef>,
    /// If set, the operation is erased and its results mapped to these values.
    pub(crate) erase_values: Option<Vec<ValueRef>>,
}

pub struct PatternRewriter<'a> {
    analyses: &'a AnalysisManager,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
}

impl<'a> PatternRewriter<'a> {
    pub fn new(analyses: &'a AnalysisManager) -> Self {
        Self {
            analyses,
            prefix_ops: Vec::new(),
            replacement: None,
            erase_values: None,
        }
    }

    /// Analyses cached for the current pass invocation.
    pub fn analyses(&self) -> &'a AnalysisManager {
        self.analyses
    }

    // === Mutations ===

    /// Insert an operation before the current operation.
    ///
    /// Multiple calls accumulate operations in order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Insert `op` before the current operation and return its first result.
    pub fn emit(&mut self, ctx: &IrContext, op: OpRef) -> ValueRef {
        self.insert_op(op);
        ctx.op_result(op, 0)
    }

    /// Replace the current operation with a new one.
    ///
    /// The applicator will RAUW old results → new results (1:1 by index),
    /// then remove the old op from its block and insert the new one.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.replacement = Some(new_op);
    }

    /// Erase the current operation, mapping its results to the given values.
    pub fn erase_op(&mut self, replacement_values: Vec<ValueRef>) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.erase_values = Some(replacement_values);
    }

    // === Query ===

    pub(crate) fn has_mutations(&self) -> bool {
        !self.prefix_ops.is_empty() || self.replacement.is_some() || self.erase_values.is_some()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
        }
    }
}

impl Mutations {
    /// Every operation the rewrite introduces.
    pub(crate) fn new_ops(&self) -> impl Iterator<Item = OpRef> + '_ {
        self.prefix_ops.iter().copied().chain(self.replacement)
    }
}

/// Apply mutations to the context.
///
/// Called by the applicator after a pattern returns `Ok(true)`.
pub(crate) fn apply_mutations(ctx: &mut IrContext, original_op: OpRef, mutations: Mutations) {
    let parent_block = ctx.op(original_op).parent_block;

    // 1. Insert prefix ops before the original op
    if let Some(block) = parent_block {
        for &prefix_op in &mutations.prefix_ops {
            ctx.insert_op_before(block, original_op, prefix_op);
        }
    }

    // 2. Handle replacement or erasure
    if let Some(new_op) = mutations.replacement {
        let old_results = ctx.op_results(original_op).to_vec();
        let new_results = ctx.op_results(new_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            new_results.len(),
            "replace_op: result count mismatch ({} vs {})",
            old_results.len(),
            new_results.len()
        );
        for (&old_v, &new_v) in old_results.iter().zip(&new_results) {
            ctx.replace_all_uses(old_v, new_v);
        }

        if let Some(block) = parent_block {
            ctx.insert_op_before(block, original_op, new_op);
            ctx.remove_op_from_block(block, original_op);
        }
        ctx.remove_op(original_op);
    } else if let Some(erase_values) = mutations.erase_values {
        let old_results = ctx.op_results(original_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            erase_values.len(),
            "erase_op: replacement value count mismatch ({} vs {})",
            old_results.len(),
            erase_values.len()
        );
        for (&old_v, &new_v) in old_results.iter().zip(&erase_values) {
            ctx.replace_all_uses(old_v, new_v);
        }

        if let Some(block) = parent_block {
            ctx.remove_op_from_block(block, original_op);
        }
        ctx.remove_op(original_op);
    }
}
