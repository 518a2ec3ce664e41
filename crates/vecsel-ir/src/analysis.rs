//! Per-invocation memoization of per-operation analyses.
//!
//! An [`AnalysisManager`] lives for one pass run. Analyses are computed on
//! first request and cached by `(analysis type, operation)`; nothing survives
//! the manager being dropped.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::context::IrContext;
use crate::refs::OpRef;

/// A fact computed about a single operation.
pub trait OpAnalysis: Clone + 'static {
    fn compute(ctx: &IrContext, op: OpRef, analyses: &AnalysisManager) -> Self;
}

#[derive(Default)]
pub struct AnalysisManager {
    cache: RefCell<HashMap<(TypeId, OpRef), Box<dyn Any>>>,
}

impl AnalysisManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached analysis for `op`, computing it on first request.
    pub fn get<A: OpAnalysis>(&self, ctx: &IrContext, op: OpRef) -> A {
        let key = (TypeId::of::<A>(), op);
        if let Some(cached) = self
            .cache
            .borrow()
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<A>())
        {
            return cached.clone();
        }
        // The borrow is released before computing so analyses may query others.
        let value = A::compute(ctx, op, self);
        self.cache.borrow_mut().insert(key, Box::new(value.clone()));
        value
    }

    pub fn is_cached<A: OpAnalysis>(&self, op: OpRef) -> bool {
        self.cache.borrow().contains_key(&(TypeId::of::<A>(), op))
    }

    /// Drop every cached result for `op`.
    pub fn invalidate(&self, op: OpRef) {
        self.cache.borrow_mut().retain(|(_, cached), _| *cached != op);
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::ops::OpKind;

    thread_local! {
        static COMPUTATIONS: Cell<u32> = const { Cell::new(0) };
    }

    #[derive(Clone, Debug, PartialEq)]
    struct OperandCount(usize);

    impl OpAnalysis for OperandCount {
        fn compute(ctx: &IrContext, op: OpRef, _: &AnalysisManager) -> Self {
            COMPUTATIONS.with(|c| c.set(c.get() + 1));
            OperandCount(ctx.op_operands(op).len())
        }
    }

    #[test]
    fn analysis_is_memoized_per_op() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let c = OperationDataBuilder::new(OpKind::Constant)
            .result(i32_ty)
            .attr("value", 1i64)
            .create(&mut ctx);
        let v = ctx.op_result(c, 0);
        let add = OperationDataBuilder::new(OpKind::AddI)
            .operands([v, v])
            .result(i32_ty)
            .create(&mut ctx);

        let am = AnalysisManager::new();
        COMPUTATIONS.with(|c| c.set(0));
        assert_eq!(am.get::<OperandCount>(&ctx, add), OperandCount(2));
        assert_eq!(am.get::<OperandCount>(&ctx, add), OperandCount(2));
        assert_eq!(am.get::<OperandCount>(&ctx, c), OperandCount(0));
        assert_eq!(COMPUTATIONS.with(Cell::get), 2);
        assert!(am.is_cached::<OperandCount>(add));

        am.invalidate(add);
        assert!(!am.is_cached::<OperandCount>(add));
        assert_eq!(am.len(), 1);
    }
}
