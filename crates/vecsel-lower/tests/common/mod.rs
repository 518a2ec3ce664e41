//! Helpers for building single-block test functions.

#![allow(dead_code)]

use vecsel_ir::dialect::func;
use vecsel_ir::interp::{RtValue, run_function};
use vecsel_ir::printer::print_op;
use vecsel_ir::transforms::dce::eliminate_dead_code;
use vecsel_ir::{BlockRef, IrContext, OpRef, TypeRef, ValueRef};
use vecsel_lower::{LowerOptions, LowerReport, LowerResult, lower_vector_to_target};

pub struct TestFunc {
    pub func: OpRef,
    pub entry: BlockRef,
    pub args: Vec<ValueRef>,
}

impl TestFunc {
    pub fn new(ctx: &mut IrContext, name: &str, arg_types: Vec<TypeRef>) -> Self {
        let (func, entry) = func::func(ctx, name, arg_types);
        let args = ctx.block_args(entry).to_vec();
        Self { func, entry, args }
    }

    /// Append `op` to the body and return its result.
    pub fn push(&self, ctx: &mut IrContext, op: OpRef) -> ValueRef {
        ctx.push_op(self.entry, op);
        ctx.op_result(op, 0)
    }

    pub fn ret(&self, ctx: &mut IrContext, values: impl IntoIterator<Item = ValueRef>) {
        let ret = func::r#return(ctx, values);
        ctx.push_op(self.entry, ret);
    }

    /// Lower, then sweep what the rewrites left unused.
    pub fn lower(&self, ctx: &mut IrContext, options: &LowerOptions) -> LowerResult<LowerReport> {
        let report = lower_vector_to_target(ctx, self.func, options)?;
        eliminate_dead_code(ctx, self.func);
        Ok(report)
    }

    pub fn print(&self, ctx: &IrContext) -> String {
        print_op(ctx, self.func)
    }

    pub fn run(&self, ctx: &IrContext, args: Vec<RtValue>) -> Vec<RtValue> {
        run_function(ctx, self.func, args).unwrap()
    }

    pub fn kinds(&self, ctx: &IrContext) -> Vec<String> {
        ctx.block(self.entry)
            .ops
            .iter()
            .map(|&op| ctx.op_kind(op).to_string())
            .collect()
    }
}

pub fn aieml() -> LowerOptions {
    LowerOptions::from_selector("aieml").unwrap()
}

pub fn aie() -> LowerOptions {
    LowerOptions::from_selector("aie").unwrap()
}
