//! Structural validation of the operation graph.
//!
//! Two checks:
//!
//! 1. **Def-before-use**: every operand is a block argument or the result of
//!    an operation placed earlier in an enclosing block. This also proves the
//!    graph acyclic.
//! 2. **Use-chain consistency**: the use-chains stored in `IrContext` exactly
//!    match the operands of the attached operations.

use std::collections::HashSet;
use std::fmt;

use derive_more::Display;

use crate::context::{IrContext, Use};
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ValidationError {
    #[display("operand #{operand_index} of {consumer} ({op}) uses {value} before its definition")]
    UseBeforeDef {
        op: OpRef,
        consumer: String,
        operand_index: usize,
        value: String,
    },
    #[display("use-chain of {value} is missing {op}#{operand_index}")]
    MissingUse {
        value: ValueRef,
        op: OpRef,
        operand_index: u32,
    },
    #[display("use-chain of {value} records {op}#{operand_index}, which is not an operand use")]
    StaleUse {
        value: ValueRef,
        op: OpRef,
        operand_index: u32,
    },
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        writeln!(f, "{} error(s) found:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => format!("{v} (result #{idx} of {})", ctx.op_kind(op)),
        ValueDef::BlockArg(block, idx) => format!("{v} (argument #{idx} of {block})"),
    }
}

// ============================================================================
// Def-before-use
// ============================================================================

fn check_region_order(
    ctx: &IrContext,
    region: RegionRef,
    visible: &mut HashSet<ValueRef>,
    errors: &mut Vec<ValidationError>,
) {
    for &block in &ctx.region(region).blocks {
        check_block_order(ctx, block, visible.clone(), errors);
    }
}

fn check_block_order(
    ctx: &IrContext,
    block: BlockRef,
    mut visible: HashSet<ValueRef>,
    errors: &mut Vec<ValidationError>,
) {
    visible.extend(ctx.block_args(block).iter().copied());
    for &op in &ctx.block(block).ops {
        for (operand_index, &v) in ctx.op_operands(op).iter().enumerate() {
            if !visible.contains(&v) {
                errors.push(ValidationError::UseBeforeDef {
                    op,
                    consumer: ctx.op_kind(op).to_string(),
                    operand_index,
                    value: describe_value(ctx, v),
                });
            }
        }
        for &region in &ctx.op(op).regions {
            check_region_order(ctx, region, &mut visible, errors);
        }
        visible.extend(ctx.op_results(op).iter().copied());
    }
}

/// Check that every operand under `root` is defined before it is used.
pub fn validate_def_before_use(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut errors = Vec::new();
    let mut visible = HashSet::new();
    for &region in &ctx.op(root).regions {
        check_region_order(ctx, region, &mut visible, &mut errors);
    }
    ValidationResult { errors }
}

// ============================================================================
// Use-chain consistency
// ============================================================================

fn collect_ops(ctx: &IrContext, region: RegionRef, ops: &mut Vec<OpRef>, values: &mut HashSet<ValueRef>) {
    for &block in &ctx.region(region).blocks {
        values.extend(ctx.block_args(block).iter().copied());
        for &op in &ctx.block(block).ops {
            ops.push(op);
            values.extend(ctx.op_results(op).iter().copied());
            for &nested in &ctx.op(op).regions {
                collect_ops(ctx, nested, ops, values);
            }
        }
    }
}

/// Check that the use-chains of every value under `root` match the operands
/// of the attached operations.
pub fn validate_use_chains(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut ops = Vec::new();
    let mut values = HashSet::new();
    for &region in &ctx.op(root).regions {
        collect_ops(ctx, region, &mut ops, &mut values);
    }

    let mut errors = Vec::new();

    // Forward: every operand is recorded in the operand value's use-chain.
    for &op in &ops {
        for (idx, &v) in ctx.op_operands(op).iter().enumerate() {
            let expected = Use {
                user: op,
                operand_index: idx as u32,
            };
            if !ctx.uses(v).contains(&expected) {
                errors.push(ValidationError::MissingUse {
                    value: v,
                    op,
                    operand_index: idx as u32,
                });
            }
        }
    }

    // Backward: every recorded use points at a live operand slot.
    let live: HashSet<OpRef> = ops.iter().copied().collect();
    let mut sorted: Vec<ValueRef> = values.into_iter().collect();
    sorted.sort();
    for v in sorted {
        for u in ctx.uses(v) {
            let operands = ctx.op_operands(u.user);
            let matches = operands.get(u.operand_index as usize) == Some(&v);
            if !live.contains(&u.user) || !matches {
                errors.push(ValidationError::StaleUse {
                    value: v,
                    op: u.user,
                    operand_index: u.operand_index,
                });
            }
        }
    }

    ValidationResult { errors }
}

/// Run every check.
pub fn validate_all(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut result = validate_def_before_use(ctx, root);
    result.errors.extend(validate_use_chains(ctx, root).errors);
    result
}

/// Panic with the validation report in debug builds if `root` is malformed.
pub fn debug_assert_valid(ctx: &IrContext, root: OpRef, pass_name: &str) {
    if cfg!(debug_assertions) {
        let result = validate_all(ctx, root);
        assert!(result.is_ok(), "IR invalid after {pass_name}:\n{result}");
    }
}
