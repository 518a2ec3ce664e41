//! Text printer for the operation graph.
//!
//! ```text
//! func.func @mac(%0: vector<32xi16>, %1: vector<32xi16>, %2: vector<32xi16>) {
//!   %3 = aievec.ups %2 {shift = 0} : vector<32xi32>
//!   %4 = aievec.fma_elem %0, %1, %3 {fmsub = false} : vector<32xi32>
//!   %5 = aievec.srs %4 {shift = 0} : vector<32xi16>
//!   func.return %5
//! }
//! ```
//!
//! Values are numbered in print order, so the output of a rewritten graph
//! is independent of arena allocation order.

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::context::IrContext;
use crate::dialect::func;
use crate::ops::OpKind;
use crate::refs::*;
use crate::types::Attribute;

struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, usize>,
    next_value_num: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            next_value_num: 0,
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) -> String {
        let n = self.next_value_num;
        self.next_value_num += 1;
        self.value_names.insert(v, n);
        format!("%{n}")
    }

    fn value_name(&self, v: ValueRef) -> String {
        match self.value_names.get(&v) {
            Some(n) => format!("%{n}"),
            None => "%?".to_string(),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print an operation (and everything nested in it) as text.
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = print_operation(&mut state, &mut out, op, 0);
    out
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    ctx.types.render(ty)
}

// ============================================================================
// Attribute printing
// ============================================================================

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(_) => write!(f, "{}", attr.as_int().unwrap_or_default()),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            if v.is_finite() && !s.contains('.') && !s.contains('e') {
                f.write_str(".0")?;
            }
            Ok(())
        }
        Attribute::String(s) => write!(f, "{s:?}"),
        Attribute::Type(ty) => f.write_str(&ctx.types.render(*ty)),
        Attribute::List(list) => {
            f.write_char('[')?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
        Attribute::IntPredicate(p) => f.write_str(p.mnemonic()),
        Attribute::FloatPredicate(p) => f.write_str(p.mnemonic()),
        Attribute::Combining(kind) => write!(f, "<{}>", kind.mnemonic()),
        Attribute::Map(map) => write!(f, "affine_map<{map}>"),
    }
}

// ============================================================================
// Operation printing
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    if state.ctx.op_kind(op) == OpKind::Func {
        print_func_op(state, f, op, indent)
    } else {
        print_generic_op(state, f, op, indent)
    }
}

fn print_generic_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let indent_str = " ".repeat(indent);
    f.write_str(&indent_str)?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(v);
            f.write_str(&name)?;
        }
        f.write_str(" = ")?;
    }

    write!(f, "{}", ctx.op_kind(op))?;

    let operands = ctx.op_operands(op);
    if !operands.is_empty() {
        f.write_char(' ')?;
        for (i, &v) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&state.value_name(v))?;
        }
    }

    let attrs = &ctx.op(op).attributes;
    if !attrs.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&ctx.types.render(ty))?;
        }
    }

    for &region in ctx.op(op).regions.iter() {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent + 2)?;
        write!(f, "{indent_str}}}")?;
    }

    f.write_char('\n')
}

fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    for &block in ctx.region(region).blocks.iter() {
        for &op in ctx.block(block).ops.iter() {
            print_operation(state, f, op, indent)?;
        }
    }
    Ok(())
}

fn print_func_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let indent_str = " ".repeat(indent);
    write!(f, "{indent_str}func.func @{}", func::name(ctx, op).unwrap_or("?"))?;

    f.write_char('(')?;
    if let Some(entry) = func::entry_block(ctx, op) {
        for (i, &arg) in ctx.block_args(entry).iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(arg);
            write!(f, "{name}: {}", ctx.types.render(ctx.value_ty(arg)))?;
        }
    }
    f.write_str(") {\n")?;

    for &region in ctx.op(op).regions.iter() {
        print_region(state, f, region, indent + 2)?;
    }

    writeln!(f, "{indent_str}}}")
}
