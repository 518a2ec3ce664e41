//! Reference interpreter for lane-level semantics.
//!
//! Evaluates a `func.func` over concrete values so that a function can be
//! run before and after lowering and the results compared. Integers are
//! held as `i128` normalized to their type's width (sign-extended, except
//! unsigned and `i1` lanes which are zero-extended); floats as `f64` rounded
//! to their type's precision.

use std::collections::HashMap;

use derive_more::{Display, Error};

use crate::context::IrContext;
use crate::dialect::{aievec::ShuffleAttrs, arith, func, vector};
use crate::ops::{CombiningKind, FloatPredicate, IntPredicate, OpKind, attr};
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::types::{Attribute, FloatFormat, Signedness, TypeData};

// ============================================================================
// Values
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lane {
    Int(i128),
    Float(f64),
}

impl Lane {
    pub fn as_int(self) -> i128 {
        match self {
            Lane::Int(v) => v,
            Lane::Float(v) => v as i128,
        }
    }

    pub fn as_float(self) -> f64 {
        match self {
            Lane::Int(v) => v as f64,
            Lane::Float(v) => v,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RtValue {
    Scalar(Lane),
    Vector(Vec<Lane>),
    /// Row-major contents of a memory buffer.
    Memory(Vec<Lane>),
}

impl RtValue {
    pub fn int_vector(lanes: impl IntoIterator<Item = i128>) -> Self {
        RtValue::Vector(lanes.into_iter().map(Lane::Int).collect())
    }

    pub fn float_vector(lanes: impl IntoIterator<Item = f64>) -> Self {
        RtValue::Vector(lanes.into_iter().map(Lane::Float).collect())
    }

    pub fn int_memory(lanes: impl IntoIterator<Item = i128>) -> Self {
        RtValue::Memory(lanes.into_iter().map(Lane::Int).collect())
    }

    pub fn lanes(&self) -> &[Lane] {
        match self {
            RtValue::Scalar(lane) => std::slice::from_ref(lane),
            RtValue::Vector(lanes) | RtValue::Memory(lanes) => lanes,
        }
    }

    pub fn ints(&self) -> Vec<i128> {
        self.lanes().iter().map(|l| l.as_int()).collect()
    }

    pub fn floats(&self) -> Vec<f64> {
        self.lanes().iter().map(|l| l.as_float()).collect()
    }
}

#[derive(Debug, Display, Error)]
pub enum InterpError {
    #[display("{kind} is not supported by the interpreter: {reason}")]
    Unsupported { kind: OpKind, reason: String },
    #[display("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[display("value {_0} was used before it was computed")]
    Unbound(#[error(not(source))] ValueRef),
    #[display("{_0}")]
    Malformed(#[error(not(source))] String),
}

type InterpResult<T> = Result<T, InterpError>;

fn malformed(what: impl Into<String>) -> InterpError {
    InterpError::Malformed(what.into())
}

// ============================================================================
// Lane typing
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum ElemKind {
    Int { bits: u32, signedness: Signedness },
    Float(FloatFormat),
    Index,
}

fn elem_kind(ctx: &IrContext, ty: TypeRef) -> ElemKind {
    match ctx.types.get(ctx.types.element_type(ty)) {
        TypeData::Int { width, signedness } => ElemKind::Int {
            bits: *width,
            signedness: *signedness,
        },
        TypeData::Float(format) => ElemKind::Float(*format),
        _ => ElemKind::Index,
    }
}

fn elem_bits(ctx: &IrContext, ty: TypeRef) -> u32 {
    match elem_kind(ctx, ty) {
        ElemKind::Int { bits, .. } => bits,
        ElemKind::Float(format) => format.width(),
        ElemKind::Index => 64,
    }
}

fn wrap_int(v: i128, bits: u32, signedness: Signedness) -> i128 {
    if bits >= 128 {
        return v;
    }
    let m = v & ((1i128 << bits) - 1);
    if signedness == Signedness::Unsigned || bits == 1 || (m >> (bits - 1)) & 1 == 0 {
        m
    } else {
        m - (1i128 << bits)
    }
}

/// Shift amounts wrap at the lane width, as the shift units do.
fn lane_shift(shift: i64, bits: u32) -> u32 {
    shift.rem_euclid(i64::from(bits.clamp(1, 127))) as u32
}

fn saturate_int(v: i128, bits: u32, signedness: Signedness) -> i128 {
    if bits >= 127 {
        return v;
    }
    let (lo, hi) = if signedness == Signedness::Unsigned {
        (0, (1i128 << bits) - 1)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    };
    v.clamp(lo, hi)
}

fn round_float(v: f64, format: FloatFormat) -> f64 {
    match format {
        // f16 lanes are kept at f32 precision.
        FloatFormat::F32 | FloatFormat::F16 => v as f32 as f64,
        FloatFormat::BF16 => {
            let f = v as f32;
            if f.is_nan() {
                return f as f64;
            }
            let bits = f.to_bits();
            let lsb = (bits >> 16) & 1;
            f32::from_bits(bits.wrapping_add(0x7fff + lsb) & 0xffff_0000) as f64
        }
    }
}

/// Wrap (integers) or round (floats) a lane into the element type of `ty`.
fn normalize(kind: ElemKind, lane: Lane) -> Lane {
    match kind {
        ElemKind::Int { bits, signedness } => Lane::Int(wrap_int(lane.as_int(), bits, signedness)),
        ElemKind::Float(format) => Lane::Float(round_float(lane.as_float(), format)),
        ElemKind::Index => Lane::Int(lane.as_int()),
    }
}

fn unsigned_view(lane: Lane, kind: ElemKind) -> i128 {
    match kind {
        ElemKind::Int { bits, .. } => wrap_int(lane.as_int(), bits, Signedness::Unsigned),
        _ => lane.as_int(),
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Run `func` with `args` bound to its entry block arguments and return the
/// values passed to `func.return`.
pub fn run_function(ctx: &IrContext, func_op: OpRef, args: Vec<RtValue>) -> InterpResult<Vec<RtValue>> {
    Interpreter::new(ctx).run(func_op, args)
}

pub struct Interpreter<'a> {
    ctx: &'a IrContext,
    env: HashMap<ValueRef, RtValue>,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            env: HashMap::new(),
        }
    }

    pub fn run(&mut self, func_op: OpRef, args: Vec<RtValue>) -> InterpResult<Vec<RtValue>> {
        let entry = func::entry_block(self.ctx, func_op)
            .ok_or_else(|| malformed(format!("{func_op} is not a function")))?;
        let params = self.ctx.block_args(entry);
        if params.len() != args.len() {
            return Err(InterpError::ArgumentCount {
                expected: params.len(),
                actual: args.len(),
            });
        }
        for (&param, arg) in params.iter().zip(args) {
            self.env.insert(param, arg);
        }

        for &op in &self.ctx.block(entry).ops {
            if self.ctx.op_kind(op) == OpKind::Return {
                return self
                    .ctx
                    .op_operands(op)
                    .iter()
                    .map(|&v| self.get(v).cloned())
                    .collect();
            }
            let value = self.eval(op)?;
            let result = self.ctx.op_result(op, 0);
            self.env.insert(result, value);
        }
        Ok(Vec::new())
    }

    fn get(&self, v: ValueRef) -> InterpResult<&RtValue> {
        self.env.get(&v).ok_or(InterpError::Unbound(v))
    }

    fn operand(&self, op: OpRef, index: usize) -> InterpResult<&RtValue> {
        let v = *self
            .ctx
            .op_operands(op)
            .get(index)
            .ok_or_else(|| malformed(format!("{op} has no operand #{index}")))?;
        self.get(v)
    }

    fn operand_kind(&self, op: OpRef, index: usize) -> ElemKind {
        elem_kind(self.ctx, self.ctx.value_ty(self.ctx.op_operands(op)[index]))
    }

    fn scalar_operand(&self, op: OpRef, index: usize) -> InterpResult<i128> {
        Ok(self
            .operand(op, index)?
            .lanes()
            .first()
            .ok_or_else(|| malformed(format!("operand #{index} of {op} is empty")))?
            .as_int())
    }

    fn result_ty(&self, op: OpRef) -> InterpResult<TypeRef> {
        self.ctx
            .op_result_types(op)
            .first()
            .copied()
            .ok_or_else(|| malformed(format!("{op} has no result")))
    }

    fn result_lanes(&self, op: OpRef) -> InterpResult<usize> {
        let ty = self.result_ty(op)?;
        Ok(self
            .ctx
            .types
            .vector_shape(ty)
            .map(|s| s.lanes as usize)
            .unwrap_or(1))
    }

    /// Wrap lanes into the result type of `op`, as a vector or scalar.
    fn finish(&self, op: OpRef, lanes: Vec<Lane>) -> InterpResult<RtValue> {
        let ty = self.result_ty(op)?;
        let kind = elem_kind(self.ctx, ty);
        let lanes: Vec<Lane> = lanes.into_iter().map(|l| normalize(kind, l)).collect();
        if self.ctx.types.is_vector(ty) {
            Ok(RtValue::Vector(lanes))
        } else {
            lanes
                .first()
                .copied()
                .map(RtValue::Scalar)
                .ok_or_else(|| malformed(format!("{op} produced no lanes")))
        }
    }

    fn unsupported(&self, op: OpRef, reason: &str) -> InterpError {
        InterpError::Unsupported {
            kind: self.ctx.op_kind(op),
            reason: reason.to_string(),
        }
    }

    fn lanewise(&self, op: OpRef, f: impl Fn(Lane, Lane) -> Lane) -> InterpResult<RtValue> {
        let lhs = self.operand(op, 0)?.lanes().to_vec();
        let rhs = self.operand(op, 1)?.lanes().to_vec();
        let n = self.result_lanes(op)?;
        if lhs.len() < n || rhs.len() < n {
            return Err(malformed(format!("{op}: operands narrower than result")));
        }
        self.finish(op, (0..n).map(|i| f(lhs[i], rhs[i])).collect())
    }

    fn eval(&self, op: OpRef) -> InterpResult<RtValue> {
        let kind = self.ctx.op_kind(op);
        match kind {
            OpKind::Constant => {
                let lane = match self.ctx.attr(op, attr::VALUE) {
                    Some(Attribute::FloatBits(bits)) => Lane::Float(f64::from_bits(*bits)),
                    Some(a @ Attribute::IntBits(_)) => Lane::Int(a.as_int().unwrap_or_default() as i128),
                    Some(Attribute::Bool(b)) => Lane::Int(*b as i128),
                    _ => return Err(malformed(format!("{op}: constant without value"))),
                };
                let n = self.result_lanes(op)?;
                self.finish(op, vec![lane; n])
            }

            OpKind::AddI | OpKind::AddElem => self.lanewise(op, add_lanes),
            OpKind::SubI | OpKind::SubElem => self.lanewise(op, sub_lanes),
            OpKind::AddF => self.lanewise(op, add_lanes),
            OpKind::SubF => self.lanewise(op, sub_lanes),
            OpKind::MulI | OpKind::MulF | OpKind::MulElem => self.lanewise(op, mul_lanes),
            OpKind::Add | OpKind::Sub | OpKind::Mul => {
                if !ShuffleAttrs::of(self.ctx, op).is_default() {
                    return Err(self.unsupported(op, "non-default lane shuffles"));
                }
                match kind {
                    OpKind::Add => self.lanewise(op, add_lanes),
                    OpKind::Sub => self.lanewise(op, sub_lanes),
                    _ => self.lanewise(op, mul_lanes),
                }
            }
            OpKind::MinSI | OpKind::MaxSI | OpKind::MinF | OpKind::MaxF | OpKind::Min | OpKind::Max => {
                let ek = self.operand_kind(op, 0);
                let take_min = matches!(kind, OpKind::MinSI | OpKind::MinF | OpKind::Min);
                self.lanewise(op, |a, b| {
                    let a_less = less_than(a, b, ek);
                    if a_less == take_min { a } else { b }
                })
            }

            OpKind::CmpI => {
                let pred = arith::int_predicate(self.ctx, op)
                    .ok_or_else(|| malformed(format!("{op}: missing predicate")))?;
                let ek = self.operand_kind(op, 0);
                self.lanewise(op, |a, b| Lane::Int(int_compare(pred, a, b, ek) as i128))
            }
            OpKind::CmpF => {
                let pred = arith::float_predicate(self.ctx, op)
                    .ok_or_else(|| malformed(format!("{op}: missing predicate")))?;
                self.lanewise(op, |a, b| {
                    Lane::Int(float_compare(pred, a.as_float(), b.as_float()) as i128)
                })
            }
            OpKind::Select => {
                let cond = self.operand(op, 0)?.lanes().to_vec();
                let on_true = self.operand(op, 1)?.lanes().to_vec();
                let on_false = self.operand(op, 2)?.lanes().to_vec();
                let lanes = (0..on_true.len())
                    .map(|i| {
                        let c = cond.get(i).or(cond.first()).map(|l| l.as_int() != 0);
                        if c.unwrap_or(false) { on_true[i] } else { on_false[i] }
                    })
                    .collect();
                self.finish(op, lanes)
            }
            OpKind::ExtSI | OpKind::ExtF | OpKind::Cast | OpKind::Ups | OpKind::Srs => {
                self.eval_conversion(op, kind)
            }
            OpKind::UnrealizedCast => self.eval_bitcast(op),

            OpKind::Reduction => {
                let combining = vector::combining_kind(self.ctx, op)
                    .ok_or_else(|| malformed(format!("{op}: missing combining kind")))?;
                let ek = self.operand_kind(op, 0);
                let lanes = self.operand(op, 0)?.lanes().to_vec();
                let (first, rest) = lanes
                    .split_first()
                    .ok_or_else(|| malformed(format!("{op}: empty vector")))?;
                let result = rest.iter().fold(*first, |acc, &l| match combining {
                    CombiningKind::Add => add_lanes(acc, l),
                    CombiningKind::Mul => mul_lanes(acc, l),
                    CombiningKind::MinSI | CombiningKind::MinF => {
                        if less_than(l, acc, ek) { l } else { acc }
                    }
                    CombiningKind::MaxSI | CombiningKind::MaxF => {
                        if less_than(acc, l, ek) { l } else { acc }
                    }
                    CombiningKind::MinUI => {
                        if unsigned_view(l, ek) < unsigned_view(acc, ek) { l } else { acc }
                    }
                    CombiningKind::MaxUI => {
                        if unsigned_view(acc, ek) < unsigned_view(l, ek) { l } else { acc }
                    }
                });
                self.finish(op, vec![result])
            }
            OpKind::Broadcast | OpKind::BroadcastScalar => {
                let lane = *self
                    .operand(op, 0)?
                    .lanes()
                    .first()
                    .ok_or_else(|| malformed(format!("{op}: empty scalar")))?;
                let n = self.result_lanes(op)?;
                self.finish(op, vec![lane; n])
            }
            OpKind::Extract => {
                let pos = vector::extract_position(self.ctx, op).unwrap_or(0) as usize;
                let lane = self.lane_at(op, 0, pos)?;
                self.finish(op, vec![lane])
            }
            OpKind::BroadcastLane => {
                let idx = self.ctx.int_attr(op, attr::IDX).unwrap_or(0) as usize;
                let lane = self.lane_at(op, 0, idx)?;
                let n = self.result_lanes(op)?;
                self.finish(op, vec![lane; n])
            }
            OpKind::ExtElem => {
                let idx = self.scalar_operand(op, 1)? as usize;
                let lane = self.lane_at(op, 0, idx)?;
                self.finish(op, vec![lane])
            }

            OpKind::TransferRead | OpKind::Upd => self.eval_load(op, kind),
            OpKind::Concat => {
                let mut lanes = Vec::new();
                for i in 0..self.ctx.op_operands(op).len() {
                    lanes.extend_from_slice(self.operand(op, i)?.lanes());
                }
                self.finish(op, lanes)
            }
            OpKind::Ext => {
                let n = self.result_lanes(op)?;
                let index = self.ctx.int_attr(op, attr::INDEX).unwrap_or(0) as usize;
                let src = self.operand(op, 0)?.lanes();
                let part = src
                    .get(index * n..(index + 1) * n)
                    .ok_or_else(|| malformed(format!("{op}: slice out of range")))?;
                self.finish(op, part.to_vec())
            }
            OpKind::Shift => {
                let n = self.result_lanes(op)?;
                let bytes = self.scalar_operand(op, 2)?;
                let bits = elem_bits(self.ctx, self.result_ty(op)?) as i128;
                let start = (bytes * 8 / bits) as usize;
                let mut joined = self.operand(op, 0)?.lanes().to_vec();
                joined.extend_from_slice(self.operand(op, 1)?.lanes());
                let window = joined
                    .get(start..start + n)
                    .ok_or_else(|| malformed(format!("{op}: shift past the end")))?;
                self.finish(op, window.to_vec())
            }

            OpKind::Fma | OpKind::FmaElem => {
                if kind == OpKind::Fma && !ShuffleAttrs::of(self.ctx, op).is_default() {
                    return Err(self.unsupported(op, "non-default lane shuffles"));
                }
                let lhs = self.operand(op, 0)?.lanes().to_vec();
                let rhs = self.operand(op, 1)?.lanes().to_vec();
                let acc = self.operand(op, 2)?.lanes().to_vec();
                let fmsub = self.ctx.bool_attr(op, attr::FMSUB).unwrap_or(false);
                if lhs.len() < acc.len() || rhs.len() < acc.len() {
                    return Err(malformed(format!("{op}: operands narrower than accumulator")));
                }
                let lanes = (0..acc.len())
                    .map(|i| {
                        let prod = mul_lanes(lhs[i], rhs[i]);
                        if fmsub {
                            sub_lanes(acc[i], prod)
                        } else {
                            add_lanes(acc[i], prod)
                        }
                    })
                    .collect();
                self.finish(op, lanes)
            }
            OpKind::Cmp => {
                let pred = self.ctx.str_attr(op, attr::PRED).unwrap_or_default();
                let pred = target_predicate(pred).ok_or_else(|| self.unsupported(op, "unknown predicate"))?;
                let ek = self.operand_kind(op, 0);
                let lhs = self.operand(op, 0)?.lanes().to_vec();
                let rhs = self.operand(op, 1)?.lanes().to_vec();
                let mut mask = 0i128;
                for (i, (&a, &b)) in lhs.iter().zip(&rhs).enumerate() {
                    let set = match ek {
                        ElemKind::Float(_) => float_compare(float_twin(pred), a.as_float(), b.as_float()),
                        _ => int_compare(pred, a, b, ek),
                    };
                    if set {
                        mask |= 1 << i;
                    }
                }
                self.finish(op, vec![Lane::Int(mask)])
            }
            OpKind::Sel => {
                let on_true = self.operand(op, 0)?.lanes().to_vec();
                let on_false = self.operand(op, 1)?.lanes().to_vec();
                let mask = self.scalar_operand(op, 2)?;
                let lanes = (0..on_true.len())
                    .map(|i| if (mask >> i) & 1 == 1 { on_true[i] } else { on_false[i] })
                    .collect();
                self.finish(op, lanes)
            }

            OpKind::Func | OpKind::Return => Err(self.unsupported(op, "not a value operation")),
        }
    }

    fn lane_at(&self, op: OpRef, operand: usize, index: usize) -> InterpResult<Lane> {
        self.operand(op, operand)?
            .lanes()
            .get(index)
            .copied()
            .ok_or_else(|| malformed(format!("{op}: lane {index} out of range")))
    }

    fn eval_conversion(&self, op: OpRef, kind: OpKind) -> InterpResult<RtValue> {
        let src = self.operand(op, 0)?.lanes().to_vec();
        let shift = self.ctx.int_attr(op, attr::SHIFT).unwrap_or(0);
        let src_bits = elem_bits(self.ctx, self.ctx.value_ty(self.ctx.op_operands(op)[0]));
        let lanes = match (kind, elem_kind(self.ctx, self.result_ty(op)?)) {
            (OpKind::Ups, ElemKind::Int { bits, .. }) => {
                let shift = lane_shift(shift, bits);
                src.into_iter().map(|l| Lane::Int(l.as_int() << shift)).collect()
            }
            (OpKind::Srs, ElemKind::Int { bits, signedness }) => src
                .into_iter()
                .map(|l| {
                    let shift = lane_shift(shift, src_bits);
                    let v = l.as_int();
                    let rounded = if shift == 0 {
                        v
                    } else {
                        (v + (1i128 << (shift - 1))) >> shift
                    };
                    Lane::Int(saturate_int(rounded, bits, signedness))
                })
                .collect(),
            _ => src,
        };
        self.finish(op, lanes)
    }

    /// `unrealized_conversion_cast`: pack or unpack `i1` lanes into a bit mask,
    /// otherwise pass lanes through.
    fn eval_bitcast(&self, op: OpRef) -> InterpResult<RtValue> {
        let src_ty = self.ctx.value_ty(self.ctx.op_operands(op)[0]);
        let dst_ty = self.result_ty(op)?;
        let src = self.operand(op, 0)?.lanes().to_vec();
        let src_is_bool_vec = self.ctx.types.is_vector(src_ty) && elem_bits(self.ctx, src_ty) == 1;
        let dst_is_bool_vec = self.ctx.types.is_vector(dst_ty) && elem_bits(self.ctx, dst_ty) == 1;
        if src_is_bool_vec && !self.ctx.types.is_vector(dst_ty) {
            let mask = src
                .iter()
                .enumerate()
                .filter(|(_, l)| l.as_int() != 0)
                .fold(0i128, |m, (i, _)| m | (1 << i));
            return self.finish(op, vec![Lane::Int(mask)]);
        }
        if dst_is_bool_vec && !self.ctx.types.is_vector(src_ty) {
            let mask = src.first().map(|l| l.as_int()).unwrap_or(0);
            let n = self.result_lanes(op)?;
            return self.finish(op, (0..n).map(|i| Lane::Int((mask >> i) & 1)).collect());
        }
        self.finish(op, src)
    }

    fn eval_load(&self, op: OpRef, kind: OpKind) -> InterpResult<RtValue> {
        let access = vector::mem_access(self.ctx, op)
            .ok_or_else(|| malformed(format!("{op}: malformed memory access")))?;
        let mem_ty = self.ctx.value_ty(access.source);
        let TypeData::MemRef { shape, .. } = self.ctx.types.get(mem_ty) else {
            return Err(malformed(format!("{op}: source is not a buffer")));
        };
        let memory = self.get(access.source)?.lanes().to_vec();

        let mut base = 0i128;
        for (dim, &idx) in shape.iter().zip(&access.indices) {
            let idx = self.get(idx)?.lanes().first().map(|l| l.as_int()).unwrap_or(0);
            base = base * (*dim as i128) + idx;
        }

        let n = self.result_lanes(op)?;
        let read = |lane: usize| {
            usize::try_from(base + lane as i128)
                .ok()
                .and_then(|i| memory.get(i).copied())
                .unwrap_or(Lane::Int(0))
        };

        match kind {
            OpKind::TransferRead => {
                if access.trailing.is_some() {
                    return Err(self.unsupported(op, "masked reads"));
                }
                self.finish(op, (0..n).map(read).collect())
            }
            _ => {
                let mut lanes = match access.trailing {
                    Some(carry) => self.get(carry)?.lanes().to_vec(),
                    None => vec![Lane::Int(0); n],
                };
                let bits = elem_bits(self.ctx, self.result_ty(op)?) as i64;
                let first = (self.ctx.int_attr(op, attr::OFFSET).unwrap_or(0) / bits) as usize;
                for (lane, slot) in lanes.iter_mut().enumerate().skip(first) {
                    *slot = read(lane - first);
                }
                self.finish(op, lanes)
            }
        }
    }
}

// ============================================================================
// Lane arithmetic
// ============================================================================

fn add_lanes(a: Lane, b: Lane) -> Lane {
    match (a, b) {
        (Lane::Int(x), Lane::Int(y)) => Lane::Int(x.wrapping_add(y)),
        _ => Lane::Float(a.as_float() + b.as_float()),
    }
}

fn sub_lanes(a: Lane, b: Lane) -> Lane {
    match (a, b) {
        (Lane::Int(x), Lane::Int(y)) => Lane::Int(x.wrapping_sub(y)),
        _ => Lane::Float(a.as_float() - b.as_float()),
    }
}

fn mul_lanes(a: Lane, b: Lane) -> Lane {
    match (a, b) {
        (Lane::Int(x), Lane::Int(y)) => Lane::Int(x.wrapping_mul(y)),
        _ => Lane::Float(a.as_float() * b.as_float()),
    }
}

fn less_than(a: Lane, b: Lane, kind: ElemKind) -> bool {
    match kind {
        ElemKind::Float(_) => a.as_float() < b.as_float(),
        ElemKind::Int {
            signedness: Signedness::Unsigned,
            ..
        } => unsigned_view(a, kind) < unsigned_view(b, kind),
        _ => a.as_int() < b.as_int(),
    }
}

fn int_compare(pred: IntPredicate, a: Lane, b: Lane, kind: ElemKind) -> bool {
    let (sa, sb) = (a.as_int(), b.as_int());
    let (ua, ub) = (unsigned_view(a, kind), unsigned_view(b, kind));
    match pred {
        IntPredicate::Eq => sa == sb,
        IntPredicate::Ne => sa != sb,
        IntPredicate::Slt => sa < sb,
        IntPredicate::Sle => sa <= sb,
        IntPredicate::Sgt => sa > sb,
        IntPredicate::Sge => sa >= sb,
        IntPredicate::Ult => ua < ub,
        IntPredicate::Ule => ua <= ub,
        IntPredicate::Ugt => ua > ub,
        IntPredicate::Uge => ua >= ub,
    }
}

fn float_compare(pred: FloatPredicate, a: f64, b: f64) -> bool {
    let unordered = a.is_nan() || b.is_nan();
    match pred {
        FloatPredicate::AlwaysFalse => false,
        FloatPredicate::AlwaysTrue => true,
        FloatPredicate::Ord => !unordered,
        FloatPredicate::Uno => unordered,
        FloatPredicate::Oeq => !unordered && a == b,
        FloatPredicate::Ogt => !unordered && a > b,
        FloatPredicate::Oge => !unordered && a >= b,
        FloatPredicate::Olt => !unordered && a < b,
        FloatPredicate::Ole => !unordered && a <= b,
        FloatPredicate::One => !unordered && a != b,
        FloatPredicate::Ueq => unordered || a == b,
        FloatPredicate::Ugt => unordered || a > b,
        FloatPredicate::Uge => unordered || a >= b,
        FloatPredicate::Ult => unordered || a < b,
        FloatPredicate::Ule => unordered || a <= b,
        FloatPredicate::Une => unordered || a != b,
    }
}

fn target_predicate(name: &str) -> Option<IntPredicate> {
    Some(match name {
        "eq" => IntPredicate::Eq,
        "ne" => IntPredicate::Ne,
        "slt" => IntPredicate::Slt,
        "sle" => IntPredicate::Sle,
        "sgt" => IntPredicate::Sgt,
        "sge" => IntPredicate::Sge,
        "ult" => IntPredicate::Ult,
        "ule" => IntPredicate::Ule,
        "ugt" => IntPredicate::Ugt,
        "uge" => IntPredicate::Uge,
        _ => return None,
    })
}

/// Float reading of a target compare predicate on float lanes: signed
/// variants are ordered, unsigned ones unordered.
fn float_twin(pred: IntPredicate) -> FloatPredicate {
    match pred {
        IntPredicate::Eq => FloatPredicate::Oeq,
        IntPredicate::Ne => FloatPredicate::Une,
        IntPredicate::Slt => FloatPredicate::Olt,
        IntPredicate::Sle => FloatPredicate::Ole,
        IntPredicate::Sgt => FloatPredicate::Ogt,
        IntPredicate::Sge => FloatPredicate::Oge,
        IntPredicate::Ult => FloatPredicate::Ult,
        IntPredicate::Ule => FloatPredicate::Ule,
        IntPredicate::Ugt => FloatPredicate::Ugt,
        IntPredicate::Uge => FloatPredicate::Uge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::aievec;
    use crate::ops::PermutationMap;

    #[test]
    fn wrap_and_saturate() {
        assert_eq!(wrap_int(200, 8, Signedness::Signless), -56);
        assert_eq!(wrap_int(-1, 8, Signedness::Unsigned), 255);
        assert_eq!(wrap_int(3, 1, Signedness::Signless), 1);
        assert_eq!(saturate_int(40_000, 16, Signedness::Signless), 32_767);
        assert_eq!(saturate_int(-40_000, 16, Signedness::Signless), -32_768);
        assert_eq!(saturate_int(-3, 32, Signedness::Unsigned), 0);
    }

    #[test]
    fn bf16_rounding_keeps_eight_bits_of_mantissa() {
        assert_eq!(round_float(1.0 + 1.0 / 256.0, FloatFormat::BF16), 1.0);
        assert_eq!(round_float(1.0 + 3.0 / 256.0, FloatFormat::BF16), 1.0 + 4.0 / 256.0);
        assert_eq!(round_float(3.5, FloatFormat::BF16), 3.5);
    }

    #[test]
    fn elementwise_add_wraps() {
        let mut ctx = IrContext::new();
        let i8_ty = ctx.types.int(8);
        let v_ty = ctx.types.vector(4, i8_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let add = arith::addi(&mut ctx, args[0], args[1]);
        let sum = ctx.op_result(add, 0);
        let ret = func::r#return(&mut ctx, [sum]);
        ctx.push_op(entry, add);
        ctx.push_op(entry, ret);

        let out = run_function(
            &ctx,
            f,
            vec![
                RtValue::int_vector([100, -1, 5, 127]),
                RtValue::int_vector([100, 1, -6, 1]),
            ],
        )
        .unwrap();
        assert_eq!(out[0].ints(), vec![-56, 0, -1, -128]);
    }

    #[test]
    fn shift_selects_byte_window_of_concatenation() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(4, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty, v_ty]);
        let args = ctx.block_args(entry).to_vec();
        let c = arith::constant_int(&mut ctx, i32_ty, 8);
        let cv = ctx.op_result(c, 0);
        let sh = aievec::shift(&mut ctx, v_ty, args[0], args[1], cv, false);
        let shv = ctx.op_result(sh, 0);
        let ret = func::r#return(&mut ctx, [shv]);
        for op in [c, sh, ret] {
            ctx.push_op(entry, op);
        }

        let out = run_function(
            &ctx,
            f,
            vec![RtValue::int_vector([0, 1, 2, 3]), RtValue::int_vector([4, 5, 6, 7])],
        )
        .unwrap();
        assert_eq!(out[0].ints(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn srs_rounds_half_up_then_saturates() {
        let mut ctx = IrContext::new();
        let i16_ty = ctx.types.int(16);
        let i32_ty = ctx.types.int(32);
        let acc_ty = ctx.types.vector(4, i32_ty);
        let v_ty = ctx.types.vector(4, i16_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![acc_ty]);
        let arg = ctx.block_arg(entry, 0);
        let srs = aievec::srs(&mut ctx, v_ty, arg, 2);
        let out_v = ctx.op_result(srs, 0);
        let ret = func::r#return(&mut ctx, [out_v]);
        ctx.push_op(entry, srs);
        ctx.push_op(entry, ret);

        let out = run_function(&ctx, f, vec![RtValue::int_vector([5, 6, -6, 1 << 20])]).unwrap();
        assert_eq!(out[0].ints(), vec![1, 2, -1, 32_767]);
    }

    #[test]
    fn shift_amounts_wrap_at_the_lane_width() {
        let mut ctx = IrContext::new();
        let i16_ty = ctx.types.int(16);
        let i32_ty = ctx.types.int(32);
        let v_ty = ctx.types.vector(4, i16_ty);
        let acc_ty = ctx.types.vector(4, i32_ty);
        let (f, entry) = func::func(&mut ctx, "f", vec![v_ty]);
        let arg = ctx.block_arg(entry, 0);
        // 33 wraps to 1 on 32-bit accumulator lanes.
        let ups = aievec::ups(&mut ctx, acc_ty, arg, 33);
        let acc = ctx.op_result(ups, 0);
        let srs = aievec::srs(&mut ctx, v_ty, acc, 32);
        let narrowed = ctx.op_result(srs, 0);
        let ret = func::r#return(&mut ctx, [acc, narrowed]);
        for op in [ups, srs, ret] {
            ctx.push_op(entry, op);
        }

        let out = run_function(&ctx, f, vec![RtValue::int_vector([3, -4, 0, 200])]).unwrap();
        assert_eq!(out[0].ints(), vec![6, -8, 0, 400]);
        assert_eq!(out[1].ints(), vec![6, -8, 0, 400]);
    }

    #[test]
    fn masked_read_is_unsupported() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let i1 = ctx.types.int(1);
        let index = ctx.types.index();
        let mem = ctx.types.memref(&[16], i32_ty);
        let v_ty = ctx.types.vector(8, i32_ty);
        let m_ty = ctx.types.vector(8, i1);
        let (f, entry) = func::func(&mut ctx, "f", vec![mem, index, m_ty]);
        let args = ctx.block_args(entry).to_vec();
        let read = vector::transfer_read(
            &mut ctx,
            v_ty,
            args[0],
            &args[1..2],
            PermutationMap::minor_identity(1),
            Some(args[2]),
        );
        ctx.push_op(entry, read);

        let err = run_function(
            &ctx,
            f,
            vec![
                RtValue::int_memory(0..16),
                RtValue::Scalar(Lane::Int(0)),
                RtValue::int_vector([1; 8]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, InterpError::Unsupported { kind: OpKind::TransferRead, .. }));
    }
}
