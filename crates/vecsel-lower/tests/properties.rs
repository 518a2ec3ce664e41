//! Property tests: numeric equivalence, idempotence and legality closure.

mod common;

use common::TestFunc;
use proptest::prelude::*;
use vecsel_ir::dialect::arith;
use vecsel_ir::interp::RtValue;
use vecsel_ir::rewrite::LegalityCheck;
use vecsel_ir::{AnalysisManager, IrContext, OpRef, ValueRef};
use vecsel_lower::{LowerOptions, TargetGeneration, conversion_target, lower_vector_to_target};

const SHAPES: [(u32, u32); 5] = [(64, 8), (32, 16), (16, 32), (32, 32), (8, 32)];

#[derive(Clone, Copy, Debug)]
enum Binary {
    Add,
    Sub,
    Mul,
    Min,
    Max,
    MulAdd,
}

impl Binary {
    fn build(self, ctx: &mut IrContext, f: &TestFunc) -> ValueRef {
        let (a, b) = (f.args[0], f.args[1]);
        let op: OpRef = match self {
            Binary::Add => arith::addi(ctx, a, b),
            Binary::Sub => arith::subi(ctx, a, b),
            Binary::Mul => arith::muli(ctx, a, b),
            Binary::Min => arith::minsi(ctx, a, b),
            Binary::Max => arith::maxsi(ctx, a, b),
            Binary::MulAdd => {
                let mul = arith::muli(ctx, a, b);
                let product = f.push(ctx, mul);
                arith::addi(ctx, product, f.args[2])
            }
        };
        f.push(ctx, op)
    }

    /// Whether the lowered form computes exactly what the generic form does
    /// for small inputs. Multiplies saturate instead of wrapping.
    fn exact(self) -> bool {
        matches!(self, Binary::Add | Binary::Sub | Binary::Min | Binary::Max)
    }
}

fn arb_binary() -> impl Strategy<Value = Binary> {
    prop_oneof![
        Just(Binary::Add),
        Just(Binary::Sub),
        Just(Binary::Mul),
        Just(Binary::Min),
        Just(Binary::Max),
        Just(Binary::MulAdd),
    ]
}

fn arb_target() -> impl Strategy<Value = TargetGeneration> {
    prop_oneof![Just(TargetGeneration::Aie), Just(TargetGeneration::AieMl)]
}

fn build(ctx: &mut IrContext, shape: (u32, u32), op: Binary) -> TestFunc {
    let elem = ctx.types.int(shape.1);
    let v_ty = ctx.types.vector(shape.0, elem);
    let f = TestFunc::new(ctx, "kernel", vec![v_ty; 3]);
    let result = op.build(ctx, &f);
    f.ret(ctx, [result]);
    f
}

fn saturate_i16(v: i128) -> i128 {
    v.clamp(i16::MIN as i128, i16::MAX as i128)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `a * b + c` over 32 x i16, fused and narrowed with shift 0, equals
    /// the exact result saturated to 16 bits.
    #[test]
    fn fused_multiply_add_saturates(
        a in prop::collection::vec(any::<i16>(), 32),
        b in prop::collection::vec(any::<i16>(), 32),
        c in prop::collection::vec(any::<i16>(), 32),
    ) {
        let mut ctx = IrContext::new();
        let f = build(&mut ctx, (32, 16), Binary::MulAdd);
        let options = LowerOptions::default()
            .with_target(TargetGeneration::AieMl)
            .with_shift(0);
        lower_vector_to_target(&mut ctx, f.func, &options).unwrap();

        let widen = |v: &[i16]| RtValue::int_vector(v.iter().map(|&x| x as i128));
        let out = f.run(&ctx, vec![widen(&a), widen(&b), widen(&c)]);
        let expected: Vec<i128> = (0..32)
            .map(|i| saturate_i16(a[i] as i128 * b[i] as i128 + c[i] as i128))
            .collect();
        prop_assert_eq!(out[0].ints(), expected);
    }

    /// Lowering an already lowered function changes nothing.
    #[test]
    fn lowering_is_idempotent(
        target in arb_target(),
        shape in prop::sample::select(SHAPES.to_vec()),
        op in arb_binary(),
    ) {
        let mut ctx = IrContext::new();
        let f = build(&mut ctx, shape, op);
        let options = LowerOptions::default()
            .with_target(target)
            .with_fail_on_illegal(false);

        lower_vector_to_target(&mut ctx, f.func, &options).unwrap();
        let once = f.print(&ctx);
        let again = lower_vector_to_target(&mut ctx, f.func, &options).unwrap();
        prop_assert_eq!(again.rewrites, 0);
        prop_assert_eq!(f.print(&ctx), once);
    }

    /// After a successful lowering nothing is illegal, and the exact rewrites
    /// compute what the generic operations did.
    #[test]
    fn lowered_operations_are_legal_and_equivalent(
        target in arb_target(),
        shape in prop::sample::select(SHAPES.to_vec()),
        op in arb_binary(),
        seed in prop::collection::vec(-50i128..50, 128),
    ) {
        let mut ctx = IrContext::new();
        let f = build(&mut ctx, shape, op);
        let lanes = shape.0 as usize;
        let args: Vec<RtValue> = (0..3)
            .map(|k| RtValue::int_vector(seed.iter().cycle().skip(k * 7).take(lanes).copied()))
            .collect();
        let before = f.run(&ctx, args.clone());

        let options = LowerOptions::default().with_target(target);
        let Ok(report) = lower_vector_to_target(&mut ctx, f.func, &options) else {
            return Ok(());
        };
        prop_assert!(report.remaining.is_empty());

        let oracle = conversion_target(target);
        let am = AnalysisManager::new();
        for &lowered in ctx.block(f.entry).ops.iter() {
            prop_assert_ne!(oracle.is_legal(&ctx, lowered, &am), LegalityCheck::Illegal);
        }
        if op.exact() {
            prop_assert_eq!(f.run(&ctx, args), before);
        }
    }
}
