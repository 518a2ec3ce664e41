use std::cell::RefCell;
use std::rc::Rc;

use vecsel::{CleanupPass, Pipeline};
use vecsel_ir::dialect::{arith, func};
use vecsel_ir::printer::print_op;
use vecsel_ir::{IrContext, OpRef};
use vecsel_lower::{LowerErrorKind, LowerOptions, TargetGeneration};

/// `a * b + c` over 16 x i16.
fn mac(ctx: &mut IrContext) -> OpRef {
    let i16_ty = ctx.types.int(16);
    let v_ty = ctx.types.vector(16, i16_ty);
    let (f, entry) = func::func(ctx, "mac", vec![v_ty, v_ty, v_ty]);
    let args = ctx.block_args(entry).to_vec();
    let mul = arith::muli(ctx, args[0], args[1]);
    ctx.push_op(entry, mul);
    let product = ctx.op_result(mul, 0);
    let add = arith::addi(ctx, product, args[2]);
    ctx.push_op(entry, add);
    let sum = ctx.op_result(add, 0);
    let ret = func::r#return(ctx, [sum]);
    ctx.push_op(entry, ret);
    f
}

#[test]
fn dead_multiply_is_cleaned_up() {
    let mut ctx = IrContext::new();
    let f = mac(&mut ctx);

    let report = Pipeline::from_selector("aie")
        .unwrap()
        .run(&mut ctx, f)
        .unwrap();
    assert_eq!(report.lowering.target, TargetGeneration::Aie);
    assert_eq!(report.lowering.rewrites, 1);
    assert_eq!(report.cleanups, [("dce", 1)]);
    insta::assert_snapshot!(print_op(&ctx, f), @r#"
    func.func @mac(%0: vector<16xi16>, %1: vector<16xi16>, %2: vector<16xi16>) {
      %3 = aievec.concat %0, %0 : vector<32xi16>
      %4 = aievec.ups %2 {shift = 0} : vector<16xi48>
      %5 = aievec.fma %3, %1, %4 {fmsub = false, xoffsets = "", xoffsets_hi = "", xsquare = "", xstart = "", xstep = "", zoffsets = "", zoffsets_hi = "", zsquare = "", zstart = "", zstep = ""} : vector<16xi48>
      %6 = aievec.srs %5 {shift = 0} : vector<16xi16>
      func.return %6
    }
    "#);
}

#[test]
fn without_cleanups_the_multiply_survives() {
    let mut ctx = IrContext::new();
    let f = mac(&mut ctx);

    let report = Pipeline::new(LowerOptions::default()).run(&mut ctx, f).unwrap();
    assert!(report.cleanups.is_empty());
    assert!(print_op(&ctx, f).contains("arith.muli"));
}

#[test]
fn unknown_selector_leaves_the_function_alone() {
    let mut ctx = IrContext::new();
    let f = mac(&mut ctx);
    let before = print_op(&ctx, f);

    let err = Pipeline::from_selector("aie3").err().unwrap();
    assert!(matches!(err.kind(), LowerErrorKind::UnknownTarget(s) if s == "aie3"));
    assert_eq!(print_op(&ctx, f), before);
}

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl CleanupPass for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, _: &mut IrContext, _: OpRef) -> usize {
        self.log.borrow_mut().push(self.name);
        0
    }
}

#[test]
fn cleanups_run_in_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = IrContext::new();
    let f = mac(&mut ctx);

    let report = Pipeline::with_default_cleanups(LowerOptions::default())
        .cleanup(Recorder {
            name: "cse",
            log: log.clone(),
        })
        .cleanup(Recorder {
            name: "canonicalize",
            log: log.clone(),
        })
        .run(&mut ctx, f)
        .unwrap();

    assert_eq!(*log.borrow(), ["cse", "canonicalize"]);
    assert_eq!(report.cleanups, [("dce", 1), ("cse", 0), ("canonicalize", 0)]);
}

#[test]
fn failed_lowering_skips_cleanups() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = IrContext::new();
    let f = mac(&mut ctx);
    // With no iterations the vector add is left illegal.
    let options = LowerOptions::default().with_max_iterations(0);

    let result = Pipeline::new(options)
        .cleanup(Recorder {
            name: "cse",
            log: log.clone(),
        })
        .run(&mut ctx, f);

    assert!(result.is_err());
    assert!(log.borrow().is_empty());
}
