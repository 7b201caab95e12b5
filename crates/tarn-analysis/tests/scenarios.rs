//! End-to-end analyses of small programs with known expected intervals.

use tarn_analysis::RangeAnalysis;
use tarn_interval::{Bound, Interval, Lattice, Predicate, Width};
use tarn_ir::{BinaryOp, Function, FunctionBuilder, InstKind, Value};

const W: Width = Width::W32;

fn analyze(func: &mut Function) -> tarn_analysis::AnalysisResult {
    RangeAnalysis::new().run(func)
}

/// Rewire the back-edge operand of the first phi in `header` to `value`.
/// The builder cannot reference a value before it exists, so loops get
/// built with a placeholder and patched.
fn patch_back_edge(func: &mut Function, header: tarn_ir::Block, from: tarn_ir::Block, value: Value) {
    let phi = func.block_insts(header).next().expect("header has a phi");
    if let InstKind::Phi { incoming, .. } = &mut func.inst_mut(phi).kind {
        for (pred, operand) in incoming.iter_mut() {
            if *pred == from {
                *operand = value;
            }
        }
    }
    func.verify().expect("patched function verifies");
}

/// i = input(); if (i < 10) { a = i + 1 } else { b = i - 1 }
#[test]
fn branch_refinement_with_constant() {
    let mut b = FunctionBuilder::new("scenario1");
    let i = b.arg(W, "i");
    let entry = b.block();
    let then = b.block();
    let other = b.block();
    b.switch_to(entry);
    let ten = b.constant(10, W);
    let one = b.constant(1, W);
    let c = b.cmp(Predicate::Slt, i, ten);
    b.cond_br(c, then, other);
    b.switch_to(then);
    let a = b.binary(BinaryOp::Add, i, one);
    b.ret(Some(a));
    b.switch_to(other);
    let r = b.binary(BinaryOp::Sub, i, one);
    b.ret(Some(r));
    let mut func = b.finish().unwrap();

    let result = analyze(&mut func);
    assert!(result.interval(i).is_max_range());
    assert_eq!(result.interval(a), Interval::half_above(10));
    assert_eq!(result.interval(r), Interval::half_below(9));
}

/// x = 0; for (k = 0; k < 100; k++) x = x + 1 — the loop variable widens
/// to [0, +inf] and narrowing pulls it back to [0, 100].
#[test]
fn counted_loop_narrows_to_bound() {
    let mut b = FunctionBuilder::new("scenario2");
    let entry = b.block();
    let header = b.block();
    let body = b.block();
    let exit = b.block();
    b.switch_to(entry);
    let zero = b.constant(0, W);
    let one = b.constant(1, W);
    let hundred = b.constant(100, W);
    b.br(header);
    b.switch_to(header);
    let x = b.phi(&[(entry, zero), (body, zero)], W);
    let c = b.cmp(Predicate::Slt, x, hundred);
    b.cond_br(c, body, exit);
    b.switch_to(body);
    let next = b.binary(BinaryOp::Add, x, one);
    b.br(header);
    b.switch_to(exit);
    b.ret(Some(x));
    let mut func = b.finish().unwrap();
    patch_back_edge(&mut func, header, body, next);

    let result = analyze(&mut func);
    assert_eq!(result.interval(x), Interval::new(0, 100));
    // The refined copy inside the body stays below the bound.
    assert_eq!(result.interval(next), Interval::new(1, 100));
}

/// Without narrowing the widened loop bound remains at +inf.
#[test]
fn counted_loop_without_narrowing_keeps_infinity() {
    let mut b = FunctionBuilder::new("scenario2_wide");
    let entry = b.block();
    let header = b.block();
    let body = b.block();
    let exit = b.block();
    b.switch_to(entry);
    let zero = b.constant(0, W);
    let one = b.constant(1, W);
    let hundred = b.constant(100, W);
    b.br(header);
    b.switch_to(header);
    let x = b.phi(&[(entry, zero), (body, zero)], W);
    let c = b.cmp(Predicate::Slt, x, hundred);
    b.cond_br(c, body, exit);
    b.switch_to(body);
    let next = b.binary(BinaryOp::Add, x, one);
    b.br(header);
    b.switch_to(exit);
    b.ret(Some(x));
    let mut func = b.finish().unwrap();
    patch_back_edge(&mut func, header, body, next);

    let result = RangeAnalysis::new().with_narrowing(false).run(&mut func);
    assert_eq!(result.interval(x).lo(), Bound::Finite(0));
    assert_eq!(result.interval(x).hi(), Bound::PosInf);
}

/// y = 5; z = y * y - 1 — pure constant propagation.
#[test]
fn constants_fold_to_singletons() {
    let mut b = FunctionBuilder::new("scenario3");
    b.block();
    let y = b.constant(5, W);
    let one = b.constant(1, W);
    let sq = b.binary(BinaryOp::Mul, y, y);
    let z = b.binary(BinaryOp::Sub, sq, one);
    b.ret(Some(z));
    let mut func = b.finish().unwrap();

    let result = analyze(&mut func);
    assert_eq!(result.interval(y), Interval::constant(5));
    assert_eq!(result.interval(sq), Interval::constant(25));
    assert_eq!(result.interval(z), Interval::constant(24));
}

/// if (a > 0 && a < b) c = a else c = 0, with b constrained to [1, 50]:
/// the symbolic bound on b resolves to an upper limit of 49.
#[test]
fn symbolic_bound_resolves_against_computed_interval() {
    let mut b = FunctionBuilder::new("scenario4");
    let a = b.arg(W, "a");
    let input = b.arg(W, "binput");
    let entry = b.block();
    let positive = b.block();
    let inner = b.block();
    let fallback = b.block();
    let merge = b.block();

    b.switch_to(entry);
    let zero = b.constant(0, W);
    let one = b.constant(1, W);
    let fifty = b.constant(50, W);
    // bvar = clamp of the input into [1, 50] via refinement-free
    // arithmetic: bvar = (input & 31) + 1 yields [1, 32]; use a wider
    // guard instead so the test controls the bound interval exactly.
    let c1 = b.cmp(Predicate::Sgt, a, zero);
    b.cond_br(c1, positive, fallback);

    b.switch_to(positive);
    let bvar = b.binary(BinaryOp::And, input, fifty);
    let bvar1 = b.binary(BinaryOp::Or, bvar, one);
    let c2 = b.cmp(Predicate::Slt, a, bvar1);
    b.cond_br(c2, inner, fallback);

    b.switch_to(inner);
    b.br(merge);

    b.switch_to(fallback);
    b.br(merge);

    b.switch_to(merge);
    let c = b.phi(&[(inner, a), (fallback, zero)], W);
    b.ret(Some(c));
    let mut func = b.finish().unwrap();

    let result = analyze(&mut func);
    // bvar = input & 50 is [0, 50]; or-ing 1 keeps it within [1, 63].
    let bound = result.interval(bvar1);
    assert!(bound.is_subseteq(&Interval::new(1, 63)));
    // The phi value combines the refined `a` (positive, below the bound)
    // with the fallback 0.
    let c_itv = result.interval(c);
    assert_eq!(c_itv.lo(), Bound::Finite(0));
    assert_eq!(c_itv.hi(), Bound::Finite(62));
}

/// r = input() % 10 — signed remainder is bounded by the divisor's
/// magnitude on both sides.
#[test]
fn signed_remainder_magnitude() {
    let mut b = FunctionBuilder::new("scenario5");
    let x = b.arg(W, "x");
    b.block();
    let ten = b.constant(10, W);
    let r = b.binary(BinaryOp::Srem, x, ten);
    b.ret(Some(r));
    let mut func = b.finish().unwrap();

    let result = analyze(&mut func);
    assert_eq!(result.interval(r), Interval::new(-9, 9));
}

/// while (cond) x = x + 1 with an opaque condition: widening reaches
/// [0, +inf] and narrowing has no bound to pull back.
#[test]
fn unbounded_loop_keeps_upper_infinity() {
    let mut b = FunctionBuilder::new("scenario6");
    let cond = b.arg(Width::W1, "cond");
    let entry = b.block();
    let header = b.block();
    let body = b.block();
    let exit = b.block();
    b.switch_to(entry);
    let zero = b.constant(0, W);
    let one = b.constant(1, W);
    b.br(header);
    b.switch_to(header);
    let x = b.phi(&[(entry, zero), (body, zero)], W);
    b.cond_br(cond, body, exit);
    b.switch_to(body);
    let next = b.binary(BinaryOp::Add, x, one);
    b.br(header);
    b.switch_to(exit);
    b.ret(Some(x));
    let mut func = b.finish().unwrap();
    patch_back_edge(&mut func, header, body, next);

    let result = analyze(&mut func);
    assert_eq!(result.interval(x).lo(), Bound::Finite(0));
    assert_eq!(result.interval(x).hi(), Bound::PosInf);
}

/// Chained refinements compose: a guard inside a guarded region refines
/// the already-refined copy.
#[test]
fn nested_guards_compose() {
    let mut b = FunctionBuilder::new("nested");
    let x = b.arg(W, "x");
    let entry = b.block();
    let mid = b.block();
    let innermost = b.block();
    let out1 = b.block();
    let out2 = b.block();

    b.switch_to(entry);
    let zero = b.constant(0, W);
    let hundred = b.constant(100, W);
    let c1 = b.cmp(Predicate::Sge, x, zero);
    b.cond_br(c1, mid, out1);
    b.switch_to(mid);
    let c2 = b.cmp(Predicate::Slt, x, hundred);
    b.cond_br(c2, innermost, out2);
    b.switch_to(innermost);
    let kept = b.binary(BinaryOp::Add, x, zero);
    b.ret(Some(kept));
    b.switch_to(out1);
    b.ret(Some(zero));
    b.switch_to(out2);
    b.ret(Some(x));
    let mut func = b.finish().unwrap();

    let result = analyze(&mut func);
    assert_eq!(result.interval(kept), Interval::new(0, 99));
}

/// The output map is identical across repeated runs on identical input.
#[test]
fn analysis_is_deterministic() {
    let build = || {
        let mut b = FunctionBuilder::new("det");
        let x = b.arg(W, "x");
        let entry = b.block();
        let then = b.block();
        let other = b.block();
        b.switch_to(entry);
        let five = b.constant(5, W);
        let c = b.cmp(Predicate::Sle, x, five);
        b.cond_br(c, then, other);
        b.switch_to(then);
        let t = b.binary(BinaryOp::Mul, x, five);
        b.ret(Some(t));
        b.switch_to(other);
        let o = b.binary(BinaryOp::Add, x, five);
        b.ret(Some(o));
        b.finish().unwrap()
    };

    let mut first = build();
    let mut second = build();
    let r1 = analyze(&mut first);
    let r2 = analyze(&mut second);

    assert_eq!(r1.len(), r2.len());
    let mut pairs1: Vec<(Value, Interval)> = r1.iter().collect();
    let mut pairs2: Vec<(Value, Interval)> = r2.iter().collect();
    pairs1.sort_by_key(|(v, _)| *v);
    pairs2.sort_by_key(|(v, _)| *v);
    assert_eq!(pairs1, pairs2);
}
