//! End-to-end smoke test over the public facade.

use tarn::analysis::RangeAnalysis;
use tarn::interval::{Bound, Interval, Predicate, Width};
use tarn::ir::{BinaryOp, FunctionBuilder};

/// i = input(); if (i < 10) { a = i + 1 } else { b = i - 1 }
#[test]
fn branch_refinement_end_to_end() {
    let mut b = FunctionBuilder::new("guarded");
    let i = b.arg(Width::W32, "i");
    let entry = b.block();
    let then = b.block();
    let other = b.block();

    b.switch_to(entry);
    let ten = b.constant(10, Width::W32);
    let one = b.constant(1, Width::W32);
    let cond = b.cmp(Predicate::Slt, i, ten);
    b.cond_br(cond, then, other);

    b.switch_to(then);
    let a = b.binary(BinaryOp::Add, i, one);
    b.ret(Some(a));

    b.switch_to(other);
    let r = b.binary(BinaryOp::Sub, i, one);
    b.ret(Some(r));

    let mut func = b.finish().unwrap();
    let result = RangeAnalysis::new().run(&mut func);

    // The unrefined input stays unbounded; the branch sides are refined.
    assert!(result.interval(i).is_max_range());
    assert_eq!(result.interval(a), Interval::half_above(10));
    assert_eq!(result.interval(r), Interval::half_below(9));
    assert_eq!(result.width(), Width::W32);

    // Every sigma copy got an interval too.
    let sigmas: Vec<_> = func
        .values()
        .filter(|v| {
            func.defining_inst(*v)
                .map(|inst| matches!(func.inst(inst).kind, tarn::ir::InstKind::Sigma { .. }))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(sigmas.len(), 2);
    let mut sigma_intervals: Vec<Interval> = sigmas.iter().map(|v| result.interval(*v)).collect();
    sigma_intervals.sort_by_key(|itv| itv.lo() == Bound::NegInf);
    assert!(sigma_intervals.contains(&Interval::half_above(9)));
    assert!(sigma_intervals.contains(&Interval::half_below(10)));
}
