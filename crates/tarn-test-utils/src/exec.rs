//! A concrete reference interpreter.
//!
//! Executes a function with exact `i128` arithmetic and records every
//! value each SSA variable takes, for comparison against computed
//! intervals. An operation whose result would leave its width's signed
//! range (or is otherwise undefined, like division by zero) stops the
//! execution; values observed up to that point remain valid observations.

use fxhash::FxHashMap;
use tarn_interval::Width;
use tarn_ir::{BinaryOp, Block, Function, InstKind, UnaryOp, Value};

/// Everything one run observed.
#[derive(Debug, Default)]
pub struct Trace {
    observed: FxHashMap<Value, Vec<i128>>,
    steps: usize,
}

impl Trace {
    pub fn values_of(&self, v: Value) -> &[i128] {
        self.observed.get(&v).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, &[i128])> {
        self.observed.iter().map(|(v, vals)| (*v, vals.as_slice()))
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn record(&mut self, env: &mut FxHashMap<Value, i128>, value: Value, concrete: i128) {
        self.observed.entry(value).or_default().push(concrete);
        env.insert(value, concrete);
    }
}

/// Run `func` on the given arguments, stopping after `max_steps`
/// instructions or at the first undefined operation.
pub fn execute(func: &Function, args: &[i128], max_steps: usize) -> Trace {
    assert_eq!(args.len(), func.args().len(), "argument count mismatch");

    let mut trace = Trace::default();
    let mut env: FxHashMap<Value, i128> = FxHashMap::default();
    for (value, concrete) in func.args().iter().zip(args) {
        trace.record(&mut env, *value, *concrete);
    }

    let mut block = func.entry();
    let mut came_from: Option<Block> = None;

    loop {
        // Phis read their operands simultaneously on block entry.
        if let Some(pred) = came_from {
            let mut phi_writes: Vec<(Value, i128)> = Vec::new();
            for inst in func.block_insts(block) {
                let InstKind::Phi { incoming, result } = &func.inst(inst).kind else {
                    break;
                };
                let (_, operand) = incoming
                    .iter()
                    .find(|(b, _)| *b == pred)
                    .expect("phi misses an incoming edge");
                let Some(concrete) = read(func, &env, *operand) else {
                    return trace;
                };
                phi_writes.push((*result, concrete));
            }
            for (value, concrete) in phi_writes {
                trace.record(&mut env, value, concrete);
            }
        }

        for inst in func.block_insts(block) {
            let kind = &func.inst(inst).kind;
            if kind.is_phi() || kind.is_terminator() {
                continue;
            }
            trace.steps += 1;
            if trace.steps > max_steps {
                return trace;
            }
            let Some((result, concrete)) = step(func, &env, kind) else {
                return trace;
            };
            trace.record(&mut env, result, concrete);
        }

        let Some(term) = func.block(block).terminator else {
            return trace;
        };
        match &func.inst(term).kind {
            InstKind::Branch { target } => {
                came_from = Some(block);
                block = *target;
            }
            InstKind::CondBranch {
                condition,
                true_target,
                false_target,
            } => {
                let Some(c) = read(func, &env, *condition) else {
                    return trace;
                };
                came_from = Some(block);
                block = if c != 0 { *true_target } else { *false_target };
            }
            InstKind::Return { .. } => return trace,
            _ => unreachable!("non-terminator in terminator slot"),
        }
    }
}

fn read(func: &Function, env: &FxHashMap<Value, i128>, v: Value) -> Option<i128> {
    if let Some(c) = func.constant_value(v) {
        return Some(c);
    }
    env.get(&v).copied()
}

/// Evaluate one non-phi instruction; `None` stops the execution.
fn step(func: &Function, env: &FxHashMap<Value, i128>, kind: &InstKind) -> Option<(Value, i128)> {
    match kind {
        InstKind::Binary {
            op,
            lhs,
            rhs,
            result,
        } => {
            let a = read(func, env, *lhs)?;
            let b = read(func, env, *rhs)?;
            let w = func.value_width(*result);
            let concrete = binary(*op, a, b, w)?;
            Some((*result, concrete))
        }
        InstKind::Unary {
            op,
            operand,
            result,
        } => {
            let a = read(func, env, *operand)?;
            let from = func.value_width(*operand);
            let to = func.value_width(*result);
            let concrete = unary(*op, a, from, to)?;
            Some((*result, concrete))
        }
        InstKind::Cmp {
            pred, lhs, rhs, ..
        } => {
            let a = read(func, env, *lhs)?;
            let b = read(func, env, *rhs)?;
            let holds = match pred {
                tarn_interval::Predicate::Eq => a == b,
                tarn_interval::Predicate::Ne => a != b,
                tarn_interval::Predicate::Slt => a < b,
                tarn_interval::Predicate::Sle => a <= b,
                tarn_interval::Predicate::Sgt => a > b,
                tarn_interval::Predicate::Sge => a >= b,
            };
            let result = kind.result().expect("cmp defines a value");
            Some((result, holds as i128))
        }
        InstKind::Sigma { operand, result } => {
            let a = read(func, env, *operand)?;
            Some((*result, a))
        }
        _ => None,
    }
}

fn in_range(v: i128, w: Width) -> Option<i128> {
    (v >= w.signed_min() && v <= w.signed_max()).then_some(v)
}

/// Low `w` bits of `v` as an unsigned quantity.
fn to_bits(v: i128, w: Width) -> u128 {
    (v as u128) & (u128::MAX >> (128 - w.bits()))
}

/// Sign-extend the low `w` bits back to a signed value.
fn from_bits(bits: u128, w: Width) -> i128 {
    let shift = 128 - w.bits();
    ((bits << shift) as i128) >> shift
}

fn binary(op: BinaryOp, a: i128, b: i128, w: Width) -> Option<i128> {
    match op {
        BinaryOp::Add => in_range(a + b, w),
        BinaryOp::Sub => in_range(a - b, w),
        BinaryOp::Mul => in_range(a * b, w),
        BinaryOp::Sdiv => {
            if b == 0 {
                return None;
            }
            in_range(a / b, w)
        }
        BinaryOp::Srem => {
            if b == 0 {
                return None;
            }
            in_range(a % b, w)
        }
        BinaryOp::Udiv => {
            let (ua, ub) = (to_bits(a, w), to_bits(b, w));
            if ub == 0 {
                return None;
            }
            Some(from_bits(ua / ub, w))
        }
        BinaryOp::Urem => {
            let (ua, ub) = (to_bits(a, w), to_bits(b, w));
            if ub == 0 {
                return None;
            }
            Some(from_bits(ua % ub, w))
        }
        BinaryOp::Shl => {
            if b < 0 || b >= w.bits() as i128 {
                return None;
            }
            in_range(a << b, w)
        }
        BinaryOp::Lshr => {
            if b < 0 || b >= w.bits() as i128 {
                return None;
            }
            Some(from_bits(to_bits(a, w) >> b, w))
        }
        BinaryOp::Ashr => {
            if b < 0 || b >= w.bits() as i128 {
                return None;
            }
            Some(a >> b)
        }
        BinaryOp::And => Some(from_bits(to_bits(a, w) & to_bits(b, w), w)),
        BinaryOp::Or => Some(from_bits(to_bits(a, w) | to_bits(b, w), w)),
        BinaryOp::Xor => Some(from_bits(to_bits(a, w) ^ to_bits(b, w), w)),
    }
}

fn unary(op: UnaryOp, a: i128, from: Width, to: Width) -> Option<i128> {
    match op {
        UnaryOp::Copy => Some(a),
        UnaryOp::Neg => in_range(-a, to),
        UnaryOp::Trunc => Some(from_bits(to_bits(a, to), to)),
        UnaryOp::Sext => Some(a),
        UnaryOp::Zext => Some(to_bits(a, from) as i128),
    }
}
