//! Seeded random program generation for the soundness suite.
//!
//! The shapes are deliberately structured (straight-line arithmetic,
//! comparison-guarded diamonds with a merging phi) so that every generated
//! function passes the verifier; randomness decides opcodes, operands,
//! constants and guard predicates.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tarn_interval::{Predicate, Width};
use tarn_ir::{BinaryOp, Function, FunctionBuilder, Value};

/// Knobs for [`random_function`].
#[derive(Debug, Clone, bon::Builder)]
pub struct GenConfig {
    /// Number of function arguments.
    #[builder(default = 2)]
    pub args: usize,
    /// Binary operations emitted in the entry block.
    #[builder(default = 4)]
    pub straight_ops: usize,
    /// Comparison-guarded diamonds appended after the entry block.
    #[builder(default = 1)]
    pub diamonds: usize,
    /// Operations emitted on each diamond side.
    #[builder(default = 2)]
    pub side_ops: usize,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig::builder().build()
    }
}

const OPS: &[BinaryOp] = &[
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
    BinaryOp::Srem,
];

const PREDICATES: &[Predicate] = &[
    Predicate::Eq,
    Predicate::Ne,
    Predicate::Slt,
    Predicate::Sle,
    Predicate::Sgt,
    Predicate::Sge,
];

/// A deterministic random function for the given seed.
pub fn random_function(seed: u64, config: &GenConfig) -> Function {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut b = FunctionBuilder::new(&format!("random_{seed}"));

    let mut pool: Vec<Value> = (0..config.args)
        .map(|i| b.arg(Width::W32, &format!("a{i}")))
        .collect();
    b.block();
    for _ in 0..3 {
        pool.push(b.constant(rng.gen_range(-8..=8), Width::W32));
    }

    for _ in 0..config.straight_ops {
        emit_binary(&mut rng, &mut b, &mut pool);
    }

    for _ in 0..config.diamonds {
        let lhs = *pool.choose(&mut rng).unwrap();
        let rhs = *pool.choose(&mut rng).unwrap();
        let pred = *PREDICATES.choose(&mut rng).unwrap();
        let cond = b.cmp(pred, lhs, rhs);

        let then = b.block();
        let other = b.block();
        let merge = b.block();
        b.cond_br(cond, then, other);

        b.switch_to(then);
        let mut then_pool = pool.clone();
        for _ in 0..config.side_ops {
            emit_binary(&mut rng, &mut b, &mut then_pool);
        }
        let then_out = *then_pool.choose(&mut rng).unwrap();
        b.br(merge);

        b.switch_to(other);
        let mut other_pool = pool.clone();
        for _ in 0..config.side_ops {
            emit_binary(&mut rng, &mut b, &mut other_pool);
        }
        let other_out = *other_pool.choose(&mut rng).unwrap();
        b.br(merge);

        b.switch_to(merge);
        let joined = b.phi(&[(then, then_out), (other, other_out)], Width::W32);
        pool.push(joined);
    }

    let ret = *pool.choose(&mut rng).unwrap();
    b.ret(Some(ret));
    b.finish().expect("generated function must verify")
}

fn emit_binary(rng: &mut ChaCha8Rng, b: &mut FunctionBuilder, pool: &mut Vec<Value>) {
    let op = *OPS.choose(rng).unwrap();
    let lhs = *pool.choose(rng).unwrap();
    let rhs = *pool.choose(rng).unwrap();
    pool.push(b.binary(op, lhs, rhs));
}
