//! An SSA-form integer IR: values, typed instructions, basic blocks,
//! conditional branches and phi nodes, allocated in per-function arenas.
//!
//! This crate is the input surface of the range analysis. It deliberately
//! carries no parser and no serializer; functions are built through
//! [`FunctionBuilder`] and validated by [`Function::verify`].

pub mod arena;
mod builder;
mod dom;
mod function;
mod inst;
mod verify;

pub use builder::FunctionBuilder;
pub use dom::DominatorTree;
pub use function::{Block, BlockData, Function};
pub use inst::{BinaryOp, InstData, InstKind, UnaryOp, ValueData, ValueKind};
pub use verify::VerifyError;

pub use tarn_interval::{Predicate, Width};

identifier! {
    /// An SSA value: a function argument, a constant, or an instruction
    /// result.
    struct Value, "v"
}

identifier! {
    /// An instruction.
    struct Inst, "inst"
}
