//! Instructions: the closed opcode set the analysis understands.

use smallvec::SmallVec;
use tarn_interval::Predicate;

use crate::{Block, Value, Width};

/// Two-operand integer operations.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Srem,
    Urem,
    Shl,
    Lshr,
    Ashr,
    And,
    Or,
    Xor,
}

/// One-operand operations. Width-changing casts take their target width
/// from the result value.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Copy,
    Neg,
    Trunc,
    Sext,
    Zext,
}

/// An instruction body. Terminators (`Branch`, `CondBranch`, `Return`)
/// appear only in the terminator slot of a block; `Sigma` appears only
/// after refinement insertion has run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstKind {
    Binary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        result: Value,
    },
    Unary {
        op: UnaryOp,
        operand: Value,
        result: Value,
    },
    Cmp {
        pred: Predicate,
        lhs: Value,
        rhs: Value,
        result: Value,
    },
    Phi {
        incoming: SmallVec<[(Block, Value); 2]>,
        result: Value,
    },
    /// Refinement copy at the entry of a branch target: `result := operand`
    /// with a path constraint attached by the analysis.
    Sigma {
        operand: Value,
        result: Value,
    },
    Branch {
        target: Block,
    },
    CondBranch {
        condition: Value,
        true_target: Block,
        false_target: Block,
    },
    Return {
        value: Option<Value>,
    },
}

/// An instruction together with the block that holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstData {
    pub block: Block,
    pub kind: InstKind,
}

impl InstKind {
    /// The value this instruction defines, if any.
    pub fn result(&self) -> Option<Value> {
        match self {
            InstKind::Binary { result, .. }
            | InstKind::Unary { result, .. }
            | InstKind::Cmp { result, .. }
            | InstKind::Phi { result, .. }
            | InstKind::Sigma { result, .. } => Some(*result),
            InstKind::Branch { .. } | InstKind::CondBranch { .. } | InstKind::Return { .. } => None,
        }
    }

    /// The values this instruction reads, in operand order.
    pub fn operands(&self) -> SmallVec<[Value; 2]> {
        match self {
            InstKind::Binary { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => {
                SmallVec::from_slice(&[*lhs, *rhs])
            }
            InstKind::Unary { operand, .. } | InstKind::Sigma { operand, .. } => {
                SmallVec::from_slice(&[*operand])
            }
            InstKind::Phi { incoming, .. } => incoming.iter().map(|(_, v)| *v).collect(),
            InstKind::CondBranch { condition, .. } => SmallVec::from_slice(&[*condition]),
            InstKind::Return { value } => value.iter().copied().collect(),
            InstKind::Branch { .. } => SmallVec::new(),
        }
    }

    /// Rewrite every non-phi operand equal to `from` into `to`. Phi
    /// operands are edge-specific and rewritten by the caller per edge.
    pub fn replace_uses(&mut self, from: Value, to: Value) {
        let mut patch = |v: &mut Value| {
            if *v == from {
                *v = to;
            }
        };
        match self {
            InstKind::Binary { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => {
                patch(lhs);
                patch(rhs);
            }
            InstKind::Unary { operand, .. } | InstKind::Sigma { operand, .. } => patch(operand),
            InstKind::CondBranch { condition, .. } => patch(condition),
            InstKind::Return { value } => {
                if let Some(v) = value {
                    patch(v);
                }
            }
            InstKind::Phi { .. } | InstKind::Branch { .. } => {}
        }
    }

    /// Successor blocks of a terminator; empty for non-terminators.
    pub fn successors(&self) -> SmallVec<[Block; 2]> {
        match self {
            InstKind::Branch { target } => SmallVec::from_slice(&[*target]),
            InstKind::CondBranch {
                true_target,
                false_target,
                ..
            } => SmallVec::from_slice(&[*true_target, *false_target]),
            _ => SmallVec::new(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Branch { .. } | InstKind::CondBranch { .. } | InstKind::Return { .. }
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, InstKind::Phi { .. })
    }
}

/// What a value is: a function argument, an interned constant, or the
/// result of an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Argument(usize),
    Constant(i128),
    Result(crate::Inst),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueData {
    pub width: Width,
    pub kind: ValueKind,
    pub name: Option<String>,
}
