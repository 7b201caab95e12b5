//! Incremental construction of [`Function`]s.
//!
//! The builder appends instructions to a current block and hands out value
//! ids as it goes. Structural misuse (emitting past a terminator, emitting
//! with no block selected) panics; semantic problems are reported by
//! [`Function::verify`] when the builder finishes.

use smallvec::SmallVec;
use tarn_interval::{Predicate, Width};

use crate::inst::{BinaryOp, InstData, InstKind, UnaryOp, ValueData, ValueKind};
use crate::verify::VerifyError;
use crate::{Block, Function, Value};

pub struct FunctionBuilder {
    func: Function,
    current: Option<Block>,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        FunctionBuilder {
            func: Function::new(name),
            current: None,
        }
    }

    /// Declare a function argument.
    pub fn arg(&mut self, width: Width, name: &str) -> Value {
        let index = self.func.args.len();
        let value = self.func.values.alloc(ValueData {
            width,
            kind: ValueKind::Argument(index),
            name: Some(name.to_string()),
        });
        self.func.args.push(value);
        value
    }

    /// Append a new empty block. The first block created is the entry.
    pub fn block(&mut self) -> Block {
        let block = self.func.blocks.alloc(Default::default());
        self.func.layout.push(block);
        if self.current.is_none() {
            self.current = Some(block);
        }
        block
    }

    /// Make `block` the insertion point.
    pub fn switch_to(&mut self, block: Block) {
        self.current = Some(block);
    }

    /// An interned constant value.
    pub fn constant(&mut self, value: i128, width: Width) -> Value {
        debug_assert!(
            value >= width.signed_min() && value <= width.signed_max(),
            "constant {value} does not fit {width}"
        );
        if let Some(&v) = self.func.constants.get(&(value, width)) {
            return v;
        }
        let v = self.func.values.alloc(ValueData {
            width,
            kind: ValueKind::Constant(value),
            name: None,
        });
        self.func.constants.insert((value, width), v);
        v
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let width = self.func.value_width(lhs);
        self.emit_with_result(width, |result| InstKind::Binary {
            op,
            lhs,
            rhs,
            result,
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Value, width: Width) -> Value {
        self.emit_with_result(width, |result| InstKind::Unary {
            op,
            operand,
            result,
        })
    }

    pub fn neg(&mut self, operand: Value) -> Value {
        let width = self.func.value_width(operand);
        self.unary(UnaryOp::Neg, operand, width)
    }

    pub fn trunc(&mut self, operand: Value, to: Width) -> Value {
        self.unary(UnaryOp::Trunc, operand, to)
    }

    pub fn sext(&mut self, operand: Value, to: Width) -> Value {
        self.unary(UnaryOp::Sext, operand, to)
    }

    pub fn zext(&mut self, operand: Value, to: Width) -> Value {
        self.unary(UnaryOp::Zext, operand, to)
    }

    /// A comparison producing a 1-bit boolean.
    pub fn cmp(&mut self, pred: Predicate, lhs: Value, rhs: Value) -> Value {
        self.emit_with_result(Width::W1, |result| InstKind::Cmp {
            pred,
            lhs,
            rhs,
            result,
        })
    }

    /// A phi at the top of the current block. Incoming pairs must cover the
    /// block's predecessors exactly; the verifier checks this at finish.
    pub fn phi(&mut self, incoming: &[(Block, Value)], width: Width) -> Value {
        let block = self.insertion_block();
        let inst = self.func.insts.next_id();
        let result = self.func.values.alloc(ValueData {
            width,
            kind: ValueKind::Result(inst),
            name: None,
        });
        self.func.insts.alloc(InstData {
            block,
            kind: InstKind::Phi {
                incoming: SmallVec::from_slice(incoming),
                result,
            },
        });
        // Phis stay grouped at the top of the block.
        let at = self.func.blocks[block]
            .insts
            .iter()
            .take_while(|i| self.func.insts[**i].kind.is_phi())
            .count();
        self.func.blocks[block].insts.insert(at, inst);
        result
    }

    pub fn br(&mut self, target: Block) {
        self.terminate(InstKind::Branch { target });
    }

    pub fn cond_br(&mut self, condition: Value, true_target: Block, false_target: Block) {
        self.terminate(InstKind::CondBranch {
            condition,
            true_target,
            false_target,
        });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(InstKind::Return { value });
    }

    /// Verify and hand over the finished function.
    pub fn finish(self) -> Result<Function, VerifyError> {
        self.func.verify()?;
        Ok(self.func)
    }

    /// Hand over the function without verification. Test-only escape hatch
    /// for constructing deliberately malformed functions.
    pub fn finish_unchecked(self) -> Function {
        self.func
    }

    // ------------------------------------------------------------------

    fn insertion_block(&self) -> Block {
        self.current.expect("no insertion block selected")
    }

    fn emit_with_result(&mut self, width: Width, kind: impl FnOnce(Value) -> InstKind) -> Value {
        let block = self.insertion_block();
        assert!(
            self.func.blocks[block].terminator.is_none(),
            "block {block:?} already terminated"
        );
        let inst = self.func.insts.next_id();
        let result = self.func.values.alloc(ValueData {
            width,
            kind: ValueKind::Result(inst),
            name: None,
        });
        self.func.insts.alloc(InstData {
            block,
            kind: kind(result),
        });
        self.func.blocks[block].insts.push(inst);
        result
    }

    fn terminate(&mut self, kind: InstKind) {
        let block = self.insertion_block();
        assert!(
            self.func.blocks[block].terminator.is_none(),
            "block {block:?} already terminated"
        );
        let inst = self.func.insts.alloc(InstData { block, kind });
        self.func.blocks[block].terminator = Some(inst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_function() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        b.block();
        let one = b.constant(1, Width::W32);
        let sum = b.binary(BinaryOp::Add, x, one);
        b.ret(Some(sum));
        let func = b.finish().unwrap();

        assert_eq!(func.args(), &[x]);
        assert_eq!(func.max_width(), Width::W32);
        assert_eq!(func.defining_inst(sum), Some(func.block_insts(func.entry()).next().unwrap()));
        assert_eq!(func.constant_value(one), Some(1));
    }

    #[test]
    fn constants_are_interned() {
        let mut b = FunctionBuilder::new("f");
        b.block();
        let a = b.constant(7, Width::W32);
        let c = b.constant(7, Width::W32);
        let d = b.constant(7, Width::W64);
        assert_eq!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn phis_stay_grouped_at_block_top() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        let entry = b.block();
        let exit = b.block();
        b.switch_to(entry);
        b.br(exit);
        b.switch_to(exit);
        let doubled = b.binary(BinaryOp::Add, x, x);
        let phi = b.phi(&[(entry, x)], Width::W32);
        let func = b.finish().unwrap();

        let first = func.block_insts(exit).next().unwrap();
        assert!(func.inst(first).kind.is_phi());
        assert_eq!(func.inst(first).kind.result(), Some(phi));
        let _ = doubled;
    }

    #[test]
    #[should_panic(expected = "already terminated")]
    fn emitting_past_terminator_panics() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        b.block();
        b.ret(Some(x));
        b.neg(x);
    }
}
