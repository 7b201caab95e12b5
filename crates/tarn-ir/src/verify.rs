//! Structural validation of a [`Function`].
//!
//! A malformed function indicates a bug in whatever produced it, so the
//! checks here run once at construction time; the analysis itself assumes
//! a verified function.

use fxhash::FxHashSet;

use crate::dom::DominatorTree;
use crate::inst::{InstKind, ValueKind};
use crate::{Block, Function, Inst, Value};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("function has no blocks")]
    NoBlocks,
    #[error("block {0:?} has no terminator")]
    MissingTerminator(Block),
    #[error("terminator in the middle of block {0:?}")]
    MisplacedTerminator(Block),
    #[error("phi {0:?} is not grouped at the top of its block")]
    MisplacedPhi(Inst),
    #[error("phi {inst:?} incoming edges do not match the predecessors of {block:?}")]
    PhiEdgeMismatch { inst: Inst, block: Block },
    #[error("use of {value:?} in {inst:?} is not dominated by its definition")]
    UseNotDominated { value: Value, inst: Inst },
}

impl Function {
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.num_blocks() == 0 {
            return Err(VerifyError::NoBlocks);
        }

        let dom = DominatorTree::compute(self);
        let preds = self.predecessors();

        for block in self.blocks() {
            let data = self.block(block);
            if dom.is_reachable(block) && data.terminator.is_none() {
                return Err(VerifyError::MissingTerminator(block));
            }

            let mut past_phis = false;
            for inst in &data.insts {
                let kind = &self.inst(*inst).kind;
                if kind.is_terminator() {
                    return Err(VerifyError::MisplacedTerminator(block));
                }
                if kind.is_phi() {
                    if past_phis {
                        return Err(VerifyError::MisplacedPhi(*inst));
                    }
                } else {
                    past_phis = true;
                }
            }

            for inst in self.block_insts(block) {
                match &self.inst(inst).kind {
                    InstKind::Phi { incoming, .. } => {
                        self.check_phi_edges(inst, block, incoming, &preds)?;
                    }
                    kind => {
                        for value in kind.operands() {
                            self.check_use_dominated(value, inst, block, &dom)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn check_phi_edges(
        &self,
        inst: Inst,
        block: Block,
        incoming: &[(Block, Value)],
        preds: &fxhash::FxHashMap<Block, smallvec::SmallVec<[Block; 2]>>,
    ) -> Result<(), VerifyError> {
        let mut expected: FxHashSet<Block> = preds[&block].iter().copied().collect();
        for (pred, _) in incoming {
            if !expected.remove(pred) {
                return Err(VerifyError::PhiEdgeMismatch { inst, block });
            }
        }
        if !expected.is_empty() {
            return Err(VerifyError::PhiEdgeMismatch { inst, block });
        }
        Ok(())
    }

    /// Non-phi uses must be dominated by the definition. Phi uses are
    /// checked against the incoming edge instead and only for block-level
    /// sanity, since a phi may observe a value that does not dominate the
    /// phi itself.
    fn check_use_dominated(
        &self,
        value: Value,
        inst: Inst,
        block: Block,
        dom: &DominatorTree,
    ) -> Result<(), VerifyError> {
        if !dom.is_reachable(block) {
            return Ok(());
        }
        match self.value(value).kind {
            // Arguments and constants are defined everywhere.
            ValueKind::Argument(_) | ValueKind::Constant(_) => Ok(()),
            ValueKind::Result(def) => {
                let def_block = self.inst(def).block;
                let ok = if def_block == block {
                    self.comes_before(def_block, def, inst)
                } else {
                    dom.dominates(def_block, block)
                };
                if ok {
                    Ok(())
                } else {
                    Err(VerifyError::UseNotDominated { value, inst })
                }
            }
        }
    }

    fn comes_before(&self, block: Block, first: Inst, second: Inst) -> bool {
        for inst in self.block_insts(block) {
            if inst == first {
                return true;
            }
            if inst == second {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use tarn_interval::Width;

    #[test]
    fn missing_terminator_is_reported() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        b.block();
        b.neg(x);
        let func = b.finish_unchecked();
        assert!(matches!(
            func.verify(),
            Err(VerifyError::MissingTerminator(_))
        ));
    }

    #[test]
    fn phi_edges_must_cover_predecessors() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        let entry = b.block();
        let left = b.block();
        let right = b.block();
        let merge = b.block();
        b.switch_to(entry);
        let zero = b.constant(0, Width::W32);
        let c = b.cmp(tarn_interval::Predicate::Slt, x, zero);
        b.cond_br(c, left, right);
        b.switch_to(left);
        b.br(merge);
        b.switch_to(right);
        b.br(merge);
        b.switch_to(merge);
        // Only one of the two incoming edges is covered.
        let phi = b.phi(&[(left, x)], Width::W32);
        b.ret(Some(phi));
        let func = b.finish_unchecked();
        assert!(matches!(
            func.verify(),
            Err(VerifyError::PhiEdgeMismatch { .. })
        ));
    }

    #[test]
    fn use_before_definition_is_reported() {
        let mut b = FunctionBuilder::new("f");
        let x = b.arg(Width::W32, "x");
        let entry = b.block();
        let left = b.block();
        let right = b.block();
        b.switch_to(entry);
        let zero = b.constant(0, Width::W32);
        let c = b.cmp(tarn_interval::Predicate::Slt, x, zero);
        b.cond_br(c, left, right);
        b.switch_to(left);
        let doubled = b.binary(crate::BinaryOp::Add, x, x);
        b.ret(Some(doubled));
        b.switch_to(right);
        // `doubled` is defined in a sibling block that does not dominate us.
        b.ret(Some(doubled));
        let func = b.finish_unchecked();
        assert!(matches!(
            func.verify(),
            Err(VerifyError::UseNotDominated { .. })
        ));
    }
}
