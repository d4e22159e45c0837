use crate::block::BlockId;
use crate::function::FunctionId;
use crate::instruction::InsnId;
use crate::program::Program;

/// Visitor over functions, blocks and instructions.
///
/// A hook returning false ends the traversal of its scope: a failing
/// `visit_function` skips the function and stops a whole-program run, a
/// failing `visit_block` stops the function, a failing `visit_insn` moves on
/// to the next block. The instruction hook is off by default.
pub trait Pass {
    fn visit_function(&mut self, _prog: &mut Program, _func: FunctionId) -> bool {
        true
    }

    fn visit_block(&mut self, _prog: &mut Program, _bb: BlockId) -> bool {
        true
    }

    fn visit_insn(&mut self, _prog: &mut Program, _insn: InsnId) -> bool {
        false
    }

    /// Error state reported after a traversal.
    fn failed(&self) -> bool {
        false
    }

    /// Runs over every function of the program, callees before callers.
    fn run(&mut self, prog: &mut Program, ordered: bool, skip_phi: bool) -> bool {
        for func in prog.call_order() {
            if !self.run_function(prog, func, ordered, skip_phi) {
                return false;
            }
        }
        !self.failed()
    }

    /// Visits the blocks in CFG order when `ordered`, in depth-first
    /// preorder otherwise.
    fn run_function(&mut self, prog: &mut Program, func: FunctionId, ordered: bool, skip_phi: bool) -> bool {
        if !self.visit_function(prog, func) {
            return false;
        }

        let blocks = if ordered {
            prog.cfg_order(func)
        } else {
            prog.dfs_order(func, true)
        };
        log::trace!("visiting {} blocks of {}", blocks.len(), prog.function(func).name);

        for bb in blocks {
            if !prog.contains_block(bb) {
                continue;
            }
            if !self.visit_block(prog, bb) {
                break;
            }

            let block = prog.block(bb);
            let mut cursor = if skip_phi { block.entry() } else { block.first_insn() };
            while let Some(insn) = cursor {
                if !prog.contains_insn(insn) {
                    break;
                }
                cursor = prog.insn(insn).next();
                if !self.visit_insn(prog, insn) {
                    break;
                }
            }
        }

        !self.failed()
    }
}
