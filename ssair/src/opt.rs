use crate::block::BlockId;
use crate::function::FunctionId;
use crate::pass::Pass;
use crate::program::Program;
use crate::types::Operation;
use crate::value::DefSite;

/// Replaces the results of plain register moves by their sources.
#[derive(Default)]
pub struct CopyPropagation {
    pub propagated: usize,
}

impl Pass for CopyPropagation {
    fn visit_block(&mut self, prog: &mut Program, bb: BlockId) -> bool {
        let mut cursor = prog.block(bb).entry();

        while let Some(mov) = cursor {
            cursor = prog.insn(mov).next();

            let data = prog.insn(mov);
            if data.op != Operation::Mov || data.fixed || data.predicate().is_some() {
                continue;
            }
            let (def, src) = match (data.get_def(0), data.get_src(0)) {
                (Some(def), Some(src)) => (def, src),
                _ => continue,
            };
            if !prog.value(src).is_lvalue() {
                continue;
            }
            if prog.value(def).reg.file != prog.value(src).reg.file {
                continue;
            }
            if prog.value(def).reg.id >= 0 {
                continue;
            }
            let source_is_phi = prog
                .def_insn(src)
                .map_or(true, |si| prog.insn(si).op == Operation::Phi);
            if source_is_phi {
                continue;
            }

            let site = DefSite { insn: mov, index: 0 };
            let rep = data.src(0).clone();
            if !prog.may_replace(site, &rep) {
                continue;
            }

            prog.replace(site, &rep, false);
            prog.delete_insn(mov);
            self.propagated += 1;
        }

        true
    }
}

/// Deletes instructions whose results are never used.
#[derive(Default)]
pub struct DeadCodeElim {
    dead_count: usize,
    pub removed: usize,
}

impl DeadCodeElim {
    /// Repeats the pass until no more instructions die.
    pub fn bury_all(&mut self, prog: &mut Program) -> bool {
        loop {
            self.dead_count = 0;
            if !self.run(prog, false, false) {
                return false;
            }
            if self.dead_count == 0 {
                return true;
            }
        }
    }
}

impl Pass for DeadCodeElim {
    fn visit_block(&mut self, prog: &mut Program, bb: BlockId) -> bool {
        let mut cursor = prog.block(bb).exit();

        while let Some(insn) = cursor {
            cursor = prog.insn(insn).prev();

            if prog.is_dead(insn) {
                self.dead_count += 1;
                self.removed += 1;
                prog.delete_insn(insn);
            }
        }

        true
    }
}

impl Program {
    /// SSA level cleanups. Level 0 only removes dead code.
    pub fn optimize_ssa(&mut self, level: u32) -> bool {
        if level >= 1 {
            let mut copy = CopyPropagation::default();
            if !copy.run(self, false, false) {
                return false;
            }
            log::debug!("copy propagation removed {} moves", copy.propagated);
            self.after_pass("CopyPropagation");
        }

        let mut dce = DeadCodeElim::default();
        if !dce.bury_all(self) {
            return false;
        }
        log::debug!("dead code elimination removed {} instructions", dce.removed);
        self.after_pass("DeadCodeElim");

        true
    }

    fn after_pass(&self, name: &str) {
        if self.flags.dump_after_pass {
            log::info!("after {}:", name);
            self.print();
        }

        if let Some(path) = &self.flags.cfg_dot {
            let funcs: Vec<FunctionId> = self.call_order();
            for func in funcs {
                if let Err(err) = self.write_cfg_dot(func, path) {
                    log::error!("{}", err);
                }
            }
        }
    }
}
