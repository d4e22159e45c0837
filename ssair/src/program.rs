use std::cell::Cell;

use id_arena::Arena;
use ssair_graph::Graph;

use crate::arena::SlotArena;
use crate::block::BasicBlock;
use crate::flags::Flags;
use crate::function::{Function, FunctionId};
use crate::instruction::Instruction;
use crate::modifier::Modifier;
use crate::types::{DataType, Operation, ProgramType};
use crate::value::{Value, ValueId};

/// Target queries the IR core needs when rewriting operands.
pub trait Target {
    /// Whether source `s` of `insn` can carry the modifier `m`.
    fn is_mod_supported(&self, insn: &Instruction, s: usize, m: Modifier) -> bool;
}

struct OpInfo {
    op: Operation,
    src_count: u8,
    neg: u8,
    abs: u8,
    not: u8,
}

// per-source modifier masks, bit s stands for source s
const OP_INFO: &[OpInfo] = &[
    OpInfo { op: Operation::Add, src_count: 2, neg: 0x3, abs: 0x3, not: 0x0 },
    OpInfo { op: Operation::Sub, src_count: 2, neg: 0x3, abs: 0x3, not: 0x0 },
    OpInfo { op: Operation::Mul, src_count: 2, neg: 0x3, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Max, src_count: 2, neg: 0x3, abs: 0x3, not: 0x0 },
    OpInfo { op: Operation::Min, src_count: 2, neg: 0x3, abs: 0x3, not: 0x0 },
    OpInfo { op: Operation::Mad, src_count: 3, neg: 0x7, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Abs, src_count: 1, neg: 0x1, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Neg, src_count: 1, neg: 0x0, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Cvt, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::And, src_count: 2, neg: 0x0, abs: 0x0, not: 0x3 },
    OpInfo { op: Operation::Or, src_count: 2, neg: 0x0, abs: 0x0, not: 0x3 },
    OpInfo { op: Operation::Xor, src_count: 2, neg: 0x0, abs: 0x0, not: 0x3 },
    OpInfo { op: Operation::Shl, src_count: 2, neg: 0x0, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Shr, src_count: 2, neg: 0x0, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Set, src_count: 2, neg: 0x3, abs: 0x3, not: 0x0 },
    OpInfo { op: Operation::Preex2, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Presin, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Lg2, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Rcp, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Rsq, src_count: 1, neg: 0x1, abs: 0x1, not: 0x0 },
    OpInfo { op: Operation::Dfdx, src_count: 1, neg: 0x1, abs: 0x0, not: 0x0 },
    OpInfo { op: Operation::Dfdy, src_count: 1, neg: 0x1, abs: 0x0, not: 0x0 },
];

/// Table driven target with the modifier rules of the nv50 family.
#[derive(Default)]
pub struct GenericTarget;

impl GenericTarget {
    fn src_mods(op: Operation, s: usize) -> Option<Modifier> {
        let info = OP_INFO.iter().find(|info| info.op == op)?;
        if s >= info.src_count as usize || s >= 3 {
            return None;
        }

        let bit = 1 << s;
        let mut mods = Modifier::NONE;
        for (mask, m) in [
            (info.neg, Modifier::NEG),
            (info.abs, Modifier::ABS),
            (info.not, Modifier::NOT),
        ] {
            if mask & bit != 0 {
                mods = mods | m;
            }
        }
        Some(mods)
    }
}

impl Target for GenericTarget {
    fn is_mod_supported(&self, insn: &Instruction, s: usize, m: Modifier) -> bool {
        if !insn.dtype.is_float() {
            match insn.op {
                Operation::Abs
                | Operation::Neg
                | Operation::Cvt
                | Operation::Ceil
                | Operation::Floor
                | Operation::Trunc
                | Operation::And
                | Operation::Or
                | Operation::Xor => {}

                Operation::Add => {
                    let other = if s == 0 { 1 } else { 0 };
                    if insn.srcs.get(other).map_or(false, |r| r.modifier.neg()) {
                        return false;
                    }
                }

                Operation::Sub => {
                    if s == 0 {
                        return !insn.srcs.get(1).map_or(false, |r| r.modifier.neg());
                    }
                }

                Operation::Set => {
                    if insn.stype != DataType::F32 {
                        return false;
                    }
                }

                _ => return false,
            }
        }

        match GenericTarget::src_mods(insn.op, s) {
            Some(mods) => (m & mods) == m,
            None => false,
        }
    }
}

/// Owner of everything created for one compilation: values, instructions,
/// blocks, functions and the call graph.
pub struct Program {
    ty: ProgramType,
    pub flags: Flags,
    target: Box<dyn Target>,
    pub(crate) values: SlotArena<Value>,
    pub(crate) insns: SlotArena<Instruction>,
    pub(crate) blocks: SlotArena<BasicBlock>,
    pub(crate) functions: Arena<Function>,
    pub(crate) calls: Graph<FunctionId>,
    // coalescing links, indexed by value slot
    pub(crate) joins: Vec<Cell<Option<ValueId>>>,
    pub(crate) main: Option<FunctionId>,
    pub(crate) next_value_id: u32,
    pub(crate) next_insn_id: u32,
}

impl Program {
    pub fn new(ty: ProgramType) -> Program {
        Program::with_target(ty, Box::new(GenericTarget))
    }

    pub fn with_target(ty: ProgramType, target: Box<dyn Target>) -> Program {
        Program {
            ty,
            flags: Flags::default(),
            target,
            values: SlotArena::new(),
            insns: SlotArena::new(),
            blocks: SlotArena::new(),
            functions: Arena::new(),
            calls: Graph::new(),
            joins: Vec::new(),
            main: None,
            next_value_id: 0,
            next_insn_id: 0,
        }
    }

    pub fn ty(&self) -> ProgramType {
        self.ty
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    pub fn main(&self) -> Option<FunctionId> {
        self.main
    }

    pub fn function_ids(&self) -> Vec<FunctionId> {
        self.functions.iter().map(|(id, _)| id).collect()
    }

    pub fn call_graph(&self) -> &Graph<FunctionId> {
        &self.calls
    }

    /// Functions in depth-first post-order of the call graph, callees first.
    pub fn call_order(&self) -> Vec<FunctionId> {
        self.calls
            .iter_dfs(false)
            .map(|node| *self.calls.payload(node))
            .collect()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn insn_count(&self) -> usize {
        self.insns.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
