use std::collections::HashMap;

use crate::block::BlockId;
use crate::function::FunctionId;
use crate::instruction::{FlowTarget, InsnId, InsnKind, Instruction};
use crate::program::Program;
use crate::value::{RefSlot, UseSite, ValueId, ValueKind};

/// Old handle to new handle maps of one cloning operation. A deep clone
/// copies values into the destination function, a shallow one keeps
/// referring to the original values.
pub struct CloneContext {
    deep: bool,
    func: FunctionId,
    values: HashMap<ValueId, ValueId>,
    insns: HashMap<InsnId, InsnId>,
    blocks: HashMap<BlockId, BlockId>,
}

impl CloneContext {
    pub fn new(func: FunctionId, deep: bool) -> CloneContext {
        CloneContext {
            deep,
            func,
            values: HashMap::new(),
            insns: HashMap::new(),
            blocks: HashMap::new(),
        }
    }

    pub fn is_deep(&self) -> bool {
        self.deep
    }

    pub fn func(&self) -> FunctionId {
        self.func
    }

    pub fn value(&self, old: ValueId) -> Option<ValueId> {
        self.values.get(&old).copied()
    }

    pub fn insn(&self, old: InsnId) -> Option<InsnId> {
        self.insns.get(&old).copied()
    }

    pub fn block(&self, old: BlockId) -> Option<BlockId> {
        self.blocks.get(&old).copied()
    }

    /// Records a mapping up front, e.g. to redirect references to a value
    /// that already exists in the destination.
    pub fn map_value(&mut self, old: ValueId, new: ValueId) {
        self.values.insert(old, new);
    }
}

impl Program {
    pub fn clone_value(&mut self, ctx: &mut CloneContext, value: ValueId) -> ValueId {
        if let Some(mapped) = ctx.value(value) {
            return mapped;
        }
        if !ctx.deep {
            return value;
        }

        let old = &self.values[value];
        let kind = match &old.kind {
            ValueKind::Symbol(data) => {
                let mut data = data.clone();
                data.base = None;
                ValueKind::Symbol(data)
            }
            kind => kind.clone(),
        };
        let reg = old.reg;
        let base = old.as_symbol().and_then(|s| s.base);
        let func = match kind {
            ValueKind::LValue(_) => Some(ctx.func),
            _ => None,
        };

        let new = self.alloc_value(kind, reg, func);
        if func.is_some() {
            self.functions[ctx.func].lvalues.push(new);
        }
        ctx.values.insert(value, new);

        if let Some(base) = base {
            let base = self.clone_value(ctx, base);
            if let ValueKind::Symbol(data) = &mut self.values[new].kind {
                data.base = Some(base);
            }
        }

        new
    }

    /// Copies the instruction with all its operands. The copy is not linked
    /// into any block.
    pub fn clone_insn(&mut self, ctx: &mut CloneContext, insn: InsnId) -> InsnId {
        if let Some(mapped) = ctx.insn(insn) {
            return mapped;
        }

        let old = &self.insns[insn];
        let mut kind = old.kind.clone();
        match &mut kind {
            InsnKind::Texture(tex) => {
                for offsets in tex.offsets.iter_mut() {
                    for r in offsets.iter_mut() {
                        r.value = None;
                    }
                }
                for r in tex.dpdx.iter_mut().chain(tex.dpdy.iter_mut()) {
                    r.value = None;
                }
            }
            InsnKind::Flow(flow) => {
                if let FlowTarget::Block(bb) = flow.target {
                    if let Some(mapped) = ctx.block(bb) {
                        flow.target = FlowTarget::Block(mapped);
                    }
                }
            }
            _ => {}
        }

        self.next_insn_id += 1;
        let copy = Instruction {
            id: self.next_insn_id,
            op: old.op,
            sub_op: old.sub_op,
            dtype: old.dtype,
            stype: old.stype,
            cc: old.cc,
            rnd: old.rnd,
            cache: old.cache,
            mask: old.mask,
            ipa: old.ipa,
            lanes: old.lanes,
            post_factor: old.post_factor,
            saturate: old.saturate,
            ftz: old.ftz,
            dnz: old.dnz,
            fixed: old.fixed,
            terminator: old.terminator,
            join: old.join,
            exit: old.exit,
            per_patch: old.per_patch,
            serial: old.serial,
            kind,
            defs: Vec::new(),
            srcs: Vec::new(),
            pred_src: old.pred_src,
            flags_src: old.flags_src,
            flags_def: old.flags_def,
            bb: None,
            next: None,
            prev: None,
        };
        let defs: Vec<Option<ValueId>> = old.defs.iter().map(|d| d.value).collect();
        let srcs = old.srcs.clone();
        let slots = old.ref_slots();

        let new = self.insns.alloc(copy);
        ctx.insns.insert(insn, new);

        for (d, value) in defs.into_iter().enumerate() {
            if let Some(value) = value {
                let value = self.clone_value(ctx, value);
                self.set_def(new, d, Some(value));
            }
        }

        for (s, r) in srcs.into_iter().enumerate() {
            if let Some(value) = r.value {
                let value = self.clone_value(ctx, value);
                self.set_src(new, s, Some(value));
                let slot = &mut self.insns[new].srcs[s];
                slot.modifier = r.modifier;
                slot.indirect = r.indirect;
                slot.used_as_ptr = r.used_as_ptr;
            }
        }

        for slot in slots {
            if let RefSlot::Src(_) = slot {
                continue;
            }
            let value = self.ref_at(UseSite { insn, slot }).value;
            if let Some(value) = value {
                let value = self.clone_value(ctx, value);
                self.set_ref(UseSite { insn: new, slot }, Some(value));
            }
        }

        new
    }

    /// Copies `bb` and every block reachable from it that has not been
    /// copied yet into the context's function, together with their
    /// instructions and edges. The first copied block is inserted into the
    /// destination graph first.
    pub fn clone_block(&mut self, ctx: &mut CloneContext, bb: BlockId) -> BlockId {
        if let Some(mapped) = ctx.block(bb) {
            return mapped;
        }

        let mut copied = Vec::new();
        let mut stack = vec![bb];

        while let Some(old) = stack.pop() {
            if ctx.blocks.contains_key(&old) {
                continue;
            }

            let new = self.new_block(ctx.func);
            ctx.blocks.insert(old, new);

            let insns: Vec<InsnId> = self.block_insns(old).collect();
            for insn in insns {
                let copy = self.clone_insn(ctx, insn);
                self.insert_tail(new, copy);
            }

            let node = self.blocks[new].cfg;
            let cfg = &mut self.functions[ctx.func].cfg;
            if !cfg.contains(node) {
                cfg.insert(node);
            }

            let mut succs = self.successors(old);
            succs.reverse();
            stack.extend(succs);
            copied.push(old);
        }

        for &old in &copied {
            let func = self.blocks[old].func;
            let node = self.blocks[old].cfg;
            let edges: Vec<(BlockId, _)> = {
                let cfg = &self.functions[func].cfg;
                cfg.outgoing(node)
                    .map(|e| {
                        let edge = cfg.edge(e);
                        (*cfg.payload(edge.target), edge.kind)
                    })
                    .collect()
            };

            let from = ctx.blocks[&old];
            for (target, kind) in edges {
                let to = ctx.blocks[&target];
                let origin = self.blocks[from].cfg;
                let target = self.blocks[to].cfg;
                self.functions[ctx.func].cfg.attach(origin, target, kind);
            }

            let join_at = self.blocks[old].join_at.and_then(|i| ctx.insn(i));
            self.blocks[from].join_at = join_at;
        }

        // branch targets cloned before their block was copied
        for &old in &copied {
            let new = ctx.blocks[&old];
            let insns: Vec<InsnId> = self.block_insns(new).collect();
            for insn in insns {
                if let Some(flow) = self.insns[insn].as_flow_mut() {
                    if let FlowTarget::Block(target) = flow.target {
                        if let Some(&mapped) = ctx.blocks.get(&target) {
                            flow.target = FlowTarget::Block(mapped);
                        }
                    }
                }
            }
        }

        self.functions[ctx.func].has_dom = false;
        ctx.blocks[&bb]
    }

    /// Deep copy of a function: blocks reachable from the entry, their
    /// instructions, local values, edges and branch targets.
    pub fn clone_function(&mut self, func: FunctionId, name: &str) -> FunctionId {
        let label = self.functions[func].label;
        let copy = self.new_function(name, label);
        let mut ctx = CloneContext::new(copy, true);

        if let Some(entry) = self.functions[func].entry() {
            self.clone_block(&mut ctx, entry);
        }
        if let Some(exit) = self.functions[func].exit {
            if let Some(mapped) = ctx.block(exit) {
                self.set_exit(copy, mapped);
            }
        }

        let ins = self.functions[func].ins.clone();
        let outs = self.functions[func].outs.clone();
        let ins: Vec<ValueId> = ins.into_iter().map(|v| self.clone_value(&mut ctx, v)).collect();
        let outs: Vec<ValueId> = outs.into_iter().map(|v| self.clone_value(&mut ctx, v)).collect();
        self.functions[copy].ins = ins;
        self.functions[copy].outs = outs;

        log::debug!(
            "cloned {} into {} ({} blocks)",
            self.functions[func].name,
            name,
            ctx.blocks.len()
        );
        copy
    }
}
