use std::fmt::Write;

use crate::block::BlockId;
use crate::function::FunctionId;
use crate::instruction::{FlowTarget, InsnId};
use crate::program::Program;
use crate::types::{CondCode, DataFile, DataType, Operation};
use crate::value::{Immediate, ValueId, ValueKind};

fn size_suffix(size: u32) -> &'static str {
    match size {
        1 => "b",
        2 => "h",
        8 => "d",
        12 => "t",
        16 => "q",
        _ => "",
    }
}

fn display_immediate(imm: &Immediate, ty: DataType) -> String {
    match ty {
        DataType::F32 => format!("{:.6}", imm.as_f32()),
        DataType::F64 => format!("{}", imm.as_f64()),
        DataType::S8 | DataType::S16 | DataType::S32 => format!("{}", imm.as_s32()),
        DataType::U64 | DataType::S64 => format!("0x{:016x}", imm.as_u64()),
        _ => format!("0x{:08x}", imm.as_u32()),
    }
}

impl Program {
    /// `%r12` before register allocation, `$r3` after it.
    pub fn display_value(&self, value: ValueId) -> String {
        self.display_value_as(value, None, [None, None])
    }

    fn display_value_as(&self, value: ValueId, ty: Option<DataType>, indirect: [Option<ValueId>; 2]) -> String {
        let data = &self.values[value];

        match &data.kind {
            ValueKind::LValue(_) => {
                let rep = &self.values[self.representative(value)];
                let prefix = data.reg.file.prefix();
                let suffix = if data.reg.file == DataFile::Gpr {
                    size_suffix(data.reg.size)
                } else {
                    ""
                };

                if rep.reg.id < 0 {
                    format!("%{}{}{}", prefix, suffix, data.id)
                } else {
                    format!("${}{}{}", prefix, suffix, rep.reg.id)
                }
            }

            ValueKind::Immediate(imm) => display_immediate(imm, ty.unwrap_or(imm.ty)),

            ValueKind::Symbol(sym) => {
                if let Some((sv, index)) = sym.sv {
                    return format!("sv[{}:{}]", sv.name(), index);
                }

                let mut out = String::new();
                out.push_str(data.reg.file.prefix());
                if matches!(data.reg.file, DataFile::MemoryConst | DataFile::MemoryGlobal | DataFile::MemoryBuffer) {
                    let _ = write!(out, "{}", data.reg.file_index);
                }
                out.push('[');
                for addr in indirect.iter().flatten() {
                    let _ = write!(out, "{}+", self.display_value(*addr));
                }
                if let Some(base) = sym.base {
                    let _ = write!(out, "{}+", self.display_value(base));
                }
                let _ = write!(out, "0x{:x}]", sym.offset);
                out
            }
        }
    }

    pub fn display_insn(&self, insn: InsnId) -> String {
        let data = &self.insns[insn];
        let mut out = String::new();

        if data.join {
            out.push_str("join ");
        }

        if let Some(pred) = data.predicate() {
            if self.values[pred].reg.file == DataFile::Predicate {
                if data.cc == CondCode::NOT_P {
                    out.push_str("not ");
                }
            } else if !data.cc.name().is_empty() {
                let _ = write!(out, "{} ", data.cc.name());
            }
            let _ = write!(out, "{} ", self.display_value(pred));
        }

        if data.saturate {
            out.push_str("sat ");
        }

        if let Some(flow) = data.as_flow() {
            out.push_str(data.op.name());
            if flow.indirect {
                out.push_str(" ind");
            }
            if flow.absolute {
                out.push_str(" abs");
            }
            match flow.target {
                FlowTarget::Builtin(builtin) if data.op == Operation::Call => {
                    let _ = write!(out, " BUILTIN:{}", builtin);
                }
                FlowTarget::Function(func) if data.op == Operation::Call => {
                    let callee = &self.functions[func];
                    let _ = write!(out, " {}:{}", callee.name, callee.label);
                }
                FlowTarget::Block(bb) => {
                    let _ = write!(out, " BB:{}", self.blocks[bb].id);
                }
                _ => {}
            }
        } else {
            let _ = write!(out, "{} ", data.op.name());
            if data.sub_op != 0 {
                let _ = write!(out, "(SUBOP:{}) ", data.sub_op);
            }
            if data.per_patch {
                out.push_str("patch ");
            }
            if let Some(tex) = data.as_tex() {
                let _ = write!(out, "{} $r{} $s{} ", tex.target.name(), tex.r, tex.s);
            }
            if data.post_factor != 0 {
                let _ = write!(out, "x2^{} ", data.post_factor);
            }
            if data.dnz {
                out.push_str("dnz ");
            } else if data.ftz {
                out.push_str("ftz ");
            }
            out.push_str(data.dtype.name());
        }

        if !data.rnd.name().is_empty() {
            let _ = write!(out, " {}", data.rnd.name());
        }

        let defs: Vec<ValueId> = data.defs.iter().map_while(|d| d.value).collect();
        if defs.len() > 1 {
            out.push_str(" {");
        }
        for &def in &defs {
            let _ = write!(out, " {}", self.display_value(def));
        }
        if defs.len() > 1 {
            out.push_str(" }");
        } else if defs.is_empty() && data.as_flow().is_none() {
            out.push_str(" #");
        }

        if let Some(cmp) = data.as_compare() {
            let _ = write!(out, " {}", cmp.set_cond.name());
        }
        if data.stype != data.dtype {
            let _ = write!(out, " {}", data.stype.name());
        }

        for (s, src) in data.srcs.iter().enumerate() {
            let value = match src.value {
                Some(value) => value,
                None => break,
            };
            if Some(s) == data.pred_src() || src.used_as_ptr {
                continue;
            }

            out.push(' ');
            if !src.modifier.is_none() {
                let _ = write!(out, "{} ", src.modifier);
            }
            let indirect = [data.get_indirect(s, 0), data.get_indirect(s, 1)];
            out.push_str(&self.display_value_as(value, Some(data.stype), indirect));
        }

        if data.exit {
            out.push_str(" exit");
        }

        out
    }

    /// Block header, outgoing edges and instructions.
    pub fn dump_block(&self, bb: BlockId) -> String {
        let block = &self.blocks[bb];
        let mut out = String::new();

        let _ = write!(out, "BB:{} ({} instructions) - ", block.id, block.num_insns);
        if let Some(idom) = self.idom(bb) {
            let _ = write!(out, "idom = BB:{}, ", self.blocks[idom].id);
        }
        out.push_str("df = { ");
        for &df in &block.df {
            let _ = write!(out, "BB:{} ", self.blocks[df].id);
        }
        out.push_str("}\n");

        let cfg = &self.functions[block.func].cfg;
        for edge in cfg.outgoing(block.cfg) {
            let edge = cfg.edge(edge);
            let target = *cfg.payload(edge.target);
            let _ = writeln!(out, " -> BB:{} ({})", self.blocks[target].id, edge.kind.name());
        }

        for insn in self.block_insns(bb) {
            let _ = writeln!(out, "{:4}: {}", self.insns[insn].serial, self.display_insn(insn));
        }

        out
    }

    pub fn dump_function(&self, func: FunctionId) -> String {
        let function = &self.functions[func];
        let mut out = String::new();

        let _ = write!(out, "\n{}:{} (", function.name, function.label);
        if !function.outs.is_empty() {
            out.push_str("out");
            for &v in &function.outs {
                let _ = write!(out, " {}", self.display_value(v));
            }
            if !function.ins.is_empty() {
                out.push_str(", ");
            }
        }
        if !function.ins.is_empty() {
            out.push_str("in");
            for &v in &function.ins {
                let _ = write!(out, " {}", self.display_value(v));
            }
        }
        out.push_str(")\n");

        for bb in self.cfg_order(func) {
            out.push_str(&self.dump_block(bb));
        }

        out
    }

    /// Every function in call graph order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for func in self.call_order() {
            out.push_str(&self.dump_function(func));
        }
        out
    }

    /// Writes the dump to the log, one record per line.
    pub fn print(&self) {
        for line in self.dump().lines() {
            log::info!("{}", line);
        }
    }
}
