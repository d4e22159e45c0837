use crate::arena::Handle;
use crate::block::BlockId;
use crate::function::FunctionId;
use crate::modifier::Modifier;
use crate::program::Program;
use crate::types::{CacheMode, CondCode, DataFile, DataType, Operation, ProgramType, RoundMode, TexTarget};
use crate::value::{DefSite, RefSlot, UseSite, ValueDef, ValueId, ValueRef};

pub type InsnId = Handle<Instruction>;

#[derive(Clone, Debug, PartialEq)]
pub struct CompareData {
    pub set_cond: CondCode,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TexData {
    pub target: TexTarget,
    pub r: u16,
    pub s: u16,
    pub(crate) r_indirect_src: Option<u8>,
    pub(crate) s_indirect_src: Option<u8>,
    pub mask: u8,
    pub gather_comp: u8,
    pub live_only: bool,
    pub derivative_all: bool,
    pub use_offsets: u8,
    pub(crate) offsets: [[ValueRef; 3]; 4],
    pub(crate) dpdx: [ValueRef; 3],
    pub(crate) dpdy: [ValueRef; 3],
}

impl TexData {
    fn new(target: TexTarget) -> TexData {
        TexData {
            target,
            r: 0,
            s: 0,
            r_indirect_src: None,
            s_indirect_src: None,
            mask: 0xf,
            gather_comp: 0,
            live_only: false,
            derivative_all: false,
            use_offsets: 0,
            offsets: Default::default(),
            dpdx: Default::default(),
            dpdy: Default::default(),
        }
    }

    pub fn r_indirect_src(&self) -> Option<u8> {
        self.r_indirect_src
    }

    pub fn s_indirect_src(&self) -> Option<u8> {
        self.s_indirect_src
    }

    pub fn offset(&self, i: usize, c: usize) -> &ValueRef {
        &self.offsets[i][c]
    }

    pub fn dpdx(&self, c: usize) -> &ValueRef {
        &self.dpdx[c]
    }

    pub fn dpdy(&self, c: usize) -> &ValueRef {
        &self.dpdy[c]
    }

    // settings compared by `is_action_equal`, operands excluded
    fn same_action(&self, other: &TexData) -> bool {
        self.target == other.target
            && self.r == other.r
            && self.s == other.s
            && self.r_indirect_src == other.r_indirect_src
            && self.s_indirect_src == other.s_indirect_src
            && self.mask == other.mask
            && self.gather_comp == other.gather_comp
            && self.live_only == other.live_only
            && self.derivative_all == other.derivative_all
            && self.use_offsets == other.use_offsets
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowTarget {
    None,
    Block(BlockId),
    Function(FunctionId),
    Builtin(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowData {
    pub target: FlowTarget,
    pub absolute: bool,
    pub limit: bool,
    pub builtin: bool,
    pub indirect: bool,
    pub all_warp: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InsnKind {
    Plain,
    Compare(CompareData),
    Texture(Box<TexData>),
    Flow(FlowData),
}

pub struct Instruction {
    pub id: u32,
    pub op: Operation,
    pub sub_op: u16,
    pub dtype: DataType,
    pub stype: DataType,
    pub cc: CondCode,
    pub rnd: RoundMode,
    pub cache: CacheMode,
    pub mask: u16,
    pub ipa: u8,
    pub lanes: u8,
    pub post_factor: i8,
    pub saturate: bool,
    pub ftz: bool,
    pub dnz: bool,
    pub fixed: bool,
    pub terminator: bool,
    pub join: bool,
    pub exit: bool,
    pub per_patch: bool,
    /// Position in the function's instruction order.
    pub serial: i32,
    pub(crate) kind: InsnKind,
    pub(crate) defs: Vec<ValueDef>,
    pub(crate) srcs: Vec<ValueRef>,
    pub(crate) pred_src: Option<u8>,
    pub(crate) flags_src: Option<u8>,
    pub(crate) flags_def: Option<u8>,
    pub(crate) bb: Option<BlockId>,
    pub(crate) next: Option<InsnId>,
    pub(crate) prev: Option<InsnId>,
}

impl Instruction {
    fn new(id: u32, op: Operation, dtype: DataType, kind: InsnKind) -> Instruction {
        Instruction {
            id,
            op,
            sub_op: 0,
            dtype,
            stype: dtype,
            cc: CondCode::Always,
            rnd: RoundMode::N,
            cache: CacheMode::Ca,
            mask: 0,
            ipa: 0,
            lanes: 0xf,
            post_factor: 0,
            saturate: false,
            ftz: false,
            dnz: false,
            fixed: false,
            terminator: false,
            join: false,
            exit: false,
            per_patch: false,
            serial: 0,
            kind,
            defs: Vec::new(),
            srcs: Vec::new(),
            pred_src: None,
            flags_src: None,
            flags_def: None,
            bb: None,
            next: None,
            prev: None,
        }
    }

    pub fn bb(&self) -> Option<BlockId> {
        self.bb
    }

    pub fn next(&self) -> Option<InsnId> {
        self.next
    }

    pub fn prev(&self) -> Option<InsnId> {
        self.prev
    }

    pub fn is_phi(&self) -> bool {
        self.op == Operation::Phi
    }

    pub fn def(&self, d: usize) -> &ValueDef {
        &self.defs[d]
    }

    pub fn src(&self, s: usize) -> &ValueRef {
        &self.srcs[s]
    }

    pub fn defs(&self) -> &[ValueDef] {
        &self.defs
    }

    pub fn srcs(&self) -> &[ValueRef] {
        &self.srcs
    }

    pub fn get_def(&self, d: usize) -> Option<ValueId> {
        self.defs.get(d).and_then(|def| def.value)
    }

    pub fn get_src(&self, s: usize) -> Option<ValueId> {
        self.srcs.get(s).and_then(|src| src.value)
    }

    pub fn def_exists(&self, d: usize) -> bool {
        self.get_def(d).is_some()
    }

    pub fn src_exists(&self, s: usize) -> bool {
        self.get_src(s).is_some()
    }

    pub fn def_count(&self) -> usize {
        self.defs.iter().take_while(|d| d.exists()).count()
    }

    pub fn src_count(&self) -> usize {
        self.srcs.iter().take_while(|s| s.exists()).count()
    }

    pub fn pred_src(&self) -> Option<usize> {
        self.pred_src.map(|s| s as usize)
    }

    pub fn flags_src(&self) -> Option<usize> {
        self.flags_src.map(|s| s as usize)
    }

    pub fn flags_def(&self) -> Option<usize> {
        self.flags_def.map(|d| d as usize)
    }

    pub fn predicate(&self) -> Option<ValueId> {
        self.pred_src.and_then(|s| self.get_src(s as usize))
    }

    /// Value used as indirect address `dim` of source `s`.
    pub fn get_indirect(&self, s: usize, dim: usize) -> Option<ValueId> {
        self.srcs
            .get(s)
            .and_then(|src| src.indirect[dim])
            .and_then(|p| self.get_src(p as usize))
    }

    pub fn kind(&self) -> &InsnKind {
        &self.kind
    }

    pub fn as_compare(&self) -> Option<&CompareData> {
        match &self.kind {
            InsnKind::Compare(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_compare_mut(&mut self) -> Option<&mut CompareData> {
        match &mut self.kind {
            InsnKind::Compare(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_tex(&self) -> Option<&TexData> {
        match &self.kind {
            InsnKind::Texture(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_tex_mut(&mut self) -> Option<&mut TexData> {
        match &mut self.kind {
            InsnKind::Texture(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_flow(&self) -> Option<&FlowData> {
        match &self.kind {
            InsnKind::Flow(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_flow_mut(&mut self) -> Option<&mut FlowData> {
        match &mut self.kind {
            InsnKind::Flow(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn tex_data(&self) -> &TexData {
        match &self.kind {
            InsnKind::Texture(data) => data,
            _ => panic!("instruction %{} is not a texture instruction", self.id),
        }
    }

    pub(crate) fn tex_data_mut(&mut self) -> &mut TexData {
        match &mut self.kind {
            InsnKind::Texture(data) => data,
            _ => panic!("instruction %{} is not a texture instruction", self.id),
        }
    }

    /// Every occupied reference slot: sources first, then texture operands.
    pub fn ref_slots(&self) -> Vec<RefSlot> {
        let mut slots: Vec<RefSlot> = (0..self.srcs.len())
            .filter(|&s| self.srcs[s].exists())
            .map(|s| RefSlot::Src(s as u8))
            .collect();

        if let InsnKind::Texture(tex) = &self.kind {
            for (i, offsets) in tex.offsets.iter().enumerate() {
                for (c, r) in offsets.iter().enumerate() {
                    if r.exists() {
                        slots.push(RefSlot::TexOffset(i as u8, c as u8));
                    }
                }
            }
            for (c, r) in tex.dpdx.iter().enumerate() {
                if r.exists() {
                    slots.push(RefSlot::TexDerivX(c as u8));
                }
            }
            for (c, r) in tex.dpdy.iter().enumerate() {
                if r.exists() {
                    slots.push(RefSlot::TexDerivY(c as u8));
                }
            }
        }

        slots
    }
}

fn adjust_moved_index(index: &mut Option<u8>, s: usize, delta: isize) {
    if let Some(i) = *index {
        let i = i as isize;
        let s = s as isize;
        if i >= s {
            *index = Some((i + delta) as u8);
        } else if delta < 0 && i >= s + delta {
            *index = None;
        }
    }
}

impl Program {
    fn alloc_insn(&mut self, op: Operation, dtype: DataType, kind: InsnKind) -> InsnId {
        self.next_insn_id += 1;
        self.insns
            .alloc(Instruction::new(self.next_insn_id, op, dtype, kind))
    }

    pub fn new_insn(&mut self, op: Operation, dtype: DataType) -> InsnId {
        self.alloc_insn(op, dtype, InsnKind::Plain)
    }

    pub fn new_compare(&mut self, op: Operation, dtype: DataType, stype: DataType, cc: CondCode) -> InsnId {
        let kind = InsnKind::Compare(CompareData {
            set_cond: CondCode::Always,
        });
        let insn = self.alloc_insn(op, dtype, kind);
        let data = &mut self.insns[insn];
        data.stype = stype;
        data.cc = cc;
        insn
    }

    pub fn new_tex(&mut self, op: Operation, target: TexTarget) -> InsnId {
        debug_assert!(op.is_texture());
        let kind = InsnKind::Texture(Box::new(TexData::new(target)));
        self.alloc_insn(op, DataType::F32, kind)
    }

    /// Control flow instruction. Branches, continues, breaks, returns and
    /// exits terminate their block, so does a join that names a target.
    pub fn new_flow(&mut self, op: Operation, target: FlowTarget) -> InsnId {
        let kind = InsnKind::Flow(FlowData {
            target,
            absolute: false,
            limit: false,
            builtin: false,
            indirect: false,
            all_warp: false,
        });
        let insn = self.alloc_insn(op, DataType::None, kind);

        let terminator = match op {
            Operation::Bra | Operation::Cont | Operation::Break | Operation::Ret | Operation::Exit => true,
            Operation::Join => target != FlowTarget::None,
            _ => false,
        };
        self.insns[insn].terminator = terminator;
        insn
    }

    pub fn insn(&self, insn: InsnId) -> &Instruction {
        &self.insns[insn]
    }

    pub fn insn_mut(&mut self, insn: InsnId) -> &mut Instruction {
        &mut self.insns[insn]
    }

    pub fn contains_insn(&self, insn: InsnId) -> bool {
        self.insns.contains(insn)
    }

    pub fn insn_ids(&self) -> Vec<InsnId> {
        self.insns.handles()
    }

    /// Unlinks the instruction from its block, drops every operand and
    /// releases it.
    pub fn delete_insn(&mut self, insn: InsnId) {
        if let Some(bb) = self.insns[insn].bb {
            self.remove_insn(bb, insn);
        }

        for slot in self.insns[insn].ref_slots() {
            self.set_ref(UseSite { insn, slot }, None);
        }
        for d in 0..self.insns[insn].defs.len() {
            self.set_def_site(DefSite { insn, index: d as u8 }, None);
        }

        self.insns.free(insn);
    }

    /// Sets definition `d`. Definitions are appended in order; clearing one
    /// that is not the last shifts the following ones down.
    pub fn set_def(&mut self, insn: InsnId, d: usize, value: Option<ValueId>) {
        let count = self.insns[insn].def_count();
        debug_assert!(d <= count, "definition {} set out of order", d);

        match value {
            Some(value) => {
                if d >= self.insns[insn].defs.len() {
                    self.insns[insn].defs.resize_with(d + 1, ValueDef::default);
                }
                self.set_def_site(DefSite { insn, index: d as u8 }, Some(value));
            }

            None => {
                if d >= count {
                    return;
                }
                for i in d..count - 1 {
                    let next = self.insns[insn].defs[i + 1].value;
                    self.set_def_site(DefSite { insn, index: i as u8 }, next);
                }
                self.set_def_site(
                    DefSite {
                        insn,
                        index: (count - 1) as u8,
                    },
                    None,
                );
                self.insns[insn].defs.truncate(count - 1);

                let data = &mut self.insns[insn];
                if let Some(f) = data.flags_def {
                    if f as usize == d {
                        data.flags_def = None;
                    } else if f as usize > d {
                        data.flags_def = Some(f - 1);
                    }
                }
            }
        }
    }

    /// Sets source `s`, keeping the slot's modifier. Sources are appended in
    /// order; clearing one that is not the last removes it and shifts the
    /// following ones down.
    pub fn set_src(&mut self, insn: InsnId, s: usize, value: Option<ValueId>) {
        let count = self.insns[insn].src_count();
        debug_assert!(s <= count, "source {} set out of order", s);

        match value {
            Some(value) => {
                if s >= self.insns[insn].srcs.len() {
                    self.insns[insn].srcs.resize_with(s + 1, ValueRef::default);
                }
                self.set_ref(
                    UseSite {
                        insn,
                        slot: RefSlot::Src(s as u8),
                    },
                    Some(value),
                );
            }

            None => {
                if s < count {
                    self.remove_src(insn, s);
                }
            }
        }
    }

    /// Sets source `s` to the value and modifier of `r`.
    pub fn set_src_ref(&mut self, insn: InsnId, s: usize, r: &ValueRef) {
        self.set_src(insn, s, r.value);
        if r.value.is_some() {
            self.insns[insn].srcs[s].modifier = r.modifier;
        }
    }

    pub fn set_src_modifier(&mut self, insn: InsnId, s: usize, modifier: Modifier) {
        debug_assert!(self.insns[insn].src_exists(s));
        self.insns[insn].srcs[s].modifier = modifier;
    }

    // Moves all of `r` into slot `s`, growing the source list if needed.
    fn assign_src(&mut self, insn: InsnId, s: usize, r: ValueRef) {
        if s >= self.insns[insn].srcs.len() {
            self.insns[insn].srcs.resize_with(s + 1, ValueRef::default);
        }
        self.set_ref(
            UseSite {
                insn,
                slot: RefSlot::Src(s as u8),
            },
            r.value,
        );

        let slot = &mut self.insns[insn].srcs[s];
        slot.modifier = r.modifier;
        slot.indirect = r.indirect;
        slot.used_as_ptr = r.used_as_ptr;
    }

    fn trim_srcs(&mut self, insn: InsnId) {
        let srcs = &mut self.insns[insn].srcs;
        while let Some(last) = srcs.last() {
            if last.exists() {
                break;
            }
            srcs.pop();
        }
    }

    fn remove_src(&mut self, insn: InsnId, s: usize) {
        self.move_sources(insn, s + 1, -1);
    }

    /// Moves sources `[s, last]` by `delta`. A negative delta erases the
    /// sources `[s + delta, s)`; a positive one leaves the vacated slots
    /// holding their old values for the caller to overwrite. Indirect,
    /// predicate, flags and texture indirect indices follow the move.
    pub fn move_sources(&mut self, insn: InsnId, s: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        assert!(s as isize + delta >= 0);

        let k = self.insns[insn].src_count();
        {
            let data = &mut self.insns[insn];
            for src in data.srcs.iter_mut().take(k) {
                for dim in 0..2 {
                    adjust_moved_index(&mut src.indirect[dim], s, delta);
                }
            }
            adjust_moved_index(&mut data.pred_src, s, delta);
            adjust_moved_index(&mut data.flags_src, s, delta);
            if let InsnKind::Texture(tex) = &mut data.kind {
                adjust_moved_index(&mut tex.r_indirect_src, s, delta);
                adjust_moved_index(&mut tex.s_indirect_src, s, delta);
            }
        }

        if delta > 0 {
            let delta = delta as usize;
            for p in (s..k).rev() {
                let r = self.insns[insn].srcs[p].clone();
                self.assign_src(insn, p + delta, r);
            }
        } else {
            let d = delta.unsigned_abs();
            let mut p = s;
            while p < k {
                let r = self.insns[insn].srcs[p].clone();
                self.assign_src(insn, p - d, r);
                p += 1;
            }
            while p - d < k {
                self.assign_src(insn, p - d, ValueRef::default());
                p += 1;
            }
        }

        self.trim_srcs(insn);
    }

    /// Exchanges the values and modifiers of two sources.
    pub fn swap_sources(&mut self, insn: InsnId, a: usize, b: usize) {
        let ra = self.insns[insn].srcs[a].clone();
        let rb = self.insns[insn].srcs[b].clone();

        self.set_ref(
            UseSite {
                insn,
                slot: RefSlot::Src(a as u8),
            },
            rb.value,
        );
        self.insns[insn].srcs[a].modifier = rb.modifier;

        self.set_ref(
            UseSite {
                insn,
                slot: RefSlot::Src(b as u8),
            },
            ra.value,
        );
        self.insns[insn].srcs[b].modifier = ra.modifier;
    }

    /// Sets indirect address `dim` of source `s`. A new indirect source is
    /// appended after the last existing source.
    pub fn set_indirect(&mut self, insn: InsnId, s: usize, dim: usize, value: Option<ValueId>) {
        assert!(self.insns[insn].src_exists(s));
        let current = self.insns[insn].srcs[s].indirect[dim];

        match (current, value) {
            (None, None) => {}

            (None, Some(value)) => {
                let p = self.insns[insn].src_count();
                self.set_src(insn, p, Some(value));
                let data = &mut self.insns[insn];
                data.srcs[p].used_as_ptr = true;
                data.srcs[s].indirect[dim] = Some(p as u8);
            }

            (Some(p), Some(value)) => {
                self.set_src(insn, p as usize, Some(value));
                self.insns[insn].srcs[p as usize].used_as_ptr = true;
            }

            (Some(p), None) => {
                self.insns[insn].srcs[s].indirect[dim] = None;
                self.remove_src(insn, p as usize);
            }
        }
    }

    /// Sets the condition code and predicate. The predicate source is
    /// appended after the last existing source.
    pub fn set_predicate(&mut self, insn: InsnId, cc: CondCode, value: Option<ValueId>) {
        self.insns[insn].cc = cc;

        match value {
            None => {
                if let Some(p) = self.insns[insn].pred_src.take() {
                    self.remove_src(insn, p as usize);
                }
            }

            Some(value) => {
                let p = match self.insns[insn].pred_src {
                    Some(p) => p as usize,
                    None => self.insns[insn].src_count(),
                };
                self.set_src(insn, p, Some(value));
                self.insns[insn].pred_src = Some(p as u8);
            }
        }
    }

    pub fn set_flags_src(&mut self, insn: InsnId, s: usize, value: Option<ValueId>) {
        match value {
            Some(value) => {
                self.set_src(insn, s, Some(value));
                self.insns[insn].flags_src = Some(s as u8);
            }

            None => {
                if let Some(p) = self.insns[insn].flags_src.take() {
                    self.remove_src(insn, p as usize);
                }
            }
        }
    }

    /// Sets the flags definition, appending it after the existing definitions
    /// if there is none yet.
    pub fn set_flags_def(&mut self, insn: InsnId, value: Option<ValueId>) {
        match value {
            Some(value) => {
                let d = match self.insns[insn].flags_def {
                    Some(d) => d as usize,
                    None => self.insns[insn].def_count(),
                };
                self.set_def(insn, d, Some(value));
                self.insns[insn].flags_def = Some(d as u8);
            }

            None => {
                if let Some(d) = self.insns[insn].flags_def {
                    self.set_def(insn, d as usize, None);
                }
            }
        }
    }

    /// Detaches the indirect sources of `s` and the predicate, returning them.
    pub fn take_extra_sources(&mut self, insn: InsnId, s: usize) -> [Option<ValueId>; 3] {
        let mut s = s;
        let mut values = [None; 3];

        for dim in 0..2 {
            values[dim] = self.insns[insn].get_indirect(s, dim);
            if values[dim].is_some() {
                let p = self.insns[insn].srcs[s].indirect[dim];
                self.set_indirect(insn, s, dim, None);
                if matches!(p, Some(p) if (p as usize) < s) {
                    s -= 1;
                }
            }
        }

        values[2] = self.insns[insn].predicate();
        if values[2].is_some() {
            let cc = self.insns[insn].cc;
            self.set_predicate(insn, cc, None);
        }

        values
    }

    pub fn put_extra_sources(&mut self, insn: InsnId, s: usize, values: [Option<ValueId>; 3]) {
        for dim in 0..2 {
            if values[dim].is_some() {
                self.set_indirect(insn, s, dim, values[dim]);
            }
        }
        if values[2].is_some() {
            let cc = self.insns[insn].cc;
            self.set_predicate(insn, cc, values[2]);
        }
    }

    fn set_tex_indirect(&mut self, insn: InsnId, sampler: bool, value: Option<ValueId>) {
        let current = {
            let tex = self.insns[insn].tex_data();
            if sampler {
                tex.s_indirect_src
            } else {
                tex.r_indirect_src
            }
        };

        let index = match (current, value) {
            (None, None) => return,

            (None, Some(value)) => {
                let p = self.insns[insn].src_count();
                self.set_src(insn, p, Some(value));
                self.insns[insn].srcs[p].used_as_ptr = true;
                Some(p as u8)
            }

            (Some(p), Some(value)) => {
                self.set_src(insn, p as usize, Some(value));
                Some(p)
            }

            (Some(p), None) => {
                self.remove_src(insn, p as usize);
                None
            }
        };

        let tex = self.insns[insn].tex_data_mut();
        if sampler {
            tex.s_indirect_src = index;
        } else {
            tex.r_indirect_src = index;
        }
    }

    /// Indirect resource index of a texture instruction.
    pub fn set_indirect_r(&mut self, insn: InsnId, value: Option<ValueId>) {
        self.set_tex_indirect(insn, false, value);
    }

    /// Indirect sampler index of a texture instruction.
    pub fn set_indirect_s(&mut self, insn: InsnId, value: Option<ValueId>) {
        self.set_tex_indirect(insn, true, value);
    }

    pub fn set_tex_offset(&mut self, insn: InsnId, i: usize, c: usize, value: Option<ValueId>) {
        let slot = RefSlot::TexOffset(i as u8, c as u8);
        self.set_ref(UseSite { insn, slot }, value);
    }

    /// Sets component `c` of the x (`axis` 0) or y derivative.
    pub fn set_tex_deriv(&mut self, insn: InsnId, axis: usize, c: usize, value: Option<ValueId>) {
        let slot = match axis {
            0 => RefSlot::TexDerivX(c as u8),
            _ => RefSlot::TexDerivY(c as u8),
        };
        self.set_ref(UseSite { insn, slot }, value);
    }

    /// Number of definitions selected by `mask`. With `single_file` only
    /// those in the file of the first selected one count.
    pub fn def_count_masked(&self, insn: InsnId, mask: u32, single_file: bool) -> usize {
        let data = &self.insns[insn];
        let values: Vec<ValueId> = data.defs.iter().map_while(|d| d.value).collect();
        self.count_masked(&values, mask, single_file)
    }

    pub fn src_count_masked(&self, insn: InsnId, mask: u32, single_file: bool) -> usize {
        let data = &self.insns[insn];
        let values: Vec<ValueId> = data.srcs.iter().map_while(|s| s.value).collect();
        self.count_masked(&values, mask, single_file)
    }

    fn count_masked(&self, values: &[ValueId], mask: u32, single_file: bool) -> usize {
        let mut mask = mask;

        if single_file {
            let first = mask.trailing_zeros() as usize;
            if mask == 0 || first >= values.len() {
                return 0;
            }
            let file = self.values[values[first]].reg.file;
            for (i, &v) in values.iter().enumerate().skip(first + 1) {
                if i < 32 && self.values[v].reg.file != file {
                    mask &= !(1 << i);
                }
            }
        }

        (0..values.len().min(32))
            .filter(|&i| mask & (1 << i) != 0)
            .count()
    }

    pub fn writes_predicate(&self, insn: InsnId) -> bool {
        self.insns[insn].defs.iter().map_while(|d| d.value).any(|v| {
            let file = self.values[v].reg.file;
            file == DataFile::Predicate || file == DataFile::Flags
        })
    }

    pub fn can_commute_def_def(&self, a: InsnId, b: InsnId) -> bool {
        let da: Vec<ValueId> = self.insns[a].defs.iter().map_while(|d| d.value).collect();
        let db: Vec<ValueId> = self.insns[b].defs.iter().map_while(|d| d.value).collect();
        da.iter()
            .all(|&x| db.iter().all(|&y| !self.interferes(x, y)))
    }

    pub fn can_commute_def_src(&self, a: InsnId, b: InsnId) -> bool {
        let da: Vec<ValueId> = self.insns[a].defs.iter().map_while(|d| d.value).collect();
        let sb: Vec<ValueId> = self.insns[b].srcs.iter().map_while(|s| s.value).collect();
        da.iter()
            .all(|&x| sb.iter().all(|&y| !self.interferes(x, y)))
    }

    /// Whether two adjacent instructions may be swapped.
    pub fn is_commutation_legal(&self, a: InsnId, b: InsnId) -> bool {
        debug_assert!(
            self.insns[a].next == Some(b) || self.insns[b].next == Some(a),
            "commutation query on non-adjacent instructions"
        );

        self.can_commute_def_def(a, b)
            && self.can_commute_def_src(a, b)
            && self.can_commute_def_src(b, a)
    }

    /// Whether the instruction emits no code. Meaningful after register
    /// allocation, when unassigned definitions are dead.
    pub fn is_nop(&self, insn: InsnId) -> bool {
        let data = &self.insns[insn];

        match data.op {
            Operation::Phi | Operation::Split | Operation::Merge => return true,
            _ => {}
        }
        if data.terminator || data.join {
            return false;
        }
        if data.op == Operation::Atom {
            return false;
        }
        if !data.fixed && data.op == Operation::Nop {
            return true;
        }

        if let Some(def) = data.get_def(0) {
            if self.values[self.representative(def)].reg.id < 0 {
                for d in data.defs.iter().skip(1).map_while(|d| d.value) {
                    if self.values[self.representative(d)].reg.id >= 0 {
                        log::warn!("part of vector result of %{} is unused", data.id);
                    }
                }
                return true;
            }
        }

        if data.op == Operation::Mov || data.op == Operation::Union {
            let def = match data.get_def(0) {
                Some(def) => def,
                None => return false,
            };
            let same = |s: usize| match data.get_src(s) {
                Some(src) => self.values_equal(def, src, false),
                None => false,
            };

            if !same(0) {
                return false;
            }
            if data.op == Operation::Union && !same(1) {
                return false;
            }
            return true;
        }

        false
    }

    /// Whether removing the instruction has no observable effect.
    pub fn is_dead(&self, insn: InsnId) -> bool {
        let data = &self.insns[insn];

        if data.op.has_side_effects() {
            return false;
        }

        for def in data.defs.iter().map_while(|d| d.value) {
            let value = &self.values[def];
            if value.use_count() > 0 || value.reg.id >= 0 {
                return false;
            }
        }

        if data.terminator || data.as_flow().is_some() {
            return false;
        }

        !data.fixed
    }

    /// Whether both instructions perform the same operation with the same
    /// settings, ignoring operands.
    pub fn is_action_equal(&self, a: InsnId, b: InsnId) -> bool {
        let x = &self.insns[a];
        let y = &self.insns[b];

        if x.op != y.op || x.dtype != y.dtype || x.stype != y.stype {
            return false;
        }
        if x.cc != y.cc {
            return false;
        }

        match (&x.kind, &y.kind) {
            (InsnKind::Texture(tx), InsnKind::Texture(ty)) => {
                if !tx.same_action(ty) {
                    return false;
                }
            }

            (InsnKind::Compare(cx), InsnKind::Compare(cy)) => {
                if cx.set_cond != cy.set_cond {
                    return false;
                }
            }

            (InsnKind::Flow(_), _) => return false,

            (InsnKind::Plain, InsnKind::Plain) => {
                if x.op == Operation::Phi && x.bb != y.bb {
                    return false;
                }
                if x.ipa != y.ipa || x.lanes != y.lanes || x.per_patch != y.per_patch {
                    return false;
                }
                if x.post_factor != y.post_factor {
                    return false;
                }
            }

            _ => return false,
        }

        x.sub_op == y.sub_op
            && x.saturate == y.saturate
            && x.rnd == y.rnd
            && x.ftz == y.ftz
            && x.dnz == y.dnz
            && x.cache == y.cache
            && x.mask == y.mask
    }

    /// Whether both instructions compute the same results.
    pub fn is_result_equal(&self, a: InsnId, b: InsnId) -> bool {
        let x = &self.insns[a];
        let y = &self.insns[b];

        // discard location only matters for quad operations
        if !x.def_exists(0) && x.op != Operation::Discard {
            return false;
        }
        if !self.is_action_equal(a, b) {
            return false;
        }
        if x.pred_src != y.pred_src {
            return false;
        }

        let dx = x.def_count();
        if dx != y.def_count() {
            return false;
        }
        for d in 0..dx {
            if let (Some(vx), Some(vy)) = (x.get_def(d), y.get_def(d)) {
                if !self.values_equal(vx, vy, false) {
                    return false;
                }
            }
        }

        let sx = x.src_count();
        if sx != y.src_count() {
            return false;
        }
        for s in 0..sx {
            if x.srcs[s].modifier != y.srcs[s].modifier {
                return false;
            }
            if let (Some(vx), Some(vy)) = (x.get_src(s), y.get_src(s)) {
                if !self.values_equal(vx, vy, true) {
                    return false;
                }
            }
        }

        match x.op {
            Operation::Load | Operation::Vfetch | Operation::Atom => {
                let file = match x.get_src(0) {
                    Some(src) => self.values[src].reg.file,
                    None => return false,
                };
                match file {
                    DataFile::MemoryConst | DataFile::ShaderInput => true,
                    DataFile::ShaderOutput => self.ty() == ProgramType::TessellationEval,
                    _ => false,
                }
            }
            _ => true,
        }
    }
}
