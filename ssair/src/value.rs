use crate::arena::Handle;
use crate::function::FunctionId;
use crate::instruction::InsnId;
use crate::modifier::Modifier;
use crate::program::Program;
use crate::types::{CondCode, DataFile, DataType, Operation, SvSemantic};

pub type ValueId = Handle<Value>;

/// Where a value lives: storage file, width and numeric type. `id` is the
/// register (or slot) assigned by allocation, negative while unassigned.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Storage {
    pub file: DataFile,
    pub file_index: u8,
    pub size: u32,
    pub ty: DataType,
    pub id: i32,
}

impl Storage {
    pub fn new(file: DataFile, ty: DataType) -> Storage {
        let size = match file {
            DataFile::Predicate | DataFile::Flags | DataFile::Barrier => 1,
            _ => ty.size(),
        };

        Storage {
            file,
            file_index: 0,
            size,
            ty,
            id: -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    LValue(LValueData),
    Symbol(SymbolData),
    Immediate(Immediate),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LValueData {
    pub comp_mask: u8,
    pub compound: bool,
    pub ssa: bool,
    pub fixed_reg: bool,
    pub no_spill: bool,
}

/// Reference into a memory space, or a system value.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolData {
    pub offset: i32,
    pub sv: Option<(SvSemantic, u8)>,
    pub base: Option<ValueId>,
}

/// Immediate payload. The bits are interpreted according to `ty`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Immediate {
    pub ty: DataType,
    bits: u64,
}

impl Immediate {
    pub fn zero(ty: DataType) -> Immediate {
        Immediate { ty, bits: 0 }
    }

    pub fn u32(value: u32) -> Immediate {
        Immediate {
            ty: DataType::U32,
            bits: value as u64,
        }
    }

    pub fn s32(value: i32) -> Immediate {
        Immediate {
            ty: DataType::S32,
            bits: value as u32 as u64,
        }
    }

    pub fn f32(value: f32) -> Immediate {
        Immediate {
            ty: DataType::F32,
            bits: value.to_bits() as u64,
        }
    }

    pub fn u64(value: u64) -> Immediate {
        Immediate {
            ty: DataType::U64,
            bits: value,
        }
    }

    pub fn f64(value: f64) -> Immediate {
        Immediate {
            ty: DataType::F64,
            bits: value.to_bits(),
        }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn as_u32(&self) -> u32 {
        self.bits as u32
    }

    pub fn as_s32(&self) -> i32 {
        self.bits as u32 as i32
    }

    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.bits as u32)
    }

    pub fn as_u64(&self) -> u64 {
        self.bits
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.bits)
    }

    pub(crate) fn set_s32(&mut self, value: i32) {
        self.bits = (self.bits & !0xffff_ffff) | value as u32 as u64;
    }

    pub(crate) fn set_f32(&mut self, value: f32) {
        self.bits = (self.bits & !0xffff_ffff) | value.to_bits() as u64;
    }

    pub(crate) fn set_f64(&mut self, value: f64) {
        self.bits = value.to_bits();
    }

    pub(crate) fn set_u64(&mut self, value: u64) {
        self.bits = value;
    }

    /// Whether the payload equals the integer `i` under its own type.
    pub fn is_integer(&self, i: i32) -> bool {
        match self.ty {
            DataType::S8 => self.bits as i8 as i32 == i,
            DataType::U8 => self.bits as u8 as i32 == i,
            DataType::S16 => self.bits as i16 as i32 == i,
            DataType::U16 => self.bits as u16 as i32 == i,
            DataType::S32 | DataType::U32 => self.as_s32() == i,
            DataType::S64 | DataType::U64 => self.bits as i64 == i as i64,
            DataType::F32 => self.as_f32() == i as f32,
            DataType::F64 => self.as_f64() == i as f64,
            _ => false,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self.ty {
            DataType::S8 => (self.bits as i8) < 0,
            DataType::S16 => (self.bits as i16) < 0,
            DataType::S32 | DataType::U32 => self.as_s32() < 0,
            DataType::F32 => self.bits & (1 << 31) != 0,
            DataType::F64 => self.bits & (1 << 63) != 0,
            _ => false,
        }
    }

    /// Power of two or zero.
    pub fn is_pow2(&self) -> bool {
        match self.ty {
            DataType::U64 | DataType::S64 => self.bits & self.bits.wrapping_sub(1) == 0,
            _ => {
                let v = self.as_u32();
                v & v.wrapping_sub(1) == 0
            }
        }
    }

    pub fn apply_log2(&mut self) {
        match self.ty {
            DataType::S8 | DataType::S16 | DataType::S32 | DataType::U8 | DataType::U16 | DataType::U32 => {
                debug_assert!(!self.is_negative());
                let v = self.as_u32();
                let log = if v == 0 { 0 } else { 31 - v.leading_zeros() };
                self.bits = log as u64;
            }

            DataType::S64 | DataType::U64 => {
                let log = if self.bits == 0 {
                    0
                } else {
                    63 - self.bits.leading_zeros()
                };
                self.bits = log as u64;
            }

            DataType::F32 => {
                let f = self.as_f32().log2();
                self.set_f32(f);
            }

            DataType::F64 => {
                let f = self.as_f64().log2();
                self.set_f64(f);
            }

            ty => debug_assert!(false, "log2 of immediate of type {}", ty.name()),
        }
    }

    /// Evaluates `self <cc> value`. Only defined for F32 immediates.
    pub fn compare(&self, cc: CondCode, value: f32) -> bool {
        if self.ty != DataType::F32 {
            log::error!("immediate compare on non-f32 value of type {}", self.ty.name());
            return false;
        }

        let f = self.as_f32();
        let ordered = CondCode::try_from(u8::from(cc) & 7).unwrap_or(CondCode::Fl);
        match ordered {
            CondCode::Tr => true,
            CondCode::Fl => false,
            CondCode::Lt => f < value,
            CondCode::Le => f <= value,
            CondCode::Gt => f > value,
            CondCode::Ge => f >= value,
            CondCode::Eq => f == value,
            CondCode::Ne => f != value,
            _ => false,
        }
    }
}

/// Position of a `ValueRef` inside its instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefSlot {
    Src(u8),
    TexOffset(u8, u8),
    TexDerivX(u8),
    TexDerivY(u8),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct UseSite {
    pub insn: InsnId,
    pub slot: RefSlot,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct DefSite {
    pub insn: InsnId,
    pub index: u8,
}

/// Source operand: a used value, its modifier and up to two indirect
/// addressing sources (indices of other sources of the same instruction).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueRef {
    pub(crate) value: Option<ValueId>,
    pub modifier: Modifier,
    pub(crate) indirect: [Option<u8>; 2],
    pub used_as_ptr: bool,
}

impl ValueRef {
    pub fn new(value: ValueId) -> ValueRef {
        ValueRef {
            value: Some(value),
            ..ValueRef::default()
        }
    }

    pub fn with_modifier(value: ValueId, modifier: Modifier) -> ValueRef {
        ValueRef {
            value: Some(value),
            modifier,
            ..ValueRef::default()
        }
    }

    pub fn get(&self) -> Option<ValueId> {
        self.value
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn indirect(&self, dim: usize) -> Option<u8> {
        self.indirect[dim]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueDef {
    pub(crate) value: Option<ValueId>,
}

impl ValueDef {
    pub fn get(&self) -> Option<ValueId> {
        self.value
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }
}

pub struct Value {
    pub id: u32,
    pub kind: ValueKind,
    pub reg: Storage,
    pub(crate) func: Option<FunctionId>,
    pub(crate) uses: Vec<UseSite>,
    pub(crate) defs: Vec<DefSite>,
}

impl Value {
    pub fn uses(&self) -> &[UseSite] {
        &self.uses
    }

    pub fn defs(&self) -> &[DefSite] {
        &self.defs
    }

    pub fn use_count(&self) -> usize {
        self.uses.len()
    }

    pub fn function(&self) -> Option<FunctionId> {
        self.func
    }

    pub fn in_file(&self, file: DataFile) -> bool {
        self.reg.file == file
    }

    pub fn set_type(&mut self, ty: DataType) {
        self.reg.ty = ty;
        self.reg.size = ty.size();
    }

    pub fn is_lvalue(&self) -> bool {
        matches!(self.kind, ValueKind::LValue(_))
    }

    pub fn as_lvalue(&self) -> Option<&LValueData> {
        match &self.kind {
            ValueKind::LValue(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&SymbolData> {
        match &self.kind {
            ValueKind::Symbol(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<&Immediate> {
        match &self.kind {
            ValueKind::Immediate(imm) => Some(imm),
            _ => None,
        }
    }
}

impl Program {
    pub(crate) fn alloc_value(&mut self, kind: ValueKind, reg: Storage, func: Option<FunctionId>) -> ValueId {
        self.next_value_id += 1;
        let id = self.values.alloc(Value {
            id: self.next_value_id,
            kind,
            reg,
            func,
            uses: Vec::new(),
            defs: Vec::new(),
        });
        self.reset_join(id);
        id
    }

    /// Creates a local value of the function, typed as a 32 bit word.
    pub fn new_lvalue(&mut self, func: FunctionId, file: DataFile) -> ValueId {
        let data = LValueData {
            ssa: true,
            ..LValueData::default()
        };
        let id = self.alloc_value(
            ValueKind::LValue(data),
            Storage::new(file, DataType::U32),
            Some(func),
        );
        self.functions[func].lvalues.push(id);
        id
    }

    pub fn new_lvalue_typed(&mut self, func: FunctionId, file: DataFile, ty: DataType) -> ValueId {
        let id = self.new_lvalue(func, file);
        self.values[id].set_type(ty);
        id
    }

    pub fn new_symbol(&mut self, file: DataFile, file_index: u8, ty: DataType, offset: i32) -> ValueId {
        let mut reg = Storage::new(file, ty);
        reg.file_index = file_index;
        let data = SymbolData {
            offset,
            sv: None,
            base: None,
        };
        self.alloc_value(ValueKind::Symbol(data), reg, None)
    }

    pub fn new_sysval(&mut self, sv: SvSemantic, index: u8) -> ValueId {
        let reg = Storage::new(DataFile::SystemValue, DataType::U32);
        let data = SymbolData {
            offset: 0,
            sv: Some((sv, index)),
            base: None,
        };
        self.alloc_value(ValueKind::Symbol(data), reg, None)
    }

    pub fn new_immediate(&mut self, imm: Immediate) -> ValueId {
        let reg = Storage::new(DataFile::Immediate, imm.ty);
        self.alloc_value(ValueKind::Immediate(imm), reg, None)
    }

    pub fn value(&self, value: ValueId) -> &Value {
        &self.values[value]
    }

    pub fn value_mut(&mut self, value: ValueId) -> &mut Value {
        &mut self.values[value]
    }

    pub fn contains_value(&self, value: ValueId) -> bool {
        self.values.contains(value)
    }

    pub fn value_ids(&self) -> Vec<ValueId> {
        self.values.handles()
    }

    /// Releases a value that is no longer referenced by any instruction.
    pub fn delete_value(&mut self, value: ValueId) {
        let data = &self.values[value];
        assert!(
            data.uses.is_empty() && data.defs.is_empty(),
            "deleting value %{} that is still referenced",
            data.id
        );

        if let Some(func) = data.func {
            self.functions[func].lvalues.retain(|&v| v != value);
        }
        self.reset_join(value);
        self.values.free(value);
    }

    fn reset_join(&mut self, value: ValueId) {
        let idx = value.index();
        if self.joins.len() <= idx {
            self.joins.resize_with(idx + 1, Default::default);
        }
        self.joins[idx].set(None);
    }

    /// Representative of the coalescing class of `value`. Paths are
    /// compressed on the way.
    pub fn representative(&self, value: ValueId) -> ValueId {
        let link = |v: ValueId| -> Option<ValueId> {
            self.joins
                .get(v.index())
                .and_then(|cell| cell.get())
                .filter(|&next| next != v && self.values.contains(next))
        };

        let mut root = value;
        while let Some(next) = link(root) {
            root = next;
        }

        let mut cur = value;
        while let Some(next) = link(cur) {
            self.joins[cur.index()].set(Some(root));
            cur = next;
        }

        root
    }

    /// Merges the coalescing class of `value` into the one of `rep`.
    pub fn join_values(&mut self, value: ValueId, rep: ValueId) {
        let root = self.representative(rep);
        let old = self.representative(value);
        if old != root {
            self.joins[old.index()].set(Some(root));
        }
    }

    pub fn ref_at(&self, site: UseSite) -> &ValueRef {
        let insn = &self.insns[site.insn];
        match site.slot {
            RefSlot::Src(s) => &insn.srcs[s as usize],
            RefSlot::TexOffset(i, c) => &insn.tex_data().offsets[i as usize][c as usize],
            RefSlot::TexDerivX(c) => &insn.tex_data().dpdx[c as usize],
            RefSlot::TexDerivY(c) => &insn.tex_data().dpdy[c as usize],
        }
    }

    pub(crate) fn ref_at_mut(&mut self, site: UseSite) -> &mut ValueRef {
        let insn = &mut self.insns[site.insn];
        match site.slot {
            RefSlot::Src(s) => &mut insn.srcs[s as usize],
            RefSlot::TexOffset(i, c) => &mut insn.tex_data_mut().offsets[i as usize][c as usize],
            RefSlot::TexDerivX(c) => &mut insn.tex_data_mut().dpdx[c as usize],
            RefSlot::TexDerivY(c) => &mut insn.tex_data_mut().dpdy[c as usize],
        }
    }

    /// Rebinds the reference at `site`, moving it from the use list of the
    /// old value to the one of the new value.
    pub fn set_ref(&mut self, site: UseSite, value: Option<ValueId>) {
        let old = self.ref_at(site).value;
        if old == value {
            return;
        }

        if let Some(old) = old {
            let uses = &mut self.values[old].uses;
            match uses.iter().position(|&u| u == site) {
                Some(pos) => {
                    uses.remove(pos);
                }
                None => debug_assert!(false, "use list out of sync"),
            }
        }
        if let Some(value) = value {
            self.values[value].uses.push(site);
        }

        self.ref_at_mut(site).value = value;
    }

    /// Rebinds the definition at `site`.
    pub fn set_def_site(&mut self, site: DefSite, value: Option<ValueId>) {
        let old = self.insns[site.insn].defs[site.index as usize].value;
        if old == value {
            return;
        }

        if let Some(old) = old {
            let defs = &mut self.values[old].defs;
            match defs.iter().position(|&d| d == site) {
                Some(pos) => {
                    defs.remove(pos);
                }
                None => debug_assert!(false, "def list out of sync"),
            }
        }
        if let Some(value) = value {
            self.values[value].defs.push(site);
        }

        self.insns[site.insn].defs[site.index as usize].value = value;
    }

    /// Whether every use of the value defined at `def` could read `rep`
    /// instead, including its modifier.
    pub fn may_replace(&self, def: DefSite, rep: &ValueRef) -> bool {
        if rep.modifier.is_none() {
            return true;
        }

        let insn = &self.insns[def.insn];
        if insn.bb.is_none() {
            return false;
        }
        let value = match insn.defs[def.index as usize].value {
            Some(value) => value,
            None => return false,
        };

        for site in &self.values[value].uses {
            let s = match site.slot {
                RefSlot::Src(s) => s as usize,
                _ => return false,
            };

            let user = &self.insns[site.insn];
            // more than one reference from the same instruction would need the
            // combined modifiers to be checked
            let refs = user.srcs.iter().filter(|r| r.value == Some(value)).count();
            if refs > 1 {
                return false;
            }

            if !self.target().is_mod_supported(user, s, rep.modifier) {
                return false;
            }
        }

        true
    }

    /// Rewrites every use of the value defined at `def` to use `rep`,
    /// folding in its modifier. With `do_set` the definition itself is
    /// rebound as well.
    pub fn replace(&mut self, def: DefSite, rep: &ValueRef, do_set: bool) {
        debug_assert!(self.may_replace(def, rep));

        let value = match self.insns[def.insn].defs[def.index as usize].value {
            Some(value) => value,
            None => return,
        };
        if Some(value) == rep.value {
            return;
        }

        while let Some(&site) = self.values[value].uses.first() {
            match (rep.value, site.slot) {
                (None, RefSlot::Src(s)) => self.set_src(site.insn, s as usize, None),
                (None, _) => self.set_ref(site, None),
                (Some(_), _) => {
                    self.set_ref(site, rep.value);
                    let r = self.ref_at_mut(site);
                    r.modifier = r.modifier * rep.modifier;
                }
            }
        }

        if do_set {
            self.set_def_site(def, rep.value);
        }
    }

    /// Instruction of the first definition.
    pub fn def_insn(&self, value: ValueId) -> Option<InsnId> {
        self.values[value].defs.first().map(|d| d.insn)
    }

    /// Defining instruction, if all definitions are in a single instruction.
    pub fn unique_insn(&self, value: ValueId) -> Option<InsnId> {
        let defs = &self.values[value].defs;
        let first = defs.first()?.insn;
        if defs.iter().all(|d| d.insn == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Whether the storage of `a` and `b` overlaps after coalescing.
    pub fn interferes(&self, a: ValueId, b: ValueId) -> bool {
        let va = &self.values[a];
        let vb = &self.values[b];

        if va.reg.file != vb.reg.file || va.reg.file_index != vb.reg.file_index {
            return false;
        }
        if va.as_immediate().is_some() {
            return false;
        }

        let ra = &self.values[self.representative(a)];
        let rb = &self.values[self.representative(b)];

        let (id_a, id_b) = match (&ra.kind, &rb.kind) {
            (ValueKind::Symbol(sa), ValueKind::Symbol(sb)) => (sa.offset as i64, sb.offset as i64),
            _ => (
                ra.reg.id as i64 * va.reg.size.min(4) as i64,
                rb.reg.id as i64 * vb.reg.size.min(4) as i64,
            ),
        };

        if id_a < id_b {
            id_a + va.reg.size as i64 > id_b
        } else if id_a > id_b {
            id_b + vb.reg.size as i64 > id_a
        } else {
            true
        }
    }

    /// Identity when `strict`, storage equality otherwise. Immediates compare
    /// their payload, symbols their location.
    pub fn values_equal(&self, a: ValueId, b: ValueId, strict: bool) -> bool {
        let va = &self.values[a];
        let vb = &self.values[b];

        match (&va.kind, &vb.kind) {
            (ValueKind::Immediate(ia), _) => match vb.as_immediate() {
                Some(ib) => ia.bits == ib.bits,
                None => false,
            },

            (ValueKind::Symbol(sa), ValueKind::Symbol(sb)) => {
                if va.reg.file != vb.reg.file || va.reg.file_index != vb.reg.file_index {
                    return false;
                }
                if sa.base != sb.base {
                    return false;
                }
                if va.reg.file == DataFile::SystemValue {
                    sa.sv == sb.sv
                } else {
                    sa.offset == sb.offset
                }
            }

            (ValueKind::Symbol(_), _) => false,

            (ValueKind::LValue(_), _) => {
                if strict {
                    return a == b;
                }
                va.reg.file == vb.reg.file
                    && va.reg.file_index == vb.reg.file_index
                    && va.reg.size == vb.reg.size
                    && va.reg.id == vb.reg.id
            }
        }
    }

    /// Whether all invocations see the same value.
    pub fn is_uniform(&self, value: ValueId) -> bool {
        let mut current = value;

        for _ in 0..=self.values.len() {
            let data = &self.values[current];
            match &data.kind {
                ValueKind::Immediate(_) => return true,
                ValueKind::Symbol(_) => {
                    return !matches!(
                        data.reg.file,
                        DataFile::SystemValue | DataFile::MemoryLocal | DataFile::ShaderInput
                    )
                }
                ValueKind::LValue(_) => {
                    if data.defs.len() > 1 {
                        return false;
                    }
                    let insn = match self.def_insn(current) {
                        Some(insn) => &self.insns[insn],
                        None => return false,
                    };
                    if insn.src_exists(1) {
                        return false;
                    }
                    current = match insn.get_src(0) {
                        Some(src) => src,
                        None => return false,
                    };
                }
            }
        }

        false
    }

    /// Immediate behind a reference read as `ty`, chasing plain MOVs and
    /// applying the modifiers met on the way. The immediate takes the type of
    /// its use; a modifier under a MOV of another source type stops the
    /// search.
    pub fn ref_immediate(&self, r: &ValueRef, ty: DataType) -> Option<Immediate> {
        let mut modifier = Modifier::NONE;
        let mut src = r;
        let mut src_ty = ty;

        for _ in 0..=self.values.len() {
            if !src.modifier.is_none() {
                if src_ty != ty {
                    return None;
                }
                modifier = modifier * src.modifier;
            }

            let current = src.value?;
            if let Some(imm) = self.values[current].as_immediate() {
                let mut imm = *imm;
                imm.ty = ty;
                modifier.apply_to(&mut imm);
                return Some(imm);
            }

            let insn = &self.insns[self.unique_insn(current)?];
            if insn.op != Operation::Mov || insn.predicate().is_some() {
                return None;
            }
            src = insn.srcs.first()?;
            src_ty = insn.stype;
            log::trace!("chasing immediate through mov %{}", insn.id);
        }

        None
    }

    /// Immediate read by source `s`, typed as the instruction's source type.
    pub fn src_immediate(&self, insn: InsnId, s: usize) -> Option<Immediate> {
        let insn = &self.insns[insn];
        if !insn.src_exists(s) {
            return None;
        }
        self.ref_immediate(&insn.srcs[s], insn.stype)
    }
}
