use num_enum::{IntoPrimitive, TryFromPrimitive};

macro_rules! operations {
    ($($variant:ident => $name:expr,)*) => {
        #[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
        #[repr(u8)]
        pub enum Operation {
            $($variant,)*
        }

        impl Operation {
            pub fn name(self) -> &'static str {
                match self {
                    $(Operation::$variant => $name,)*
                }
            }
        }
    };
}

operations! {
    Nop => "nop",
    Phi => "phi",
    Union => "union",
    Split => "split",
    Merge => "merge",
    Constraint => "consec",
    Mov => "mov",
    Load => "ld",
    Store => "st",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Div => "div",
    Mod => "mod",
    Mad => "mad",
    Fma => "fma",
    Sad => "sad",
    Shladd => "shladd",
    Abs => "abs",
    Neg => "neg",
    Not => "not",
    And => "and",
    Or => "or",
    Xor => "xor",
    Shl => "shl",
    Shr => "shr",
    Shf => "shf",
    Max => "max",
    Min => "min",
    Sat => "sat",
    Ceil => "ceil",
    Floor => "floor",
    Trunc => "trunc",
    Cvt => "cvt",
    SetAnd => "set and",
    SetOr => "set or",
    SetXor => "set xor",
    Set => "set",
    Selp => "selp",
    Slct => "slct",
    Rcp => "rcp",
    Rsq => "rsqrt",
    Lg2 => "lg2",
    Sin => "sin",
    Cos => "cos",
    Ex2 => "ex2",
    Exp => "exp",
    Log => "log",
    Presin => "presin",
    Preex2 => "preex2",
    Sqrt => "sqrt",
    Pow => "pow",
    Bra => "bra",
    Call => "call",
    Ret => "ret",
    Cont => "cont",
    Break => "break",
    PreRet => "preret",
    PreCont => "precont",
    PreBreak => "prebreak",
    Brkpt => "brkpt",
    JoinAt => "joinat",
    Join => "join",
    Discard => "discard",
    Exit => "exit",
    Membar => "membar",
    Vfetch => "vfetch",
    Pfetch => "pfetch",
    Afetch => "afetch",
    Export => "export",
    Linterp => "linterp",
    Pinterp => "pinterp",
    Emit => "emit",
    Restart => "restart",
    Tex => "tex",
    Txb => "texbias",
    Txl => "texlod",
    Txf => "texfetch",
    Txq => "texquery",
    Txd => "texgrad",
    Txg => "texgather",
    Txlq => "texquerylod",
    TexCsaa => "texcsaa",
    TexPrep => "texprep",
    SuLdB => "suldb",
    SuLdP => "suldp",
    SuStB => "sustb",
    SuStP => "sustp",
    SuRedB => "suredb",
    SuRedP => "suredp",
    SuLea => "sulea",
    SuQ => "suq",
    TexBar => "texbar",
    Dfdx => "dfdx",
    Dfdy => "dfdy",
    Rdsv => "rdsv",
    Wrsv => "wrsv",
    Pixld => "pixld",
    QuadOp => "quadop",
    QuadOn => "quadon",
    QuadPop => "quadpop",
    PopCnt => "popcnt",
    InsBf => "insbf",
    ExtBf => "extbf",
    Bfind => "bfind",
    Brev => "brev",
    Bmsk => "bmsk",
    Permt => "permt",
    Sgxt => "sgxt",
    Atom => "atom",
    Bar => "bar",
    Cctl => "cctl",
    Shfl => "shfl",
    Vote => "vote",
    WarpSync => "warpsync",
}

impl Operation {
    pub fn is_phi(self) -> bool {
        self == Operation::Phi
    }

    pub fn is_texture(self) -> bool {
        let op = u8::from(self);
        op >= u8::from(Operation::Tex) && op <= u8::from(Operation::TexPrep)
    }

    pub fn is_surface(self) -> bool {
        let op = u8::from(self);
        op >= u8::from(Operation::SuLdB) && op <= u8::from(Operation::SuQ)
    }

    pub fn is_flow(self) -> bool {
        let op = u8::from(self);
        op >= u8::from(Operation::Bra) && op <= u8::from(Operation::Exit)
    }

    pub fn is_set(self) -> bool {
        match self {
            Operation::Set | Operation::SetAnd | Operation::SetOr | Operation::SetXor => true,
            _ => false,
        }
    }

    /// Operations with side effects that are never removed as dead code.
    pub fn has_side_effects(self) -> bool {
        match self {
            Operation::Store
            | Operation::Export
            | Operation::Atom
            | Operation::SuStB
            | Operation::SuStP
            | Operation::SuRedB
            | Operation::SuRedP => true,
            _ => false,
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum DataType {
    None,
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F16,
    F32,
    F64,
    B96,
    B128,
}

impl DataType {
    pub fn size(self) -> u32 {
        match self {
            DataType::None => 0,
            DataType::U8 | DataType::S8 => 1,
            DataType::U16 | DataType::S16 | DataType::F16 => 2,
            DataType::U32 | DataType::S32 | DataType::F32 => 4,
            DataType::U64 | DataType::S64 | DataType::F64 => 8,
            DataType::B96 => 12,
            DataType::B128 => 16,
        }
    }

    pub fn is_float(self) -> bool {
        match self {
            DataType::F16 | DataType::F32 | DataType::F64 => true,
            _ => false,
        }
    }

    pub fn is_signed(self) -> bool {
        match self {
            DataType::S8 | DataType::S16 | DataType::S32 | DataType::S64 => true,
            _ => self.is_float(),
        }
    }

    pub fn is_signed_int(self) -> bool {
        self.is_signed() && !self.is_float()
    }

    /// Type with the given byte size.
    pub fn of_size(size: u32, float: bool, signed: bool) -> DataType {
        match (size, float, signed) {
            (1, false, false) => DataType::U8,
            (1, false, true) => DataType::S8,
            (2, true, _) => DataType::F16,
            (2, false, false) => DataType::U16,
            (2, false, true) => DataType::S16,
            (4, true, _) => DataType::F32,
            (4, false, false) => DataType::U32,
            (4, false, true) => DataType::S32,
            (8, true, _) => DataType::F64,
            (8, false, false) => DataType::U64,
            (8, false, true) => DataType::S64,
            (12, _, _) => DataType::B96,
            (16, _, _) => DataType::B128,
            _ => DataType::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::None => "-",
            DataType::U8 => "u8",
            DataType::S8 => "s8",
            DataType::U16 => "u16",
            DataType::S16 => "s16",
            DataType::U32 => "u32",
            DataType::S32 => "s32",
            DataType::U64 => "u64",
            DataType::S64 => "s64",
            DataType::F16 => "f16",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::B96 => "b96",
            DataType::B128 => "b128",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum DataFile {
    Null,
    Gpr,
    Predicate,
    Flags,
    Address,
    Barrier,
    Immediate,
    MemoryConst,
    ShaderInput,
    ShaderOutput,
    MemoryBuffer,
    MemoryGlobal,
    MemoryShared,
    MemoryLocal,
    SystemValue,
}

impl DataFile {
    pub fn is_register(self) -> bool {
        match self {
            DataFile::Gpr
            | DataFile::Predicate
            | DataFile::Flags
            | DataFile::Address
            | DataFile::Barrier => true,
            _ => false,
        }
    }

    pub fn is_memory(self) -> bool {
        u8::from(self) >= u8::from(DataFile::MemoryConst)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            DataFile::Null => "_",
            DataFile::Gpr => "r",
            DataFile::Predicate => "p",
            DataFile::Flags => "c",
            DataFile::Address => "a",
            DataFile::Barrier => "b",
            DataFile::Immediate => "i",
            DataFile::MemoryConst => "c",
            DataFile::ShaderInput => "a",
            DataFile::ShaderOutput => "o",
            DataFile::MemoryBuffer => "b",
            DataFile::MemoryGlobal => "g",
            DataFile::MemoryShared => "s",
            DataFile::MemoryLocal => "l",
            DataFile::SystemValue => "sv",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum CondCode {
    Fl = 0,
    Lt = 1,
    Eq = 2,
    Le = 3,
    Gt = 4,
    Ne = 5,
    Ge = 6,
    Tr = 7,
    U = 8,
    Ltu = 9,
    Equ = 10,
    Leu = 11,
    Gtu = 12,
    Neu = 13,
    Geu = 14,
    No = 16,
    Nc = 17,
    Ns = 18,
    Na = 19,
    A = 20,
    S = 21,
    C = 22,
    O = 23,
    Always = 24,
}

impl CondCode {
    /// Predicate false, for predicated execution.
    pub const NOT_P: CondCode = CondCode::Eq;
    /// Predicate true, for predicated execution.
    pub const P: CondCode = CondCode::Ne;

    /// Condition that holds when the operands are swapped.
    pub fn reverse(self) -> CondCode {
        const REV: [u8; 8] = [0, 4, 2, 6, 1, 5, 3, 7];
        let cc = u8::from(self);
        if cc >= 16 {
            return self;
        }
        CondCode::try_from(REV[(cc & 7) as usize] | (cc & !7)).unwrap_or(self)
    }

    /// Condition that holds exactly when this one does not, if there is one.
    pub fn inverse(self) -> Option<CondCode> {
        let cc = match self {
            CondCode::Fl => CondCode::Tr,
            CondCode::Tr => CondCode::Fl,
            CondCode::Lt => CondCode::Geu,
            CondCode::Eq => CondCode::Neu,
            CondCode::Le => CondCode::Gtu,
            CondCode::Gt => CondCode::Leu,
            CondCode::Ne => CondCode::Equ,
            CondCode::Ge => CondCode::Ltu,
            CondCode::Ltu => CondCode::Ge,
            CondCode::Equ => CondCode::Ne,
            CondCode::Leu => CondCode::Gt,
            CondCode::Gtu => CondCode::Le,
            CondCode::Neu => CondCode::Eq,
            CondCode::Geu => CondCode::Lt,
            CondCode::No => CondCode::O,
            CondCode::O => CondCode::No,
            CondCode::Nc => CondCode::C,
            CondCode::C => CondCode::Nc,
            CondCode::Ns => CondCode::S,
            CondCode::S => CondCode::Ns,
            CondCode::Na => CondCode::A,
            CondCode::A => CondCode::Na,
            CondCode::U | CondCode::Always => return None,
        };
        Some(cc)
    }

    pub fn name(self) -> &'static str {
        match self {
            CondCode::Fl => "never",
            CondCode::Lt => "lt",
            CondCode::Eq => "eq",
            CondCode::Le => "le",
            CondCode::Gt => "gt",
            CondCode::Ne => "ne",
            CondCode::Ge => "ge",
            CondCode::Tr => "always",
            CondCode::U => "unord",
            CondCode::Ltu => "ltu",
            CondCode::Equ => "equ",
            CondCode::Leu => "leu",
            CondCode::Gtu => "gtu",
            CondCode::Neu => "neu",
            CondCode::Geu => "geu",
            CondCode::No => "no",
            CondCode::Nc => "nc",
            CondCode::Ns => "ns",
            CondCode::Na => "na",
            CondCode::A => "a",
            CondCode::S => "s",
            CondCode::C => "c",
            CondCode::O => "o",
            CondCode::Always => "",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum RoundMode {
    N,
    M,
    Z,
    P,
    NI,
    MI,
    ZI,
    PI,
}

impl RoundMode {
    pub fn name(self) -> &'static str {
        match self {
            RoundMode::N => "",
            RoundMode::M => "rm",
            RoundMode::Z => "rz",
            RoundMode::P => "rp",
            RoundMode::NI => "rni",
            RoundMode::MI => "rmi",
            RoundMode::ZI => "rzi",
            RoundMode::PI => "rpi",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum CacheMode {
    Ca,
    Cg,
    Cs,
    Cv,
}

impl CacheMode {
    pub fn name(self) -> &'static str {
        match self {
            CacheMode::Ca => "",
            CacheMode::Cg => "cg",
            CacheMode::Cs => "cs",
            CacheMode::Cv => "cv",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum SvSemantic {
    Position,
    Face,
    SampleIndex,
    SamplePos,
    SampleMask,
    InvocationId,
    ThreadId,
    CtaId,
    NtId,
    GridId,
    NctaId,
    LaneId,
    PhysId,
    ClockLo,
    VertexId,
    InstanceId,
    PrimitiveId,
    Layer,
    ViewportIndex,
    PointCoord,
    Clip,
    TessOuter,
    TessInner,
    TessCoord,
    BaseVertex,
    BaseInstance,
    DrawId,
    WorkDim,
    Undefined,
}

impl SvSemantic {
    pub fn name(self) -> &'static str {
        match self {
            SvSemantic::Position => "POSITION",
            SvSemantic::Face => "FACE",
            SvSemantic::SampleIndex => "SAMPLE_INDEX",
            SvSemantic::SamplePos => "SAMPLE_POS",
            SvSemantic::SampleMask => "SAMPLE_MASK",
            SvSemantic::InvocationId => "INVOCATION_ID",
            SvSemantic::ThreadId => "TID",
            SvSemantic::CtaId => "CTAID",
            SvSemantic::NtId => "NTID",
            SvSemantic::GridId => "GRIDID",
            SvSemantic::NctaId => "NCTAID",
            SvSemantic::LaneId => "LANEID",
            SvSemantic::PhysId => "PHYSID",
            SvSemantic::ClockLo => "CLOCK",
            SvSemantic::VertexId => "VERTEX_ID",
            SvSemantic::InstanceId => "INSTANCE_ID",
            SvSemantic::PrimitiveId => "PRIMITIVE_ID",
            SvSemantic::Layer => "LAYER",
            SvSemantic::ViewportIndex => "VIEWPORT_INDEX",
            SvSemantic::PointCoord => "POINT_COORD",
            SvSemantic::Clip => "CLIP",
            SvSemantic::TessOuter => "TESS_OUTER",
            SvSemantic::TessInner => "TESS_INNER",
            SvSemantic::TessCoord => "TESS_COORD",
            SvSemantic::BaseVertex => "BASEVERTEX",
            SvSemantic::BaseInstance => "BASEINSTANCE",
            SvSemantic::DrawId => "DRAWID",
            SvSemantic::WorkDim => "WORK_DIM",
            SvSemantic::Undefined => "UNDEFINED",
        }
    }
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ProgramType {
    Vertex,
    TessellationControl,
    TessellationEval,
    Geometry,
    Fragment,
    Compute,
}

#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum TexTarget {
    T1D,
    T2D,
    T2DMs,
    T3D,
    Cube,
    T1DShadow,
    T2DShadow,
    CubeShadow,
    T1DArray,
    T2DArray,
    T2DMsArray,
    CubeArray,
    T1DArrayShadow,
    T2DArrayShadow,
    Rect,
    RectShadow,
    CubeArrayShadow,
    Buffer,
}

pub struct TexTargetDesc {
    pub name: &'static str,
    pub dim: u8,
    pub argc: u8,
    pub array: bool,
    pub cube: bool,
    pub shadow: bool,
}

const fn desc(
    name: &'static str,
    dim: u8,
    argc: u8,
    array: bool,
    cube: bool,
    shadow: bool,
) -> TexTargetDesc {
    TexTargetDesc {
        name,
        dim,
        argc,
        array,
        cube,
        shadow,
    }
}

static TEX_TARGETS: [TexTargetDesc; 18] = [
    desc("1D", 1, 1, false, false, false),
    desc("2D", 2, 2, false, false, false),
    desc("2D_MS", 2, 3, false, false, false),
    desc("3D", 3, 3, false, false, false),
    desc("CUBE", 2, 3, false, true, false),
    desc("1D_SHADOW", 1, 1, false, false, true),
    desc("2D_SHADOW", 2, 2, false, false, true),
    desc("CUBE_SHADOW", 2, 3, false, true, true),
    desc("1D_ARRAY", 1, 2, true, false, false),
    desc("2D_ARRAY", 2, 3, true, false, false),
    desc("2D_MS_ARRAY", 2, 4, true, false, false),
    desc("CUBE_ARRAY", 2, 4, true, true, false),
    desc("1D_ARRAY_SHADOW", 1, 2, true, false, true),
    desc("2D_ARRAY_SHADOW", 2, 3, true, false, true),
    desc("RECT", 2, 2, false, false, false),
    desc("RECT_SHADOW", 2, 2, false, false, true),
    desc("CUBE_ARRAY_SHADOW", 2, 4, true, true, true),
    desc("BUFFER", 1, 1, false, false, false),
];

impl TexTarget {
    pub fn desc(self) -> &'static TexTargetDesc {
        &TEX_TARGETS[u8::from(self) as usize]
    }

    pub fn name(self) -> &'static str {
        self.desc().name
    }

    pub fn dim(self) -> u8 {
        self.desc().dim
    }

    pub fn arg_count(self) -> u8 {
        self.desc().argc
    }

    pub fn is_array(self) -> bool {
        self.desc().array
    }

    pub fn is_cube(self) -> bool {
        self.desc().cube
    }

    pub fn is_shadow(self) -> bool {
        self.desc().shadow
    }

    pub fn is_ms(self) -> bool {
        self == TexTarget::T2DMs || self == TexTarget::T2DMsArray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_and_ranges() {
        assert_eq!("ld", Operation::Load.name());
        assert_eq!("set and", Operation::SetAnd.name());
        assert!(Operation::Txd.is_texture());
        assert!(!Operation::SuLdB.is_texture());
        assert!(Operation::Join.is_flow());
        assert!(Operation::Exit.is_flow());
        assert!(!Operation::Membar.is_flow());
        assert_eq!(Operation::Nop, Operation::try_from(0u8).unwrap());
        assert!(Operation::try_from(250u8).is_err());
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(4, DataType::F32.size());
        assert_eq!(8, DataType::S64.size());
        assert_eq!(DataType::S16, DataType::of_size(2, false, true));
        assert_eq!(DataType::F64, DataType::of_size(8, true, true));
        assert!(DataType::F16.is_signed());
        assert!(!DataType::F16.is_signed_int());
    }

    #[test]
    fn test_cond_code_reverse_and_inverse() {
        assert_eq!(CondCode::Gt, CondCode::Lt.reverse());
        assert_eq!(CondCode::Geu, CondCode::Leu.reverse());
        assert_eq!(CondCode::Eq, CondCode::Eq.reverse());
        assert_eq!(Some(CondCode::Geu), CondCode::Lt.inverse());
        assert_eq!(Some(CondCode::Ne), CondCode::Equ.inverse());
        assert_eq!(Some(CondCode::Fl), CondCode::Tr.inverse());
        assert_eq!(None, CondCode::Always.inverse());
    }

    #[test]
    fn test_tex_target_table() {
        assert_eq!("CUBE_ARRAY", TexTarget::CubeArray.name());
        assert_eq!(4, TexTarget::CubeArray.arg_count());
        assert!(TexTarget::CubeArrayShadow.is_shadow());
        assert!(TexTarget::T2DMsArray.is_ms());
        assert_eq!(3, TexTarget::T3D.dim());
        assert_eq!("BUFFER", TexTarget::Buffer.name());
    }
}
