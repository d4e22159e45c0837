pub mod arena;
pub mod block;
pub mod clone;
mod display;
mod dominator;
mod dot;
pub mod error;
pub mod flags;
pub mod function;
pub mod instruction;
pub mod modifier;
pub mod opt;
pub mod pass;
pub mod program;
pub mod types;
pub mod value;


pub use ssair_graph::{Edge, EdgeKind, Graph, NodeId};

pub use crate::block::{BasicBlock, BlockId};
pub use crate::clone::CloneContext;
pub use crate::error::IrError;
pub use crate::flags::{DebugFlags, Flags};
pub use crate::function::{Function, FunctionId};
pub use crate::instruction::{FlowTarget, InsnId, InsnKind, Instruction};
pub use crate::modifier::Modifier;
pub use crate::pass::Pass;
pub use crate::program::{GenericTarget, Program, Target};
pub use crate::types::{CondCode, DataFile, DataType, Operation, ProgramType, TexTarget};
pub use crate::value::{Immediate, ValueId, ValueRef};
