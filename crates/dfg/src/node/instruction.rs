use std::fmt;

use weft_ir::{BinOp, BlockId, InstId, Predicate, Type};

use crate::{NodeId, Slot};

/// The closed set of instruction kinds.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum InstType {
    Binary,
    Icmp,
    Branch,
    Phi,
    Alloca,
    GetElementPtr,
    Load,
    Store,
    Sext,
    Zext,
    BitCast,
    Trunc,
    Select,
    Return,
    Call,
}

impl InstType {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Binary => "binaryOp",
            Self::Icmp => "icmp",
            Self::Branch => "br",
            Self::Phi => "phi",
            Self::Alloca => "alloca",
            Self::GetElementPtr => "gep",
            Self::Load => "ld",
            Self::Store => "st",
            Self::Sext => "sext",
            Self::Zext => "zext",
            Self::BitCast => "bitcast",
            Self::Trunc => "trunc",
            Self::Select => "select",
            Self::Return => "ret",
            Self::Call => "call",
        }
    }

    #[must_use]
    pub const fn is_memory_access(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }
}

/// Per-kind payload of an instruction node.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InstOp {
    Binary(BinOp),
    Icmp(Predicate),
    /// Control output `i` activates `successors[i]`, in the order the successors were declared.
    Branch { successors: Vec<NodeId> },
    /// Data input `i` is the value live when arriving from `predecessors[i]`.
    Phi { mask: NodeId, predecessors: Vec<BlockId> },
    Alloca { ty: Type, count: u32 },
    Gep,
    Load { ty: Type, memory: Option<NodeId> },
    Store { memory: Option<NodeId> },
    Sext(Type),
    Zext(Type),
    BitCast(Type),
    Trunc(Type),
    Select,
    Return,
    Call { callee: String, split: NodeId },
}

impl InstOp {
    #[must_use]
    pub fn ty(&self) -> InstType {
        match self {
            Self::Binary(_) => InstType::Binary,
            Self::Icmp(_) => InstType::Icmp,
            Self::Branch { .. } => InstType::Branch,
            Self::Phi { .. } => InstType::Phi,
            Self::Alloca { .. } => InstType::Alloca,
            Self::Gep => InstType::GetElementPtr,
            Self::Load { .. } => InstType::Load,
            Self::Store { .. } => InstType::Store,
            Self::Sext(_) => InstType::Sext,
            Self::Zext(_) => InstType::Zext,
            Self::BitCast(_) => InstType::BitCast,
            Self::Trunc(_) => InstType::Trunc,
            Self::Select => InstType::Select,
            Self::Return => InstType::Return,
            Self::Call { .. } => InstType::Call,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InstructionNode {
    pub(crate) op: InstOp,
    /// The super node this instruction is a member of.
    pub(crate) block: NodeId,
    /// The SSA value this node was created for, if it produces one.
    pub(crate) source: Option<InstId>,
}

impl InstructionNode {
    #[must_use]
    pub fn op(&self) -> &InstOp {
        &self.op
    }

    /// The instruction kind, fixed at construction.
    #[must_use]
    pub fn ty(&self) -> InstType {
        self.op.ty()
    }

    #[must_use]
    pub fn block(&self) -> NodeId {
        self.block
    }

    #[must_use]
    pub fn source(&self) -> Option<InstId> {
        self.source
    }

    #[must_use]
    pub fn opcode_name(&self) -> &'static str {
        match &self.op {
            InstOp::Binary(op) => op.as_str(),
            _ => self.ty().prefix(),
        }
    }

    /// The memory unit a load or store is bound to.
    #[must_use]
    pub fn memory(&self) -> Option<NodeId> {
        match self.op {
            InstOp::Load { memory, .. } | InstOp::Store { memory } => memory,
            _ => None,
        }
    }

    /// The block whose activation selects this phi's live input.
    #[must_use]
    pub fn mask(&self) -> Option<NodeId> {
        match self.op {
            InstOp::Phi { mask, .. } => Some(mask),
            _ => None,
        }
    }

    pub(crate) fn set_memory(&mut self, unit: NodeId) {
        match &mut self.op {
            InstOp::Load { memory, .. } | InstOp::Store { memory } => *memory = Some(unit),
            op => unreachable!("{:?} is not a memory access", op.ty()),
        }
    }

    pub(crate) fn accepts(&self, slot: Slot) -> bool {
        let ty = self.ty();
        match slot {
            Slot::DataInput => ty != InstType::Alloca,
            Slot::DataOutput => {
                !matches!(ty, InstType::Branch | InstType::Store | InstType::Return)
            }
            Slot::ControlInput | Slot::DependencyInput => true,
            // memory accesses are sequenced through their dependency ports instead.
            Slot::ControlOutput => matches!(ty, InstType::Branch | InstType::Call),
            Slot::DependencyOutput | Slot::MemoryRequest | Slot::MemoryResponse => {
                ty.is_memory_access()
            }
            Slot::ReadRequest | Slot::ReadResponse | Slot::WriteRequest | Slot::WriteResponse => {
                false
            }
        }
    }
}

impl fmt::Display for InstructionNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.op {
            InstOp::Binary(op) => write!(f, "{op}")?,
            InstOp::Icmp(pred) => write!(f, "icmp {pred}")?,
            InstOp::Branch { successors } => {
                f.write_str("br")?;
                for succ in successors {
                    write!(f, " {succ}")?;
                }
            }
            InstOp::Phi { mask, predecessors } => {
                write!(f, "phi mask={mask} from")?;
                for pred in predecessors {
                    write!(f, " {pred}")?;
                }
            }
            InstOp::Alloca { ty, count } => write!(f, "alloca {ty}, {count}")?,
            InstOp::Gep => f.write_str("gep")?,
            InstOp::Load { ty, memory } => {
                write!(f, "load {ty}")?;
                if let Some(memory) = memory {
                    write!(f, " via {memory}")?;
                }
            }
            InstOp::Store { memory } => {
                f.write_str("store")?;
                if let Some(memory) = memory {
                    write!(f, " via {memory}")?;
                }
            }
            InstOp::Sext(ty) => write!(f, "sext to {ty}")?,
            InstOp::Zext(ty) => write!(f, "zext to {ty}")?,
            InstOp::BitCast(ty) => write!(f, "bitcast to {ty}")?,
            InstOp::Trunc(ty) => write!(f, "trunc to {ty}")?,
            InstOp::Select => f.write_str("select")?,
            InstOp::Return => f.write_str("ret")?,
            InstOp::Call { callee, split } => write!(f, "call {callee} split={split}")?,
        }

        write!(f, " in {}", self.block)
    }
}
