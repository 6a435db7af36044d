use std::fmt;

use weft_ir::GlobalId;
use weft_ir::ty::Int;

use crate::{NodeId, Ports, Result, Slot, Uid};

mod instruction;
mod loop_node;
mod memory;
mod split_call;
mod super_node;

pub use instruction::{InstOp, InstType, InstructionNode};
pub use loop_node::LoopNode;
pub use memory::{MemoryNode, Region};
pub use split_call::SplitCallNode;
pub use super_node::{SuperNode, SuperNodeType};

/// The closed set of node kinds, fixed when a node is created.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum NodeType {
    SuperNode,
    LoopNode,
    Instruction,
    FunctionArgument,
    GlobalValue,
    ConstantInt,
    MemoryUnit,
    SplitCall,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NodeInfo {
    pub uid: Uid,
    pub name: String,
}

/// A parameter value, either of the function itself or of a call site.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ArgumentNode {
    /// Position in the owning split's argument list.
    pub index: u32,
    pub split: NodeId,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GlobalValueNode {
    pub global: GlobalId,
    pub symbol: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ConstIntNode {
    pub value: Int,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum NodeKind {
    Super(SuperNode),
    Loop(LoopNode),
    Instruction(InstructionNode),
    Argument(ArgumentNode),
    GlobalValue(GlobalValueNode),
    ConstInt(ConstIntNode),
    Memory(MemoryNode),
    SplitCall(SplitCallNode),
}

impl NodeKind {
    #[must_use]
    pub fn ty(&self) -> NodeType {
        match self {
            Self::Super(_) => NodeType::SuperNode,
            Self::Loop(_) => NodeType::LoopNode,
            Self::Instruction(_) => NodeType::Instruction,
            Self::Argument(_) => NodeType::FunctionArgument,
            Self::GlobalValue(_) => NodeType::GlobalValue,
            Self::ConstInt(_) => NodeType::ConstantInt,
            Self::Memory(_) => NodeType::MemoryUnit,
            Self::SplitCall(_) => NodeType::SplitCall,
        }
    }

    /// Prefix for the node's generated name.
    pub(crate) fn name_prefix(&self) -> &'static str {
        match self {
            Self::Super(_) => "bb",
            Self::Loop(_) => "loop",
            Self::Instruction(it) => it.ty().prefix(),
            Self::Argument(_) => "arg",
            Self::GlobalValue(_) => "global",
            Self::ConstInt(_) => "const",
            Self::Memory(_) => "mem",
            Self::SplitCall(_) => "split_call",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Node {
    id: NodeId,
    info: NodeInfo,
    pub(crate) kind: NodeKind,
    pub(crate) ports: Ports,
}

impl Node {
    pub(crate) fn new(id: NodeId, info: NodeInfo, kind: NodeKind) -> Self {
        Self { id, info, kind, ports: Ports::default() }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.info.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn ty(&self) -> NodeType {
        self.kind.ty()
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Which port lists this kind of node may have entries in.
    #[must_use]
    pub fn accepts(&self, slot: Slot) -> bool {
        match &self.kind {
            NodeKind::Super(_) => matches!(
                slot,
                Slot::ControlInput | Slot::ControlOutput | Slot::DataInput | Slot::DependencyOutput
            ),

            // a loop's ports are its head's and latch's.
            NodeKind::Loop(_) => false,

            NodeKind::Instruction(it) => it.accepts(slot),

            NodeKind::Argument(_) | NodeKind::GlobalValue(_) | NodeKind::ConstInt(_) => {
                slot == Slot::DataOutput
            }

            NodeKind::Memory(_) => matches!(
                slot,
                Slot::ReadRequest | Slot::ReadResponse | Slot::WriteRequest | Slot::WriteResponse
            ),

            NodeKind::SplitCall(_) => matches!(slot, Slot::ControlInput | Slot::ControlOutput),
        }
    }

    /// Position of `node` in `slot`.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`](crate::Error::InvalidPortReference) if it isn't connected.
    pub fn port_index(&self, slot: Slot, node: NodeId) -> Result<u32> {
        self.ports.port_index(self.id, slot, node)
    }

    pub fn data_input_port_index(&self, node: NodeId) -> Result<u32> {
        self.port_index(Slot::DataInput, node)
    }

    pub fn data_output_port_index(&self, node: NodeId) -> Result<u32> {
        self.port_index(Slot::DataOutput, node)
    }

    pub fn control_input_port_index(&self, node: NodeId) -> Result<u32> {
        self.port_index(Slot::ControlInput, node)
    }

    pub fn control_output_port_index(&self, node: NodeId) -> Result<u32> {
        self.port_index(Slot::ControlOutput, node)
    }

    #[must_use]
    pub fn as_super(&self) -> Option<&SuperNode> {
        match &self.kind {
            NodeKind::Super(it) => Some(it),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_loop(&self) -> Option<&LoopNode> {
        match &self.kind {
            NodeKind::Loop(it) => Some(it),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instruction(&self) -> Option<&InstructionNode> {
        match &self.kind {
            NodeKind::Instruction(it) => Some(it),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryNode> {
        match &self.kind {
            NodeKind::Memory(it) => Some(it),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_split_call(&self) -> Option<&SplitCallNode> {
        match &self.kind {
            NodeKind::SplitCall(it) => Some(it),
            _ => None,
        }
    }

    /// Is this an instruction of kind `ty`?
    #[must_use]
    pub fn is(&self, ty: InstType) -> bool {
        self.as_instruction().is_some_and(|it| it.ty() == ty)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Super(it) => fmt::Display::fmt(it, f),
            Self::Loop(it) => fmt::Display::fmt(it, f),
            Self::Instruction(it) => fmt::Display::fmt(it, f),
            Self::Argument(ArgumentNode { index, split }) => write!(f, "arg {index} of {split}"),
            Self::GlobalValue(GlobalValueNode { global, symbol }) => {
                write!(f, "global {global} ({symbol})")
            }
            Self::ConstInt(ConstIntNode { value }) => write!(f, "const {value}"),
            Self::Memory(it) => fmt::Display::fmt(it, f),
            Self::SplitCall(it) => fmt::Display::fmt(it, f),
        }
    }
}
