use std::fmt;

use crate::NodeId;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum EdgeKind {
    Data,
    Control,
    DataToControl,
    ControlToData,
    /// Predecessor selection from a block to its members.
    Mask,
    /// Ordering only, carries no payload (e.g. a store that has to finish before an aliasing load).
    Dependency,
    MemoryRead,
    MemoryWrite,
    MemoryToData,
    MemoryToControl,
}

impl EdgeKind {
    pub const ALL: [Self; 10] = [
        Self::Data,
        Self::Control,
        Self::DataToControl,
        Self::ControlToData,
        Self::Mask,
        Self::Dependency,
        Self::MemoryRead,
        Self::MemoryWrite,
        Self::MemoryToData,
        Self::MemoryToControl,
    ];

    /// The port lists this kind of edge lands in, `(on the source, on the target)`.
    #[must_use]
    pub const fn slots(self) -> (Slot, Slot) {
        match self {
            Self::Data => (Slot::DataOutput, Slot::DataInput),
            Self::Control => (Slot::ControlOutput, Slot::ControlInput),
            Self::DataToControl => (Slot::DataOutput, Slot::ControlInput),
            Self::ControlToData => (Slot::ControlOutput, Slot::DataInput),
            Self::Mask | Self::Dependency => (Slot::DependencyOutput, Slot::DependencyInput),
            Self::MemoryRead => (Slot::MemoryRequest, Slot::ReadRequest),
            Self::MemoryWrite => (Slot::MemoryRequest, Slot::WriteRequest),
            Self::MemoryToData => (Slot::ReadResponse, Slot::MemoryResponse),
            Self::MemoryToControl => (Slot::WriteResponse, Slot::MemoryResponse),
        }
    }
}

/// One ordered port list on a node.
///
/// Every slot is only ever written from one side of an edge, outputs and responses from the
/// source, inputs and requests from the target. The exceptions are the memory slots on an
/// accessing node: its request goes *out* to the memory unit and its response comes back *in*.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Slot {
    DataInput,
    DataOutput,
    ControlInput,
    ControlOutput,
    DependencyInput,
    DependencyOutput,
    /// On a load or store, towards its memory unit.
    MemoryRequest,
    /// On a load or store, from its memory unit.
    MemoryResponse,
    ReadRequest,
    ReadResponse,
    WriteRequest,
    WriteResponse,
}

impl Slot {
    pub const ALL: [Self; 12] = [
        Self::DataInput,
        Self::DataOutput,
        Self::ControlInput,
        Self::ControlOutput,
        Self::DependencyInput,
        Self::DependencyOutput,
        Self::MemoryRequest,
        Self::MemoryResponse,
        Self::ReadRequest,
        Self::ReadResponse,
        Self::WriteRequest,
        Self::WriteResponse,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataInput => "data_in",
            Self::DataOutput => "data_out",
            Self::ControlInput => "ctrl_in",
            Self::ControlOutput => "ctrl_out",
            Self::DependencyInput => "dep_in",
            Self::DependencyOutput => "dep_out",
            Self::MemoryRequest => "mem_req",
            Self::MemoryResponse => "mem_resp",
            Self::ReadRequest => "read_req",
            Self::ReadResponse => "read_resp",
            Self::WriteRequest => "write_req",
            Self::WriteResponse => "write_resp",
        }
    }

    /// Whether entries in this slot are written when the owner is an edge's source.
    #[must_use]
    pub const fn is_source_side(self) -> bool {
        matches!(
            self,
            Self::DataOutput
                | Self::ControlOutput
                | Self::DependencyOutput
                | Self::MemoryRequest
                | Self::ReadResponse
                | Self::WriteResponse
        )
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed connection, endpoints are owned by the graph.
///
/// `src_port`/`dst_port` are the positions of the opposite endpoint in the respective port lists.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Edge {
    pub kind: EdgeKind,
    pub src: NodeId,
    pub dst: NodeId,
    pub src_port: u32,
    pub dst_port: u32,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (src_slot, dst_slot) = self.kind.slots();
        write!(
            f,
            "{:?}: {}.{src_slot}[{}] -> {}.{dst_slot}[{}]",
            self.kind, self.src, self.src_port, self.dst, self.dst_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{EdgeKind, Slot};

    #[test]
    fn slots_sit_on_the_right_side() {
        for kind in EdgeKind::ALL {
            let (src, dst) = kind.slots();
            assert!(src.is_source_side(), "{kind:?} source lands in {src}");
            assert!(!dst.is_source_side(), "{kind:?} target lands in {dst}");
        }
    }

    #[test]
    fn every_slot_is_reachable() {
        for slot in Slot::ALL {
            let used = EdgeKind::ALL.iter().any(|kind| {
                let (src, dst) = kind.slots();
                src == slot || dst == slot
            });

            assert!(used, "no edge kind lands in {slot}");
        }
    }
}
