use std::fmt;

use crate::{EdgeKind, NodeId, Slot};

pub type Result<T> = std::result::Result<T, Error>;

/// What a failed port lookup was looking for.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PortQuery {
    Neighbor(NodeId),
    Index(u32),
    /// The node kind has no such port at all.
    Missing,
    /// The node belongs to a different graph, or to none.
    Foreign,
}

impl fmt::Display for PortQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Neighbor(node) => write!(f, "connected to {node}"),
            Self::Index(idx) => write!(f, "at index {idx}"),
            Self::Missing => f.write_str("of that kind"),
            Self::Foreign => f.write_str("in this graph"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum LoopDefect {
    MissingHead,
    HeadNotMember,
    MissingLatch,
    LatchNotMember(NodeId),
    /// More than one back edge, and nobody decided to merge them.
    AmbiguousLatches(usize),
    /// The header needs exactly one edge from outside the loop.
    EntryCount(usize),
    FanIn { expected: usize, found: usize },
}

impl fmt::Display for LoopDefect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingHead => f.write_str("no head"),
            Self::HeadNotMember => f.write_str("head is not one of the loop's blocks"),
            Self::MissingLatch => f.write_str("no latch"),
            Self::LatchNotMember(node) => write!(f, "latch {node} is not one of the loop's blocks"),
            Self::AmbiguousLatches(count) => write!(f, "{count} unmerged latches"),
            Self::EntryCount(count) => write!(f, "{count} entry edges into the head"),
            Self::FanIn { expected, found } => {
                write!(f, "head fan-in is {found}, expected {expected}")
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum Error {
    /// Recoverable: treat as "not found".
    #[error("{node} has no {slot} port {query}")]
    InvalidPortReference { node: NodeId, slot: Slot, query: PortQuery },

    #[error("malformed {kind:?} edge {src} -> {dst}: {reason}")]
    MalformedEdge { kind: EdgeKind, src: NodeId, dst: NodeId, reason: &'static str },

    #[error("unresolved loop {node}: {defect}")]
    UnresolvedLoopStructure { node: NodeId, defect: LoopDefect },

    #[error("memory access {node} is not bound to a memory unit")]
    UnboundMemoryAccess { node: NodeId },

    #[error("{node} can fire without being activated by its block {block}")]
    Unactivated { node: NodeId, block: NodeId },

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
}
