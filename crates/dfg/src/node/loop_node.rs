use std::fmt;

use crate::NodeId;

/// The blocks and instructions of one natural loop.
///
/// A loop has no ports of its own, its entry is its head's control input and its exit is its
/// latch's branch.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct LoopNode {
    pub(crate) head: Option<NodeId>,
    pub(crate) latches: Vec<NodeId>,
    pub(crate) blocks: Vec<NodeId>,
    pub(crate) instructions: Vec<NodeId>,
    /// Set once multiple back edges have explicitly been accepted as a fan-in on the head.
    pub(crate) latches_merged: bool,
}

impl LoopNode {
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// The single latch.
    ///
    /// `None` if there is no latch, or if there's more than one.
    #[must_use]
    pub fn latch(&self) -> Option<NodeId> {
        match self.latches.as_slice() {
            [latch] => Some(*latch),
            _ => None,
        }
    }

    #[must_use]
    pub fn latches(&self) -> &[NodeId] {
        &self.latches
    }

    #[must_use]
    pub fn latches_merged(&self) -> bool {
        self.latches_merged
    }

    #[must_use]
    pub fn blocks(&self) -> &[NodeId] {
        &self.blocks
    }

    #[must_use]
    pub fn instructions(&self) -> &[NodeId] {
        &self.instructions
    }

    #[must_use]
    pub fn contains_block(&self, block: NodeId) -> bool {
        self.blocks.contains(&block)
    }
}

impl fmt::Display for LoopNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("loop")?;

        if let Some(head) = self.head {
            write!(f, " head={head}")?;
        }

        f.write_str(" latches=[")?;
        for (idx, latch) in self.latches.iter().enumerate() {
            let sep = if idx == 0 { "" } else { " " };
            write!(f, "{sep}{latch}")?;
        }

        f.write_str("] blocks=[")?;
        for (idx, block) in self.blocks.iter().enumerate() {
            let sep = if idx == 0 { "" } else { " " };
            write!(f, "{sep}{block}")?;
        }

        f.write_str("]")?;

        if self.latches_merged {
            f.write_str(" merged")?;
        }

        Ok(())
    }
}
