use std::fmt;

use weft_ir::BlockId;

use crate::NodeId;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum SuperNodeType {
    /// Always runs once activated.
    NoMask,
    /// A join, which predecessor activated it is threaded to every member as a mask.
    Mask,
    /// Entered once from outside its loop, then again on every back edge.
    LoopHead,
}

impl fmt::Display for SuperNodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoMask => f.write_str("nomask"),
            Self::Mask => f.write_str("mask"),
            Self::LoopHead => f.write_str("loophead"),
        }
    }
}

/// A basic block's entry into the dataflow graph.
///
/// Control input `i` corresponds to data input `i` of every phi in the block.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SuperNode {
    pub(crate) block: BlockId,
    pub(crate) ty: SuperNodeType,
    pub(crate) activate_input: Option<NodeId>,
    pub(crate) instructions: Vec<NodeId>,
    pub(crate) phis: Vec<NodeId>,
    /// The boolean that decided which way control went into this block, for masked blocks.
    pub(crate) mask_source: Option<NodeId>,
    /// The innermost loop this block belongs to.
    pub(crate) parent_loop: Option<NodeId>,
}

impl SuperNode {
    pub(crate) fn new(block: BlockId, ty: SuperNodeType) -> Self {
        Self {
            block,
            ty,
            activate_input: None,
            instructions: Vec::new(),
            phis: Vec::new(),
            mask_source: None,
            parent_loop: None,
        }
    }

    /// The block this was created for.
    #[must_use]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[must_use]
    pub fn ty(&self) -> SuperNodeType {
        self.ty
    }

    #[must_use]
    pub fn activate_input(&self) -> Option<NodeId> {
        self.activate_input
    }

    /// Ordinary members, in program order, the terminator last.
    #[must_use]
    pub fn instructions(&self) -> &[NodeId] {
        &self.instructions
    }

    #[must_use]
    pub fn phis(&self) -> &[NodeId] {
        &self.phis
    }

    #[must_use]
    pub fn has_phi(&self) -> bool {
        !self.phis.is_empty()
    }

    #[must_use]
    pub fn num_phi(&self) -> usize {
        self.phis.len()
    }

    /// Phis first, then everything else.
    pub fn members(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.phis.iter().chain(&self.instructions).copied()
    }

    #[must_use]
    pub fn mask_source(&self) -> Option<NodeId> {
        self.mask_source
    }

    #[must_use]
    pub fn parent_loop(&self) -> Option<NodeId> {
        self.parent_loop
    }
}

impl fmt::Display for SuperNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "block {} {}", self.block, self.ty)?;

        if let Some(node) = self.activate_input {
            write!(f, " activate={node}")?;
        }

        if let Some(node) = self.mask_source {
            write!(f, " mask={node}")?;
        }

        if let Some(node) = self.parent_loop {
            write!(f, " loop={node}")?;
        }

        Ok(())
    }
}
