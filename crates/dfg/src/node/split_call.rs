use std::fmt;

use crate::NodeId;

/// An argument-passing boundary, argument `i` is output data port `i`.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SplitCallNode {
    pub(crate) arguments: Vec<NodeId>,
}

impl SplitCallNode {
    #[must_use]
    pub fn arguments(&self) -> &[NodeId] {
        &self.arguments
    }

    #[must_use]
    pub fn argument(&self, index: u32) -> Option<NodeId> {
        self.arguments.get(index as usize).copied()
    }
}

impl fmt::Display for SplitCallNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("split_call [")?;
        for (idx, arg) in self.arguments.iter().enumerate() {
            let sep = if idx == 0 { "" } else { " " };
            write!(f, "{sep}{arg}")?;
        }

        f.write_str("]")
    }
}
