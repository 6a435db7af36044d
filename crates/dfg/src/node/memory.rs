use std::fmt;

/// A logical memory region, as decided by disambiguation.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct Region(pub u32);

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "region{}", self.0)
    }
}

/// The shared access point for one region.
///
/// Each accessing load gets one read request/response pair, each store one write pair.
/// Nothing is ordered here, ordering between accesses is explicit dependency edges.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MemoryNode {
    pub(crate) region: Region,
}

impl MemoryNode {
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }
}

impl fmt::Display for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "memory {}", self.region)
    }
}
