use weft_ir::{BlockId, Value};

use crate::{NodeId, Region};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum AccessKind {
    Load,
    Store,
}

/// One load or store, as shown to a [`Disambiguator`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Access {
    pub kind: AccessKind,
    /// The load or store node.
    pub node: NodeId,
    pub block: BlockId,
    /// Position in `block`'s instructions.
    pub index: usize,
    pub addr: Value,
}

/// Decides which memory unit serves an access, and which pairs of accesses need ordering.
///
/// Lowering never computes aliasing itself.
pub trait Disambiguator {
    /// The region `access` goes through, `None` leaves it to [`Options::default_memory`].
    ///
    /// [`Options::default_memory`]: super::Options::default_memory
    fn region(&mut self, access: &Access) -> Option<Region>;

    /// Whether `later` may touch memory that `earlier` touched.
    ///
    /// Only asked about pairs in program order with at least one store among them.
    fn may_alias(&mut self, earlier: &Access, later: &Access) -> bool;
}

/// All memory is one region, and everything may alias.
#[derive(Debug, Default, Copy, Clone)]
pub struct SingleRegion;

impl Disambiguator for SingleRegion {
    fn region(&mut self, _access: &Access) -> Option<Region> {
        Some(Region(0))
    }

    fn may_alias(&mut self, _earlier: &Access, _later: &Access) -> bool {
        true
    }
}

/// All memory is one region, and nothing aliases.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoAlias;

impl Disambiguator for NoAlias {
    fn region(&mut self, _access: &Access) -> Option<Region> {
        Some(Region(0))
    }

    fn may_alias(&mut self, _earlier: &Access, _later: &Access) -> bool {
        false
    }
}
