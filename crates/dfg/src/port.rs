use crate::error::PortQuery;
use crate::{Error, NodeId, Result, Slot};

/// An ordered list of neighbors, a neighbor's position is the port index.
///
/// The same neighbor may show up more than once (`add %x, %x`), lookups by identity always
/// answer with the first entry.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct PortList(Vec<NodeId>);

impl PortList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<NodeId> {
        self.0.get(index as usize).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn find(&self, node: NodeId) -> Option<usize> {
        self.0.iter().position(|it| *it == node)
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.find(node).is_some()
    }

    fn push(&mut self, node: NodeId) -> u32 {
        let idx = self.0.len() as u32;
        self.0.push(node);
        idx
    }

    fn remove_at(&mut self, index: u32) -> Option<NodeId> {
        ((index as usize) < self.0.len()).then(|| self.0.remove(index as usize))
    }
}

/// All the port lists of one node, grouped by channel.
///
/// Which slots a node may use at all depends on its kind, see
/// [`Node::accepts`](crate::Node::accepts).
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Ports {
    data_input: PortList,
    data_output: PortList,
    control_input: PortList,
    control_output: PortList,
    dependency_input: PortList,
    dependency_output: PortList,
    memory_request: PortList,
    memory_response: PortList,
    read_request: PortList,
    read_response: PortList,
    write_request: PortList,
    write_response: PortList,
}

impl Ports {
    #[must_use]
    pub fn get(&self, slot: Slot) -> &PortList {
        match slot {
            Slot::DataInput => &self.data_input,
            Slot::DataOutput => &self.data_output,
            Slot::ControlInput => &self.control_input,
            Slot::ControlOutput => &self.control_output,
            Slot::DependencyInput => &self.dependency_input,
            Slot::DependencyOutput => &self.dependency_output,
            Slot::MemoryRequest => &self.memory_request,
            Slot::MemoryResponse => &self.memory_response,
            Slot::ReadRequest => &self.read_request,
            Slot::ReadResponse => &self.read_response,
            Slot::WriteRequest => &self.write_request,
            Slot::WriteResponse => &self.write_response,
        }
    }

    fn get_mut(&mut self, slot: Slot) -> &mut PortList {
        match slot {
            Slot::DataInput => &mut self.data_input,
            Slot::DataOutput => &mut self.data_output,
            Slot::ControlInput => &mut self.control_input,
            Slot::ControlOutput => &mut self.control_output,
            Slot::DependencyInput => &mut self.dependency_input,
            Slot::DependencyOutput => &mut self.dependency_output,
            Slot::MemoryRequest => &mut self.memory_request,
            Slot::MemoryResponse => &mut self.memory_response,
            Slot::ReadRequest => &mut self.read_request,
            Slot::ReadResponse => &mut self.read_response,
            Slot::WriteRequest => &mut self.write_request,
            Slot::WriteResponse => &mut self.write_response,
        }
    }

    /// Appends `node` to `slot`, returning its port index.
    ///
    /// Only the graph builder may call this, it keeps edges and ports in sync.
    pub(crate) fn add_port(&mut self, slot: Slot, node: NodeId) -> u32 {
        self.get_mut(slot).push(node)
    }

    pub(crate) fn remove_port_at(&mut self, slot: Slot, index: u32) -> Option<NodeId> {
        self.get_mut(slot).remove_at(index)
    }

    #[must_use]
    pub fn find(&self, slot: Slot, node: NodeId) -> Option<usize> {
        self.get(slot).find(node)
    }

    #[must_use]
    pub fn len(&self, slot: Slot) -> usize {
        self.get(slot).len()
    }

    /// Total number of port entries across every slot.
    #[must_use]
    pub fn total(&self) -> usize {
        Slot::ALL.iter().map(|slot| self.len(*slot)).sum()
    }

    /// The stable, zero based port index of `node` in `slot`.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `node` isn't connected through `slot`.
    pub fn port_index(&self, owner: NodeId, slot: Slot, node: NodeId) -> Result<u32> {
        self.find(slot, node).map(|it| it as u32).ok_or(Error::InvalidPortReference {
            node: owner,
            slot,
            query: PortQuery::Neighbor(node),
        })
    }

    #[must_use]
    pub fn data_inputs(&self) -> &[NodeId] {
        self.data_input.as_slice()
    }

    #[must_use]
    pub fn data_outputs(&self) -> &[NodeId] {
        self.data_output.as_slice()
    }

    #[must_use]
    pub fn control_inputs(&self) -> &[NodeId] {
        self.control_input.as_slice()
    }

    #[must_use]
    pub fn control_outputs(&self) -> &[NodeId] {
        self.control_output.as_slice()
    }

    #[must_use]
    pub fn dependency_inputs(&self) -> &[NodeId] {
        self.dependency_input.as_slice()
    }

    #[must_use]
    pub fn dependency_outputs(&self) -> &[NodeId] {
        self.dependency_output.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::Ports;
    use crate::error::PortQuery;
    use crate::{Error, NodeId, Slot};

    #[test]
    fn index_lookup_is_first_match() {
        let mut ports = Ports::default();
        let owner = NodeId(0);

        assert_eq!(ports.add_port(Slot::DataInput, NodeId(4)), 0);
        assert_eq!(ports.add_port(Slot::DataInput, NodeId(5)), 1);
        assert_eq!(ports.add_port(Slot::DataInput, NodeId(4)), 2);

        assert_eq!(ports.port_index(owner, Slot::DataInput, NodeId(4)), Ok(0));
        assert_eq!(ports.port_index(owner, Slot::DataInput, NodeId(5)), Ok(1));

        // asking twice doesn't change anything.
        assert_eq!(ports.port_index(owner, Slot::DataInput, NodeId(5)), Ok(1));

        assert_eq!(
            ports.port_index(owner, Slot::ControlInput, NodeId(4)),
            Err(Error::InvalidPortReference {
                node: owner,
                slot: Slot::ControlInput,
                query: PortQuery::Neighbor(NodeId(4))
            })
        );
    }

    #[test]
    fn removal_shifts_later_ports() {
        let mut ports = Ports::default();

        ports.add_port(Slot::ControlOutput, NodeId(1));
        ports.add_port(Slot::ControlOutput, NodeId(2));

        assert_eq!(ports.remove_port_at(Slot::ControlOutput, 0), Some(NodeId(1)));
        assert_eq!(ports.remove_port_at(Slot::ControlOutput, 4), None);
        assert_eq!(ports.control_outputs(), [NodeId(2)]);
        assert_eq!(ports.find(Slot::ControlOutput, NodeId(1)), None);
        assert_eq!(ports.total(), 1);
    }
}
