//! The read only view renderers walk to produce output.
//!
//! The graph never produces text itself, a [`Dialect`] turns node definitions and resolved
//! port references into whatever syntax it targets. Every `print_*` method resolves ports with
//! an exhaustive match over the node kind, a request the kind can't satisfy is an
//! [`Error::InvalidPortReference`], as is asking about a node the graph doesn't own.

use std::fmt;

use crate::error::PortQuery;
use crate::{Error, Graph, InstOp, Node, NodeId, NodeKind, Result, Slot};

#[cfg(test)]
mod tests;

/// The output format a renderer targets.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum DialectKind {
    Scala,
    Dot,
    Json,
}

/// One port, as a renderer sees it.
///
/// Indices are zero based and stable for the lifetime of the graph.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub slot: Slot,
    pub index: u32,
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.node, self.slot, self.index)
    }
}

/// A renderer for one output format.
///
/// Takes `&self` so that several renderers can walk the same graph at once.
pub trait Dialect {
    fn kind(&self) -> DialectKind;

    /// Declares `node`, the identifier used must be unique within the graph.
    fn definition(&self, graph: &Graph, node: &Node) -> String;

    fn port(&self, graph: &Graph, port: PortRef) -> String;

    /// Joins multiple rendered ports.
    fn list(&self, ports: Vec<String>) -> String {
        ports.join(", ")
    }
}

/// A neutral form for debugging, ports are rendered as `name.slot[index]`.
///
/// Renders the same text whichever kind it's tagged as.
#[derive(Debug, Copy, Clone)]
pub struct Text(pub DialectKind);

impl Default for Text {
    fn default() -> Self {
        Self(DialectKind::Scala)
    }
}

impl Dialect for Text {
    fn kind(&self) -> DialectKind {
        self.0
    }

    fn definition(&self, graph: &Graph, node: &Node) -> String {
        let name = node.name();
        match node.kind() {
            NodeKind::Super(it) => format!("{name} = block {} {}", it.block(), it.ty()),
            NodeKind::Loop(it) => {
                let head = it.head().map_or("?", |head| graph.node(head).name());
                format!("{name} = loop head={head} blocks={}", it.blocks().len())
            }
            NodeKind::Instruction(it) => match it.op() {
                InstOp::Alloca { ty, count } => format!("{name} = alloca {ty} x {count}"),
                InstOp::Load { ty, .. } => format!("{name} = load {ty}"),
                InstOp::Sext(ty) | InstOp::Zext(ty) | InstOp::BitCast(ty) | InstOp::Trunc(ty) => {
                    format!("{name} = {} to {ty}", it.opcode_name())
                }
                InstOp::Icmp(pred) => format!("{name} = icmp {pred}"),
                InstOp::Call { callee, .. } => format!("{name} = call {callee}"),
                _ => format!("{name} = {}", it.opcode_name()),
            },
            NodeKind::Argument(it) => format!("{name} = argument {}", it.index),
            NodeKind::GlobalValue(it) => format!("{name} = global {}", it.symbol),
            NodeKind::ConstInt(it) => format!("{name} = const {}", it.value),
            NodeKind::Memory(it) => format!("{name} = memory {}", it.region()),
            NodeKind::SplitCall(it) => format!("{name} = split {}", it.arguments().len()),
        }
    }

    fn port(&self, graph: &Graph, port: PortRef) -> String {
        format!("{}.{}[{}]", graph.node(port.node).name(), port.slot, port.index)
    }
}

fn missing(node: NodeId, slot: Slot) -> Error {
    Error::InvalidPortReference { node, slot, query: PortQuery::Missing }
}

/// Every port of `node` in `slot`.
fn ports_of(node: &Node, slot: Slot) -> Vec<PortRef> {
    let len = node.ports().len(slot) as u32;
    (0..len).map(|index| PortRef { node: node.id(), slot, index }).collect()
}

fn select(
    ports: Vec<PortRef>,
    node: NodeId,
    slot: Slot,
    index: Option<u32>,
) -> Result<Vec<PortRef>> {
    match index {
        None => Ok(ports),
        Some(index) => match ports.get(index as usize) {
            Some(port) => Ok(vec![*port]),
            None => Err(Error::InvalidPortReference { node, slot, query: PortQuery::Index(index) }),
        },
    }
}

impl Graph {
    fn lookup(&self, id: NodeId, slot: Slot) -> Result<&Node> {
        let query = PortQuery::Foreign;
        self.get(id).ok_or(Error::InvalidPortReference { node: id, slot, query })
    }

    fn render(&self, dialect: &dyn Dialect, ports: Vec<PortRef>) -> String {
        dialect.list(ports.into_iter().map(|port| dialect.port(self, port)).collect())
    }

    fn latch_branches(&self, node: &Node) -> Vec<NodeId> {
        let Some(lp) = node.as_loop() else {
            return Vec::new();
        };

        lp.latches()
            .iter()
            .filter_map(|latch| self.node(*latch).as_super())
            .filter_map(|latch| latch.instructions().last().copied())
            .collect()
    }

    /// `None` if `id` isn't a node of this graph.
    #[must_use]
    pub fn print_definition(&self, id: NodeId, dialect: &dyn Dialect) -> Option<String> {
        self.get(id).map(|node| dialect.definition(self, node))
    }

    /// The control tokens `id` waits on.
    ///
    /// For a loop that's its head's inputs, the entry and every back edge.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` has no control inputs, or if `index` is out of
    /// range.
    pub fn print_input_enable(
        &self,
        id: NodeId,
        index: Option<u32>,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let slot = Slot::ControlInput;
        let node = self.lookup(id, slot)?;

        let ports = match node.kind() {
            NodeKind::Super(_) | NodeKind::Instruction(_) | NodeKind::SplitCall(_) => {
                ports_of(node, slot)
            }
            NodeKind::Loop(it) => match it.head() {
                Some(head) => ports_of(self.node(head), slot),
                None => return Err(missing(id, slot)),
            },
            NodeKind::Argument(_)
            | NodeKind::GlobalValue(_)
            | NodeKind::ConstInt(_)
            | NodeKind::Memory(_) => return Err(missing(id, slot)),
        };

        Ok(self.render(dialect, select(ports, id, slot, index)?))
    }

    /// The control tokens `id` fires.
    ///
    /// For a loop that's its latches' decisions.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` has no control outputs, or if `index` is out of
    /// range.
    pub fn print_output_enable(
        &self,
        id: NodeId,
        index: Option<u32>,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let slot = Slot::ControlOutput;
        let node = self.lookup(id, slot)?;

        let ports = match node.kind() {
            NodeKind::Super(_) | NodeKind::SplitCall(_) => ports_of(node, slot),
            NodeKind::Instruction(it) if it.accepts(slot) => ports_of(node, slot),
            NodeKind::Loop(_) => {
                let branches = self.latch_branches(node);
                if branches.is_empty() {
                    return Err(missing(id, slot));
                }

                branches.into_iter().flat_map(|it| ports_of(self.node(it), slot)).collect()
            }
            NodeKind::Instruction(_)
            | NodeKind::Argument(_)
            | NodeKind::GlobalValue(_)
            | NodeKind::ConstInt(_)
            | NodeKind::Memory(_) => return Err(missing(id, slot)),
        };

        Ok(self.render(dialect, select(ports, id, slot, index)?))
    }

    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` takes no data, or if `index` is out of range.
    pub fn print_input_data(
        &self,
        id: NodeId,
        index: Option<u32>,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let slot = Slot::DataInput;
        let node = self.lookup(id, slot)?;

        let ports = match node.kind() {
            NodeKind::Super(_) => ports_of(node, slot),
            NodeKind::Instruction(it) if it.accepts(slot) => ports_of(node, slot),
            NodeKind::Instruction(_)
            | NodeKind::Loop(_)
            | NodeKind::Argument(_)
            | NodeKind::GlobalValue(_)
            | NodeKind::ConstInt(_)
            | NodeKind::Memory(_)
            | NodeKind::SplitCall(_) => return Err(missing(id, slot)),
        };

        Ok(self.render(dialect, select(ports, id, slot, index)?))
    }

    /// The values `id` produces.
    ///
    /// A split call's output `i` is its argument `i`, whether or not anything consumes it.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` produces no data, or if `index` is out of range.
    pub fn print_output_data(
        &self,
        id: NodeId,
        index: Option<u32>,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let slot = Slot::DataOutput;
        let node = self.lookup(id, slot)?;

        let ports = match node.kind() {
            NodeKind::Argument(_) | NodeKind::GlobalValue(_) | NodeKind::ConstInt(_) => {
                ports_of(node, slot)
            }
            NodeKind::Instruction(it) if it.accepts(slot) => ports_of(node, slot),
            NodeKind::SplitCall(it) => (0..it.arguments().len() as u32)
                .map(|index| PortRef { node: id, slot, index })
                .collect(),
            NodeKind::Instruction(_)
            | NodeKind::Super(_)
            | NodeKind::Loop(_)
            | NodeKind::Memory(_) => return Err(missing(id, slot)),
        };

        Ok(self.render(dialect, select(ports, id, slot, index)?))
    }

    /// The mask selecting a phi's live input.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` isn't a phi, or its mask isn't connected.
    pub fn print_mask_input(&self, id: NodeId, dialect: &dyn Dialect) -> Result<String> {
        let slot = Slot::DependencyInput;
        let node = self.lookup(id, slot)?;

        let mask = match node.kind() {
            NodeKind::Instruction(it) => it.mask().ok_or_else(|| missing(id, slot))?,
            NodeKind::Super(_)
            | NodeKind::Loop(_)
            | NodeKind::Argument(_)
            | NodeKind::GlobalValue(_)
            | NodeKind::ConstInt(_)
            | NodeKind::Memory(_)
            | NodeKind::SplitCall(_) => return Err(missing(id, slot)),
        };

        let index = node.ports().port_index(id, slot, mask)?;
        Ok(dialect.port(self, PortRef { node: id, slot, index }))
    }

    /// The masks a block hands to its members.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` isn't a block, or if `index` is out of range.
    pub fn print_mask_output(
        &self,
        id: NodeId,
        index: Option<u32>,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let slot = Slot::DependencyOutput;
        let node = self.lookup(id, slot)?;

        if node.as_super().is_none() {
            return Err(missing(id, slot));
        }

        Ok(self.render(dialect, select(ports_of(node, slot), id, slot, index)?))
    }

    /// The control input that activates a block.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `id` isn't a block.
    pub fn print_activate_enable(&self, id: NodeId, dialect: &dyn Dialect) -> Result<String> {
        let slot = Slot::ControlInput;
        let node = self.lookup(id, slot)?;

        let Some(activate) = node.as_super().and_then(|it| it.activate_input()) else {
            return Err(missing(id, slot));
        };

        let index = node.ports().port_index(id, slot, activate)?;
        Ok(dialect.port(self, PortRef { node: id, slot, index }))
    }

    /// Every definition followed by every edge, one per line.
    #[must_use]
    pub fn emit(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();

        for node in self.nodes() {
            out.push_str(&dialect.definition(self, node));
            out.push('\n');
        }

        for edge in self.edges() {
            let (src_slot, dst_slot) = edge.kind.slots();
            let src = PortRef { node: edge.src, slot: src_slot, index: edge.src_port };
            let dst = PortRef { node: edge.dst, slot: dst_slot, index: edge.dst_port };

            out.push_str(&dialect.port(self, src));
            out.push_str(" -> ");
            out.push_str(&dialect.port(self, dst));
            out.push('\n');
        }

        out
    }
}
