use std::fmt;

use weft_ir::ty::Int;
use weft_ir::{BlockId, GlobalId, IdAllocator, InstId};

use crate::error::PortQuery;
use crate::node::{ArgumentNode, ConstIntNode, GlobalValueNode, NodeInfo};
use crate::{
    Edge, EdgeKind, Error, InstOp, InstType, LoopNode, MemoryNode, Node, NodeId, NodeKind,
    NodeType, Region, Result, Slot, SplitCallNode, SuperNode, SuperNodeType, Uid,
};

mod verify;


fn malformed(kind: EdgeKind, src: NodeId, dst: NodeId, reason: &'static str) -> Error {
    Error::MalformedEdge { kind, src, dst, reason }
}

/// A graph under construction.
///
/// This is the only way to add nodes or change ports, once [`finalize`](Self::finalize)d the
/// resulting [`Graph`] is read only.
pub struct GraphBuilder<'a> {
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    entry: NodeId,
    uids: &'a mut IdAllocator<Uid>,
}

impl<'a> GraphBuilder<'a> {
    /// Starts a new graph, with a split call node as the function's entry.
    #[must_use]
    pub fn new(name: impl Into<String>, uids: &'a mut IdAllocator<Uid>) -> Self {
        let mut this = Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: NodeId(0),
            uids,
        };

        this.entry = this.add_split_call();
        this
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let uid = self.uids.allocate();
        let name = format!("{}_{uid}", kind.name_prefix());

        self.nodes.push(Node::new(id, NodeInfo { uid, name }, kind));
        id
    }

    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn super_mut(&mut self, id: NodeId) -> Result<&mut SuperNode> {
        match self.nodes.get_mut(id.index()).map(|it| &mut it.kind) {
            Some(NodeKind::Super(it)) => Ok(it),
            _ => Err(Error::InvalidPortReference {
                node: id,
                slot: Slot::ControlOutput,
                query: PortQuery::Missing,
            }),
        }
    }

    fn loop_mut(&mut self, id: NodeId) -> Result<&mut LoopNode> {
        match self.nodes.get_mut(id.index()).map(|it| &mut it.kind) {
            Some(NodeKind::Loop(it)) => Ok(it),
            _ => Err(Error::InvalidPortReference {
                node: id,
                slot: Slot::ControlInput,
                query: PortQuery::Missing,
            }),
        }
    }

    pub fn add_split_call(&mut self) -> NodeId {
        self.push(NodeKind::SplitCall(SplitCallNode::default()))
    }

    /// Appends a new argument to `split`, it becomes output data port `arguments().len() - 1`.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `split` isn't a split call.
    pub fn insert_argument(&mut self, split: NodeId) -> Result<NodeId> {
        let index = match self.node(split).as_split_call() {
            Some(it) => it.arguments.len() as u32,
            None => {
                return Err(Error::InvalidPortReference {
                    node: split,
                    slot: Slot::DataOutput,
                    query: PortQuery::Missing,
                });
            }
        };

        let arg = self.push(NodeKind::Argument(ArgumentNode { index, split }));

        if let NodeKind::SplitCall(it) = &mut self.nodes[split.index()].kind {
            it.arguments.push(arg);
        }

        Ok(arg)
    }

    pub fn add_super_node(&mut self, block: BlockId, ty: SuperNodeType) -> NodeId {
        self.push(NodeKind::Super(SuperNode::new(block, ty)))
    }

    /// Creates an instruction as a member of `block`.
    ///
    /// Phis are tracked separately from the block's other members.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `block` isn't a super node, or if a phi's mask names
    /// a different block.
    pub fn add_instruction(
        &mut self,
        block: NodeId,
        op: InstOp,
        source: Option<InstId>,
    ) -> Result<NodeId> {
        self.super_mut(block)?;

        let is_phi = match &op {
            InstOp::Phi { mask, .. } if *mask != block => {
                return Err(Error::InvalidPortReference {
                    node: *mask,
                    slot: Slot::DependencyOutput,
                    query: PortQuery::Missing,
                });
            }
            InstOp::Phi { .. } => true,
            _ => false,
        };

        let id =
            self.push(NodeKind::Instruction(crate::InstructionNode { op, block, source }));

        let parent = self.super_mut(block)?;
        match is_phi {
            true => parent.phis.push(id),
            false => parent.instructions.push(id),
        }

        Ok(id)
    }

    /// Shorthand for a phi masked by its own block.
    pub fn add_phi(
        &mut self,
        block: NodeId,
        predecessors: Vec<BlockId>,
        source: Option<InstId>,
    ) -> Result<NodeId> {
        self.add_instruction(block, InstOp::Phi { mask: block, predecessors }, source)
    }

    pub fn add_loop(&mut self) -> NodeId {
        self.push(NodeKind::Loop(LoopNode::default()))
    }

    /// # Errors
    /// [`Error::InvalidPortReference`] if `lp` isn't a loop.
    pub fn set_loop_head(&mut self, lp: NodeId, head: NodeId) -> Result<()> {
        self.loop_mut(lp)?.head = Some(head);
        Ok(())
    }

    /// # Errors
    /// [`Error::InvalidPortReference`] if `lp` isn't a loop.
    pub fn add_loop_latch(&mut self, lp: NodeId, latch: NodeId) -> Result<()> {
        self.loop_mut(lp)?.latches.push(latch);
        Ok(())
    }

    /// Adds `block` to `lp`, the last loop a block is added to counts as its innermost.
    ///
    /// # Errors
    /// If `lp` isn't a loop, or `block` isn't a super node.
    pub fn add_loop_block(&mut self, lp: NodeId, block: NodeId) -> Result<()> {
        self.loop_mut(lp)?;
        self.super_mut(block)?.parent_loop = Some(lp);
        self.loop_mut(lp)?.blocks.push(block);
        Ok(())
    }

    /// # Errors
    /// [`Error::InvalidPortReference`] if `lp` isn't a loop.
    pub fn add_loop_instruction(&mut self, lp: NodeId, instruction: NodeId) -> Result<()> {
        self.loop_mut(lp)?.instructions.push(instruction);
        Ok(())
    }

    /// Accept every latch of `lp` as its own back edge into the head.
    ///
    /// # Errors
    /// [`Error::InvalidPortReference`] if `lp` isn't a loop.
    pub fn merge_latches(&mut self, lp: NodeId) -> Result<()> {
        self.loop_mut(lp)?.latches_merged = true;
        Ok(())
    }

    pub fn add_memory_node(&mut self, region: Region) -> NodeId {
        self.push(NodeKind::Memory(MemoryNode { region }))
    }

    pub fn add_const_int(&mut self, value: Int) -> NodeId {
        self.push(NodeKind::ConstInt(ConstIntNode { value }))
    }

    pub fn add_global(&mut self, global: GlobalId, symbol: impl Into<String>) -> NodeId {
        self.push(NodeKind::GlobalValue(GlobalValueNode { global, symbol: symbol.into() }))
    }

    fn check_edge(&self, kind: EdgeKind, src: NodeId, dst: NodeId) -> Result<()> {
        let len = self.nodes.len();
        if src.index() >= len || dst.index() >= len {
            return Err(malformed(kind, src, dst, "unknown endpoint"));
        }

        let (src_slot, dst_slot) = kind.slots();
        let (src_node, dst_node) = (self.node(src), self.node(dst));

        if !src_node.accepts(src_slot) {
            return Err(malformed(kind, src, dst, "source has no port for this kind of edge"));
        }

        if !dst_node.accepts(dst_slot) {
            return Err(malformed(kind, src, dst, "target has no port for this kind of edge"));
        }

        match kind {
            EdgeKind::Mask if src_node.ty() != NodeType::SuperNode => {
                Err(malformed(kind, src, dst, "masks come from blocks"))
            }

            EdgeKind::Dependency if src_node.ty() == NodeType::SuperNode => {
                Err(malformed(kind, src, dst, "blocks only produce masks"))
            }

            EdgeKind::MemoryRead | EdgeKind::MemoryWrite => {
                let expected = match kind {
                    EdgeKind::MemoryRead => InstType::Load,
                    _ => InstType::Store,
                };

                Self::check_access(kind, src_node, dst, expected, Slot::MemoryRequest)
            }

            EdgeKind::MemoryToData | EdgeKind::MemoryToControl => {
                let expected = match kind {
                    EdgeKind::MemoryToData => InstType::Load,
                    _ => InstType::Store,
                };

                Self::check_access(kind, dst_node, src, expected, Slot::MemoryResponse)
            }

            _ => Ok(()),
        }
    }

    fn check_access(
        kind: EdgeKind,
        access: &Node,
        unit: NodeId,
        expected: InstType,
        slot: Slot,
    ) -> Result<()> {
        let (src, dst) = match slot {
            Slot::MemoryRequest => (access.id(), unit),
            _ => (unit, access.id()),
        };

        let Some(instruction) = access.as_instruction().filter(|it| it.ty() == expected) else {
            return Err(malformed(kind, src, dst, "wrong kind of access for this edge"));
        };

        if instruction.memory() != Some(unit) {
            return Err(malformed(kind, src, dst, "access is bound to a different memory unit"));
        }

        if !access.ports.get(slot).is_empty() {
            return Err(malformed(kind, src, dst, "access already has a port on its memory unit"));
        }

        Ok(())
    }

    /// Connects `src` to `dst`, appending to the port lists `kind` lands in on both ends.
    ///
    /// # Errors
    /// [`Error::MalformedEdge`] if either end can't carry `kind`.
    pub fn connect(&mut self, kind: EdgeKind, src: NodeId, dst: NodeId) -> Result<()> {
        self.check_edge(kind, src, dst)?;

        let (src_slot, dst_slot) = kind.slots();
        let src_port = self.nodes[src.index()].ports.add_port(src_slot, dst);
        let dst_port = self.nodes[dst.index()].ports.add_port(dst_slot, src);

        tracing::trace!(?kind, %src, src_port, %dst, dst_port, "connect");

        self.edges.push(Edge { kind, src, dst, src_port, dst_port });
        Ok(())
    }

    /// Removes one `kind` edge from `src` to `dst`, returns whether there was one.
    ///
    /// Ports after the removed ones shift down by one.
    pub fn disconnect(&mut self, kind: EdgeKind, src: NodeId, dst: NodeId) -> bool {
        let found = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, it)| it.kind == kind && it.src == src && it.dst == dst)
            .min_by_key(|(_, it)| it.dst_port)
            .map(|(idx, _)| idx);

        let Some(idx) = found else {
            return false;
        };

        let removed = self.edges.remove(idx);
        let (src_slot, dst_slot) = kind.slots();

        self.nodes[src.index()].ports.remove_port_at(src_slot, removed.src_port);
        self.nodes[dst.index()].ports.remove_port_at(dst_slot, removed.dst_port);

        for edge in &mut self.edges {
            let (edge_src_slot, edge_dst_slot) = edge.kind.slots();

            if edge.src == src && edge_src_slot == src_slot && edge.src_port > removed.src_port {
                edge.src_port -= 1;
            }

            if edge.dst == dst && edge_dst_slot == dst_slot && edge.dst_port > removed.dst_port {
                edge.dst_port -= 1;
            }
        }

        tracing::trace!(?kind, %src, %dst, "disconnect");

        true
    }

    /// Makes `src` the token that fires `block`.
    ///
    /// # Errors
    /// If `block` isn't a super node or `src` can't produce control.
    pub fn set_activate_input(&mut self, block: NodeId, src: NodeId) -> Result<()> {
        self.super_mut(block)?;
        self.connect(EdgeKind::Control, src, block)?;
        self.super_mut(block)?.activate_input = Some(src);
        Ok(())
    }

    /// Feeds the boolean that decided how control reached `block` into it.
    ///
    /// # Errors
    /// If `block` isn't a super node or `value` doesn't produce data.
    pub fn set_mask_source(&mut self, block: NodeId, value: NodeId) -> Result<()> {
        self.super_mut(block)?;
        self.connect(EdgeKind::Data, value, block)?;
        self.super_mut(block)?.mask_source = Some(value);
        Ok(())
    }

    /// Binds a load or store to `unit`, allocating its request/response pair there.
    ///
    /// Rebinding an already bound access releases its pair on the old unit first.
    ///
    /// # Errors
    /// [`Error::MalformedEdge`] if `access` isn't a load/store or `unit` isn't a memory unit.
    pub fn bind_memory(&mut self, access: NodeId, unit: NodeId) -> Result<()> {
        let (request, response) = match self.node(access).as_instruction().map(|it| it.ty()) {
            Some(InstType::Load) => (EdgeKind::MemoryRead, EdgeKind::MemoryToData),
            Some(InstType::Store) => (EdgeKind::MemoryWrite, EdgeKind::MemoryToControl),
            _ => return Err(malformed(EdgeKind::MemoryRead, access, unit, "not a memory access")),
        };

        if self.node(unit).ty() != NodeType::MemoryUnit {
            return Err(malformed(request, access, unit, "not a memory unit"));
        }

        let old = self.node(access).as_instruction().and_then(|it| it.memory());
        if old == Some(unit) {
            return Ok(());
        }

        if let Some(old) = old {
            tracing::warn!(%access, from = %old, to = %unit, "rebinding memory access");
            self.disconnect(request, access, old);
            self.disconnect(response, old, access);
        }

        if let NodeKind::Instruction(it) = &mut self.nodes[access.index()].kind {
            it.set_memory(unit);
        }

        self.connect(request, access, unit)?;
        self.connect(response, unit, access)
    }

    /// Checks every structural invariant and freezes the graph.
    ///
    /// # Errors
    /// The first violated invariant, see [`Error`].
    pub fn finalize(self) -> Result<Graph> {
        verify::verify(&self.nodes, &self.edges)?;

        tracing::debug!(
            name = %self.name,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "finalized graph"
        );

        Ok(Graph { name: self.name, nodes: self.nodes, edges: self.edges, entry: self.entry })
    }
}

/// A finished dataflow graph for one function.
///
/// Read only, any number of emitters may walk it at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    entry: NodeId,
}

impl Graph {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The split call carrying the function's arguments and first control token.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |it| it.kind == kind)
    }

    #[must_use]
    pub fn has_edge(&self, kind: EdgeKind, src: NodeId, dst: NodeId) -> bool {
        self.edges.iter().any(|it| it.kind == kind && it.src == src && it.dst == dst)
    }

    pub fn of_type(&self, ty: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |it| it.ty() == ty)
    }

    pub fn instructions(&self, ty: InstType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |it| it.is(ty))
    }

    /// The super node created for `block`, if it was reachable.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&Node> {
        self.nodes.iter().find(|it| it.as_super().is_some_and(|it| it.block == block))
    }

    /// The node created for the SSA value `id`.
    #[must_use]
    pub fn value(&self, id: InstId) -> Option<&Node> {
        self.nodes.iter().find(|it| it.as_instruction().is_some_and(|it| it.source == Some(id)))
    }

    #[must_use]
    pub fn display(&self) -> GraphDisplay<'_> {
        GraphDisplay(self)
    }
}

pub struct GraphDisplay<'a>(&'a Graph);

impl fmt::Display for GraphDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let graph = self.0;

        write!(f, "graph {}", graph.name)?;

        for node in &graph.nodes {
            write!(f, "\n{} {} = {}", node.id(), node.name(), node.kind())?;

            for slot in Slot::ALL {
                let list = node.ports().get(slot);
                if list.is_empty() {
                    continue;
                }

                write!(f, "\n    {slot}:")?;
                for neighbor in list.iter() {
                    write!(f, " {neighbor}")?;
                }
            }
        }

        Ok(())
    }
}
