use fnv::FnvHashMap;

use crate::error::LoopDefect;
use crate::{
    Edge, EdgeKind, Error, InstOp, InstType, LoopNode, Node, NodeId, NodeKind, Result, Slot,
    SuperNode, SuperNodeType,
};

use super::malformed;

pub(super) fn verify(nodes: &[Node], edges: &[Edge]) -> Result<()> {
    ports(nodes, edges)?;

    for node in nodes {
        match &node.kind {
            NodeKind::Super(it) => block(nodes, node, it)?,
            NodeKind::Loop(it) => loop_structure(nodes, node.id(), it)?,
            NodeKind::Instruction(it) => {
                if it.ty().is_memory_access() {
                    access(node)?;
                }

                if let InstOp::Branch { successors } = &it.op {
                    if node.ports.control_outputs() != successors.as_slice() {
                        return Err(malformed(
                            EdgeKind::Control,
                            node.id(),
                            it.block,
                            "branch outputs disagree with its successors",
                        ));
                    }
                }
            }
            NodeKind::Memory(_) => memory_unit(nodes, node)?,
            _ => {}
        }
    }

    Ok(())
}

/// Every edge's port indices point back at the other end, and nothing else is in any port list.
fn ports(nodes: &[Node], edges: &[Edge]) -> Result<()> {
    let mut counts: FnvHashMap<(NodeId, Slot), usize> = FnvHashMap::default();

    for edge in edges {
        let (src_slot, dst_slot) = edge.kind.slots();

        let src = nodes[edge.src.index()].ports.get(src_slot).get(edge.src_port);
        let dst = nodes[edge.dst.index()].ports.get(dst_slot).get(edge.dst_port);

        if src != Some(edge.dst) || dst != Some(edge.src) {
            return Err(malformed(edge.kind, edge.src, edge.dst, "ports out of sync with edge"));
        }

        *counts.entry((edge.src, src_slot)).or_default() += 1;
        *counts.entry((edge.dst, dst_slot)).or_default() += 1;
    }

    for node in nodes {
        for slot in Slot::ALL {
            let entries = node.ports.get(slot);
            if entries.len() == counts.get(&(node.id(), slot)).copied().unwrap_or(0) {
                continue;
            }

            let kind = EdgeKind::ALL
                .into_iter()
                .find(|kind| {
                    let (src, dst) = kind.slots();
                    src == slot || dst == slot
                })
                .unwrap_or(EdgeKind::Data);

            let other = entries.as_slice().last().copied().unwrap_or(node.id());
            let (src, dst) = match slot.is_source_side() {
                true => (node.id(), other),
                false => (other, node.id()),
            };

            return Err(malformed(kind, src, dst, "port entries without an edge"));
        }
    }

    Ok(())
}

fn block(nodes: &[Node], node: &Node, block: &SuperNode) -> Result<()> {
    let id = node.id();
    let controls = node.ports.control_inputs();

    match block.activate_input {
        Some(src) if controls.contains(&src) => {}
        _ => return Err(Error::Unactivated { node: id, block: id }),
    }

    for member in block.members() {
        let member_node = &nodes[member.index()];
        if !member_node.ports.control_inputs().contains(&id) {
            return Err(Error::Unactivated { node: member, block: id });
        }

        let masked = member_node.ports.dependency_inputs().contains(&id);
        let needs_mask = member_node.is(InstType::Phi)
            || (block.ty == SuperNodeType::Mask && member_node.is(InstType::Store));

        if needs_mask && !masked {
            return Err(malformed(EdgeKind::Mask, id, member, "member is missing its mask"));
        }
    }

    for &phi in &block.phis {
        let phi_node = &nodes[phi.index()];
        let Some(InstOp::Phi { predecessors, .. }) = phi_node.as_instruction().map(|it| &it.op)
        else {
            continue;
        };

        if phi_node.ports.data_inputs().len() != predecessors.len() {
            return Err(malformed(EdgeKind::Data, phi, phi, "one phi input per predecessor"));
        }

        if controls.len() < predecessors.len() {
            return Err(malformed(EdgeKind::Control, id, phi, "phi has more inputs than its block"));
        }

        // control input `i` must come out of predecessor `i`'s branch.
        for (&ctrl, &pred) in controls.iter().zip(predecessors) {
            let from = nodes[ctrl.index()]
                .as_instruction()
                .and_then(|it| nodes[it.block.index()].as_super())
                .map(|it| it.block);

            if from != Some(pred) {
                return Err(malformed(
                    EdgeKind::Control,
                    ctrl,
                    id,
                    "control input order disagrees with phi inputs",
                ));
            }
        }
    }

    Ok(())
}

fn access(node: &Node) -> Result<()> {
    let id = node.id();
    let Some(unit) = node.as_instruction().and_then(|it| it.memory()) else {
        return Err(Error::UnboundMemoryAccess { node: id });
    };

    let request = node.ports.get(Slot::MemoryRequest).as_slice();
    let response = node.ports.get(Slot::MemoryResponse).as_slice();

    if request != [unit] || response != [unit] {
        return Err(Error::UnboundMemoryAccess { node: id });
    }

    Ok(())
}

fn memory_unit(nodes: &[Node], node: &Node) -> Result<()> {
    let id = node.id();

    for (request, response, ty, kind) in [
        (Slot::ReadRequest, Slot::ReadResponse, InstType::Load, EdgeKind::MemoryRead),
        (Slot::WriteRequest, Slot::WriteResponse, InstType::Store, EdgeKind::MemoryWrite),
    ] {
        let requests = node.ports.get(request);
        let responses = node.ports.get(response);

        if requests.len() != responses.len() {
            return Err(malformed(kind, id, id, "requests and responses out of balance"));
        }

        for access in requests.iter() {
            let bound = nodes[access.index()]
                .as_instruction()
                .filter(|it| it.ty() == ty)
                .and_then(|it| it.memory());

            if bound != Some(id) || !responses.contains(access) {
                return Err(malformed(kind, access, id, "request without a matching response"));
            }
        }
    }

    Ok(())
}

fn loop_structure(nodes: &[Node], id: NodeId, lp: &LoopNode) -> Result<()> {
    let err = |defect| Err(Error::UnresolvedLoopStructure { node: id, defect });

    let Some(head) = lp.head else {
        return err(LoopDefect::MissingHead);
    };

    if !lp.contains_block(head) {
        return err(LoopDefect::HeadNotMember);
    }

    if lp.latches.is_empty() {
        return err(LoopDefect::MissingLatch);
    }

    if let Some(&latch) = lp.latches.iter().find(|it| !lp.contains_block(**it)) {
        return err(LoopDefect::LatchNotMember(latch));
    }

    if lp.latches.len() > 1 && !lp.latches_merged {
        return err(LoopDefect::AmbiguousLatches(lp.latches.len()));
    }

    let controls = nodes[head.index()].ports.control_inputs();
    let from_inside = |src: NodeId| {
        nodes[src.index()].as_instruction().is_some_and(|it| lp.contains_block(it.block))
    };

    let entries = controls.iter().filter(|it| !from_inside(**it)).count();
    if entries != 1 {
        return err(LoopDefect::EntryCount(entries));
    }

    let expected = 1 + lp.latches.len();
    if controls.len() != expected {
        return err(LoopDefect::FanIn { expected, found: controls.len() });
    }

    Ok(())
}
