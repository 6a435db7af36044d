use std::borrow::Cow;

use weft_ir::{Block, BlockId, Function, InstId, Instruction, Terminator, Value};

use crate::analysis::Cfg;

/// Routes every loop that's entered from more than one block through a new preheader block.
///
/// The preheader's phis pick each header phi's entry value, which leaves the header with
/// exactly one edge from outside the loop. Irreducible functions are returned untouched.
pub(super) fn insert_preheaders(func: &Function) -> Cow<'_, Function> {
    let mut func = Cow::Borrowed(func);

    loop {
        let cfg = Cfg::new(&func);

        let irreducible = func.blocks.iter().any(|block| {
            cfg.successors(block.id).iter().any(|succ| cfg.is_irreducible_edge(block.id, *succ))
        });

        if irreducible {
            return func;
        }

        let split = cfg.loops().into_iter().find_map(|lp| {
            let entries: Vec<BlockId> = cfg
                .predecessors(lp.header)
                .iter()
                .copied()
                .filter(|pred| !lp.contains(*pred))
                .collect();

            (entries.len() > 1).then_some((lp.header, entries))
        });

        let Some((header, entries)) = split else {
            return func;
        };

        split_entries(func.to_mut(), header, &entries);
    }
}

fn next_inst_id(func: &Function) -> u32 {
    func.blocks
        .iter()
        .flat_map(|block| &block.instructions)
        .filter_map(Instruction::id)
        .map(|id| id.0 + 1)
        .max()
        .unwrap_or(0)
}

fn retarget(target: &mut BlockId, from: BlockId, to: BlockId) {
    if *target == from {
        *target = to;
    }
}

fn split_entries(func: &mut Function, header: BlockId, entries: &[BlockId]) {
    let preheader = BlockId(func.blocks.len() as u32);
    let mut next = next_inst_id(func);
    let mut phis = Vec::new();

    for instruction in &mut func.blocks[header.index()].instructions {
        // phis lead their block.
        let Instruction::Phi { ty, incoming, .. } = instruction else {
            break;
        };

        let (outside, inside): (Vec<(BlockId, Value)>, Vec<(BlockId, Value)>) =
            incoming.drain(..).partition(|(from, _)| entries.contains(from));

        let dest = InstId(next);
        next += 1;

        *incoming = inside;
        incoming.push((preheader, Value::Inst(dest)));
        phis.push(Instruction::Phi { dest, ty: *ty, incoming: outside });
    }

    for &pred in entries {
        match &mut func.blocks[pred.index()].terminator {
            Terminator::Br { target } => retarget(target, header, preheader),
            Terminator::CondBr { if_true, if_false, .. } => {
                retarget(if_true, header, preheader);
                retarget(if_false, header, preheader);
            }
            Terminator::Ret { .. } => {}
        }
    }

    let name = format!("{}.preheader", func.blocks[header.index()].name);
    tracing::debug!(%header, %preheader, entries = entries.len(), "merging loop entries");

    func.blocks.push(Block {
        id: preheader,
        name,
        instructions: phis,
        terminator: Terminator::Br { target: header },
    });
}
