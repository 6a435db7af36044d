//! The SSA form handed to the dataflow lowering by a frontend.
//!
//! Nothing in here is validated on construction, frontends are trusted to produce well formed
//! SSA. [`assert_well_formed`] exists for tests and fuzzing.

#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::match_bool)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

use std::collections::BTreeMap;

mod block;
pub mod builder;
mod function;
mod id;
pub mod instruction;
pub mod ty;

#[cfg(test)]
mod tests;

pub use block::{Block, Terminator};
pub use builder::FunctionBuilder;
pub use function::{Function, FunctionDisplay, Global, Param};
pub use id::{BlockId, GlobalId, IdAllocator, Idx, InstId};
pub use instruction::{BinOp, CastOp, Inequality, Instruction, Predicate, Value};
pub use ty::{Bitness, Type};

#[track_caller]
pub fn assert_well_formed(func: &Function) {
    assert!(!func.blocks.is_empty(), "function `{}` has no blocks", func.name);

    let mut defs = BTreeMap::new();

    for (idx, block) in func.blocks.iter().enumerate() {
        assert_eq!(block.id.index(), idx, "block ids must match their position");

        let mut seen_non_phi = false;
        for instruction in &block.instructions {
            if instruction.is_phi() {
                assert!(!seen_non_phi, "phis must lead their block ({})", block.id);
            } else {
                seen_non_phi = true;
            }

            if let Some(id) = instruction.id() {
                assert_eq!(defs.insert(id, block.id), None, "Ids must not be re-used ({id})");
            }
        }

        for succ in block.terminator.successors() {
            assert!(succ.index() < func.blocks.len(), "{} branches to unknown {succ}", block.id);
        }
    }

    let assert_value = |value: Value| match value {
        Value::Arg(idx) => assert!((idx as usize) < func.params.len(), "unknown arg %arg{idx}"),
        Value::Global(id) => assert!(id.index() < func.globals.len(), "unknown global {id}"),
        Value::Const(_) => {}
        Value::Inst(id) => assert!(defs.contains_key(&id), "use of undefined value {id}"),
    };

    let preds = func.predecessors();

    assert!(preds[func.entry().index()].is_empty(), "the entry block can't be a branch target");

    for block in &func.blocks {
        for instruction in &block.instructions {
            instruction.visit_operands(assert_value);

            if let Instruction::Phi { dest, incoming, .. } = instruction {
                let mut from: Vec<_> = incoming.iter().map(|(block, _)| *block).collect();
                from.sort_unstable();
                assert_eq!(
                    from,
                    preds[block.id.index()],
                    "phi {dest} must have exactly one value per predecessor"
                );
            }
        }

        block.terminator.visit_operands(assert_value);
    }
}
