use std::fmt;

use crate::{Block, BlockId, InstId, Instruction, Type};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
}

/// A validated SSA function, blocks are in declaration order and `blocks[0]` is the entry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub globals: Vec<Global>,
    pub blocks: Vec<Block>,
}

impl Function {
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    /// CFG predecessors of every block, each list in block declaration order.
    #[must_use]
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];

        for block in &self.blocks {
            for succ in block.terminator.successors() {
                let list: &mut Vec<BlockId> = &mut preds[succ.index()];
                // `br %c, bb1, bb1` is still just one edge.
                if !list.contains(&block.id) {
                    list.push(block.id);
                }
            }
        }

        for list in &mut preds {
            list.sort_unstable();
        }

        preds
    }

    /// Finds the instruction defining `id`, along with the block it lives in.
    #[must_use]
    pub fn find(&self, id: InstId) -> Option<(BlockId, &Instruction)> {
        self.blocks.iter().find_map(|block| {
            block.instructions.iter().find(|it| it.id() == Some(id)).map(|it| (block.id, it))
        })
    }

    #[must_use]
    pub fn display(&self) -> FunctionDisplay<'_> {
        FunctionDisplay(self)
    }
}

pub struct FunctionDisplay<'a>(&'a Function);

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let func = self.0;

        for (idx, global) in func.globals.iter().enumerate() {
            writeln!(f, "@{idx} = global {} ; {}", global.ty, global.name)?;
        }

        write!(f, "fn {}(", func.name)?;
        for (idx, param) in func.params.iter().enumerate() {
            if idx != 0 {
                f.write_str(", ")?;
            }

            write!(f, "%arg{idx}: {}", param.ty)?;
        }

        f.write_str(") {")?;

        for block in &func.blocks {
            write!(f, "\n{block}")?;
        }

        f.write_str("\n}")
    }
}
