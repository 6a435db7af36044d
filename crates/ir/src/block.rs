use std::fmt;

use crate::{BlockId, Instruction, Value};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Terminator {
    Br { target: BlockId },
    /// Successor order is `[if_true, if_false]`.
    CondBr { cond: Value, if_true: BlockId, if_false: BlockId },
    Ret { value: Option<Value> },
}

impl Terminator {
    /// Successors in declaration order.
    pub fn successors(&self) -> impl Iterator<Item = BlockId> + use<> {
        let succs = match *self {
            Self::Br { target } => [Some(target), None],
            Self::CondBr { if_true, if_false, .. } => [Some(if_true), Some(if_false)],
            Self::Ret { .. } => [None, None],
        };

        succs.into_iter().flatten()
    }

    pub fn visit_operands<F: FnMut(Value)>(&self, mut visit: F) {
        match self {
            Self::Br { .. } | Self::Ret { value: None } => {}
            Self::CondBr { cond: value, .. } | Self::Ret { value: Some(value) } => visit(*value),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Br { target } => write!(f, "br {target}"),
            Self::CondBr { cond, if_true, if_false } => {
                write!(f, "br {cond}, {if_true}, {if_false}")
            }
            Self::Ret { value: Some(value) } => write!(f, "ret {value}"),
            Self::Ret { value: None } => f.write_str("ret"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl Block {
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().take_while(|it| it.is_phi())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}: ; {}", self.id, self.name)?;
        for item in &self.instructions {
            writeln!(f, "    {item}")?;
        }

        write!(f, "    {}", self.terminator)
    }
}
