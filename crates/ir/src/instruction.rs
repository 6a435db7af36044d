use std::fmt;

use crate::ty::Int;
use crate::{BlockId, GlobalId, InstId, Type};


/// Anything an instruction can consume.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Value {
    /// The n-th parameter of the enclosing function.
    Arg(u32),
    Global(GlobalId),
    Const(Int),
    Inst(InstId),
}

impl Value {
    #[must_use]
    pub fn inst(self) -> Option<InstId> {
        match self {
            Self::Inst(id) => Some(id),
            _ => None,
        }
    }
}

impl From<Int> for Value {
    fn from(value: Int) -> Self {
        Self::Const(value)
    }
}

impl From<InstId> for Value {
    fn from(value: InstId) -> Self {
        Self::Inst(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Arg(idx) => write!(f, "%arg{idx}"),
            Self::Global(id) => fmt::Display::fmt(id, f),
            Self::Const(it) => fmt::Display::fmt(it, f),
            Self::Inst(id) => fmt::Display::fmt(id, f),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::UDiv => "udiv",
            Self::SDiv => "sdiv",
            Self::URem => "urem",
            Self::SRem => "srem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::LShr => "lshr",
            Self::AShr => "ashr",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// bitpacked: [(signed/unsigned):2, (lt/gt):1, (eq/no):0]
#[repr(u8)]
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Inequality {
    Ult = 0b000,
    Ule = 0b001,
    Ugt = 0b010,
    Uge = 0b011,
    Slt = 0b100,
    Sle = 0b101,
    Sgt = 0b110,
    Sge = 0b111,
}

impl Inequality {
    const SIGNED_UNSIGNED_BIT: u8 = 2;
    const EQUAL_NOT_EQUAL_BIT: u8 = 0;

    #[inline(always)]
    #[must_use]
    pub const fn is_signed(self) -> bool {
        (self as u8 & (1 << Inequality::SIGNED_UNSIGNED_BIT)) != 0
    }

    #[inline(always)]
    #[must_use]
    pub const fn include_eq(self) -> bool {
        (self as u8 & (1 << Inequality::EQUAL_NOT_EQUAL_BIT)) != 0
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Predicate {
    Eq,
    Ne,
    Inequality(Inequality),
}

impl Predicate {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Inequality(Inequality::Ult) => "ult",
            Self::Inequality(Inequality::Ule) => "ule",
            Self::Inequality(Inequality::Ugt) => "ugt",
            Self::Inequality(Inequality::Uge) => "uge",
            Self::Inequality(Inequality::Slt) => "slt",
            Self::Inequality(Inequality::Sle) => "sle",
            Self::Inequality(Inequality::Sgt) => "sgt",
            Self::Inequality(Inequality::Sge) => "sge",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum CastOp {
    Sext,
    Zext,
    BitCast,
    Trunc,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sext => f.write_str("sext"),
            Self::Zext => f.write_str("zext"),
            Self::BitCast => f.write_str("bitcast"),
            Self::Trunc => f.write_str("trunc"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    /// Incoming values are keyed by predecessor, in whatever order the frontend produced them.
    Phi {
        dest: InstId,
        ty: Type,
        incoming: Vec<(BlockId, Value)>,
    },
    Binary {
        dest: InstId,
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dest: InstId,
        pred: Predicate,
        lhs: Value,
        rhs: Value,
    },
    Select {
        dest: InstId,
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    Alloca {
        dest: InstId,
        ty: Type,
        count: u32,
    },
    Gep {
        dest: InstId,
        base: Value,
        indices: Vec<Value>,
    },
    Load {
        dest: InstId,
        ty: Type,
        addr: Value,
    },
    Store {
        addr: Value,
        value: Value,
    },
    Cast {
        dest: InstId,
        op: CastOp,
        src: Value,
        ty: Type,
    },
    Call {
        dest: Option<InstId>,
        callee: String,
        args: Vec<Value>,
    },
}

impl Instruction {
    #[must_use]
    pub fn id(&self) -> Option<InstId> {
        match self {
            Self::Phi { dest, .. }
            | Self::Binary { dest, .. }
            | Self::Icmp { dest, .. }
            | Self::Select { dest, .. }
            | Self::Alloca { dest, .. }
            | Self::Gep { dest, .. }
            | Self::Load { dest, .. }
            | Self::Cast { dest, .. } => Some(*dest),
            Self::Call { dest, .. } => *dest,
            Self::Store { .. } => None,
        }
    }

    /// Visits every consumed value in operand order.
    ///
    /// For phis this is the frontend's incoming order, not block order.
    pub fn visit_operands<F: FnMut(Value)>(&self, mut visit: F) {
        match self {
            Self::Alloca { .. } => {}
            Self::Phi { incoming, .. } => incoming.iter().for_each(|(_, value)| visit(*value)),
            Self::Binary { lhs, rhs, .. } | Self::Icmp { lhs, rhs, .. } => {
                visit(*lhs);
                visit(*rhs);
            }
            Self::Select { cond, if_true, if_false, .. } => {
                visit(*cond);
                visit(*if_true);
                visit(*if_false);
            }
            Self::Gep { base, indices, .. } => {
                visit(*base);
                indices.iter().copied().for_each(visit);
            }
            Self::Load { addr, .. } => visit(*addr),
            Self::Store { addr, value } => {
                visit(*addr);
                visit(*value);
            }
            Self::Cast { src, .. } => visit(*src),
            Self::Call { args, .. } => args.iter().copied().for_each(visit),
        }
    }

    #[must_use]
    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }

    #[must_use]
    pub fn is_memory_access(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Store { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Phi { dest, ty, incoming } => {
                write!(f, "{dest} = phi {ty}")?;
                for (idx, (block, value)) in incoming.iter().enumerate() {
                    let sep = if idx == 0 { " " } else { ", " };
                    write!(f, "{sep}[{value}, {block}]")?;
                }

                Ok(())
            }

            Self::Binary { dest, op, lhs, rhs } => write!(f, "{dest} = {op} {lhs}, {rhs}"),

            Self::Icmp { dest, pred, lhs, rhs } => write!(f, "{dest} = icmp {pred} {lhs}, {rhs}"),

            Self::Select { dest, cond, if_true, if_false } => {
                write!(f, "{dest} = select {cond}, {if_true}, {if_false}")
            }

            Self::Alloca { dest, ty, count } => write!(f, "{dest} = alloca {ty}, {count}"),

            Self::Gep { dest, base, indices } => {
                write!(f, "{dest} = gep {base}")?;
                for index in indices {
                    write!(f, ", {index}")?;
                }

                Ok(())
            }

            Self::Load { dest, ty, addr } => write!(f, "{dest} = load {ty}, {addr}"),

            Self::Store { addr, value } => write!(f, "store {value}, {addr}"),

            Self::Cast { dest, op, src, ty } => write!(f, "{dest} = {op} {src} to {ty}"),

            Self::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }

                write!(f, "call {callee}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }

                    write!(f, "{arg}")?;
                }

                f.write_str(")")
            }
        }
    }
}
