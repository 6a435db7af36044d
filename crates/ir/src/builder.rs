use crate::ty::Int;
use crate::{
    BinOp, Block, BlockId, CastOp, Function, Global, GlobalId, IdAllocator, InstId, Instruction,
    Param, Predicate, Terminator, Type, Value,
};

struct PendingBlock {
    name: String,
    instructions: Vec<Instruction>,
    terminator: Option<Terminator>,
}

/// Builds a [`Function`] one block at a time.
///
/// Blocks are declared up front with [`block`](Self::block) so that branches and phis can refer
/// to blocks (and, via [`add_incoming`](Self::add_incoming), values) that don't exist yet.
pub struct FunctionBuilder {
    name: String,
    params: Vec<Param>,
    globals: Vec<Global>,
    blocks: Vec<PendingBlock>,
    current: Option<BlockId>,
    ids: IdAllocator<InstId>,
}

impl FunctionBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            globals: Vec::new(),
            blocks: Vec::new(),
            current: None,
            ids: IdAllocator::new(),
        }
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> Value {
        let idx = self.params.len() as u32;
        self.params.push(Param { name: name.into(), ty });
        Value::Arg(idx)
    }

    pub fn global(&mut self, name: impl Into<String>, ty: Type) -> Value {
        let idx = self.globals.len() as u32;
        self.globals.push(Global { name: name.into(), ty });
        Value::Global(GlobalId(idx))
    }

    /// Declares a new block, the first declared block is the entry.
    pub fn block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(PendingBlock {
            name: name.into(),
            instructions: Vec::new(),
            terminator: None,
        });

        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        assert!(block.index() < self.blocks.len(), "unknown block {block}");
        self.current = Some(block);
    }

    fn current(&mut self) -> &mut PendingBlock {
        let current = self.current.expect("no block selected, call `switch_to` first");
        let block = &mut self.blocks[current.index()];

        assert!(block.terminator.is_none(), "{current} is already terminated");

        block
    }

    fn instruction<F: FnOnce(InstId) -> Instruction>(&mut self, f: F) -> Value {
        let id = self.ids.allocate();
        let instr = f(id);
        self.current().instructions.push(instr);
        Value::Inst(id)
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(BlockId, Value)>) -> Value {
        self.instruction(|dest| Instruction::Phi { dest, ty, incoming })
    }

    /// Adds a predecessor value to an existing phi.
    pub fn add_incoming(&mut self, phi: Value, block: BlockId, value: Value) {
        let id = phi.inst().expect("phi must be an instruction result");

        let instr = self
            .blocks
            .iter_mut()
            .flat_map(|it| it.instructions.iter_mut())
            .find(|it| it.id() == Some(id));

        match instr {
            Some(Instruction::Phi { incoming, .. }) => incoming.push((block, value)),
            Some(other) => panic!("`{other}` is not a phi"),
            None => panic!("unknown value {phi}"),
        }
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        self.instruction(|dest| Instruction::Binary { dest, op, lhs, rhs })
    }

    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Sub, lhs, rhs)
    }

    pub fn icmp(&mut self, pred: Predicate, lhs: Value, rhs: Value) -> Value {
        self.instruction(|dest| Instruction::Icmp { dest, pred, lhs, rhs })
    }

    pub fn select(&mut self, cond: Value, if_true: Value, if_false: Value) -> Value {
        self.instruction(|dest| Instruction::Select { dest, cond, if_true, if_false })
    }

    pub fn alloca(&mut self, ty: Type, count: u32) -> Value {
        self.instruction(|dest| Instruction::Alloca { dest, ty, count })
    }

    pub fn gep(&mut self, base: Value, indices: Vec<Value>) -> Value {
        self.instruction(|dest| Instruction::Gep { dest, base, indices })
    }

    pub fn load(&mut self, ty: Type, addr: Value) -> Value {
        self.instruction(|dest| Instruction::Load { dest, ty, addr })
    }

    pub fn store(&mut self, addr: Value, value: Value) {
        self.current().instructions.push(Instruction::Store { addr, value });
    }

    pub fn cast(&mut self, op: CastOp, src: Value, ty: Type) -> Value {
        self.instruction(|dest| Instruction::Cast { dest, op, src, ty })
    }

    /// Calls `callee`, `returns` decides whether the call produces a value.
    pub fn call(
        &mut self,
        callee: impl Into<String>,
        args: Vec<Value>,
        returns: bool,
    ) -> Option<Value> {
        let callee = callee.into();
        if returns {
            let value = self.instruction(|dest| Instruction::Call { dest: Some(dest), callee, args });
            return Some(value);
        }

        self.current().instructions.push(Instruction::Call { dest: None, callee, args });
        None
    }

    fn terminate(&mut self, terminator: Terminator) {
        self.current().terminator = Some(terminator);
        self.current = None;
    }

    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br { target });
    }

    pub fn cond_br(&mut self, cond: Value, if_true: BlockId, if_false: BlockId) {
        self.terminate(Terminator::CondBr { cond, if_true, if_false });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret { value });
    }

    /// # Panics
    /// If any declared block was never terminated.
    #[must_use]
    pub fn finish(self) -> Function {
        let blocks = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(idx, block)| {
                let id = BlockId(idx as u32);
                let terminator = block
                    .terminator
                    .unwrap_or_else(|| panic!("{id} ({}) has no terminator", block.name));

                Block { id, name: block.name, instructions: block.instructions, terminator }
            })
            .collect();

        Function { name: self.name, params: self.params, globals: self.globals, blocks }
    }
}

/// Shorthand for an `i32` constant operand.
#[must_use]
pub const fn i32(value: u32) -> Value {
    Value::Const(Int::i32(value))
}

/// Shorthand for an `i1` constant operand.
#[must_use]
pub const fn i1(value: bool) -> Value {
    Value::Const(Int::i1(value))
}
