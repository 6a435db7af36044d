//! SSA to dataflow lowering.
//!
//! Lowering happens in phases over one function: every node is created first, then control,
//! masks, data, memory and loops are wired in that order. Forward references (phi operands,
//! loop back edges) only ever need a node to exist, never to be wired.

use std::collections::BTreeMap;

use fnv::FnvHashMap;
use weft_ir::ty::Int;
use weft_ir::{
    Block, BlockId, CastOp, Function, GlobalId, IdAllocator, InstId, Instruction, Terminator,
    Value,
};

use crate::analysis::{Cfg, NaturalLoop};
use crate::{
    EdgeKind, Error, Graph, GraphBuilder, InstOp, InstType, NodeId, Region, Result,
    SuperNodeType, Uid,
};

mod memory;
mod preheader;

#[cfg(test)]
mod tests;

pub use memory::{Access, AccessKind, Disambiguator, NoAlias, SingleRegion};

/// What to do with a loop that has more than one back edge.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum LatchPolicy {
    /// Fail with [`LoopDefect::AmbiguousLatches`](crate::error::LoopDefect::AmbiguousLatches).
    Reject,
    /// Accept every back edge as its own control input on the head.
    FanIn,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Options {
    pub latch_policy: LatchPolicy,
    /// Bind accesses the disambiguator has no region for to `Region(0)` instead of leaving
    /// them unbound.
    pub default_memory: bool,
}

impl Options {
    /// Every ambiguity is an error.
    #[must_use]
    pub const fn strict() -> Self {
        Self { latch_policy: LatchPolicy::Reject, default_memory: false }
    }

    #[must_use]
    pub const fn permissive() -> Self {
        Self { latch_policy: LatchPolicy::FanIn, default_memory: true }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::strict()
    }
}

/// One translation run, any number of functions may be lowered in it.
///
/// Node names are unique across the whole run.
#[derive(Debug)]
pub struct Session {
    uids: IdAllocator<Uid>,
    options: Options,
}

impl Session {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { uids: IdAllocator::new(), options }
    }

    #[must_use]
    pub fn options(&self) -> Options {
        self.options
    }

    /// Starts a new, independent run.
    pub fn reset(&mut self) {
        self.uids.reset();
    }

    /// Lowers `func` into its own graph.
    ///
    /// A loop entered from several blocks is first given a preheader that merges those entries,
    /// which shows up as an extra `Mask` block after the function's own blocks.
    ///
    /// # Errors
    /// [`Error::UnsupportedInput`] for input the graph can't represent, and whatever
    /// [`GraphBuilder::finalize`] rejects.
    pub fn lower(
        &mut self,
        func: &Function,
        disambiguator: &mut dyn Disambiguator,
    ) -> Result<Graph> {
        let _span = tracing::debug_span!("lower", function = %func.name).entered();

        let func = preheader::insert_preheaders(func);
        Context::new(&func, self.options, &mut self.uids).run(disambiguator)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

struct Context<'a, 'u> {
    func: &'a Function,
    cfg: Cfg,
    loops: Vec<NaturalLoop>,
    options: Options,
    builder: GraphBuilder<'u>,
    /// Super node of every reachable block.
    blocks: Vec<Option<NodeId>>,
    /// Member nodes of every block, in instruction order.
    members: Vec<Vec<NodeId>>,
    terminators: Vec<Option<NodeId>>,
    values: FnvHashMap<InstId, NodeId>,
    arguments: Vec<NodeId>,
    consts: FnvHashMap<Int, NodeId>,
    globals: FnvHashMap<GlobalId, NodeId>,
    units: BTreeMap<Region, NodeId>,
    calls: Vec<(NodeId, NodeId)>,
    accesses: Vec<Access>,
}

impl<'a, 'u> Context<'a, 'u> {
    fn new(func: &'a Function, options: Options, uids: &'u mut IdAllocator<Uid>) -> Self {
        let cfg = Cfg::new(func);
        let loops = cfg.loops();
        let len = func.blocks.len();

        Self {
            func,
            cfg,
            loops,
            options,
            builder: GraphBuilder::new(func.name.clone(), uids),
            blocks: vec![None; len],
            members: vec![Vec::new(); len],
            terminators: vec![None; len],
            values: FnvHashMap::default(),
            arguments: Vec::new(),
            consts: FnvHashMap::default(),
            globals: FnvHashMap::default(),
            units: BTreeMap::new(),
            calls: Vec::new(),
            accesses: Vec::new(),
        }
    }

    fn run(mut self, disambiguator: &mut dyn Disambiguator) -> Result<Graph> {
        self.check_input()?;
        self.create_blocks();
        self.create_arguments()?;
        self.create_instructions()?;
        self.wire_control()?;
        self.wire_masks()?;
        self.wire_data()?;
        self.wire_memory(disambiguator)?;
        self.create_loops()?;

        self.builder.finalize()
    }

    fn reachable_blocks(&self) -> impl Iterator<Item = &'a Block> + '_ {
        self.func.blocks.iter().filter(|block| self.cfg.is_reachable(block.id))
    }

    fn super_of(&self, block: BlockId) -> Result<NodeId> {
        self.blocks[block.index()]
            .ok_or_else(|| Error::UnsupportedInput(format!("{block} is unreachable")))
    }

    fn check_input(&self) -> Result<()> {
        let entry = self.func.block(self.func.entry());
        if entry.phis().next().is_some() {
            return Err(Error::UnsupportedInput(format!(
                "phi in entry block of `{}`",
                self.func.name
            )));
        }

        for block in self.reachable_blocks() {
            for &succ in self.cfg.successors(block.id) {
                if self.cfg.is_irreducible_edge(block.id, succ) {
                    return Err(Error::UnsupportedInput(format!(
                        "irreducible control flow from {} into {succ}",
                        block.id
                    )));
                }
            }
        }

        Ok(())
    }

    fn create_blocks(&mut self) {
        let func = self.func;

        for block in &func.blocks {
            if !self.cfg.is_reachable(block.id) {
                tracing::debug!(block = %block.id, "skipping unreachable block");
                continue;
            }

            let ty = if self.loops.iter().any(|lp| lp.header == block.id) {
                SuperNodeType::LoopHead
            } else if self.cfg.predecessors(block.id).len() > 1 {
                SuperNodeType::Mask
            } else {
                SuperNodeType::NoMask
            };

            let node = self.builder.add_super_node(block.id, ty);
            tracing::debug!(block = %block.id, name = %block.name, %ty, %node, "classified");

            self.blocks[block.id.index()] = Some(node);
        }
    }

    fn create_arguments(&mut self) -> Result<()> {
        let entry = self.builder.entry();

        for _ in &self.func.params {
            let arg = self.builder.insert_argument(entry)?;
            self.arguments.push(arg);
        }

        Ok(())
    }

    fn create_instructions(&mut self) -> Result<()> {
        let func = self.func;

        for block in &func.blocks {
            if !self.cfg.is_reachable(block.id) {
                continue;
            }

            let parent = self.super_of(block.id)?;

            for (index, instruction) in block.instructions.iter().enumerate() {
                let node = self.create_instruction(parent, block.id, instruction)?;

                if let Some(id) = instruction.id() {
                    self.values.insert(id, node);
                }

                let kind = match instruction {
                    Instruction::Load { addr, .. } => Some((AccessKind::Load, *addr)),
                    Instruction::Store { addr, .. } => Some((AccessKind::Store, *addr)),
                    _ => None,
                };

                if let Some((kind, addr)) = kind {
                    self.accesses.push(Access { kind, node, block: block.id, index, addr });
                }

                self.members[block.id.index()].push(node);
            }

            let op = match block.terminator {
                Terminator::Br { .. } | Terminator::CondBr { .. } => {
                    let successors = self
                        .cfg
                        .successors(block.id)
                        .iter()
                        .map(|succ| self.super_of(*succ))
                        .collect::<Result<Vec<_>>>()?;

                    InstOp::Branch { successors }
                }

                Terminator::Ret { .. } => InstOp::Return,
            };

            let node = self.builder.add_instruction(parent, op, None)?;
            self.terminators[block.id.index()] = Some(node);
        }

        Ok(())
    }

    fn create_instruction(
        &mut self,
        parent: NodeId,
        block: BlockId,
        instruction: &Instruction,
    ) -> Result<NodeId> {
        let source = instruction.id();

        let op = match instruction {
            Instruction::Phi { .. } => {
                let predecessors = self.cfg.predecessors(block).to_vec();
                return self.builder.add_phi(parent, predecessors, source);
            }

            Instruction::Binary { op, .. } => InstOp::Binary(*op),
            Instruction::Icmp { pred, .. } => InstOp::Icmp(*pred),
            Instruction::Select { .. } => InstOp::Select,
            Instruction::Alloca { ty, count, .. } => InstOp::Alloca { ty: *ty, count: *count },
            Instruction::Gep { .. } => InstOp::Gep,
            Instruction::Load { ty, .. } => InstOp::Load { ty: *ty, memory: None },
            Instruction::Store { .. } => InstOp::Store { memory: None },
            Instruction::Cast { op, ty, .. } => match op {
                CastOp::Sext => InstOp::Sext(*ty),
                CastOp::Zext => InstOp::Zext(*ty),
                CastOp::BitCast => InstOp::BitCast(*ty),
                CastOp::Trunc => InstOp::Trunc(*ty),
            },

            Instruction::Call { callee, args, .. } => {
                let split = self.builder.add_split_call();
                for _ in args {
                    self.builder.insert_argument(split)?;
                }

                let call = self.builder.add_instruction(
                    parent,
                    InstOp::Call { callee: callee.clone(), split },
                    source,
                )?;

                self.calls.push((call, split));
                return Ok(call);
            }
        };

        self.builder.add_instruction(parent, op, source)
    }

    /// The node producing `value`, leaf nodes are created on first use.
    fn value(&mut self, value: Value) -> Result<NodeId> {
        match value {
            Value::Arg(idx) => self.arguments.get(idx as usize).copied().ok_or_else(|| {
                let name = &self.func.name;
                Error::UnsupportedInput(format!("{value} is not a parameter of `{name}`"))
            }),

            Value::Global(id) => {
                if let Some(node) = self.globals.get(&id) {
                    return Ok(*node);
                }

                let Some(global) = self.func.globals.get(id.index()) else {
                    return Err(Error::UnsupportedInput(format!("unknown global {id}")));
                };

                let node = self.builder.add_global(id, global.name.clone());
                self.globals.insert(id, node);
                Ok(node)
            }

            Value::Const(it) => {
                let builder = &mut self.builder;
                Ok(*self.consts.entry(it).or_insert_with(|| builder.add_const_int(it)))
            }

            Value::Inst(id) => self.values.get(&id).copied().ok_or_else(|| {
                Error::UnsupportedInput(format!("{id} is not defined in a reachable block"))
            }),
        }
    }

    fn members_of(&self, parent: NodeId) -> Vec<NodeId> {
        self.builder.node(parent).as_super().map(|it| it.members().collect()).unwrap_or_default()
    }

    /// Branches activate their successors in declaration order, so that control input `i` of
    /// every block comes from its predecessor `i`.
    fn wire_control(&mut self) -> Result<()> {
        let func = self.func;

        let entry = self.super_of(func.entry())?;
        let split = self.builder.entry();
        self.builder.set_activate_input(entry, split)?;

        for block in &func.blocks {
            if !self.cfg.is_reachable(block.id) {
                continue;
            }

            let Some(branch) = self.terminators[block.id.index()] else {
                continue;
            };

            for &succ in self.cfg.successors(block.id) {
                let target = self.super_of(succ)?;

                let activates = self
                    .cfg
                    .predecessors(succ)
                    .iter()
                    .find(|pred| !self.cfg.is_back_edge(**pred, succ))
                    .is_some_and(|pred| *pred == block.id);

                match activates {
                    true => self.builder.set_activate_input(target, branch)?,
                    false => self.builder.connect(EdgeKind::Control, branch, target)?,
                }
            }
        }

        for parent in self.blocks.clone().into_iter().flatten() {
            for member in self.members_of(parent) {
                self.builder.connect(EdgeKind::Control, parent, member)?;
            }
        }

        for (call, split) in self.calls.clone() {
            self.builder.connect(EdgeKind::Control, call, split)?;
        }

        Ok(())
    }

    /// The condition that decided which way control went on the way to `block`.
    fn mask_condition(&self, block: BlockId) -> Option<Value> {
        let idom = self.cfg.idom(block)?;

        match self.func.block(idom).terminator {
            Terminator::CondBr { cond, if_true, if_false } if if_true != if_false => Some(cond),
            _ => None,
        }
    }

    fn wire_masks(&mut self) -> Result<()> {
        let func = self.func;

        for block in &func.blocks {
            if !self.cfg.is_reachable(block.id) {
                continue;
            }

            let parent = self.super_of(block.id)?;
            let masked = self.builder.node(parent).as_super().map(|it| it.ty())
                == Some(SuperNodeType::Mask);

            if masked {
                match self.mask_condition(block.id) {
                    Some(cond) => {
                        let value = self.value(cond)?;
                        self.builder.set_mask_source(parent, value)?;
                    }
                    None => tracing::debug!(block = %block.id, "no condition for masked block"),
                }
            }

            for member in self.members_of(parent) {
                if masked || self.builder.node(member).is(InstType::Phi) {
                    self.builder.connect(EdgeKind::Mask, parent, member)?;
                }
            }
        }

        Ok(())
    }

    fn wire_data(&mut self) -> Result<()> {
        let func = self.func;

        for block in &func.blocks {
            if !self.cfg.is_reachable(block.id) {
                continue;
            }

            let members = self.members[block.id.index()].clone();

            for (instruction, node) in block.instructions.iter().zip(members) {
                let operands = match instruction {
                    // one input per predecessor, in the order the block's control inputs are in.
                    Instruction::Phi { dest, incoming, .. } => self
                        .cfg
                        .predecessors(block.id)
                        .iter()
                        .map(|pred| {
                            let value = incoming.iter().find(|(from, _)| from == pred);
                            value.map(|it| it.1).ok_or_else(|| {
                                Error::UnsupportedInput(format!("{dest} has no value for {pred}"))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,

                    _ => {
                        let mut operands = Vec::new();
                        instruction.visit_operands(|it| operands.push(it));
                        operands
                    }
                };

                for operand in operands {
                    let src = self.value(operand)?;
                    self.builder.connect(EdgeKind::Data, src, node)?;
                }
            }

            if let Some(node) = self.terminators[block.id.index()] {
                let mut operands = Vec::new();
                block.terminator.visit_operands(|it| operands.push(it));

                for operand in operands {
                    let src = self.value(operand)?;
                    self.builder.connect(EdgeKind::Data, src, node)?;
                }
            }
        }

        Ok(())
    }

    fn unit(&mut self, region: Region) -> NodeId {
        let builder = &mut self.builder;
        *self.units.entry(region).or_insert_with(|| builder.add_memory_node(region))
    }

    /// Whether `earlier` may run before `later` in a single activation of the function.
    fn precedes(&self, earlier: &Access, later: &Access) -> bool {
        match earlier.block == later.block {
            true => earlier.index < later.index,
            false => self.cfg.forward_reaches(earlier.block, later.block),
        }
    }

    fn wire_memory(&mut self, disambiguator: &mut dyn Disambiguator) -> Result<()> {
        let accesses = std::mem::take(&mut self.accesses);

        for access in &accesses {
            let region = match disambiguator.region(access) {
                Some(region) => region,
                None if self.options.default_memory => Region(0),
                None => {
                    tracing::debug!(node = %access.node, "no memory region for access");
                    continue;
                }
            };

            let unit = self.unit(region);
            self.builder.bind_memory(access.node, unit)?;
        }

        for (idx, later) in accesses.iter().enumerate() {
            for earlier in &accesses[..idx] {
                if earlier.kind == AccessKind::Load && later.kind == AccessKind::Load {
                    continue;
                }

                if !self.precedes(earlier, later) || !disambiguator.may_alias(earlier, later) {
                    continue;
                }

                self.builder.connect(EdgeKind::Dependency, earlier.node, later.node)?;
            }
        }

        self.accesses = accesses;
        Ok(())
    }

    fn create_loops(&mut self) -> Result<()> {
        for lp in self.loops.clone() {
            let node = self.builder.add_loop();

            let head = self.super_of(lp.header)?;
            self.builder.set_loop_head(node, head)?;

            for &latch in &lp.latches {
                let latch = self.super_of(latch)?;
                self.builder.add_loop_latch(node, latch)?;
            }

            if lp.latches.len() > 1 {
                match self.options.latch_policy {
                    LatchPolicy::FanIn => self.builder.merge_latches(node)?,
                    LatchPolicy::Reject => {
                        tracing::debug!(header = %lp.header, "leaving multiple latches unmerged");
                    }
                }
            }

            for &block in &lp.body {
                let parent = self.super_of(block)?;
                self.builder.add_loop_block(node, parent)?;

                for member in self.members_of(parent) {
                    self.builder.add_loop_instruction(node, member)?;
                }
            }

            tracing::debug!(
                %node,
                header = %lp.header,
                latches = lp.latches.len(),
                blocks = lp.body.len(),
                "found loop"
            );
        }

        Ok(())
    }
}
