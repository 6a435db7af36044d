//! Control flow facts the lowering needs: predecessors, dominators and natural loops.

use weft_ir::{BlockId, Function};

#[cfg(test)]
mod tests;

/// A natural loop, everything that can reach one of `latches` without going through `header`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NaturalLoop {
    pub header: BlockId,
    /// Sources of the back edges into `header`, in declaration order.
    pub latches: Vec<BlockId>,
    /// Every block in the loop, `header` included, in declaration order.
    pub body: Vec<BlockId>,
}

impl NaturalLoop {
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.body.binary_search(&block).is_ok()
    }
}

/// The control flow graph of one function, restricted to what's reachable from the entry.
#[derive(Debug, Clone)]
pub struct Cfg {
    successors: Vec<Vec<BlockId>>,
    predecessors: Vec<Vec<BlockId>>,
    rpo: Vec<BlockId>,
    rpo_index: Vec<Option<u32>>,
    idom: Vec<Option<BlockId>>,
}

impl Cfg {
    #[must_use]
    pub fn new(func: &Function) -> Self {
        let len = func.blocks.len();

        let successors: Vec<Vec<BlockId>> = func
            .blocks
            .iter()
            .map(|block| {
                let mut succs: Vec<BlockId> = Vec::with_capacity(2);
                for succ in block.terminator.successors() {
                    if !succs.contains(&succ) {
                        succs.push(succ);
                    }
                }

                succs
            })
            .collect();

        let rpo = reverse_postorder(&successors, func.entry());

        let mut rpo_index = vec![None; len];
        for (idx, block) in rpo.iter().enumerate() {
            rpo_index[block.index()] = Some(idx as u32);
        }

        // unreachable blocks don't count as predecessors of anything.
        let mut predecessors = vec![Vec::new(); len];
        for block in &func.blocks {
            if rpo_index[block.id.index()].is_none() {
                continue;
            }

            for &succ in &successors[block.id.index()] {
                predecessors[succ.index()].push(block.id);
            }
        }

        let mut this = Self { successors, predecessors, rpo, rpo_index, idom: vec![None; len] };
        this.idom = this.dominators();
        this
    }

    /// Distinct successors, in the order the terminator declares them.
    #[must_use]
    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        &self.successors[block.index()]
    }

    /// Reachable predecessors, in declaration order.
    #[must_use]
    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        &self.predecessors[block.index()]
    }

    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.rpo_index[block.index()].is_some()
    }

    #[must_use]
    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.rpo
    }

    /// The immediate dominator of `block`, `None` for the entry and for unreachable blocks.
    #[must_use]
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom[block.index()]
    }

    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }

        let mut current = Some(b);
        while let Some(block) = current {
            if block == a {
                return true;
            }

            current = self.idom(block);
        }

        false
    }

    #[must_use]
    pub fn is_back_edge(&self, from: BlockId, to: BlockId) -> bool {
        self.dominates(to, from)
    }

    /// An edge that goes backwards in reverse postorder without being a back edge, its target is
    /// the entry of an irreducible cycle.
    #[must_use]
    pub fn is_irreducible_edge(&self, from: BlockId, to: BlockId) -> bool {
        match (self.rpo_index[from.index()], self.rpo_index[to.index()]) {
            (Some(from_idx), Some(to_idx)) => to_idx <= from_idx && !self.dominates(to, from),
            _ => false,
        }
    }

    /// Whether `to` is reachable from `from` without taking a back edge.
    ///
    /// A block doesn't forward-reach itself.
    #[must_use]
    pub fn forward_reaches(&self, from: BlockId, to: BlockId) -> bool {
        let mut seen = vec![false; self.successors.len()];
        let mut stack = vec![from];

        while let Some(block) = stack.pop() {
            for &succ in self.successors(block) {
                if seen[succ.index()] || self.is_back_edge(block, succ) {
                    continue;
                }

                if succ == to {
                    return true;
                }

                seen[succ.index()] = true;
                stack.push(succ);
            }
        }

        false
    }

    /// Every natural loop, outer loops before the loops they contain.
    #[must_use]
    pub fn loops(&self) -> Vec<NaturalLoop> {
        let mut loops: Vec<NaturalLoop> = Vec::new();

        for &header in &self.rpo {
            let latches: Vec<BlockId> = self
                .predecessors(header)
                .iter()
                .copied()
                .filter(|pred| self.is_back_edge(*pred, header))
                .collect();

            if latches.is_empty() {
                continue;
            }

            let mut in_body = vec![false; self.successors.len()];
            in_body[header.index()] = true;

            let mut stack = latches.clone();
            while let Some(block) = stack.pop() {
                if std::mem::replace(&mut in_body[block.index()], true) {
                    continue;
                }

                stack.extend(self.predecessors(block).iter().copied());
            }

            let body = (0..in_body.len())
                .filter(|idx| in_body[*idx])
                .map(|idx| BlockId(idx as u32))
                .collect();

            loops.push(NaturalLoop { header, latches, body });
        }

        // a loop nested in another one always has the smaller body.
        loops.sort_by(|a, b| b.body.len().cmp(&a.body.len()).then(a.header.cmp(&b.header)));
        loops
    }

    /// Cooper, Harvey and Kennedy's "A Simple, Fast Dominance Algorithm".
    fn dominators(&self) -> Vec<Option<BlockId>> {
        let mut idom: Vec<Option<BlockId>> = vec![None; self.successors.len()];

        let Some(&entry) = self.rpo.first() else {
            return idom;
        };

        idom[entry.index()] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;

            for &block in &self.rpo[1..] {
                let mut new_idom = None;
                for &pred in self.predecessors(block) {
                    if idom[pred.index()].is_none() {
                        continue;
                    }

                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(other) => self.intersect(&idom, pred, other),
                    });
                }

                if new_idom.is_some() && idom[block.index()] != new_idom {
                    idom[block.index()] = new_idom;
                    changed = true;
                }
            }
        }

        idom[entry.index()] = None;
        idom
    }

    fn intersect(&self, idom: &[Option<BlockId>], mut a: BlockId, mut b: BlockId) -> BlockId {
        let order = |block: BlockId| self.rpo_index[block.index()].unwrap_or(u32::MAX);

        while a != b {
            while order(a) > order(b) {
                a = idom[a.index()].unwrap_or(a);
            }

            while order(b) > order(a) {
                b = idom[b.index()].unwrap_or(b);
            }
        }

        a
    }
}

fn reverse_postorder(successors: &[Vec<BlockId>], entry: BlockId) -> Vec<BlockId> {
    let mut visited = vec![false; successors.len()];
    let mut postorder = Vec::with_capacity(successors.len());

    // (block, next successor to visit)
    let mut stack = vec![(entry, 0)];
    visited[entry.index()] = true;

    while let Some((block, next)) = stack.last_mut() {
        let block = *block;
        match successors[block.index()].get(*next) {
            Some(&succ) => {
                *next += 1;
                if !std::mem::replace(&mut visited[succ.index()], true) {
                    stack.push((succ, 0));
                }
            }
            None => {
                postorder.push(block);
                stack.pop();
            }
        }
    }

    postorder.reverse();
    postorder
}
