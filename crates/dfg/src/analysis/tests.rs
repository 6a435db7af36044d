use weft_ir::builder::i32;
use weft_ir::{BlockId, FunctionBuilder};

use super::{Cfg, NaturalLoop};
use crate::tests::{counter, diamond, two_latches};

#[test]
fn diamond_dominators() {
    let func = diamond();
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.reverse_postorder().len(), 4);
    assert_eq!(cfg.predecessors(BlockId(3)), [BlockId(1), BlockId(2)]);
    assert_eq!(cfg.idom(BlockId(0)), None);
    assert_eq!(cfg.idom(BlockId(3)), Some(BlockId(0)));
    assert!(cfg.dominates(BlockId(0), BlockId(3)));
    assert!(!cfg.dominates(BlockId(1), BlockId(3)));

    assert!(cfg.forward_reaches(BlockId(1), BlockId(3)));
    assert!(!cfg.forward_reaches(BlockId(1), BlockId(2)));
    assert!(cfg.loops().is_empty());
}

#[test]
fn self_loop() {
    let func = counter();
    let cfg = Cfg::new(&func);

    assert!(cfg.is_back_edge(BlockId(1), BlockId(1)));
    assert!(!cfg.forward_reaches(BlockId(1), BlockId(1)));
    assert!(cfg.forward_reaches(BlockId(0), BlockId(2)));

    assert_eq!(
        cfg.loops(),
        [NaturalLoop { header: BlockId(1), latches: vec![BlockId(1)], body: vec![BlockId(1)] }]
    );
}

#[test]
fn latches_share_a_loop() {
    let func = two_latches();
    let cfg = Cfg::new(&func);

    assert_eq!(
        cfg.loops(),
        [NaturalLoop {
            header: BlockId(1),
            latches: vec![BlockId(1), BlockId(2)],
            body: vec![BlockId(1), BlockId(2)],
        }]
    );
}

#[test]
fn unreachable_blocks_are_ignored() {
    let mut b = FunctionBuilder::new("dead");

    let entry = b.block("entry");
    let dead = b.block("dead");
    let exit = b.block("exit");

    b.switch_to(entry);
    b.br(exit);

    b.switch_to(dead);
    b.br(exit);

    b.switch_to(exit);
    b.ret(Some(i32(0)));

    let func = b.finish();
    let cfg = Cfg::new(&func);

    assert!(!cfg.is_reachable(dead));
    assert_eq!(cfg.predecessors(exit), [entry]);
    assert_eq!(cfg.idom(exit), Some(entry));
    assert!(!cfg.dominates(entry, dead));
}

#[test]
fn nested_loops_outer_first() {
    let mut b = FunctionBuilder::new("nested");

    let entry = b.block("entry");
    let outer = b.block("outer");
    let inner = b.block("inner");
    let outer_latch = b.block("outer.latch");
    let exit = b.block("exit");

    b.switch_to(entry);
    b.br(outer);

    b.switch_to(outer);
    b.br(inner);

    b.switch_to(inner);
    b.cond_br(weft_ir::builder::i1(true), inner, outer_latch);

    b.switch_to(outer_latch);
    b.cond_br(weft_ir::builder::i1(false), outer, exit);

    b.switch_to(exit);
    b.ret(None);

    let func = b.finish();
    let cfg = Cfg::new(&func);
    let loops = cfg.loops();

    assert_eq!(loops.len(), 2);
    assert_eq!(loops[0].header, outer);
    assert_eq!(loops[0].body, [outer, inner, outer_latch]);
    assert_eq!(loops[1].header, inner);
    assert!(loops[0].contains(inner));
    assert!(!loops[1].contains(outer));
}
