use expect_test::expect;
use weft_ir::{BlockId, Function, InstId};

use super::{
    Access, AccessKind, Disambiguator, LatchPolicy, NoAlias, Options, Session, SingleRegion,
};
use crate::error::LoopDefect;
use crate::tests::{
    call, conditional_store, counter, diamond, init_tracing, store_then_load, two_entries,
    two_latches,
};
use crate::{
    EdgeKind, Error, Graph, InstType, NodeId, NodeType, Region, Result, Slot, SuperNodeType,
};

static_assertions::assert_impl_all!(Graph: Send, Sync);

fn lower(func: &Function) -> Result<Graph> {
    init_tracing();
    Session::default().lower(func, &mut SingleRegion)
}

/// Leaves every access unbound.
struct Nowhere;

impl Disambiguator for Nowhere {
    fn region(&mut self, _access: &Access) -> Option<Region> {
        None
    }

    fn may_alias(&mut self, _earlier: &Access, _later: &Access) -> bool {
        false
    }
}

/// Every edge sits in the port lists its kind lands in, at the indices it recorded.
#[track_caller]
fn assert_ports_consistent(graph: &Graph) {
    for edge in graph.edges() {
        let (src_slot, dst_slot) = edge.kind.slots();

        assert_eq!(graph.node(edge.src).ports().get(src_slot).get(edge.src_port), Some(edge.dst));
        assert_eq!(graph.node(edge.dst).ports().get(dst_slot).get(edge.dst_port), Some(edge.src));
    }

    let entries: usize = graph.nodes().iter().map(|it| it.ports().total()).sum();
    assert_eq!(entries, graph.edges().len() * 2);
}

/// Every member of a block is reachable over control edges from the block's activation.
#[track_caller]
fn assert_activated(graph: &Graph) {
    for block in graph.of_type(NodeType::SuperNode) {
        let activate = block.as_super().and_then(|it| it.activate_input()).unwrap();

        let mut reached = vec![activate];
        let mut stack = vec![activate];
        while let Some(node) = stack.pop() {
            for next in graph.node(node).ports().control_outputs() {
                if !reached.contains(next) {
                    reached.push(*next);
                    stack.push(*next);
                }
            }
        }

        for member in block.as_super().unwrap().members() {
            assert!(reached.contains(&member), "{member} is never activated");
        }
    }
}

#[track_caller]
fn assert_memory_symmetric(graph: &Graph) {
    for unit in graph.of_type(NodeType::MemoryUnit) {
        let ports = unit.ports();
        assert_eq!(ports.len(Slot::ReadRequest), ports.len(Slot::ReadResponse));
        assert_eq!(ports.len(Slot::WriteRequest), ports.len(Slot::WriteResponse));
    }

    for ty in [InstType::Load, InstType::Store] {
        for access in graph.instructions(ty) {
            let unit = access.as_instruction().and_then(|it| it.memory()).unwrap();
            let (request, response) = match ty {
                InstType::Load => (Slot::ReadRequest, Slot::ReadResponse),
                _ => (Slot::WriteRequest, Slot::WriteResponse),
            };

            let ports = graph.node(unit).ports();
            let count = |slot| ports.get(slot).iter().filter(|it| *it == access.id()).count();
            assert_eq!((count(request), count(response)), (1, 1));
        }
    }
}

#[track_caller]
fn assert_invariants(graph: &Graph) {
    assert_ports_consistent(graph);
    assert_activated(graph);
    assert_memory_symmetric(graph);
}

#[test]
fn if_else_merges_through_a_masked_block() {
    let graph = lower(&diamond()).unwrap();
    assert_invariants(&graph);

    let masked: Vec<_> = graph
        .of_type(NodeType::SuperNode)
        .filter(|it| it.as_super().unwrap().ty() == SuperNodeType::Mask)
        .map(|it| it.id())
        .collect();

    let merge = graph.block(BlockId(3)).unwrap();
    assert_eq!(masked, [merge.id()]);

    let merge_block = merge.as_super().unwrap();
    assert_eq!(merge_block.num_phi(), 1);

    let phi = graph.value(InstId(2)).unwrap();
    let phi_node = phi.as_instruction().unwrap();
    assert_eq!(phi_node.mask(), Some(merge.id()));

    // the phi's mask traces back to the value the entry block branches on.
    let cond = graph.value(InstId(0)).unwrap().id();
    let branch = graph.block(BlockId(0)).unwrap().as_super().unwrap().instructions()[1];
    assert_eq!(merge_block.mask_source(), Some(cond));
    assert!(graph.has_edge(EdgeKind::Data, cond, branch));
    assert!(graph.has_edge(EdgeKind::Mask, merge.id(), phi.id()));

    // inputs in block declaration order, `then` before `else`.
    let negated = graph.value(InstId(1)).unwrap().id();
    let x = graph.node(graph.entry()).as_split_call().unwrap().arguments()[0];
    assert_eq!(phi.ports().data_inputs(), [negated, x]);

    let then_branch = graph.block(BlockId(1)).unwrap().as_super().unwrap().instructions()[1];
    assert_eq!(merge_block.activate_input(), Some(then_branch));
    assert_eq!(merge.ports().control_inputs().len(), 2);
}

#[test]
fn if_else_snapshot() {
    let graph = lower(&diamond()).unwrap();

    expect![[r#"
        graph abs
        n0 split_call_0 = split_call [n5]
            ctrl_out: n1
        n1 bb_1 = block bb0 nomask activate=n0
            ctrl_in: n0
            ctrl_out: n6 n7
        n2 bb_2 = block bb1 nomask activate=n7
            ctrl_in: n7
            ctrl_out: n8 n9
        n3 bb_3 = block bb2 nomask activate=n7
            ctrl_in: n7
            ctrl_out: n10
        n4 bb_4 = block bb3 mask activate=n9 mask=n6
            data_in: n6
            ctrl_in: n9 n10
            ctrl_out: n11 n12
            dep_out: n11 n12
        n5 arg_5 = arg 0 of n0
            data_out: n6 n8 n11
        n6 icmp_6 = icmp slt in n1
            data_in: n5 n13
            data_out: n4 n7
            ctrl_in: n1
        n7 br_7 = br n2 n3 in n1
            data_in: n6
            ctrl_in: n1
            ctrl_out: n2 n3
        n8 binaryOp_8 = sub in n2
            data_in: n13 n5
            data_out: n11
            ctrl_in: n2
        n9 br_9 = br n4 in n2
            ctrl_in: n2
            ctrl_out: n4
        n10 br_10 = br n4 in n3
            ctrl_in: n3
            ctrl_out: n4
        n11 phi_11 = phi mask=n4 from bb1 bb2 in n4
            data_in: n8 n5
            data_out: n12
            ctrl_in: n4
            dep_in: n4
        n12 ret_12 = ret in n4
            data_in: n11
            ctrl_in: n4
            dep_in: n4
        n13 const_13 = const i32 0
            data_out: n6 n8"#]]
    .assert_eq(&graph.display().to_string());
}

#[test]
fn self_loop_fans_in_twice() {
    let graph = lower(&counter()).unwrap();
    assert_invariants(&graph);

    let head = graph.block(BlockId(1)).unwrap();
    assert_eq!(head.as_super().unwrap().ty(), SuperNodeType::LoopHead);
    assert_eq!(head.ports().control_inputs().len(), 2);

    let lp = graph.of_type(NodeType::LoopNode).next().unwrap();
    let lp_node = lp.as_loop().unwrap();
    assert_eq!(lp_node.head(), Some(head.id()));
    assert_eq!(lp_node.latch(), Some(head.id()));
    assert_eq!(lp_node.blocks(), [head.id()]);
    assert_eq!(head.as_super().unwrap().parent_loop(), Some(lp.id()));

    // initial value from the preheader, then the update from the latch.
    let phi = graph.value(InstId(0)).unwrap();
    let next = graph.value(InstId(1)).unwrap().id();
    let [initial, updated] = phi.ports().data_inputs() else {
        panic!("phi should have two inputs");
    };

    assert_eq!(graph.node(*initial).ty(), NodeType::ConstantInt);
    assert_eq!(*updated, next);
}

#[test]
fn multiple_latches_need_merging() {
    let func = two_latches();
    init_tracing();

    let err = Session::new(Options::strict()).lower(&func, &mut SingleRegion).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedLoopStructure { defect: LoopDefect::AmbiguousLatches(2), .. }
    ));

    let options = Options { latch_policy: LatchPolicy::FanIn, ..Options::strict() };
    let graph = Session::new(options).lower(&func, &mut SingleRegion).unwrap();
    assert_invariants(&graph);

    let head = graph.block(BlockId(1)).unwrap();
    assert_eq!(head.ports().control_inputs().len(), 3);

    let lp = graph.of_type(NodeType::LoopNode).next().unwrap().as_loop().unwrap();
    assert!(lp.latches_merged());
    assert_eq!(lp.latch(), None);
    assert_eq!(lp.latches().len(), 2);
}

#[test]
fn loop_entries_merge_in_a_preheader() {
    let func = two_entries();

    for options in [Options::strict(), Options::permissive()] {
        init_tracing();
        let graph = Session::new(options).lower(&func, &mut SingleRegion).unwrap();
        assert_invariants(&graph);

        let head = graph.block(BlockId(2)).unwrap();
        assert_eq!(head.ports().control_inputs().len(), 2);

        // appended after the function's own blocks.
        let preheader = graph.block(BlockId(4)).unwrap();
        let preheader_block = preheader.as_super().unwrap();
        assert_eq!(preheader_block.ty(), SuperNodeType::Mask);
        assert_eq!(preheader_block.num_phi(), 1);
        assert_eq!(preheader.ports().control_inputs().len(), 2);

        let mask = preheader_block.mask_source().unwrap();
        assert_eq!(graph.node(mask).ty(), NodeType::FunctionArgument);

        // picks between the two entry constants, in declaration order of the entering blocks.
        let entry_phi = graph.value(InstId(3)).unwrap();
        let inputs = entry_phi.ports().data_inputs();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().all(|it| graph.node(*it).ty() == NodeType::ConstantInt));

        // the header phi sees the loop's own update first, then the merged entry value.
        let phi = graph.value(InstId(0)).unwrap();
        let next = graph.value(InstId(1)).unwrap();
        assert_eq!(phi.ports().data_inputs(), [next.id(), entry_phi.id()]);

        let lp = graph.of_type(NodeType::LoopNode).next().unwrap().as_loop().unwrap();
        assert_eq!(lp.head(), Some(head.id()));
        assert_eq!(lp.latch(), Some(head.id()));
        assert!(!lp.contains_block(preheader.id()));
    }
}

#[test]
fn aliasing_store_orders_the_load() {
    let func = store_then_load();

    let graph = lower(&func).unwrap();
    assert_invariants(&graph);

    let store = graph.instructions(InstType::Store).next().unwrap().id();
    let load = graph.instructions(InstType::Load).next().unwrap().id();
    assert!(graph.has_edge(EdgeKind::Dependency, store, load));

    let units: Vec<_> = graph.of_type(NodeType::MemoryUnit).collect();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].ports().get(Slot::ReadRequest).as_slice(), [load]);
    assert_eq!(units[0].ports().get(Slot::WriteResponse).as_slice(), [store]);

    let graph = Session::default().lower(&func, &mut NoAlias).unwrap();
    assert_invariants(&graph);
    assert_eq!(graph.edges_of(EdgeKind::Dependency).count(), 0);
}

#[test]
fn stores_order_across_blocks() {
    let graph = lower(&conditional_store()).unwrap();
    assert_invariants(&graph);

    let stores: Vec<NodeId> = graph.instructions(InstType::Store).map(|it| it.id()).collect();
    let &[first, second] = stores.as_slice() else {
        panic!("expected two stores");
    };

    assert!(graph.has_edge(EdgeKind::Dependency, first, second));

    // the second store is in the join, so it's gated on the mask.
    let merge = graph.block(BlockId(2)).unwrap().id();
    assert!(graph.has_edge(EdgeKind::Mask, merge, second));
    assert!(!graph.has_edge(EdgeKind::Mask, merge, first));
}

#[test]
fn unbound_memory_is_fatal_when_strict() {
    let func = store_then_load();
    init_tracing();

    let err = Session::new(Options::strict()).lower(&func, &mut Nowhere).unwrap_err();
    assert!(matches!(err, Error::UnboundMemoryAccess { .. }));

    let graph = Session::new(Options::permissive()).lower(&func, &mut Nowhere).unwrap();
    assert_invariants(&graph);

    let unit = graph.of_type(NodeType::MemoryUnit).next().unwrap();
    assert_eq!(unit.as_memory().unwrap().region(), Region(0));
}

#[test]
fn disambiguator_sees_program_order() {
    #[derive(Default)]
    struct Record(Vec<(AccessKind, AccessKind)>);

    impl Disambiguator for Record {
        fn region(&mut self, _access: &Access) -> Option<Region> {
            Some(Region(7))
        }

        fn may_alias(&mut self, earlier: &Access, later: &Access) -> bool {
            self.0.push((earlier.kind, later.kind));
            false
        }
    }

    let mut record = Record::default();
    let graph = Session::default().lower(&store_then_load(), &mut record).unwrap();

    assert_eq!(record.0, [(AccessKind::Store, AccessKind::Load)]);
    assert_eq!(graph.of_type(NodeType::MemoryUnit).count(), 1);
}

#[test]
fn calls_split_their_arguments() {
    let graph = lower(&call()).unwrap();
    assert_invariants(&graph);

    let call = graph.instructions(InstType::Call).next().unwrap();
    let crate::InstOp::Call { callee, split } = call.as_instruction().unwrap().op() else {
        panic!("not a call");
    };

    assert_eq!(callee, "callee");
    assert!(graph.has_edge(EdgeKind::Control, call.id(), *split));

    let arguments = graph.node(*split).as_split_call().unwrap().arguments();
    assert_eq!(arguments.len(), 3);
    assert_eq!(call.ports().data_inputs().len(), 3);

    for (idx, arg) in arguments.iter().enumerate() {
        let arg = graph.node(*arg);
        assert_eq!(arg.ty(), NodeType::FunctionArgument);
        assert!(matches!(arg.kind(), crate::NodeKind::Argument(it) if it.index == idx as u32));
    }
}

#[test]
fn port_indices_are_stable() {
    let graph = lower(&diamond()).unwrap();

    for node in graph.nodes() {
        for &input in node.ports().data_inputs() {
            let first = node.data_input_port_index(input).unwrap();
            assert_eq!(node.data_input_port_index(input), Ok(first));
            assert_eq!(node.ports().data_inputs()[first as usize], input);
        }
    }
}

#[test]
fn names_are_unique_per_session() {
    let func = diamond();
    let mut session = Session::default();

    let first = session.lower(&func, &mut SingleRegion).unwrap();
    let second = session.lower(&func, &mut SingleRegion).unwrap();

    let mut names: Vec<&str> =
        first.nodes().iter().chain(second.nodes()).map(|it| it.name()).collect();
    let count = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), count);

    session.reset();
    let third = session.lower(&func, &mut SingleRegion).unwrap();
    assert_eq!(first, third);
}

#[test]
fn unreachable_blocks_are_skipped() {
    let mut b = weft_ir::FunctionBuilder::new("dead");
    let entry = b.block("entry");
    let dead = b.block("dead");

    b.switch_to(entry);
    b.ret(None);

    b.switch_to(dead);
    let _ = b.add(weft_ir::builder::i32(1), weft_ir::builder::i32(2));
    b.ret(None);

    let graph = lower(&b.finish()).unwrap();
    assert!(graph.block(dead).is_none());
    assert_eq!(graph.of_type(NodeType::Instruction).count(), 1);
}
