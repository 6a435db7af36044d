use weft_ir::{BlockId, InstId};

use super::{Dialect, DialectKind, Text};
use crate::error::PortQuery;
use crate::lower::SingleRegion;
use crate::tests::{call, counter, diamond};
use crate::{Error, Graph, InstType, NodeId, NodeType, Session, Slot};

fn lower(func: &weft_ir::Function) -> Graph {
    Session::default().lower(func, &mut SingleRegion).unwrap()
}

#[test]
fn phi_and_block_ports() {
    let graph = lower(&diamond());
    let text = Text::default();

    let phi = graph.value(InstId(2)).unwrap().id();
    let merge = graph.block(BlockId(3)).unwrap().id();

    assert_eq!(graph.print_definition(phi, &text).unwrap(), "phi_11 = phi");
    assert_eq!(
        graph.print_input_data(phi, None, &text).unwrap(),
        "phi_11.data_in[0], phi_11.data_in[1]"
    );
    assert_eq!(graph.print_input_data(phi, Some(1), &text).unwrap(), "phi_11.data_in[1]");
    assert_eq!(
        graph.print_input_data(phi, Some(2), &text),
        Err(Error::InvalidPortReference {
            node: phi,
            slot: Slot::DataInput,
            query: PortQuery::Index(2)
        })
    );

    assert_eq!(graph.print_mask_input(phi, &text).unwrap(), "phi_11.dep_in[0]");
    assert_eq!(
        graph.print_mask_output(merge, None, &text).unwrap(),
        "bb_4.dep_out[0], bb_4.dep_out[1]"
    );
    assert_eq!(graph.print_activate_enable(merge, &text).unwrap(), "bb_4.ctrl_in[0]");
    assert_eq!(graph.print_definition(merge, &text).unwrap(), "bb_4 = block bb3 mask");

    assert_eq!(
        graph.print_output_data(merge, None, &text),
        Err(Error::InvalidPortReference {
            node: merge,
            slot: Slot::DataOutput,
            query: PortQuery::Missing
        })
    );

    assert!(graph.print_mask_input(merge, &text).is_err());
    assert!(graph.print_activate_enable(phi, &text).is_err());

    let zero = graph.of_type(NodeType::ConstantInt).next().unwrap().id();
    assert_eq!(graph.print_definition(zero, &text).unwrap(), "const_13 = const i32 0");
    assert!(graph.print_input_enable(zero, None, &text).is_err());
}

#[test]
fn unknown_nodes_are_not_found() {
    let graph = lower(&call());
    let text = Text::default();

    // one past the end, and one from a much bigger graph.
    for id in [NodeId(graph.nodes().len() as u32), NodeId(10_000)] {
        assert_eq!(graph.print_definition(id, &text), None);
        assert_eq!(
            graph.print_input_data(id, None, &text),
            Err(Error::InvalidPortReference {
                node: id,
                slot: Slot::DataInput,
                query: PortQuery::Foreign
            })
        );

        assert!(graph.print_input_enable(id, Some(0), &text).is_err());
        assert!(graph.print_output_enable(id, None, &text).is_err());
        assert!(graph.print_output_data(id, None, &text).is_err());
        assert!(graph.print_mask_input(id, &text).is_err());
        assert!(graph.print_mask_output(id, None, &text).is_err());
        assert!(graph.print_activate_enable(id, &text).is_err());
    }
}

#[test]
fn loops_enable_through_head_and_latch() {
    let graph = lower(&counter());
    let text = Text::default();

    let lp = graph.of_type(NodeType::LoopNode).next().unwrap().id();

    assert_eq!(graph.print_definition(lp, &text).unwrap(), "loop_13 = loop head=bb_2 blocks=1");
    assert_eq!(
        graph.print_input_enable(lp, None, &text).unwrap(),
        "bb_2.ctrl_in[0], bb_2.ctrl_in[1]"
    );
    assert_eq!(
        graph.print_output_enable(lp, None, &text).unwrap(),
        "br_9.ctrl_out[0], br_9.ctrl_out[1]"
    );
    assert!(graph.print_input_data(lp, None, &text).is_err());
}

#[test]
fn split_outputs_follow_argument_order() {
    let graph = lower(&call());
    let text = Text::default();

    let call = graph.instructions(InstType::Call).next().unwrap();
    let split = match call.as_instruction().unwrap().op() {
        crate::InstOp::Call { split, .. } => *split,
        _ => unreachable!(),
    };

    assert_eq!(graph.print_definition(split, &text).unwrap(), "split_call_3 = split 3");
    assert_eq!(graph.print_output_data(split, Some(2), &text).unwrap(), "split_call_3.data_out[2]");
    assert!(matches!(
        graph.print_output_data(split, Some(3), &text),
        Err(Error::InvalidPortReference { query: PortQuery::Index(3), .. })
    ));

    // asking again hands out the same port.
    assert_eq!(graph.print_output_data(split, Some(2), &text).unwrap(), "split_call_3.data_out[2]");
    assert_eq!(graph.print_input_enable(split, None, &text).unwrap(), "split_call_3.ctrl_in[0]");
}

#[test]
fn renderers_share_a_graph() {
    let graph = lower(&diamond());
    let expected = graph.emit(&Text::default());

    assert_eq!(expected.lines().count(), graph.nodes().len() + graph.edges().len());

    let outputs = std::thread::scope(|scope| {
        let handles: Vec<_> = [DialectKind::Dot, DialectKind::Json]
            .into_iter()
            .map(|kind| {
                let graph = &graph;
                scope.spawn(move || {
                    let dialect = Text(kind);
                    assert_eq!(dialect.kind(), kind);
                    graph.emit(&dialect)
                })
            })
            .collect();

        handles.into_iter().map(|it| it.join().unwrap()).collect::<Vec<_>>()
    });

    for output in outputs {
        assert_eq!(output, expected);
    }
}
