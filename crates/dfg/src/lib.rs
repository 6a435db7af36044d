//! A dataflow graph for spatial targets, and the lowering from SSA into it.
//!
//! Every value, control decision and memory access becomes a [`Node`] talking through ordered,
//! typed ports. Graphs are built through a [`GraphBuilder`] and frozen into a read only
//! [`Graph`] by [`GraphBuilder::finalize`], which checks every structural invariant once.

#![forbid(unsafe_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::match_bool,
    clippy::module_name_repetitions
)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

pub mod analysis;
mod edge;
pub mod emit;
pub mod error;
mod graph;
mod id;
pub mod lower;
pub mod node;
mod port;


pub use edge::{Edge, EdgeKind, Slot};
pub use emit::{Dialect, DialectKind, PortRef, Text};
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, GraphDisplay};
pub use id::{NodeId, Uid};
pub use lower::{LatchPolicy, Options, Session};
pub use node::{
    InstOp, InstType, InstructionNode, LoopNode, MemoryNode, Node, NodeKind, NodeType, Region,
    SplitCallNode, SuperNode, SuperNodeType,
};
pub use port::{PortList, Ports};
