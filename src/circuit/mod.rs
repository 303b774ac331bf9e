//! Circuit graph representation and validation.
//!
//! This module provides the internal representation of a circuit after parsing.
//! The [`Circuit`] struct holds every node and flow in flat arenas, plus the
//! flow classification needed to compute metrics.

mod flow;
mod graph;
mod node;
mod topology;
mod types;
mod validate;

pub use flow::{Flow, FlowTable};
pub use graph::{Circuit, CircuitBuilder, NodeDecl};
pub use node::{Node, NodeKind, SplitParam};
pub use topology::Topology;
pub use types::*;
pub use validate::validate_circuit;
