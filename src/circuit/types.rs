//! Core types for circuit representation.

use std::fmt;

/// A flow identifier as written in the circuit description.
/// Unique within a circuit; ordering follows the numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a node in the circuit's node arena (declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U{}", self.0)
    }
}

/// Index of a flow in the circuit's flow arena.
///
/// Slots are assigned in ascending [`FlowId`] order, so slot order and id
/// order agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowSlot(pub usize);

/// Role of a flow in the circuit, derived from connectivity and the declared
/// discharge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlowClass {
    /// Produced by no node, consumed by some node
    Feed,
    /// Produced by one node and consumed by another (intermediate or recycle)
    Internal,
    /// Produced by a node, consumed by none, not declared discharge
    Product,
    /// Declared final tailings
    Discharge,
}

impl fmt::Display for FlowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowClass::Feed => "feed",
            FlowClass::Internal => "internal",
            FlowClass::Product => "product",
            FlowClass::Discharge => "discharge",
        };
        f.write_str(name)
    }
}
