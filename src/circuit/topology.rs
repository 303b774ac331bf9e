//! Flow classification.
//!
//! Connectivity alone cannot tell a final product from a tailings stream: both
//! are produced by one node and consumed by none. The caller therefore names
//! the discharge flows, and every other terminal output is a product.

use std::collections::BTreeSet;

use super::flow::FlowTable;
use super::node::Node;
use super::types::{FlowClass, FlowId};
use crate::error::{Result, SplitFactorError};

/// Classification of every flow in a circuit. Each list is sorted by id and
/// the four lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Flows entering the circuit
    pub feeds: Vec<FlowId>,
    /// Flows between nodes, including recycle streams
    pub internal: Vec<FlowId>,
    /// Final concentrate streams
    pub products: Vec<FlowId>,
    /// Declared final tailings
    pub discharge: Vec<FlowId>,
}

impl Topology {
    /// Classify every flow referenced by `nodes`.
    pub fn resolve(nodes: &[Node], flows: &FlowTable, discharge: &BTreeSet<FlowId>) -> Result<Self> {
        let mut consumed = BTreeSet::new();
        let mut produced = BTreeSet::new();
        for node in nodes {
            consumed.extend(node.inputs.iter().map(|&s| flows.get(s).id));
            produced.extend(node.outputs.iter().map(|&s| flows.get(s).id));
        }

        for &id in discharge {
            if flows.slot(id).is_none() {
                return Err(SplitFactorError::FlowNotFound { flow: id.0 });
            }
            if consumed.contains(&id) || !produced.contains(&id) {
                return Err(SplitFactorError::topology(format!(
                    "discharge flow {} must be produced by a node and consumed by none",
                    id
                )));
            }
        }

        let mut topology = Topology::default();
        for flow in flows.iter() {
            let id = flow.id;
            // every flow in the table is referenced by some node
            let class = match (produced.contains(&id), consumed.contains(&id)) {
                (false, _) => FlowClass::Feed,
                (true, true) => FlowClass::Internal,
                (true, false) if discharge.contains(&id) => FlowClass::Discharge,
                (true, false) => FlowClass::Product,
            };
            match class {
                FlowClass::Feed => topology.feeds.push(id),
                FlowClass::Internal => topology.internal.push(id),
                FlowClass::Product => topology.products.push(id),
                FlowClass::Discharge => topology.discharge.push(id),
            }
        }
        Ok(topology)
    }

    /// Class of a flow id, if it belongs to the circuit.
    pub fn class_of(&self, id: FlowId) -> Option<FlowClass> {
        let lists = [
            (&self.feeds, FlowClass::Feed),
            (&self.internal, FlowClass::Internal),
            (&self.products, FlowClass::Product),
            (&self.discharge, FlowClass::Discharge),
        ];
        lists
            .into_iter()
            .find(|(list, _)| list.binary_search(&id).is_ok())
            .map(|(_, class)| class)
    }

    /// Reference feed used for metrics: the feed with the lowest id.
    pub fn reference_feed(&self) -> Option<FlowId> {
        self.feeds.first().copied()
    }

    /// All flows leaving the circuit (products and discharge), sorted by id.
    pub fn outlets(&self) -> Vec<FlowId> {
        let mut out: Vec<FlowId> = self.products.iter().chain(&self.discharge).copied().collect();
        out.sort();
        out
    }
}
