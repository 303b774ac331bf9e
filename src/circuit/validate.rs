//! Circuit validation.

use std::collections::BTreeMap;

use crate::error::{Result, SplitFactorError};

use super::types::FlowId;
use super::Circuit;

/// Validate a circuit for simulation.
///
/// Checks:
/// - The circuit has at least one node
/// - Every flow is produced by at most one node port
/// - Every flow is consumed by at most one node port
/// - At least one flow enters the circuit
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.nodes().is_empty() {
        return Err(SplitFactorError::topology("circuit has no nodes"));
    }

    let flows = circuit.flows();
    let mut producers: BTreeMap<FlowId, Vec<&str>> = BTreeMap::new();
    let mut consumers: BTreeMap<FlowId, Vec<&str>> = BTreeMap::new();
    for node in circuit.nodes() {
        for &slot in &node.outputs {
            producers.entry(flows.get(slot).id).or_default().push(&node.name);
        }
        for &slot in &node.inputs {
            consumers.entry(flows.get(slot).id).or_default().push(&node.name);
        }
    }

    if let Some((id, names)) = producers.iter().find(|(_, names)| names.len() > 1) {
        return Err(SplitFactorError::topology(format!(
            "flow {} is produced more than once ({})",
            id,
            names.join(", ")
        )));
    }
    if let Some((id, names)) = consumers.iter().find(|(_, names)| names.len() > 1) {
        return Err(SplitFactorError::topology(format!(
            "flow {} is consumed more than once ({})",
            id,
            names.join(", ")
        )));
    }

    if circuit.topology().feeds.is_empty() {
        return Err(SplitFactorError::topology("circuit has no feed flow"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_message(result: Result<Circuit>) -> String {
        match result {
            Err(SplitFactorError::InvalidTopology { message }) => message,
            other => panic!("expected topology error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_circuit() {
        assert!(err_message(Circuit::builder().build()).contains("no nodes"));
    }

    #[test]
    fn test_multiple_producers() {
        let result = Circuit::builder()
            .splitter("A", 1, [2, 3], 0.1, 0.5)
            .mixer("B", &[4], 2)
            .build();
        assert!(err_message(result).contains("produced more than once"));
    }

    #[test]
    fn test_multiple_consumers() {
        let result = Circuit::builder()
            .splitter("A", 1, [2, 3], 0.1, 0.5)
            .mixer("B", &[1], 4)
            .build();
        assert!(err_message(result).contains("consumed more than once"));
    }

    #[test]
    fn test_no_feed() {
        // closed loop: every flow is both produced and consumed
        let result = Circuit::builder()
            .splitter("A", 1, [2, 3], 0.1, 0.5)
            .mixer("B", &[2, 3], 1)
            .build();
        assert!(err_message(result).contains("no feed"));
    }

    #[test]
    fn test_valid_recycle() {
        let circuit = Circuit::builder()
            .mixer("Mix", &[1, 6], 4)
            .splitter("Rougher", 4, [2, 3], 0.1, 0.7)
            .splitter("Scav", 3, [6, 5], 0.2, 0.8)
            .discharge(5)
            .build()
            .unwrap();
        assert_eq!(circuit.topology().feeds, vec![FlowId(1)]);
    }
}
