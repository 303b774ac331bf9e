//! Processing units: splitters (flotation cells) and mixers.
//!
//! A node reads its declared input flows and overwrites its declared output
//! flows. It never touches any other flow, which is what makes repeated full
//! passes over the circuit a well-defined fixed-point iteration.

use std::fmt;

use super::flow::FlowTable;
use super::types::FlowSlot;
use crate::error::{Result, SplitFactorError};

/// A sampled or configured splitter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SplitParam {
    /// Fraction of input mass routed to the concentrate
    Mass,
    /// Fraction of input fine content routed to the concentrate
    Fine,
}

impl SplitParam {
    /// Both parameters, in sampling order.
    pub const ALL: [SplitParam; 2] = [SplitParam::Mass, SplitParam::Fine];

    /// Canonical parameter name.
    pub fn name(self) -> &'static str {
        match self {
            SplitParam::Mass => "mass-fraction",
            SplitParam::Fine => "fine-fraction",
        }
    }

    /// Parse a parameter name or its short alias.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mass" | "mass-fraction" | "sp_masa" => Some(SplitParam::Mass),
            "fine" | "fine-fraction" | "cuf" | "sp_cuf" => Some(SplitParam::Fine),
            _ => None,
        }
    }
}

impl fmt::Display for SplitParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behaviour of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// One input, two outputs: `[concentrate, reject]`.
    Splitter { split_mass: f64, split_fine: f64 },
    /// N inputs summed into one output.
    Mixer,
}

impl NodeKind {
    /// Parse a node kind keyword. Splitters start with zero split factors.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "cell" | "splitter" | "celda" => Some(NodeKind::Splitter {
                split_mass: 0.0,
                split_fine: 0.0,
            }),
            "mixer" | "sum" | "suma" => Some(NodeKind::Mixer),
            _ => None,
        }
    }
}

/// A processing unit in the circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique node name
    pub name: String,
    /// Input flow slots, in declaration order
    pub inputs: Vec<FlowSlot>,
    /// Output flow slots, in declaration order
    pub outputs: Vec<FlowSlot>,
    /// Node behaviour and parameters
    pub kind: NodeKind,
}

impl Node {
    /// Create a node, checking the port counts its kind requires.
    pub fn new(
        name: impl Into<String>,
        kind: NodeKind,
        inputs: Vec<FlowSlot>,
        outputs: Vec<FlowSlot>,
    ) -> Result<Self> {
        let name = name.into();
        match kind {
            NodeKind::Splitter { .. } => {
                if inputs.len() != 1 {
                    return Err(SplitFactorError::invalid_node(
                        &name,
                        format!("splitter needs exactly 1 input, got {}", inputs.len()),
                    ));
                }
                if outputs.len() != 2 {
                    return Err(SplitFactorError::invalid_node(
                        &name,
                        format!("splitter needs exactly 2 outputs, got {}", outputs.len()),
                    ));
                }
            }
            NodeKind::Mixer => {
                if inputs.is_empty() {
                    return Err(SplitFactorError::invalid_node(&name, "mixer needs at least 1 input"));
                }
                if outputs.len() != 1 {
                    return Err(SplitFactorError::invalid_node(
                        &name,
                        format!("mixer needs exactly 1 output, got {}", outputs.len()),
                    ));
                }
            }
        }
        Ok(Self {
            name,
            inputs,
            outputs,
            kind,
        })
    }

    /// True for splitters.
    pub fn is_splitter(&self) -> bool {
        matches!(self.kind, NodeKind::Splitter { .. })
    }

    /// Current value of a split parameter, or `None` for mixers.
    pub fn param(&self, param: SplitParam) -> Option<f64> {
        match (self.kind, param) {
            (NodeKind::Splitter { split_mass, .. }, SplitParam::Mass) => Some(split_mass),
            (NodeKind::Splitter { split_fine, .. }, SplitParam::Fine) => Some(split_fine),
            (NodeKind::Mixer, _) => None,
        }
    }

    /// Assign a split parameter. Returns `false` (and changes nothing) for mixers.
    pub fn set_param(&mut self, param: SplitParam, value: f64) -> bool {
        match (&mut self.kind, param) {
            (NodeKind::Splitter { split_mass, .. }, SplitParam::Mass) => *split_mass = value,
            (NodeKind::Splitter { split_fine, .. }, SplitParam::Fine) => *split_fine = value,
            (NodeKind::Mixer, _) => return false,
        }
        true
    }

    /// Recompute output flows from the current input flows.
    pub fn recompute(&self, flows: &mut FlowTable) {
        match self.kind {
            NodeKind::Splitter {
                split_mass,
                split_fine,
            } => {
                let input = flows.get(self.inputs[0]);
                let (mass, fine) = (input.mass, input.fine);

                let conc = flows.get_mut(self.outputs[0]);
                conc.mass = mass * split_mass;
                conc.fine = fine * split_fine;
                conc.derive_grade_from_mass_fine();

                let reject = flows.get_mut(self.outputs[1]);
                reject.mass = mass * (1.0 - split_mass);
                reject.fine = fine * (1.0 - split_fine);
                reject.derive_grade_from_mass_fine();
            }
            NodeKind::Mixer => {
                let (mass, fine) = self.inputs.iter().fold((0.0, 0.0), |(m, f), &slot| {
                    let input = flows.get(slot);
                    (m + input.mass, f + input.fine)
                });

                let out = flows.get_mut(self.outputs[0]);
                out.mass = mass;
                out.fine = fine;
                out.derive_grade_from_mass_fine();
            }
        }
    }
}
