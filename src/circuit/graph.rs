//! Circuit graph structure.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::flow::{Flow, FlowTable};
use super::node::{Node, NodeKind, SplitParam};
use super::topology::Topology;
use super::types::{FlowId, NodeId};
use super::validate::validate_circuit;
use crate::dsl::{CircuitAst, NodeDef};
use crate::error::{Result, SplitFactorError};

/// A node description with resolved kind, before flows are allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub name: String,
    pub kind: NodeKind,
    pub inputs: Vec<FlowId>,
    pub outputs: Vec<FlowId>,
}

impl NodeDecl {
    /// Resolve a parsed node definition.
    pub fn from_def(def: &NodeDef) -> Result<Self> {
        let mut kind = NodeKind::from_keyword(&def.kind).ok_or_else(|| SplitFactorError::UnknownNodeKind {
            node: def.name.clone(),
            kind: def.kind.clone(),
        })?;

        let mut keys: Vec<&String> = def.params.keys().collect();
        keys.sort();
        for key in keys {
            let param = SplitParam::from_name(key).ok_or_else(|| {
                SplitFactorError::invalid_node(&def.name, format!("unknown parameter '{}' (line {})", key, def.line))
            })?;
            let value = def.params[key];
            match &mut kind {
                NodeKind::Splitter {
                    split_mass,
                    split_fine,
                } => match param {
                    SplitParam::Mass => *split_mass = value,
                    SplitParam::Fine => *split_fine = value,
                },
                NodeKind::Mixer => {
                    return Err(SplitFactorError::invalid_node(
                        &def.name,
                        format!("mixer takes no parameters (line {})", def.line),
                    ));
                }
            }
        }

        Ok(Self {
            name: def.name.clone(),
            kind,
            inputs: def.inputs.iter().map(|&i| FlowId(i)).collect(),
            outputs: def.outputs.iter().map(|&i| FlowId(i)).collect(),
        })
    }
}

/// Immutable part of a circuit, shared between clones.
#[derive(Debug)]
struct Layout {
    node_map: HashMap<String, NodeId>,
    discharge: BTreeSet<FlowId>,
    topology: Topology,
}

/// A complete circuit ready for simulation.
///
/// Nodes and flows live in flat arenas indexed by [`NodeId`] and
/// [`super::FlowSlot`]. Cloning copies those arenas and shares the immutable
/// layout, so a clone can be mutated without affecting the original.
#[derive(Debug, Clone)]
pub struct Circuit {
    nodes: Vec<Node>,
    flows: FlowTable,
    layout: Arc<Layout>,
}

impl Circuit {
    /// Build a circuit from a parsed AST.
    pub fn from_ast(ast: &CircuitAst) -> Result<Self> {
        let decls = ast.nodes.iter().map(NodeDecl::from_def).collect::<Result<Vec<_>>>()?;
        let discharge = ast.discharge.iter().map(|&i| FlowId(i));
        Self::new(decls, discharge, &ast.flow_names)
    }

    /// Start building a circuit programmatically.
    pub fn builder() -> CircuitBuilder {
        CircuitBuilder::default()
    }

    /// Build and validate a circuit from resolved node declarations.
    pub fn new(
        decls: Vec<NodeDecl>,
        discharge: impl IntoIterator<Item = FlowId>,
        flow_names: &BTreeMap<u32, String>,
    ) -> Result<Self> {
        let mut node_map = HashMap::new();
        for (idx, decl) in decls.iter().enumerate() {
            if node_map.insert(decl.name.clone(), NodeId(idx)).is_some() {
                return Err(SplitFactorError::DuplicateNode {
                    name: decl.name.clone(),
                });
            }
        }

        let flows = FlowTable::from_flows(default_flow_names(&decls, flow_names));

        let mut nodes = Vec::with_capacity(decls.len());
        for decl in decls {
            // every id in a decl was allocated above
            let slots = |ids: &[FlowId]| ids.iter().filter_map(|&id| flows.slot(id)).collect::<Vec<_>>();
            let inputs = slots(&decl.inputs);
            let outputs = slots(&decl.outputs);
            nodes.push(Node::new(decl.name, decl.kind, inputs, outputs)?);
        }

        let discharge: BTreeSet<FlowId> = discharge.into_iter().collect();
        let topology = Topology::resolve(&nodes, &flows, &discharge)?;

        let circuit = Circuit {
            nodes,
            flows,
            layout: Arc::new(Layout {
                node_map,
                discharge,
                topology,
            }),
        };
        validate_circuit(&circuit)?;
        Ok(circuit)
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Find a node ID by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.layout.node_map.get(name).copied()
    }

    /// The flow arena.
    pub fn flows(&self) -> &FlowTable {
        &self.flows
    }

    /// Mutable access to flow values. The flow set itself is fixed.
    pub fn flows_mut(&mut self) -> &mut FlowTable {
        &mut self.flows
    }

    /// Nodes and mutable flows together, for a recompute pass.
    pub fn split_mut(&mut self) -> (&[Node], &mut FlowTable) {
        (&self.nodes, &mut self.flows)
    }

    /// Get a flow by id.
    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.by_id(id)
    }

    /// Flow classification.
    pub fn topology(&self) -> &Topology {
        &self.layout.topology
    }

    /// Declared discharge flows.
    pub fn discharge(&self) -> &BTreeSet<FlowId> {
        &self.layout.discharge
    }

    /// Assign one split parameter. Returns `false` if the node is a mixer.
    pub fn set_param(&mut self, id: NodeId, param: SplitParam, value: f64) -> bool {
        self.nodes[id.0].set_param(param, value)
    }

    /// Override both split factors of a splitter by name.
    pub fn set_split(&mut self, name: &str, split_mass: f64, split_fine: f64) -> Result<()> {
        let id = self.find_node(name).ok_or_else(|| SplitFactorError::NodeNotFound {
            node: name.to_string(),
        })?;
        let node = &mut self.nodes[id.0];
        if !node.is_splitter() {
            return Err(SplitFactorError::NotASplitter {
                node: name.to_string(),
            });
        }
        node.set_param(SplitParam::Mass, split_mass);
        node.set_param(SplitParam::Fine, split_fine);
        Ok(())
    }
}

/// Allocate one flow per referenced id, named after the node that produces
/// it (or, for feeds, the first node that consumes it) unless named explicitly.
fn default_flow_names(decls: &[NodeDecl], explicit: &BTreeMap<u32, String>) -> Vec<Flow> {
    let mut names: BTreeMap<FlowId, String> = BTreeMap::new();
    for decl in decls {
        for &id in &decl.inputs {
            names.entry(id).or_insert_with(|| format!("Alim {}", decl.name));
        }
    }
    for decl in decls {
        for (port, &id) in decl.outputs.iter().enumerate() {
            let name = match (decl.kind, port) {
                (NodeKind::Splitter { .. }, 0) => format!("Conc {}", decl.name),
                (NodeKind::Splitter { .. }, _) => format!("Rel {}", decl.name),
                (NodeKind::Mixer, _) => format!("Mix {}", decl.name),
            };
            names.insert(id, name);
        }
    }
    for (&id, name) in explicit {
        if let Some(entry) = names.get_mut(&FlowId(id)) {
            *entry = name.clone();
        }
    }
    names.into_iter().map(|(id, name)| Flow::new(id, name)).collect()
}

/// Programmatic circuit construction.
///
/// ```
/// use splitfactor::circuit::{Circuit, FlowId};
///
/// let circuit = Circuit::builder()
///     .splitter("Jameson 1", 1, [2, 3], 0.10, 0.75)
///     .discharge(3)
///     .build()
///     .unwrap();
/// assert_eq!(circuit.topology().products, vec![FlowId(2)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CircuitBuilder {
    decls: Vec<NodeDecl>,
    discharge: Vec<FlowId>,
    flow_names: BTreeMap<u32, String>,
}

impl CircuitBuilder {
    /// Add a splitter: `outputs` is `[concentrate, reject]`.
    pub fn splitter(mut self, name: &str, input: u32, outputs: [u32; 2], split_mass: f64, split_fine: f64) -> Self {
        self.decls.push(NodeDecl {
            name: name.to_string(),
            kind: NodeKind::Splitter {
                split_mass,
                split_fine,
            },
            inputs: vec![FlowId(input)],
            outputs: outputs.iter().map(|&i| FlowId(i)).collect(),
        });
        self
    }

    /// Add a mixer.
    pub fn mixer(mut self, name: &str, inputs: &[u32], output: u32) -> Self {
        self.decls.push(NodeDecl {
            name: name.to_string(),
            kind: NodeKind::Mixer,
            inputs: inputs.iter().map(|&i| FlowId(i)).collect(),
            outputs: vec![FlowId(output)],
        });
        self
    }

    /// Declare a final tailings flow.
    pub fn discharge(mut self, flow: u32) -> Self {
        self.discharge.push(FlowId(flow));
        self
    }

    /// Give a flow an explicit display name.
    pub fn flow_name(mut self, flow: u32, name: &str) -> Self {
        self.flow_names.insert(flow, name.to_string());
        self
    }

    /// Build and validate the circuit.
    pub fn build(self) -> Result<Circuit> {
        Circuit::new(self.decls, self.discharge, &self.flow_names)
    }
}
