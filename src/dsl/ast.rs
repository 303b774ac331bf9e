//! Abstract Syntax Tree types for the circuit DSL.

use std::collections::{BTreeMap, HashMap};

/// Complete AST representation of a parsed circuit file.
#[derive(Debug, Clone, Default)]
pub struct CircuitAst {
    /// Node definitions, in file order
    pub nodes: Vec<NodeDef>,
    /// Explicit flow display names (`.flow`)
    pub flow_names: BTreeMap<u32, String>,
    /// Feed conditions (`.feed`)
    pub feeds: Vec<FeedDef>,
    /// Declared final tailings flow ids (`.discharge`)
    pub discharge: Vec<u32>,
    /// Fixed-point pass count (`.passes`)
    pub passes: Option<usize>,
    /// Monte Carlo directives
    pub montecarlo: MonteCarloDef,
    /// Split-factor overrides grouped into scenarios (`.scenario`)
    pub scenarios: Vec<ScenarioDef>,
}

impl CircuitAst {
    /// Create a new empty circuit AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A node definition from the DSL.
#[derive(Debug, Clone)]
pub struct NodeDef {
    /// Kind keyword as written (`cell`, `mixer`, ...)
    pub kind: String,
    /// Unique node name
    pub name: String,
    /// Input flow ids, in order
    pub inputs: Vec<u32>,
    /// Output flow ids, in order (`[concentrate, reject]` for cells)
    pub outputs: Vec<u32>,
    /// Named parameters (`mass=`, `fine=`)
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

/// Feed condition for one flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedDef {
    pub flow: u32,
    pub mass: f64,
    pub grade: f64,
    pub line: usize,
}

/// Monte Carlo settings collected from directives.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloDef {
    /// Sampling ranges per target node (`.vary`)
    pub vary: Vec<VaryDef>,
    /// Trial count (`.trials`)
    pub trials: Option<usize>,
    /// RNG seed (`.seed`)
    pub seed: Option<u64>,
    /// Lower concentrate grade bound (`.grade` / `.grade_min`)
    pub grade_min: Option<f64>,
    /// Upper concentrate grade bound (`.grade` / `.grade_max`)
    pub grade_max: Option<f64>,
    /// Per-flow grade sanity ceiling (`.ceiling`)
    pub ceiling: Option<f64>,
    /// Selectivity post-filter (`.selectivity`)
    pub selectivity: Option<SelectivityDef>,
}

/// Sampling ranges for one target node.
#[derive(Debug, Clone)]
pub struct VaryDef {
    pub node: String,
    /// (parameter name, low, high)
    pub ranges: Vec<(String, f64, f64)>,
    pub line: usize,
}

/// Selectivity filter: keep trials whose fine/mass split ratio for `node`
/// lies in `[min, max)`.
#[derive(Debug, Clone)]
pub struct SelectivityDef {
    pub node: String,
    pub min: f64,
    pub max: f64,
    pub line: usize,
}

/// One split-factor override inside a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioDef {
    /// Scenario id; lines sharing an id belong to the same scenario
    pub id: u32,
    pub node: String,
    pub params: HashMap<String, f64>,
    pub line: usize,
}
