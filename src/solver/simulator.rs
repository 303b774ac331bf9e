//! Main simulator interface.

use std::collections::BTreeMap;

use crate::circuit::{Circuit, FlowId, NodeId, SplitParam};
use crate::dsl::FeedDef;
use crate::error::{Result, SplitFactorError};

use super::{BALANCE_WARN_FRACTION, DEFAULT_PASSES};

/// Configuration for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Number of full passes over the node list per solve.
    pub passes: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            passes: DEFAULT_PASSES,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pass count.
    ///
    /// There is no convergence test. Circuits with strong recycle streams may
    /// need more passes; the balance errors in [`SimulationResult`] show how
    /// far a solve is from steady state.
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }
}

/// Mass rate and grade imposed on a feed flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feed {
    pub mass: f64,
    pub grade: f64,
}

/// Feed conditions keyed by flow id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSettings {
    feeds: BTreeMap<FlowId, Feed>,
}

impl FeedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `.feed` directives. A later directive for the same flow wins.
    pub fn from_defs(defs: &[FeedDef]) -> Self {
        let mut settings = Self::new();
        for def in defs {
            settings.insert(FlowId(def.flow), def.mass, def.grade);
        }
        settings
    }

    /// Builder form of [`FeedSettings::insert`].
    pub fn with(mut self, flow: u32, mass: f64, grade: f64) -> Self {
        self.insert(FlowId(flow), mass, grade);
        self
    }

    pub fn insert(&mut self, flow: FlowId, mass: f64, grade: f64) {
        self.feeds.insert(flow, Feed { mass, grade });
    }

    pub fn get(&self, flow: FlowId) -> Option<&Feed> {
        self.feeds.get(&flow)
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlowId, &Feed)> {
        self.feeds.iter().map(|(&id, feed)| (id, feed))
    }
}

/// Final state of one flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowState {
    pub mass: f64,
    pub grade: f64,
    pub fine: f64,
}

/// Circuit-level metrics after a solve.
///
/// Percentages are in percent (0-100). Every ratio is defined as 0 when its
/// denominator is not positive.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// Product fine content over reference feed fine content
    pub recovery: f64,
    /// Product mass over reference feed mass
    pub mass_pull: f64,
    /// Grade of the combined product streams
    pub concentrate_grade: f64,
    /// recovery / mass_pull
    pub enrichment_ratio: f64,
    /// Reference feed mass minus total outlet mass
    pub mass_balance_error: f64,
    /// Reference feed fine minus total outlet fine
    pub fine_balance_error: f64,
    /// Every flow, by id
    pub flows: BTreeMap<FlowId, FlowState>,
}

/// The main circuit simulator.
///
/// Owns a circuit and drives a fixed number of recompute passes over it.
/// Each pass visits every node once, in declaration order.
#[derive(Debug, Clone)]
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    config: SimulatorConfig,
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        Self { circuit, config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Set mass and grade of a flow and derive its fine content.
    ///
    /// Normally used on feed flows; values written to any other flow are
    /// overwritten by the next pass.
    pub fn set_feed(&mut self, flow: FlowId, mass: f64, grade: f64) -> Result<()> {
        let target = self
            .circuit
            .flows_mut()
            .by_id_mut(flow)
            .ok_or(SplitFactorError::FlowNotFound { flow: flow.0 })?;
        target.set_mass_grade(mass, grade);
        Ok(())
    }

    /// Apply every feed in `feeds`. Stops at the first unknown flow.
    pub fn apply_feeds(&mut self, feeds: &FeedSettings) -> Result<()> {
        for (flow, feed) in feeds.iter() {
            self.set_feed(flow, feed.mass, feed.grade)?;
        }
        Ok(())
    }

    /// Override both split factors of a splitter.
    pub fn set_split(&mut self, node: &str, split_mass: f64, split_fine: f64) -> Result<()> {
        self.circuit.set_split(node, split_mass, split_fine)
    }

    /// Assign one split parameter by node id. Returns `false` for mixers.
    pub fn set_param(&mut self, node: NodeId, param: SplitParam, value: f64) -> bool {
        self.circuit.set_param(node, param, value)
    }

    /// One pass: recompute every node in declaration order.
    pub fn run_pass(&mut self) {
        let (nodes, flows) = self.circuit.split_mut();
        for node in nodes {
            node.recompute(flows);
        }
    }

    /// Run the configured number of passes without computing metrics.
    pub fn run_passes(&mut self) {
        for _ in 0..self.config.passes {
            self.run_pass();
        }
    }

    /// Run the configured passes and compute the circuit metrics.
    pub fn simulate(&mut self) -> SimulationResult {
        self.run_passes();
        let result = self.result();

        log::debug!(
            "solved {} nodes in {} passes: recovery {:.4}%, mass pull {:.4}%, grade {:.4}%",
            self.circuit.nodes().len(),
            self.config.passes,
            result.recovery,
            result.mass_pull,
            result.concentrate_grade
        );

        if self.balance_suspect(&result) {
            log::warn!(
                "mass balance error {:.6} after {} passes; the circuit may need more passes",
                result.mass_balance_error,
                self.config.passes
            );
        }

        result
    }

    /// Metrics for the current flow values.
    pub fn result(&self) -> SimulationResult {
        let circuit = &self.circuit;
        let flows = circuit.flows();
        let topology = circuit.topology();

        let (feed_mass, feed_fine) = topology
            .reference_feed()
            .and_then(|id| flows.by_id(id))
            .map(|f| (f.mass, f.fine))
            .unwrap_or((0.0, 0.0));

        let sum = |ids: &[FlowId]| {
            ids.iter()
                .filter_map(|&id| flows.by_id(id))
                .fold((0.0, 0.0), |(m, f), flow| (m + flow.mass, f + flow.fine))
        };
        let (conc_mass, conc_fine) = sum(&topology.products);
        let (out_mass, out_fine) = sum(&topology.outlets());

        let recovery = ratio_percent(conc_fine, feed_fine);
        let mass_pull = ratio_percent(conc_mass, feed_mass);
        let concentrate_grade = ratio_percent(conc_fine, conc_mass);
        let enrichment_ratio = if mass_pull > 0.0 {
            recovery / mass_pull
        } else {
            0.0
        };

        SimulationResult {
            recovery,
            mass_pull,
            concentrate_grade,
            enrichment_ratio,
            mass_balance_error: feed_mass - out_mass,
            fine_balance_error: feed_fine - out_fine,
            flows: flows
                .iter()
                .map(|f| {
                    (
                        f.id,
                        FlowState {
                            mass: f.mass,
                            grade: f.grade,
                            fine: f.fine,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Large mass balance error on a single-feed circuit. With several feeds
    /// the error against the reference feed is expected to be non-zero.
    fn balance_suspect(&self, result: &SimulationResult) -> bool {
        let topology = self.circuit.topology();
        if topology.feeds.len() != 1 {
            return false;
        }
        let feed_mass = topology
            .reference_feed()
            .and_then(|id| self.circuit.flow(id))
            .map(|f| f.mass)
            .unwrap_or(0.0);
        feed_mass > 0.0 && result.mass_balance_error.abs() > feed_mass * BALANCE_WARN_FRACTION
    }
}

fn ratio_percent(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_cell() -> Simulator {
        let circuit = Circuit::builder()
            .splitter("Jameson 1", 1, [2, 3], 0.10, 0.75)
            .discharge(3)
            .build()
            .unwrap();
        let mut sim = Simulator::new(circuit);
        sim.set_feed(FlowId(1), 100.0, 1.5).unwrap();
        sim
    }

    #[test]
    fn test_single_splitter_metrics() {
        let result = single_cell().simulate();

        assert_relative_eq!(result.recovery, 75.0, epsilon = 1e-9);
        assert_relative_eq!(result.mass_pull, 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.concentrate_grade, 11.25, epsilon = 1e-9);
        assert_relative_eq!(result.enrichment_ratio, 7.5, epsilon = 1e-9);
        assert_relative_eq!(result.mass_balance_error, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.fine_balance_error, 0.0, epsilon = 1e-9);

        let reject = result.flows[&FlowId(3)];
        assert_relative_eq!(reject.mass, 90.0, epsilon = 1e-9);
        assert_relative_eq!(reject.fine, 0.375, epsilon = 1e-9);
        assert_relative_eq!(reject.grade, 0.41667, epsilon = 1e-4);
    }

    #[test]
    fn test_unknown_feed_flow() {
        let mut sim = single_cell();
        assert!(matches!(
            sim.set_feed(FlowId(99), 1.0, 1.0),
            Err(SplitFactorError::FlowNotFound { flow: 99 })
        ));
    }

    #[test]
    fn test_zero_feed_metrics() {
        let mut sim = single_cell();
        sim.set_feed(FlowId(1), 0.0, 0.0).unwrap();
        let result = sim.simulate();
        assert_eq!(result.recovery, 0.0);
        assert_eq!(result.mass_pull, 0.0);
        assert_eq!(result.concentrate_grade, 0.0);
        assert_eq!(result.enrichment_ratio, 0.0);

        // mass but no fine
        sim.set_feed(FlowId(1), 50.0, 0.0).unwrap();
        let result = sim.simulate();
        assert_eq!(result.recovery, 0.0);
        assert_relative_eq!(result.mass_pull, 10.0);
        assert_eq!(result.concentrate_grade, 0.0);
        assert_eq!(result.enrichment_ratio, 0.0);
    }

    #[test]
    fn test_acyclic_pass_count_irrelevant() {
        let build = || {
            Circuit::builder()
                .splitter("Rougher", 1, [2, 3], 0.2, 0.8)
                .splitter("Scav", 3, [4, 5], 0.3, 0.6)
                .mixer("Final", &[2, 4], 6)
                .discharge(5)
                .build()
                .unwrap()
        };
        let feeds = FeedSettings::new().with(1, 120.0, 2.0);

        let mut one = Simulator::with_config(build(), SimulatorConfig::new().with_passes(1));
        one.apply_feeds(&feeds).unwrap();
        let mut many = Simulator::with_config(build(), SimulatorConfig::new().with_passes(1000));
        many.apply_feeds(&feeds).unwrap();

        assert_eq!(one.simulate(), many.simulate());
    }

    #[test]
    fn test_recycle_closed_form() {
        // Mix(1 + 6) -> 4; Rougher 4 -> conc 2, reject 3; Scav 3 -> 6 (recycle), 5 tails
        let (sm1, sf1, sm2, sf2) = (0.2, 0.7, 0.3, 0.6);
        let circuit = Circuit::builder()
            .mixer("Mix", &[1, 6], 4)
            .splitter("Rougher", 4, [2, 3], sm1, sf1)
            .splitter("Scav", 3, [6, 5], sm2, sf2)
            .discharge(5)
            .build()
            .unwrap();
        let mut sim = Simulator::new(circuit);
        sim.set_feed(FlowId(1), 100.0, 2.0).unwrap();
        let result = sim.simulate();

        // steady state: x = F + x (1 - s1) s2  =>  x = F / (1 - (1 - s1) s2)
        let mix_mass = 100.0 / (1.0 - (1.0 - sm1) * sm2);
        let mix_fine = 2.0 / (1.0 - (1.0 - sf1) * sf2);
        assert_relative_eq!(result.flows[&FlowId(4)].mass, mix_mass, max_relative = 1e-6);
        assert_relative_eq!(result.flows[&FlowId(4)].fine, mix_fine, max_relative = 1e-6);
        assert_relative_eq!(result.flows[&FlowId(2)].mass, mix_mass * sm1, max_relative = 1e-6);
        assert_relative_eq!(result.recovery, mix_fine * sf1 / 2.0 * 100.0, max_relative = 1e-6);
        assert!(result.mass_balance_error.abs() < 1e-6);
    }

    #[test]
    fn test_two_feeds_use_lowest_id() {
        let circuit = Circuit::builder()
            .mixer("Mix", &[7, 3], 4)
            .splitter("Cell", 4, [5, 6], 0.5, 0.5)
            .build()
            .unwrap();
        let mut sim = Simulator::new(circuit);
        sim.apply_feeds(&FeedSettings::new().with(3, 10.0, 1.0).with(7, 30.0, 1.0))
            .unwrap();
        let result = sim.simulate();
        // both outputs are products; reference feed is flow 3
        assert_relative_eq!(result.mass_pull, 400.0, epsilon = 1e-9);
        assert_relative_eq!(result.mass_balance_error, -30.0, epsilon = 1e-9);
        assert!(!sim.balance_suspect(&result));
    }

    #[test]
    fn test_balance_suspect_single_feed() {
        let circuit = Circuit::builder()
            .mixer("Mix", &[1, 4], 2)
            .splitter("Cell", 2, [3, 4], 0.1, 0.5)
            .build()
            .unwrap();
        let mut sim = Simulator::with_config(circuit, SimulatorConfig::new().with_passes(2));
        sim.set_feed(FlowId(1), 100.0, 2.0).unwrap();
        let short = sim.simulate();
        assert!(short.mass_balance_error.abs() > 1.0);
        assert!(sim.balance_suspect(&short));

        let settled = Simulator::new(sim.circuit().clone()).simulate();
        assert!(!sim.balance_suspect(&settled));
    }

    #[test]
    fn test_two_node_recycle_closed_form() {
        // Mix(1 + 4) -> 2; Cell 2 -> conc 3, reject 4 back to the mixer
        let (sm, sf) = (0.3, 0.6);
        let circuit = Circuit::builder()
            .mixer("Mix", &[1, 4], 2)
            .splitter("Cell", 2, [3, 4], sm, sf)
            .build()
            .unwrap();
        let mut sim = Simulator::new(circuit);
        sim.set_feed(FlowId(1), 100.0, 2.0).unwrap();
        let result = sim.simulate();

        // steady state: x = F + x (1 - s)  =>  x = F / s
        assert_relative_eq!(result.flows[&FlowId(2)].mass, 100.0 / sm, max_relative = 1e-9);
        assert_relative_eq!(result.flows[&FlowId(2)].fine, 2.0 / sf, max_relative = 1e-9);
        assert_relative_eq!(result.flows[&FlowId(4)].mass, 100.0 / sm * (1.0 - sm), max_relative = 1e-9);
        assert_relative_eq!(result.flows[&FlowId(3)].mass, 100.0, max_relative = 1e-9);
        assert_relative_eq!(result.recovery, 100.0, max_relative = 1e-9);
        assert!(result.mass_balance_error.abs() < 1e-9);
    }

    #[test]
    fn test_set_split_changes_result() {
        let mut sim = single_cell();
        sim.set_split("Jameson 1", 0.2, 0.9).unwrap();
        let result = sim.simulate();
        assert_relative_eq!(result.recovery, 90.0, epsilon = 1e-9);
        assert!(sim.set_split("missing", 0.1, 0.1).is_err());
    }

    #[test]
    fn test_feed_settings_from_defs() {
        let defs = [
            FeedDef {
                flow: 1,
                mass: 10.0,
                grade: 1.0,
                line: 1,
            },
            FeedDef {
                flow: 1,
                mass: 20.0,
                grade: 2.0,
                line: 2,
            },
        ];
        let feeds = FeedSettings::from_defs(&defs);
        assert_eq!(
            feeds.get(FlowId(1)),
            Some(&Feed {
                mass: 20.0,
                grade: 2.0
            })
        );
    }
}
