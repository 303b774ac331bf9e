//! Monte Carlo sampling of split factors.
//!
//! Each trial clones the base simulator, applies the feed conditions, draws
//! the split factors of every target node uniformly from its configured
//! ranges, and solves. Trials whose flows are non-finite or exceed the grade
//! ceiling are rejected; the survivors are then filtered by concentrate grade
//! and, optionally, by the selectivity of one node.
//!
//! Trial `i` draws from its own ChaCha8 stream (`seed`, stream `i`), so any
//! trial can be reproduced on its own and results do not depend on the order
//! in which trials run.

use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::circuit::{FlowId, NodeId, SplitParam};
use crate::dsl::MonteCarloDef;
use crate::error::{Result, SplitFactorError};

use super::simulator::{FeedSettings, FlowState, Simulator};
use super::{DEFAULT_FINE_RANGE, DEFAULT_GRADE_CEILING, DEFAULT_MASS_RANGE, DEFAULT_TRIALS};

/// Half-open sampling interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub low: f64,
    pub high: f64,
}

impl ParamRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }

    fn is_valid(&self) -> bool {
        self.low < self.high && (self.high - self.low).is_finite()
    }
}

/// A node whose split factors are sampled, with one range per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub node: String,
    pub mass: Option<ParamRange>,
    pub fine: Option<ParamRange>,
}

impl Target {
    pub fn new(node: impl Into<String>, mass: ParamRange, fine: ParamRange) -> Self {
        Self {
            node: node.into(),
            mass: Some(mass),
            fine: Some(fine),
        }
    }

    /// Target with the usual wide ranges: mass [0.02, 0.70), fine [0.02, 0.90).
    pub fn with_default_ranges(node: impl Into<String>) -> Self {
        Self::new(node, DEFAULT_MASS_RANGE, DEFAULT_FINE_RANGE)
    }

    pub fn range(&self, param: SplitParam) -> Option<ParamRange> {
        match param {
            SplitParam::Mass => self.mass,
            SplitParam::Fine => self.fine,
        }
    }

    fn set_range(&mut self, param: SplitParam, range: ParamRange) {
        match param {
            SplitParam::Mass => self.mass = Some(range),
            SplitParam::Fine => self.fine = Some(range),
        }
    }
}

/// Keep trials whose sampled `fine-fraction / mass-fraction` for `node`
/// lies in `[min, max)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectivityFilter {
    pub node: String,
    pub min: f64,
    pub max: f64,
}

impl SelectivityFilter {
    pub fn new(node: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            node: node.into(),
            min,
            max,
        }
    }

    /// True if the record passes. Records without samples for the node fail.
    pub fn accepts(&self, record: &TrialRecord) -> bool {
        let mass = record.sample(&self.node, SplitParam::Mass);
        let fine = record.sample(&self.node, SplitParam::Fine);
        match (mass, fine) {
            (Some(mass), Some(fine)) => {
                let ratio = fine / mass;
                ratio >= self.min && ratio < self.max
            }
            _ => false,
        }
    }
}

/// Monte Carlo configuration. Built once, then passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    /// Target nodes, in sampling order
    pub targets: Vec<Target>,
    /// Trials per run
    pub trials: usize,
    /// Lower concentrate grade bound (inclusive)
    pub grade_min: Option<f64>,
    /// Upper concentrate grade bound (inclusive)
    pub grade_max: Option<f64>,
    /// Reject a trial when any flow grade reaches this value
    pub grade_ceiling: Option<f64>,
    /// Base seed; trial `i` uses stream `i` of this seed
    pub seed: u64,
    /// Optional post-filter on one target's sampled selectivity
    pub selectivity: Option<SelectivityFilter>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            trials: DEFAULT_TRIALS,
            grade_min: None,
            grade_max: None,
            grade_ceiling: Some(DEFAULT_GRADE_CEILING),
            seed: 0,
            selectivity: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from DSL directives. Unset directives keep their defaults.
    pub fn from_ast(def: &MonteCarloDef) -> Result<Self> {
        let mut config = Self::new();

        for vary in &def.vary {
            let mut target = Target {
                node: vary.node.clone(),
                mass: None,
                fine: None,
            };
            for (name, low, high) in &vary.ranges {
                let param = SplitParam::from_name(name).ok_or_else(|| SplitFactorError::InvalidSimulationParam {
                    message: format!("unknown parameter '{}' for '{}' (line {})", name, vary.node, vary.line),
                })?;
                target.set_range(param, ParamRange::new(*low, *high));
            }
            config.targets.push(target);
        }

        if let Some(trials) = def.trials {
            config.trials = trials;
        }
        if let Some(seed) = def.seed {
            config.seed = seed;
        }
        config.grade_min = def.grade_min;
        config.grade_max = def.grade_max;
        if def.ceiling.is_some() {
            config.grade_ceiling = def.ceiling;
        }
        config.selectivity = def
            .selectivity
            .as_ref()
            .map(|s| SelectivityFilter::new(s.node.clone(), s.min, s.max));

        Ok(config)
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_grade_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.grade_min = min;
        self.grade_max = max;
        self
    }

    /// Set or clear the per-flow grade ceiling.
    pub fn with_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.grade_ceiling = ceiling;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_selectivity(mut self, filter: SelectivityFilter) -> Self {
        self.selectivity = Some(filter);
        self
    }
}

/// One sampled split parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub node: String,
    pub param: SplitParam,
    pub value: f64,
}

/// An accepted trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    /// Trial index, also the RNG stream used
    pub index: usize,
    pub recovery: f64,
    pub mass_pull: f64,
    pub concentrate_grade: f64,
    pub enrichment_ratio: f64,
    /// Sampled parameters, in target order (mass then fine per node)
    pub samples: Vec<Sample>,
    /// Final state of every flow
    pub flows: BTreeMap<FlowId, FlowState>,
}

impl TrialRecord {
    /// Sampled value for a node parameter.
    pub fn sample(&self, node: &str, param: SplitParam) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.param == param && s.node == node)
            .map(|s| s.value)
    }
}

/// Why a trial was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// A flow grade reached the sanity ceiling
    GradeCeiling { flow: FlowId, grade: f64 },
    /// A flow value (or, with `flow: None`, a metric) is NaN or infinite
    NonFinite { flow: Option<FlowId> },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::GradeCeiling { flow, grade } => {
                write!(f, "flow {} grade {:.4} at or above ceiling", flow, grade)
            }
            RejectReason::NonFinite { flow: Some(flow) } => write!(f, "flow {} is not finite", flow),
            RejectReason::NonFinite { flow: None } => f.write_str("metrics are not finite"),
        }
    }
}

/// Result of a single trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Accepted(TrialRecord),
    Rejected(RejectReason),
}

/// Rejected trial counts by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectCounts {
    pub grade_ceiling: usize,
    pub non_finite: usize,
}

impl RejectCounts {
    pub fn total(&self) -> usize {
        self.grade_ceiling + self.non_finite
    }

    fn count(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::GradeCeiling { .. } => self.grade_ceiling += 1,
            RejectReason::NonFinite { .. } => self.non_finite += 1,
        }
    }
}

/// Descriptive statistics of one table column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for fewer than two rows
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Accepted and filtered trials of a Monte Carlo run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloTable {
    /// Rows, in trial order
    pub records: Vec<TrialRecord>,
    /// Trials attempted
    pub requested: usize,
    /// Trials discarded by the validation gate
    pub rejected: RejectCounts,
    /// Accepted trials removed by the concentrate grade bounds
    pub filtered_grade: usize,
    /// Accepted trials removed by the selectivity filter
    pub filtered_selectivity: usize,
    parameters: Vec<(String, SplitParam)>,
    flow_ids: Vec<FlowId>,
}

impl MonteCarloTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names, in row order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = ["trial", "recovery", "mass_pull", "concentrate_grade", "enrichment_ratio"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for (node, param) in &self.parameters {
            columns.push(format!("{}_{}", node, param.name()));
        }
        for id in &self.flow_ids {
            columns.push(format!("flow_{}_mass", id));
            columns.push(format!("flow_{}_grade", id));
        }
        columns
    }

    /// Values of one record, aligned with [`MonteCarloTable::columns`].
    pub fn row_values(&self, record: &TrialRecord) -> Vec<f64> {
        let mut row = vec![
            record.index as f64,
            record.recovery,
            record.mass_pull,
            record.concentrate_grade,
            record.enrichment_ratio,
        ];
        for (node, param) in &self.parameters {
            row.push(record.sample(node, *param).unwrap_or(f64::NAN));
        }
        for id in &self.flow_ids {
            match record.flows.get(id) {
                Some(state) => row.extend([state.mass, state.grade]),
                None => row.extend([f64::NAN, f64::NAN]),
            }
        }
        row
    }

    /// Summary of a column over all rows. `None` if the column does not
    /// exist or the table is empty.
    pub fn summary(&self, column: &str) -> Option<ColumnSummary> {
        let idx = self.columns().iter().position(|c| c == column)?;
        let values: Vec<f64> = self.records.iter().map(|r| self.row_values(r)[idx]).collect();
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(ColumnSummary {
            count: values.len(),
            mean,
            std_dev,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone)]
struct ResolvedTarget {
    id: NodeId,
    name: String,
    ranges: [(SplitParam, ParamRange); 2],
}

/// Monte Carlo engine bound to a base simulator and a configuration.
///
/// The base simulator is borrowed immutably and never changes.
#[derive(Debug)]
pub struct MonteCarlo<'a> {
    base: &'a Simulator,
    config: &'a MonteCarloConfig,
    targets: Vec<ResolvedTarget>,
}

impl<'a> MonteCarlo<'a> {
    /// Resolve and check the configuration against the base circuit.
    pub fn new(base: &'a Simulator, config: &'a MonteCarloConfig) -> Result<Self> {
        let circuit = base.circuit();

        let mut targets = Vec::with_capacity(config.targets.len());
        for target in &config.targets {
            let id = circuit.find_node(&target.node).ok_or_else(|| SplitFactorError::NodeNotFound {
                node: target.node.clone(),
            })?;
            if !circuit.node(id).is_splitter() {
                return Err(SplitFactorError::NotASplitter {
                    node: target.node.clone(),
                });
            }

            let mut ranges = [(SplitParam::Mass, ParamRange::new(0.0, 0.0)); 2];
            for (slot, param) in ranges.iter_mut().zip(SplitParam::ALL) {
                let range = target.range(param).ok_or_else(|| SplitFactorError::MissingRange {
                    node: target.node.clone(),
                    param: param.name().to_string(),
                })?;
                if !range.is_valid() {
                    return Err(SplitFactorError::InvalidRange {
                        node: target.node.clone(),
                        param: param.name().to_string(),
                        low: range.low,
                        high: range.high,
                    });
                }
                *slot = (param, range);
            }

            targets.push(ResolvedTarget {
                id,
                name: target.node.clone(),
                ranges,
            });
        }

        for bound in [config.grade_min, config.grade_max, config.grade_ceiling].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(SplitFactorError::InvalidSimulationParam {
                    message: format!("grade bound {} is not finite", bound),
                });
            }
        }
        if let (Some(min), Some(max)) = (config.grade_min, config.grade_max) {
            if min > max {
                return Err(SplitFactorError::InvalidSimulationParam {
                    message: format!("grade_min {} is above grade_max {}", min, max),
                });
            }
        }

        if let Some(filter) = &config.selectivity {
            if !targets.iter().any(|t| t.name == filter.node) {
                return Err(SplitFactorError::InvalidSimulationParam {
                    message: format!("selectivity node '{}' is not a sampled target", filter.node),
                });
            }
        }

        Ok(Self { base, config, targets })
    }

    /// Run the configured number of trials.
    pub fn run(&self, feeds: &FeedSettings) -> Result<MonteCarloTable> {
        self.run_trials(feeds, self.config.trials)
    }

    /// Run `trials` trials, then apply the post-filters.
    pub fn run_trials(&self, feeds: &FeedSettings, trials: usize) -> Result<MonteCarloTable> {
        // surface an unknown feed flow even when no trial runs
        self.base.clone().apply_feeds(feeds)?;

        let mut rejected = RejectCounts::default();
        let mut accepted = Vec::new();
        for index in 0..trials {
            match self.trial(index, feeds)? {
                TrialOutcome::Accepted(record) => accepted.push(record),
                TrialOutcome::Rejected(reason) => {
                    log::debug!("trial {} rejected: {}", index, reason);
                    rejected.count(&reason);
                }
            }
        }

        let before_grade = accepted.len();
        accepted.retain(|r| self.within_grade_bounds(r.concentrate_grade));
        let filtered_grade = before_grade - accepted.len();

        let before_selectivity = accepted.len();
        if let Some(filter) = &self.config.selectivity {
            accepted.retain(|r| filter.accepts(r));
        }
        let filtered_selectivity = before_selectivity - accepted.len();

        log::info!(
            "monte carlo: {} trials, {} kept, {} rejected ({} ceiling, {} non-finite), {} outside grade bounds, {} outside selectivity",
            trials,
            accepted.len(),
            rejected.total(),
            rejected.grade_ceiling,
            rejected.non_finite,
            filtered_grade,
            filtered_selectivity
        );

        Ok(MonteCarloTable {
            records: accepted,
            requested: trials,
            rejected,
            filtered_grade,
            filtered_selectivity,
            parameters: self
                .targets
                .iter()
                .flat_map(|t| SplitParam::ALL.map(|p| (t.name.clone(), p)))
                .collect(),
            flow_ids: self.base.circuit().flows().iter().map(|f| f.id).collect(),
        })
    }

    /// Run a single trial. Depends only on the seed, the index and the feeds.
    pub fn trial(&self, index: usize, feeds: &FeedSettings) -> Result<TrialOutcome> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(index as u64);

        let mut sim = self.base.clone();
        sim.apply_feeds(feeds)?;

        let mut samples = Vec::with_capacity(self.targets.len() * 2);
        for target in &self.targets {
            for &(param, range) in &target.ranges {
                let value = rng.gen_range(range.low..range.high);
                sim.set_param(target.id, param, value);
                samples.push(Sample {
                    node: target.name.clone(),
                    param,
                    value,
                });
            }
        }

        sim.run_passes();
        let result = sim.result();

        if let Some(reason) = self.check(&result.flows) {
            return Ok(TrialOutcome::Rejected(reason));
        }
        let metrics = [
            result.recovery,
            result.mass_pull,
            result.concentrate_grade,
            result.enrichment_ratio,
        ];
        if metrics.iter().any(|m| !m.is_finite()) {
            return Ok(TrialOutcome::Rejected(RejectReason::NonFinite { flow: None }));
        }

        Ok(TrialOutcome::Accepted(TrialRecord {
            index,
            recovery: result.recovery,
            mass_pull: result.mass_pull,
            concentrate_grade: result.concentrate_grade,
            enrichment_ratio: result.enrichment_ratio,
            samples,
            flows: result.flows,
        }))
    }

    fn check(&self, flows: &BTreeMap<FlowId, FlowState>) -> Option<RejectReason> {
        for (&flow, state) in flows {
            if !(state.mass.is_finite() && state.grade.is_finite() && state.fine.is_finite()) {
                return Some(RejectReason::NonFinite { flow: Some(flow) });
            }
        }
        let ceiling = self.config.grade_ceiling?;
        flows
            .iter()
            .find(|(_, state)| state.grade >= ceiling)
            .map(|(&flow, state)| RejectReason::GradeCeiling {
                flow,
                grade: state.grade,
            })
    }

    fn within_grade_bounds(&self, grade: f64) -> bool {
        self.config.grade_min.map_or(true, |min| grade >= min) && self.config.grade_max.map_or(true, |max| grade <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;

    fn base() -> Simulator {
        let circuit = Circuit::builder()
            .splitter("Rougher", 1, [2, 3], 0.1, 0.7)
            .splitter("Scav", 3, [4, 5], 0.2, 0.6)
            .discharge(5)
            .build()
            .unwrap();
        Simulator::new(circuit)
    }

    fn feeds() -> FeedSettings {
        FeedSettings::new().with(1, 100.0, 1.5)
    }

    fn config() -> MonteCarloConfig {
        MonteCarloConfig::new()
            .with_target(Target::new("Rougher", ParamRange::new(0.05, 0.3), ParamRange::new(0.4, 0.9)))
            .with_target(Target::with_default_ranges("Scav"))
            .with_trials(200)
            .with_seed(7)
    }

    #[test]
    fn test_samples_within_ranges() {
        let sim = base();
        let config = config().with_ceiling(None);
        let table = MonteCarlo::new(&sim, &config).unwrap().run(&feeds()).unwrap();

        assert_eq!(table.len(), 200);
        for record in &table.records {
            assert_eq!(record.samples.len(), 4);
            let rougher_mass = record.sample("Rougher", SplitParam::Mass).unwrap();
            assert!((0.05..0.3).contains(&rougher_mass));
            let rougher_fine = record.sample("Rougher", SplitParam::Fine).unwrap();
            assert!((0.4..0.9).contains(&rougher_fine));
            let scav_fine = record.sample("Scav", SplitParam::Fine).unwrap();
            assert!(DEFAULT_FINE_RANGE.contains(scav_fine));
        }
    }

    #[test]
    fn test_base_simulator_untouched() {
        let sim = base();
        let before = sim.result();
        let config = config();
        MonteCarlo::new(&sim, &config).unwrap().run(&feeds()).unwrap();
        assert_eq!(sim.result(), before);
        assert_eq!(sim.circuit().node(NodeId(0)).param(SplitParam::Mass), Some(0.1));
    }

    #[test]
    fn test_same_seed_same_table() {
        let sim = base();
        let config = config();
        let mc = MonteCarlo::new(&sim, &config).unwrap();
        let a = mc.run(&feeds()).unwrap();
        let b = mc.run(&feeds()).unwrap();
        assert_eq!(a, b);

        let other = config.clone().with_seed(8);
        let c = MonteCarlo::new(&sim, &other).unwrap().run(&feeds()).unwrap();
        assert_ne!(a.records, c.records);
    }

    #[test]
    fn test_trial_independent_of_order() {
        let sim = base();
        let config = config();
        let mc = MonteCarlo::new(&sim, &config).unwrap();
        let late = mc.trial(42, &feeds()).unwrap();
        mc.run_trials(&feeds(), 10).unwrap();
        assert_eq!(mc.trial(42, &feeds()).unwrap(), late);
    }

    #[test]
    fn test_ceiling_rejects_silently() {
        // a pure concentrate cell pushes the product grade far above 36 %
        let circuit = Circuit::builder()
            .splitter("Cell", 1, [2, 3], 0.1, 0.7)
            .discharge(3)
            .build()
            .unwrap();
        let sim = Simulator::new(circuit);
        let config = MonteCarloConfig::new()
            .with_target(Target::new("Cell", ParamRange::new(0.01, 0.02), ParamRange::new(0.9, 0.95)))
            .with_trials(50);
        let table = MonteCarlo::new(&sim, &config)
            .unwrap()
            .run(&FeedSettings::new().with(1, 100.0, 1.5))
            .unwrap();

        assert!(table.is_empty());
        assert_eq!(table.requested, 50);
        assert_eq!(table.rejected.grade_ceiling, 50);
        assert_eq!(table.rejected.non_finite, 0);
    }

    #[test]
    fn test_ceiling_is_exclusive() {
        let circuit = Circuit::builder()
            .splitter("Cell", 1, [2, 3], 0.5, 0.5)
            .discharge(3)
            .build()
            .unwrap();
        let sim = Simulator::new(circuit);
        let mc_config = MonteCarloConfig::new().with_ceiling(Some(36.0)).with_trials(1);
        let mc = MonteCarlo::new(&sim, &mc_config).unwrap();

        let at = mc.trial(0, &FeedSettings::new().with(1, 10.0, 36.0)).unwrap();
        assert!(matches!(at, TrialOutcome::Rejected(RejectReason::GradeCeiling { .. })));
        let below = mc.trial(0, &FeedSettings::new().with(1, 10.0, 35.9)).unwrap();
        assert!(matches!(below, TrialOutcome::Accepted(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let circuit = Circuit::builder()
            .splitter("Cell", 1, [2, 3], 0.5, 0.5)
            .discharge(3)
            .build()
            .unwrap();
        let sim = Simulator::new(circuit);
        let config = MonteCarloConfig::new().with_ceiling(None).with_trials(3);
        let table = MonteCarlo::new(&sim, &config)
            .unwrap()
            .run(&FeedSettings::new().with(1, f64::INFINITY, 1.0))
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.rejected.non_finite, 3);
    }

    #[test]
    fn test_grade_filter() {
        let sim = base();
        let unfiltered = config();
        let all = MonteCarlo::new(&sim, &unfiltered).unwrap().run(&feeds()).unwrap();

        let bounded = config().with_grade_bounds(Some(5.0), Some(12.0));
        let kept = MonteCarlo::new(&sim, &bounded).unwrap().run(&feeds()).unwrap();

        let expected: Vec<_> = all
            .records
            .iter()
            .filter(|r| r.concentrate_grade >= 5.0 && r.concentrate_grade <= 12.0)
            .cloned()
            .collect();
        assert_eq!(kept.records, expected);
        assert_eq!(kept.filtered_grade, all.len() - expected.len());
        assert_eq!(kept.rejected, all.rejected);
    }

    #[test]
    fn test_selectivity_filter() {
        let sim = base();
        let config = config().with_selectivity(SelectivityFilter::new("Rougher", 3.0, 8.0));
        let table = MonteCarlo::new(&sim, &config).unwrap().run(&feeds()).unwrap();
        for record in &table.records {
            let ratio = record.sample("Rougher", SplitParam::Fine).unwrap()
                / record.sample("Rougher", SplitParam::Mass).unwrap();
            assert!((3.0..8.0).contains(&ratio));
        }
        assert_eq!(table.len() + table.filtered_selectivity + table.rejected.total(), 200);
    }

    #[test]
    fn test_config_errors() {
        let sim = base();
        let unknown = MonteCarloConfig::new().with_target(Target::with_default_ranges("Nope"));
        assert!(matches!(MonteCarlo::new(&sim, &unknown), Err(SplitFactorError::NodeNotFound { .. })));

        let missing = MonteCarloConfig::new().with_target(Target {
            node: "Rougher".to_string(),
            mass: Some(DEFAULT_MASS_RANGE),
            fine: None,
        });
        assert!(matches!(MonteCarlo::new(&sim, &missing), Err(SplitFactorError::MissingRange { .. })));

        let reversed = MonteCarloConfig::new().with_target(Target::new(
            "Rougher",
            ParamRange::new(0.5, 0.1),
            DEFAULT_FINE_RANGE,
        ));
        assert!(matches!(MonteCarlo::new(&sim, &reversed), Err(SplitFactorError::InvalidRange { .. })));

        // finite bounds whose width overflows
        let overflow = MonteCarloConfig::new().with_target(Target::new(
            "Rougher",
            ParamRange::new(-f64::MAX, f64::MAX),
            DEFAULT_FINE_RANGE,
        ));
        assert!(matches!(MonteCarlo::new(&sim, &overflow), Err(SplitFactorError::InvalidRange { .. })));

        let infinite = MonteCarloConfig::new().with_target(Target::new(
            "Rougher",
            DEFAULT_MASS_RANGE,
            ParamRange::new(0.1, f64::INFINITY),
        ));
        assert!(matches!(MonteCarlo::new(&sim, &infinite), Err(SplitFactorError::InvalidRange { .. })));

        let bounds = MonteCarloConfig::new().with_grade_bounds(Some(20.0), Some(10.0));
        assert!(MonteCarlo::new(&sim, &bounds).is_err());
    }

    #[test]
    fn test_mixer_target_rejected() {
        let circuit = Circuit::builder()
            .mixer("Mix", &[1], 2)
            .splitter("Cell", 2, [3, 4], 0.1, 0.5)
            .build()
            .unwrap();
        let sim = Simulator::new(circuit);
        let config = MonteCarloConfig::new().with_target(Target::with_default_ranges("Mix"));
        assert!(matches!(MonteCarlo::new(&sim, &config), Err(SplitFactorError::NotASplitter { .. })));
    }

    #[test]
    fn test_table_columns_and_summary() {
        let sim = base();
        let config = config().with_trials(20);
        let table = MonteCarlo::new(&sim, &config).unwrap().run(&feeds()).unwrap();

        let columns = table.columns();
        assert_eq!(columns[0], "trial");
        assert!(columns.contains(&"Rougher_mass-fraction".to_string()));
        assert!(columns.contains(&"Scav_fine-fraction".to_string()));
        assert!(columns.contains(&"flow_5_grade".to_string()));
        assert_eq!(columns.len(), 5 + 4 + 2 * 5);

        let record = &table.records[0];
        assert_eq!(table.row_values(record).len(), columns.len());

        let summary = table.summary("recovery").unwrap();
        assert_eq!(summary.count, table.len());
        assert!(summary.min <= summary.mean && summary.mean <= summary.max);
        assert!(summary.std_dev >= 0.0);
        assert!(table.summary("no_such_column").is_none());
    }

    #[test]
    fn test_from_ast() {
        let ast = crate::dsl::parse(
            ".vary Rougher mass 0.1 0.2 cuf 0.5 0.6\n.trials 12\n.seed 3\n.grade_max 30\n.ceiling 40\n",
        )
        .unwrap();
        let config = MonteCarloConfig::from_ast(&ast.montecarlo).unwrap();
        assert_eq!(config.targets[0].fine, Some(ParamRange::new(0.5, 0.6)));
        assert_eq!(config.trials, 12);
        assert_eq!(config.seed, 3);
        assert_eq!(config.grade_min, None);
        assert_eq!(config.grade_max, Some(30.0));
        assert_eq!(config.grade_ceiling, Some(40.0));

        let bad = crate::dsl::parse(".vary Rougher speed 0.1 0.2").unwrap();
        assert!(MonteCarloConfig::from_ast(&bad.montecarlo).is_err());
    }
}
