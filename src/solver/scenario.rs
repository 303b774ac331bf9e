//! Scenarios: named sets of split-factor overrides solved side by side.

use crate::circuit::SplitParam;
use crate::dsl::ScenarioDef;
use crate::error::{Result, SplitFactorError};

use super::simulator::{FeedSettings, SimulationResult, Simulator};

/// New split factors for one splitter. A `None` parameter keeps the value
/// the base circuit has.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOverride {
    pub node: String,
    pub mass: Option<f64>,
    pub fine: Option<f64>,
}

/// A set of overrides applied together.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: u32,
    pub overrides: Vec<SplitOverride>,
}

impl Scenario {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            overrides: Vec::new(),
        }
    }

    pub fn with_split(mut self, node: impl Into<String>, mass: f64, fine: f64) -> Self {
        self.overrides.push(SplitOverride {
            node: node.into(),
            mass: Some(mass),
            fine: Some(fine),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub id: u32,
    pub result: SimulationResult,
}

/// Group `.scenario` lines by id, in order of first appearance.
pub fn scenarios_from_ast(defs: &[ScenarioDef]) -> Result<Vec<Scenario>> {
    let mut scenarios: Vec<Scenario> = Vec::new();
    for def in defs {
        let mut split = SplitOverride {
            node: def.node.clone(),
            mass: None,
            fine: None,
        };
        for (key, &value) in &def.params {
            match SplitParam::from_name(key) {
                Some(SplitParam::Mass) => split.mass = Some(value),
                Some(SplitParam::Fine) => split.fine = Some(value),
                None => {
                    return Err(SplitFactorError::InvalidSimulationParam {
                        message: format!("unknown parameter '{}' in scenario {} (line {})", key, def.id, def.line),
                    });
                }
            }
        }

        match scenarios.iter_mut().find(|s| s.id == def.id) {
            Some(scenario) => scenario.overrides.push(split),
            None => scenarios.push(Scenario {
                id: def.id,
                overrides: vec![split],
            }),
        }
    }
    Ok(scenarios)
}

/// Solve every scenario on its own copy of `base`.
pub fn simulate_scenarios(
    base: &Simulator,
    feeds: &FeedSettings,
    scenarios: &[Scenario],
) -> Result<Vec<ScenarioResult>> {
    scenarios
        .iter()
        .map(|scenario| {
            let mut sim = base.clone();
            sim.apply_feeds(feeds)?;
            for split in &scenario.overrides {
                let id = sim.circuit().find_node(&split.node).ok_or_else(|| SplitFactorError::NodeNotFound {
                    node: split.node.clone(),
                })?;
                let node = sim.circuit().node(id);
                let (Some(mass), Some(fine)) = (
                    split.mass.or(node.param(SplitParam::Mass)),
                    split.fine.or(node.param(SplitParam::Fine)),
                ) else {
                    return Err(SplitFactorError::NotASplitter {
                        node: split.node.clone(),
                    });
                };
                sim.set_split(&split.node, mass, fine)?;
            }
            log::debug!("scenario {}: {} overrides", scenario.id, scenario.overrides.len());
            Ok(ScenarioResult {
                id: scenario.id,
                result: sim.simulate(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use approx::assert_relative_eq;

    fn base() -> Simulator {
        let circuit = Circuit::builder()
            .splitter("Rougher", 1, [2, 3], 0.1, 0.75)
            .discharge(3)
            .build()
            .unwrap();
        Simulator::new(circuit)
    }

    #[test]
    fn test_scenarios_are_independent() {
        let feeds = FeedSettings::new().with(1, 100.0, 1.5);
        let scenarios = [
            Scenario::new(1),
            Scenario::new(2).with_split("Rougher", 0.2, 0.9),
            Scenario::new(3),
        ];
        let results = simulate_scenarios(&base(), &feeds, &scenarios).unwrap();

        assert_eq!(results.len(), 3);
        assert_relative_eq!(results[0].result.recovery, 75.0, epsilon = 1e-9);
        assert_relative_eq!(results[1].result.recovery, 90.0, epsilon = 1e-9);
        assert_relative_eq!(results[1].result.mass_pull, 20.0, epsilon = 1e-9);
        assert_eq!(results[2].result, results[0].result);
    }

    #[test]
    fn test_partial_override_keeps_other_param() {
        let feeds = FeedSettings::new().with(1, 100.0, 1.5);
        let scenario = Scenario {
            id: 4,
            overrides: vec![SplitOverride {
                node: "Rougher".to_string(),
                mass: Some(0.5),
                fine: None,
            }],
        };
        let results = simulate_scenarios(&base(), &feeds, &[scenario]).unwrap();
        assert_relative_eq!(results[0].result.recovery, 75.0, epsilon = 1e-9);
        assert_relative_eq!(results[0].result.mass_pull, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_node() {
        let scenario = Scenario::new(1).with_split("Cleaner", 0.1, 0.1);
        assert!(matches!(
            simulate_scenarios(&base(), &FeedSettings::new(), &[scenario]),
            Err(SplitFactorError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_from_ast_groups_by_id() {
        let ast = crate::dsl::parse(
            ".scenario 2 Rougher mass=0.2\n.scenario 1 Rougher fine=0.8\n.scenario 2 Scav cuf=0.4\n",
        )
        .unwrap();
        let scenarios = scenarios_from_ast(&ast.scenarios).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].id, 2);
        assert_eq!(scenarios[0].overrides.len(), 2);
        assert_eq!(scenarios[0].overrides[1].fine, Some(0.4));
        assert_eq!(scenarios[1].overrides[0].mass, None);

        let bad = crate::dsl::parse(".scenario 1 Rougher speed=2").unwrap();
        assert!(scenarios_from_ast(&bad.scenarios).is_err());
    }
}
