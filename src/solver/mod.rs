//! Steady-state solver and Monte Carlo engine.
//!
//! ## Fixed-point passes
//!
//! A circuit with recycle streams has no evaluation order in which every node
//! sees final inputs. The simulator instead repeats full passes: each pass
//! recomputes every node once, in declaration order, from the current flow
//! values. For a recycle loop with gain `g < 1` the error after `n` passes
//! shrinks like `g^n`:
//!
//! ```text
//! x[n+1] = F + g * x[n]   ->   x* = F / (1 - g)
//! ```
//!
//! The pass count is fixed (no convergence test). Balance errors in the
//! result show how close a solve is to steady state.
//!
//! ## Monte Carlo
//!
//! [`MonteCarlo`] samples split factors of chosen nodes, solves a private
//! copy of the circuit per trial and tabulates the accepted trials.

mod montecarlo;
mod scenario;
mod simulator;

pub use montecarlo::{
    ColumnSummary, MonteCarlo, MonteCarloConfig, MonteCarloTable, ParamRange, RejectCounts, RejectReason, Sample,
    SelectivityFilter, Target, TrialOutcome, TrialRecord,
};
pub use scenario::{scenarios_from_ast, simulate_scenarios, Scenario, ScenarioResult, SplitOverride};
pub use simulator::{Feed, FeedSettings, FlowState, SimulationResult, Simulator, SimulatorConfig};

/// Default number of recompute passes per solve.
pub const DEFAULT_PASSES: usize = 100;

/// Default Monte Carlo trial count.
pub const DEFAULT_TRIALS: usize = 100_000;

/// Default per-flow grade ceiling (%). Grades at or above it are treated as
/// numerically unsound.
pub const DEFAULT_GRADE_CEILING: f64 = 36.0;

/// Default mass split sampling range.
pub const DEFAULT_MASS_RANGE: ParamRange = ParamRange { low: 0.02, high: 0.70 };

/// Default fine split sampling range.
pub const DEFAULT_FINE_RANGE: ParamRange = ParamRange { low: 0.02, high: 0.90 };

/// Mass balance error, as a fraction of feed mass, above which a solve is
/// logged as unconverged.
pub const BALANCE_WARN_FRACTION: f64 = 1e-3;
