//! # Splitfactor
//!
//! A steady-state split-factor simulator for flotation circuits, with a
//! Monte Carlo explorer for the split factors.
//!
//! This library provides:
//! - A small DSL for describing circuits: cells, mixers and the flows between them
//! - A fixed-point solver that handles recycle streams
//! - Recovery, mass pull, concentrate grade, enrichment ratio and balance errors
//! - Monte Carlo sampling of split factors with reproducible per-trial seeds
//! - Scenario runs for comparing sets of split factors
//!
//! ## Architecture
//!
//! - [`dsl`] - Parser for the circuit description language
//! - [`circuit`] - Flow and node arenas, topology classification, validation
//! - [`solver`] - Simulator, scenarios and the Monte Carlo engine
//! - `report` - Text reports (CLI only)
//!
//! ## Usage
//!
//! ```
//! use splitfactor::circuit::{Circuit, FlowId};
//! use splitfactor::Simulator;
//!
//! let circuit = Circuit::builder()
//!     .splitter("Jameson 1", 1, [2, 3], 0.10, 0.75)
//!     .discharge(3)
//!     .build()?;
//! let mut sim = Simulator::new(circuit);
//! sim.set_feed(FlowId(1), 100.0, 1.5)?;
//!
//! let result = sim.simulate();
//! assert!((result.recovery - 75.0).abs() < 1e-9);
//! # Ok::<(), splitfactor::SplitFactorError>(())
//! ```
//!
//! ## Split-factor model
//!
//! A cell (splitter) sends a fixed fraction of its input mass and a fixed
//! fraction of its input fine content to the concentrate; the rest goes to
//! the reject. Grades follow from `grade = fine / mass * 100`. A mixer sums
//! its inputs. Flows that no node produces are feeds; terminal flows are
//! products unless declared discharge (final tailings).

pub mod circuit;
pub mod dsl;
pub mod error;
pub mod solver;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{Result, SplitFactorError};
pub use solver::{FeedSettings, MonteCarlo, MonteCarloConfig, SimulationResult, Simulator, SimulatorConfig};
