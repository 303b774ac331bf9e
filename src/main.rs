//! Splitfactor - flotation circuit split-factor simulator
//!
//! Solves a circuit description file, or samples its split factors with a
//! Monte Carlo run.
//!
//! # Usage
//!
//! ```bash
//! splitfactor simulate circuit.sf --feed 1,100,1.5
//! splitfactor montecarlo circuit.sf -n 10000 --targets "Jameson 1" --grade-min 10 --rows > trials.csv
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use splitfactor::{
    circuit::Circuit,
    dsl::{self, CircuitAst},
    error::Result,
    report,
    solver::{scenarios_from_ast, simulate_scenarios, ParamRange, Target, DEFAULT_PASSES},
    FeedSettings, MonteCarlo, MonteCarloConfig, Simulator, SimulatorConfig,
};

/// Flotation circuit split-factor simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the circuit and print metrics, flows and scenarios
    Simulate {
        #[command(flatten)]
        circuit: CircuitArgs,
    },
    /// Sample split factors and tabulate the accepted trials
    Montecarlo {
        #[command(flatten)]
        circuit: CircuitArgs,

        /// Number of trials
        #[arg(short = 'n', long)]
        trials: Option<usize>,

        /// Nodes to sample (comma separated); replaces `.vary` targets
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,

        /// Mass split range applied to every target
        #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
        mass_range: Option<Vec<f64>>,

        /// Fine split range applied to every target
        #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
        fine_range: Option<Vec<f64>>,

        /// Lowest concentrate grade kept
        #[arg(long)]
        grade_min: Option<f64>,

        /// Highest concentrate grade kept
        #[arg(long)]
        grade_max: Option<f64>,

        /// Per-flow grade ceiling
        #[arg(long, conflicts_with = "no_ceiling")]
        ceiling: Option<f64>,

        /// Disable the grade ceiling
        #[arg(long)]
        no_ceiling: bool,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Print every kept trial as comma separated rows
        #[arg(long)]
        rows: bool,
    },
}

#[derive(clap::Args, Debug)]
struct CircuitArgs {
    /// Path to the circuit description file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Recompute passes per solve
    #[arg(short, long)]
    passes: Option<usize>,

    /// Feed condition as `flow,mass,grade` (repeatable)
    #[arg(long = "feed", value_parser = parse_feed)]
    feeds: Vec<(u32, f64, f64)>,

    /// Discharge flow ids (comma separated); replaces `.discharge`
    #[arg(long, value_delimiter = ',')]
    discharge: Vec<u32>,
}

fn parse_feed(s: &str) -> std::result::Result<(u32, f64, f64), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [flow, mass, grade] = parts.as_slice() else {
        return Err(format!("expected flow,mass,grade, got '{}'", s));
    };
    let flow = flow.parse().map_err(|_| format!("invalid flow id '{}'", flow))?;
    let mass = dsl::parse_value(mass).ok_or_else(|| format!("invalid mass '{}'", mass))?;
    let grade = dsl::parse_value(grade).ok_or_else(|| format!("invalid grade '{}'", grade))?;
    Ok((flow, mass, grade))
}

/// Circuit, simulator and feeds from the file, with CLI overrides applied.
fn load(args: &CircuitArgs) -> Result<(CircuitAst, Simulator, FeedSettings)> {
    let mut ast = dsl::parse_file(&args.circuit_file)?;
    if !args.discharge.is_empty() {
        ast.discharge = args.discharge.clone();
    }

    let circuit = Circuit::from_ast(&ast)?;
    let passes = args.passes.or(ast.passes).unwrap_or(DEFAULT_PASSES);
    let sim = Simulator::with_config(circuit, SimulatorConfig::new().with_passes(passes));

    let mut feeds = FeedSettings::from_defs(&ast.feeds);
    for &(flow, mass, grade) in &args.feeds {
        feeds.insert(splitfactor::circuit::FlowId(flow), mass, grade);
    }
    if feeds.is_empty() {
        log::warn!("no feed conditions given; all flows stay at zero");
    }

    Ok((ast, sim, feeds))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Simulate { circuit } => {
            let (ast, mut sim, feeds) = load(&circuit)?;
            sim.apply_feeds(&feeds)?;
            let result = sim.simulate();
            report::write_simulation(&mut out, sim.circuit(), &result)?;

            let scenarios = scenarios_from_ast(&ast.scenarios)?;
            if !scenarios.is_empty() {
                let results = simulate_scenarios(&sim, &feeds, &scenarios)?;
                writeln!(out)?;
                report::write_scenarios(&mut out, &results)?;
            }
        }
        Command::Montecarlo {
            circuit,
            trials,
            targets,
            mass_range,
            fine_range,
            grade_min,
            grade_max,
            ceiling,
            no_ceiling,
            seed,
            rows,
        } => {
            let (ast, sim, feeds) = load(&circuit)?;
            let mut config = MonteCarloConfig::from_ast(&ast.montecarlo)?;

            if !targets.is_empty() {
                config.targets = targets.into_iter().map(Target::with_default_ranges).collect();
            } else if config.targets.is_empty() {
                config.targets = sim
                    .circuit()
                    .nodes()
                    .iter()
                    .filter(|n| n.is_splitter())
                    .map(|n| Target::with_default_ranges(n.name.clone()))
                    .collect();
            }
            let as_range = |v: &[f64]| ParamRange::new(v[0], v[1]);
            for target in &mut config.targets {
                if let Some(range) = mass_range.as_deref() {
                    target.mass = Some(as_range(range));
                }
                if let Some(range) = fine_range.as_deref() {
                    target.fine = Some(as_range(range));
                }
            }

            if let Some(n) = trials {
                config.trials = n;
            }
            if let Some(s) = seed {
                config.seed = s;
            }
            if grade_min.is_some() {
                config.grade_min = grade_min;
            }
            if grade_max.is_some() {
                config.grade_max = grade_max;
            }
            if no_ceiling {
                config.grade_ceiling = None;
            } else if ceiling.is_some() {
                config.grade_ceiling = ceiling;
            }

            let table = MonteCarlo::new(&sim, &config)?.run(&feeds)?;
            if rows {
                report::write_table(&mut out, &table, ',')?;
                report::write_montecarlo_summary(&mut io::stderr(), &table)?;
            } else {
                report::write_montecarlo_summary(&mut out, &table)?;
            }
        }
    }

    Ok(())
}
