//! Text reports for the CLI frontend.
//!
//! Every writer takes any [`Write`] so reports can go to stdout, a file or a
//! buffer in tests.

use std::io::Write;

use crate::circuit::Circuit;
use crate::error::Result;
use crate::solver::{MonteCarloTable, ScenarioResult, SimulationResult};

/// Columns summarized after a Monte Carlo run.
pub const SUMMARY_COLUMNS: [&str; 3] = ["recovery", "concentrate_grade", "enrichment_ratio"];

/// Circuit metrics followed by one line per flow.
pub fn write_simulation(out: &mut impl Write, circuit: &Circuit, result: &SimulationResult) -> Result<()> {
    write_metrics(out, result)?;
    writeln!(out)?;
    writeln!(
        out,
        "{:>5}  {:<10} {:<24} {:>14} {:>10} {:>14}",
        "flow", "class", "name", "mass", "grade %", "fine"
    )?;
    for (id, state) in &result.flows {
        let class = circuit
            .topology()
            .class_of(*id)
            .map(|c| c.to_string())
            .unwrap_or_default();
        let name = circuit.flow(*id).map(|f| f.name.as_str()).unwrap_or("");
        writeln!(
            out,
            "{:>5}  {:<10} {:<24} {:>14.4} {:>10.4} {:>14.6}",
            id, class, name, state.mass, state.grade, state.fine
        )?;
    }
    Ok(())
}

fn write_metrics(out: &mut impl Write, result: &SimulationResult) -> Result<()> {
    writeln!(out, "Recovery:           {:>12.4} %", result.recovery)?;
    writeln!(out, "Mass pull:          {:>12.4} %", result.mass_pull)?;
    writeln!(out, "Concentrate grade:  {:>12.4} %", result.concentrate_grade)?;
    writeln!(out, "Enrichment ratio:   {:>12.4}", result.enrichment_ratio)?;
    writeln!(out, "Mass balance error: {:>12.6}", result.mass_balance_error)?;
    writeln!(out, "Fine balance error: {:>12.6}", result.fine_balance_error)?;
    Ok(())
}

/// One line per scenario.
pub fn write_scenarios(out: &mut impl Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(
        out,
        "{:>8} {:>12} {:>12} {:>12} {:>12}",
        "scenario", "recovery", "mass_pull", "grade", "ratio"
    )?;
    for s in results {
        writeln!(
            out,
            "{:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            s.id, s.result.recovery, s.result.mass_pull, s.result.concentrate_grade, s.result.enrichment_ratio
        )?;
    }
    Ok(())
}

/// Trial counts and statistics of the main metrics.
pub fn write_montecarlo_summary(out: &mut impl Write, table: &MonteCarloTable) -> Result<()> {
    writeln!(out, "Trials:              {}", table.requested)?;
    writeln!(out, "Kept:                {}", table.len())?;
    writeln!(
        out,
        "Rejected:            {} (grade ceiling {}, non-finite {})",
        table.rejected.total(),
        table.rejected.grade_ceiling,
        table.rejected.non_finite
    )?;
    writeln!(out, "Outside grade range: {}", table.filtered_grade)?;
    writeln!(out, "Outside selectivity: {}", table.filtered_selectivity)?;

    if table.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:<18} {:>12} {:>12} {:>12} {:>12}",
        "column", "mean", "std", "min", "max"
    )?;
    for column in SUMMARY_COLUMNS {
        if let Some(s) = table.summary(column) {
            writeln!(
                out,
                "{:<18} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                column, s.mean, s.std_dev, s.min, s.max
            )?;
        }
    }
    Ok(())
}

/// Every row as delimited text with a header line.
pub fn write_table(out: &mut impl Write, table: &MonteCarloTable, delimiter: char) -> Result<()> {
    let sep = delimiter.to_string();
    writeln!(out, "{}", table.columns().join(&sep))?;
    for record in &table.records {
        let row: Vec<String> = table.row_values(record).iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", row.join(&sep))?;
    }
    Ok(())
}
