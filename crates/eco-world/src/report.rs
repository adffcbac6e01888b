//! Final-state reports.

use crate::grid::{Census, Grid};
use crate::simulation::Simulation;
use eco_core::{CellKind, EcosystemConfig, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Write the text report:
///
/// ```text
/// RABBIT_PROC FOX_PROC FOX_FOOD GENERATIONS_LEFT ROWS COLS LIVE
/// KIND row col        (one line per non-empty cell, row-major)
/// ```
pub fn write_text<W: Write>(
    out: &mut W,
    config: &EcosystemConfig,
    generations_left: u64,
    grid: &Grid,
) -> Result<()> {
    writeln!(
        out,
        "{} {} {} {} {} {} {}",
        config.rabbit_procreation,
        config.fox_procreation,
        config.fox_starvation,
        generations_left,
        grid.rows(),
        grid.cols(),
        grid.live_count()
    )?;
    for (pos, cell) in grid.occupied() {
        writeln!(out, "{} {}", cell.kind, pos)?;
    }
    Ok(())
}

/// One occupied cell in a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub kind: CellKind,
    pub row: usize,
    pub col: usize,
    pub proc_age: u32,
    pub food_age: u32,
}

/// Serializable snapshot of a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub config: EcosystemConfig,
    pub generation: u64,
    pub census: Census,
    pub cells: Vec<CellRecord>,
}

impl Report {
    pub fn new(sim: &Simulation) -> Self {
        let grid = sim.grid();
        let cells = grid
            .occupied()
            .map(|(pos, cell)| CellRecord {
                kind: cell.kind,
                row: pos.row,
                col: pos.col,
                proc_age: cell.proc_age,
                food_age: cell.food_age,
            })
            .collect();

        Self {
            config: *sim.config(),
            generation: sim.generation(),
            census: grid.census(),
            cells,
        }
    }

    pub fn generations_left(&self) -> u64 {
        self.config.generations.saturating_sub(self.generation)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{EngineConfig, Scenario};

    const INPUT: &str = "\
2 4 3 6 5 5 9
ROCK 0 0
RABBIT 0 2
FOX 0 4
FOX 1 0
FOX 1 4
ROCK 2 4
RABBIT 3 0
RABBIT 4 0
FOX 4 4
";

    #[test]
    fn test_text_report_initial_state() {
        let scenario = Scenario::parse(INPUT).unwrap();
        let sim = Simulation::new(&scenario, EngineConfig::default()).unwrap();

        let mut out = Vec::new();
        write_text(&mut out, sim.config(), 6, sim.grid()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "\
2 4 3 6 5 5 9
ROCK 0 0
RABBIT 0 2
FOX 0 4
FOX 1 0
FOX 1 4
ROCK 2 4
RABBIT 3 0
RABBIT 4 0
FOX 4 4
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_json_report() {
        let scenario = Scenario::parse(INPUT).unwrap();
        let mut sim = Simulation::new(&scenario, EngineConfig::default()).unwrap();
        sim.run();

        let report = Report::new(&sim);
        assert_eq!(report.generation, 6);
        assert_eq!(report.generations_left(), 0);
        assert_eq!(report.cells.len(), sim.grid().live_count());
        assert_eq!(report.census, sim.grid().census());

        let json = report.to_json().unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
