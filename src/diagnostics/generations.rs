//! Per-generation history of both phases

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::population::criteria::Phase;
use crate::population::individual::Individual;
use crate::population::population::{Population, PopulationStatistics};

/// One row of the history of a phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// The best of the best changed in this generation
    pub found_better: bool,
    /// Rates of the best of the best, -1 when there is none yet
    pub best_fp: f64,
    pub best_fn: f64,
    pub avg_fp: f64,
    pub avg_fn: f64,
    pub avg_complexity: f64,
    pub avg_fp_plus_fn: f64,
    pub avg_fp_times_fn: f64,
}

impl GenerationRecord {
    pub fn new(population: &Population, best: Option<&Individual>, found_better: bool) -> Self {
        let PopulationStatistics {
            avg_fp,
            avg_fn,
            avg_complexity,
            avg_fp_plus_fn,
            avg_fp_times_fn,
        } = population.statistics();
        Self {
            found_better,
            best_fp: best.map_or(-1.0, Individual::fitness_fp),
            best_fn: best.map_or(-1.0, Individual::fitness_fn),
            avg_fp,
            avg_fn,
            avg_complexity,
            avg_fp_plus_fn,
            avg_fp_times_fn,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Generations {
    phases: [Vec<GenerationRecord>; 2],
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: Phase, record: GenerationRecord) {
        self.phases[phase.index()].push(record);
    }

    pub fn history(&self, phase: Phase) -> &[GenerationRecord] {
        &self.phases[phase.index()]
    }

    /// Generations recorded by the longest phase
    pub fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// CSV with one group of columns per phase; missing rows print as `?`
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        for phase in Phase::ALL {
            let i = phase.index();
            write!(
                out,
                "newBestIndividual[{i}],bestFP[{i}],bestFN[{i}],avgFitnessFP[{i}],avgFitnessFN[{i}],\
                 avgComplexity[{i}],avgFitnessFPplusFN[{i}],avgFitnessFPtimesFN[{i}],"
            )?;
        }
        writeln!(out)?;
        for generation in 0..self.len() {
            for phase in Phase::ALL {
                match self.phases[phase.index()].get(generation) {
                    Some(r) => write!(
                        out,
                        "{},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},",
                        u8::from(r.found_better),
                        r.best_fp,
                        r.best_fn,
                        r.avg_fp,
                        r.avg_fn,
                        r.avg_complexity,
                        r.avg_fp_plus_fn,
                        r.avg_fp_times_fn
                    )?,
                    None => write!(out, "?,?,?,?,?,?,?,?,")?,
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;
    use std::sync::Arc;

    #[test]
    fn test_record_from_population() {
        let pop = Population::from_individuals(
            vec![Arc::new(scored("x > 1", 0.5, 0.0)), Arc::new(scored("x > 2", 0.0, 0.5))],
            2,
        );
        let best = scored("x > 2", 0.0, 0.5);
        let record = GenerationRecord::new(&pop, Some(&best), true);
        assert_eq!(record.best_fp, 0.0);
        assert_eq!(record.best_fn, 0.5);
        assert!((record.avg_fp - 0.25).abs() < 1e-12);
        assert!((record.avg_fp_plus_fn - 0.5).abs() < 1e-12);
        assert_eq!(record.avg_fp_times_fn, 0.0);

        let empty = GenerationRecord::new(&Population::new(1), None, false);
        assert_eq!(empty.best_fp, -1.0);
    }

    #[test]
    fn test_csv_layout() {
        let mut generations = Generations::new();
        let record = GenerationRecord {
            found_better: true,
            best_fp: 0.25,
            best_fn: 0.5,
            avg_fp: 0.5,
            avg_fn: 0.5,
            avg_complexity: 7.0,
            avg_fp_plus_fn: 1.0,
            avg_fp_times_fn: 0.25,
        };
        generations.record(Phase::Fp, record);
        generations.record(Phase::Fp, record);
        generations.record(Phase::Fn, record);
        assert_eq!(generations.len(), 2);

        let mut buffer = Vec::new();
        generations.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("newBestIndividual[0],bestFP[0]"));
        assert!(lines[0].contains("avgFitnessFPtimesFN[1],"));
        assert!(lines[1].starts_with("1,0.25000,0.50000,0.50000,0.50000,7.00000,1.00000,0.25000,1,"));
        assert!(lines[2].ends_with("?,?,?,?,?,?,?,?,"));
    }
}
