//! Files written by a run
//!
//! Given the output path `out`, a run writes the final assertion to `out`
//! and its reports next to it: `out.fitness.csv`, `out.generations.csv`,
//! `out.stats.json` and `out.best.txt`.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::population::individual::Individual;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub assertion: PathBuf,
    pub fitness: PathBuf,
    pub generations: PathBuf,
    pub stats: PathBuf,
    pub best: PathBuf,
}

impl OutputPaths {
    pub fn new(output: impl AsRef<Path>) -> Self {
        let output = output.as_ref();
        let with_suffix = |suffix: &str| {
            let mut name = output.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            assertion: output.to_path_buf(),
            fitness: with_suffix(".fitness.csv"),
            generations: with_suffix(".generations.csv"),
            stats: with_suffix(".stats.json"),
            best: with_suffix(".best.txt"),
        }
    }
}

/// Create `path` and its missing parent directories
pub fn create_file(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Periodic dump of the best individuals
#[derive(Debug)]
pub struct BestIndividualsWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> BestIndividualsWriter<W> {
    /// Write at most `count` individuals per generation
    pub fn new(out: W, count: usize) -> Self {
        Self { out, count }
    }

    pub fn write_individuals(&mut self, generation: usize, individuals: &[Arc<Individual>]) -> io::Result<()> {
        writeln!(self.out, "[GENERATION {}]", generation)?;
        for individual in individuals.iter().take(self.count) {
            writeln!(self.out, "{}", individual.assertion())?;
            writeln!(
                self.out,
                "{:.5},{:.5}",
                individual.fitness_fp(),
                individual.fitness_fn()
            )?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Summary of the final assertion
pub fn write_fitness_csv<W: Write>(
    mut out: W,
    correct_states: usize,
    incorrect_states: usize,
    generations: Option<usize>,
    best: &Individual,
) -> io::Result<()> {
    writeln!(out, "CorrectStates,IncorrectStates,Generations,FP,FN,complexity")?;
    let generations = generations.map_or_else(|| "null".to_string(), |g| g.to_string());
    write!(
        out,
        "{},{},{},{},{},{}",
        correct_states,
        incorrect_states,
        generations,
        best.fitness_fp(),
        best.fitness_fn(),
        best.complexity
    )?;
    out.flush()
}
