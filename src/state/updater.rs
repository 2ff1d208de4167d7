//! States updaters
//!
//! During the search the current best assertions may be handed to an
//! external process that looks for executions they misclassify; the new
//! correct states it reports are added to the corpus.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::error::DataError;
use crate::population::individual::Individual;
use crate::state::variables::TestExecution;

/// File extension of a state record
pub const STATE_FILE_SUFFIX: &str = ".state.json";

pub trait StatesUpdater: Send + Debug {
    /// Publish the current best assertions with the time the reader may take
    fn write_individuals(&mut self, individuals: &[Arc<Individual>], budget: Duration) -> Result<(), DataError>;

    /// New correct executions found since the last read
    fn read_states(&mut self) -> Result<Vec<TestExecution>, DataError>;

    fn sync(&mut self, individuals: &[Arc<Individual>], budget: Duration) -> Result<Vec<TestExecution>, DataError> {
        self.write_individuals(individuals, budget)?;
        self.read_states()
    }
}

/// Never adds states
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStatesUpdater;

impl StatesUpdater for NullStatesUpdater {
    fn write_individuals(&mut self, _individuals: &[Arc<Individual>], _budget: Duration) -> Result<(), DataError> {
        Ok(())
    }

    fn read_states(&mut self) -> Result<Vec<TestExecution>, DataError> {
        Ok(Vec::new())
    }
}

/// Exchange through a directory
///
/// The best assertions are written to `<dir>/assertions.txt`, one per line
/// after a `budget_seconds=` header. Every `*.state.json` file of `<dir>`
/// that was not read before is loaded as a new correct execution.
#[derive(Debug)]
pub struct DirectoryStatesUpdater {
    dir: PathBuf,
    seen: BTreeSet<PathBuf>,
}

impl DirectoryStatesUpdater {
    pub const ASSERTIONS_FILE: &'static str = "assertions.txt";

    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seen: BTreeSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StatesUpdater for DirectoryStatesUpdater {
    fn write_individuals(&mut self, individuals: &[Arc<Individual>], budget: Duration) -> Result<(), DataError> {
        let mut out = fs::File::create(self.dir.join(Self::ASSERTIONS_FILE))?;
        writeln!(out, "budget_seconds={}", budget.as_secs())?;
        for individual in individuals {
            writeln!(out, "{}", individual.assertion())?;
        }
        Ok(())
    }

    fn read_states(&mut self) -> Result<Vec<TestExecution>, DataError> {
        let mut paths = state_files(&self.dir)?;
        paths.retain(|p| !self.seen.contains(p));
        let mut executions = Vec::with_capacity(paths.len());
        for path in paths {
            executions.push(TestExecution::load(&path)?);
            debug!("read new state {}", path.display());
            self.seen.insert(path);
        }
        Ok(executions)
    }
}

/// State record files of a directory, sorted by path
pub fn state_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_state = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(STATE_FILE_SUFFIX));
        if is_state && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;

    fn record(test: &str, x: f64) -> String {
        format!(
            r#"{{"systemId":"v1","testId":"{}","variables":{{"inputs":{{"x":{}}},"outputs":{{}}}}}}"#,
            test, x
        )
    }

    #[test]
    fn test_null_updater() {
        let mut updater = NullStatesUpdater;
        let states = updater
            .sync(&[Arc::new(scored("x > 1", 0.0, 0.0))], Duration::from_secs(60))
            .unwrap();
        assert!(states.is_empty());
    }

    #[test]
    fn test_directory_updater_reads_each_state_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut updater = DirectoryStatesUpdater::new(dir.path()).unwrap();
        fs::write(dir.path().join("v1-t1.state.json"), record("t1", 1.0)).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let best = vec![Arc::new(scored("x > 1", 0.0, 0.0))];
        let first = updater.sync(&best, Duration::from_secs(180)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].test_id, "t1");
        let written = fs::read_to_string(dir.path().join(DirectoryStatesUpdater::ASSERTIONS_FILE)).unwrap();
        assert_eq!(written, "budget_seconds=180\n(x > 1)\n");

        fs::write(dir.path().join("v1-t2.state.json"), record("t2", 2.0)).unwrap();
        let second = updater.read_states().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].test_id, "t2");
        assert!(updater.read_states().unwrap().is_empty());
    }
}
