//! Loading of state records and test classifications

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::state::updater::state_files;
use crate::state::TestExecution;

/// Verdict of the test oracle on one execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Correct,
    Incorrect,
}

impl Classification {
    /// Verdict of a source/follow-up pair: correct only when both are
    pub fn metamorphic(source: Classification, followup: Classification) -> Classification {
        if source == Classification::Correct && followup == Classification::Correct {
            Classification::Correct
        } else {
            Classification::Incorrect
        }
    }
}

/// `systemId -> testId -> verdict`
pub type Classifications = BTreeMap<String, BTreeMap<String, Classification>>;

/// `systemId -> testId -> execution`
pub type Executions = BTreeMap<String, BTreeMap<String, TestExecution>>;

pub fn load_classifications(path: &Path) -> Result<Classifications, DataError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Every `*.state.json` record of `dir`, rejecting duplicated ids
pub fn load_executions(dir: &Path) -> Result<Executions, DataError> {
    let mut executions = Executions::new();
    for path in state_files(dir)? {
        let execution = TestExecution::load(&path)?;
        let tests = executions.entry(execution.system_id.clone()).or_default();
        if tests.contains_key(&execution.test_id) {
            return Err(DataError::InvalidRecord {
                record: format!("{}/{}", execution.system_id, execution.test_id),
                message: "duplicate execution".to_string(),
            });
        }
        tests.insert(execution.test_id.clone(), execution);
    }
    Ok(executions)
}

/// Keep at most `max` items, chosen uniformly without replacement; order is preserved
pub fn sample<T>(items: Vec<T>, max: Option<usize>, rng: &mut dyn RngCore) -> Vec<T> {
    match max {
        Some(max) if items.len() > max => {
            let mut keep = vec![false; items.len()];
            for i in rand::seq::index::sample(rng, items.len(), max) {
                keep[i] = true;
            }
            items
                .into_iter()
                .zip(keep)
                .filter_map(|(item, k)| k.then_some(item))
                .collect()
        }
        _ => items,
    }
}
