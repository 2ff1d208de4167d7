//! Data managers
//!
//! A data manager owns the corpus of a run: it loads the classified
//! executions, samples them down to the configured maxima, derives the
//! variable schema and builds the matching behaviour manager.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use rand::RngCore;

use crate::behaviour::BehaviourManager;
use crate::config::{Config, Tool};
use crate::data::loader::{load_classifications, load_executions, sample, Classification, Executions};
use crate::error::DataError;
use crate::state::{Corpus, TestExecution, VariablesManager};

/// Arguments of a data manager: `[tool;]states_dir;classifications_file[;max_correct;max_incorrect]`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataManagerArgs {
    pub tool: Option<Tool>,
    pub states_dir: PathBuf,
    pub classifications: PathBuf,
    pub max_correct: Option<usize>,
    pub max_incorrect: Option<usize>,
}

impl DataManagerArgs {
    pub fn parse(args: &str) -> Result<Self, DataError> {
        let mut parts: Vec<&str> = args.split(';').map(str::trim).collect();
        let tool = match parts.first().map(|p| p.parse::<Tool>()) {
            Some(Ok(tool)) if parts.len() > 2 => {
                parts.remove(0);
                Some(tool)
            }
            _ => None,
        };
        if parts.len() < 2 || parts.len() > 4 || parts[..2].iter().any(|p| p.is_empty()) {
            return Err(DataError::InvalidArgs(format!(
                "expected 'states_dir;classifications_file[;max_correct;max_incorrect]', got '{}'",
                args
            )));
        }
        let limit = |i: usize| -> Result<Option<usize>, DataError> {
            match parts.get(i).filter(|p| !p.is_empty()) {
                None => Ok(None),
                Some(p) => p
                    .parse()
                    .map(Some)
                    .map_err(|_| DataError::InvalidArgs(format!("'{}' is not a state count", p))),
            }
        };
        Ok(Self {
            tool,
            states_dir: PathBuf::from(parts[0]),
            classifications: PathBuf::from(parts[1]),
            max_correct: limit(2)?,
            max_incorrect: limit(3)?,
        })
    }

    /// Fill the maxima that were not given explicitly
    pub fn with_default_limits(mut self, max_correct: usize, max_incorrect: usize) -> Self {
        self.max_correct.get_or_insert(max_correct);
        self.max_incorrect.get_or_insert(max_incorrect);
        self
    }
}

pub trait DataManager: Send + Debug {
    fn corpus(&self) -> &Corpus;

    /// Variables the assertions are evaluated over
    fn variables(&self) -> &VariablesManager;

    fn inputs(&self) -> &BTreeSet<String>;

    fn outputs(&self) -> &BTreeSet<String>;

    /// Tool requested by the arguments, if any
    fn tool(&self) -> Option<Tool> {
        None
    }

    /// Grow the corpus with executions found correct during the search
    fn add_correct_states(&mut self, executions: Vec<TestExecution>) -> Result<usize, DataError>;

    fn behaviour(&self, config: Arc<Config>) -> BehaviourManager;
}

/// Schema and partitions of the first available execution
#[derive(Clone, Debug, Default)]
struct Schema {
    variables: VariablesManager,
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
}

impl Schema {
    fn of(corpus: &Corpus) -> Result<Self, DataError> {
        let schema = match corpus.correct.first().or_else(|| corpus.incorrect.first()) {
            Some(execution) => Self {
                variables: VariablesManager::from_variables(&execution.variables),
                inputs: execution.variables.inputs().clone(),
                outputs: execution.variables.outputs().clone(),
            },
            None => Self::default(),
        };
        for execution in corpus.correct.iter().chain(&corpus.incorrect) {
            schema.variables.check_consistency(&execution.variables)?;
        }
        Ok(schema)
    }
}

/// One execution per test, classified by the oracle
#[derive(Debug)]
pub struct RegularDataManager {
    args: DataManagerArgs,
    corpus: Corpus,
    schema: Schema,
}

impl RegularDataManager {
    pub fn new(args: DataManagerArgs, rng: &mut dyn RngCore) -> Result<Self, DataError> {
        let classifications = load_classifications(&args.classifications)?;
        let mut executions = load_executions(&args.states_dir)?;
        let mut correct = Vec::new();
        let mut incorrect = Vec::new();
        for (system_id, tests) in &classifications {
            for (test_id, classification) in tests {
                let Some(execution) = executions.get_mut(system_id).and_then(|t| t.remove(test_id)) else {
                    warn!("no state for {}/{}", system_id, test_id);
                    continue;
                };
                match classification {
                    Classification::Correct => correct.push(execution),
                    Classification::Incorrect => incorrect.push(execution),
                }
            }
        }
        info!("regular states: correct={}, incorrect={}", correct.len(), incorrect.len());
        let corpus = Corpus::new(
            sample(correct, args.max_correct, rng),
            sample(incorrect, args.max_incorrect, rng),
        );
        let schema = Schema::of(&corpus)?;
        Ok(Self { args, corpus, schema })
    }
}

impl DataManager for RegularDataManager {
    fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    fn variables(&self) -> &VariablesManager {
        &self.schema.variables
    }

    fn inputs(&self) -> &BTreeSet<String> {
        &self.schema.inputs
    }

    fn outputs(&self) -> &BTreeSet<String> {
        &self.schema.outputs
    }

    fn tool(&self) -> Option<Tool> {
        self.args.tool
    }

    fn add_correct_states(&mut self, executions: Vec<TestExecution>) -> Result<usize, DataError> {
        for execution in &executions {
            self.schema.variables.check_consistency(&execution.variables)?;
        }
        let added = executions.len();
        self.corpus.correct.extend(executions);
        Ok(added)
    }

    fn behaviour(&self, config: Arc<Config>) -> BehaviourManager {
        BehaviourManager::regular(self.schema.variables.clone(), config)
    }
}

/// Ordered pairs of distinct tests of the same system
///
/// A pair is correct when both executions are, incorrect otherwise. Every
/// variable `v` of the pair appears as `v_s` and `v_f`.
#[derive(Debug)]
pub struct MetamorphicDataManager {
    args: DataManagerArgs,
    corpus: Corpus,
    schema: Schema,
    /// Correct single executions, paired with the ones added later
    correct_tests: Executions,
}

impl MetamorphicDataManager {
    pub fn new(args: DataManagerArgs, rng: &mut dyn RngCore) -> Result<Self, DataError> {
        let classifications = load_classifications(&args.classifications)?;
        let executions = load_executions(&args.states_dir)?;
        let mut correct_ids = Vec::new();
        let mut incorrect_ids = Vec::new();
        for (system_id, tests) in &classifications {
            let Some(available) = executions.get(system_id) else {
                warn!("no states for system {}", system_id);
                continue;
            };
            let tests: Vec<(&String, Classification)> = tests
                .iter()
                .filter(|(test_id, _)| available.contains_key(*test_id))
                .map(|(test_id, c)| (test_id, *c))
                .collect();
            for &(source, source_class) in &tests {
                for &(followup, followup_class) in &tests {
                    if source == followup {
                        continue;
                    }
                    let id = (system_id, source, followup);
                    match Classification::metamorphic(source_class, followup_class) {
                        Classification::Correct => correct_ids.push(id),
                        Classification::Incorrect => incorrect_ids.push(id),
                    }
                }
            }
        }
        info!(
            "metamorphic states: correct={}, incorrect={}",
            correct_ids.len(),
            incorrect_ids.len()
        );
        let pair = |(system_id, source, followup): (&String, &String, &String)| {
            let tests = &executions[system_id];
            TestExecution::metamorphic(&tests[source], &tests[followup])
        };
        let correct = sample(correct_ids, args.max_correct, rng)
            .into_iter()
            .map(pair)
            .collect::<Result<Vec<_>, _>>()?;
        let incorrect = sample(incorrect_ids, args.max_incorrect, rng)
            .into_iter()
            .map(pair)
            .collect::<Result<Vec<_>, _>>()?;

        let mut correct_tests = Executions::new();
        for (system_id, tests) in &classifications {
            for (test_id, classification) in tests {
                if *classification != Classification::Correct {
                    continue;
                }
                if let Some(execution) = executions.get(system_id).and_then(|t| t.get(test_id)) {
                    correct_tests
                        .entry(system_id.clone())
                        .or_default()
                        .insert(test_id.clone(), execution.clone());
                }
            }
        }

        let corpus = Corpus::new(correct, incorrect);
        let schema = Schema::of(&corpus)?;
        Ok(Self {
            args,
            corpus,
            schema,
            correct_tests,
        })
    }
}

impl DataManager for MetamorphicDataManager {
    fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    fn variables(&self) -> &VariablesManager {
        &self.schema.variables
    }

    fn inputs(&self) -> &BTreeSet<String> {
        &self.schema.inputs
    }

    fn outputs(&self) -> &BTreeSet<String> {
        &self.schema.outputs
    }

    fn tool(&self) -> Option<Tool> {
        self.args.tool
    }

    /// Each new execution is paired both ways with the correct tests of its system
    fn add_correct_states(&mut self, executions: Vec<TestExecution>) -> Result<usize, DataError> {
        let mut pairs = Vec::new();
        for execution in executions {
            let tests = self.correct_tests.entry(execution.system_id.clone()).or_default();
            if tests.contains_key(&execution.test_id) {
                continue;
            }
            for other in tests.values() {
                pairs.push(TestExecution::metamorphic(&execution, other)?);
                pairs.push(TestExecution::metamorphic(other, &execution)?);
            }
            tests.insert(execution.test_id.clone(), execution);
        }
        for pair in &pairs {
            self.schema.variables.check_consistency(&pair.variables)?;
        }
        let added = pairs.len();
        self.corpus.correct.extend(pairs);
        Ok(added)
    }

    fn behaviour(&self, config: Arc<Config>) -> BehaviourManager {
        BehaviourManager::metamorphic(self.schema.variables.clone(), &self.schema.inputs, config)
    }
}
