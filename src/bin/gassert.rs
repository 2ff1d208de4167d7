//! gassert CLI: evolve an assertion from a corpus of classified executions.
//!
//! ```text
//! gassert [--config gassert.toml] <manager> <manager-args> <updater> <updater-args> \
//!         <initial-assertion> <seed> <time-budget-minutes> <output>
//! gassert split-mr "(x_s < x_f) => (o_r_s <= o_r_f)"
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use gassert::algorithms::{EvolutionResult, EvolutionaryAlgorithm};
use gassert::config::Config;
use gassert::data::{DataManagerArgs, DataManagerRegistry, StatesUpdaterRegistry};
use gassert::diagnostics::output::{create_file, write_fitness_csv};
use gassert::diagnostics::{OutputPaths, Stats, Timings};
use gassert::error::{EvoResult, EvolutionError};
use gassert::genome::relation::split_mr_text;
use gassert::state::Corpus;

#[derive(Parser)]
#[command(name = "gassert")]
#[command(about = "Evolutionary synthesis of assertions and metamorphic relations")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML file overriding the default configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data manager (regular, metamorphic)
    #[arg(required = true)]
    manager: Option<String>,

    /// Data manager arguments: [tool;]states_dir;classifications[;max_correct;max_incorrect]
    #[arg(required = true, allow_hyphen_values = true)]
    manager_args: Option<String>,

    /// States updater (null, directory)
    #[arg(required = true)]
    updater: Option<String>,

    /// States updater arguments
    #[arg(required = true, allow_hyphen_values = true)]
    updater_args: Option<String>,

    /// Assertion seeding the initial population
    #[arg(required = true, allow_hyphen_values = true)]
    initial_assertion: Option<String>,

    /// Random seed, negative values included
    #[arg(required = true, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// Time budget in minutes
    #[arg(required = true)]
    time_budget: Option<u64>,

    /// Output file of the final assertion; reports are written next to it
    #[arg(required = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a metamorphic relation `IR => OR` into its two sides
    SplitMr {
        /// The relation
        #[arg(allow_hyphen_values = true)]
        relation: String,
    },
}

/// Arguments of a search
struct RunArgs {
    manager: String,
    manager_args: String,
    updater: String,
    updater_args: String,
    initial_assertion: String,
    seed: i64,
    time_budget: u64,
    output: PathBuf,
}

impl Cli {
    fn run_args(self) -> EvoResult<RunArgs> {
        let missing = |name: &str| EvolutionError::Configuration(format!("missing argument <{}>", name));
        Ok(RunArgs {
            manager: self.manager.ok_or_else(|| missing("manager"))?,
            manager_args: self.manager_args.ok_or_else(|| missing("manager-args"))?,
            updater: self.updater.ok_or_else(|| missing("updater"))?,
            updater_args: self.updater_args.ok_or_else(|| missing("updater-args"))?,
            initial_assertion: self.initial_assertion.ok_or_else(|| missing("initial-assertion"))?,
            seed: self.seed.ok_or_else(|| missing("seed"))?,
            time_budget: self.time_budget.ok_or_else(|| missing("time-budget"))?,
            output: self.output.ok_or_else(|| missing("output"))?,
        })
    }
}

/// Counters and time accumulators in one JSON object
#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(flatten)]
    stats: &'a Stats,
    #[serde(flatten)]
    time: &'a Timings,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cli = Cli::parse();
    let outcome = match cli.command.take() {
        Some(Commands::SplitMr { relation }) => split_mr(&relation),
        None => search(cli),
    };
    // Failures are reported, never turned into an exit code
    if let Err(e) = outcome {
        error!("{}", e);
    }
}

fn split_mr(relation: &str) -> EvoResult<()> {
    let (ir, or) = split_mr_text(relation)?;
    println!("{}", ir);
    println!("{}", or);
    Ok(())
}

fn search(cli: Cli) -> EvoResult<()> {
    let config = load_config(cli.config.as_deref())?;
    run(config, cli.run_args()?)
}

fn load_config(path: Option<&Path>) -> EvoResult<Config> {
    match path {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Ok(Config::load(path)?)
        }
        None => Ok(Config::default()),
    }
}

fn run(mut config: Config, args: RunArgs) -> EvoResult<()> {
    // negative seeds wrap
    config.seed = args.seed as u64;
    config.time_budget_minutes = args.time_budget;
    config.validate()?;
    init_worker_pool(&config);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let manager_args = DataManagerArgs::parse(&args.manager_args)?.with_default_limits(
        config.dataset_correct_states(config.time_budget_minutes),
        config.dataset_incorrect_states(config.time_budget_minutes),
    );
    let data = DataManagerRegistry::default().create(&args.manager, manager_args, &mut rng)?;
    let corpus = data.corpus();
    info!(
        "corpus: {} correct and {} incorrect executions, {} variables",
        corpus.correct.len(),
        corpus.incorrect.len(),
        data.variables().len()
    );
    if corpus.is_degenerate() {
        info!("nothing to learn from, exiting");
        return Ok(());
    }
    let updater = StatesUpdaterRegistry::default().create(&args.updater, &args.updater_args)?;

    let paths = OutputPaths::new(&args.output);
    let initial: Vec<String> = Some(args.initial_assertion)
        .filter(|a| !a.trim().is_empty())
        .into_iter()
        .collect();
    let mut algorithm = EvolutionaryAlgorithm::builder(data)
        .config(config)
        .states_updater(updater)
        .initial_assertions(initial)
        .best_individuals_output(Box::new(create_file(&paths.best)?))
        .build()?;
    let result = algorithm.run(&mut rng)?;
    info!("finished: {}", result.termination_reason);

    write_outputs(&paths, &algorithm, &result)
}

#[cfg(feature = "parallel")]
fn init_worker_pool(config: &Config) {
    let threads = config.worker_threads();
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        warn!("could not size the worker pool to {} threads: {}", threads, e);
    }
}

#[cfg(not(feature = "parallel"))]
fn init_worker_pool(config: &Config) {
    if config.worker_threads > Some(1) {
        warn!("built without the parallel feature, evaluating on one thread");
    }
}

fn write_outputs(paths: &OutputPaths, algorithm: &EvolutionaryAlgorithm, result: &EvolutionResult) -> EvoResult<()> {
    let output = &result.output;
    let mut out = create_file(&paths.assertion)?;
    write!(out, "{}", output.assertion())?;
    out.flush()?;

    let Corpus { correct, incorrect } = algorithm.data().corpus();
    write_fitness_csv(
        create_file(&paths.fitness)?,
        correct.len(),
        incorrect.len(),
        Some(result.generations),
        output,
    )?;
    result.history.write_csv(create_file(&paths.generations)?)?;

    let ctx = algorithm.context();
    let report = RunReport {
        stats: &ctx.stats,
        time: &ctx.timings,
    };
    let mut out = create_file(&paths.stats)?;
    serde_json::to_writer_pretty(&mut out, &report).map_err(|e| EvolutionError::Serialization(e.to_string()))?;
    out.flush()?;

    info!("assertion written to {}", paths.assertion.display());
    Ok(())
}
