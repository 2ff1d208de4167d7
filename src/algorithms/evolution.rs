//! The evolutionary algorithm
//!
//! Two phases evolve in lockstep from the same initial population: one
//! ranks individuals by false positives first, the other by false negatives
//! first. They share the assertion caches and exchange their best
//! individuals through migration. Each generation:
//!
//! 1. the generation number reaches the tree builders;
//! 2. the states updater may add correct executions, after which every
//!    individual is recomputed and the caches are cleared;
//! 3. the population is cached and the elite is carried over;
//! 4. the best individuals of the other phase migrate in;
//! 5. the literals of the top elite are tuned by local search;
//! 6. the population is filled with offspring of selection, crossover
//!    and mutation.
//!
//! The run ends on the generation budget, the time budget, an interruption
//! or an assertion without false positives or false negatives.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rand::Rng;

use crate::algorithms::avm::search_constants;
use crate::algorithms::context::RunContext;
use crate::algorithms::minimization::minimize;
use crate::behaviour::BehaviourManager;
use crate::config::Config;
use crate::data::manager::DataManager;
use crate::diagnostics::{BestIndividualsWriter, GenerationRecord, Generations, StatKey, TimeKey};
use crate::error::{EvoResult, EvolutionError};
use crate::genome::group::TreeGroup;
use crate::genome::relation::is_trivial;
use crate::population::criteria::{Criterion, Phase};
use crate::population::elitism::Elitism;
use crate::population::individual::Individual;
use crate::population::migration::Migration;
use crate::population::population::Population;
use crate::state::updater::{NullStatesUpdater, StatesUpdater};
use crate::state::ValueType;
use crate::termination::{AnyOf, Interrupted, MaxGenerations, PerfectSolution, SearchState, TerminationCriterion};

type BestWriter = BestIndividualsWriter<Box<dyn Write + Send>>;

/// Batches of offspring tried before a generation settles for a smaller population
const MAX_BREEDING_ROUNDS: usize = 50;

/// Outcome of a run
#[derive(Clone, Debug)]
pub struct EvolutionResult {
    /// The assertion to report, minimized when that keeps it meaningful
    pub output: Arc<Individual>,
    /// Best of the best of both phases, before minimization
    pub best: Arc<Individual>,
    /// Generations run
    pub generations: usize,
    pub history: Generations,
    pub termination_reason: String,
}

/// Population and elite of one phase
#[derive(Debug)]
struct Evolve {
    phase: Phase,
    population: Population,
    elitism: Elitism,
}

/// A candidate offspring: an individual kept as is, or a group to build
enum Child {
    Computed(Arc<Individual>),
    Group(TreeGroup),
}

fn every(generation: usize, period: usize) -> bool {
    period > 0 && generation % period == 0
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Builder for [`EvolutionaryAlgorithm`]
pub struct EvolutionaryAlgorithmBuilder {
    data: Box<dyn DataManager>,
    updater: Box<dyn StatesUpdater>,
    config: Config,
    initial_assertions: Vec<String>,
    best_output: Option<Box<dyn Write + Send>>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl EvolutionaryAlgorithmBuilder {
    pub fn new(data: Box<dyn DataManager>) -> Self {
        Self {
            data,
            updater: Box::new(NullStatesUpdater),
            config: Config::default(),
            initial_assertions: Vec::new(),
            best_output: None,
            interrupt: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn states_updater(mut self, updater: Box<dyn StatesUpdater>) -> Self {
        self.updater = updater;
        self
    }

    /// Assertions seeding the initial population
    pub fn initial_assertions<I, S>(mut self, assertions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_assertions = assertions.into_iter().map(Into::into).collect();
        self
    }

    /// Destination of the periodic dump of the best individuals
    pub fn best_individuals_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.best_output = Some(out);
        self
    }

    pub fn interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn build(self) -> EvoResult<EvolutionaryAlgorithm> {
        let mut config = self.config;
        if let Some(tool) = self.data.tool() {
            config.tool = tool;
        }
        config.validate()?;
        let config = Arc::new(config);

        let behaviour = self.data.behaviour(Arc::clone(&config));
        if behaviour.selections.is_empty() || behaviour.crossovers.is_empty() {
            return Err(EvolutionError::Configuration(
                "the behaviour needs a selection and a crossover".to_string(),
            ));
        }
        let mut ctx = RunContext::new(Arc::clone(&config));
        if let Some(flag) = self.interrupt {
            ctx = ctx.with_interrupt(flag);
        }
        let best_individuals_file_count = config.best_individuals_file_count;
        Ok(EvolutionaryAlgorithm {
            data: self.data,
            updater: self.updater,
            behaviour,
            migration: Migration::from_config(&config),
            ctx,
            initial_assertions: self.initial_assertions,
            best_writer: self
                .best_output
                .map(|out| BestIndividualsWriter::new(out, best_individuals_file_count)),
            history: Generations::new(),
            generation: 0,
        })
    }
}

pub struct EvolutionaryAlgorithm {
    data: Box<dyn DataManager>,
    updater: Box<dyn StatesUpdater>,
    behaviour: BehaviourManager,
    ctx: RunContext,
    initial_assertions: Vec<String>,
    best_writer: Option<BestWriter>,
    migration: Migration,
    history: Generations,
    generation: usize,
}

impl EvolutionaryAlgorithm {
    pub fn builder(data: Box<dyn DataManager>) -> EvolutionaryAlgorithmBuilder {
        EvolutionaryAlgorithmBuilder::new(data)
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn behaviour(&self) -> &BehaviourManager {
        &self.behaviour
    }

    pub fn data(&self) -> &dyn DataManager {
        self.data.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Generations run so far
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Run the search to termination
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> EvoResult<EvolutionResult> {
        let config = Arc::clone(&self.ctx.config);
        let corpus = self.data.corpus();
        if corpus.is_degenerate() {
            return Err(EvolutionError::Configuration(format!(
                "the corpus needs correct and incorrect executions, got {} and {}",
                corpus.correct.len(),
                corpus.incorrect.len()
            )));
        }
        self.ctx.start_clock();
        self.record_corpus_stats();

        info!("start initialization population");
        let initial = {
            let start = std::time::Instant::now();
            let population = self.initialize(rng);
            self.ctx.timings.add(TimeKey::InitialPopulation, start.elapsed());
            population
        };
        info!("created population of {}", initial.len());

        let mut phases = [
            Evolve {
                phase: Phase::Fp,
                population: initial.clone(),
                elitism: Elitism::from_config(&config),
            },
            Evolve {
                phase: Phase::Fn,
                population: initial,
                elitism: Elitism::from_config(&config),
            },
        ];
        let criteria = AnyOf::default()
            .with(MaxGenerations::new(config.max_generation))
            .with(self.ctx.time_budget())
            .with(Interrupted::new(self.ctx.interrupt_flag()));
        let perfect = PerfectSolution::new(config.min_generation);

        let reason = 'evolution: loop {
            let state = SearchState {
                generation: self.generation,
                elapsed: self.ctx.elapsed(),
                best: None,
            };
            if let Some(reason) = criteria.check(&state) {
                break reason;
            }
            self.generation += 1;
            let generation = self.generation;
            self.behaviour.update_generation(generation);

            if every(generation, config.info_interval) {
                self.report(&mut phases[0], generation)?;
            }
            self.update_states(&mut phases, generation);
            for evolve in &phases {
                self.cache_population(evolve, generation);
            }

            let mut next = Vec::with_capacity(phases.len());
            for evolve in phases.iter_mut() {
                let (survivors, best) = self.survivors(evolve, generation);
                let state = SearchState {
                    generation,
                    elapsed: self.ctx.elapsed(),
                    best: best.as_deref(),
                };
                if perfect.should_terminate(&state) {
                    if let Some(best) = &best {
                        info!("perfect individual in phase {}: {}", evolve.phase, best.assertion());
                    }
                    break 'evolution perfect.reason();
                }
                self.history.record(
                    evolve.phase,
                    GenerationRecord::new(
                        &evolve.population,
                        best.as_deref(),
                        evolve.elitism.generation() == generation,
                    ),
                );
                next.push(survivors);
            }

            if self.behaviour.migration_enabled && every(generation, config.generation_migration) {
                for evolve in &phases {
                    self.migration.store(evolve.phase, &evolve.population, generation, &config);
                }
                for (evolve, survivors) in phases.iter().zip(next.iter_mut()) {
                    survivors.extend(self.migration.elite_from_other(evolve.phase).iter().cloned());
                }
            }

            if every(generation, config.constant_search_generation) {
                for (evolve, survivors) in phases.iter().zip(next.iter_mut()) {
                    survivors.extend(self.tune_constants(evolve, generation));
                }
            }

            for (evolve, survivors) in phases.iter_mut().zip(next) {
                if self.ctx.is_interrupted() {
                    break;
                }
                evolve.population = self.breed(evolve, survivors, generation, rng);
            }
        };
        info!("finish evolution after {} generations: {}", self.generation, reason);

        self.finish(&mut phases, reason)
    }

    fn record_corpus_stats(&self) {
        let stats = &self.ctx.stats;
        let corpus = self.data.corpus();
        let variables = self.data.variables();
        stats.set(StatKey::TimestampStart, now_millis());
        stats.set(StatKey::NumberOfTests, (corpus.correct.len() + corpus.incorrect.len()) as i64);
        stats.set(StatKey::NumberOfBooleanVariables, variables.boolean_vars().len() as i64);
        stats.set(StatKey::NumberOfNumberVariables, variables.numeric_vars().len() as i64);
        stats.set(StatKey::NumberOfIterations, 1);
    }

    /// Initial assertions, their mutants, then random individuals
    fn initialize<R: Rng>(&self, rng: &mut R) -> Population {
        let config = &self.ctx.config;
        let corpus = self.data.corpus();
        let mut population = Population::new(config.population_size);

        let mut seeds = Vec::new();
        for assertion in self.initial_assertions.iter().filter(|a| !is_trivial(a)) {
            match self.behaviour.parse_individual(assertion) {
                Ok(individual) => {
                    let individual = self.ctx.compute(individual, &self.behaviour, corpus);
                    self.ctx.cache.cache_assertion(&individual);
                    population.add(Arc::clone(&individual));
                    seeds.push(individual);
                }
                Err(e) => warn!("ignoring initial assertion '{}': {}", assertion, e),
            }
        }
        debug!("assertions considered for mutation: {}", seeds.len());

        let mutated_target = (config.population_size as f64 * config.proportion_mutated_init).ceil() as usize;
        let max_attempts = mutated_target.saturating_mul(100);
        let mut attempts = 0;
        while !seeds.is_empty() && population.len() < mutated_target && attempts < max_attempts {
            for seed in &seeds {
                if population.len() >= mutated_target || self.ctx.should_stop() {
                    break;
                }
                attempts += 1;
                let Some(group) = self.behaviour.mutate(seed.group(), rng).genome() else {
                    continue;
                };
                let Ok(mutant) = Individual::from_group(group) else {
                    continue;
                };
                population.add(self.ctx.evaluate(mutant, &self.behaviour, corpus));
            }
            if self.ctx.should_stop() {
                break;
            }
        }

        while !population.is_full() && !self.ctx.should_stop() {
            let needed = config.population_size - population.len();
            let batch: Vec<Individual> = (0..needed)
                .filter_map(|_| match self.behaviour.random_individual(rng) {
                    Ok(individual) => Some(individual),
                    Err(e) => {
                        debug!("random individual failed: {}", e);
                        None
                    }
                })
                .collect();
            for individual in self.ctx.compute_batch(batch, &self.behaviour, corpus) {
                if population.is_full() {
                    break;
                }
                population.add(individual);
            }
        }
        population
    }

    /// Progress line and dump of the best individuals
    fn report(&mut self, evolve: &mut Evolve, generation: usize) -> EvoResult<()> {
        let best = evolve.elitism.best_individuals(generation, &self.ctx.config);
        info!(
            "generation {}: {} cached assertions, average generation time {:?}",
            generation,
            self.ctx.cache.len(),
            self.ctx.elapsed() / generation as u32
        );
        if let Some(best) = evolve.elitism.current_best() {
            info!(
                "best individual: {} (FP {:.5}, FN {:.5})",
                best.assertion(),
                best.fitness_fp(),
                best.fitness_fn()
            );
        }
        if let Some(writer) = self.best_writer.as_mut() {
            writer.write_individuals(generation, &best)?;
        }
        Ok(())
    }

    /// Hand the best individuals to the states updater and absorb the
    /// correct executions it found
    fn update_states(&mut self, phases: &mut [Evolve; 2], generation: usize) {
        let config = Arc::clone(&self.ctx.config);
        let remaining = self.ctx.remaining().as_millis() as u64;
        let Some(minutes) = config.states_update_budget(generation, remaining) else {
            return;
        };
        let best = phases[0].elitism.best_individuals(generation, &config);
        let budget = Duration::from_secs(minutes * 60);
        let updater = &mut self.updater;
        let states = self
            .ctx
            .timings
            .measure(TimeKey::LoadState, || updater.sync(&best, budget));
        let added = match states.and_then(|states| self.data.add_correct_states(states)) {
            Ok(added) => added,
            Err(e) => {
                warn!("states update failed: {}", e);
                return;
            }
        };
        if added == 0 {
            return;
        }

        let corpus = self.data.corpus();
        info!("correct states: {} (+{})", corpus.correct.len(), added);
        self.migration.recompute(&self.behaviour, corpus);
        self.ctx.cache.clear_all();
        for evolve in phases.iter_mut() {
            evolve.population.recompute(&self.behaviour, corpus);
            evolve.elitism.recompute(&self.behaviour, corpus);
        }
    }

    fn cache_population(&self, evolve: &Evolve, generation: usize) {
        let config = &self.ctx.config;
        for individual in evolve.population.iter() {
            self.ctx.cache.cache_assertion(individual);
            for phase in Phase::ALL {
                self.ctx.cache.cache_signature(phase, individual, generation, config);
            }
        }
    }

    /// Start of the next population and the best of the best of the phase
    fn survivors(&self, evolve: &mut Evolve, generation: usize) -> (Population, Option<Arc<Individual>>) {
        let config = &self.ctx.config;
        let mut survivors = Population::new(config.population_size);
        let elite = self.ctx.timings.measure(TimeKey::Elitism, || {
            evolve.elitism.update(&evolve.population, generation, config)
        });
        if self.behaviour.elitism_enabled && every(generation, config.generation_elitism) {
            survivors.extend(elite);
        }

        let best = evolve.elitism.best_of_the_best(generation, config);
        if let Some(best) = best.as_ref().filter(|b| b.is_good()) {
            debug!("good individual: {}", best.assertion());
            let stats = &self.ctx.stats;
            stats.set_if_missing(StatKey::GenerationGoodSolution, generation as i64);
            stats.set_if_missing(StatKey::TimestampGoodSolution, now_millis());
        }
        (survivors, best)
    }

    /// Improved copies of the top elite of the phase
    fn tune_constants(&self, evolve: &Evolve, generation: usize) -> Vec<Arc<Individual>> {
        let config = &self.ctx.config;
        let corpus = self.data.corpus();
        let criterion = evolve.phase.criterion();
        evolve
            .elitism
            .elite(criterion)
            .iter()
            .take(config.constant_search_individuals)
            .filter_map(|individual| {
                if self.ctx.should_stop() {
                    return None;
                }
                search_constants(individual, criterion, generation, &self.behaviour, corpus, &self.ctx)
            })
            .inspect(|tuned| debug!("tuned literals: {}", tuned.assertion()))
            .collect()
    }

    /// Fill `next` with offspring of the population of the phase
    fn breed<R: Rng>(&self, evolve: &Evolve, mut next: Population, generation: usize, rng: &mut R) -> Population {
        let config = &self.ctx.config;
        let corpus = self.data.corpus();
        let minimization = config.minimization_enabled && every(generation, config.generation_minimization);

        let mut rounds = 0;
        while !next.is_full() && !self.ctx.should_stop() && rounds < MAX_BREEDING_ROUNDS {
            rounds += 1;
            let needed = config.population_size - next.len();
            let mut fresh = Vec::with_capacity(needed);
            let mut kept = Vec::new();
            let mut attempts = 0;
            while fresh.len() + kept.len() < needed && attempts < needed.saturating_mul(4) {
                attempts += 1;
                for child in self.offspring(evolve, generation, rng) {
                    let mutate = rng.gen::<f64>() <= config.prob_mutation;
                    let group = match (child, mutate) {
                        (Child::Computed(individual), false) => {
                            kept.push(individual);
                            continue;
                        }
                        (Child::Computed(individual), true) => individual.group().clone(),
                        (Child::Group(group), _) => group,
                    };
                    let group = if mutate {
                        self.ctx.stats.increment(StatKey::NumberMutations);
                        self.ctx
                            .timings
                            .measure(TimeKey::Mutation, || self.behaviour.mutate(&group, rng).genome())
                            .unwrap_or(group)
                    } else {
                        group
                    };
                    let Ok(individual) = Individual::from_group(group) else {
                        continue;
                    };
                    if !mutate || config.cache_enabled {
                        if let Some(cached) = self.ctx.cached(individual.assertion()) {
                            kept.push(cached);
                            continue;
                        }
                    }
                    fresh.push(individual);
                }
            }

            let mut offspring = self.ctx.compute_batch(fresh, &self.behaviour, corpus);
            offspring.append(&mut kept);
            for individual in offspring {
                if next.is_full() {
                    break;
                }
                let individual = if minimization {
                    minimize(&individual, &self.behaviour, corpus, &self.ctx)
                } else {
                    individual
                };
                next.add(individual);
            }
        }
        next.truncate(config.population_size);
        next
    }

    /// Two children of selected parents, or random groups when selection fails
    fn offspring<R: Rng>(&self, evolve: &Evolve, generation: usize, rng: &mut R) -> Vec<Child> {
        let config = &self.ctx.config;
        let parents = self.ctx.timings.measure(TimeKey::Selection, || {
            self.behaviour
                .select(evolve.population.individuals(), evolve.phase, &self.ctx.cache, generation, rng)
                .genome()
        });
        let Some((mother, father)) = parents else {
            return (0..2)
                .filter_map(|_| self.behaviour.template.random_group(rng).ok())
                .map(Child::Group)
                .collect();
        };

        if rng.gen::<f64>() <= config.prob_crossover {
            self.ctx.stats.increment(StatKey::NumberCrossover);
            let children = self.ctx.timings.measure(TimeKey::CrossOver, || {
                self.behaviour
                    .crossover(mother.group(), father.group(), generation, rng)
                    .genome()
            });
            if let Some((first, second)) = children {
                return vec![Child::Group(first), Child::Group(second)];
            }
        }
        vec![Child::Computed(mother), Child::Computed(father)]
    }

    fn finish(&mut self, phases: &mut [Evolve; 2], reason: &str) -> EvoResult<EvolutionResult> {
        let config = Arc::clone(&self.ctx.config);
        let generation = self.generation;

        let best_fp_all = phases[0].elitism.best_individuals(generation, &config);
        if let Some(writer) = self.best_writer.as_mut() {
            writer.write_individuals(generation, &best_fp_all)?;
        }

        let best_fp = phases[0].elitism.best_of_the_best(generation, &config);
        let best_fn = phases[1].elitism.best_of_the_best(generation, &config);
        let (best, found_at) = match (best_fp, best_fn) {
            (Some(fp), Some(fn_)) => {
                let fp_generation = phases[0].elitism.generation();
                let fn_generation = phases[1].elitism.generation();
                if fp.assertion() == fn_.assertion() {
                    (fp, fp_generation.min(fn_generation))
                } else if Criterion::FpFn.compare(&fn_, &fp, generation, &config).is_lt() {
                    (fn_, fn_generation)
                } else {
                    (fp, fp_generation)
                }
            }
            (Some(fp), None) => (fp, phases[0].elitism.generation()),
            (None, Some(fn_)) => (fn_, phases[1].elitism.generation()),
            (None, None) => {
                let best = phases
                    .iter()
                    .filter_map(|e| e.population.best(Criterion::FpFn, generation, &config))
                    .min_by(|a, b| Criterion::FpFn.compare(a, b, generation, &config))
                    .cloned()
                    .ok_or(EvolutionError::EmptyPopulation)?;
                (best, generation)
            }
        };

        let stats = &self.ctx.stats;
        stats.set_if_missing(StatKey::GenerationGoodSolution, -1);
        stats.set_if_missing(StatKey::TimestampGoodSolution, 0);
        stats.set(StatKey::GenerationBestSolution, found_at as i64);
        stats.set(StatKey::NumberOfGenerations, generation as i64);

        info!("before minimization: {}", best.assertion());
        let output = self.output_assertion(&best);
        info!("final assertion: {}", output.assertion());

        Ok(EvolutionResult {
            output,
            best,
            generations: generation,
            history: std::mem::take(&mut self.history),
            termination_reason: reason.to_string(),
        })
    }

    /// The minimized best, unless minimization made it trivial or numeric
    fn output_assertion(&self, best: &Arc<Individual>) -> Arc<Individual> {
        let minimized = minimize(best, &self.behaviour, self.data.corpus(), &self.ctx);
        if !is_trivial(minimized.assertion()) && minimized.tree().ty != ValueType::Number {
            minimized
        } else {
            Arc::clone(best)
        }
    }
}
