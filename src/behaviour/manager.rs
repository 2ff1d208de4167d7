//! The behaviour manager and its presets

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::Rng;

use crate::cache::AssertionManager;
use crate::config::{Config, Tool};
use crate::error::{OperatorError, OperatorResult, TreeError};
use crate::fitness::evaluator::{EvaluationContext, Evaluator, GuardedEvaluator};
use crate::fitness::functions::{FalseNegativeFitness, FalsePositiveFitness, FitnessFunction};
use crate::fitness::validators::{
    AllValidator, ComplexityValidator, InputRelationSatisfactionValidator,
    MetamorphicOutputRelationValidator, NullValidator, SlotComplexityValidator, Validator,
};
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::factory::TreeFactory;
use crate::genome::group::TreeGroup;
use crate::genome::template::{TreeTemplate, IR_SLOT, OR_SLOT};
use crate::operators::crossover::{GroupCrossoverKind, SingleTreeCrossover, SwappingTreeCrossover};
use crate::operators::mutation::SingleTreeMutation;
use crate::operators::selection::{BestMatchSelection, RandomSelection, SelectionKind, TournamentSelection};
use crate::operators::traits::{GroupCrossover, GroupMutation, ParentSelection};
use crate::operators::weighted::WeightedChoice;
use crate::population::criteria::Phase;
use crate::population::individual::Individual;
use crate::state::{Corpus, ValueType, VariablesManager};

/// Everything the evolutionary loop needs to know about the assertions it evolves
#[derive(Debug)]
pub struct BehaviourManager {
    pub config: Arc<Config>,
    pub template: Arc<TreeTemplate>,
    /// Variables the assertions may use
    pub variables: VariablesManager,
    pub validator: Box<dyn Validator>,
    pub elite_validator: Box<dyn Validator>,
    pub fitness_fp: Box<dyn FitnessFunction>,
    pub fitness_fn: Box<dyn FitnessFunction>,
    pub evaluator: Box<dyn Evaluator>,
    pub selections: WeightedChoice<SelectionKind>,
    pub crossovers: WeightedChoice<GroupCrossoverKind>,
    pub mutation: SingleTreeMutation,
    pub elitism_enabled: bool,
    pub migration_enabled: bool,
}

impl BehaviourManager {
    /// Single BOOLEAN slot over every variable
    pub fn regular(variables: VariablesManager, config: Arc<Config>) -> Self {
        let builder = GeneratedTreeBuilder::new(
            TreeFactory::new(variables.clone(), Arc::clone(&config)),
            ValueType::Boolean,
            config.max_depth_tree,
            config.max_complexity,
        );
        let template = Arc::new(TreeTemplate::regular(Arc::new(builder)));
        let validator = ComplexityValidator {
            max: config.max_complexity,
        };
        Self::with_defaults(template, variables, Box::new(validator), Box::new(NullValidator), config)
    }

    /// `IR => OR`: the input relation over the input variables, the output
    /// relation over every variable
    pub fn metamorphic(variables: VariablesManager, inputs: &BTreeSet<String>, config: Arc<Config>) -> Self {
        let input_variables = variables.filter(|name, _| inputs.contains(name));
        let ir = GeneratedTreeBuilder::new(
            TreeFactory::new(input_variables, Arc::clone(&config)),
            ValueType::Boolean,
            config.max_depth_ir_tree,
            config.max_ir_complexity,
        );
        let or = GeneratedTreeBuilder::new(
            TreeFactory::new(variables.clone(), Arc::clone(&config)),
            ValueType::Boolean,
            config.max_depth_or_tree,
            config.max_or_complexity,
        );
        let template = Arc::new(TreeTemplate::metamorphic(Arc::new(ir), Arc::new(or)));
        let validator = AllValidator::new()
            .with(SlotComplexityValidator {
                slot: IR_SLOT,
                max: config.max_ir_complexity,
            })
            .with(SlotComplexityValidator {
                slot: OR_SLOT,
                max: config.max_or_complexity,
            })
            .with(InputRelationSatisfactionValidator {
                slot: IR_SLOT,
                min: config.ir_satisfaction_min,
                max: config.ir_satisfaction_max,
            });
        let elite_validator = MetamorphicOutputRelationValidator { slot: OR_SLOT };

        let mut behaviour = Self::with_defaults(
            template,
            variables,
            Box::new(validator),
            Box::new(elite_validator),
            config,
        );
        behaviour.crossovers = WeightedChoice::new()
            .with(50.0, GroupCrossoverKind::Single(SingleTreeCrossover))
            .with(50.0, GroupCrossoverKind::Swapping(SwappingTreeCrossover));
        behaviour
    }

    fn with_defaults(
        template: Arc<TreeTemplate>,
        variables: VariablesManager,
        validator: Box<dyn Validator>,
        elite_validator: Box<dyn Validator>,
        config: Arc<Config>,
    ) -> Self {
        let tournament = TournamentSelection::new(config.complexity_penalized, config.complexity_theta);
        let best_match = BestMatchSelection::new(config.prob_best_selection_same_type);
        let (weights, elitism_enabled, migration_enabled) = match config.tool {
            Tool::Gassert => ([0.0, 50.0, 50.0], true, true),
            Tool::NaiveSearchBased => ([0.0, 100.0, 0.0], true, true),
            Tool::Random => ([100.0, 0.0, 0.0], false, false),
        };
        let selections = WeightedChoice::new()
            .with(weights[0], SelectionKind::Random(RandomSelection))
            .with(weights[1], SelectionKind::Tournament(tournament))
            .with(weights[2], SelectionKind::BestMatch(best_match));

        Self {
            evaluator: Box::new(GuardedEvaluator::new(config.eval_precision)),
            template,
            variables,
            validator,
            elite_validator,
            fitness_fp: Box::new(FalsePositiveFitness),
            fitness_fn: Box::new(FalseNegativeFitness),
            selections,
            crossovers: WeightedChoice::new().with(100.0, GroupCrossoverKind::Single(SingleTreeCrossover)),
            mutation: SingleTreeMutation,
            elitism_enabled,
            migration_enabled,
            config,
        }
    }

    /// Replace the evaluator
    pub fn with_evaluator<E: Evaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn context<'a>(&'a self, corpus: &'a Corpus) -> EvaluationContext<'a> {
        EvaluationContext::new(corpus, self.evaluator.as_ref())
    }

    /// Template with more than one slot
    pub fn is_metamorphic(&self) -> bool {
        self.template.slots().len() > 1
    }

    /// Propagate the generation to the schedules of every builder
    pub fn update_generation(&self, generation: usize) {
        self.template.update_generation(generation);
    }

    pub fn random_individual<R: Rng>(&self, rng: &mut R) -> Result<Individual, TreeError> {
        Individual::from_group(self.template.random_group(rng)?)
    }

    pub fn parse_individual(&self, text: &str) -> Result<Individual, TreeError> {
        Individual::from_text(text, &self.template, &self.variables)
    }

    /// Parents drawn with a weighted choice of selection
    pub fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        phase: Phase,
        cache: &AssertionManager,
        generation: usize,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)> {
        match self
            .selections
            .choose(generation, self.config.estimated_last_generation, rng)
        {
            Some(selection) => selection.select(population, phase, cache, rng),
            None => OperatorResult::Failed(OperatorError::InvalidConfiguration(
                "every selection has weight zero".to_string(),
            )),
        }
    }

    pub fn crossover<R: Rng>(
        &self,
        mother: &TreeGroup,
        father: &TreeGroup,
        generation: usize,
        rng: &mut R,
    ) -> OperatorResult<(TreeGroup, TreeGroup)> {
        match self
            .crossovers
            .choose(generation, self.config.estimated_last_generation, rng)
        {
            Some(crossover) => crossover.crossover(mother, father, rng),
            None => OperatorResult::Failed(OperatorError::InvalidConfiguration(
                "every crossover has weight zero".to_string(),
            )),
        }
    }

    pub fn mutate<R: Rng>(&self, group: &TreeGroup, rng: &mut R) -> OperatorResult<TreeGroup> {
        self.mutation.mutate(group, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TestExecution, Variables};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn regular() -> BehaviourManager {
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0).with_output("o_r", 2.0));
        BehaviourManager::regular(vars, Arc::new(Config::default()))
    }

    fn metamorphic() -> BehaviourManager {
        let vars = Variables::new()
            .with_input("x_s", 1.0)
            .with_input("x_f", 2.0)
            .with_output("o_r_s", 1.0)
            .with_output("o_r_f", 2.0);
        let inputs = vars.inputs().clone();
        BehaviourManager::metamorphic(VariablesManager::from_variables(&vars), &inputs, Arc::new(Config::default()))
    }

    #[test]
    fn test_regular_preset() {
        let behaviour = regular();
        assert!(!behaviour.is_metamorphic());
        assert!(behaviour.elitism_enabled);
        assert_eq!(behaviour.selections.weights(0, 200), vec![0.0, 50.0, 50.0]);
        assert_eq!(behaviour.template.to_string(), "$BOOLEAN_EXPR$");
    }

    #[test]
    fn test_random_tool() {
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0));
        let config = Config {
            tool: Tool::Random,
            ..Config::default()
        };
        let behaviour = BehaviourManager::regular(vars, Arc::new(config));
        assert!(!behaviour.elitism_enabled);
        assert!(!behaviour.migration_enabled);
        assert_eq!(behaviour.selections.weights(0, 200), vec![100.0, 0.0, 0.0]);
    }

    #[test]
    fn test_metamorphic_preset() {
        let behaviour = metamorphic();
        assert!(behaviour.is_metamorphic());
        assert_eq!(behaviour.crossovers.len(), 2);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let ind = behaviour.random_individual(&mut rng).unwrap();
            let ir = ind.group().tree(IR_SLOT).unwrap();
            assert!(ir.variables().iter().all(|v| v.starts_with("x_")));
            assert!(ind.group().tree(IR_SLOT).unwrap().depth() <= 5);
        }
    }

    #[test]
    fn test_compute_regular_individual() {
        let behaviour = regular();
        let corpus = Corpus::new(
            vec![
                TestExecution::new("s", "c1", Variables::new().with_input("x", 1.0).with_output("o_r", 2.0)),
                TestExecution::new("s", "c2", Variables::new().with_input("x", 3.0).with_output("o_r", 6.0)),
            ],
            vec![TestExecution::new(
                "s",
                "i1",
                Variables::new().with_input("x", 2.0).with_output("o_r", 5.0),
            )],
        );
        let mut ind = behaviour.parse_individual("o_r == (x * 2)").unwrap();
        ind.compute(&behaviour, &corpus);
        assert!(ind.is_valid());
        assert!(ind.is_elite_valid());
        assert!(ind.is_perfect());
        assert_eq!(ind.ids_fp_good().count_ones(), 2);
        assert_eq!(ind.ids_fn_good().count_ones(), 1);
    }

    #[test]
    fn test_compute_metamorphic_individual() {
        let behaviour = metamorphic();
        let pair = |id: &str, xs: f64, xf: f64, os: f64, of: f64| {
            TestExecution::new(
                "s",
                id,
                Variables::new()
                    .with_input("x_s", xs)
                    .with_input("x_f", xf)
                    .with_output("o_r_s", os)
                    .with_output("o_r_f", of),
            )
        };
        let correct: Vec<TestExecution> = (0..10)
            .map(|i| {
                let xs = i as f64;
                let xf = if i < 3 { xs + 1.0 } else { xs - 1.0 };
                pair(&format!("c{}", i), xs, xf, 2.0 * xs, 2.0 * xf)
            })
            .collect();
        let incorrect = vec![pair("i0", 1.0, 2.0, 5.0, 3.0)];
        let corpus = Corpus::new(correct, incorrect);

        let mut ind = behaviour.parse_individual("(x_s < x_f) => (o_r_s < o_r_f)").unwrap();
        ind.compute(&behaviour, &corpus);
        assert!(ind.is_valid());
        assert_eq!(ind.satisfaction.count, 3);
        assert!(ind.is_elite_valid());
        assert!(ind.is_perfect());

        let mut unsatisfiable = behaviour.parse_individual("(x_s < (x_s - 1)) => (o_r_s < o_r_f)").unwrap();
        unsatisfiable.compute(&behaviour, &corpus);
        assert!(!unsatisfiable.is_valid());
        assert_eq!(unsatisfiable.fitness_fp(), 1.0);
    }
}
