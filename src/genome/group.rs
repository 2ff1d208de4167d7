//! Assertions as a template plus one tree per slot

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::TreeError;
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::template::TreeTemplate;
use crate::genome::tree::Tree;
use crate::state::ValueType;

/// The genome of an individual
///
/// Groups are values: operators return new groups built from copies of
/// the parents' trees, so no subtree is shared between individuals.
#[derive(Clone, Debug)]
pub struct TreeGroup {
    template: Arc<TreeTemplate>,
    mappings: BTreeMap<usize, Tree>,
}

impl PartialEq for TreeGroup {
    fn eq(&self, other: &Self) -> bool {
        self.mappings == other.mappings
    }
}

impl TreeGroup {
    /// Bind trees to the slots of a template; every slot needs a tree
    pub fn new(template: Arc<TreeTemplate>, mappings: BTreeMap<usize, Tree>) -> Result<Self, TreeError> {
        if let Some(slot) = template.slots().into_iter().find(|s| !mappings.contains_key(s)) {
            return Err(TreeError::MissingSlot(slot));
        }
        Ok(Self { template, mappings })
    }

    pub fn template(&self) -> &Arc<TreeTemplate> {
        &self.template
    }

    pub fn mappings(&self) -> &BTreeMap<usize, Tree> {
        &self.mappings
    }

    pub fn slots(&self) -> Vec<usize> {
        self.mappings.keys().copied().collect()
    }

    pub fn tree(&self, slot: usize) -> Option<&Tree> {
        self.mappings.get(&slot)
    }

    pub fn tree_mut(&mut self, slot: usize) -> Option<&mut Tree> {
        self.mappings.get_mut(&slot)
    }

    pub fn builder(&self, slot: usize) -> Option<&Arc<GeneratedTreeBuilder>> {
        self.template.builder(slot)
    }

    /// Copy of the group with another tree in `slot`
    pub fn with_tree(&self, slot: usize, tree: Tree) -> Self {
        let mut group = self.clone();
        group.mappings.insert(slot, tree);
        group
    }

    pub fn ty(&self) -> ValueType {
        self.template.ty()
    }

    /// The concrete assertion
    pub fn build_tree(&self) -> Result<Tree, TreeError> {
        self.template.build_tree(&self.mappings)
    }

    /// Node count of the concrete assertion
    pub fn complexity(&self) -> usize {
        self.template.static_nodes() + self.mappings.values().map(Tree::number_of_nodes).sum::<usize>()
    }

    /// Paths of the numeric literals, per slot
    pub fn number_positions(&self) -> Vec<(usize, Vec<usize>)> {
        self.mappings
            .iter()
            .flat_map(|(slot, tree)| tree.number_positions().into_iter().map(move |p| (*slot, p)))
            .collect()
    }
}

impl fmt::Display for TreeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build_tree() {
            Ok(tree) => write!(f, "{}", tree),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::genome::factory::TreeFactory;
    use crate::genome::parser::TreeReader;
    use crate::genome::template::{IR_SLOT, OR_SLOT};
    use crate::state::{Variables, VariablesManager};

    fn template() -> Arc<TreeTemplate> {
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0).with_output("o_y", 0.0));
        let config = Arc::new(Config::default());
        let builder = || {
            Arc::new(GeneratedTreeBuilder::new(
                TreeFactory::new(vars.clone(), config.clone()),
                ValueType::Boolean,
                5,
                16,
            ))
        };
        Arc::new(TreeTemplate::metamorphic(builder(), builder()))
    }

    #[test]
    fn test_group_accessors() {
        let template = template();
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0).with_output("o_y", 0.0));
        let tree = TreeReader::new(&vars).read("(x > 1.5) => (o_y == 2)").unwrap();
        let group = template.match_tree(&tree).unwrap();
        assert_eq!(group.complexity(), 7);
        assert_eq!(group.to_string(), "((x > 1.5) => (o_y == 2))");
        assert_eq!(group.number_positions(), vec![(IR_SLOT, vec![1]), (OR_SLOT, vec![1])]);

        let changed = group.with_tree(OR_SLOT, Tree::boolean(true));
        assert_eq!(changed.to_string(), "((x > 1.5) => true)");
        assert_ne!(changed, group);
        assert_eq!(group.tree(OR_SLOT).unwrap().to_string(), "(o_y == 2)");
    }

    #[test]
    fn test_new_requires_every_slot() {
        let mut mappings = BTreeMap::new();
        mappings.insert(OR_SLOT, Tree::boolean(true));
        assert_eq!(
            TreeGroup::new(template(), mappings).unwrap_err(),
            TreeError::MissingSlot(IR_SLOT)
        );
    }
}
