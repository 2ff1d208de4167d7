//! Templates: the fixed shape of an assertion
//!
//! A template mixes static nodes, which never change, with generated slots
//! whose trees are evolved by the slot's [`GeneratedTreeBuilder`]. Regular
//! assertions are a single BOOLEAN slot; metamorphic relations are the
//! static implication `IR => OR` over two slots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::error::TreeError;
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::group::TreeGroup;
use crate::genome::tree::{Node, Tree};
use crate::state::ValueType;

/// Slot of the input relation in a metamorphic template
pub const IR_SLOT: usize = 0;
/// Slot of the output relation in a metamorphic template
pub const OR_SLOT: usize = 1;

#[derive(Debug)]
pub enum TreeTemplate {
    /// A fixed node of the assertion
    Static {
        value: Node,
        ty: ValueType,
        left: Option<Box<TreeTemplate>>,
        right: Option<Box<TreeTemplate>>,
    },
    /// A slot filled by an evolved tree
    Generated {
        slot: usize,
        builder: Arc<GeneratedTreeBuilder>,
    },
}

impl TreeTemplate {
    /// Single generated slot
    pub fn regular(builder: Arc<GeneratedTreeBuilder>) -> Self {
        Self::Generated { slot: 0, builder }
    }

    /// `IR => OR` over two generated BOOLEAN slots
    pub fn metamorphic(ir: Arc<GeneratedTreeBuilder>, or: Arc<GeneratedTreeBuilder>) -> Self {
        Self::Static {
            value: Node::Operator("=>"),
            ty: ValueType::Boolean,
            left: Some(Box::new(Self::Generated {
                slot: IR_SLOT,
                builder: ir,
            })),
            right: Some(Box::new(Self::Generated {
                slot: OR_SLOT,
                builder: or,
            })),
        }
    }

    pub fn ty(&self) -> ValueType {
        match self {
            Self::Static { ty, .. } => *ty,
            Self::Generated { builder, .. } => builder.ty(),
        }
    }

    fn children(&self) -> impl Iterator<Item = &TreeTemplate> {
        let (left, right) = match self {
            Self::Static { left, right, .. } => (left.as_deref(), right.as_deref()),
            Self::Generated { .. } => (None, None),
        };
        left.into_iter().chain(right)
    }

    /// Slots in left-to-right order
    pub fn slots(&self) -> Vec<usize> {
        let mut slots = Vec::new();
        self.collect_slots(&mut slots);
        slots
    }

    fn collect_slots(&self, slots: &mut Vec<usize>) {
        match self {
            Self::Generated { slot, .. } => slots.push(*slot),
            Self::Static { .. } => self.children().for_each(|c| c.collect_slots(slots)),
        }
    }

    /// Builder of a slot
    pub fn builder(&self, slot: usize) -> Option<&Arc<GeneratedTreeBuilder>> {
        match self {
            Self::Generated { slot: s, builder } if *s == slot => Some(builder),
            Self::Generated { .. } => None,
            Self::Static { .. } => self.children().find_map(|c| c.builder(slot)),
        }
    }

    /// Builders of every slot
    pub fn builders(&self) -> Vec<&Arc<GeneratedTreeBuilder>> {
        self.slots().into_iter().filter_map(|s| self.builder(s)).collect()
    }

    /// Propagate the current generation to every builder
    pub fn update_generation(&self, generation: usize) {
        for builder in self.builders() {
            builder.update_generation(generation);
        }
    }

    /// Number of static nodes
    pub fn static_nodes(&self) -> usize {
        match self {
            Self::Generated { .. } => 0,
            Self::Static { .. } => 1 + self.children().map(TreeTemplate::static_nodes).sum::<usize>(),
        }
    }

    /// Concrete tree with every slot replaced by its mapping
    pub fn build_tree(&self, mappings: &BTreeMap<usize, Tree>) -> Result<Tree, TreeError> {
        match self {
            Self::Generated { slot, .. } => mappings
                .get(slot)
                .cloned()
                .ok_or(TreeError::MissingSlot(*slot)),
            Self::Static {
                value,
                ty,
                left,
                right,
            } => Ok(Tree {
                value: value.clone(),
                ty: *ty,
                left: left
                    .as_deref()
                    .map(|l| l.build_tree(mappings).map(Box::new))
                    .transpose()?,
                right: right
                    .as_deref()
                    .map(|r| r.build_tree(mappings).map(Box::new))
                    .transpose()?,
            }),
        }
    }

    fn match_into(&self, tree: &Tree, mappings: &mut BTreeMap<usize, Tree>) -> Result<(), TreeError> {
        match self {
            Self::Generated { slot, builder } => {
                mappings.insert(*slot, builder.match_tree(tree)?);
                Ok(())
            }
            Self::Static {
                value,
                ty,
                left,
                right,
            } => {
                if *value != tree.value || *ty != tree.ty {
                    return Err(TreeError::TemplateMismatch(format!(
                        "expected {} but found {}",
                        value, tree
                    )));
                }
                for (template, child) in [(left, &tree.left), (right, &tree.right)] {
                    match (template.as_deref(), child.as_deref()) {
                        (Some(t), Some(c)) => t.match_into(c, mappings)?,
                        (None, None) => {}
                        _ => {
                            return Err(TreeError::TemplateMismatch(format!(
                                "arity of {} differs from the template",
                                tree
                            )))
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Decompose a concrete tree into the slots of this template
    pub fn match_tree(self: &Arc<Self>, tree: &Tree) -> Result<TreeGroup, TreeError> {
        let mut mappings = BTreeMap::new();
        self.match_into(tree, &mut mappings)?;
        TreeGroup::new(Arc::clone(self), mappings)
    }

    /// Group with a random tree in every slot
    pub fn random_group<R: Rng>(self: &Arc<Self>, rng: &mut R) -> Result<TreeGroup, TreeError> {
        let mut mappings = BTreeMap::new();
        for slot in self.slots() {
            let builder = self.builder(slot).ok_or(TreeError::MissingSlot(slot))?;
            mappings.insert(slot, builder.build_random_tree(rng)?);
        }
        TreeGroup::new(Arc::clone(self), mappings)
    }
}

impl fmt::Display for TreeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated { builder, .. } => write!(f, "${}_EXPR$", builder.ty()),
            Self::Static {
                value, left, right, ..
            } => {
                write!(f, "(")?;
                if let Some(left) = left {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", value)?;
                if let Some(right) = right {
                    write!(f, "{}", right)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::genome::factory::TreeFactory;
    use crate::genome::parser::TreeReader;
    use crate::state::{Variables, VariablesManager};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vars() -> VariablesManager {
        VariablesManager::from_variables(
            &Variables::new()
                .with_input("x", 1.0)
                .with_output("o_y", 2.0)
                .with_input("b", true),
        )
    }

    fn builder(depth: usize) -> Arc<GeneratedTreeBuilder> {
        let factory = TreeFactory::new(vars(), Arc::new(Config::default()));
        Arc::new(GeneratedTreeBuilder::new(factory, ValueType::Boolean, depth, 16))
    }

    fn metamorphic() -> Arc<TreeTemplate> {
        Arc::new(TreeTemplate::metamorphic(builder(5), builder(5)))
    }

    #[test]
    fn test_slots_and_display() {
        let template = metamorphic();
        assert_eq!(template.slots(), vec![IR_SLOT, OR_SLOT]);
        assert_eq!(template.static_nodes(), 1);
        assert_eq!(template.to_string(), "($BOOLEAN_EXPR$ => $BOOLEAN_EXPR$)");
        assert!(template.builder(OR_SLOT).is_some());
        assert!(template.builder(7).is_none());

        let regular = TreeTemplate::regular(builder(6));
        assert_eq!(regular.slots(), vec![0]);
        assert_eq!(regular.static_nodes(), 0);
    }

    #[test]
    fn test_match_and_build() {
        let template = metamorphic();
        let tree = TreeReader::new(&vars()).read("(x > 1) => (o_y < 2)").unwrap();
        let group = template.match_tree(&tree).unwrap();
        assert_eq!(group.tree(IR_SLOT).unwrap().to_string(), "(x > 1)");
        assert_eq!(group.tree(OR_SLOT).unwrap().to_string(), "(o_y < 2)");
        assert_eq!(template.build_tree(group.mappings()).unwrap(), tree);
    }

    #[test]
    fn test_match_rejects_other_shapes() {
        let template = metamorphic();
        let tree = TreeReader::new(&vars()).read("(x > 1) && b").unwrap();
        assert!(matches!(
            template.match_tree(&tree),
            Err(TreeError::TemplateMismatch(_))
        ));
    }

    #[test]
    fn test_build_requires_every_slot() {
        let template = metamorphic();
        let mut mappings = BTreeMap::new();
        mappings.insert(IR_SLOT, Tree::boolean(true));
        assert_eq!(
            template.build_tree(&mappings),
            Err(TreeError::MissingSlot(OR_SLOT))
        );
    }

    #[test]
    fn test_random_group_and_generation() {
        let mut rng = StdRng::seed_from_u64(8);
        let template = metamorphic();
        let group = template.random_group(&mut rng).unwrap();
        assert_eq!(group.mappings().len(), 2);
        template.update_generation(42);
        assert!(template.builders().iter().all(|b| b.generation() == 42));
    }
}
