//! The dependency graph over resolved parts.
//!
//! Nodes are part identifiers; a directed edge `A → B` means A's construction
//! requires B to be constructed first. Edges come straight from
//! [ResolvedPart::dependencies]: feature references, URI-valued properties
//! (the producing factory must precede), and collection elements. Inline
//! parts were hoisted into nodes by the resolver, so they need no special
//! treatment here.

use crate::model::PartId;
use crate::resolver::{PartStatus, ResolvedSet};
use fxhash::{FxHashMap, FxHashSet};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::BTreeSet;
use tracing::debug;

pub struct DependencyGraph {
    graph: DiGraphMap<PartId, ()>,
}

impl DependencyGraph {
    /// Builds the graph over every part in the resolved set.
    pub fn build(set: &ResolvedSet) -> Self {
        let mut graph = DiGraphMap::new();

        for part in set.parts() {
            graph.add_node(part.id());
        }

        for part in set.parts() {
            for dependency in part.dependencies() {
                graph.add_edge(part.id(), dependency, ());
            }
        }

        Self { graph }
    }

    /// Every dependency cycle, as a sorted list of participants. An empty
    /// result means the graph is a DAG.
    pub fn cycles(&self) -> Vec<Vec<PartId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .map(|id| self.graph.contains_edge(*id, *id))
                        .unwrap_or(false)
            })
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect()
    }

    /// Kahn-style topological order over the constructible nodes: undefined
    /// and incomplete parts are left out, and ties are broken by identifier
    /// so the order is deterministic. Call only on a cycle-free graph; nodes
    /// caught in a cycle would never be emitted.
    pub fn assembly_order(&self, set: &ResolvedSet) -> Vec<PartId> {
        let included = |id: PartId| {
            matches!(
                set.status(id),
                Some(PartStatus::Defined | PartStatus::External)
            )
        };

        let mut remaining: FxHashMap<PartId, usize> = self
            .graph
            .nodes()
            .filter(|id| included(*id))
            .map(|id| {
                let dependencies = self
                    .graph
                    .neighbors_directed(id, Direction::Outgoing)
                    .filter(|dependency| included(*dependency))
                    .count();
                (id, dependencies)
            })
            .collect();

        let mut ready: BTreeSet<PartId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(remaining.len());

        while let Some(id) = ready.iter().next().copied() {
            ready.remove(&id);
            order.push(id);

            for dependent in self.graph.neighbors_directed(id, Direction::Incoming) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }

            remaining.remove(&id);
        }

        debug!(parts = order.len(), "Computed assembly order.");

        order
    }

    /// Every part from which a seed is reachable along dependency edges,
    /// i.e. the seeds plus everything that depends on them transitively.
    pub fn dependents_closure(&self, seeds: impl IntoIterator<Item = PartId>) -> FxHashSet<PartId> {
        let mut closure: FxHashSet<PartId> = FxHashSet::default();
        let mut frontier: Vec<PartId> = seeds.into_iter().collect();

        while let Some(id) = frontier.pop() {
            if !closure.insert(id) {
                continue;
            }

            frontier.extend(self.graph.neighbors_directed(id, Direction::Incoming));
        }

        closure
    }
}

//noinspection DuplicatedCode
#[cfg(test)]
mod tests {
    use crate::descriptor::{ComponentDescriptor, ConstructorDescriptor, FeatureDescriptor};
    use crate::graph::DependencyGraph;
    use crate::model::{Blueprint, ConcretePart, PartId, Reference, TypeRef};
    use crate::registry::StaticTypeRegistry;
    use crate::resolver::Resolver;

    struct Widget;

    fn widget_registry() -> StaticTypeRegistry {
        let mut registry = StaticTypeRegistry::new();
        registry
            .register(
                TypeRef::named("Widget"),
                ComponentDescriptor::builder("Widget")
                    .with_default_constructor(ConstructorDescriptor::new(
                        vec![FeatureDescriptor::dynamic("other", false)],
                        |_| Ok(Box::new(Widget)),
                    ))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        registry
    }

    fn widget() -> ConcretePart {
        ConcretePart::of_type(TypeRef::named("Widget"))
    }

    #[test]
    fn should_order_dependencies_first() {
        let registry = widget_registry();
        let resolver = Resolver::new(&registry, &[]);

        let target = PartId::random();
        let referrer = PartId::random();
        let blueprint = Blueprint::new("test")
            .with_part(
                widget()
                    .with_id(referrer)
                    .with_feature("other", Reference::ById(target)),
            )
            .with_part(widget().with_id(target));

        let (set, errors) = resolver.resolve(&[blueprint]);
        assert!(errors.is_empty());

        let graph = DependencyGraph::build(&set);
        assert!(graph.cycles().is_empty());

        let order = graph.assembly_order(&set);
        let position = |id| order.iter().position(|o| *o == id).unwrap();
        assert!(position(target) < position(referrer));
    }

    #[test]
    fn should_break_ties_by_identifier() {
        let registry = widget_registry();
        let resolver = Resolver::new(&registry, &[]);

        let mut ids: Vec<PartId> = (0..8).map(|_| PartId::random()).collect();
        let mut blueprint = Blueprint::new("test");
        for id in &ids {
            blueprint = blueprint.with_part(widget().with_id(*id));
        }

        let (set, _) = resolver.resolve(&[blueprint]);
        let order = DependencyGraph::build(&set).assembly_order(&set);

        ids.sort_unstable();
        assert_eq!(order, ids);
    }

    #[test]
    fn should_detect_cycles_with_all_participants() {
        let registry = widget_registry();
        let resolver = Resolver::new(&registry, &[]);

        let a = PartId::random();
        let b = PartId::random();
        let blueprint = Blueprint::new("test")
            .with_part(
                widget()
                    .with_id(a)
                    .with_feature("other", Reference::ById(b)),
            )
            .with_part(
                widget()
                    .with_id(b)
                    .with_feature("other", Reference::ById(a)),
            );

        let (set, _) = resolver.resolve(&[blueprint]);
        let cycles = DependencyGraph::build(&set).cycles();

        assert_eq!(cycles.len(), 1);
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(cycles[0], expected);
    }

    #[test]
    fn should_compute_dependents_closures() {
        let registry = widget_registry();
        let resolver = Resolver::new(&registry, &[]);

        let root = PartId::random();
        let middle = PartId::random();
        let top = PartId::random();
        let unrelated = PartId::random();

        let blueprint = Blueprint::new("test")
            .with_part(widget().with_id(root))
            .with_part(
                widget()
                    .with_id(middle)
                    .with_feature("other", Reference::ById(root)),
            )
            .with_part(
                widget()
                    .with_id(top)
                    .with_feature("other", Reference::ById(middle)),
            )
            .with_part(widget().with_id(unrelated));

        let (set, _) = resolver.resolve(&[blueprint]);
        let closure = DependencyGraph::build(&set).dependents_closure([root]);

        assert!(closure.contains(&root));
        assert!(closure.contains(&middle));
        assert!(closure.contains(&top));
        assert!(!closure.contains(&unrelated));
    }
}
