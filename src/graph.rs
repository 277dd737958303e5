//! The static dependency graph. All [Binding]s are registered here once, up front, and validated
//! as a whole - duplicate provided keys and dependency cycles are rejected before any resolution
//! is attempted, which keeps the resolution hot path free of graph walks.

use crate::binding::{Binding, BindingKind};
use crate::error::GraphError;
use crate::key::Key;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use tracing::debug;

/// Stores all registered [Binding]s and answers which binding satisfies a given [Key] and which
/// keys a binding transitively depends on.
#[derive(Default, Clone, Debug)]
pub struct DependencyGraph {
    bindings: FxHashMap<Key, Binding>,
    associations: FxHashMap<Key, Key>,
    edges: FxHashMap<Key, Vec<Key>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of bindings and re-validates the merged set. Fails with
    /// [GraphError::DuplicateBinding] when two bindings share a provided key and with
    /// [GraphError::CircularDependency] when any key transitively depends on itself, following
    /// association links. Registration is additive across calls; a failed batch leaves the graph
    /// untouched.
    pub fn register(&mut self, bindings: Vec<Binding>) -> Result<(), GraphError> {
        let count = bindings.len();
        // bindings are cheap to clone, so the batch is staged on a copy and committed only once
        // the merged set validates
        let mut merged = self.clone();

        for binding in bindings {
            let provided_key = binding.provided_key().clone();
            if merged.bindings.contains_key(&provided_key) {
                return Err(GraphError::DuplicateBinding(provided_key));
            }

            let mut dependencies = binding.dependencies().cloned().collect_vec();
            if let BindingKind::Association { implementation } = binding.kind() {
                // the association edge makes interface consumers see the implementation's own
                // dependencies and lets the cycle walk cross the link
                merged
                    .associations
                    .insert(provided_key.clone(), implementation.clone());
                dependencies.push(implementation.clone());
            }

            merged.edges.insert(provided_key.clone(), dependencies);
            merged.bindings.insert(provided_key, binding);
        }

        merged.validate_acyclic()?;
        *self = merged;
        debug!(count, total = self.bindings.len(), "registered bindings");

        Ok(())
    }

    /// Looks up the binding for the given key, retrying once through the association link. Fails
    /// with [GraphError::NoBindingFound] reporting near-miss candidates when neither lookup
    /// succeeds.
    pub fn binding(&self, key: &Key) -> Result<&Binding, GraphError> {
        self.bindings
            .get(key)
            .or_else(|| {
                self.associations
                    .get(key)
                    .and_then(|implementation| self.bindings.get(implementation))
            })
            .ok_or_else(|| GraphError::NoBindingFound {
                key: key.clone(),
                candidates: self.candidates(key),
            })
    }

    /// Follows association links down to a binding which can actually construct a value.
    pub fn effective_binding(&self, key: &Key) -> Result<&Binding, GraphError> {
        let mut binding = self.binding(key)?;
        // association links are acyclic after validation, so this terminates
        while let BindingKind::Association { implementation } = binding.kind() {
            binding = self.binding(implementation)?;
        }

        Ok(binding)
    }

    /// Computes the set of all keys reachable from the given key by following declared
    /// dependencies, association links included.
    pub fn transitive_dependencies(&self, key: &Key) -> FxHashSet<Key> {
        let mut result = FxHashSet::default();
        let mut stack = self.edges.get(key).into_iter().flatten().collect_vec();

        while let Some(next) = stack.pop() {
            if result.insert(next.clone()) {
                stack.extend(self.edges.get(next).into_iter().flatten());
            }
        }

        result
    }

    /// Registered keys providing the same type as `key` under a different qualifier, or providing
    /// the type of its association target - reported to aid diagnosis of missing bindings.
    pub(crate) fn candidates(&self, key: &Key) -> Vec<Key> {
        let association = self.associations.get(key);

        self.bindings
            .keys()
            .filter(|candidate| {
                candidate.is_candidate_for(key)
                    || association
                        .map(|implementation| candidate.type_id() == implementation.type_id())
                        .unwrap_or(false)
            })
            .cloned()
            .sorted_by_key(Key::to_string)
            .collect()
    }

    fn validate_acyclic(&self) -> Result<(), GraphError> {
        let mut finished = FxHashSet::default();

        for key in self.edges.keys() {
            if !finished.contains(key) {
                let mut visiting = FxHashSet::default();
                self.visit(key, &mut vec![], &mut visiting, &mut finished)?;
            }
        }

        Ok(())
    }

    fn visit(
        &self,
        key: &Key,
        path: &mut Vec<Key>,
        visiting: &mut FxHashSet<Key>,
        finished: &mut FxHashSet<Key>,
    ) -> Result<(), GraphError> {
        if finished.contains(key) {
            return Ok(());
        }

        if visiting.contains(key) {
            let start = path.iter().position(|entry| entry == key).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(key.clone());

            return Err(GraphError::CircularDependency(cycle));
        }

        visiting.insert(key.clone());
        path.push(key.clone());

        for dependency in self.edges.get(key).into_iter().flatten() {
            self.visit(dependency, path, visiting, finished)?;
        }

        path.pop();
        visiting.remove(key);
        finished.insert(key.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::binding::{Binding, BindingKind};
    use crate::error::GraphError;
    use crate::graph::DependencyGraph;
    use crate::key::Key;

    trait Abstraction {}

    struct Implementation;

    struct Dependency;

    fn factory_binding<T: 'static + Default>(key: Key) -> Binding {
        Binding::factory(key, |_| Ok(T::default()))
    }

    #[test]
    fn should_reject_duplicate_bindings() {
        let mut graph = DependencyGraph::new();

        assert_eq!(
            graph
                .register(vec![
                    factory_binding::<i8>(Key::of::<i8>()),
                    factory_binding::<i8>(Key::of::<i8>()),
                ])
                .unwrap_err(),
            GraphError::DuplicateBinding(Key::of::<i8>())
        );
    }

    #[test]
    fn should_reject_duplicate_bindings_across_batches() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![factory_binding::<i8>(Key::of::<i8>())])
            .unwrap();

        assert_eq!(
            graph
                .register(vec![factory_binding::<i8>(Key::of::<i8>())])
                .unwrap_err(),
            GraphError::DuplicateBinding(Key::of::<i8>())
        );
    }

    #[test]
    fn should_leave_graph_untouched_when_registration_fails() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![factory_binding::<i8>(Key::of::<i8>())])
            .unwrap();

        let result = graph.register(vec![
            factory_binding::<u8>(Key::of::<u8>()),
            factory_binding::<i8>(Key::of::<i8>()),
        ]);

        assert!(matches!(
            result.unwrap_err(),
            GraphError::DuplicateBinding(..)
        ));
        // the failed batch's earlier bindings did not leak into the graph
        assert!(matches!(
            graph.binding(&Key::of::<u8>()).unwrap_err(),
            GraphError::NoBindingFound { .. }
        ));
        graph
            .register(vec![factory_binding::<u8>(Key::of::<u8>())])
            .unwrap();
    }

    #[test]
    fn should_reject_dependency_cycles() {
        let mut graph = DependencyGraph::new();

        let error = graph
            .register(vec![
                factory_binding::<i8>(Key::of::<i8>()).with_dependency("b", Key::of::<u8>()),
                factory_binding::<u8>(Key::of::<u8>()).with_dependency("a", Key::of::<i8>()),
            ])
            .unwrap_err();

        match error {
            GraphError::CircularDependency(cycle) => {
                assert!(cycle.contains(&Key::of::<i8>()));
                assert!(cycle.contains(&Key::of::<u8>()));
                assert_eq!(cycle.first(), cycle.last());
            }
            _ => panic!("expected a circular dependency error"),
        }
    }

    #[test]
    fn should_reject_cycles_through_associations() {
        let mut graph = DependencyGraph::new();

        let result = graph.register(vec![
            Binding::association(Key::of::<dyn Abstraction>(), Key::of::<Implementation>()),
            Binding::factory(Key::of::<Implementation>(), |_| Ok(Implementation))
                .with_dependency("dependency", Key::of::<dyn Abstraction>()),
        ]);

        assert!(matches!(
            result.unwrap_err(),
            GraphError::CircularDependency(..)
        ));
    }

    #[test]
    fn should_revalidate_merged_set_on_additive_registration() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![
                factory_binding::<i8>(Key::of::<i8>()).with_dependency("b", Key::of::<u8>())
            ])
            .unwrap();

        let result = graph.register(vec![
            factory_binding::<u8>(Key::of::<u8>()).with_dependency("a", Key::of::<i8>())
        ]);

        assert!(matches!(
            result.unwrap_err(),
            GraphError::CircularDependency(..)
        ));
    }

    #[test]
    fn should_resolve_effective_binding_through_association() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![
                Binding::association(Key::of::<dyn Abstraction>(), Key::of::<Implementation>()),
                Binding::factory(Key::of::<Implementation>(), |_| Ok(Implementation)),
            ])
            .unwrap();

        assert!(matches!(
            graph.binding(&Key::of::<dyn Abstraction>()).unwrap().kind(),
            BindingKind::Association { .. }
        ));
        assert_eq!(
            graph
                .effective_binding(&Key::of::<dyn Abstraction>())
                .unwrap()
                .provided_key(),
            &Key::of::<Implementation>()
        );
    }

    #[test]
    fn should_report_qualifier_near_misses_for_missing_bindings() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![factory_binding::<i8>(
                Key::of::<i8>().with_qualifier("a"),
            )])
            .unwrap();

        assert_eq!(
            graph
                .binding(&Key::of::<i8>().with_qualifier("b"))
                .unwrap_err(),
            GraphError::NoBindingFound {
                key: Key::of::<i8>().with_qualifier("b"),
                candidates: vec![Key::of::<i8>().with_qualifier("a")],
            }
        );
    }

    #[test]
    fn should_compute_transitive_dependencies() {
        let mut graph = DependencyGraph::new();
        graph
            .register(vec![
                Binding::association(Key::of::<dyn Abstraction>(), Key::of::<Implementation>()),
                Binding::factory(Key::of::<Implementation>(), |_| Ok(Implementation))
                    .with_dependency("dependency", Key::of::<Dependency>()),
                Binding::factory(Key::of::<Dependency>(), |_| Ok(Dependency))
                    .with_dependency("value", Key::of::<i8>()),
                factory_binding::<i8>(Key::of::<i8>()),
            ])
            .unwrap();

        let dependencies = graph.transitive_dependencies(&Key::of::<dyn Abstraction>());

        assert_eq!(dependencies.len(), 3);
        assert!(dependencies.contains(&Key::of::<Implementation>()));
        assert!(dependencies.contains(&Key::of::<Dependency>()));
        assert!(dependencies.contains(&Key::of::<i8>()));
    }
}
