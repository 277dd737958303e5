use crate::key::Key;
use itertools::Itertools;
use thiserror::Error;

fn format_candidates(candidates: &[Key]) -> String {
    if candidates.is_empty() {
        String::new()
    } else {
        format!(
            " Possible candidates: [{}]",
            candidates.iter().map(Key::to_string).join(", ")
        )
    }
}

/// Errors related to building and validating the static dependency graph.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum GraphError {
    #[error("duplicate binding registered for {0}")]
    DuplicateBinding(Key),
    #[error("circular dependency detected: {}", .0.iter().map(Key::to_string).join(" -> "))]
    CircularDependency(Vec<Key>),
    #[error("no matching binding for {key}.{}", format_candidates(.candidates))]
    NoBindingFound { key: Key, candidates: Vec<Key> },
}

/// Errors related to resolving instances at runtime.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum ResolveError {
    #[error("didn't find provider for {key}.{}", format_candidates(.candidates))]
    UnsatisfiedDependency { key: Key, candidates: Vec<Key> },
    #[error("value bound to {0} cannot be downcast to the requested type")]
    IncompatibleInstance(Key),
    #[error("dependency cycle detected while constructing {0}")]
    DependencyCycle(Key),
}

/// Errors related to declaring and creating components.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum ContainerError {
    #[error("no component declared for type: {0}")]
    UnknownComponent(&'static str),
    #[error("component declared twice: {0}")]
    DuplicateComponent(&'static str),
    #[error("component {child} declares an unknown parent component")]
    UnknownParent { child: &'static str },
    #[error("component parent chain forms a cycle: {}", .0.iter().join(" -> "))]
    ParentCycle(Vec<&'static str>),
    #[error("component {0} declares an empty scope name")]
    InvalidScopeName(&'static str),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
