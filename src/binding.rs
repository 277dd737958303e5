//! Declarative rules for producing values. A [Binding] tells the engine how to construct or supply
//! a value for its provided [Key], which other keys the construction consumes, and whether the
//! result is cached as a singleton. Bindings are created once, at graph-build time, and are
//! immutable afterward.

use crate::error::ResolveError;
use crate::instance_provider::{InstanceAnyPtr, InstanceResolver};
use crate::key::Key;
use derivative::Derivative;
use std::rc::Rc;

/// Type-erased construction closure. Receives an [InstanceResolver] to pull declared dependencies
/// from.
pub type Constructor = Rc<dyn Fn(&dyn InstanceResolver) -> Result<InstanceAnyPtr, ResolveError>>;

/// Type-erased zero-argument supplier closure.
pub type Supplier = Rc<dyn Fn() -> InstanceAnyPtr>;

/// The closed set of construction kinds. Every call site (graph validation, runtime resolution)
/// handles all three exhaustively.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum BindingKind {
    /// Constructs a fresh value through a construction closure which may resolve further
    /// dependencies.
    Factory {
        #[derivative(Debug = "ignore")]
        constructor: Constructor,
    },
    /// Delegates construction to the binding of a separate implementation key. Typically used to
    /// provide an abstraction through one of its concrete implementations. The implementation
    /// binding's own caching policy governs the shared provider cell.
    Association { implementation: Key },
    /// Supplies a value from a closure taking no dependencies.
    Supplier {
        #[derivative(Debug = "ignore")]
        supply: Supplier,
    },
}

/// A declared rule for producing a value for a [Key]. For a fixed provided key, at most one binding
/// may exist in a [DependencyGraph](crate::graph::DependencyGraph).
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Binding {
    provided_key: Key,
    kind: BindingKind,
    dependencies: Vec<(String, Key)>,
    is_singleton: bool,
}

impl Binding {
    /// Creates a non-singleton [BindingKind::Factory] binding from a typed construction closure.
    pub fn factory<T, F>(provided_key: Key, constructor: F) -> Self
    where
        T: 'static,
        F: Fn(&dyn InstanceResolver) -> Result<T, ResolveError> + 'static,
    {
        Self {
            provided_key,
            kind: BindingKind::Factory {
                constructor: Rc::new(move |resolver| {
                    constructor(resolver).map(|value| Rc::new(value) as InstanceAnyPtr)
                }),
            },
            dependencies: vec![],
            is_singleton: false,
        }
    }

    /// Creates a non-singleton [BindingKind::Supplier] binding from a typed closure.
    pub fn supplier<T, F>(provided_key: Key, supply: F) -> Self
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Self {
            provided_key,
            kind: BindingKind::Supplier {
                supply: Rc::new(move || Rc::new(supply()) as InstanceAnyPtr),
            },
            dependencies: vec![],
            is_singleton: false,
        }
    }

    /// Creates a [BindingKind::Association] binding delegating `provided_key` to the binding of
    /// `implementation`.
    pub fn association(provided_key: Key, implementation: Key) -> Self {
        Self {
            provided_key,
            kind: BindingKind::Association { implementation },
            dependencies: vec![],
            is_singleton: false,
        }
    }

    /// Marks this binding as a singleton - the owning provider cell caches the first constructed
    /// instance until destroyed.
    pub fn singleton(mut self) -> Self {
        self.is_singleton = true;
        self
    }

    /// Declares a named dependency consumed by the construction closure. The declaration drives
    /// static validation; the closure itself fetches the value through its resolver.
    pub fn with_dependency<N: Into<String>>(mut self, name: N, key: Key) -> Self {
        self.dependencies.push((name.into(), key));
        self
    }

    #[inline]
    pub fn provided_key(&self) -> &Key {
        &self.provided_key
    }

    #[inline]
    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    /// Declared direct dependencies, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Key> {
        self.dependencies.iter().map(|(_, key)| key)
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.is_singleton
    }
}

#[cfg(test)]
mod tests {
    use crate::binding::{Binding, BindingKind};
    use crate::key::Key;

    #[test]
    fn should_create_factory_binding() {
        let binding = Binding::factory(Key::of::<i8>(), |_| Ok(0i8))
            .singleton()
            .with_dependency("value", Key::of::<u8>());

        assert_eq!(binding.provided_key(), &Key::of::<i8>());
        assert!(binding.is_singleton());
        assert!(matches!(binding.kind(), BindingKind::Factory { .. }));
        assert_eq!(
            binding.dependencies().collect::<Vec<_>>(),
            vec![&Key::of::<u8>()]
        );
    }

    #[test]
    fn should_create_association_binding() {
        let binding = Binding::association(Key::of::<i8>(), Key::of::<u8>());

        assert!(
            matches!(binding.kind(), BindingKind::Association { implementation } if implementation == &Key::of::<u8>())
        );
        assert!(!binding.is_singleton());
    }
}
