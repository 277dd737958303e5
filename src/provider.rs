//! Provider cells back single [Binding](crate::binding::Binding)s within a
//! [Component](crate::component::Component) and decide whether to reuse or construct an instance
//! on each request. A singleton cell owns at most one live instance; destroying it releases the
//! instance and the next request triggers reconstruction.

use crate::binding::Constructor;
use crate::error::ResolveError;
use crate::instance_provider::{InstanceAnyPtr, InstanceResolver};
#[cfg(test)]
use mockall::automock;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a provider cell, as stored in a component's cell map. An association binding
/// aliases the implementation's cell under its own key, so the handle can be shared.
pub type ProviderCellPtr = Rc<RefCell<dyn Provider>>;

/// A cached-or-not construction slot bound to one binding.
#[cfg_attr(test, automock)]
pub trait Provider {
    /// Returns an instance, constructing one through the given resolver if this cell has nothing
    /// cached.
    fn get(&mut self, resolver: &dyn InstanceResolver) -> Result<InstanceAnyPtr, ResolveError>;

    /// Releases any cached instance. Idempotent.
    fn destroy(&mut self);
}

/// A [Provider] constructing a fresh instance on every request.
pub struct FactoryProvider {
    constructor: Constructor,
}

impl FactoryProvider {
    pub fn new(constructor: Constructor) -> Self {
        Self { constructor }
    }
}

impl Provider for FactoryProvider {
    #[inline]
    fn get(&mut self, resolver: &dyn InstanceResolver) -> Result<InstanceAnyPtr, ResolveError> {
        (self.constructor)(resolver)
    }

    fn destroy(&mut self) {}
}

/// A [Provider] constructing an instance on first request and returning the same instance
/// thereafter, until destroyed.
pub struct SingletonProvider {
    constructor: Constructor,
    instance: Option<InstanceAnyPtr>,
}

impl SingletonProvider {
    pub fn new(constructor: Constructor) -> Self {
        Self {
            constructor,
            instance: None,
        }
    }
}

impl Provider for SingletonProvider {
    fn get(&mut self, resolver: &dyn InstanceResolver) -> Result<InstanceAnyPtr, ResolveError> {
        if let Some(instance) = &self.instance {
            return Ok(instance.clone());
        }

        let instance = (self.constructor)(resolver)?;
        self.instance = Some(instance.clone());

        Ok(instance)
    }

    fn destroy(&mut self) {
        self.instance = None;
    }
}

/// An ephemeral [Provider] wrapping an externally supplied value, used for runtime overrides. The
/// value is owned by the component, not the cell, so destroy releases nothing here.
pub struct SuppliedProvider {
    value: InstanceAnyPtr,
}

impl SuppliedProvider {
    pub fn new(value: InstanceAnyPtr) -> Self {
        Self { value }
    }
}

impl Provider for SuppliedProvider {
    #[inline]
    fn get(&mut self, _resolver: &dyn InstanceResolver) -> Result<InstanceAnyPtr, ResolveError> {
        Ok(self.value.clone())
    }

    fn destroy(&mut self) {}
}

#[cfg(test)]
mod tests {
    use crate::error::ResolveError;
    use crate::instance_provider::{InstanceAnyPtr, InstanceResolver};
    use crate::key::Key;
    use crate::provider::{FactoryProvider, Provider, SingletonProvider, SuppliedProvider};
    use std::cell::Cell;
    use std::rc::Rc;

    struct NullResolver;

    impl InstanceResolver for NullResolver {
        fn resolve_instance(&self, key: &Key) -> Result<InstanceAnyPtr, ResolveError> {
            Err(ResolveError::UnsatisfiedDependency {
                key: key.clone(),
                candidates: vec![],
            })
        }
    }

    fn counting_constructor() -> (Rc<Cell<usize>>, crate::binding::Constructor) {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let constructor: crate::binding::Constructor = Rc::new(move |_| {
            counter.set(counter.get() + 1);
            Ok(Rc::new(counter.get()) as InstanceAnyPtr)
        });

        (count, constructor)
    }

    #[test]
    fn should_construct_fresh_instances_in_factory_provider() {
        let (count, constructor) = counting_constructor();
        let mut provider = FactoryProvider::new(constructor);

        let first = provider.get(&NullResolver).unwrap();
        let second = provider.get(&NullResolver).unwrap();

        assert_eq!(count.get(), 2);
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_cache_singleton_instance() {
        let (count, constructor) = counting_constructor();
        let mut provider = SingletonProvider::new(constructor);

        let first = provider.get(&NullResolver).unwrap();
        let second = provider.get(&NullResolver).unwrap();

        assert_eq!(count.get(), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_reconstruct_singleton_after_destroy() {
        let (count, constructor) = counting_constructor();
        let mut provider = SingletonProvider::new(constructor);

        let first = provider.get(&NullResolver).unwrap();
        provider.destroy();
        provider.destroy();
        let second = provider.get(&NullResolver).unwrap();

        assert_eq!(count.get(), 2);
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_return_supplied_value() {
        let value = Rc::new(42i32) as InstanceAnyPtr;
        let mut provider = SuppliedProvider::new(value.clone());

        assert!(Rc::ptr_eq(&provider.get(&NullResolver).unwrap(), &value));
    }
}
