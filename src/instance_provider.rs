use crate::error::ResolveError;
use crate::key::Key;
use std::any::Any;
use std::rc::Rc;

/// Shared pointer to a resolved instance. The reference design is single-threaded per container, so
/// instances are reference-counted without atomics.
pub type InstancePtr<T> = Rc<T>;

/// Type-erased [InstancePtr], as stored in provider cells and runtime overrides.
pub type InstanceAnyPtr = InstancePtr<dyn Any + 'static>;

/// Generic resolver for instances by [Key]. Construction closures receive a resolver to pull their
/// own dependencies from, which is how a [Component](crate::component::Component) threads itself
/// through the object graph being built.
pub trait InstanceResolver {
    /// Tries to return an instance for the given key, constructing it if necessary.
    fn resolve_instance(&self, key: &Key) -> Result<InstanceAnyPtr, ResolveError>;
}

/// Helper trait for [InstanceResolver] providing strongly-typed access.
pub trait TypedInstanceResolver {
    /// Typesafe version of [InstanceResolver::resolve_instance].
    fn instance<T: Any>(&self, key: &Key) -> Result<InstancePtr<T>, ResolveError>;
}

impl<R: InstanceResolver + ?Sized> TypedInstanceResolver for R {
    fn instance<T: Any>(&self, key: &Key) -> Result<InstancePtr<T>, ResolveError> {
        self.resolve_instance(key)?
            .downcast()
            .map_err(|_| ResolveError::IncompatibleInstance(key.clone()))
    }
}
