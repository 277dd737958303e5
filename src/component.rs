//! Runtime container nodes. A [Component] owns a module of local bindings, lazily materialized
//! provider cells for them, an optional parent link and a set of child components. A resolution
//! request entering a component is satisfied locally, by a runtime override, or by delegating up
//! the parent chain; the result is cached according to the binding's policy. Destruction cascades
//! from a component to its children and provider cells, never upwards.

use crate::binding::{Binding, BindingKind, Constructor};
use crate::error::ResolveError;
use crate::graph::DependencyGraph;
use crate::instance_provider::{
    InstanceAnyPtr, InstancePtr, InstanceResolver, TypedInstanceResolver,
};
use crate::key::Key;
use crate::provider::{FactoryProvider, ProviderCellPtr, SingletonProvider, SuppliedProvider};
use crate::scope::Scope;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::debug;

/// A target whose externally-declared dependency fields can be filled by a [Component] through
/// [Component::inject].
pub trait Injectable {
    /// Pulls each declared dependency from the given resolver.
    fn inject(&mut self, resolver: &dyn InstanceResolver) -> Result<(), ResolveError>;
}

/// Cheap-clone handle to a runtime container node. All clones refer to the same node.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

pub(crate) struct ComponentInner {
    type_id: TypeId,
    type_name: &'static str,
    graph: Rc<DependencyGraph>,
    bindings: FxHashMap<Key, Binding>,
    // non-owning back-pointer, used only for delegation lookups; destruction always flows
    // parent -> children
    parent: Option<Weak<ComponentInner>>,
    children: RefCell<Vec<Component>>,
    providers: RefCell<FxHashMap<Key, ProviderCellPtr>>,
    overrides: RefCell<FxHashMap<Option<String>, InstanceAnyPtr>>,
    scope: RefCell<Option<Scope>>,
    registry: Weak<RefCell<FxHashMap<TypeId, Component>>>,
    destroyed: Cell<bool>,
}

impl Component {
    pub(crate) fn new(
        type_id: TypeId,
        type_name: &'static str,
        bindings: Vec<Binding>,
        parent: Option<&Component>,
        graph: Rc<DependencyGraph>,
        registry: Weak<RefCell<FxHashMap<TypeId, Component>>>,
    ) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|binding| (binding.provided_key().clone(), binding))
            .collect();

        debug!(component = type_name, "created component");

        Self {
            inner: Rc::new(ComponentInner {
                type_id,
                type_name,
                graph,
                bindings,
                parent: parent.map(|component| Rc::downgrade(&component.inner)),
                children: RefCell::default(),
                providers: RefCell::default(),
                overrides: RefCell::default(),
                scope: RefCell::default(),
                registry,
                destroyed: Cell::new(false),
            }),
        }
    }

    /// The declared type name of this component, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// The parent component, if one is declared and still alive.
    pub fn parent(&self) -> Option<Component> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Component { inner })
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Checks whether two handles refer to the same component node.
    #[inline]
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolves a provider cell for the given key. Resolution order: own bindings first, then
    /// runtime overrides by qualifier, then delegation up the parent chain. `called_by` is the
    /// last-hop guard - a component never answers the caller which just delegated to it, which
    /// prevents unresolved lookups from bouncing between parent and child forever.
    pub fn resolve_provider(
        &self,
        key: &Key,
        called_by: Option<&Component>,
    ) -> Option<ProviderCellPtr> {
        if let Some(caller) = called_by {
            if self.ptr_eq(caller) {
                return None;
            }
        }

        if let Some(cell) = self.local_provider(key) {
            return Some(cell);
        }

        let qualifier = key.qualifier().map(ToString::to_string);
        if let Some(value) = self.inner.overrides.borrow().get(&qualifier) {
            // ephemeral wrapper; the override value itself stays owned by this component
            return Some(Rc::new(RefCell::new(SuppliedProvider::new(value.clone()))));
        }

        if let Some(parent) = self.parent() {
            let parent_was_caller = called_by
                .map(|caller| caller.ptr_eq(&parent))
                .unwrap_or(false);
            if !parent_was_caller {
                return parent.resolve_provider(key, Some(self));
            }
        }

        None
    }

    /// Resolves an instance of `T` for an unqualified key.
    pub fn get<T: Any>(&self) -> Result<InstancePtr<T>, ResolveError> {
        self.instance(&Key::of::<T>())
    }

    /// Resolves an instance of `T` for a qualified key.
    pub fn get_qualified<T: Any>(&self, qualifier: &str) -> Result<InstancePtr<T>, ResolveError> {
        self.instance(&Key::of::<T>().with_qualifier(qualifier))
    }

    /// Resolves an instance for an explicit key, downcast to `T`. Note that an association key
    /// resolves to an instance of the bound implementation type.
    pub fn get_with<T: Any>(&self, key: &Key) -> Result<InstancePtr<T>, ResolveError> {
        self.instance(key)
    }

    /// Fills the dependency fields of an external target by resolving each through this component.
    pub fn inject(&self, target: &mut dyn Injectable) -> Result<(), ResolveError> {
        target.inject(self)
    }

    /// Registers an externally supplied value consulted by qualifier when no local binding matches
    /// a requested key. Overrides take precedence over the parent chain, but local bindings take
    /// precedence over overrides.
    pub fn set_override<T: Any>(&self, qualifier: Option<&str>, value: T) {
        self.inner
            .overrides
            .borrow_mut()
            .insert(qualifier.map(ToString::to_string), Rc::new(value));
    }

    /// Destroys this component: children first, then all owned provider cells, then the override
    /// map, finally detaching from the parent, the scope, and the live-component registry.
    /// Idempotent - a second call is a no-op.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }

        // children may hold back-references into this component's providers during their own
        // teardown, so they go first
        let children = self.inner.children.borrow_mut().drain(..).collect_vec();
        for child in children {
            child.destroy();
        }

        let cells = self
            .inner
            .providers
            .borrow_mut()
            .drain()
            .map(|(_, cell)| cell)
            .collect_vec();
        for cell in cells {
            cell.borrow_mut().destroy();
        }

        self.inner.overrides.borrow_mut().clear();

        if let Some(parent) = self.parent() {
            parent
                .inner
                .children
                .borrow_mut()
                .retain(|child| !child.ptr_eq(self));
        }

        if let Some(scope) = self.inner.scope.borrow_mut().take() {
            scope.remove_observer(self);
        }

        if let Some(registry) = self.inner.registry.upgrade() {
            registry.borrow_mut().remove(&self.inner.type_id);
        }

        debug!(component = self.inner.type_name, "destroyed component");
    }

    pub(crate) fn attach_child(&self, child: Component) {
        self.inner.children.borrow_mut().push(child);
    }

    pub(crate) fn attach_scope(&self, scope: Scope) {
        scope.add_observer(self);
        *self.inner.scope.borrow_mut() = Some(scope);
    }

    pub(crate) fn downgrade(&self) -> Weak<ComponentInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<ComponentInner>) -> Self {
        Self { inner }
    }

    fn local_provider(&self, key: &Key) -> Option<ProviderCellPtr> {
        if let Some(cell) = self.inner.providers.borrow().get(key) {
            return Some(cell.clone());
        }

        let binding = self.inner.bindings.get(key)?;
        let cell = match binding.kind() {
            // the shared cell stays owned by whichever component binds the implementation, so
            // it must not be cached under the association key here
            BindingKind::Association { implementation } => {
                return self.implementation_provider(implementation);
            }
            _ => new_cell(binding)?,
        };

        self.inner
            .providers
            .borrow_mut()
            .insert(key.clone(), cell.clone());

        Some(cell)
    }

    fn implementation_provider(&self, implementation: &Key) -> Option<ProviderCellPtr> {
        // alias the cell of whichever component in the chain binds the implementation, so
        // interface and implementation share one cell regardless of where resolution starts
        if let Some(cell) = self.resolve_provider(implementation, None) {
            return Some(cell);
        }

        // the implementation is bound outside the component chain entirely; only then does the
        // cell live here
        let binding = self.inner.graph.effective_binding(implementation).ok()?;
        let cell = new_cell(binding)?;
        self.inner
            .providers
            .borrow_mut()
            .insert(implementation.clone(), cell.clone());

        Some(cell)
    }
}

impl InstanceResolver for Component {
    fn resolve_instance(&self, key: &Key) -> Result<InstanceAnyPtr, ResolveError> {
        let cell = self
            .resolve_provider(key, None)
            .ok_or_else(|| ResolveError::UnsatisfiedDependency {
                key: key.clone(),
                candidates: self.inner.graph.candidates(key),
            })?;

        // the cell's constructor re-enters resolve_instance for its dependencies; declared
        // dependencies are acyclic after graph validation, so re-entering the same cell means a
        // constructor resolved an undeclared cyclic key
        let mut provider = cell
            .try_borrow_mut()
            .map_err(|_| ResolveError::DependencyCycle(key.clone()))?;
        provider.get(self)
    }
}

fn new_cell(binding: &Binding) -> Option<ProviderCellPtr> {
    let constructor: Constructor = match binding.kind() {
        BindingKind::Factory { constructor } => constructor.clone(),
        BindingKind::Supplier { supply } => {
            let supply = supply.clone();
            Rc::new(move |_: &dyn InstanceResolver| Ok(supply()))
        }
        BindingKind::Association { .. } => return None,
    };

    Some(if binding.is_singleton() {
        Rc::new(RefCell::new(SingletonProvider::new(constructor)))
    } else {
        Rc::new(RefCell::new(FactoryProvider::new(constructor)))
    })
}
