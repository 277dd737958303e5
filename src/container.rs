//! The explicit container object tying everything together. A [Container] owns the validated
//! [DependencyGraph], the registry of live components keyed by their declared type, and the scope
//! registry. It replaces hidden process-wide state with a value passed by reference to all call
//! sites, which makes lifetime and test isolation explicit.

use crate::binding::Binding;
use crate::component::Component;
use crate::error::ContainerError;
use crate::graph::DependencyGraph;
use crate::scope::Scope;
use fxhash::{FxHashMap, FxHashSet};
use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

type LiveComponents = Rc<RefCell<FxHashMap<TypeId, Component>>>;

/// Declaration of a component type: its module of bindings, its declared parent type and its
/// declared scope name. Consumed by a [ContainerBuilder].
pub struct ComponentDefinition {
    type_id: TypeId,
    type_name: &'static str,
    parent: Option<TypeId>,
    scope: Option<String>,
    bindings: Vec<Binding>,
}

impl ComponentDefinition {
    /// Declares a component identified by the type `T`, with no parent, no scope and no bindings.
    pub fn new<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            parent: None,
            scope: None,
            bindings: vec![],
        }
    }

    /// Declares `P` as the parent component type. Requesting this component transparently
    /// constructs the parent first.
    pub fn with_parent<P: ?Sized + 'static>(mut self) -> Self {
        self.parent = Some(TypeId::of::<P>());
        self
    }

    /// Attaches this component to the named scope on creation.
    pub fn with_scope<S: Into<String>>(mut self, name: S) -> Self {
        self.scope = Some(name.into());
        self
    }

    /// Sets the component's own bindings (its module).
    pub fn with_bindings(mut self, bindings: Vec<Binding>) -> Self {
        self.bindings = bindings;
        self
    }
}

/// Builder for [Container]s. Collects component definitions and validates the whole configuration
/// on [build](ContainerBuilder::build).
#[derive(Default)]
pub struct ContainerBuilder {
    definitions: Vec<ComponentDefinition>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component definition.
    pub fn with_component(mut self, definition: ComponentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validates the configuration and builds the container. All bindings across all definitions
    /// are registered into a single [DependencyGraph], so duplicate and circular bindings are
    /// rejected here, before any resolution is attempted. Parent references must point at declared
    /// components and parent chains must be acyclic; declared scope names must not be empty.
    pub fn build(self) -> Result<Container, ContainerError> {
        let mut graph = DependencyGraph::new();
        let mut definitions: FxHashMap<TypeId, ComponentDefinition> = FxHashMap::default();

        for definition in self.definitions {
            if let Some(scope) = &definition.scope {
                if scope.is_empty() {
                    return Err(ContainerError::InvalidScopeName(definition.type_name));
                }
            }

            if definitions.contains_key(&definition.type_id) {
                return Err(ContainerError::DuplicateComponent(definition.type_name));
            }

            graph.register(definition.bindings.clone())?;
            definitions.insert(definition.type_id, definition);
        }

        for definition in definitions.values() {
            Self::validate_parent_chain(definition, &definitions)?;
        }

        Ok(Container {
            graph: Rc::new(graph),
            definitions,
            live: LiveComponents::default(),
            scopes: RefCell::default(),
        })
    }

    fn validate_parent_chain(
        definition: &ComponentDefinition,
        definitions: &FxHashMap<TypeId, ComponentDefinition>,
    ) -> Result<(), ContainerError> {
        let mut visited = FxHashSet::default();
        let mut names = vec![definition.type_name];
        let mut current = definition;

        visited.insert(definition.type_id);

        while let Some(parent_id) = current.parent {
            let parent = definitions
                .get(&parent_id)
                .ok_or(ContainerError::UnknownParent {
                    child: current.type_name,
                })?;

            names.push(parent.type_name);
            if !visited.insert(parent_id) {
                return Err(ContainerError::ParentCycle(names));
            }

            current = parent;
        }

        Ok(())
    }
}

/// Runtime registry of components. Components are created on first request, memoized by their
/// declared type, and removed again when destroyed.
pub struct Container {
    graph: Rc<DependencyGraph>,
    definitions: FxHashMap<TypeId, ComponentDefinition>,
    live: LiveComponents,
    scopes: RefCell<FxHashMap<String, Scope>>,
}

impl Container {
    /// Returns the live component declared for type `T`, creating it on first request. Creating a
    /// component first constructs/fetches its declared parent (memoized), then links the child
    /// into the parent's children, and only then attaches the child to its declared scope, so a
    /// scope exit during construction cannot orphan a partially linked component.
    pub fn component<T: ?Sized + 'static>(&self) -> Result<Component, ContainerError> {
        self.component_by_id(TypeId::of::<T>(), type_name::<T>())
    }

    /// Returns the live scope with the given name, creating it on first reference. Scopes survive
    /// [exit](Scope::exit) and can be re-populated.
    pub fn scope(&self, name: &str) -> Scope {
        self.scopes
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| Scope::new(name))
            .clone()
    }

    /// The validated dependency graph backing this container.
    #[inline]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    fn component_by_id(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Component, ContainerError> {
        if let Some(component) = self.live.borrow().get(&type_id) {
            return Ok(component.clone());
        }

        let definition = self
            .definitions
            .get(&type_id)
            .ok_or(ContainerError::UnknownComponent(type_name))?;

        let parent = definition
            .parent
            .map(|parent_id| {
                let parent_name = self
                    .definitions
                    .get(&parent_id)
                    .map(|parent| parent.type_name)
                    .unwrap_or(type_name);
                self.component_by_id(parent_id, parent_name)
            })
            .transpose()?;

        let component = Component::new(
            type_id,
            definition.type_name,
            definition.bindings.clone(),
            parent.as_ref(),
            self.graph.clone(),
            Rc::downgrade(&self.live),
        );

        if let Some(parent) = &parent {
            parent.attach_child(component.clone());
        }

        if let Some(scope_name) = &definition.scope {
            component.attach_scope(self.scope(scope_name));
        }

        self.live.borrow_mut().insert(type_id, component.clone());

        Ok(component)
    }
}
