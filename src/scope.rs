//! Named groups of components destroyed together. A [Scope] holds weak references to its member
//! components; exiting the scope notifies each member to destroy itself and its subtree. A scope
//! is not destroyed when it exits - new components can re-populate it later.

use crate::component::{Component, ComponentInner};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Cheap-clone handle to a named scope. Obtained from the scope registry of a
/// [Container](crate::container::Container).
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    name: String,
    observers: RefCell<Vec<Weak<ComponentInner>>>,
}

impl Scope {
    pub(crate) fn new<N: Into<String>>(name: N) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                name: name.into(),
                observers: RefCell::default(),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registers a component to be destroyed when this scope exits.
    pub fn add_observer(&self, component: &Component) {
        self.inner.observers.borrow_mut().push(component.downgrade());
    }

    /// Deregisters a component. No-op when the component is not a member.
    pub fn remove_observer(&self, component: &Component) {
        let member = component.downgrade();
        self.inner
            .observers
            .borrow_mut()
            .retain(|observer| !observer.ptr_eq(&member));
    }

    /// Exits the scope, destroying every member exactly once and leaving the scope empty and
    /// reusable. Membership is snapshotted and cleared before any member is notified, so members
    /// removing themselves during teardown, or a re-entrant exit, cannot revisit anyone.
    pub fn exit(&self) {
        debug!(scope = %self.inner.name, "exiting scope");

        let members: Vec<_> = self.inner.observers.borrow_mut().drain(..).collect();
        for member in members {
            if let Some(inner) = member.upgrade() {
                Component::from_inner(inner).destroy();
            }
        }
    }
}
