//! Declarative dependency injection with a validated binding graph, a hierarchical component tree
//! and scope-driven lifecycles.
//!
//! [Binding](binding::Binding)s declare how to construct or supply a value for a [Key](key::Key)
//! (a type identity plus an optional qualifier). All bindings are registered into a
//! [DependencyGraph](graph::DependencyGraph) up front and validated as a whole - duplicate and
//! circular bindings are configuration errors rejected before any resolution happens.
//!
//! At runtime, [Component](component::Component)s form a tree. A component resolves a requested
//! key against its own bindings first, then its runtime overrides, then delegates up the parent
//! chain; results are cached per binding policy in [provider](provider) cells. Exiting a
//! [Scope](scope::Scope) destroys its member components together with their subtrees and cached
//! instances.
//!
//! ```
//! use anvil_di::binding::Binding;
//! use anvil_di::container::{ComponentDefinition, ContainerBuilder};
//! use anvil_di::instance_provider::{InstanceResolver, TypedInstanceResolver};
//! use anvil_di::key::Key;
//!
//! struct App;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let greeting_key = Key::of::<String>().with_qualifier("greeting");
//! let dependency = greeting_key.clone();
//!
//! let bindings = vec![
//!     Binding::supplier(greeting_key.clone(), || "hello".to_string()),
//!     Binding::factory(Key::of::<Greeter>(), move |resolver: &dyn InstanceResolver| {
//!         let greeting = resolver.instance::<String>(&dependency)?;
//!         Ok(Greeter {
//!             greeting: (*greeting).clone(),
//!         })
//!     })
//!     .singleton()
//!     .with_dependency("greeting", greeting_key),
//! ];
//!
//! let container = ContainerBuilder::new()
//!     .with_component(ComponentDefinition::new::<App>().with_bindings(bindings))
//!     .build()
//!     .unwrap();
//!
//! let app = container.component::<App>().unwrap();
//! let greeter = app.get::<Greeter>().unwrap();
//! assert_eq!(greeter.greeting, "hello");
//! ```

pub mod binding;
pub mod component;
pub mod container;
mod error;
pub mod graph;
pub mod instance_provider;
pub mod key;
pub mod provider;
pub mod scope;

pub use error::{ContainerError, GraphError, ResolveError};
