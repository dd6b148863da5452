//! # ferrous-container
//!
//! Hierarchical dependency injection container with explicit reuse scopes,
//! container-owned disposal and opt-in autowiring.
//!
//! ## Features
//!
//! - **Keyed registrations**: services are keyed by type, factory argument shape and an optional name
//! - **Reuse scopes**: hierarchy-wide singletons, per-container instances, per-request instances or none
//! - **Child containers**: lookups fall back to the parent; children are disposed with their parent
//! - **Ownership**: container-owned disposables are disposed in reverse creation order
//! - **Autowiring**: types describe their constructors and optional properties through [`AutoWire`]
//! - **Adapters**: unresolved lookups can be delegated to a foreign container
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_container::{Container, ReuseScope};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container.register(|_| Arc::new(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! })).unwrap();
//! container
//!     .register_fallible(|c| Ok(Arc::new(UserService { db: c.resolve()? })))
//!     .unwrap()
//!     .reused_within(ReuseScope::None);
//!
//! let users = container.resolve::<Arc<UserService>>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Reuse Scopes
//!
//! - **Hierarchy** (default): one instance, owned by the registering container and shared with its children
//! - **Container**: one instance per container that resolves it
//! - **Request**: one instance per [`RequestScope`] on the current thread
//! - **None**: a new instance on every resolution
//!
//! ## Trait Objects
//!
//! ```rust
//! use ferrous_container::Container;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let container = Container::new();
//! container.register(|_| Arc::new(ConsoleLogger) as Arc<dyn Logger>).unwrap();
//!
//! let logger = container.resolve::<Arc<dyn Logger>>().unwrap();
//! assert_eq!(logger.log("hello"), "[LOG] hello");
//! ```

pub mod autowire;
pub mod config;
pub mod container;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod traits;

mod internal;
mod registration;

pub use autowire::{Arguments, AutoWire, Constructor, PlanCache, Property};
pub use config::{ConfigSource, ContainerConfig, EnvironmentConfigSource, MapConfigSource};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use container::{Container, RequestScope};
pub use error::{DiError, DiResult, DisposeError};
pub use key::ServiceKey;
pub use lifetime::{Owner, ReuseScope};
pub use registration::Registration;
pub use traits::{ContainerAdapter, Dispose, Service};
