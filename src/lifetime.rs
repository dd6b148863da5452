//! Reuse scope and ownership definitions.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::DiError;

/// Reuse scopes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, ReuseScope};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Session { id: u32 }
///
/// let root = Container::new();
///
/// // Hierarchy (the default): one instance for the registering container and all descendants
/// root.register(|_| Arc::new(Database { url: "postgres://localhost".to_string() })).unwrap();
///
/// // Container: one instance per container level
/// root.register(|_| Arc::new(Session { id: 7 }))
///     .unwrap()
///     .reused_within(ReuseScope::Container);
///
/// let child = root.create_child_container();
///
/// let db1 = root.resolve::<Arc<Database>>().unwrap();
/// let db2 = child.resolve::<Arc<Database>>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let s1 = root.resolve::<Arc<Session>>().unwrap();
/// let s2 = child.resolve::<Arc<Session>>().unwrap();
/// assert!(!Arc::ptr_eq(&s1, &s2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ReuseScope {
    /// Single instance shared by the registering container and every descendant
    ///
    /// The instance is cached on the entry where it was registered, so a child
    /// resolving the key gets exactly the instance its ancestor would.
    #[default]
    Hierarchy,
    /// Single instance per container level
    ///
    /// The first resolution from a container other than the registering one
    /// clones the entry into that container, which then caches its own instance.
    Container,
    /// New instance per resolution, never cached
    None,
    /// Single instance per logical request
    ///
    /// Cached in the current thread's request store and dropped when the active
    /// [`RequestScope`](crate::RequestScope) ends. Container-owned disposable
    /// instances are disposed at that point too.
    Request,
}

/// Disposal responsibility for resolved instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Owner {
    /// The container disposes the instance when it is disposed itself
    #[default]
    Container,
    /// Someone else is responsible for the instance's lifetime
    External,
}

impl fmt::Display for ReuseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReuseScope::Hierarchy => "hierarchy",
            ReuseScope::Container => "container",
            ReuseScope::None => "none",
            ReuseScope::Request => "request",
        })
    }
}

impl FromStr for ReuseScope {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchy" | "singleton" => Ok(ReuseScope::Hierarchy),
            "container" => Ok(ReuseScope::Container),
            "none" | "transient" => Ok(ReuseScope::None),
            "request" => Ok(ReuseScope::Request),
            other => Err(DiError::Configuration(format!("unknown reuse scope '{}'", other))),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Owner::Container => "container",
            Owner::External => "external",
        })
    }
}

impl FromStr for Owner {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(Owner::Container),
            "external" => Ok(Owner::External),
            other => Err(DiError::Configuration(format!("unknown owner '{}'", other))),
        }
    }
}
