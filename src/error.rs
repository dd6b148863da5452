//! Error types for the dependency injection container.

use std::sync::Arc;

/// Error returned by a [`Dispose`](crate::Dispose) implementation.
pub type DisposeError = Arc<dyn std::error::Error + Send + Sync>;

/// Dependency injection errors
///
/// Represents the various error conditions that can occur during service
/// registration, resolution, autowiring, or container disposal.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, DiError};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::MissingRegistration { service, name }) => {
///         assert_eq!(service, "alloc::string::String");
///         assert!(name.is_none());
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_container::DiError;
///
/// let missing = DiError::MissingRegistration {
///     service: "app::Logger",
///     name: Some("audit".to_string()),
/// };
/// assert_eq!(
///     missing.to_string(),
///     "Required dependency of type app::Logger named 'audit' could not be resolved."
/// );
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No entry for the requested type, argument shape and name anywhere in the hierarchy
    #[error("{}", missing_message(.service, .name.as_deref()))]
    MissingRegistration {
        /// Full type name of the requested service
        service: &'static str,
        /// Registration name, if the lookup was named
        name: Option<String>,
    },
    /// Invalid registration or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Autowire target exposes no constructor
    #[error("No public constructor found for autowired type {0}")]
    Construction(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The container an entry belongs to has already been dropped
    #[error("Container owning {0} has been dropped")]
    ContainerDropped(&'static str),
    /// A tracked disposable failed while the container was being disposed
    #[error("Failed to dispose {service}: {source}")]
    Dispose {
        /// Full type name of the service whose disposal failed
        service: &'static str,
        /// Error returned by the disposal hook
        source: DisposeError,
    },
}

fn missing_message(service: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!(
            "Required dependency of type {} named '{}' could not be resolved.",
            service, name
        ),
        None => format!("Required dependency of type {} could not be resolved.", service),
    }
}

impl DiError {
    pub(crate) fn missing<T: 'static>(name: Option<&str>) -> Self {
        DiError::MissingRegistration {
            service: std::any::type_name::<T>(),
            name: name.map(str::to_owned),
        }
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout the crate.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{DiResult, DiError};
///
/// fn load_port() -> DiResult<u16> {
///     Err(DiError::Configuration("port is not set".to_string()))
/// }
///
/// assert!(load_port().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
