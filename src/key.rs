//! Service key types for the dependency injection container.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key for service storage and lookup.
///
/// A key is the factory shape of a registration (the service type plus the
/// type of the extra arguments its factory takes) together with an optional
/// registration name. `()` is the argument shape of a plain factory, `A` the
/// shape of a one-argument factory, `(A, B)` of a two-argument one, and so on.
///
/// Equality and hashing only look at the `TypeId`s and the name; the type
/// names are carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::ServiceKey;
///
/// let plain = ServiceKey::of::<String, ()>(None);
/// let with_arg = ServiceKey::of::<String, u32>(None);
/// let named = ServiceKey::of::<String, ()>(Some("greeting"));
///
/// assert_ne!(plain, with_arg);
/// assert_ne!(plain, named);
/// assert_eq!(plain, ServiceKey::of::<String, ()>(None));
/// assert_eq!(named.service_name(), Some("greeting"));
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    service: TypeId,
    service_type: &'static str,
    args: TypeId,
    args_type: &'static str,
    name: Option<String>,
}

impl ServiceKey {
    /// Builds the key for service `T` produced by a factory taking `A`.
    #[inline]
    pub fn of<T: 'static, A: 'static>(name: Option<&str>) -> Self {
        Self {
            service: TypeId::of::<T>(),
            service_type: std::any::type_name::<T>(),
            args: TypeId::of::<A>(),
            args_type: std::any::type_name::<A>(),
            name: name.map(str::to_owned),
        }
    }

    /// Get the service type name for display
    ///
    /// Returns the `std::any::type_name` of the service type.
    ///
    /// ```rust
    /// use ferrous_container::ServiceKey;
    ///
    /// let key = ServiceKey::of::<u32, ()>(Some("port"));
    /// assert_eq!(key.display_name(), "u32");
    /// ```
    pub fn display_name(&self) -> &'static str {
        self.service_type
    }

    /// Type name of the factory's extra-argument shape (`"()"` for plain factories).
    pub fn args_name(&self) -> &'static str {
        self.args_type
    }

    /// Registration name, or `None` for unnamed registrations.
    pub fn service_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `TypeId` of the service type.
    pub fn service_type_id(&self) -> TypeId {
        self.service
    }

    /// True when the factory takes no extra arguments.
    pub fn is_plain(&self) -> bool {
        self.args == TypeId::of::<()>()
    }
}

impl PartialEq for ServiceKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service && self.args == other.args && self.name == other.name
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service.hash(state);
        self.args.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ServiceKey");
        s.field("service", &self.service_type);
        if !self.is_plain() {
            s.field("args", &self.args_type);
        }
        s.field("name", &self.name).finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_type)?;
        if !self.is_plain() {
            write!(f, "({})", self.args_type)?;
        }
        if let Some(name) = &self.name {
            write!(f, " named '{}'", name)?;
        }
        Ok(())
    }
}
