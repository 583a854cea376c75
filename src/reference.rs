//! Service reference types for the container.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Key for service storage and lookup.
///
/// A reference wraps any `Eq + Hash + Display` value: string names, enum
/// variants, numeric ids or pointer-identity handles. Two references are
/// equal only when the wrapped key types are the same and the keys compare
/// equal, so `Reference::from("1")` and `Reference::new(1u32)` never collide.
///
/// # Examples
///
/// ```rust
/// use ref_di::Reference;
/// use std::fmt;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Svc { Mailer, Queue }
///
/// impl fmt::Display for Svc {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{:?}", self)
///     }
/// }
///
/// let by_name = Reference::from("mailer");
/// let by_enum = Reference::new(Svc::Mailer);
///
/// assert_eq!(by_name.to_string(), "mailer");
/// assert_eq!(by_enum.to_string(), "Mailer");
/// assert_eq!(by_enum, Reference::new(Svc::Mailer));
/// assert_ne!(by_enum, Reference::new(Svc::Queue));
/// assert_ne!(by_name, Reference::from("Mailer"));
/// ```
#[derive(Clone)]
pub struct Reference(Arc<dyn RefKey>);

impl Reference {
    /// Wraps an arbitrary key.
    pub fn new<K>(key: K) -> Self
    where
        K: Eq + Hash + fmt::Display + Send + Sync + 'static,
    {
        Reference(Arc::new(key))
    }

    /// Downcasts the wrapped key.
    pub fn key<K: 'static>(&self) -> Option<&K> {
        self.0.as_any().downcast_ref::<K>()
    }

    /// Type name of the wrapped key, for diagnostics.
    pub fn key_type_name(&self) -> &'static str {
        self.0.key_type_name()
    }
}

/// Object-safe view of a reference key.
trait RefKey: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn key_type_id(&self) -> TypeId;
    fn key_type_name(&self) -> &'static str;
    fn eq_key(&self, other: &dyn RefKey) -> bool;
    fn hash_key(&self, state: &mut dyn Hasher);
    fn fmt_key(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<K> RefKey for K
where
    K: Eq + Hash + fmt::Display + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_type_id(&self) -> TypeId {
        TypeId::of::<K>()
    }

    fn key_type_name(&self) -> &'static str {
        std::any::type_name::<K>()
    }

    fn eq_key(&self, other: &dyn RefKey) -> bool {
        other.as_any().downcast_ref::<K>().is_some_and(|o| o == self)
    }

    fn hash_key(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn fmt_key(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.eq_key(other.0.as_ref())
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key_type_id().hash(state);
        self.0.hash_key(state);
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by display form, then by key type name.
impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.key_type_name().cmp(other.key_type_name()))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_key(f)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self)
    }
}

// String-like keys all share one key type so "db" and String::from("db") match.
impl From<&'static str> for Reference {
    fn from(name: &'static str) -> Self {
        Reference::new(Cow::<'static, str>::Borrowed(name))
    }
}

impl From<String> for Reference {
    fn from(name: String) -> Self {
        Reference::new(Cow::<'static, str>::Owned(name))
    }
}

impl From<&Reference> for Reference {
    fn from(reference: &Reference) -> Self {
        reference.clone()
    }
}

/// Label attached to definitions for group lookup.
pub type Tag = Cow<'static, str>;
