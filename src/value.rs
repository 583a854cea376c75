//! Type-erased runtime values passed between providers.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A cheaply clonable, type-erased value.
///
/// Service instances, literal arguments, parameters and provider results all
/// travel through the container as `Value`s. Cloning shares the underlying
/// allocation, so identity is preserved across clones (see [`Value::ptr_eq`]).
///
/// A value may also carry *views*: alternative representations of the same
/// service registered through capability casts (for example an
/// `Arc<dyn Trait>` view of an `Arc<Concrete>` instance). Parameter type
/// checks accept either the primary type or any view.
///
/// # Examples
///
/// ```rust
/// use ref_di::Value;
///
/// let v = Value::new(String::from("hello"));
/// assert!(v.is::<String>());
/// assert_eq!(v.get::<String>().as_deref(), Some("hello"));
///
/// let copy = v.clone();
/// assert!(Value::ptr_eq(&v, &copy));
/// ```
#[derive(Clone)]
pub struct Value {
    inner: AnyArc,
    type_id: TypeId,
    type_name: &'static str,
    views: Vec<Value>,
}

/// Marker stored by [`Value::nil`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nil;

impl Value {
    /// Wraps a value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing allocation without copying it.
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Value {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            views: Vec::new(),
        }
    }

    /// The untyped absent value, used for "no error" in a provider's error slot.
    pub fn nil() -> Self {
        Self::new(Nil)
    }

    /// A typed absent value that fits an `Option<T>` parameter.
    pub fn none<T: Send + Sync + 'static>() -> Self {
        Self::new(Option::<T>::None)
    }

    pub fn is_nil(&self) -> bool {
        self.type_id == TypeId::of::<Nil>()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True when the primary representation is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// True when the value is a `T` or carries a view of type `T`.
    pub fn fits(&self, type_id: TypeId) -> bool {
        self.type_id == type_id || self.view_of(type_id).is_some()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Shares the underlying allocation as an `Arc<T>`.
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Clones out the primary representation.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Clones out a `T` from the primary representation or a matching view.
    pub fn extract<T: Clone + 'static>(&self) -> Option<T> {
        self.get::<T>()
            .or_else(|| self.view_of(TypeId::of::<T>()).and_then(Value::get::<T>))
    }

    /// Adds an alternative representation of the same service.
    pub fn with_view(mut self, view: Value) -> Self {
        self.views.retain(|v| v.type_id != view.type_id);
        self.views.push(view);
        self
    }

    pub(crate) fn view_of(&self, type_id: TypeId) -> Option<&Value> {
        self.views.iter().find(|v| v.type_id == type_id)
    }

    /// Identity comparison: true when both values share one allocation.
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .field("views", &self.views.iter().map(|v| v.type_name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speaker: Send + Sync {
        fn speak(&self) -> &'static str;
    }

    struct Dog;

    impl Speaker for Dog {
        fn speak(&self) -> &'static str {
            "woof"
        }
    }

    #[test]
    fn nil_and_none_are_distinct() {
        assert!(Value::nil().is_nil());
        let none = Value::none::<String>();
        assert!(!none.is_nil());
        assert!(none.is::<Option<String>>());
        assert_eq!(none.get::<Option<String>>(), Some(None));
    }

    #[test]
    fn views_satisfy_extraction() {
        let dog = Arc::new(Dog);
        let speaker: Arc<dyn Speaker> = dog.clone();
        let value = Value::new(dog).with_view(Value::new(speaker));

        assert!(value.fits(TypeId::of::<Arc<dyn Speaker>>()));
        let extracted = value.extract::<Arc<dyn Speaker>>().map(|s| s.speak());
        assert_eq!(extracted, Some("woof"));
        assert!(value.get::<Arc<dyn Speaker>>().is_none());
    }

    #[test]
    fn from_arc_shares_allocation() {
        let shared = Arc::new(5u8);
        let value = Value::from_arc(shared.clone());
        let back = value.downcast_arc::<u8>();
        assert!(back.is_some_and(|b| Arc::ptr_eq(&b, &shared)));
    }
}
