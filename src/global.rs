//! Process-wide default container.
//!
//! Opt-in convenience for applications that want one shared container
//! without threading a handle through their code.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::container::Container;

static DEFAULT_CONTAINER: Lazy<RwLock<Container>> = Lazy::new(|| RwLock::new(Container::new()));

/// Handle to the process-wide container.
///
/// Every call returns a handle to the same registry until
/// [`reset_default_container`] replaces it.
///
/// # Examples
///
/// ```rust
/// use ref_di::{default_container, Container, Value};
///
/// default_container().set("app.name", Value::new("demo"));
/// let name: &'static str = default_container().must_get_as("app.name");
/// assert_eq!(name, "demo");
/// assert!(Container::ptr_eq(&default_container(), &default_container()));
/// ```
pub fn default_container() -> Container {
    DEFAULT_CONTAINER.read().clone()
}

/// Swaps in a fresh, empty default container.
///
/// Handles obtained earlier keep pointing at the old registry.
pub fn reset_default_container() {
    *DEFAULT_CONTAINER.write() = Container::new();
}
