//! Thread-safe store of service definitions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::definition::Definition;
use crate::error::{DiError, DiResult};
use crate::reference::Reference;

#[derive(Default)]
struct Entries {
    // Registration order, used for deterministic iteration
    order: Vec<Reference>,
    map: HashMap<Reference, Arc<Definition>>,
}

/// Definition registry keyed by [`Reference`].
///
/// Lookups take a shared lock; stores and deletes take the exclusive lock.
/// Iteration visits a snapshot so visitors may freely call back into the
/// registry (a build may resolve dependencies while ranging).
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<Entries>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a definition. A replaced definition keeps its
    /// original position in iteration order.
    pub(crate) fn store(&self, definition: Definition) -> Arc<Definition> {
        let definition = Arc::new(definition);
        let mut entries = self.entries.write();
        let reference = definition.reference().clone();
        if entries
            .map
            .insert(reference.clone(), definition.clone())
            .is_none()
        {
            entries.order.push(reference);
        }
        definition
    }

    pub(crate) fn load(&self, reference: &Reference) -> Option<Arc<Definition>> {
        self.entries.read().map.get(reference).cloned()
    }

    pub(crate) fn contains(&self, reference: &Reference) -> bool {
        self.entries.read().map.contains_key(reference)
    }

    pub(crate) fn delete(&self, reference: &Reference) -> Option<Arc<Definition>> {
        let mut entries = self.entries.write();
        let removed = entries.map.remove(reference);
        if removed.is_some() {
            entries.order.retain(|r| r != reference);
        }
        removed
    }

    pub(crate) fn count(&self) -> usize {
        self.entries.read().map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub(crate) fn clear(&self) {
        let mut entries = self.entries.write();
        entries.order.clear();
        entries.map.clear();
    }

    pub(crate) fn references(&self) -> Vec<Reference> {
        self.entries.read().order.clone()
    }

    /// Definitions in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Definition>> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter_map(|r| entries.map.get(r).cloned())
            .collect()
    }

    /// Visits every definition, collecting visitor failures.
    ///
    /// All definitions are visited even when some fail. Any failure yields a
    /// [`DiError::Build`] listing each one in visiting order.
    pub(crate) fn range<F>(&self, mut visit: F) -> DiResult<()>
    where
        F: FnMut(&Reference, &Arc<Definition>) -> DiResult<()>,
    {
        let errors: Vec<DiError> = self
            .snapshot()
            .iter()
            .filter_map(|def| visit(def.reference(), def).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiError::Build(errors))
        }
    }
}
