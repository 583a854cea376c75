//! Cross-thread deadlock detection for build locks.
//!
//! Each thread blocked on a definition's build lock is recorded with the
//! definition it waits for. Following "waits for definition, built by
//! thread" edges from the current thread either ends at a thread that is not
//! blocked, or comes back around, in which case the builds form a cycle that
//! no amount of waiting can resolve.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::definition::{BuildGuard, Definition};
use crate::error::{DiError, DiResult};
use crate::reference::Reference;

/// How long a blocked thread waits before re-checking for a cycle.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
pub(crate) struct WaitGraph {
    waiting: Mutex<HashMap<ThreadId, Arc<Definition>>>,
}

impl WaitGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Takes the build lock of `definition`, failing with
    /// [`DiError::Circular`] instead of blocking forever when the thread
    /// holding it is itself waiting on this thread.
    pub(crate) fn acquire<'d>(&self, definition: &'d Arc<Definition>) -> DiResult<BuildGuard<'d>> {
        if let Some(guard) = definition.try_begin_build() {
            return Ok(guard);
        }

        let me = thread::current().id();
        self.waiting.lock().insert(me, definition.clone());

        let result = loop {
            if let Some(path) = self.cycle_from(me, definition) {
                break Err(DiError::Circular(path));
            }
            if let Some(guard) = definition.begin_build_within(POLL_INTERVAL) {
                break Ok(guard);
            }
        };

        self.waiting.lock().remove(&me);
        result
    }

    /// References along the wait chain starting at `awaited`, closed into a
    /// cycle when the chain leads back to `me`.
    fn cycle_from(&self, me: ThreadId, awaited: &Arc<Definition>) -> Option<Vec<Reference>> {
        let waiting = self.waiting.lock();
        let mut chain: Vec<Reference> = Vec::new();
        let mut current = awaited.clone();

        // A chain longer than the number of blocked threads loops elsewhere
        for _ in 0..=waiting.len() {
            chain.push(current.reference().clone());
            let owner = current.builder_thread()?;
            if owner == me {
                chain.insert(0, current.reference().clone());
                return Some(chain);
            }
            current = waiting.get(&owner)?.clone();
        }
        None
    }
}
