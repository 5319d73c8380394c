//! Resources that compiled successfully at least once.
//!
//! Append-only; only used to decide whether a compile is a recompile.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
pub(crate) struct CompletedSet {
    inner: Mutex<HashSet<Arc<str>>>,
}

impl CompletedSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, resource: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(resource)
    }

    pub(crate) fn insert(&self, resource: Arc<str>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(resource);
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
