// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::staking::cache::QueueMap;

/// In-memory stand-in for the persistent store backing one queue.
#[derive(Debug)]
pub struct MemoryQueue<T> {
    entries: RwLock<HashMap<String, Vec<T>>>,
}

impl<T> Default for MemoryQueue<T> {
    fn default() -> Self {
        Self {
            entries: Default::default(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> MemoryQueue<T> {
    pub fn set(&self, key: impl Into<String>, values: Vec<T>) {
        self.entries.write().insert(key.into(), values);
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn snapshot(&self) -> QueueMap<T> {
        self.entries.read().clone()
    }

    /// Loader reading the current store contents on every call.
    pub fn loader<C: ?Sized + 'static>(
        self: &Arc<Self>,
    ) -> impl Fn(&C) -> anyhow::Result<QueueMap<T>> + Send + Sync + 'static {
        let store = Arc::clone(self);
        move |_| Ok(store.snapshot())
    }
}
