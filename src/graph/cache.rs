//! Lazily built, atomically swapped graph view over a store.

use std::sync::{Arc, PoisonError, RwLock};

use crate::store::EntryStore;
use crate::types::PmemResult;

use super::KnowledgeGraph;

struct Cached {
    fingerprint: u64,
    graph: Arc<KnowledgeGraph>,
}

/// Holds the most recently built graph.
///
/// A build never mutates the graph other callers hold: the new graph is
/// constructed off to the side and then replaces the old one in a single
/// swap. Readers keep their `Arc` to whichever version they were handed.
#[derive(Default)]
pub struct GraphCache {
    slot: RwLock<Option<Cached>>,
}

impl GraphCache {
    /// An empty cache; the first request builds.
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph for the store's current contents, building only if nothing
    /// is cached or the log grew since the cached build.
    pub fn current(&self, store: &EntryStore) -> PmemResult<Arc<KnowledgeGraph>> {
        let fingerprint = store.fingerprint()?;
        {
            let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = slot.as_ref() {
                if cached.fingerprint == fingerprint {
                    return Ok(Arc::clone(&cached.graph));
                }
            }
        }
        self.build_and_swap(store, fingerprint)
    }

    /// Unconditionally rebuild from the store and swap the result in.
    pub fn rebuild(&self, store: &EntryStore) -> PmemResult<Arc<KnowledgeGraph>> {
        let fingerprint = store.fingerprint()?;
        self.build_and_swap(store, fingerprint)
    }

    fn build_and_swap(
        &self,
        store: &EntryStore,
        fingerprint: u64,
    ) -> PmemResult<Arc<KnowledgeGraph>> {
        let graph = Arc::new(KnowledgeGraph::build(store)?);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Cached {
            fingerprint,
            graph: Arc::clone(&graph),
        });
        Ok(graph)
    }

    /// The cached graph without checking freshness.
    pub fn cached(&self) -> Option<Arc<KnowledgeGraph>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|c| Arc::clone(&c.graph))
    }

    /// Drop the cached graph; the next request rebuilds.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}
