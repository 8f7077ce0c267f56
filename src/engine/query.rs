//! Query facade: one read contract over the store and the graph.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::graph::{extract_network, GraphCache, GraphStats, KnowledgeGraph, Network};
use crate::store::{EntryStore, SearchFilter, SearchResult};
use crate::types::{Entry, EntrySummary, PmemResult, Resolved, Versioned, DEFAULT_DEPTH};

/// Options for [`QueryEngine::context_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Maximum number of hops.
    pub depth: u32,
    /// Also follow incoming links.
    pub include_reverse: bool,
    /// Keep link targets that have no record.
    pub include_dangling: bool,
    /// Keep entries whose latest record is a deprecation.
    pub include_deprecated: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            include_reverse: false,
            include_dangling: false,
            include_deprecated: false,
        }
    }
}

impl ContextOptions {
    /// Defaults taken from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            depth: config.default_depth,
            include_reverse: false,
            include_dangling: config.include_dangling,
            include_deprecated: config.include_deprecated,
        }
    }

    /// Set the depth.
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set whether incoming links are followed.
    pub fn include_reverse(mut self, include: bool) -> Self {
        self.include_reverse = include;
        self
    }

    /// Set whether dangling references are returned.
    pub fn include_dangling(mut self, include: bool) -> Self {
        self.include_dangling = include;
        self
    }

    /// Set whether deprecated entries are returned.
    pub fn include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }
}

/// The query engine: filtered search plus relationship traversal.
///
/// The graph is built on first use and rebuilt whenever the log has grown
/// since the last build.
pub struct QueryEngine<'s> {
    store: &'s EntryStore,
    graph: GraphCache,
}

impl<'s> QueryEngine<'s> {
    /// Create a query engine over a store.
    pub fn new(store: &'s EntryStore) -> Self {
        Self {
            store,
            graph: GraphCache::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &'s EntryStore {
        self.store
    }

    /// Filtered search over the latest entries.
    pub fn find(&self, filter: &SearchFilter) -> PmemResult<SearchResult> {
        self.store.search(filter)
    }

    /// Latest record for an id.
    pub fn entry(&self, id: &str) -> PmemResult<Option<Entry>> {
        self.store.get(id)
    }

    /// Full record chain for an id.
    pub fn history(&self, id: &str) -> PmemResult<Vec<Versioned>> {
        self.store.get_history(id)
    }

    /// Summary-first view of an entry.
    pub fn summary(&self, id: &str, max_words: usize) -> PmemResult<Option<EntrySummary>> {
        self.store.summary(id, max_words)
    }

    /// The graph for the store's current contents.
    pub fn graph(&self) -> PmemResult<Arc<KnowledgeGraph>> {
        self.graph.current(self.store)
    }

    /// Force a full rebuild.
    pub fn rebuild(&self) -> PmemResult<Arc<KnowledgeGraph>> {
        self.graph.rebuild(self.store)
    }

    /// Raw traversal: every reached node, dangling references included.
    pub fn get_related(
        &self,
        id: &str,
        depth: u32,
        include_reverse: bool,
    ) -> PmemResult<Vec<Resolved>> {
        Ok(self.graph()?.get_related(id, depth, include_reverse))
    }

    /// Traversal resolved for display, filtered per `options`.
    ///
    /// Payloads come from the same snapshot the traversal ran on, so ids and
    /// records are always consistent with each other.
    pub fn context_for(&self, id: &str, options: &ContextOptions) -> PmemResult<Vec<Resolved>> {
        let related = self.get_related(id, options.depth, options.include_reverse)?;
        Ok(related
            .into_iter()
            .filter(|r| match r {
                Resolved::Entry(e) => options.include_deprecated || !e.is_deprecated(),
                Resolved::Dangling { .. } => options.include_dangling,
            })
            .collect())
    }

    /// Live entries `id` relies on, transitively.
    pub fn dependencies(&self, id: &str) -> PmemResult<Vec<Entry>> {
        Ok(live_entries(self.graph()?.dependencies(id)))
    }

    /// Live entries that link directly to `id`.
    pub fn dependents(&self, id: &str) -> PmemResult<Vec<Entry>> {
        Ok(live_entries(self.graph()?.dependents(id)))
    }

    /// Neighbourhood of `id` for visualisation.
    pub fn network(&self, id: &str, max_depth: u32) -> PmemResult<Network> {
        Ok(extract_network(&*self.graph()?, id, max_depth))
    }

    /// Graph statistics.
    pub fn stats(&self) -> PmemResult<GraphStats> {
        Ok(self.graph()?.stats())
    }

    /// Live entries whose `related_concepts` mention `concept`, ignoring case.
    pub fn find_by_concept(&self, concept: &str) -> PmemResult<Vec<Entry>> {
        let needle = concept.to_lowercase();
        let result = self.store.search(&SearchFilter::new())?;
        Ok(result
            .entries
            .into_iter()
            .filter(|e| e.related_concepts().any(|c| c.to_lowercase().contains(&needle)))
            .collect())
    }
}

fn live_entries(resolved: Vec<Resolved>) -> Vec<Entry> {
    resolved
        .into_iter()
        .filter_map(|r| match r {
            Resolved::Entry(e) if !e.is_deprecated() => Some(e),
            _ => None,
        })
        .collect()
}
