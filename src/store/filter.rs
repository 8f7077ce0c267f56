//! Search filters over entries.

use crate::types::Entry;

/// Filters for [`EntryStore::search`](super::EntryStore::search).
///
/// Dimensions combine with AND; an unset dimension matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    keyword: Option<String>,
    category: Option<String>,
    entry_type: Option<String>,
    tags: Vec<String>,
    include_deprecated: bool,
}

impl SearchFilter {
    /// A filter that matches every live entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring over title and summary.
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into().to_lowercase());
        self
    }

    /// Exact category match.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Exact type match.
    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    /// Entry tags must be a superset of these.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Also return entries whose latest record is a deprecation.
    pub fn include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    /// Test one entry against every dimension.
    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.include_deprecated && entry.is_deprecated() {
            return false;
        }
        if let Some(category) = &self.category {
            if &entry.category != category {
                return false;
            }
        }
        if let Some(entry_type) = &self.entry_type {
            if &entry.entry_type != entry_type {
                return false;
            }
        }
        if !entry.has_all_tags(&self.tags) {
            return false;
        }
        match &self.keyword {
            Some(needle) => entry.matches_keyword(needle),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryBuilder;

    fn sample() -> Entry {
        EntryBuilder::new("PM-7", "decision")
            .category("architecture")
            .title("Adopt JSONL")
            .summary("One record per line keeps appends atomic")
            .tags(["storage", "format"])
            .build()
    }

    #[test]
    fn keyword_ignores_case() {
        assert!(SearchFilter::new().keyword("jsonl").matches(&sample()));
        assert!(SearchFilter::new().keyword("ATOMIC").matches(&sample()));
        assert!(!SearchFilter::new().keyword("storage").matches(&sample()));
    }

    #[test]
    fn tags_are_a_subset_test() {
        assert!(SearchFilter::new().tags(["format"]).matches(&sample()));
        assert!(!SearchFilter::new().tags(["format", "graph"]).matches(&sample()));
    }

    #[test]
    fn dimensions_are_anded() {
        let f = SearchFilter::new().keyword("jsonl").category("process");
        assert!(!f.matches(&sample()));
        let f = SearchFilter::new().keyword("jsonl").category("architecture").entry_type("decision");
        assert!(f.matches(&sample()));
    }

    #[test]
    fn deprecated_hidden_by_default() {
        let dep = sample().deprecated_copy(Some("superseded"));
        assert!(!SearchFilter::new().matches(&dep));
        assert!(SearchFilter::new().include_deprecated(true).matches(&dep));
    }
}
