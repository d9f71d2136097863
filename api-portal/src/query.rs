// Copyright 2026 Oxide Computer Company

//! Searching the catalog

use crate::catalog::ApiDescriptor;
use crate::catalog::Catalog;

/// A single free-text search term
///
/// A missing term and an empty term mean the same thing: no filtering at all.
/// That's the portal's default view, so a search for nothing returns
/// everything rather than nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// case-folded term; `None` when there's nothing to filter on
    term: Option<String>,
}

impl SearchQuery {
    pub fn new(term: Option<&str>) -> SearchQuery {
        let term = term.filter(|t| !t.is_empty()).map(str::to_lowercase);
        SearchQuery { term }
    }

    /// Returns the case-folded term, if any.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// Returns true if `descriptor`'s name or URL contains this term
    /// anywhere, ignoring case.
    pub fn matches(&self, descriptor: &ApiDescriptor) -> bool {
        match &self.term {
            None => true,
            Some(term) => {
                descriptor.name.to_lowercase().contains(term.as_str())
                    || descriptor.url.to_lowercase().contains(term.as_str())
            }
        }
    }
}

/// Returns the descriptors in `catalog` that match `query`, in catalog order.
pub fn search<'a>(
    catalog: &'a Catalog,
    query: &SearchQuery,
) -> Vec<&'a ApiDescriptor> {
    catalog.all().iter().filter(|d| query.matches(d)).collect()
}
