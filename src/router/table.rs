use crate::route::Route;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The flushed, named route table.
///
/// An ordered mapping of unique names to route definitions. Immutable after
/// construction except for [`add`] and [`add_collection`], which are used
/// while mounting flushed sub-applications during bootstrap. Matching never
/// mutates it, so a built table can be read from any number of
/// request-handling coroutines without locking.
///
/// [`add`]: RouteTable::add
/// [`add_collection`]: RouteTable::add_collection
#[derive(Clone, Default)]
pub struct RouteTable {
    entries: Vec<TableEntry>,
    index: HashMap<String, usize>,
}

#[derive(Clone)]
struct TableEntry {
    name: String,
    route: Arc<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route under a name. An existing entry with the same name is
    /// removed first, so the new route takes the later position.
    pub fn add(&mut self, name: &str, route: Route) {
        if let Some(pos) = self.index.remove(name) {
            self.entries.remove(pos);
            self.reindex();
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(TableEntry {
            name: name.to_string(),
            route: Arc::new(route),
        });
    }

    /// Merge another table into this one, preserving its entry order.
    /// Same-name entries are replaced, as in [`add`].
    ///
    /// [`add`]: RouteTable::add
    pub fn add_collection(&mut self, other: RouteTable) {
        debug!(merged = other.len(), into = self.len(), "route tables merged");
        for entry in other.entries {
            if let Some(pos) = self.index.remove(&entry.name) {
                self.entries.remove(pos);
                self.reindex();
            }
            self.index.insert(entry.name.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.index.get(name).map(|&pos| &self.entries[pos].route)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Route>)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.route))
    }

    /// Route names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Iterate entries in match order: priority descending, ties broken by
    /// insertion order. The order is recomputed from the current priorities
    /// on every call, not cached at insertion.
    #[must_use]
    pub fn iter_prioritized(&self) -> Vec<(&str, &Arc<Route>)> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| (Reverse(self.entries[i].route.priority()), i));
        order
            .into_iter()
            .map(|i| (self.entries[i].name.as_str(), &self.entries[i].route))
            .collect()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }
}
