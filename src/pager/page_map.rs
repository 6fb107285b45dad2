//! Ordered page map
//!
//! Insertion-ordered mapping from [`PageKey`] to page data. Forward loads
//! append at the tail, backward loads insert at the head, and a recurring
//! key overwrites its page in place without moving it.

use crate::query::PageKey;
use crate::types::Direction;

/// Insertion-ordered page storage
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedPageMap<D> {
    entries: Vec<(PageKey, D)>,
}

impl<D> Default for OrderedPageMap<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D> OrderedPageMap<D> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the tail, or overwrite in place if the key exists
    ///
    /// Returns `true` when the key was new.
    pub fn append(&mut self, key: PageKey, data: D) -> bool {
        if let Some(slot) = self.slot_mut(&key) {
            *slot = data;
            return false;
        }
        self.entries.push((key, data));
        true
    }

    /// Insert at the head, or overwrite in place if the key exists
    ///
    /// Returns `true` when the key was new.
    pub fn prepend(&mut self, key: PageKey, data: D) -> bool {
        if let Some(slot) = self.slot_mut(&key) {
            *slot = data;
            return false;
        }
        self.entries.insert(0, (key, data));
        true
    }

    /// Insert on the side matching `direction`
    pub fn insert(&mut self, direction: Direction, key: PageKey, data: D) -> bool {
        match direction {
            Direction::Forward => self.append(key, data),
            Direction::Backward => self.prepend(key, data),
        }
    }

    /// Page stored under `key`
    pub fn get(&self, key: &PageKey) -> Option<&D> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    /// Position of `key` in the logical page sequence
    pub fn position(&self, key: &PageKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// First (oldest known) page
    pub fn first(&self) -> Option<&D> {
        self.entries.first().map(|(_, d)| d)
    }

    /// Last (newest known) page
    pub fn last(&self) -> Option<&D> {
        self.entries.last().map(|(_, d)| d)
    }

    /// Keys in page order
    pub fn keys(&self) -> impl Iterator<Item = &PageKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Pages in page order
    pub fn values(&self) -> impl Iterator<Item = &D> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Number of pages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pages are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every page
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn slot_mut(&mut self, key: &PageKey) -> Option<&mut D> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(n: i64) -> PageKey {
        PageKey::from_values([json!(n)])
    }

    #[test]
    fn test_append_keeps_call_order() {
        let mut map = OrderedPageMap::new();
        assert!(map.append(key(1), "a"));
        assert!(map.append(key(2), "b"));
        assert!(map.append(key(3), "c"));

        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.first(), Some(&"a"));
        assert_eq!(map.last(), Some(&"c"));
    }

    #[test]
    fn test_prepend_inserts_at_head() {
        let mut map = OrderedPageMap::new();
        map.append(key(1), "a");
        map.prepend(key(0), "z");
        map.prepend(key(-1), "y");

        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!["y", "z", "a"]);
    }

    #[test]
    fn test_recurring_key_overwrites_in_place() {
        let mut map = OrderedPageMap::new();
        map.append(key(1), "a");
        map.append(key(2), "b");
        map.append(key(3), "c");

        assert!(!map.append(key(1), "A"));
        assert!(!map.prepend(key(3), "C"));

        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!["A", "b", "C"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.position(&key(3)), Some(2));
    }

    #[test]
    fn test_insert_by_direction() {
        let mut map = OrderedPageMap::new();
        map.insert(Direction::Forward, key(1), 1);
        map.insert(Direction::Backward, key(0), 0);
        map.insert(Direction::Forward, key(2), 2);

        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(map.get(&key(2)), Some(&2));
        assert_eq!(map.keys().count(), 3);
    }

    #[test]
    fn test_clear() {
        let mut map = OrderedPageMap::new();
        map.append(key(1), ());
        map.clear();
        assert!(map.is_empty());
        assert!(map.first().is_none());
    }
}
