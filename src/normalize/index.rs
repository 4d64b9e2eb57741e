use std::collections::HashMap;
use std::hash::Hash;

/// Insertion-ordered map keyed by a natural id.
///
/// Values are stored in first-seen order; a key is inserted at most once, so
/// find-or-create keeps both uniqueness and discovery order.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
    positions: HashMap<K, usize>,
    values: Vec<V>,
}

impl<K: Eq + Hash, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<K: Eq + Hash, V> OrderedIndex<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, creating it with `make` on first sight.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let idx = match self.positions.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.values.len();
                self.values.push(make());
                self.positions.insert(key, idx);
                idx
            }
        };
        &mut self.values[idx]
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.positions.get(key).map(|&idx| &self.values[idx])
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.positions.get(key).map(|&idx| &mut self.values[idx])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.values.iter_mut()
    }

    pub fn into_values(self) -> Vec<V> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut idx: OrderedIndex<&str, Vec<i32>> = OrderedIndex::new();
        idx.get_or_insert_with("b", Vec::new).push(1);
        idx.get_or_insert_with("a", Vec::new).push(2);
        idx.get_or_insert_with("b", Vec::new).push(3);

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.into_values(), vec![vec![1, 3], vec![2]]);
    }

    #[test]
    fn test_make_runs_once_per_key() {
        let mut idx: OrderedIndex<String, i64> = OrderedIndex::new();
        let mut calls = 0;
        for name in ["x", "y", "x", "x"] {
            let next = idx.len() as i64 + 1;
            idx.get_or_insert_with(name.to_string(), || {
                calls += 1;
                next
            });
        }
        assert_eq!(calls, 2);
        assert_eq!(idx.get(&"x".to_string()), Some(&1));
        assert_eq!(idx.get(&"y".to_string()), Some(&2));
        assert!(!idx.contains_key(&"z".to_string()));
    }

    #[test]
    fn test_get_mut() {
        let mut idx: OrderedIndex<i64, String> = OrderedIndex::new();
        assert!(idx.is_empty());
        idx.get_or_insert_with(5, || "five".to_string());
        if let Some(v) = idx.get_mut(&5) {
            v.push('!');
        }
        assert_eq!(idx.iter().collect::<Vec<_>>(), vec!["five!"]);
    }
}
