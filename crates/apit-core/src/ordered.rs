use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A string-keyed map that remembers insertion order.
///
/// Re-inserting an existing key replaces the value in place, so the key keeps
/// its original position. JSON objects are read in document order and written
/// back in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMap<V>(IndexMap<String, V>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.0.get_mut(key)
    }

    /// Insert or replace. Returns the previous value, if any.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.0.insert(key.into(), value)
    }

    /// Remove a key, shifting later entries down so order is preserved.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        self.0.shift_remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn keys_iter(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, V> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, V> {
        self.0.iter_mut()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, V> {
        self.0.values()
    }

    pub fn values_mut(&mut self) -> indexmap::map::ValuesMut<'_, String, V> {
        self.0.values_mut()
    }

    pub fn first(&self) -> Option<(&String, &V)> {
        self.0.first()
    }

    /// Entry API, used when building nested trait objects.
    pub fn entry(&mut self, key: impl Into<String>) -> indexmap::map::Entry<'_, String, V> {
        self.0.entry(key.into())
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = indexmap::map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = indexmap::map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<V> Extend<(String, V)> for OrderedMap<V> {
    fn extend<I: IntoIterator<Item = (String, V)>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_replaces_in_place() {
        let mut m = OrderedMap::new();
        m.put("b", 1);
        m.put("a", 2);
        m.put("b", 3);
        assert_eq!(m.keys(), vec!["b", "a"]);
        assert_eq!(m.get("b"), Some(&3));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_delete_keeps_order() {
        let mut m: OrderedMap<i32> = [("x", 1), ("y", 2), ("z", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(m.delete("y"), Some(2));
        assert!(!m.has("y"));
        assert_eq!(m.keys(), vec!["x", "z"]);
    }

    #[test]
    fn test_json_preserves_document_order() {
        let json = r#"{"zeta":1,"alpha":2,"mid":3}"#;
        let m: OrderedMap<i64> = serde_json::from_str(json).unwrap();
        assert_eq!(m.keys(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&m).unwrap(), json);
    }
}
