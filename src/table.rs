use indexmap::IndexMap;
use serde::Serialize;

/// Insertion-ordered localization-ID → source-text mapping for one run.
///
/// Populated by the allocator and handed to a downstream exporter once the
/// run completes. Re-inserting an existing ID overwrites its text without
/// moving the entry, so export order always matches classification order.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct StringTable {
    entries: IndexMap<String, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id -> text`. Last write wins for a repeated ID.
    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) -> Option<String> {
        self.entries.insert(id.into(), text.into())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut table = StringTable::new();
        table.insert("b_1", "second");
        table.insert("a_1", "first");
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b_1", "a_1"]);
    }

    #[test]
    fn test_last_write_wins_without_moving() {
        let mut table = StringTable::new();
        table.insert("x_1", "old");
        table.insert("y_1", "other");
        let old = table.insert("x_1", "new");
        assert_eq!(old.as_deref(), Some("old"));
        assert_eq!(table.get("x_1"), Some("new"));
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["x_1", "y_1"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut table = StringTable::new();
        table.insert("main_AB12", "Hello");
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"main_AB12":"Hello"}"#);
    }
}
