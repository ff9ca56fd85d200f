//! Shared context threaded across a plan's tasks.
//!
//! The context is the only cross-task communication channel. It is modeled as
//! an immutable-per-step snapshot: completing a task produces a *new* snapshot
//! with the task's output merged on top, so a capability can never alias the
//! map another step is reading. Keys are never removed during a run.

use serde_json::{Map, Value};

/// Accumulating key-value snapshot for one orchestration run.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    values: Map<String, Value>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an initial snapshot from seed entries.
    pub fn seeded(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Produce a new snapshot with the entries of `update` layered on top.
    ///
    /// Non-object updates leave the snapshot unchanged.
    pub fn merged(&self, update: &Value) -> SharedContext {
        let mut values = self.values.clone();
        if let Value::Object(map) = update {
            for (key, value) in map {
                values.insert(key.clone(), value.clone());
            }
        }
        Self { values }
    }

    /// Accumulated keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// The snapshot as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_produces_new_snapshot() {
        let first = SharedContext::seeded([("locator".to_string(), json!("abc"))]);
        let second = first.merged(&json!({"resource_id": "XYZ123"}));

        assert_eq!(second.get_str("locator"), Some("abc"));
        assert_eq!(second.get_str("resource_id"), Some("XYZ123"));
        // Earlier snapshot is untouched
        assert!(first.get("resource_id").is_none());
    }

    #[test]
    fn test_later_write_wins() {
        let ctx = SharedContext::seeded([("count".to_string(), json!(1))]);
        let ctx = ctx.merged(&json!({"count": 2}));
        assert_eq!(ctx.get("count"), Some(&json!(2)));
    }

    #[test]
    fn test_non_object_update_is_ignored() {
        let ctx = SharedContext::seeded([("a".to_string(), json!(1))]);
        let merged = ctx.merged(&json!("not an object"));
        assert_eq!(merged.keys(), vec!["a".to_string()]);
    }
}
