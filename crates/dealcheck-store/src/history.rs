use chrono::Utc;
use dealcheck_core::AnalyzeResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::kv::KeyValue;

const HISTORY_KEY: &str = "history";

/// A saved analysis plus the identity it is deleted and recalled by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: String,
    pub timestamp: i64,
    pub result: AnalyzeResult,
}

impl StoredResult {
    /// Stamps `result` with the current time and a fresh id.
    pub fn new(result: AnalyzeResult) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: format!("{now}-{:x}", rand::random::<u64>()),
            timestamp: now,
            result,
        }
    }
}

/// The shape history entries were written in before ids existed.
/// Still accepted on read so old saves keep showing up.
#[derive(Deserialize)]
struct LegacyEntry {
    at: i64,
    payload: serde_json::Map<String, Value>,
}

/// Persisted list of saved analyses, most recent first.
///
/// Reads never fail on bad data: a list that does not decode reads as
/// empty, and an element that matches neither the current nor the
/// legacy shape is skipped. Writes always replace the whole list.
pub struct HistoryStore<K: KeyValue> {
    kv: K,
}

impl<K: KeyValue> HistoryStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    #[instrument(skip(self))]
    pub fn load_all(&self) -> Result<Vec<StoredResult>, StoreError> {
        let Some(raw) = self.kv.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "stored history did not decode, treating as empty");
                return Ok(Vec::new());
            }
        };
        let Value::Array(elements) = value else {
            debug!("stored history is not a list, treating as empty");
            return Ok(Vec::new());
        };
        Ok(elements.into_iter().filter_map(normalize_entry).collect())
    }

    #[instrument(skip(self, entry), fields(id = %entry.id))]
    pub fn save(&self, entry: StoredResult) -> Result<(), StoreError> {
        let mut entries = self.load_all()?;
        entries.insert(0, entry);
        let json = serde_json::to_string(&entries)?;
        self.kv.set(HISTORY_KEY, &json)
    }

    #[instrument(skip(self))]
    pub fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.load_all()?;
        entries.retain(|entry| entry.id != id);
        let json = serde_json::to_string(&entries)?;
        self.kv.set(HISTORY_KEY, &json)
    }

    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.remove(HISTORY_KEY)
    }
}

/// Accepts the current shape as-is, upgrades the legacy shape, and
/// drops anything else.
fn normalize_entry(value: Value) -> Option<StoredResult> {
    if let Ok(entry) = serde_json::from_value::<StoredResult>(value.clone()) {
        return Some(entry);
    }
    let LegacyEntry { at, mut payload } = serde_json::from_value(value).ok()?;
    if !matches!(payload.get("items"), Some(Value::Array(_))) {
        payload.insert("items".to_string(), Value::Array(Vec::new()));
    }
    let result = serde_json::from_value(Value::Object(payload)).ok()?;
    Some(StoredResult {
        id: at.to_string(),
        timestamp: at,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::kv::{MemoryKv, SqliteKv};
    use serde_json::json;

    fn entry(id: &str, timestamp: i64) -> StoredResult {
        StoredResult {
            id: id.to_string(),
            timestamp,
            result: AnalyzeResult {
                purchase_date: Some("2024-04-01".to_string()),
                ..Default::default()
            },
        }
    }

    fn ids(entries: &[StoredResult]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_store_loads_empty_list() {
        let store = HistoryStore::new(MemoryKv::new());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn save_prepends_most_recent_first() {
        let store = HistoryStore::new(MemoryKv::new());
        store.save(entry("a", 1)).unwrap();
        store.save(entry("b", 2)).unwrap();
        store.save(entry("c", 3)).unwrap();
        assert_eq!(ids(&store.load_all().unwrap()), ["c", "b", "a"]);
    }

    #[test]
    fn save_keeps_duplicate_payloads() {
        let store = HistoryStore::new(MemoryKv::new());
        store.save(entry("a", 1)).unwrap();
        store.save(entry("b", 1)).unwrap();
        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].result, entries[1].result);
    }

    #[test]
    fn delete_removes_only_the_named_entry() {
        let store = HistoryStore::new(MemoryKv::new());
        store.save(entry("a", 1)).unwrap();
        store.save(entry("b", 2)).unwrap();
        store.save(entry("c", 3)).unwrap();
        store.delete_by_id("b").unwrap();
        assert_eq!(ids(&store.load_all().unwrap()), ["c", "a"]);
    }

    #[test]
    fn delete_with_unknown_id_changes_nothing() {
        let store = HistoryStore::new(MemoryKv::new());
        store.save(entry("a", 1)).unwrap();
        store.delete_by_id("zzz").unwrap();
        assert_eq!(ids(&store.load_all().unwrap()), ["a"]);
    }

    #[test]
    fn clear_empties_history() {
        let store = HistoryStore::new(MemoryKv::new());
        store.save(entry("a", 1)).unwrap();
        store.save(entry("b", 2)).unwrap();
        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
        // Clearing an already empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn legacy_entry_is_upgraded_on_read() {
        let kv = MemoryKv::new();
        kv.set(
            "history",
            r#"[{"at":1700000000000,"payload":{"purchase_date":"2024-04-01"}}]"#,
        )
        .unwrap();
        let store = HistoryStore::new(kv);

        let entries = store.load_all().unwrap();
        assert_eq!(
            entries,
            vec![StoredResult {
                id: "1700000000000".to_string(),
                timestamp: 1_700_000_000_000,
                result: AnalyzeResult {
                    purchase_date: Some("2024-04-01".to_string()),
                    summary: None,
                    items: Vec::new(),
                    debug: None,
                },
            }]
        );
    }

    #[test]
    fn legacy_items_that_are_not_a_list_read_as_empty() {
        let kv = MemoryKv::new();
        kv.set("history", r#"[{"at":5,"payload":{"items":42}}]"#)
            .unwrap();
        let store = HistoryStore::new(kv);

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "5");
        assert!(entries[0].result.items.is_empty());
    }

    #[test]
    fn legacy_item_records_survive_the_upgrade() {
        let kv = MemoryKv::new();
        let raw = json!([{
            "at": 7,
            "payload": {
                "purchase_date": "2023-12-01",
                "items": [{"raw_name": "Milk 1L", "paid_unit_price": 198.0}]
            }
        }]);
        kv.set("history", &raw.to_string()).unwrap();
        let store = HistoryStore::new(kv);

        let entries = store.load_all().unwrap();
        assert_eq!(entries[0].result.items.len(), 1);
        assert_eq!(entries[0].result.items[0].raw_name, "Milk 1L");
    }

    #[test]
    fn garbage_value_reads_as_empty() {
        let kv = MemoryKv::new();
        kv.set("history", "not json{{").unwrap();
        let store = HistoryStore::new(kv);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn non_list_value_reads_as_empty() {
        for raw in [r#"{"0":{"id":"a"}}"#, "\"text\"", "42"] {
            let kv = MemoryKv::new();
            kv.set("history", raw).unwrap();
            let store = HistoryStore::new(kv);
            assert!(store.load_all().unwrap().is_empty(), "payload: {raw}");
        }
    }

    #[test]
    fn unrecognized_elements_are_dropped() {
        let kv = MemoryKv::new();
        let raw = json!([
            {"id": "a", "timestamp": 1, "result": {"items": []}},
            {"foo": "bar"},
            {"at": 2, "payload": {}},
            null,
            [1, 2],
        ]);
        kv.set("history", &raw.to_string()).unwrap();
        let store = HistoryStore::new(kv);
        assert_eq!(ids(&store.load_all().unwrap()), ["a", "2"]);
    }

    #[test]
    fn fractional_timestamps_are_dropped() {
        let kv = MemoryKv::new();
        let raw = json!([
            {"id": "a", "timestamp": 1.5, "result": {"items": []}},
            {"at": 2.5, "payload": {}},
        ]);
        kv.set("history", &raw.to_string()).unwrap();
        let store = HistoryStore::new(kv);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn null_result_entries_are_dropped() {
        let kv = MemoryKv::new();
        kv.set("history", r#"[{"id":"a","timestamp":1,"result":null}]"#)
            .unwrap();
        let store = HistoryStore::new(kv);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn save_over_garbage_starts_a_fresh_list() {
        let kv = MemoryKv::new();
        kv.set("history", "{{{").unwrap();
        let store = HistoryStore::new(kv);
        store.save(entry("a", 1)).unwrap();
        assert_eq!(ids(&store.load_all().unwrap()), ["a"]);
    }

    #[test]
    fn generated_ids_embed_the_timestamp_and_differ() {
        let first = StoredResult::new(AnalyzeResult::default());
        let second = StoredResult::new(AnalyzeResult::default());

        let prefix = first.id.split('-').next().unwrap();
        assert_eq!(prefix.parse::<i64>().unwrap(), first.timestamp);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn history_persists_across_store_instances_on_sqlite() {
        let db = Database::in_memory().unwrap();
        let store = HistoryStore::new(SqliteKv::new(db.clone()));
        store.save(entry("a", 1)).unwrap();

        let reopened = HistoryStore::new(SqliteKv::new(db));
        assert_eq!(ids(&reopened.load_all().unwrap()), ["a"]);
    }

    struct FailingKv;

    impl KeyValue for FailingKv {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Database("disk unplugged".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Database("disk unplugged".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Database("disk unplugged".to_string()))
        }
    }

    #[test]
    fn storage_failures_propagate() {
        let store = HistoryStore::new(FailingKv);
        assert!(store.load_all().is_err());
        assert!(store.save(entry("a", 1)).is_err());
        assert!(store.delete_by_id("a").is_err());
        assert!(store.clear().is_err());
    }
}
