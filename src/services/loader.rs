//! Record extraction from API payloads and saved snapshots
//!
//! List endpoints answer either with a bare array or with an object wrapping
//! it (`{"sessions": [...]}`, `{"data": [...]}`). Records that fail to
//! deserialize are dropped one by one instead of failing the whole list.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{Blog, Category, Cow, HerdbookError, MilkingSession, Result, User};

/// Wrapper keys tried after the record-specific one
const FALLBACK_KEYS: [&str; 3] = ["data", "items", "results"];

/// A record type that list endpoints wrap under a known key
pub trait ListRecord: DeserializeOwned {
    const LIST_KEY: &'static str;
}

impl ListRecord for MilkingSession {
    const LIST_KEY: &'static str = "sessions";
}

impl ListRecord for Cow {
    const LIST_KEY: &'static str = "cattle";
}

impl ListRecord for User {
    const LIST_KEY: &'static str = "users";
}

impl ListRecord for Blog {
    const LIST_KEY: &'static str = "blogs";
}

impl ListRecord for Category {
    const LIST_KEY: &'static str = "categories";
}

fn unwrap_list(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => std::iter::once(key)
            .chain(FALLBACK_KEYS)
            .find_map(|k| match map.remove(k) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Object(inner)) => unwrap_list(Value::Object(inner), key),
                _ => None,
            }),
        _ => None,
    }
}

/// Pull a list of `T` out of a payload, skipping malformed records
pub fn records_from_value<T: ListRecord>(value: Value) -> Result<Vec<T>> {
    let items = unwrap_list(value, T::LIST_KEY).ok_or_else(|| {
        HerdbookError::Parse(format!("expected a list or a '{}' field", T::LIST_KEY))
    })?;

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("skipping malformed {} record: {}", T::LIST_KEY, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        log::warn!(
            "skipped {} of {} {} records",
            total - records.len(),
            total,
            T::LIST_KEY
        );
    }
    Ok(records)
}

/// Parse raw JSON bytes (SIMD accelerated); the buffer is used as scratch space
pub fn records_from_slice<T: ListRecord>(bytes: &mut [u8]) -> Result<Vec<T>> {
    let value: Value = simd_json::serde::from_slice(bytes)
        .map_err(|e| HerdbookError::Parse(format!("invalid JSON: {}", e)))?;
    records_from_value(value)
}

/// Load a saved API response from disk
pub fn load_snapshot<T: ListRecord>(path: &Path) -> Result<Vec<T>> {
    let mut bytes = fs::read(path)?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }
    records_from_slice(&mut bytes)
        .map_err(|e| HerdbookError::Parse(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_bare_array() {
        let value = json!([{"id": 1, "cow_id": 1, "volume": "2.5"}]);
        let sessions: Vec<MilkingSession> = records_from_value(value).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].volume, 2.5);
    }

    #[test]
    fn test_wrapped_by_record_key() {
        let value = json!({"sessions": [{"id": 1}, {"id": 2}]});
        let sessions: Vec<MilkingSession> = records_from_value(value).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_wrapped_by_data_key_nested() {
        let value = json!({"data": {"cattle": [{"id": 4, "name": "Rosa"}]}});
        let cows: Vec<Cow> = records_from_value(value).unwrap();
        assert_eq!(cows[0].name, "Rosa");
    }

    #[test]
    fn test_malformed_records_skipped() {
        let value = json!({"sessions": [{"id": 1}, 42, "junk", {"id": 2}]});
        let sessions: Vec<MilkingSession> = records_from_value(value).unwrap();
        let ids: Vec<u64> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_null_names_keep_the_record() {
        let value = json!({"cattle": [{"id": 1, "name": null}, {"id": 2, "name": "Rosa"}]});
        let cows: Vec<Cow> = records_from_value(value).unwrap();
        assert_eq!(cows.len(), 2);
        assert_eq!(cows[0].name, "");

        let value = json!([{"id": 3, "title": null, "content": null}]);
        let blogs: Vec<Blog> = records_from_value(value).unwrap();
        assert_eq!(blogs.len(), 1);
        assert!(blogs[0].title.is_empty());

        let value = json!({"users": [{"id": 4, "role_id": 3, "name": null, "username": null}]});
        let users: Vec<User> = records_from_value(value).unwrap();
        assert_eq!(users[0].id, 4);
    }

    #[test]
    fn test_not_a_list_is_error() {
        let result: Result<Vec<Blog>> = records_from_value(json!({"message": "ok"}));
        assert!(matches!(result, Err(HerdbookError::Parse(_))));
    }

    #[test]
    fn test_records_from_slice() {
        let mut bytes = br#"{"categories": [{"id": 1, "name": "Feed"}]}"#.to_vec();
        let cats: Vec<Category> = records_from_slice(&mut bytes).unwrap();
        assert_eq!(cats[0].name, "Feed");
    }

    #[test]
    fn test_load_snapshot_empty_and_missing() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty.json");
        fs::write(&empty, "  \n").unwrap();
        let sessions: Vec<MilkingSession> = load_snapshot(&empty).unwrap();
        assert!(sessions.is_empty());

        let missing: Result<Vec<MilkingSession>> = load_snapshot(&tmp.path().join("none.json"));
        assert!(matches!(missing, Err(HerdbookError::Io(_))));
    }

    #[test]
    fn test_load_snapshot_bad_json_names_file() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.json");
        fs::write(&bad, "{oops").unwrap();
        let err = load_snapshot::<MilkingSession>(&bad).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
