//! Tag-aware cache over the key-value store.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::kv::KeyValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope {
    data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    cached_at: i64,
}

/// Cached values stored under `cache:<key>` with optional tags for
/// group invalidation.
///
/// Invalidation walks the keyspace in sequential pages and deletes one
/// entry at a time; a mid-walk failure leaves earlier deletions in
/// place.
pub struct CacheStore {
    kv: Arc<dyn KeyValue>,
}

const PAGE_SIZE: usize = 100;

fn cache_key(key: &str) -> String {
    format!("cache:{key}")
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(raw) = self.kv.get(&cache_key(key))? else {
            return Ok(None);
        };
        let envelope: CacheEnvelope = serde_json::from_str(&raw)?;
        Ok(Some(envelope.data))
    }

    pub fn set(
        &self,
        key: &str,
        data: Value,
        tags: Vec<String>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        let envelope = CacheEnvelope {
            data,
            tags,
            cached_at: Utc::now().timestamp_millis(),
        };
        self.kv.put(
            &cache_key(key),
            &serde_json::to_string(&envelope)?,
            ttl_seconds,
        )
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.kv.delete(&cache_key(key))
    }

    /// Delete every entry carrying `tag`; returns the count deleted.
    pub fn invalidate_by_tag(&self, tag: &str) -> Result<u64, StoreError> {
        self.sweep(|raw| {
            serde_json::from_str::<CacheEnvelope>(raw)
                .map(|envelope| envelope.tags.iter().any(|t| t == tag))
                .unwrap_or(false)
        })
    }

    /// Delete every entry whose key starts with `prefix`.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let full_prefix = cache_key(prefix);
        let mut deleted = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = self.kv.list(&full_prefix, PAGE_SIZE, cursor.as_deref())?;
            for key in &page.keys {
                self.kv.delete(key)?;
                deleted += 1;
            }
            if page.complete {
                return Ok(deleted);
            }
            cursor = page.cursor;
        }
    }

    fn sweep(&self, matches: impl Fn(&str) -> bool) -> Result<u64, StoreError> {
        let mut deleted = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = self.kv.list("cache:", PAGE_SIZE, cursor.as_deref())?;
            for key in &page.keys {
                if let Some(raw) = self.kv.get(key)?
                    && matches(&raw)
                {
                    self.kv.delete(key)?;
                    deleted += 1;
                }
            }
            if page.complete {
                return Ok(deleted);
            }
            cursor = page.cursor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use serde_json::json;

    fn cache() -> CacheStore {
        CacheStore::new(Arc::new(MemoryKv::new()))
    }

    #[test]
    fn set_and_get_unwraps_the_envelope() {
        let cache = cache();
        cache
            .set("product:a", json!({"name": "Pen"}), vec![], None)
            .unwrap();
        assert_eq!(cache.get("product:a").unwrap(), Some(json!({"name": "Pen"})));
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn tag_invalidation_only_hits_tagged_entries() {
        let cache = cache();
        cache
            .set("a", json!(1), vec!["products".to_string()], None)
            .unwrap();
        cache
            .set("b", json!(2), vec!["products".to_string()], None)
            .unwrap();
        cache.set("c", json!(3), vec!["users".to_string()], None).unwrap();

        assert_eq!(cache.invalidate_by_tag("products").unwrap(), 2);
        assert!(cache.get("a").unwrap().is_none());
        assert!(cache.get("b").unwrap().is_none());
        assert_eq!(cache.get("c").unwrap(), Some(json!(3)));
    }

    #[test]
    fn prefix_invalidation() {
        let cache = cache();
        cache.set("product:a", json!(1), vec![], None).unwrap();
        cache.set("product:b", json!(2), vec![], None).unwrap();
        cache.set("user:a", json!(3), vec![], None).unwrap();

        assert_eq!(cache.invalidate_by_prefix("product:").unwrap(), 2);
        assert_eq!(cache.get("user:a").unwrap(), Some(json!(3)));
    }
}
