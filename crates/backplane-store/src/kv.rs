//! Key-value storage with TTL.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;

/// TTLs below this are raised to it at put time.
pub const MIN_TTL_SECONDS: u64 = 60;

/// One page of keys from a prefix listing.
#[derive(Debug, Clone)]
pub struct KvPage {
    pub keys: Vec<String>,
    /// Opaque continuation token; pass back to resume.
    pub cursor: Option<String>,
    pub complete: bool,
}

/// String key-value store. TTL is whole seconds with a 60 second
/// floor; `None` means no expiry.
pub trait KeyValue: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<KvPage, StoreError>;
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`KeyValue`] with lazy expiry.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        let expires_at = ttl_seconds.map(|ttl| {
            let ttl = ttl.max(MIN_TTL_SECONDS);
            Utc::now() + Duration::seconds(ttl as i64)
        });
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<KvPage, StoreError> {
        let now = Utc::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| {
                key.starts_with(prefix)
                    && !entry.expired(now)
                    && cursor.is_none_or(|c| key.as_str() > c)
            })
            .map(|(key, _)| key.clone())
            .take(limit + 1)
            .collect();

        let complete = keys.len() <= limit;
        let mut keys = keys;
        keys.truncate(limit);
        let cursor = if complete { None } else { keys.last().cloned() };

        Ok(KvPage {
            keys,
            cursor,
            complete,
        })
    }
}
