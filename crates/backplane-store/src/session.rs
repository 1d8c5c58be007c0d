//! Session envelopes over the key-value store.

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::hex;
use crate::kv::{KeyValue, MIN_TTL_SECONDS};

/// Stored session envelope. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl Session {
    fn ttl_seconds(&self, now_ms: i64) -> u64 {
        let remaining = (self.expires_at - now_ms) / 1000;
        (remaining.max(0) as u64).max(MIN_TTL_SECONDS)
    }

    fn expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Sessions stored under `session:<id>` with TTL derived from the
/// envelope's own expiry. Expired envelopes are removed lazily on read.
pub struct SessionStore {
    kv: Arc<dyn KeyValue>,
}

fn session_key(id: &str) -> String {
    format!("session:{id}")
}

fn random_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex(&bytes)
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    /// Create a session lasting `ttl_seconds`, returning its id.
    pub fn create(
        &self,
        user_id: &str,
        ttl_seconds: u64,
        metadata: Value,
    ) -> Result<(String, Session), StoreError> {
        let id = random_id();
        let now = Utc::now().timestamp_millis();
        let session = Session {
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + (ttl_seconds as i64) * 1000,
            metadata,
        };
        self.write(&id, &session)?;
        Ok((id, session))
    }

    pub fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let Some(raw) = self.kv.get(&session_key(id))? else {
            return Ok(None);
        };
        let session: Session = serde_json::from_str(&raw)?;
        if session.expired(Utc::now().timestamp_millis()) {
            self.kv.delete(&session_key(id))?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Replace the metadata of a live session.
    pub fn update(&self, id: &str, metadata: Value) -> Result<Option<Session>, StoreError> {
        let Some(mut session) = self.get(id)? else {
            return Ok(None);
        };
        session.metadata = metadata;
        self.write(id, &session)?;
        Ok(Some(session))
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.kv.delete(&session_key(id))
    }

    /// Move a session to a fresh id, invalidating the old one.
    pub fn rotate(&self, id: &str) -> Result<Option<(String, Session)>, StoreError> {
        let Some(session) = self.get(id)? else {
            return Ok(None);
        };
        let new_id = random_id();
        self.write(&new_id, &session)?;
        self.kv.delete(&session_key(id))?;
        Ok(Some((new_id, session)))
    }

    /// Push the expiry forward by `ttl_seconds` from now.
    pub fn extend(&self, id: &str, ttl_seconds: u64) -> Result<Option<Session>, StoreError> {
        let Some(mut session) = self.get(id)? else {
            return Ok(None);
        };
        session.expires_at = Utc::now().timestamp_millis() + (ttl_seconds as i64) * 1000;
        self.write(id, &session)?;
        Ok(Some(session))
    }

    fn write(&self, id: &str, session: &Session) -> Result<(), StoreError> {
        let ttl = session.ttl_seconds(Utc::now().timestamp_millis());
        self.kv.put(
            &session_key(id),
            &serde_json::to_string(session)?,
            Some(ttl),
        )
    }
}
