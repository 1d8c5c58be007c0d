//! Engine configuration builder.

use std::sync::Arc;

use backplane_auth::AuthClient;
use backplane_manifest::Manifest;
use backplane_store::{CacheStore, Database, KeyValue, ObjectStore, RecordStore, SessionStore};

use crate::engine::Engine;

/// Builder for an [`Engine`]: the manifest plus optional clients.
///
/// Every client is a trait object behind `Arc`, so deployments mix
/// in-memory and real backends freely.
pub struct EngineConfig {
    pub(crate) manifest: Manifest,
    pub(crate) database: Option<Arc<dyn Database>>,
    pub(crate) kv: Option<Arc<dyn KeyValue>>,
    pub(crate) objects: Option<Arc<dyn ObjectStore>>,
    pub(crate) records: Option<Arc<dyn RecordStore>>,
    pub(crate) auth: Option<Arc<AuthClient>>,
    pub(crate) sessions: Option<Arc<SessionStore>>,
    pub(crate) cache: Option<Arc<CacheStore>>,
}

impl EngineConfig {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            database: None,
            kv: None,
            objects: None,
            records: None,
            auth: None,
            sessions: None,
            cache: None,
        }
    }

    pub fn with_database(mut self, database: Arc<dyn Database>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_kv(mut self, kv: Arc<dyn KeyValue>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn with_objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn with_auth(mut self, auth: Arc<AuthClient>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the engine. Never fails; problems are logged and surface
    /// on use.
    pub fn build(self) -> Engine {
        Engine::from_config(self)
    }
}
