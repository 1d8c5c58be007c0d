//! The engine proper.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use backplane_auth::AuthClient;
use backplane_manifest::{EntityDefinition, FeatureFlags, Manifest};
use backplane_policy::{AccessContext, PolicySet};
use backplane_store::{CacheStore, Database, KeyValue, ObjectStore, RecordStore, SessionStore};
use backplane_validate::EntityValidator;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::evaluator::PolicyEvaluator;
use crate::plugin::{Plugin, PluginError};

/// Everything precompiled for one entity.
pub struct EntityRuntime {
    pub definition: EntityDefinition,
    pub validator: EntityValidator,
    pub policies: PolicySet,
}

/// An authenticated caller, as extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Option<String>,
}

impl Identity {
    /// Access context for a policy check; ownership is decided per
    /// record by the caller.
    pub fn access_context(&self, is_owner: bool) -> AccessContext {
        let mut ctx = AccessContext::user(&self.user_id).owning(is_owner);
        if let Some(role) = &self.role {
            ctx = ctx.with_role(role);
        }
        ctx
    }
}

/// Immutable application runtime shared across requests.
pub struct Engine {
    manifest: Arc<Manifest>,
    entities: BTreeMap<String, EntityRuntime>,
    database: Option<Arc<dyn Database>>,
    kv: Option<Arc<dyn KeyValue>>,
    objects: Option<Arc<dyn ObjectStore>>,
    records: Option<Arc<dyn RecordStore>>,
    auth: Option<Arc<AuthClient>>,
    sessions: Option<Arc<SessionStore>>,
    cache: Option<Arc<CacheStore>>,
    plugins: RwLock<BTreeMap<String, Arc<dyn Plugin>>>,
}

impl Engine {
    pub(crate) fn from_config(config: EngineConfig) -> Self {
        let mut entities = BTreeMap::new();
        for definition in &config.manifest.entities {
            let policies = PolicySet::compile(&definition.policies);
            for (action, raw) in policies.invalid() {
                warn!(
                    entity = %definition.name,
                    %action,
                    policy = raw,
                    "policy failed to parse; action denied"
                );
            }
            entities.insert(
                definition.name.clone(),
                EntityRuntime {
                    validator: EntityValidator::new(definition),
                    policies,
                    definition: definition.clone(),
                },
            );
        }

        info!(
            app = config.manifest.app_name(),
            entities = entities.len(),
            "engine ready"
        );

        Self {
            manifest: Arc::new(config.manifest),
            entities,
            database: config.database,
            kv: config.kv,
            objects: config.objects,
            records: config.records,
            auth: config.auth,
            sessions: config.sessions,
            cache: config.cache,
            plugins: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn entity(&self, name: &str) -> Option<&EntityRuntime> {
        self.entities.get(name)
    }

    /// Resolve an entity by its backing table name, as used in URLs.
    pub fn entity_by_table(&self, table: &str) -> Option<&EntityRuntime> {
        self.entities
            .values()
            .find(|runtime| runtime.definition.table() == table)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityRuntime> {
        self.entities.values()
    }

    pub fn policy_evaluator(&self) -> PolicyEvaluator<'_> {
        PolicyEvaluator::new(&self.entities)
    }

    pub fn features(&self) -> &FeatureFlags {
        &self.manifest.features
    }

    /// Dotted-path feature lookup; missing segments read as disabled.
    pub fn feature_enabled(&self, path: &str) -> bool {
        self.manifest.features.is_enabled(path)
    }

    /// Verify a token and extract the caller's identity. Any
    /// verification failure reads as anonymous (`None`).
    pub fn authenticate(&self, token: &str) -> Option<Identity> {
        let auth = self.auth.as_ref()?;
        let claims = auth.signer().verify(token).ok()?;
        Some(Identity {
            user_id: claims.sub.clone(),
            role: claims.extra_str("role").map(str::to_string),
        })
    }

    pub fn database(&self) -> Option<&Arc<dyn Database>> {
        self.database.as_ref()
    }

    pub fn kv(&self) -> Option<&Arc<dyn KeyValue>> {
        self.kv.as_ref()
    }

    pub fn objects(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.objects.as_ref()
    }

    pub fn records(&self) -> Option<&Arc<dyn RecordStore>> {
        self.records.as_ref()
    }

    pub fn auth(&self) -> Option<&Arc<AuthClient>> {
        self.auth.as_ref()
    }

    pub fn sessions(&self) -> Option<&Arc<SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn cache(&self) -> Option<&Arc<CacheStore>> {
        self.cache.as_ref()
    }

    /// Register a plugin and run its initialization synchronously.
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        plugin.initialize(self)?;
        let name = plugin.name().to_string();
        info!(plugin = %name, "plugin registered");
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        plugins.insert(name, plugin);
        Ok(())
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        plugins.get(name).cloned()
    }

    pub fn plugins(&self) -> Vec<String> {
        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        plugins.keys().cloned().collect()
    }
}
