//! Policy evaluation over precompiled entity runtimes.

use std::collections::BTreeMap;

use backplane_policy::{AccessContext, EntityAction};

use crate::engine::EntityRuntime;

/// Read-only view over the engine's compiled policy sets.
///
/// Unknown entities deny; entities with no declared policy for an
/// action allow.
pub struct PolicyEvaluator<'a> {
    entities: &'a BTreeMap<String, EntityRuntime>,
}

impl<'a> PolicyEvaluator<'a> {
    pub(crate) fn new(entities: &'a BTreeMap<String, EntityRuntime>) -> Self {
        Self { entities }
    }

    pub fn allows(&self, entity: &str, action: EntityAction, ctx: &AccessContext) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|runtime| runtime.policies.allows(action, ctx))
    }

    pub fn can_list(&self, entity: &str, ctx: &AccessContext) -> bool {
        self.allows(entity, EntityAction::List, ctx)
    }

    pub fn can_get(&self, entity: &str, ctx: &AccessContext) -> bool {
        self.allows(entity, EntityAction::Get, ctx)
    }

    pub fn can_create(&self, entity: &str, ctx: &AccessContext) -> bool {
        self.allows(entity, EntityAction::Create, ctx)
    }

    pub fn can_update(&self, entity: &str, ctx: &AccessContext) -> bool {
        self.allows(entity, EntityAction::Update, ctx)
    }

    pub fn can_delete(&self, entity: &str, ctx: &AccessContext) -> bool {
        self.allows(entity, EntityAction::Delete, ctx)
    }
}
