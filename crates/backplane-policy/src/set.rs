//! Compiled per-entity policy sets.

use std::collections::BTreeMap;

use backplane_manifest::EntityPolicies;
use serde::{Deserialize, Serialize};

use crate::expr::{AccessContext, PolicyExpr};

/// The five generated actions an entity policy may govern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityAction {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl EntityAction {
    pub const ALL: [EntityAction; 5] = [
        EntityAction::List,
        EntityAction::Get,
        EntityAction::Create,
        EntityAction::Update,
        EntityAction::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityAction::List => "list",
            EntityAction::Get => "get",
            EntityAction::Create => "create",
            EntityAction::Update => "update",
            EntityAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for EntityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of compiling one declared policy string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPolicy {
    /// Parsed successfully; evaluated per request.
    Expr(PolicyExpr),
    /// Failed to parse; denies everything (fail-closed).
    Invalid { raw: String },
}

impl ActionPolicy {
    pub fn allows(&self, ctx: &AccessContext) -> bool {
        match self {
            ActionPolicy::Expr(expr) => expr.evaluate(ctx),
            ActionPolicy::Invalid { .. } => false,
        }
    }
}

/// Per-entity compiled action → policy map.
///
/// Actions with no declared policy are absent from the map and
/// default-allow, matching the manifest contract.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    rules: BTreeMap<EntityAction, ActionPolicy>,
}

impl PolicySet {
    /// Compile the declared policy strings of one entity.
    ///
    /// Never fails: unparseable expressions compile to a deny-all
    /// [`ActionPolicy::Invalid`] which callers may report.
    pub fn compile(policies: &EntityPolicies) -> Self {
        let declared = [
            (EntityAction::List, policies.list.as_deref()),
            (EntityAction::Get, policies.get.as_deref()),
            (EntityAction::Create, policies.create.as_deref()),
            (EntityAction::Update, policies.update.as_deref()),
            (EntityAction::Delete, policies.delete.as_deref()),
        ];

        let mut rules = BTreeMap::new();
        for (action, raw) in declared {
            let Some(raw) = raw else { continue };
            let policy = match PolicyExpr::parse(raw) {
                Ok(expr) => ActionPolicy::Expr(expr),
                Err(_) => ActionPolicy::Invalid {
                    raw: raw.to_string(),
                },
            };
            rules.insert(action, policy);
        }
        Self { rules }
    }

    /// Whether `action` is allowed for `ctx`. Missing policy allows.
    pub fn allows(&self, action: EntityAction, ctx: &AccessContext) -> bool {
        self.rules.get(&action).is_none_or(|policy| policy.allows(ctx))
    }

    pub fn policy(&self, action: EntityAction) -> Option<&ActionPolicy> {
        self.rules.get(&action)
    }

    /// Declared policies that failed to parse, for load-time warnings.
    pub fn invalid(&self) -> impl Iterator<Item = (EntityAction, &str)> {
        self.rules.iter().filter_map(|(action, policy)| match policy {
            ActionPolicy::Invalid { raw } => Some((*action, raw.as_str())),
            ActionPolicy::Expr(_) => None,
        })
    }
}
