//! Role-table RBAC: roles own rule lists over (resource, action).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expr::{AccessContext, PolicyExpr};
use crate::set::ActionPolicy;

/// One declared rule: a resource/action pair with an optional
/// condition expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacRule {
    pub resource: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A role with its rules, as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacPolicy {
    pub role: String,
    pub rules: Vec<RbacRule>,
}

struct CompiledRule {
    resource: String,
    action: String,
    condition: Option<ActionPolicy>,
}

/// Role → rules table with compiled conditions.
///
/// Missing role, missing rule, and unparseable conditions all deny.
/// A rule with no condition allows unconditionally.
#[derive(Default)]
pub struct RbacValidator {
    policies: BTreeMap<String, Vec<CompiledRule>>,
}

impl RbacValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validator from declared policies.
    pub fn from_policies(policies: impl IntoIterator<Item = RbacPolicy>) -> Self {
        let mut validator = Self::new();
        for policy in policies {
            validator.add_policy(policy);
        }
        validator
    }

    /// Register (or replace) a role's rules, compiling conditions.
    pub fn add_policy(&mut self, policy: RbacPolicy) {
        let rules = policy
            .rules
            .into_iter()
            .map(|rule| CompiledRule {
                resource: rule.resource,
                action: rule.action,
                condition: rule.condition.map(|raw| match PolicyExpr::parse(&raw) {
                    Ok(expr) => ActionPolicy::Expr(expr),
                    Err(_) => ActionPolicy::Invalid { raw },
                }),
            })
            .collect();
        self.policies.insert(policy.role, rules);
    }

    /// Whether `role` may perform `action` on `resource` under `ctx`.
    pub fn has_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
        ctx: &AccessContext,
    ) -> bool {
        let Some(rules) = self.policies.get(role) else {
            return false;
        };
        let Some(rule) = rules
            .iter()
            .find(|r| r.resource == resource && r.action == action)
        else {
            return false;
        };
        match &rule.condition {
            None => true,
            Some(condition) => condition.allows(ctx),
        }
    }
}
