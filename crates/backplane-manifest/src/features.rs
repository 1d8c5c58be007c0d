//! Feature flags: a small nested toggle tree with dotted-path lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Simple on/off toggle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureToggle {
    #[serde(default)]
    pub enabled: bool,
}

/// Auth toggle with its provider list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthFeature {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
}

/// The manifest's feature-flag tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durable_objects: Option<FeatureToggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime: Option<FeatureToggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<FeatureToggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<FeatureToggle>,
}

impl FeatureFlags {
    /// Dotted-path lookup into the flag tree, fail-closed.
    ///
    /// Any missing segment yields `false`. A path landing on a toggle
    /// object reads its `enabled` flag; a path landing on a boolean
    /// leaf (`auth.enabled`) reads the boolean itself.
    pub fn is_enabled(&self, path: &str) -> bool {
        let mut current = serde_json::to_value(self).unwrap_or(Value::Null);
        for segment in path.split('.') {
            match current {
                Value::Object(ref map) => match map.get(segment) {
                    Some(next) => current = next.clone(),
                    None => return false,
                },
                _ => return false,
            }
        }
        match current {
            Value::Object(map) => map.get("enabled") == Some(&Value::Bool(true)),
            Value::Bool(flag) => flag,
            _ => false,
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth.as_ref().is_some_and(|f| f.enabled)
    }

    pub fn durable_objects_enabled(&self) -> bool {
        self.durable_objects.is_some_and(|f| f.enabled)
    }

    pub fn realtime_enabled(&self) -> bool {
        self.realtime.is_some_and(|f| f.enabled)
    }

    pub fn storage_enabled(&self) -> bool {
        self.storage.is_some_and(|f| f.enabled)
    }

    pub fn cron_enabled(&self) -> bool {
        self.cron.is_some_and(|f| f.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> FeatureFlags {
        FeatureFlags {
            auth: Some(AuthFeature {
                enabled: true,
                providers: vec!["phone_password".to_string()],
            }),
            storage: Some(FeatureToggle { enabled: false }),
            ..FeatureFlags::default()
        }
    }

    #[test]
    fn toggle_object_reads_enabled() {
        assert!(flags().is_enabled("auth"));
        assert!(!flags().is_enabled("storage"));
    }

    #[test]
    fn boolean_leaf_reads_itself() {
        assert!(flags().is_enabled("auth.enabled"));
        assert!(!flags().is_enabled("storage.enabled"));
    }

    #[test]
    fn missing_segment_fails_closed() {
        assert!(!flags().is_enabled("realtime"));
        assert!(!flags().is_enabled("auth.nope.deeper"));
        assert!(!flags().is_enabled(""));
    }
}
