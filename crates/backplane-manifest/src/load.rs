//! Manifest loading from JSON and TOML sources.

use std::path::Path;

use crate::entity::Manifest;

/// Errors raised while loading a manifest document.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported manifest extension: {0} (expected .json or .toml)")]
    UnsupportedExtension(String),
}

impl Manifest {
    pub fn from_json(source: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_toml(source: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a manifest file, dispatching on its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&source),
            Some("toml") => Self::from_toml(&source),
            other => Err(ManifestError::UnsupportedExtension(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::FieldKind;

    const JSON: &str = r#"{
        "metadata": {"name": "Shop", "version": "1.0.0"},
        "features": {"auth": {"enabled": true, "providers": ["phone_password"]}},
        "entities": [{
            "name": "Product",
            "tableName": "products",
            "fields": [
                {"name": "id", "type": "uuid", "primary": true, "generated": true},
                {"name": "name", "type": "string", "required": true, "maxLength": 255},
                {"name": "price", "type": "decimal", "required": true, "min": 0}
            ],
            "policies": {"create": "authenticated", "delete": "owner || role:admin"}
        }]
    }"#;

    #[test]
    fn json_round_trip() {
        let manifest = Manifest::from_json(JSON).unwrap();
        assert_eq!(manifest.app_name(), "Shop");
        assert!(manifest.features.auth_enabled());

        let product = manifest.entity("Product").unwrap();
        assert_eq!(product.table(), "products");
        assert_eq!(product.field("price").unwrap().kind, FieldKind::Decimal);
        assert_eq!(
            product.policies.delete.as_deref(),
            Some("owner || role:admin")
        );
    }

    #[test]
    fn toml_manifest_loads() {
        let toml = r#"
            [metadata]
            name = "Shop"
            version = "1.0.0"

            [[entities]]
            name = "Product"

            [[entities.fields]]
            name = "id"
            type = "uuid"
            primary = true
            generated = true

            [[entities.fields]]
            name = "name"
            type = "string"
            required = true
        "#;
        let manifest = Manifest::from_toml(toml).unwrap();
        assert_eq!(manifest.entity("Product").unwrap().table(), "product");
    }
}
