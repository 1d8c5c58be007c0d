use serde_json::json;

use crate::support::{CliError, load_manifest};

/// Load the manifest and report structural issues. Issues make the
/// command fail so CI can gate on it.
pub fn run(manifest_path: &str, json: bool) -> Result<(), CliError> {
    let manifest = load_manifest(manifest_path)?;
    let issues = manifest.check();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "app": manifest.app_name(),
                "entities": manifest.entities.len(),
                "issues": issues,
            }))?
        );
    } else if issues.is_empty() {
        println!(
            "{}: {} entities, no issues",
            manifest.app_name(),
            manifest.entities.len()
        );
    } else {
        for issue in &issues {
            match &issue.field {
                Some(field) => eprintln!("{}.{}: {}", issue.entity, field, issue.message),
                None => eprintln!("{}: {}", issue.entity, issue.message),
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(CliError::ManifestIssues(issues.len()))
    }
}
