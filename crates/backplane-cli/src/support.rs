use std::fs;
use std::path::Path;

use backplane_manifest::{Manifest, ManifestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("manifest has {0} issue(s)")]
    ManifestIssues(usize),

    #[error("invalid bind address: {0}")]
    BadAddress(String),
}

pub fn load_manifest(path: &str) -> Result<Manifest, CliError> {
    Ok(Manifest::load(Path::new(path))?)
}

/// Write to `output` when given, stdout otherwise.
pub fn emit(output: Option<&str>, content: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("wrote {path}");
            Ok(())
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
