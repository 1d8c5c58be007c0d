use backplane_codegen::generate_openapi;

use crate::support::{CliError, emit, load_manifest};

pub fn run(manifest_path: &str, output: Option<&str>) -> Result<(), CliError> {
    let manifest = load_manifest(manifest_path)?;
    let document = serde_json::to_string_pretty(&generate_openapi(&manifest))?;
    emit(output, &document)
}
