use backplane_codegen::generate_migrations;

use crate::support::{CliError, emit, load_manifest};

pub fn run(manifest_path: &str, output: Option<&str>) -> Result<(), CliError> {
    let manifest = load_manifest(manifest_path)?;
    emit(output, &generate_migrations(&manifest))
}
