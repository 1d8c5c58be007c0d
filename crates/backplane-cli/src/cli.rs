use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "backplane",
    about = "Backplane: a manifest-driven backend platform",
    version
)]
pub struct Cli {
    /// Path to the application manifest (.json or .toml)
    #[arg(long, global = true, default_value = "manifest.json")]
    pub manifest: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the manifest for structural issues
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate SQL migrations from the manifest
    Migrate {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate the OpenAPI document
    Openapi {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate Rust types for the declared entities
    Types {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Serve the HTTP API over in-memory backends
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: String,

        /// Token signing secret
        #[arg(long, env = "BACKPLANE_SECRET", default_value = "dev-secret")]
        secret: String,
    },
}
