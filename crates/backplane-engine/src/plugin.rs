//! Plugin registry types.

use thiserror::Error;

use crate::engine::Engine;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin initialization failed: {0}")]
    Init(String),
}

/// An extension initialized against a built engine.
///
/// `initialize` runs synchronously during registration; a failing
/// plugin is not registered.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn initialize(&self, engine: &Engine) -> Result<(), PluginError>;
}
