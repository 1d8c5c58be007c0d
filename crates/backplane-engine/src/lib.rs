//! The composition root.
//!
//! An [`Engine`] is built once from a manifest plus whatever clients
//! the deployment provides, precompiling every entity's validator and
//! policy set. Construction never fails: a malformed manifest yields
//! an engine with no entities, and unparseable policy strings compile
//! to deny and are logged. After construction the engine is immutable
//! apart from plugin registration and is shared via `Arc`.

mod config;
mod engine;
mod evaluator;
mod plugin;

pub use config::EngineConfig;
pub use engine::{Engine, EntityRuntime, Identity};
pub use evaluator::PolicyEvaluator;
pub use plugin::{Plugin, PluginError};
