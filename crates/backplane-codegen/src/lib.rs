//! Generators that turn a manifest into deployable artifacts.
//!
//! All three generators are pure functions of the manifest and emit
//! byte-identical output across runs. Anything time- or
//! environment-dependent stays out of the generated text.

mod migrations;
mod openapi;
mod types;

pub use migrations::generate_migrations;
pub use openapi::{
    Components, Info, MediaType, OpenApiDocument, Operation, Parameter, PathItem, RequestBody,
    Response, SchemaObject, generate_openapi,
};
pub use types::generate_rust_types;
