pub mod migrate;
pub mod openapi;
pub mod serve;
pub mod types;
pub mod validate;
