//! Configuration management for the log server

pub mod loader;
mod schema;

pub use loader::load_config;
pub use schema::*;
