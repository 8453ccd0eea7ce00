//! Configuration for remex clients
//!
//! Resolves a [`ClientConfig`] from defaults, a JSON file and the environment.

pub mod config;
pub mod loader;


pub use config::*;
pub use loader::*;
