//! Configuration loading
//!
//! Resolves the [`lugn_domain::ApiConfig`] from the environment (with `.env`
//! support) or from a `lugn.toml`/`lugn.json` file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
