//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read a `.env` file if one exists (existing variables win)
//! 2. Build the configuration from `LUGN_API_BASE_URL` with protocol defaults
//! 3. If the variable is missing, fall back to a config file
//! 4. Probe multiple paths for config files (TOML or JSON)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./lugn.toml` or `./lugn.json` (current working directory)
//! 2. `../lugn.{toml,json}` and `../../lugn.{toml,json}`
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};

use lugn_domain::constants::ENV_API_BASE_URL;
use lugn_domain::{ApiConfig, LugnError, Result};

const CONFIG_FILE_NAMES: [&str; 2] = ["lugn.toml", "lugn.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `LugnError::Config` if neither the environment nor any config
/// file yields a valid configuration.
pub fn load() -> Result<ApiConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!(base_url = %config.base_url, "Configuration loaded from environment");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `LUGN_API_BASE_URL`
///
/// Every other field takes its protocol default.
///
/// # Errors
/// Returns `LugnError::Config` if the variable is missing or not a valid
/// http(s) URL.
pub fn load_from_env() -> Result<ApiConfig> {
    let base_url = env_var(ENV_API_BASE_URL)?;
    let config = ApiConfig::new(base_url.trim());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected by
/// file extension.
///
/// # Errors
/// Returns `LugnError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or the configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ApiConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LugnError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            LugnError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LugnError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<ApiConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LugnError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LugnError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(LugnError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| LugnError::Config(format!("Missing required environment variable: {key}")))
}
