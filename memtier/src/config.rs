//! Configuration loading for the memtier CLI.
//!
//! Configuration is resolved from (in order):
//! 1. `--config <path>`
//! 2. `MEMTIER_CONFIG` environment variable
//! 3. `<project config dir>/config.toml`
//!
//! A missing file yields the library defaults. `--data-dir` overrides
//! `paths.data_dir` from whichever file was loaded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use memtier_core::MemtierConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MEMTIER_CONFIG";

/// Load configuration using the standard resolution order.
pub fn load(flag: Option<&Path>, data_dir: Option<&Path>) -> Result<MemtierConfig> {
    let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let path = resolve_path(flag, env);
    load_from(&path, data_dir)
}

/// Pick the config file path from the flag, the environment, then the default.
pub fn resolve_path(flag: Option<&Path>, env: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return path;
    }
    default_config_path()
}

/// Load configuration from a specific path, falling back to defaults when absent.
pub fn load_from(path: &Path, data_dir: Option<&Path>) -> Result<MemtierConfig> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        MemtierConfig::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        MemtierConfig::default()
    };

    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "memtier", "memtier") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".memtier")
            .join("config.toml")
    }
}
