// ⚙️ Configuration - where the code tables live and how the build behaves
//
// Load order:
// 1. Built-in defaults (Census 2020 reference vintage)
// 2. TOML file (CENSUSCODES_CONFIG, or ./censuscodes.toml if present)
// 3. Environment overrides (CENSUS_API_KEY, CENSUSCODES_RESOURCES_DIR)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "CENSUSCODES_CONFIG";
pub const RESOURCES_DIR_ENV: &str = "CENSUSCODES_RESOURCES_DIR";
pub const API_KEY_ENV: &str = "CENSUS_API_KEY";
pub const DEFAULT_CONFIG_FILE: &str = "censuscodes.toml";

pub const STATE_FILE_NAME: &str = "national_state2020.txt";
pub const STATE_FILE_URL: &str =
    "https://www2.census.gov/geo/docs/reference/codes2020/national_state2020.txt";
pub const COUNTY_FILE_NAME: &str = "national_county2020.txt";
pub const COUNTY_FILE_URL: &str =
    "https://www2.census.gov/geo/docs/reference/codes2020/national_county2020.txt";
pub const DEFAULT_API_BASE_URL: &str = "https://api.census.gov/data";

// ============================================================================
// POLICIES
// ============================================================================

/// What to do with a county whose parent state cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Keep the county in the flat list, leave `full_name` unset, log a warning.
    #[default]
    Lenient,
    /// Abort the build with `RegistryError::UnresolvedParent`.
    Strict,
}

/// What to do when two entities collide on a one-to-one index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The entity built last owns the key.
    #[default]
    LastWriteWins,
    /// Abort the build with `RegistryError::DuplicateKey`.
    Reject,
}

// ============================================================================
// CONFIG TYPES
// ============================================================================

/// A (local path, remote URL) pair for one code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Census API key; requests without one are rate limited but allowed.
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub state_table: TableSource,
    pub county_table: TableSource,
    pub orphan_policy: OrphanPolicy,
    pub duplicate_policy: DuplicatePolicy,
    pub api: ApiConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::with_resources_dir("resources")
    }
}

impl RegistryConfig {
    /// Default sources with both tables cached under `dir`.
    pub fn with_resources_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        RegistryConfig {
            state_table: TableSource {
                path: dir.join(STATE_FILE_NAME),
                url: STATE_FILE_URL.to_string(),
            },
            county_table: TableSource {
                path: dir.join(COUNTY_FILE_NAME),
                url: COUNTY_FILE_URL.to_string(),
            },
            orphan_policy: OrphanPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            api: ApiConfig::default(),
        }
    }

    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Defaults, then the config file (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable source (the process environment in `load`).
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var(RESOURCES_DIR_ENV).filter(|d| !d.is_empty()) {
            let dir = PathBuf::from(dir);
            self.state_table.path = rebase(&self.state_table.path, &dir);
            self.county_table.path = rebase(&self.county_table.path, &dir);
        }
        if let Some(key) = var(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.api.key = Some(key);
        }
    }
}

fn rebase(path: &Path, dir: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => dir.join(name),
        None => path.to_path_buf(),
    }
}

/// Explicit path from `CENSUSCODES_CONFIG` (must exist), else `./censuscodes.toml`
/// when present, else none.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if !path.exists() {
            anyhow::bail!(
                "Config file specified by {} not found: {}",
                CONFIG_PATH_ENV,
                path.display()
            );
        }
        return Ok(Some(path));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(local.exists().then_some(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_point_at_2020_vintage() {
        let config = RegistryConfig::default();

        assert_eq!(config.state_table.path, Path::new("resources/national_state2020.txt"));
        assert_eq!(config.county_table.url, COUNTY_FILE_URL);
        assert_eq!(config.orphan_policy, OrphanPolicy::Lenient);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWriteWins);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert!(config.api.key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RegistryConfig::from_toml_str(
            r#"
            orphan_policy = "strict"

            [api]
            key = "abc123"
            "#,
        )
        .unwrap();

        assert_eq!(config.orphan_policy, OrphanPolicy::Strict);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWriteWins);
        assert_eq!(config.api.key.as_deref(), Some("abc123"));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.state_table.url, STATE_FILE_URL);
    }

    #[test]
    fn test_table_sources_from_toml() {
        let config = RegistryConfig::from_toml_str(
            r#"
            duplicate_policy = "reject"

            [state_table]
            path = "/data/states.txt"
            url = "https://example.org/states.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.state_table.path, Path::new("/data/states.txt"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.county_table.path, Path::new("resources/national_county2020.txt"));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        assert!(RegistryConfig::from_toml_str("orphan_policy = \"sometimes\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (RESOURCES_DIR_ENV, "/var/cache/census"),
            (API_KEY_ENV, "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = RegistryConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            config.state_table.path,
            Path::new("/var/cache/census/national_state2020.txt")
        );
        assert_eq!(
            config.county_table.path,
            Path::new("/var/cache/census/national_county2020.txt")
        );
        assert_eq!(config.api.key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = RegistryConfig::default();
        config.apply_env_overrides(|_| Some(String::new()));

        assert_eq!(config, RegistryConfig::default());
    }
}
