//! Settings for cohort.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! COHORT_DATABASE_URL=sqlite://cohort.db
//!
//! # Repository provisioning
//! COHORT_REPOSITORY_ADMIN=true          # enabled by default
//! COHORT_REPOSITORY_STORAGE=/var/lib/cohort/repos
//! COHORT_REPOSITORY_TYPE=filesystem     # or "memory"
//! COHORT_REPOSITORY_EXTERNAL_BASE_URL=https://git.example.edu
//! ```
//!
//! or the same settings stored as JSON in `~/.cohort/config.json`.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://cohort.db";
const DEFAULT_STORAGE_DIR: &str = "repositories";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid repository type: {0}. Expected 'memory' or 'filesystem'")]
    InvalidBackend(String),
    #[error("Invalid boolean for {0}: {1}")]
    InvalidBool(String, String),
    #[error("Failed to get home directory")]
    NoHomeDir,
}

/// Which repository backend groups are provisioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Repositories live in process memory (tests, dry runs)
    Memory,
    /// One directory per repository under the storage dir
    Filesystem,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "filesystem" | "fs" => Ok(BackendKind::Filesystem),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

/// Repository provisioning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Whether this deployment creates and permissions repositories itself
    pub is_repository_admin: bool,
    /// Base directory every group repository lives under
    pub storage_dir: PathBuf,
    pub backend: BackendKind,
    /// Base URL for externally accessible repositories
    #[serde(default)]
    pub external_base_url: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            is_repository_admin: true,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            backend: BackendKind::Filesystem,
            external_base_url: None,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub database_url: String,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            repository: RepositoryConfig::default(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool(key.to_string(), value.to_string())),
    }
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("COHORT_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let is_repository_admin = match env::var("COHORT_REPOSITORY_ADMIN") {
            Ok(v) => parse_bool("COHORT_REPOSITORY_ADMIN", &v)?,
            Err(_) => true, // Enabled by default
        };

        let storage_dir = env::var("COHORT_REPOSITORY_STORAGE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR));

        let backend = match env::var("COHORT_REPOSITORY_TYPE") {
            Ok(v) => v.parse()?,
            Err(_) => BackendKind::Filesystem,
        };

        let external_base_url = env::var("COHORT_REPOSITORY_EXTERNAL_BASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            database_url,
            repository: RepositoryConfig {
                is_repository_admin,
                storage_dir,
                backend,
                external_base_url,
            },
        })
    }

    /// Load config from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save config to custom path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Get default config path (~/.cohort/config.json)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".cohort")
            .join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "COHORT_DATABASE_URL",
        "COHORT_REPOSITORY_ADMIN",
        "COHORT_REPOSITORY_STORAGE",
        "COHORT_REPOSITORY_TYPE",
        "COHORT_REPOSITORY_EXTERNAL_BASE_URL",
    ];

    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
    }

    impl<'a> EnvGuard<'a> {
        fn new() -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            for var in ENV_VARS {
                env::remove_var(var);
            }
            Self { _lock: lock }
        }

        fn set(&self, key: &str, value: &str) {
            env::set_var(key, value);
        }
    }

    impl<'a> Drop for EnvGuard<'a> {
        fn drop(&mut self) {
            for var in ENV_VARS {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = EnvGuard::new();

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.repository.is_repository_admin);
        assert_eq!(settings.repository.backend, BackendKind::Filesystem);
        assert_eq!(settings.repository.storage_dir, PathBuf::from("repositories"));
    }

    #[test]
    fn test_full_env() {
        let guard = EnvGuard::new();
        guard.set("COHORT_DATABASE_URL", "sqlite::memory:");
        guard.set("COHORT_REPOSITORY_ADMIN", "false");
        guard.set("COHORT_REPOSITORY_STORAGE", "/srv/repos");
        guard.set("COHORT_REPOSITORY_TYPE", "Memory");
        guard.set("COHORT_REPOSITORY_EXTERNAL_BASE_URL", "https://git.example.edu/");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert!(!settings.repository.is_repository_admin);
        assert_eq!(settings.repository.storage_dir, PathBuf::from("/srv/repos"));
        assert_eq!(settings.repository.backend, BackendKind::Memory);
        assert_eq!(
            settings.repository.external_base_url.as_deref(),
            Some("https://git.example.edu")
        );
    }

    #[test]
    fn test_invalid_backend() {
        let guard = EnvGuard::new();
        guard.set("COHORT_REPOSITORY_TYPE", "svn");

        let result = Settings::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidBackend(_))));
    }

    #[test]
    fn test_invalid_admin_flag() {
        let guard = EnvGuard::new();
        guard.set("COHORT_REPOSITORY_ADMIN", "maybe");

        let result = Settings::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidBool(_, _))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let settings = Settings {
            database_url: "sqlite://test.db".to_string(),
            repository: RepositoryConfig {
                is_repository_admin: false,
                storage_dir: PathBuf::from("/tmp/repos"),
                backend: BackendKind::Memory,
                external_base_url: Some("https://example.edu".to_string()),
            },
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load_from(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_repository_section_defaults_when_absent() {
        let settings: Settings =
            serde_json::from_str(r#"{"database_url":"sqlite://x.db"}"#).unwrap();
        assert_eq!(settings.repository, RepositoryConfig::default());
    }
}
