/// CLI configuration
use crate::error::{CliError, Result};
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when no path is given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub player: PlaybackConfig,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Length of simulated tracks whose catalog entry has no duration
    #[serde(default = "default_simulated_track_secs")]
    pub simulated_track_secs: u64,
}

impl EngineSettings {
    pub fn simulated_track_length(&self) -> Duration {
        Duration::from_secs(self.simulated_track_secs)
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadence.toml` is read when
    /// present. `CADENCE_*` variables override both, with `__` between
    /// section and key (`CADENCE_STORAGE__DATABASE_URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(CliError::Config("storage.database_url is empty".to_string()));
        }
        if self.player.status_update_interval_ms == 0 {
            return Err(CliError::Config(
                "player.status_update_interval_ms must be positive".to_string(),
            ));
        }
        if self.engine.simulated_track_secs == 0 {
            return Err(CliError::Config(
                "engine.simulated_track_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://cadence.db".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

fn default_simulated_track_secs() -> u64 {
    180
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            simulated_track_secs: default_simulated_track_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_playback::RepeatMode;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[player]
repeat = "all"
seek_settle_ms = 400

[storage]
database_url = "sqlite://test.db"

[engine]
simulated_track_secs = 30
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.player.repeat, RepeatMode::All);
        assert_eq!(config.player.seek_settle_ms, 400);
        assert_eq!(config.player.status_update_interval_ms, 500);
        assert_eq!(config.storage.database_url, "sqlite://test.db");
        assert_eq!(config.catalog.path, PathBuf::from("catalog.json"));
        assert_eq!(config.engine.simulated_track_length(), Duration::from_secs(30));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = CliConfig::default();
        config.player.status_update_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
