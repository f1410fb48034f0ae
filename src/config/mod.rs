use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default User-Agent sent with playlist fetches. Many IPTV panels only
/// answer to set-top-box agents, so the default mimics a MAG200 box.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (QtEmbedded; U; Linux; C) \
AppleWebKit/533.3 (KHTML, like Gecko) MAG200 stbapp ver: 2 rev: 250 Safari/533.3";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON document holding the library collections.
    pub library_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub user_agent: String,
    /// Per-request deadline for resync fetches, in seconds.
    pub fetch_timeout_secs: u64,
    /// Shorter deadline used by connection tests, in seconds.
    pub test_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from("./data/library.json"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout_secs: 15,
            test_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            if let Some(parent) = default_config.storage.library_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.sync.fetch_timeout_secs, 15);
        assert_eq!(config.sync.test_timeout_secs, 10);
        assert!(config.sync.user_agent.contains("MAG200"));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.sync.user_agent, config.sync.user_agent);
        assert_eq!(back.storage.library_path, config.storage.library_path);
    }
}
