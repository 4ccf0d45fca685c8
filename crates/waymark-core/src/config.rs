//! Application configuration management.
//!
//! Configuration is stored at `~/.config/waymark/config.json` and covers
//! the cache scope (app origin plus approved CDN origins), the cache
//! directory override, and the visibility window for the geo component.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cache::CacheScope;
use crate::geo::RangeConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "waymark";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// File under the cache root holding the deferred sync queue.
const SYNC_QUEUE_FILE: &str = "sync-queue.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The app's own origin; in-scope paths resolve against it.
    pub origin: String,
    /// The two approved third-party content-delivery origins.
    pub cdn_origins: [String; 2],
    /// Overrides the platform cache directory when set.
    pub cache_dir: Option<PathBuf>,
    /// Visibility window in meters.
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "https://app.waymark.dev".to_string(),
            cdn_origins: [
                "https://cdnjs.cloudflare.com".to_string(),
                "https://cdn.jsdelivr.net".to_string(),
            ],
            cache_dir: None,
            min_distance: 10.0,
            max_distance: 1000.0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn sync_queue_path(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(SYNC_QUEUE_FILE))
    }

    pub fn scope(&self) -> CacheScope {
        CacheScope::new(self.origin.clone(), self.cdn_origins.clone())
    }

    pub fn range(&self) -> RangeConfig {
        RangeConfig {
            min_distance: self.min_distance,
            max_distance: self.max_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_distance, 10.0);
        assert_eq!(config.max_distance, 1000.0);
        assert!(config.scope().contains("https://cdn.jsdelivr.net/gh/lib/build/lib.js"));
        assert!(config.scope().contains(&format!("{}/index.html", config.origin)));
        assert!(!config.scope().contains("https://elsewhere.example/x"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"origin": "https://kiosk.example"}"#).expect("parse");
        assert_eq!(config.origin, "https://kiosk.example");
        assert_eq!(config.max_distance, 1000.0);
    }
}
