//! Versioned app-shell manifest.
//!
//! The manifest is the input to `CacheManager::install`: an ordered list of
//! own-origin shell paths plus a small set of cross-origin library URLs.
//! Its `version` is the generation identifier; changing it is the sole
//! trigger for install/activate/evict of a new generation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default generation identifier for the built-in shell manifest.
const DEFAULT_VERSION: &str = "waymark-v1.0.0";

/// Cross-origin libraries cached alongside the shell.
const CDN_LIBRARIES: [&str; 3] = [
    "https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js",
    "https://cdn.jsdelivr.net/gh/AR-js-org/AR.js@3.4.5/aframe/build/aframe-ar.js",
    "https://cdn.jsdelivr.net/gh/AR-js-org/AR.js@3.4.5/three.js/build/ar-threex.js",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellManifest {
    /// Generation identifier (version tag).
    pub version: String,
    /// Resource URLs: own-origin paths (leading `/`) or absolute URLs.
    /// Order is fixed for reproducibility; behavior does not depend on it.
    pub resources: Vec<String>,
}

impl ShellManifest {
    /// The built-in shell resource list.
    pub fn default_shell() -> Self {
        let mut resources: Vec<String> = [
            "/",
            "/index.html",
            "/manifest.json",
            "/css/styles.css",
            "/js/app.js",
            "/js/overlay.js",
            "/icons/icon-192x192.png",
            "/icons/icon-512x512.png",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        resources.extend(CDN_LIBRARIES.into_iter().map(String::from));
        Self {
            version: DEFAULT_VERSION.to_string(),
            resources,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))
    }

    /// Resources as absolute URLs, resolving own-origin paths against `origin`.
    pub fn resolved_urls(&self, origin: &str) -> Vec<String> {
        self.resources
            .iter()
            .map(|resource| {
                if resource.starts_with('/') {
                    format!("{}{}", origin, resource)
                } else {
                    resource.clone()
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell_shape() {
        let manifest = ShellManifest::default_shell();
        assert_eq!(manifest.version, DEFAULT_VERSION);
        assert!(manifest.resources.contains(&"/index.html".to_string()));

        let cross_origin = manifest.resources.iter().filter(|r| !r.starts_with('/')).count();
        assert_eq!(cross_origin, 3);
    }

    #[test]
    fn test_resolved_urls() {
        let manifest = ShellManifest {
            version: "v1".to_string(),
            resources: vec![
                "/".to_string(),
                "/js/app.js".to_string(),
                "https://cdn.jsdelivr.net/lib.js".to_string(),
            ],
        };
        let urls = manifest.resolved_urls("https://app.example");
        assert_eq!(
            urls,
            vec![
                "https://app.example/",
                "https://app.example/js/app.js",
                "https://cdn.jsdelivr.net/lib.js",
            ]
        );
    }
}
