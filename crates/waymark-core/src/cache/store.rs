//! Persisted, generation-scoped resource store.
//!
//! Each cache generation is a subdirectory of the store root. An entry is a
//! metadata JSON file plus a sidecar body file, addressed by a hash of the
//! normalized request key. Entries are overwritten, never mutated in place.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetch::{FetchedResponse, ResponseKind};

/// On-disk metadata for one cached entry. The body lives in a sidecar file
/// next to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    status: u16,
    headers: BTreeMap<String, String>,
    kind: ResponseKind,
    stored_at: DateTime<Utc>,
}

pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root: {}", root.display()))?;
        Ok(Self { root })
    }

    fn generation_dir(&self, generation: &str) -> Result<PathBuf> {
        if generation.is_empty()
            || generation.contains(['/', '\\'])
            || generation == "."
            || generation == ".."
        {
            bail!("invalid generation identifier: {:?}", generation);
        }
        Ok(self.root.join(generation))
    }

    fn entry_stem(key: &str) -> String {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Store a response under the given generation, overwriting any prior
    /// entry for the same key.
    pub fn put(&self, generation: &str, key: &str, response: &FetchedResponse) -> Result<()> {
        let dir = self.generation_dir(generation)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create generation dir: {}", dir.display()))?;

        let stem = Self::entry_stem(key);
        let body_path = dir.join(format!("{}.bin", stem));
        let meta_path = dir.join(format!("{}.json", stem));

        let meta = EntryMeta {
            key: key.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            kind: response.kind,
            stored_at: Utc::now(),
        };

        // Body first, metadata last: a torn write leaves no readable entry.
        std::fs::write(&body_path, &response.body)
            .with_context(|| format!("Failed to write cache body: {}", body_path.display()))?;
        std::fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
            .with_context(|| format!("Failed to write cache entry: {}", meta_path.display()))?;
        Ok(())
    }

    /// Look up an entry by key in the given generation.
    pub fn get(&self, generation: &str, key: &str) -> Result<Option<FetchedResponse>> {
        let dir = self.generation_dir(generation)?;
        let stem = Self::entry_stem(key);
        let meta_path = dir.join(format!("{}.json", stem));
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read cache entry: {}", meta_path.display()))?;
        let meta: EntryMeta = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", meta_path.display()))?;

        // A hash collision must read as a miss, never as someone else's bytes.
        if meta.key != key {
            warn!(expected = key, found = %meta.key, "Cache entry key mismatch, treating as miss");
            return Ok(None);
        }

        let body_path = dir.join(format!("{}.bin", stem));
        let body = std::fs::read(&body_path)
            .with_context(|| format!("Failed to read cache body: {}", body_path.display()))?;

        Ok(Some(FetchedResponse {
            status: meta.status,
            headers: meta.headers,
            body,
            kind: meta.kind,
        }))
    }

    pub fn contains(&self, generation: &str, key: &str) -> bool {
        matches!(self.get(generation, key), Ok(Some(_)))
    }

    /// All generation identifiers currently on disk, sorted.
    pub fn list_generations(&self) -> Result<Vec<String>> {
        let mut generations = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read cache root: {}", self.root.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    generations.push(name);
                }
            }
        }
        generations.sort();
        Ok(generations)
    }

    /// Delete a generation and everything in it.
    pub fn remove_generation(&self, generation: &str) -> Result<()> {
        let dir = self.generation_dir(generation)?;
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove generation: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Number of entries stored under a generation.
    pub fn entry_count(&self, generation: &str) -> Result<usize> {
        let dir = self.generation_dir(generation)?;
        if !dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &[u8]) -> FetchedResponse {
        FetchedResponse {
            status: 200,
            headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            body: body.to_vec(),
            kind: ResponseKind::Basic,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");

        store.put("v1", "GET https://app.example/", &response(b"<html>")).expect("put");

        let cached = store.get("v1", "GET https://app.example/").expect("get");
        let cached = cached.expect("entry should exist");
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, b"<html>");
        assert_eq!(cached.kind, ResponseKind::Basic);
        assert_eq!(cached.headers.get("content-type").map(String::as_str), Some("text/html"));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        assert!(store.get("v1", "GET https://app.example/missing").expect("get").is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        let key = "GET https://app.example/js/app.js";

        store.put("v1", key, &response(b"old")).expect("put");
        store.put("v1", key, &response(b"new")).expect("put");

        let cached = store.get("v1", key).expect("get").expect("entry");
        assert_eq!(cached.body, b"new");
        assert_eq!(store.entry_count("v1").expect("count"), 1);
    }

    #[test]
    fn test_generations_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        let key = "GET https://app.example/";

        store.put("v1", key, &response(b"one")).expect("put");
        assert!(store.get("v2", key).expect("get").is_none());
    }

    #[test]
    fn test_list_and_remove_generations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        let key = "GET https://app.example/";

        store.put("v1", key, &response(b"one")).expect("put");
        store.put("v2", key, &response(b"two")).expect("put");
        assert_eq!(store.list_generations().expect("list"), vec!["v1", "v2"]);

        store.remove_generation("v1").expect("remove");
        assert_eq!(store.list_generations().expect("list"), vec!["v2"]);

        // Removing a generation that is already gone is fine.
        store.remove_generation("v1").expect("remove again");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = "GET https://app.example/";
        {
            let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
            store.put("v1", key, &response(b"persisted")).expect("put");
        }
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        let cached = store.get("v1", key).expect("get").expect("entry");
        assert_eq!(cached.body, b"persisted");
    }

    #[test]
    fn test_rejects_path_like_generation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().to_path_buf()).expect("store");
        assert!(store.put("../evil", "GET x", &response(b"")).is_err());
        assert!(store.get("a/b", "GET x").is_err());
    }
}
