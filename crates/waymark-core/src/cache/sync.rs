//! Deferred background synchronization.
//!
//! Requests recorded while offline are persisted and replayed, in order,
//! when connectivity returns. Requests that still fail stay queued for the
//! next flush; the queue survives process restart.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::fetch::{ResourceFetcher, ResourceRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Requests successfully replayed and removed from the queue.
    pub replayed: usize,
    /// Requests still pending after the flush.
    pub remaining: usize,
}

pub struct SyncQueue {
    path: PathBuf,
    pending: Vec<ResourceRequest>,
}

impl SyncQueue {
    pub fn open(path: PathBuf) -> Result<Self> {
        let pending = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read sync queue: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse sync queue: {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, pending })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[ResourceRequest] {
        &self.pending
    }

    /// Record a request for later replay.
    pub fn enqueue(&mut self, request: ResourceRequest) -> Result<()> {
        debug!(url = %request.url, "Deferring request for background sync");
        self.pending.push(request);
        self.save()
    }

    /// Replay every pending request in order. A request is removed only when
    /// the fetch succeeds with a success status; everything else stays
    /// queued for the next flush.
    pub async fn flush(&mut self, fetcher: &dyn ResourceFetcher) -> Result<FlushReport> {
        if self.pending.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut retained = Vec::new();
        let mut replayed = 0;
        for request in self.pending.drain(..) {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    debug!(url = %request.url, "Deferred request replayed");
                    replayed += 1;
                }
                Ok(response) => {
                    warn!(url = %request.url, status = response.status, "Deferred request rejected, keeping queued");
                    retained.push(request);
                }
                Err(err) => {
                    warn!(url = %request.url, error = %err, "Deferred request still failing");
                    retained.push(request);
                }
            }
        }

        self.pending = retained;
        self.save()?;
        Ok(FlushReport {
            replayed,
            remaining: self.pending.len(),
        })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.pending)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write sync queue: {}", self.path.display()))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::fetch::{Destination, FetchError, FetchedResponse, Method, ResponseKind};

    /// Succeeds only for URLs in the allow set.
    struct PartialNetwork {
        reachable: Mutex<HashSet<String>>,
    }

    impl PartialNetwork {
        fn new(reachable: &[&str]) -> Self {
            Self {
                reachable: Mutex::new(reachable.iter().map(|u| u.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl ResourceFetcher for PartialNetwork {
        async fn fetch(&self, request: &ResourceRequest) -> Result<FetchedResponse, FetchError> {
            if self.reachable.lock().expect("lock").contains(&request.url) {
                Ok(FetchedResponse {
                    status: 200,
                    headers: BTreeMap::new(),
                    body: Vec::new(),
                    kind: ResponseKind::Basic,
                })
            } else {
                Err(FetchError::Unavailable(request.url.clone()))
            }
        }
    }

    fn post(url: &str) -> ResourceRequest {
        let mut request = ResourceRequest::get(url, Destination::Other);
        request.method = Method::Post;
        request
    }

    #[tokio::test]
    async fn test_flush_replays_and_retains() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut queue = SyncQueue::open(dir.path().join("sync-queue.json")).expect("open");

        queue.enqueue(post("https://app.example/api/visits")).expect("enqueue");
        queue.enqueue(post("https://app.example/api/ratings")).expect("enqueue");

        let network = PartialNetwork::new(&["https://app.example/api/visits"]);
        let report = queue.flush(&network).await.expect("flush");

        assert_eq!(report, FlushReport { replayed: 1, remaining: 1 });
        assert_eq!(queue.pending()[0].url, "https://app.example/api/ratings");
    }

    #[tokio::test]
    async fn test_queue_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sync-queue.json");
        {
            let mut queue = SyncQueue::open(path.clone()).expect("open");
            queue.enqueue(post("https://app.example/api/visits")).expect("enqueue");
        }

        let queue = SyncQueue::open(path).expect("reopen");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].url, "https://app.example/api/visits");
    }

    #[tokio::test]
    async fn test_flush_empty_queue_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut queue = SyncQueue::open(dir.path().join("sync-queue.json")).expect("open");
        let network = PartialNetwork::new(&[]);

        let report = queue.flush(&network).await.expect("flush");
        assert_eq!(report, FlushReport::default());
    }
}
