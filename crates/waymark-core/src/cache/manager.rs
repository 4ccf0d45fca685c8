//! Offline shell cache: per-request strategies, scope filter, and the
//! generation lifecycle.
//!
//! `CacheManager` owns the current generation. Requests are always served
//! from the active generation; installing a new one never disturbs the
//! active one until `activate()` promotes it and purges the rest.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::manifest::ShellManifest;
use crate::cache::store::CacheStore;
use crate::cache::strategy::Strategy;
use crate::fetch::{
    url_origin, Destination, FetchError, FetchMode, FetchedResponse, ResourceFetcher,
    ResourceRequest, ResponseKind,
};

/// Buffer size for the worker event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Shell paths tried, in order, when a navigation request has neither
/// network nor a cached entry of its own.
const SHELL_ROOT_PATHS: [&str; 2] = ["/index.html", "/"];

// ============================================================================
// Scope
// ============================================================================

/// Which origins the cache intercepts. Everything else passes through to
/// the network untouched and is never cached.
#[derive(Debug, Clone)]
pub struct CacheScope {
    pub app_origin: String,
    pub cdn_origins: [String; 2],
}

impl CacheScope {
    pub fn new(app_origin: impl Into<String>, cdn_origins: [String; 2]) -> Self {
        Self {
            app_origin: app_origin.into(),
            cdn_origins,
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        let origin = url_origin(url);
        origin == self.app_origin || self.cdn_origins.iter().any(|cdn| cdn == origin)
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Lifecycle events broadcast to connected front-end instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    UpdateAvailable { version: String },
}

/// Inbound control messages from front-end instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Force immediate promotion of the waiting generation.
    SkipWaiting,
    /// Ask for the active generation identifier.
    GetVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    Version(Option<String>),
}

// ============================================================================
// Strategy outcomes
// ============================================================================

/// Where the bytes of a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached shell root served in place of a failed navigation.
    ShellFallback,
    /// Synthesized 408 marker; nothing could satisfy the request.
    TimeoutMarker,
    /// Out-of-scope request, network only.
    Passthrough,
}

/// A strategy's result. `background` is the detached cache write or
/// revalidation task: its completion is unordered relative to the response
/// already delivered, and `handle()` drops it. Tests may await it.
pub struct StrategyOutcome {
    pub response: FetchedResponse,
    pub source: ResponseSource,
    pub background: Option<JoinHandle<()>>,
}

impl StrategyOutcome {
    fn new(response: FetchedResponse, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            background: None,
        }
    }

    fn with_background(mut self, background: Option<JoinHandle<()>>) -> Self {
        self.background = background;
        self
    }
}

// ============================================================================
// Manager
// ============================================================================

pub struct CacheManager {
    store: Arc<CacheStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    scope: CacheScope,
    /// Generation currently serving requests.
    active: Option<String>,
    /// Fully populated generation waiting for promotion.
    waiting: Option<String>,
    events: broadcast::Sender<WorkerEvent>,
}

impl CacheManager {
    /// Create a manager over an existing store. If a previous process left
    /// exactly one generation on disk, it is adopted as active; anything
    /// more ambiguous waits for the next `activate()`.
    pub fn new(
        store: CacheStore,
        fetcher: Arc<dyn ResourceFetcher>,
        scope: CacheScope,
    ) -> Result<Self> {
        let generations = store.list_generations()?;
        let active = match generations.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        if let Some(ref version) = active {
            debug!(version = %version, "Adopted existing cache generation");
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            store: Arc::new(store),
            fetcher,
            scope,
            active,
            waiting: None,
            events,
        })
    }

    pub fn version(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn waiting_version(&self) -> Option<&str> {
        self.waiting.as_deref()
    }

    /// Subscribe to lifecycle events ("update available").
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Populate a new generation from the manifest. The active generation
    /// keeps serving traffic untouched; the new one ends up waiting.
    ///
    /// Cross-origin resources are fetched no-cors, so opaque responses are
    /// accepted. Individual fetch failures are logged and skipped; a
    /// partially populated shell still installs. Returns the number of
    /// resources stored.
    pub async fn install(&mut self, manifest: &ShellManifest) -> Result<usize> {
        let version = manifest.version.clone();
        info!(
            version = %version,
            resources = manifest.resources.len(),
            "Installing shell cache"
        );

        // Drop any stale partial population of this identifier, unless it is
        // the generation currently serving traffic.
        if self.active.as_deref() != Some(version.as_str()) {
            self.store.remove_generation(&version)?;
        }

        let requests: Vec<ResourceRequest> = manifest
            .resolved_urls(&self.scope.app_origin)
            .into_iter()
            .map(|url| {
                let mode = if url_origin(&url) == self.scope.app_origin {
                    FetchMode::Cors
                } else {
                    FetchMode::NoCors
                };
                let destination = Destination::guess(crate::fetch::url_path(&url));
                ResourceRequest::get(url, destination).with_mode(mode)
            })
            .collect();

        let fetches = requests.iter().map(|request| {
            let fetcher = Arc::clone(&self.fetcher);
            async move { fetcher.fetch(request).await }
        });
        let results = join_all(fetches).await;

        let mut stored = 0;
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(response)
                    if response.is_success() || response.kind == ResponseKind::Opaque =>
                {
                    self.store
                        .put(&version, &request.cache_key(), &response)
                        .with_context(|| {
                            format!("Failed to store shell resource: {}", request.url)
                        })?;
                    stored += 1;
                }
                Ok(response) => {
                    warn!(
                        url = %request.url,
                        status = response.status,
                        "Skipping shell resource with non-success status"
                    );
                }
                Err(err) => {
                    warn!(url = %request.url, error = %err, "Failed to fetch shell resource");
                }
            }
        }

        info!(version = %version, stored, "Shell cache populated, waiting for activation");
        self.waiting = Some(version);
        Ok(stored)
    }

    /// Promote the waiting generation (or re-assert the active one): delete
    /// every generation whose identifier differs, then take over serving.
    /// Calling this twice with the same identifier is a no-op the second
    /// time and leaves exactly one generation present.
    pub fn activate(&mut self) -> Result<()> {
        let version = match self.waiting.take() {
            Some(version) => version,
            None => self
                .active
                .clone()
                .context("No generation installed to activate")?,
        };

        for generation in self.store.list_generations()? {
            if generation != version {
                info!(old = %generation, "Deleting old cache generation");
                self.store.remove_generation(&generation)?;
            }
        }

        let changed = self.active.as_deref() != Some(version.as_str());
        self.active = Some(version.clone());

        if changed {
            info!(version = %version, "Cache generation active");
            let _ = self.events.send(WorkerEvent::UpdateAvailable { version });
        }
        Ok(())
    }

    /// Handle an inbound control message.
    pub fn on_message(&mut self, message: ControlMessage) -> Result<Option<ControlReply>> {
        match message {
            ControlMessage::SkipWaiting => {
                if self.waiting.is_some() {
                    self.activate()?;
                }
                Ok(None)
            }
            ControlMessage::GetVersion => Ok(Some(ControlReply::Version(self.active.clone()))),
        }
    }

    // ========================================================================
    // Request handling
    // ========================================================================

    /// Run a request through scope filtering, strategy selection, and the
    /// offline fallbacks. This is the single entry point callers use.
    pub async fn handle(&self, request: &ResourceRequest) -> Result<StrategyOutcome, FetchError> {
        if !self.scope.contains(&request.url) {
            debug!(url = %request.url, "Out of scope, passing through");
            let response = self.fetcher.fetch(request).await?;
            return Ok(StrategyOutcome::new(response, ResponseSource::Passthrough));
        }

        let strategy = Strategy::select(request);
        debug!(url = %request.url, strategy = strategy.name(), "Handling request");

        let result = match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(url = %request.url, error = %err, "Request failed with no usable cache");
                if request.destination.is_navigation() {
                    if let Some(shell) = self.lookup_shell_root() {
                        return Ok(StrategyOutcome::new(shell, ResponseSource::ShellFallback));
                    }
                }
                Ok(StrategyOutcome::new(
                    FetchedResponse::timeout_marker(),
                    ResponseSource::TimeoutMarker,
                ))
            }
        }
    }

    /// Serve from cache; on a miss, fetch and fill. A cached entry is
    /// returned without any network call.
    pub async fn cache_first(
        &self,
        request: &ResourceRequest,
    ) -> Result<StrategyOutcome, FetchError> {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key) {
            debug!(url = %request.url, "Serving from cache");
            return Ok(StrategyOutcome::new(cached, ResponseSource::Cache));
        }

        let response = self.fetcher.fetch(request).await?;
        let background = self.spawn_write_if_cacheable(&key, &response);
        Ok(StrategyOutcome::new(response, ResponseSource::Network).with_background(background))
    }

    /// Try the network first, overwriting the cached entry on success; fall
    /// back to the cached entry when the network fails.
    pub async fn network_first(
        &self,
        request: &ResourceRequest,
    ) -> Result<StrategyOutcome, FetchError> {
        let key = request.cache_key();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let background = self.spawn_write_if_cacheable(&key, &response);
                Ok(StrategyOutcome::new(response, ResponseSource::Network)
                    .with_background(background))
            }
            Err(err) => match self.lookup(&key) {
                Some(cached) => {
                    warn!(url = %request.url, error = %err, "Network failed, serving cached");
                    Ok(StrategyOutcome::new(cached, ResponseSource::Cache))
                }
                None => Err(err),
            },
        }
    }

    /// Return the cached entry immediately and revalidate in the background;
    /// block on the network only when there is nothing cached.
    pub async fn stale_while_revalidate(
        &self,
        request: &ResourceRequest,
    ) -> Result<StrategyOutcome, FetchError> {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key) {
            debug!(url = %request.url, "Serving stale, revalidating in background");
            let background = self.spawn_revalidate(request.clone());
            return Ok(
                StrategyOutcome::new(cached, ResponseSource::Cache).with_background(background)
            );
        }

        let response = self.fetcher.fetch(request).await?;
        let background = self.spawn_write_if_cacheable(&key, &response);
        Ok(StrategyOutcome::new(response, ResponseSource::Network).with_background(background))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Read from the active generation, treating read errors as misses.
    fn lookup(&self, key: &str) -> Option<FetchedResponse> {
        let generation = self.active.as_deref()?;
        match self.store.get(generation, key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn lookup_shell_root(&self) -> Option<FetchedResponse> {
        for path in SHELL_ROOT_PATHS {
            let key = format!("GET {}{}", self.scope.app_origin, path);
            if let Some(shell) = self.lookup(&key) {
                return Some(shell);
            }
        }
        None
    }

    /// Runtime cacheability: only 2xx same-origin-visible responses are
    /// stored; opaque blobs are accepted during install only.
    fn is_cacheable(response: &FetchedResponse) -> bool {
        response.is_success() && response.kind == ResponseKind::Basic
    }

    /// Fire-and-forget cache write. A slow or failed write must never delay
    /// or fail the response already returned.
    fn spawn_write_if_cacheable(
        &self,
        key: &str,
        response: &FetchedResponse,
    ) -> Option<JoinHandle<()>> {
        if !Self::is_cacheable(response) {
            return None;
        }
        let generation = self.active.clone()?;
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        let response = response.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = store.put(&generation, &key, &response) {
                warn!(key = %key, error = %err, "Cache write failed");
            }
        }))
    }

    /// Background refetch whose successful result overwrites the entry for
    /// future requests. Completion is an independent, unordered event.
    fn spawn_revalidate(&self, request: ResourceRequest) -> Option<JoinHandle<()>> {
        let generation = self.active.clone()?;
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        Some(tokio::spawn(async move {
            let key = request.cache_key();
            match fetcher.fetch(&request).await {
                Ok(response) if Self::is_cacheable(&response) => {
                    if let Err(err) = store.put(&generation, &key, &response) {
                        warn!(key = %key, error = %err, "Revalidation write failed");
                    }
                }
                Ok(response) => {
                    debug!(key = %key, status = response.status, "Revalidation not cacheable");
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Revalidation fetch failed");
                }
            }
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
