//! Offline resource cache for the app shell.
//!
//! This module decides, per outbound request, whether to read from the
//! persisted cache, fetch from the network, or do both, and keeps the
//! persisted cache consistent across version upgrades. One generation
//! serves all in-scope requests at a time; installing a new one never
//! disturbs the old until activation purges it.
//!
//! Requests deferred while offline are replayed by the [`sync::SyncQueue`].

pub mod manager;
pub mod manifest;
pub mod store;
pub mod strategy;
pub mod sync;

pub use manager::{
    CacheManager, CacheScope, ControlMessage, ControlReply, ResponseSource, StrategyOutcome,
    WorkerEvent,
};
pub use manifest::ShellManifest;
pub use store::CacheStore;
pub use strategy::Strategy;
pub use sync::{FlushReport, SyncQueue};
