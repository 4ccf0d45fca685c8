//! Waymark core - the engine layer for an offline-capable location-AR app.
//!
//! Two independent components:
//!
//! - [`cache`]: an offline resource cache that selects one of three caching
//!   strategies per request and manages versioned cache generations across
//!   upgrades (install, activate, evict), with deferred background sync.
//! - [`geo`]: GPS-to-local-frame projection, great-circle distances, and
//!   distance-window visibility filtering for points of interest.
//!
//! Rendering, marker detection, and all other presentation concerns are
//! external collaborators; this crate only produces the data they consume.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod geo;

pub use config::Config;
