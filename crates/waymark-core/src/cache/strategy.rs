//! Per-request caching strategy selection.

use crate::fetch::{Destination, ResourceRequest};

/// Path prefix routed to the network-first strategy.
const API_PATH_PREFIX: &str = "/api/";

/// The closed set of caching strategies. Selected per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache; fetch and fill only on a miss.
    CacheFirst,
    /// Try the network, fall back to the cached entry.
    NetworkFirst,
    /// Serve stale from cache immediately, revalidate in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    /// Pure function of `(destination, path prefix)`.
    pub fn select(request: &ResourceRequest) -> Self {
        if request.path().starts_with(API_PATH_PREFIX) {
            return Strategy::NetworkFirst;
        }
        match request.destination {
            Destination::Image | Destination::Video => Strategy::CacheFirst,
            Destination::Style | Destination::Script => Strategy::StaleWhileRevalidate,
            _ => Strategy::CacheFirst,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths_are_network_first() {
        let request = ResourceRequest::get("https://app.example/api/points", Destination::Other);
        assert_eq!(Strategy::select(&request), Strategy::NetworkFirst);

        // Even when the destination would otherwise pick another strategy.
        let request = ResourceRequest::get("https://app.example/api/icon.png", Destination::Image);
        assert_eq!(Strategy::select(&request), Strategy::NetworkFirst);
    }

    #[test]
    fn test_media_is_cache_first() {
        let image = ResourceRequest::get("https://app.example/icons/icon-192x192.png", Destination::Image);
        assert_eq!(Strategy::select(&image), Strategy::CacheFirst);

        let video = ResourceRequest::get("https://app.example/media/intro.mp4", Destination::Video);
        assert_eq!(Strategy::select(&video), Strategy::CacheFirst);
    }

    #[test]
    fn test_assets_are_stale_while_revalidate() {
        let script = ResourceRequest::get("https://app.example/js/app.js", Destination::Script);
        assert_eq!(Strategy::select(&script), Strategy::StaleWhileRevalidate);

        let style = ResourceRequest::get("https://app.example/css/styles.css", Destination::Style);
        assert_eq!(Strategy::select(&style), Strategy::StaleWhileRevalidate);
    }

    #[test]
    fn test_default_is_cache_first() {
        let document = ResourceRequest::navigation("https://app.example/");
        assert_eq!(Strategy::select(&document), Strategy::CacheFirst);

        let other = ResourceRequest::get("https://app.example/manifest.json", Destination::Other);
        assert_eq!(Strategy::select(&other), Strategy::CacheFirst);
    }
}
