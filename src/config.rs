// src/config.rs

//! Mirror subsystem configuration

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the mirror service and the upstream client
///
/// Callers construct this once at bootstrap and hand it to
/// [`MirrorService`](crate::mirror::MirrorService) /
/// [`NuGetUpstreamClient`](crate::upstream::NuGetUpstreamClient).
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Upstream NuGet v3 service index URL
    pub upstream_url: String,
    /// Request timeout for upstream fetches
    pub upstream_timeout: Duration,
    /// Directory for staging downloaded archives (None = system temp dir)
    pub staging_dir: Option<PathBuf>,
    /// TTL for caching "id unknown upstream" results (None = disabled)
    pub negative_cache_ttl: Option<Duration>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            upstream_url: "https://api.nuget.org/v3/index.json".to_string(),
            upstream_timeout: Duration::from_secs(30),
            staging_dir: None,
            negative_cache_ttl: None,
        }
    }
}
