// src/mirror/mod.rs

//! Mirror service - lazy pull-through mirroring of an upstream feed
//!
//! The centerpiece of the mirror core. Read operations answer "what versions
//! / packages exist for this id" by merging upstream and local results, with
//! the local catalog winning every collision. The write operation lazily
//! mirrors a specific id+version into the catalog the first time it is
//! needed, and never lets a mirroring failure propagate to the caller: the
//! enclosing protocol request typically has a local fallback and must not
//! be failed by upstream instability.

mod coalesce;
mod negative;
pub mod translate;

pub use coalesce::MirrorCoalescer;
pub use negative::NegativeCache;

use crate::catalog::PackageCatalog;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::identity::{versions_equal, PackageIdentity};
use crate::indexer::{IndexingOutcome, PackageIndexer};
use crate::package::Package;
use crate::staging::StagedArchive;
use crate::upstream::UpstreamFeed;
use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What actually happened inside one mirror operation
///
/// Never returned to callers; surfaced in logs and shared with coalesced
/// waiters so the swallow-all contract stays explicit instead of hiding in
/// exception handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The catalog already had this exact id+version
    AlreadyLocal,
    /// Downloaded and handed to the indexer, with the indexer's verdict
    Mirrored(IndexingOutcome),
    /// Upstream has no such version (delisted/removed since listing)
    UpstreamMissing,
    /// Download or indexing failed; detail is in the log
    Failed(String),
}

/// Orchestrates version discovery, package discovery, and lazy mirroring
/// across the upstream feed and the local catalog
pub struct MirrorService {
    upstream: Arc<dyn UpstreamFeed>,
    catalog: Arc<dyn PackageCatalog>,
    indexer: Arc<dyn PackageIndexer>,
    config: MirrorConfig,
    coalescer: MirrorCoalescer,
    negative: Option<NegativeCache>,
}

impl MirrorService {
    pub fn new(
        upstream: Arc<dyn UpstreamFeed>,
        catalog: Arc<dyn PackageCatalog>,
        indexer: Arc<dyn PackageIndexer>,
        config: MirrorConfig,
    ) -> Self {
        let negative = config.negative_cache_ttl.map(NegativeCache::new);
        Self {
            upstream,
            catalog,
            indexer,
            config,
            coalescer: MirrorCoalescer::new(),
            negative,
        }
    }

    /// All versions of `id` across upstream and local, including unlisted
    ///
    /// `Ok(None)` means upstream has no record of this id - a deliberate
    /// signal distinct from an empty set, on which callers fall back to a
    /// local-only lookup. Upstream transport failures propagate as errors.
    pub async fn find_versions(&self, id: &str) -> Result<Option<Vec<Version>>> {
        if self.known_negative(id).await {
            return Ok(None);
        }

        let upstream_versions = self.upstream.list_versions(id, true).await?;
        if upstream_versions.is_empty() {
            self.mark_negative(id).await;
            return Ok(None);
        }
        self.clear_negative(id).await;

        // Deduplicate by semver precedence, both within the upstream list
        // (feeds may list 1.0.0 and 1.0.0.4 side by side) and against local
        let mut versions: Vec<Version> = Vec::with_capacity(upstream_versions.len());
        for version in upstream_versions {
            if !versions.iter().any(|v| versions_equal(v, &version)) {
                versions.push(version);
            }
        }
        for package in self.catalog.find(id, true).await? {
            if !versions.iter().any(|v| versions_equal(v, &package.version)) {
                versions.push(package.version);
            }
        }
        Ok(Some(versions))
    }

    /// All package records for `id`, merged across upstream and local
    ///
    /// Same unknown-id signal as [`find_versions`](Self::find_versions).
    /// On identity collision the local record wins: the catalog is the
    /// source of truth for any version it already holds, upstream only
    /// fills gaps.
    pub async fn find_packages(&self, id: &str) -> Result<Option<Vec<Package>>> {
        if self.known_negative(id).await {
            return Ok(None);
        }

        let documents = self.upstream.get_metadata(id).await?;
        if documents.is_empty() {
            self.mark_negative(id).await;
            return Ok(None);
        }
        self.clear_negative(id).await;

        let mut upstream_packages = Vec::with_capacity(documents.len());
        for doc in &documents {
            match translate::to_package(doc) {
                Ok(package) => upstream_packages.push(package),
                // A document we cannot translate loses only itself
                Err(e) => warn!("Skipping untranslatable upstream document for {id}: {e}"),
            }
        }

        let local = self.catalog.find(id, true).await?;
        if local.is_empty() {
            return Ok(Some(upstream_packages));
        }

        let mut merged: HashMap<PackageIdentity, Package> = HashMap::new();
        for package in upstream_packages {
            merged.insert(package.identity(), package);
        }
        for package in local {
            // Local always wins on collision
            merged.insert(package.identity(), package);
        }
        Ok(Some(merged.into_values().collect()))
    }

    /// Lazily mirror an exact id+version into the local catalog
    ///
    /// Fire-and-forget from the caller's perspective: always returns, never
    /// errors. Failures degrade silently (logged, swallowed) because the
    /// caller treats a missing package as not-yet-available. Concurrent
    /// calls for the same identity share one download/index attempt.
    pub async fn mirror(&self, id: &str, version: &Version, cancel: &CancellationToken) {
        // Cancellation is honored here, before the download begins; once in
        // flight the operation runs to completion
        if cancel.is_cancelled() {
            debug!("Mirror of {id} {version} cancelled before start");
            return;
        }

        let identity = PackageIdentity::new(id, version.clone());
        let outcome = self
            .coalescer
            .coalesce(&identity, || self.mirror_once(&identity))
            .await;
        debug!("Mirror of {identity} finished: {outcome:?}");
    }

    /// One actual mirror attempt; every failure path resolves to an outcome
    ///
    /// The staging resource is owned by this call and released on every exit
    /// path, including both failure branches and indexer errors.
    async fn mirror_once(&self, identity: &PackageIdentity) -> MirrorOutcome {
        match self.catalog.exists(&identity.id, &identity.version).await {
            Ok(true) => {
                debug!("{identity} already local, skipping mirror");
                return MirrorOutcome::AlreadyLocal;
            }
            Ok(false) => {}
            Err(e) => {
                error!("Catalog lookup failed while mirroring {identity}: {e}");
                return MirrorOutcome::Failed(e.to_string());
            }
        }

        let stream = match self
            .upstream
            .get_archive(&identity.id, &identity.version)
            .await
        {
            Ok(stream) => stream,
            Err(e) if e.is_not_found() => {
                // Expected: the version may have been delisted between a
                // version-listing call and this download
                warn!("{identity} not found upstream, nothing to mirror");
                return MirrorOutcome::UpstreamMissing;
            }
            Err(e) => {
                error!(
                    "Failed to download {} {} from upstream {}: {e}",
                    identity.id,
                    identity.version,
                    self.upstream.name()
                );
                return MirrorOutcome::Failed(e.to_string());
            }
        };

        let staged = match StagedArchive::buffer(stream, self.config.staging_dir.as_deref()).await
        {
            Ok(staged) => staged,
            Err(e) => {
                error!("Failed to stage archive of {identity}: {e}");
                return MirrorOutcome::Failed(e.to_string());
            }
        };

        let outcome = match self.indexer.index(&staged).await {
            Ok(IndexingOutcome::Success) => {
                info!(
                    "Mirrored {} ({} bytes) from upstream {}",
                    identity,
                    staged.size(),
                    self.upstream.name()
                );
                MirrorOutcome::Mirrored(IndexingOutcome::Success)
            }
            Ok(verdict) => {
                // Informational only; the mirror never retries
                warn!("Indexing mirrored package {identity} reported: {verdict}");
                MirrorOutcome::Mirrored(verdict)
            }
            Err(e) => {
                error!("Indexing mirrored package {identity} failed: {e}");
                MirrorOutcome::Failed(e.to_string())
            }
        };
        drop(staged);
        outcome
    }

    /// Coalesced-mirror observability, used by tests and metrics
    pub fn coalesced_count(&self) -> u64 {
        self.coalescer.coalesced_count()
    }

    async fn known_negative(&self, id: &str) -> bool {
        match &self.negative {
            Some(cache) => cache.check_and_record_hit(id).await,
            None => false,
        }
    }

    async fn mark_negative(&self, id: &str) {
        if let Some(cache) = &self.negative {
            cache.mark_negative(id).await;
        }
    }

    async fn clear_negative(&self, id: &str) {
        if let Some(cache) = &self.negative {
            cache.invalidate(id).await;
        }
    }
}
