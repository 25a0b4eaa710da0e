// tests/common/mod.rs

//! Shared fakes for mirror integration tests
//!
//! The mirror core's three seams are traits, so the tests drive the real
//! service against in-process fakes: a configurable upstream feed and a
//! counting indexer, plus the real in-memory catalog.

// Not every test binary exercises every helper
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use semver::Version;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wharf::upstream::{ArchiveStream, UpstreamFeed, UpstreamMetadataDocument};
use wharf::{Error, IndexingOutcome, Package, PackageIndexer, Result, StagedArchive};

/// Opt-in log output while debugging a test failure (RUST_LOG=debug)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// How the fake upstream answers an archive request
#[derive(Clone)]
pub enum ArchiveBehavior {
    /// Serve these bytes
    Bytes(Vec<u8>),
    /// Respond with "no such version"
    NotFound,
    /// Fail the request outright (network-level)
    TransportError,
    /// Start streaming, then fail mid-transfer
    BrokenStream,
}

/// Configurable in-process upstream feed
#[derive(Default)]
pub struct FakeUpstream {
    versions: HashMap<String, Vec<Version>>,
    metadata: HashMap<String, Vec<UpstreamMetadataDocument>>,
    archives: HashMap<String, ArchiveBehavior>,
    fail_reads: bool,
    archive_delay: Option<Duration>,
    pub list_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub archive_calls: AtomicUsize,
}

fn archive_key(id: &str, version: &Version) -> String {
    format!("{}@{}", id.to_ascii_lowercase(), version)
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, id: &str, versions: &[Version]) -> Self {
        self.versions
            .insert(id.to_ascii_lowercase(), versions.to_vec());
        self
    }

    pub fn with_metadata(mut self, id: &str, docs: Vec<UpstreamMetadataDocument>) -> Self {
        self.metadata.insert(id.to_ascii_lowercase(), docs);
        self
    }

    pub fn with_archive(mut self, id: &str, version: &Version, behavior: ArchiveBehavior) -> Self {
        self.archives.insert(archive_key(id, version), behavior);
        self
    }

    /// Make both read operations fail with a transport error
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Delay archive responses, widening the window for coalescing tests
    pub fn with_archive_delay(mut self, delay: Duration) -> Self {
        self.archive_delay = Some(delay);
        self
    }
}

#[async_trait]
impl UpstreamFeed for FakeUpstream {
    async fn list_versions(&self, id: &str, _include_unlisted: bool) -> Result<Vec<Version>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Error::UpstreamError("upstream unreachable".to_string()));
        }
        Ok(self
            .versions
            .get(&id.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_metadata(&self, id: &str) -> Result<Vec<UpstreamMetadataDocument>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Error::UpstreamError("upstream unreachable".to_string()));
        }
        Ok(self
            .metadata
            .get(&id.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_archive(&self, id: &str, version: &Version) -> Result<ArchiveStream> {
        self.archive_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.archive_delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self
            .archives
            .get(&archive_key(id, version))
            .cloned()
            .unwrap_or(ArchiveBehavior::NotFound);

        match behavior {
            ArchiveBehavior::Bytes(data) => {
                let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from(data))];
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
            ArchiveBehavior::NotFound => Err(Error::NotFound(format!("{id} {version}"))),
            ArchiveBehavior::TransportError => {
                Err(Error::UpstreamError("connection refused".to_string()))
            }
            ArchiveBehavior::BrokenStream => {
                let chunks: Vec<Result<Bytes>> = vec![
                    Ok(Bytes::from_static(b"partial data")),
                    Err(Error::UpstreamError("connection reset".to_string())),
                ];
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
        }
    }

    fn name(&self) -> &str {
        "fake-upstream"
    }
}

/// Indexer that counts invocations and returns a fixed outcome
pub struct FakeIndexer {
    outcome: IndexingOutcome,
    pub calls: AtomicUsize,
}

impl FakeIndexer {
    pub fn new(outcome: IndexingOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(IndexingOutcome::Success)
    }
}

#[async_trait]
impl PackageIndexer for FakeIndexer {
    async fn index(&self, archive: &StagedArchive) -> Result<IndexingOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // The archive must be re-readable at indexing time
        let mut handle = archive.reopen().await?;
        let mut contents = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut handle, &mut contents)
            .await
            .map_err(|e| Error::IoError(e.to_string()))?;
        Ok(self.outcome.clone())
    }
}

/// A minimal upstream metadata document
pub fn upstream_doc(id: &str, version: &str, description: &str) -> UpstreamMetadataDocument {
    UpstreamMetadataDocument {
        id: id.to_string(),
        version: version.to_string(),
        description: Some(description.to_string()),
        ..Default::default()
    }
}

/// A minimal local catalog record
pub fn local_package(id: &str, version: Version, description: &str) -> Package {
    Package {
        id: id.to_string(),
        version,
        listed: true,
        authors: vec![],
        description: Some(description.to_string()),
        summary: None,
        title: None,
        tags: vec![],
        icon_url: None,
        license_url: None,
        project_url: None,
        language: None,
        min_client_version: None,
        published: None,
        require_license_acceptance: false,
        downloads: 0,
        has_readme: false,
        dependencies: vec![],
        package_types: vec![],
    }
}
