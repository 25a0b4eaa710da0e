// src/upstream/mod.rs

//! Upstream feed abstraction
//!
//! The mirror core consumes a read-only upstream package source through this
//! trait. The contract the mirror state machine leans on: every operation
//! fails with [`Error::NotFound`] when the resource does not exist upstream,
//! and with any other variant for transport/protocol failures — callers
//! branch on that distinction.

mod client;
pub mod types;

pub use client::NuGetUpstreamClient;
pub use types::{
    TagField, UpstreamDependency, UpstreamDependencyGroup, UpstreamMetadataDocument,
    UpstreamPackageType,
};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use semver::Version;
use std::pin::Pin;

/// Byte stream of a package archive being downloaded
pub type ArchiveStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A read-only upstream package feed
#[async_trait]
pub trait UpstreamFeed: Send + Sync {
    /// List every version of a package id
    ///
    /// An empty list means upstream has no record of this id (not an error).
    /// With `include_unlisted` false, delisted versions are filtered out.
    async fn list_versions(&self, id: &str, include_unlisted: bool) -> Result<Vec<Version>>;

    /// Fetch upstream's metadata documents for every version of an id
    ///
    /// An empty list means upstream has no record of this id.
    async fn get_metadata(&self, id: &str) -> Result<Vec<UpstreamMetadataDocument>>;

    /// Stream the raw package archive for an exact id+version
    ///
    /// Fails with [`Error::NotFound`](crate::error::Error::NotFound) when
    /// upstream does not have that exact version.
    async fn get_archive(&self, id: &str, version: &Version) -> Result<ArchiveStream>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
