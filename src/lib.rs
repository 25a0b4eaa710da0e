// src/lib.rs

//! Wharf - mirror core for a NuGet-compatible package registry
//!
//! Wharf reconciles a local, authoritative package catalog with a read-only
//! upstream feed. Reads merge both universes (local wins on collisions);
//! a specific package version that is not yet local is lazily mirrored:
//! downloaded from upstream, staged, and handed to the indexing pipeline.
//!
//! # Architecture
//!
//! - Three seams, three traits: [`UpstreamFeed`], [`PackageCatalog`],
//!   [`PackageIndexer`] - everything else is orchestration
//! - Three-valued reads: error / unknown id / result list, never collapsed
//! - Swallow-all mirroring: a mirror failure degrades silently and never
//!   fails the enclosing protocol request
//! - Per-identity singleflight: concurrent mirrors of the same id+version
//!   share one download/index attempt

pub mod catalog;
pub mod config;
mod error;
pub mod identity;
pub mod indexer;
pub mod mirror;
pub mod package;
pub mod staging;
pub mod upstream;

pub use catalog::{LocalCatalog, PackageCatalog};
pub use config::MirrorConfig;
pub use error::{Error, Result};
pub use identity::{parse_version, PackageIdentity};
pub use indexer::{IndexingOutcome, PackageIndexer};
pub use mirror::{MirrorOutcome, MirrorService};
pub use package::{Package, PackageDependency, PackageType};
pub use staging::StagedArchive;
pub use upstream::{NuGetUpstreamClient, UpstreamFeed, UpstreamMetadataDocument};
