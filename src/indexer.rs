// src/indexer.rs

//! Package indexing seam
//!
//! The indexing pipeline (archive validation, manifest extraction,
//! persistence into the catalog) lives outside the mirror core; the mirror
//! only needs to hand over a staged archive and observe a discriminated
//! outcome. Non-success outcomes are informational to the mirror — it logs
//! them and never retries.

use crate::error::Result;
use crate::staging::StagedArchive;
use async_trait::async_trait;
use std::fmt;

/// Outcome of submitting an archive to the indexing pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingOutcome {
    /// The package was validated and persisted into the catalog
    Success,
    /// The archive failed validation (corrupt, missing manifest, ...)
    InvalidPackage,
    /// The catalog already holds this exact id+version
    PackageAlreadyExists,
    /// The pipeline failed for another reason, with detail
    Failed(String),
}

impl fmt::Display for IndexingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingOutcome::Success => write!(f, "success"),
            IndexingOutcome::InvalidPackage => write!(f, "invalid package"),
            IndexingOutcome::PackageAlreadyExists => write!(f, "package already exists"),
            IndexingOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Accepts a staged package archive and persists it into the local catalog
///
/// The archive is staged on disk and re-readable: implementations may open
/// it multiple times (validation pass, then storage pass). The caller owns
/// the staging resource and releases it after `index` returns.
#[async_trait]
pub trait PackageIndexer: Send + Sync {
    async fn index(&self, archive: &StagedArchive) -> Result<IndexingOutcome>;
}
