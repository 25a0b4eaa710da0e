// src/package.rs

//! Canonical package records
//!
//! These are the shapes the local catalog persists and the protocol layer
//! serves. The mirror core only ever constructs transient instances for
//! packages it has not yet persisted; once a package is in the catalog it is
//! read-only from this crate's perspective.

use crate::identity::PackageIdentity;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

/// The canonical package record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub version: Version,
    pub listed: bool,
    /// Ordered author list (already split from upstream free text)
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    /// Absent unless the upstream value was a well-formed absolute URI
    pub icon_url: Option<Url>,
    pub license_url: Option<Url>,
    pub project_url: Option<Url>,
    pub language: Option<String>,
    pub min_client_version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub require_license_acceptance: bool,
    pub downloads: u64,
    pub has_readme: bool,
    pub dependencies: Vec<PackageDependency>,
    pub package_types: Vec<PackageType>,
}

impl Package {
    /// The (id, version) key this package merges/dedups under
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.id.clone(), self.version.clone())
    }
}

/// One flattened dependency row
///
/// A target framework with zero real dependencies is represented by exactly
/// one row with absent id and range. That sentinel distinguishes "this
/// framework has no dependencies" from "no dependency information at all"
/// and must survive round-trips through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    pub id: Option<String>,
    pub version_range: Option<String>,
    pub target_framework: Option<String>,
}

impl PackageDependency {
    /// A sentinel row marking a framework group with no dependencies
    pub fn framework_sentinel(target_framework: impl Into<String>) -> Self {
        Self {
            id: None,
            version_range: None,
            target_framework: Some(target_framework.into()),
        }
    }

    /// True when this row is a framework sentinel rather than a real dependency
    pub fn is_sentinel(&self) -> bool {
        self.id.is_none() && self.version_range.is_none()
    }
}

/// Declared package type (e.g. "Dependency", "DotnetTool")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageType {
    pub name: String,
    pub version: Option<String>,
}
