// src/upstream/types.rs

//! Upstream feed wire models
//!
//! Shapes of the NuGet v3 documents the upstream client consumes: the
//! flat-container version index and the registration index/page/leaf
//! hierarchy. The metadata document is upstream's native representation of a
//! package; it is translated into a [`Package`](crate::package::Package) by
//! the metadata translator, never stored directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream's native metadata for one package version
///
/// Raw strings throughout: authors are a single free-text field, URLs are
/// unvalidated, versions are unparsed. Translation is where those become
/// structured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamMetadataDocument {
    pub id: String,
    pub version: String,
    /// Single free-text field, e.g. "Alice, Bob; Carol"
    pub authors: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub license_url: Option<String>,
    pub project_url: Option<String>,
    pub listed: Option<bool>,
    pub language: Option<String>,
    pub min_client_version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub require_license_acceptance: Option<bool>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub tags: Option<TagField>,
    /// Absent field means "no dependency information at all", which is
    /// distinct from a present group with zero dependencies
    pub dependency_groups: Option<Vec<UpstreamDependencyGroup>>,
    pub package_types: Option<Vec<UpstreamPackageType>>,
}

/// Tags arrive either as a single space-separated string (older feeds) or as
/// a proper list (v3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagField {
    Text(String),
    List(Vec<String>),
}

/// One dependency group, scoped by target framework moniker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamDependencyGroup {
    pub target_framework: Option<String>,
    pub dependencies: Option<Vec<UpstreamDependency>>,
}

/// One dependency inside a group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamDependency {
    pub id: Option<String>,
    pub range: Option<String>,
}

/// Declared package type as upstream serves it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamPackageType {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Flat-container `{id}/index.json`: every version ever published,
/// including unlisted ones
#[derive(Debug, Deserialize)]
pub struct VersionIndex {
    pub versions: Vec<String>,
}

/// Registration index: pages of leaves, possibly inlined
#[derive(Debug, Deserialize)]
pub struct RegistrationIndex {
    #[serde(default)]
    pub items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationPage {
    #[serde(rename = "@id")]
    pub url: String,
    /// Present when the page's leaves are inlined in the index document
    pub items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationLeaf {
    pub catalog_entry: UpstreamMetadataDocument,
}

/// Service index: maps resource types to base URLs
#[derive(Debug, Deserialize)]
pub struct ServiceIndex {
    #[serde(default)]
    pub resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceResource {
    #[serde(rename = "@id")]
    pub url: String,
    #[serde(rename = "@type")]
    pub resource_type: String,
}
