// src/mirror/translate.rs

//! Metadata translation
//!
//! Converts upstream's native metadata document into the canonical
//! [`Package`] record so results from both sources are interchangeable to
//! callers. Field-level problems (malformed URLs, empty author tokens) are
//! dropped silently and never abort translation of the rest of the package;
//! only an unusable version string fails the whole document.

use crate::error::Result;
use crate::identity::parse_version;
use crate::package::{Package, PackageDependency, PackageType};
use crate::upstream::{TagField, UpstreamDependencyGroup, UpstreamMetadataDocument};
use url::Url;

/// Characters separating authors in upstream's free-text field
const AUTHOR_SEPARATORS: [char; 5] = [',', ';', '\t', '\n', '\r'];

/// Translate an upstream metadata document into a canonical package record
///
/// Freshly-mirrored packages always start with zero downloads and no readme;
/// both are local-catalog concerns upstream knows nothing about.
pub fn to_package(doc: &UpstreamMetadataDocument) -> Result<Package> {
    let version = parse_version(&doc.version)?;

    Ok(Package {
        id: doc.id.clone(),
        version,
        listed: doc.listed.unwrap_or(true),
        authors: split_authors(doc.authors.as_deref()),
        description: doc.description.clone(),
        summary: doc.summary.clone(),
        title: doc.title.clone(),
        tags: split_tags(doc.tags.as_ref()),
        icon_url: parse_absolute_url(doc.icon_url.as_deref()),
        license_url: parse_absolute_url(doc.license_url.as_deref()),
        project_url: parse_absolute_url(doc.project_url.as_deref()),
        language: doc.language.clone(),
        min_client_version: doc.min_client_version.clone(),
        published: doc.published,
        require_license_acceptance: doc.require_license_acceptance.unwrap_or(false),
        downloads: 0,
        has_readme: false,
        dependencies: flatten_dependencies(doc.dependency_groups.as_deref()),
        package_types: doc
            .package_types
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|t| {
                t.name.as_ref().map(|name| PackageType {
                    name: name.clone(),
                    version: t.version.clone(),
                })
            })
            .collect(),
    })
}

/// Split upstream's single free-text authors field into an ordered list
///
/// Splits on comma, semicolon, tab, and both newline variants; trims each
/// token and drops empties. Null or empty input yields an empty list.
pub fn split_authors(authors: Option<&str>) -> Vec<String> {
    match authors {
        None => Vec::new(),
        Some(text) => text
            .split(AUTHOR_SEPARATORS)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Tags arrive either as a space-separated string or a list
fn split_tags(tags: Option<&TagField>) -> Vec<String> {
    match tags {
        None => Vec::new(),
        Some(TagField::Text(text)) => text.split_whitespace().map(str::to_string).collect(),
        Some(TagField::List(list)) => list
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Keep a URL field only if it parses as a well-formed absolute URI
///
/// Anything else is silently absent; a malformed URL never fails translation.
fn parse_absolute_url(raw: Option<&str>) -> Option<Url> {
    Url::parse(raw?.trim()).ok()
}

/// Tagged dependency group, internal to translation
///
/// The catalog boundary expects the flattened sentinel-row shape, so this
/// explicit representation never leaves this module.
struct DependencyGroup<'a> {
    target_framework: Option<&'a str>,
    dependencies: &'a [crate::upstream::UpstreamDependency],
}

/// Flatten dependency groups into catalog rows
///
/// A group with zero dependencies becomes exactly one sentinel row carrying
/// its framework moniker, so the compatibility entry is not lost. No groups
/// at all means an empty list, with no sentinel.
fn flatten_dependencies(groups: Option<&[UpstreamDependencyGroup]>) -> Vec<PackageDependency> {
    let Some(groups) = groups else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for group in groups.iter().map(|g| DependencyGroup {
        target_framework: g.target_framework.as_deref(),
        dependencies: g.dependencies.as_deref().unwrap_or_default(),
    }) {
        if group.dependencies.is_empty() {
            rows.push(PackageDependency {
                id: None,
                version_range: None,
                target_framework: group.target_framework.map(str::to_string),
            });
            continue;
        }
        for dep in group.dependencies {
            rows.push(PackageDependency {
                id: dep.id.clone(),
                version_range: dep.range.clone(),
                target_framework: group.target_framework.map(str::to_string),
            });
        }
    }
    rows
}
