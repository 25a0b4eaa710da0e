// src/upstream/client.rs

//! NuGet v3 upstream client
//!
//! Talks to a v3 feed through two resources resolved from the service
//! index: the flat container (version lists, archive downloads) and the
//! registration hive (per-version metadata documents).

use crate::config::MirrorConfig;
use crate::error::{Error, Result};
use crate::identity::parse_version;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use semver::{BuildMetadata, Version};
use tracing::{debug, warn};

use super::types::{
    RegistrationIndex, RegistrationPage, ServiceIndex, UpstreamMetadataDocument, VersionIndex,
};
use super::{ArchiveStream, UpstreamFeed};

/// Service index resource type for the flat container
const FLAT_CONTAINER_TYPE: &str = "PackageBaseAddress/3.0.0";
/// Service index resource type prefix for the registration hive
const REGISTRATION_TYPE_PREFIX: &str = "RegistrationsBaseUrl";

/// Upstream feed client for NuGet v3 protocol feeds
pub struct NuGetUpstreamClient {
    client: reqwest::Client,
    flat_container_url: String,
    registration_url: String,
}

impl NuGetUpstreamClient {
    /// Create a client with explicit resource base URLs
    pub fn new(
        flat_container_url: &str,
        registration_url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InitError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            flat_container_url: flat_container_url.trim_end_matches('/').to_string(),
            registration_url: registration_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client by resolving resource URLs from the feed's service index
    pub async fn from_service_index(config: &MirrorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| Error::InitError(format!("failed to create HTTP client: {e}")))?;

        debug!("Resolving upstream service index: {}", config.upstream_url);
        let index: ServiceIndex = client
            .get(&config.upstream_url)
            .send()
            .await
            .map_err(|e| Error::UpstreamError(format!("failed to fetch service index: {e}")))?
            .error_for_status()
            .map_err(|e| Error::UpstreamError(format!("service index returned error: {e}")))?
            .json()
            .await
            .map_err(|e| Error::ParseError(format!("malformed service index: {e}")))?;

        let flat = index
            .resources
            .iter()
            .find(|r| r.resource_type == FLAT_CONTAINER_TYPE)
            .map(|r| r.url.clone())
            .ok_or_else(|| {
                Error::InitError(format!(
                    "upstream service index has no {FLAT_CONTAINER_TYPE} resource"
                ))
            })?;
        let registration = index
            .resources
            .iter()
            .find(|r| r.resource_type.starts_with(REGISTRATION_TYPE_PREFIX))
            .map(|r| r.url.clone())
            .ok_or_else(|| {
                Error::InitError(format!(
                    "upstream service index has no {REGISTRATION_TYPE_PREFIX} resource"
                ))
            })?;

        Ok(Self {
            client,
            flat_container_url: flat.trim_end_matches('/').to_string(),
            registration_url: registration.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one registration page's leaves, following the page URL when the
    /// leaves are not inlined in the index document
    async fn page_documents(
        &self,
        page: RegistrationPage,
    ) -> Result<Vec<UpstreamMetadataDocument>> {
        let leaves = match page.items {
            Some(items) => items,
            None => {
                debug!("Fetching registration page: {}", page.url);
                let fetched: RegistrationPage = self
                    .client
                    .get(&page.url)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::UpstreamError(format!(
                            "failed to fetch registration page {}: {e}",
                            page.url
                        ))
                    })?
                    .error_for_status()
                    .map_err(|e| {
                        Error::UpstreamError(format!(
                            "registration page {} returned error: {e}",
                            page.url
                        ))
                    })?
                    .json()
                    .await
                    .map_err(|e| {
                        Error::ParseError(format!(
                            "malformed registration page {}: {e}",
                            page.url
                        ))
                    })?;
                fetched.items.unwrap_or_default()
            }
        };
        Ok(leaves.into_iter().map(|leaf| leaf.catalog_entry).collect())
    }
}

/// NuGet URLs use the lowercased id and the normalized (build-metadata-free)
/// version string
fn normalized_version(version: &Version) -> String {
    let mut v = version.clone();
    v.build = BuildMetadata::EMPTY;
    v.to_string()
}

#[async_trait]
impl UpstreamFeed for NuGetUpstreamClient {
    async fn list_versions(&self, id: &str, include_unlisted: bool) -> Result<Vec<Version>> {
        let id_lower = id.to_ascii_lowercase();
        let url = format!("{}/{}/index.json", self.flat_container_url, id_lower);
        debug!("Listing upstream versions: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamError(format!("failed to list versions of {id}: {e}")))?;

        // Unknown id is an empty list, not an error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Error::UpstreamError(format!(
                "version index for {id} returned HTTP {}",
                response.status()
            )));
        }

        let index: VersionIndex = response
            .json()
            .await
            .map_err(|e| Error::ParseError(format!("malformed version index for {id}: {e}")))?;

        let mut versions = Vec::with_capacity(index.versions.len());
        for raw in &index.versions {
            match parse_version(raw) {
                Ok(v) => versions.push(v),
                Err(e) => warn!("Skipping unparsable upstream version {raw} of {id}: {e}"),
            }
        }

        if !include_unlisted {
            // The flat container has no listed flags; filter through metadata
            let docs = self.get_metadata(id).await?;
            versions.retain(|v| {
                docs.iter().any(|d| {
                    d.listed.unwrap_or(true)
                        && parse_version(&d.version)
                            .map(|dv| dv.cmp_precedence(v) == std::cmp::Ordering::Equal)
                            .unwrap_or(false)
                })
            });
        }

        Ok(versions)
    }

    async fn get_metadata(&self, id: &str) -> Result<Vec<UpstreamMetadataDocument>> {
        let id_lower = id.to_ascii_lowercase();
        let url = format!("{}/{}/index.json", self.registration_url, id_lower);
        debug!("Fetching upstream metadata: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamError(format!("failed to fetch metadata of {id}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Error::UpstreamError(format!(
                "registration index for {id} returned HTTP {}",
                response.status()
            )));
        }

        let index: RegistrationIndex = response.json().await.map_err(|e| {
            Error::ParseError(format!("malformed registration index for {id}: {e}"))
        })?;

        let mut documents = Vec::new();
        for page in index.items {
            documents.extend(self.page_documents(page).await?);
        }
        Ok(documents)
    }

    async fn get_archive(&self, id: &str, version: &Version) -> Result<ArchiveStream> {
        let id_lower = id.to_ascii_lowercase();
        let version_str = normalized_version(version);
        let url = format!(
            "{}/{}/{}/{}.{}.nupkg",
            self.flat_container_url, id_lower, version_str, id_lower, version_str
        );
        debug!("Downloading upstream archive: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                Error::UpstreamError(format!("failed to download {id} {version}: {e}"))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{id} {version}")));
        }
        if !response.status().is_success() {
            return Err(Error::UpstreamError(format!(
                "archive download for {id} {version} returned HTTP {}",
                response.status()
            )));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| Error::UpstreamError(format!("archive stream failed: {e}")))
        });
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "nuget-v3"
    }
}
