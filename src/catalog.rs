// src/catalog.rs

//! Local package catalog
//!
//! The catalog is the authoritative, writable package store owned by this
//! server. The mirror core reads it through the narrow [`PackageCatalog`]
//! trait; [`LocalCatalog`] is the rusqlite-backed implementation. Package ids
//! are matched case-insensitively and versions under semver precedence.

use crate::error::{Error, Result};
use crate::identity::parse_version;
use crate::package::Package;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use semver::{BuildMetadata, Version};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Read access to the local package store
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    /// Whether an exact id+version is already in the catalog
    async fn exists(&self, id: &str, version: &Version) -> Result<bool>;

    /// All local packages for an id, optionally including unlisted ones
    async fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS packages (
    id                          TEXT NOT NULL,
    id_lower                    TEXT NOT NULL,
    version                     TEXT NOT NULL,
    version_key                 TEXT NOT NULL,
    listed                      INTEGER NOT NULL DEFAULT 1,
    authors                     TEXT NOT NULL DEFAULT '[]',
    description                 TEXT,
    summary                     TEXT,
    title                       TEXT,
    tags                        TEXT NOT NULL DEFAULT '[]',
    icon_url                    TEXT,
    license_url                 TEXT,
    project_url                 TEXT,
    language                    TEXT,
    min_client_version          TEXT,
    published                   TEXT,
    require_license_acceptance  INTEGER NOT NULL DEFAULT 0,
    downloads                   INTEGER NOT NULL DEFAULT 0,
    has_readme                  INTEGER NOT NULL DEFAULT 0,
    dependencies                TEXT NOT NULL DEFAULT '[]',
    package_types               TEXT NOT NULL DEFAULT '[]',
    UNIQUE (id_lower, version_key)
);
CREATE INDEX IF NOT EXISTS idx_packages_id_lower ON packages (id_lower);
";

/// SQLite-backed package catalog
pub struct LocalCatalog {
    conn: Mutex<Connection>,
}

impl LocalCatalog {
    /// Open (and initialize) a catalog database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory catalog, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a package record
    ///
    /// The UNIQUE constraint on (id, version) enforces the catalog's
    /// uniqueness guarantee; inserting a duplicate identity is an error.
    pub async fn insert(&self, package: &Package) -> Result<()> {
        let conn = self.conn.lock().await;
        debug!("Inserting package {} {}", package.id, package.version);
        conn.execute(
            "INSERT INTO packages (
                id, id_lower, version, version_key, listed, authors,
                description, summary, title, tags, icon_url, license_url,
                project_url, language, min_client_version, published,
                require_license_acceptance, downloads, has_readme,
                dependencies, package_types
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                package.id,
                package.id.to_ascii_lowercase(),
                package.version.to_string(),
                version_key(&package.version),
                package.listed,
                serde_json::to_string(&package.authors)
                    .map_err(|e| Error::DatabaseError(e.to_string()))?,
                package.description,
                package.summary,
                package.title,
                serde_json::to_string(&package.tags)
                    .map_err(|e| Error::DatabaseError(e.to_string()))?,
                package.icon_url.as_ref().map(Url::as_str),
                package.license_url.as_ref().map(Url::as_str),
                package.project_url.as_ref().map(Url::as_str),
                package.language,
                package.min_client_version,
                package.published.map(|t| t.to_rfc3339()),
                package.require_license_acceptance,
                package.downloads as i64,
                package.has_readme,
                serde_json::to_string(&package.dependencies)
                    .map_err(|e| Error::DatabaseError(e.to_string()))?,
                serde_json::to_string(&package.package_types)
                    .map_err(|e| Error::DatabaseError(e.to_string()))?,
            ],
        )?;
        Ok(())
    }

    /// Number of packages in the catalog
    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Precedence-normalized version string used as the uniqueness key
fn version_key(version: &Version) -> String {
    let mut key = version.clone();
    key.build = BuildMetadata::EMPTY;
    key.to_string()
}

fn row_to_package(row: &Row<'_>) -> rusqlite::Result<Package> {
    let version_str: String = row.get("version")?;
    let version = parse_version(&version_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        )
    })?;

    let authors: String = row.get("authors")?;
    let tags: String = row.get("tags")?;
    let dependencies: String = row.get("dependencies")?;
    let package_types: String = row.get("package_types")?;
    let published: Option<String> = row.get("published")?;

    Ok(Package {
        id: row.get("id")?,
        version,
        listed: row.get("listed")?,
        authors: serde_json::from_str(&authors).unwrap_or_default(),
        description: row.get("description")?,
        summary: row.get("summary")?,
        title: row.get("title")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        icon_url: row
            .get::<_, Option<String>>("icon_url")?
            .and_then(|s| Url::parse(&s).ok()),
        license_url: row
            .get::<_, Option<String>>("license_url")?
            .and_then(|s| Url::parse(&s).ok()),
        project_url: row
            .get::<_, Option<String>>("project_url")?
            .and_then(|s| Url::parse(&s).ok()),
        language: row.get("language")?,
        min_client_version: row.get("min_client_version")?,
        published: published
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
        require_license_acceptance: row.get("require_license_acceptance")?,
        downloads: row.get::<_, i64>("downloads")? as u64,
        has_readme: row.get("has_readme")?,
        dependencies: serde_json::from_str(&dependencies).unwrap_or_default(),
        package_types: serde_json::from_str(&package_types).unwrap_or_default(),
    })
}

#[async_trait]
impl PackageCatalog for LocalCatalog {
    async fn exists(&self, id: &str, version: &Version) -> Result<bool> {
        let conn = self.conn.lock().await;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM packages WHERE id_lower = ?1 AND version_key = ?2",
                params![id.to_ascii_lowercase(), version_key(version)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM packages WHERE id_lower = ?1 AND (listed = 1 OR ?2)",
        )?;
        let packages = stmt
            .query_map(params![id.to_ascii_lowercase(), include_unlisted], |row| {
                row_to_package(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package(id: &str, version: Version, listed: bool) -> Package {
        Package {
            id: id.to_string(),
            version,
            listed,
            authors: vec!["Alice".to_string()],
            description: Some("A test package".to_string()),
            summary: None,
            title: None,
            tags: vec!["test".to_string()],
            icon_url: None,
            license_url: None,
            project_url: Url::parse("https://example.test/project").ok(),
            language: None,
            min_client_version: None,
            published: Some(Utc::now()),
            require_license_acceptance: false,
            downloads: 0,
            has_readme: false,
            dependencies: vec![crate::package::PackageDependency::framework_sentinel(
                "net6.0",
            )],
            package_types: vec![],
        }
    }

    #[tokio::test]
    async fn test_exists_is_case_insensitive() {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        catalog
            .insert(&sample_package("Demo.Package", Version::new(1, 0, 0), true))
            .await
            .unwrap();

        assert!(catalog
            .exists("demo.package", &Version::new(1, 0, 0))
            .await
            .unwrap());
        assert!(catalog
            .exists("DEMO.PACKAGE", &Version::new(1, 0, 0))
            .await
            .unwrap());
        assert!(!catalog
            .exists("demo.package", &Version::new(2, 0, 0))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_exists_ignores_build_metadata() {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        catalog
            .insert(&sample_package(
                "demo",
                parse_version("1.0.0+sha.abc").unwrap(),
                true,
            ))
            .await
            .unwrap();

        assert!(catalog.exists("demo", &Version::new(1, 0, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_filters_unlisted() {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        catalog
            .insert(&sample_package("demo", Version::new(1, 0, 0), true))
            .await
            .unwrap();
        catalog
            .insert(&sample_package("demo", Version::new(2, 0, 0), false))
            .await
            .unwrap();

        let all = catalog.find("Demo", true).await.unwrap();
        assert_eq!(all.len(), 2);

        let listed = catalog.find("Demo", false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].version, Version::new(1, 0, 0));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_sentinel_dependency() {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        catalog
            .insert(&sample_package("demo", Version::new(1, 0, 0), true))
            .await
            .unwrap();

        let found = catalog.find("demo", true).await.unwrap();
        assert_eq!(found[0].dependencies.len(), 1);
        assert!(found[0].dependencies[0].is_sentinel());
        assert_eq!(
            found[0].dependencies[0].target_framework.as_deref(),
            Some("net6.0")
        );
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        let pkg = sample_package("demo", Version::new(1, 0, 0), true);
        catalog.insert(&pkg).await.unwrap();
        assert!(catalog.insert(&pkg).await.is_err());
    }
}
