// src/identity.rs

//! Package identity: case-insensitive id plus semantic version
//!
//! The identity is the dedup/merge key everywhere in the mirror core. Two
//! identities are equal iff the ids compare equal ignoring ASCII case and
//! the versions compare equal under semver *precedence* (build metadata does
//! not participate). Hash agrees with Eq so identities can key maps.

use crate::error::{Error, Result};
use semver::{BuildMetadata, Version};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The (id, version) pair uniquely identifying a package
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    pub id: String,
    pub version: Version,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Lowercased id, the canonical form for lookups and upstream URLs
    pub fn id_lowercase(&self) -> String {
        self.id.to_ascii_lowercase()
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
            && self.version.cmp_precedence(&other.version) == Ordering::Equal
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_ascii_lowercase().hash(state);
        precedence_key(&self.version).to_string().hash(state);
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Strip build metadata so string comparison matches precedence comparison
fn precedence_key(v: &Version) -> Version {
    let mut key = v.clone();
    key.build = BuildMetadata::EMPTY;
    key
}

/// True when two versions are the same under semver precedence
pub fn versions_equal(a: &Version, b: &Version) -> bool {
    a.cmp_precedence(b) == Ordering::Equal
}

/// Parse a version string as upstream feeds serve them
///
/// Accepts strict semver plus the short and legacy four-part forms NuGet
/// normalizes away:
/// - "1" → 1.0.0, "1.2" → 1.2.0
/// - "1.2.3.0" → 1.2.3 (zero revision dropped)
/// - "1.2.3.4" → 1.2.3+4 (nonzero revision kept as build metadata)
///
/// Pre-release and build suffixes survive padding ("1.2-beta" → 1.2.0-beta).
pub fn parse_version(input: &str) -> Result<Version> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::ParseError("empty version string".to_string()));
    }

    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    // Split off any pre-release/build suffix before counting components
    let suffix_start = s.find(['-', '+']).unwrap_or(s.len());
    let (numeric, suffix) = s.split_at(suffix_start);

    let parts: Vec<&str> = numeric.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], suffix),
        2 => format!("{}.{}.0{}", parts[0], parts[1], suffix),
        4 if suffix.is_empty() => {
            let revision = parts[3].parse::<u64>().map_err(|e| {
                Error::ParseError(format!("invalid revision in version '{input}': {e}"))
            })?;
            if revision == 0 {
                format!("{}.{}.{}", parts[0], parts[1], parts[2])
            } else {
                format!("{}.{}.{}+{}", parts[0], parts[1], parts[2], revision)
            }
        }
        _ => s.to_string(),
    };

    Version::parse(&normalized)
        .map_err(|e| Error::ParseError(format!("invalid version '{input}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_strict_semver() {
        assert_eq!(parse_version("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(
            parse_version("1.2.3-beta.1").unwrap().pre.as_str(),
            "beta.1"
        );
    }

    #[test]
    fn test_parse_short_versions_padded() {
        assert_eq!(parse_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_version("1.2-rc1").unwrap().pre.as_str(), "rc1");
    }

    #[test]
    fn test_parse_four_part_versions() {
        assert_eq!(parse_version("1.2.3.0").unwrap(), Version::new(1, 2, 3));
        let v = parse_version("1.2.3.4").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.build.as_str(), "4");
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(parse_version("").is_err());
        assert!(parse_version("not-a-version").is_err());
    }

    #[test]
    fn test_identity_case_insensitive_id() {
        let a = PackageIdentity::new("Newtonsoft.Json", Version::new(13, 0, 1));
        let b = PackageIdentity::new("newtonsoft.json", Version::new(13, 0, 1));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_identity_ignores_build_metadata() {
        let a = PackageIdentity::new("pkg", parse_version("1.0.0+sha.abc").unwrap());
        let b = PackageIdentity::new("pkg", parse_version("1.0.0").unwrap());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_identity_distinct_versions() {
        let a = PackageIdentity::new("pkg", Version::new(1, 0, 0));
        let b = PackageIdentity::new("pkg", Version::new(2, 0, 0));
        assert_ne!(a, b);
    }
}
