// 🧬 Identity Resolver - The same gene across assembly versions
// Groups identifiers that share a cross-reference linking name.
//
// Built once per run (O(n) index), then read-only with O(1) lookups.
// An identifier without any cross-reference row is its own singleton cluster.

use crate::error::{NamingError, NamingResult};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// ASSEMBLY VERSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssemblyVersion {
    /// B73 RefGen_v3 (GRMZM...)
    V3,

    /// B73 RefGen_v4 (Zm00001d...)
    V4,

    /// B73 RefGen_v5 (Zm00001eb...)
    V5,
}

impl AssemblyVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyVersion::V3 => "v3",
            AssemblyVersion::V4 => "v4",
            AssemblyVersion::V5 => "v5",
        }
    }

    /// Derive the version tag from the identifier's prefix pattern
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        if identifier.starts_with("Zm00001eb") {
            Some(AssemblyVersion::V5)
        } else if identifier.starts_with("Zm00001d") {
            Some(AssemblyVersion::V4)
        } else if identifier.starts_with("GRMZM") {
            Some(AssemblyVersion::V3)
        } else {
            None
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw identifier from the association table.
///
/// Returns `Ok(None)` for identifiers that are deliberately dropped
/// (blank cells, retired v1/v2 assemblies). `B73v3_` ids lose their tag.
/// Anything with an unknown prefix is fatal.
pub fn normalize_identifier(raw: &str) -> NamingResult<Option<String>> {
    let id = raw.trim();

    if id.is_empty() || id.starts_with("B73v1_") || id.starts_with("B73v2_") {
        return Ok(None);
    }

    if let Some(stripped) = id.strip_prefix("B73v3_") {
        return Ok(Some(stripped.to_string()));
    }

    match AssemblyVersion::from_identifier(id) {
        Some(_) => Ok(Some(id.to_string())),
        None => Err(NamingError::UnrecognizedIdentifier {
            identifier: id.to_string(),
        }),
    }
}

// ============================================================================
// CROSS-REFERENCE ROWS & CLUSTER KEYS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub identifier: String,
    pub linking_name: String,
}

impl CrossReference {
    pub fn new(identifier: impl Into<String>, linking_name: impl Into<String>) -> Self {
        CrossReference {
            identifier: identifier.into(),
            linking_name: linking_name.into(),
        }
    }
}

/// Key identifying one identity cluster.
///
/// Linked and singleton keys live in separate namespaces so an identifier
/// that happens to equal some linking name never merges with that cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterKey {
    Linked(String),
    Singleton(String),
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Linked(name) => write!(f, "{}", name),
            ClusterKey::Singleton(id) => write!(f, "{} (unlinked)", id),
        }
    }
}

/// An identifier listed under two different linking names.
/// The later row wins; the earlier link is reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkWarning {
    pub identifier: String,
    pub previous_link: String,
    pub current_link: String,
}

// ============================================================================
// IDENTITY RESOLVER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    /// identifier -> linking name
    link_of: HashMap<String, String>,

    /// linking name -> members, in first-seen order
    members: IndexMap<String, IndexSet<String>>,

    warnings: Vec<LinkWarning>,
}

impl IdentityResolver {
    /// Empty resolver: every identifier is a singleton
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from cross-reference rows (last write wins)
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CrossReference>,
    {
        let mut resolver = IdentityResolver::new();

        for row in rows {
            let CrossReference {
                identifier,
                linking_name,
            } = row;

            if let Some(previous) = resolver.link_of.insert(identifier.clone(), linking_name.clone()) {
                if previous != linking_name {
                    warn!(
                        "Identifier {} linked under both {} and {}; keeping {}",
                        identifier, previous, linking_name, linking_name
                    );
                    if let Some(old_members) = resolver.members.get_mut(&previous) {
                        old_members.shift_remove(&identifier);
                        if old_members.is_empty() {
                            resolver.members.shift_remove(&previous);
                        }
                    }
                    resolver.warnings.push(LinkWarning {
                        identifier: identifier.clone(),
                        previous_link: previous,
                        current_link: linking_name.clone(),
                    });
                }
            }

            resolver
                .members
                .entry(linking_name)
                .or_default()
                .insert(identifier);
        }

        debug!(
            "Identity index built: {} identifiers in {} clusters ({} ambiguous links)",
            resolver.link_of.len(),
            resolver.members.len(),
            resolver.warnings.len()
        );

        resolver
    }

    /// All identifiers denoting the same gene as `identifier` (itself included)
    pub fn resolve(&self, identifier: &str) -> IndexSet<String> {
        match self.link_of.get(identifier).and_then(|link| self.members.get(link)) {
            Some(members) => members.clone(),
            None => {
                let mut singleton = IndexSet::with_capacity(1);
                singleton.insert(identifier.to_string());
                singleton
            }
        }
    }

    /// Cluster key for `identifier`
    pub fn cluster_key(&self, identifier: &str) -> ClusterKey {
        match self.link_of.get(identifier) {
            Some(link) => ClusterKey::Linked(link.clone()),
            None => ClusterKey::Singleton(identifier.to_string()),
        }
    }

    pub fn linking_name(&self, identifier: &str) -> Option<&str> {
        self.link_of.get(identifier).map(String::as_str)
    }

    pub fn are_linked(&self, a: &str, b: &str) -> bool {
        a == b || self.cluster_key(a) == self.cluster_key(b)
    }

    pub fn warnings(&self) -> &[LinkWarning] {
        &self.warnings
    }

    pub fn identifier_count(&self) -> usize {
        self.link_of.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.members.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_resolver() -> IdentityResolver {
        IdentityResolver::build(vec![
            CrossReference::new("GRMZM2G000001", "gene1"),
            CrossReference::new("Zm00001d000001", "gene1"),
            CrossReference::new("Zm00001eb000001", "gene1"),
            CrossReference::new("GRMZM2G000002", "gene2"),
        ])
    }

    #[test]
    fn test_unlinked_identifier_is_singleton() {
        let resolver = create_test_resolver();
        let cluster = resolver.resolve("X1");

        assert_eq!(cluster.len(), 1);
        assert!(cluster.contains("X1"));
        assert_eq!(resolver.cluster_key("X1"), ClusterKey::Singleton("X1".to_string()));
    }

    #[test]
    fn test_linked_identifiers_share_cluster() {
        let resolver = create_test_resolver();
        let cluster = resolver.resolve("Zm00001d000001");

        let members: Vec<&str> = cluster.iter().map(String::as_str).collect();
        assert_eq!(members, vec!["GRMZM2G000001", "Zm00001d000001", "Zm00001eb000001"]);
        assert!(resolver.are_linked("GRMZM2G000001", "Zm00001eb000001"));
        assert!(!resolver.are_linked("GRMZM2G000001", "GRMZM2G000002"));
        assert_eq!(resolver.cluster_count(), 2);
    }

    #[test]
    fn test_ambiguous_link_last_write_wins() {
        let resolver = IdentityResolver::build(vec![
            CrossReference::new("GRMZM2G000001", "gene1"),
            CrossReference::new("GRMZM2G000009", "gene1"),
            CrossReference::new("GRMZM2G000001", "gene2"),
        ]);

        assert_eq!(resolver.linking_name("GRMZM2G000001"), Some("gene2"));
        assert!(!resolver.resolve("GRMZM2G000009").contains("GRMZM2G000001"));
        assert_eq!(resolver.warnings().len(), 1);
        assert_eq!(resolver.warnings()[0].previous_link, "gene1");
        assert_eq!(resolver.warnings()[0].current_link, "gene2");
    }

    #[test]
    fn test_duplicate_row_is_not_ambiguous() {
        let resolver = IdentityResolver::build(vec![
            CrossReference::new("GRMZM2G000001", "gene1"),
            CrossReference::new("GRMZM2G000001", "gene1"),
        ]);

        assert!(resolver.warnings().is_empty());
        assert_eq!(resolver.resolve("GRMZM2G000001").len(), 1);
    }

    #[test]
    fn test_linking_name_never_collides_with_singleton() {
        let resolver = IdentityResolver::build(vec![CrossReference::new("GRMZM2G000001", "GRMZM2G000777")]);

        assert!(!resolver.are_linked("GRMZM2G000777", "GRMZM2G000001"));
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  ").unwrap(), None);
        assert_eq!(normalize_identifier("B73v1_AC1234").unwrap(), None);
        assert_eq!(normalize_identifier("B73v2_AC1234").unwrap(), None);
        assert_eq!(
            normalize_identifier("B73v3_GRMZM2G000001").unwrap(),
            Some("GRMZM2G000001".to_string())
        );
        assert_eq!(
            normalize_identifier("Zm00001eb000010\n").unwrap(),
            Some("Zm00001eb000010".to_string())
        );

        let err = normalize_identifier("AT1G01010").unwrap_err();
        assert_eq!(
            err,
            NamingError::UnrecognizedIdentifier {
                identifier: "AT1G01010".to_string()
            }
        );
    }

    #[test]
    fn test_assembly_version_from_identifier() {
        assert_eq!(AssemblyVersion::from_identifier("GRMZM2G000001"), Some(AssemblyVersion::V3));
        assert_eq!(AssemblyVersion::from_identifier("Zm00001d000001"), Some(AssemblyVersion::V4));
        assert_eq!(AssemblyVersion::from_identifier("Zm00001eb000001"), Some(AssemblyVersion::V5));
        assert_eq!(AssemblyVersion::from_identifier("AC1234"), None);
    }
}
