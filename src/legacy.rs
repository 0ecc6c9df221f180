// 📜 Legacy Names - The previous naming generation
// Read-only within a run. Every name must end in a numeric suffix;
// the suffix drives continuity and the per-family counters.

use crate::error::{NamingError, NamingResult};
use crate::identity::IdentityResolver;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

// ============================================================================
// NAME PARSING
// ============================================================================

/// Split "ZmERFAP2_21" into ("ZmERFAP2_", 21)
pub fn split_name(name: &str) -> NamingResult<(&str, u32)> {
    let missing = || NamingError::MissingNameSuffix {
        name: name.to_string(),
    };

    let prefix_len = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if prefix_len == name.len() {
        return Err(missing());
    }

    let suffix = name[prefix_len..]
        .parse::<u32>()
        .map_err(|_| NamingError::SuffixOutOfRange {
            name: name.to_string(),
        })?;
    Ok((&name[..prefix_len], suffix))
}

// ============================================================================
// LEGACY ROWS
// ============================================================================

/// A row of the legacy name table as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRow {
    pub name: String,
    pub family: String,

    #[serde(default)]
    pub accepted: String,

    #[serde(default)]
    pub synonym: String,

    /// Identifier the name was attached to (a v3 gene id in the old registry)
    #[serde(alias = "v3_id", alias = "gene_id")]
    pub alias_identifier: String,
}

impl LegacyRow {
    pub fn new(name: &str, family: &str, alias_identifier: &str) -> Self {
        LegacyRow {
            name: name.to_string(),
            family: family.to_string(),
            accepted: String::new(),
            synonym: String::new(),
            alias_identifier: alias_identifier.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyName {
    pub name: String,
    pub family: String,
    pub prefix: String,
    pub suffix: u32,
    pub gene_id: String,
    pub accepted: String,
    pub synonym: String,
}

impl LegacyName {
    pub fn from_row(row: &LegacyRow) -> NamingResult<Self> {
        let name = row.name.trim();
        let (prefix, suffix) = split_name(name)?;

        Ok(LegacyName {
            name: name.to_string(),
            family: row.family.trim().to_string(),
            prefix: prefix.to_string(),
            suffix,
            gene_id: row.alias_identifier.trim().to_string(),
            accepted: row.accepted.trim().to_string(),
            synonym: row.synonym.trim().to_string(),
        })
    }
}

// ============================================================================
// LEGACY REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LegacyRegistry {
    names: Vec<LegacyName>,
    by_gene: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, usize>,
}

impl LegacyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from table rows. Blank names are skipped; a name without a
    /// numeric suffix aborts.
    pub fn from_rows(rows: &[LegacyRow]) -> NamingResult<Self> {
        let mut registry = LegacyRegistry::new();

        for row in rows {
            if row.name.trim().is_empty() {
                debug!("Skipping legacy row without a name ({})", row.alias_identifier);
                continue;
            }
            registry.register(LegacyName::from_row(row)?);
        }

        debug!(
            "Legacy registry: {} names across {} genes",
            registry.names.len(),
            registry.by_gene.len()
        );
        Ok(registry)
    }

    pub fn register(&mut self, legacy: LegacyName) {
        let index = self.names.len();

        if self.by_name.contains_key(&legacy.name) {
            warn!("Legacy name {} appears more than once; first row wins", legacy.name);
        } else {
            self.by_name.insert(legacy.name.clone(), index);
        }

        self.by_gene.entry(legacy.gene_id.clone()).or_default().push(index);
        self.names.push(legacy);
    }

    pub fn names(&self) -> &[LegacyName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LegacyName> {
        self.by_name.get(name).map(|&i| &self.names[i])
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Legacy names attached to exactly this identifier
    pub fn for_gene<'a>(&'a self, gene_id: &str) -> impl Iterator<Item = &'a LegacyName> + 'a {
        self.by_gene
            .get(gene_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.names[i])
    }

    /// Legacy names held by any identifier of the cluster, cluster order
    pub fn for_cluster<'s, 'c>(&'s self, cluster: &'c IndexSet<String>) -> impl Iterator<Item = &'s LegacyName> + 'c
    where
        's: 'c,
    {
        cluster.iter().flat_map(move |id| self.for_gene(id))
    }

    pub fn for_family<'s, 'f>(&'s self, family: &'f str) -> impl Iterator<Item = &'s LegacyName> + 'f
    where
        's: 'f,
    {
        self.names.iter().filter(move |n| n.family == family)
    }

    pub fn max_suffix(&self, family: &str) -> Option<u32> {
        self.for_family(family).map(|n| n.suffix).max()
    }

    /// Prefixes used by a family, with how many names use each (first-seen order)
    pub fn prefixes(&self, family: &str) -> IndexMap<&str, usize> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for legacy in self.for_family(family) {
            *counts.entry(legacy.prefix.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Most common prefix of the family; ties go to the first seen
    pub fn dominant_prefix(&self, family: &str) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (prefix, count) in self.prefixes(family) {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((prefix, count)),
            }
        }
        best.map(|(prefix, _)| prefix)
    }

    /// Every family a gene's cluster held in the legacy registry, first-seen order
    pub fn families_for_genes<'g, I>(&self, genes: I, resolver: &IdentityResolver) -> HashMap<String, IndexSet<String>>
    where
        I: IntoIterator<Item = &'g str>,
    {
        let mut result = HashMap::new();
        for gene in genes {
            if result.contains_key(gene) {
                continue;
            }
            let cluster = resolver.resolve(gene);
            let families: IndexSet<String> = self.for_cluster(&cluster).map(|n| n.family.clone()).collect();
            if !families.is_empty() {
                result.insert(gene.to_string(), families);
            }
        }
        result
    }
}

// ============================================================================
// TESTS
// ============================================================================
