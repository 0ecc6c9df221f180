// 🔍 Family Audit - How far the new classification drifted from the legacy one
// Legacy genes are matched to classified genes through identity clusters.

use crate::classifier::Classification;
use crate::identity::IdentityResolver;
use crate::legacy::LegacyRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyChange {
    pub gene_id: String,
    pub old_family: String,
    pub new_family: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyAudit {
    pub unchanged: usize,
    pub changed: Vec<FamilyChange>,

    /// Legacy gene id -> old family, for legacy genes with no classified alias
    pub missing: BTreeMap<String, String>,

    /// Classified gene id -> family, for genes with no legacy alias
    pub new_genes: BTreeMap<String, String>,
}

impl FamilyAudit {
    pub fn compare(
        classification: &Classification,
        legacy: &LegacyRegistry,
        resolver: &IdentityResolver,
        orphan_family: &str,
    ) -> Self {
        let mut audit = FamilyAudit::default();

        let mut classified_by_cluster = HashMap::new();
        for (gene_id, assignment) in &classification.assignments {
            classified_by_cluster
                .entry(resolver.cluster_key(gene_id))
                .or_insert(assignment.family.as_str());
        }

        let mut legacy_clusters = HashSet::new();
        let mut seen_genes = HashSet::new();
        for old in legacy.names().iter().filter(|n| n.family != orphan_family) {
            let key = resolver.cluster_key(&old.gene_id);
            legacy_clusters.insert(key.clone());

            if !seen_genes.insert(old.gene_id.as_str()) {
                continue;
            }

            match classified_by_cluster.get(&key) {
                Some(family) if *family == old.family => audit.unchanged += 1,
                Some(family) => audit.changed.push(FamilyChange {
                    gene_id: old.gene_id.clone(),
                    old_family: old.family.clone(),
                    new_family: family.to_string(),
                }),
                None => {
                    audit.missing.insert(old.gene_id.clone(), old.family.clone());
                }
            }
        }

        for (gene_id, assignment) in &classification.assignments {
            if !legacy_clusters.contains(&resolver.cluster_key(gene_id)) {
                audit.new_genes.insert(gene_id.clone(), assignment.family.clone());
            }
        }

        audit.changed.sort_by(|a, b| a.gene_id.cmp(&b.gene_id));
        audit
    }

    pub fn summary(&self) -> String {
        format!(
            "{} unchanged, {} changed families, {} missing, {} new",
            self.unchanged,
            self.changed.len(),
            self.missing.len(),
            self.new_genes.len()
        )
    }

    pub fn render_changed(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} genes changed families\n", self.changed.len());
        for c in &self.changed {
            let _ = writeln!(out, "changed family for {}:", c.gene_id);
            let _ = writeln!(out, "\told family was {}", c.old_family);
            let _ = writeln!(out, "\tnew family is {}\n", c.new_family);
        }
        out
    }

    pub fn render_missing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} genes were not categorized into families", self.missing.len());
        let _ = writeln!(out, "these are genes that were categorized in the legacy registry\n");
        for (gene_id, family) in &self.missing {
            let _ = writeln!(out, "{} old family was {}", gene_id, family);
        }
        out
    }

    pub fn render_new(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} new genes were categorized", self.new_genes.len());
        let _ = writeln!(out, "these are genes that were missing or orphans in the legacy registry\n");
        for (gene_id, family) in &self.new_genes {
            let _ = writeln!(out, "{} has family {}", gene_id, family);
        }
        out
    }
}
