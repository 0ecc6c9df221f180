// 🏷️ Name Assigner - One stable, unique display name per gene
//
// Two passes over genes in classification order:
//   1. Continuity: a gene whose cluster carries a legacy name of the gene's
//      current family keeps that name (for the whole cluster).
//   2. Assignment: remaining genes take an unused legacy name of their family
//      if one is pooled, otherwise a freshly minted prefix + counter.
//
// Names belong to (identity cluster, family) pairs: assembly versions of one
// gene in one family share a name, no other pair ever does. A version
// classified into another family is named on its own and reported.

use crate::classifier::GeneFamilyAssignment;
use crate::config::NamingConfig;
use crate::error::NamingResult;
use crate::identity::{ClusterKey, IdentityResolver};
use crate::legacy::{LegacyName, LegacyRegistry};
use crate::prefix::FamilyPrefixResolver;
use crate::report::{ConflictEntry, Reassignment, ReportSink};
use crate::rules::ClassLabel;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info};

// ============================================================================
// OUTPUT RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameOrigin {
    /// Legacy name kept by its own gene
    Retained,

    /// Unused legacy name moved to another gene of the same family
    Reassigned,

    /// New prefix + counter name
    Minted,
}

impl NameOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameOrigin::Retained => "retained",
            NameOrigin::Reassigned => "reassigned",
            NameOrigin::Minted => "minted",
        }
    }
}

impl fmt::Display for NameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the final registry. Rows sharing a name are assembly
/// versions of one gene in one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub gene_id: String,
    pub name: String,
    pub family: String,
    pub class_label: ClassLabel,
    pub origin: NameOrigin,
}

/// Sort for downstream consumption: by name, then gene id
pub fn sort_registry(records: &mut [NameRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.gene_id.cmp(&b.gene_id)));
}

/// SHA-256 over the registry rows in their given order
pub fn fingerprint(records: &[NameRecord]) -> String {
    let mut hasher = Sha256::new();
    for r in records {
        hasher.update(format!(
            "{}\t{}\t{}\t{}\t{}\n",
            r.gene_id, r.name, r.family, r.class_label, r.origin
        ));
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// NAME ASSIGNER
// ============================================================================

/// Who holds a name: one family within one identity cluster
#[derive(Debug, Clone, PartialEq, Eq)]
struct NameOwner {
    cluster: ClusterKey,
    family: String,
    origin: NameOrigin,
}

impl NameOwner {
    fn same_holder(&self, cluster: &ClusterKey, family: &str) -> bool {
        self.cluster == *cluster && self.family == family
    }
}

pub struct NameAssigner<'a> {
    legacy: &'a LegacyRegistry,
    resolver: &'a IdentityResolver,
    prefixes: FamilyPrefixResolver<'a>,
    class_labels: HashMap<String, ClassLabel>,

    /// family -> next suffix to try
    counters: HashMap<String, u32>,

    /// family -> legacy names free for reassignment, legacy table order
    pool: IndexMap<String, VecDeque<&'a LegacyName>>,

    /// gene id -> family, for every gene being named
    families: HashMap<String, String>,

    /// identifier -> name, for every same-family alias of every named cluster
    claims: HashMap<String, String>,

    /// name -> holder
    owners: HashMap<String, NameOwner>,
}

impl<'a> NameAssigner<'a> {
    pub fn new(legacy: &'a LegacyRegistry, resolver: &'a IdentityResolver, config: &'a NamingConfig) -> Self {
        NameAssigner {
            legacy,
            resolver,
            prefixes: FamilyPrefixResolver::new(legacy, config),
            class_labels: HashMap::new(),
            counters: HashMap::new(),
            pool: IndexMap::new(),
            families: HashMap::new(),
            claims: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Class label per family; families not listed are TF
    pub fn with_class_labels(mut self, labels: HashMap<String, ClassLabel>) -> Self {
        self.class_labels = labels;
        self
    }

    /// Name every gene. Records come back sorted by name, then gene id.
    pub fn assign(
        mut self,
        assignments: &[GeneFamilyAssignment],
        report: &mut ReportSink,
    ) -> NamingResult<Vec<NameRecord>> {
        self.families = assignments
            .iter()
            .map(|a| (a.gene_id.clone(), a.family.clone()))
            .collect();
        self.fill_pool(assignments);

        // Pass 1: continuity
        for assignment in assignments {
            self.retain_legacy(assignment, report);
        }
        let retained = self.owners.len();

        // Pass 2: reassign from the pool, else mint
        for assignment in assignments {
            if !self.claims.contains_key(&assignment.gene_id) {
                self.assign_fresh(assignment, report)?;
            }
        }

        let mut records = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            // Every gene holds a claim after pass 2
            if let Some(name) = self.claims.get(&assignment.gene_id) {
                let origin = self.owners.get(name).map_or(NameOrigin::Minted, |owner| owner.origin);
                records.push(NameRecord {
                    gene_id: assignment.gene_id.clone(),
                    name: name.clone(),
                    family: assignment.family.clone(),
                    class_label: self.class_label(&assignment.family),
                    origin,
                });
            }
        }

        sort_registry(&mut records);

        info!(
            "Named {} genes: {} names retained, {} reassigned, {} minted",
            records.len(),
            retained,
            report.reassignments.len(),
            self.owners.values().filter(|o| o.origin == NameOrigin::Minted).count()
        );

        Ok(records)
    }

    fn class_label(&self, family: &str) -> ClassLabel {
        self.class_labels.get(family).copied().unwrap_or(ClassLabel::TF)
    }

    /// Pool every legacy name whose cluster has no gene of the same family this run
    fn fill_pool(&mut self, assignments: &[GeneFamilyAssignment]) {
        let mut families_by_cluster: HashMap<ClusterKey, IndexSet<&str>> = HashMap::new();
        for a in assignments {
            families_by_cluster
                .entry(self.resolver.cluster_key(&a.gene_id))
                .or_default()
                .insert(a.family.as_str());
        }

        let legacy: &'a LegacyRegistry = self.legacy;
        for name in legacy.names() {
            let key = self.resolver.cluster_key(&name.gene_id);
            let still_held = families_by_cluster
                .get(&key)
                .is_some_and(|families| families.contains(name.family.as_str()));

            if !still_held {
                self.pool.entry(name.family.clone()).or_default().push_back(name);
            }
        }

        debug!(
            "Unused legacy names: {}",
            self.pool.values().map(VecDeque::len).sum::<usize>()
        );
    }

    fn retain_legacy(&mut self, assignment: &GeneFamilyAssignment, report: &mut ReportSink) {
        let gene = assignment.gene_id.as_str();
        if self.claims.contains_key(gene) {
            return;
        }

        let legacy: &'a LegacyRegistry = self.legacy;
        let cluster = self.resolver.resolve(gene);
        let Some(candidate) = legacy.for_cluster(&cluster).find(|n| n.family == assignment.family) else {
            return;
        };

        let key = self.resolver.cluster_key(gene);
        if let Some(owner) = self.owners.get(&candidate.name) {
            if !owner.same_holder(&key, &assignment.family) {
                report.conflict(ConflictEntry::DuplicateName {
                    gene_id: gene.to_string(),
                    name: candidate.name.clone(),
                    owner: owner.cluster.to_string(),
                });
                return;
            }
        }

        // Other same-family legacy names in the cluster are withheld
        for alias in &cluster {
            for other in legacy.for_gene(alias) {
                if other.family == assignment.family && other.name != candidate.name {
                    report.conflict(ConflictEntry::AliasConflict {
                        gene_id: gene.to_string(),
                        identifier: alias.clone(),
                        kept_name: candidate.name.clone(),
                        withheld_name: other.name.clone(),
                    });
                }
            }
        }

        self.claim(assignment, &cluster, key, &candidate.name, NameOrigin::Retained, report);
    }

    fn assign_fresh(&mut self, assignment: &GeneFamilyAssignment, report: &mut ReportSink) -> NamingResult<()> {
        let gene = assignment.gene_id.as_str();
        let family = assignment.family.as_str();
        let cluster = self.resolver.resolve(gene);
        let key = self.resolver.cluster_key(gene);

        if let Some(reused) = self.take_pooled(family) {
            let legacy: &'a LegacyRegistry = self.legacy;
            let previous_name = legacy.for_cluster(&cluster).next().map(|n| n.name.clone());

            debug!("Reassigning {} from {} to {}", reused.name, reused.gene_id, gene);
            report.reassignment(Reassignment {
                family: family.to_string(),
                old_gene: reused.gene_id.clone(),
                new_gene: gene.to_string(),
                previous_name,
                name: reused.name.clone(),
            });
            self.claim(assignment, &cluster, key, &reused.name, NameOrigin::Reassigned, report);
            return Ok(());
        }

        let name = self.mint(family, report)?;
        self.claim(assignment, &cluster, key, &name, NameOrigin::Minted, report);
        Ok(())
    }

    /// Next pooled legacy name of `family` that nobody owns yet
    fn take_pooled(&mut self, family: &str) -> Option<&'a LegacyName> {
        let queue = self.pool.get_mut(family)?;
        while let Some(candidate) = queue.pop_front() {
            if !self.owners.contains_key(&candidate.name) {
                return Some(candidate);
            }
        }
        None
    }

    /// prefix + counter, skipping any name already used or reserved by legacy
    fn mint(&mut self, family: &str, report: &mut ReportSink) -> NamingResult<String> {
        let prefix = self.prefixes.prefix_for(family, report)?;
        let legacy = self.legacy;
        let counter = self
            .counters
            .entry(family.to_string())
            .or_insert_with(|| legacy.max_suffix(family).map_or(1, |max| max.saturating_add(1)));

        loop {
            let name = format!("{}{}", prefix, counter);
            *counter += 1;
            if !legacy.contains_name(&name) && !self.owners.contains_key(&name) {
                return Ok(name);
            }
        }
    }

    /// Give `name` to every unnamed alias of the cluster that is not being
    /// named under another family. Those aliases are reported once, here.
    fn claim(
        &mut self,
        assignment: &GeneFamilyAssignment,
        cluster: &IndexSet<String>,
        key: ClusterKey,
        name: &str,
        origin: NameOrigin,
        report: &mut ReportSink,
    ) {
        for alias in cluster {
            if self.claims.contains_key(alias) {
                continue;
            }
            match self.families.get(alias) {
                Some(other) if *other != assignment.family => {
                    report.conflict(ConflictEntry::SplitCluster {
                        gene_id: assignment.gene_id.clone(),
                        family: assignment.family.clone(),
                        identifier: alias.clone(),
                        other_family: other.clone(),
                    });
                }
                _ => {
                    self.claims.insert(alias.clone(), name.to_string());
                }
            }
        }

        self.owners.entry(name.to_string()).or_insert(NameOwner {
            cluster: key,
            family: assignment.family.clone(),
            origin,
        });
    }
}

/// Name genes with a fresh assigner; records sorted by name, then gene id
pub fn assign_names(
    assignments: &[GeneFamilyAssignment],
    legacy: &LegacyRegistry,
    resolver: &IdentityResolver,
    config: &NamingConfig,
    class_labels: HashMap<String, ClassLabel>,
    report: &mut ReportSink,
) -> NamingResult<Vec<NameRecord>> {
    NameAssigner::new(legacy, resolver, config)
        .with_class_labels(class_labels)
        .assign(assignments, report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NamingError;
    use crate::identity::CrossReference;
    use crate::legacy::LegacyRow;
    use std::collections::HashSet;

    fn gene(id: &str, family: &str) -> GeneFamilyAssignment {
        GeneFamilyAssignment::new(id, family, &format!("{}_P001", id))
    }

    fn create_test_legacy() -> LegacyRegistry {
        LegacyRegistry::from_rows(&[
            LegacyRow::new("ZmBZR1", "bZIP", "GRMZM2G000001"),
            LegacyRow::new("ZmBZIP2", "bZIP", "GRMZM2G000002"),
            LegacyRow::new("ZmBZIP6", "bZIP", "GRMZM2G000006"),
            LegacyRow::new("ZmMYB3", "MYB", "GRMZM2G000003"),
        ])
        .unwrap()
    }

    fn create_test_resolver() -> IdentityResolver {
        IdentityResolver::build(vec![
            CrossReference::new("GRMZM2G000001", "bzr1"),
            CrossReference::new("Zm00001d000001", "bzr1"),
            CrossReference::new("Zm00001eb000001", "bzr1"),
            CrossReference::new("GRMZM2G000002", "bzip2"),
            CrossReference::new("Zm00001d000002", "bzip2"),
            CrossReference::new("GRMZM2G000006", "bzip6"),
            CrossReference::new("Zm00001d000006", "bzip6"),
            CrossReference::new("GRMZM2G000003", "myb3"),
            CrossReference::new("Zm00001d000003", "myb3"),
        ])
    }

    fn run(assignments: &[GeneFamilyAssignment]) -> (Vec<NameRecord>, ReportSink) {
        let legacy = create_test_legacy();
        let resolver = create_test_resolver();
        let config = NamingConfig::default();
        let mut report = ReportSink::new();
        let records = assign_names(assignments, &legacy, &resolver, &config, HashMap::new(), &mut report).unwrap();
        (records, report)
    }

    fn name_of<'r>(records: &'r [NameRecord], gene_id: &str) -> &'r str {
        records.iter().find(|r| r.gene_id == gene_id).unwrap().name.as_str()
    }

    #[test]
    fn test_continuity_through_cluster_alias() {
        let (records, report) = run(&[gene("Zm00001d000002", "bZIP"), gene("Zm00001d000006", "bZIP")]);

        assert_eq!(name_of(&records, "Zm00001d000002"), "ZmBZIP2");
        assert_eq!(name_of(&records, "Zm00001d000006"), "ZmBZIP6");
        assert!(records.iter().all(|r| r.origin == NameOrigin::Retained));
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_cluster_versions_share_one_name() {
        let (records, _) = run(&[gene("Zm00001d000001", "bZIP"), gene("Zm00001eb000001", "bZIP")]);

        assert_eq!(name_of(&records, "Zm00001d000001"), "ZmBZR1");
        assert_eq!(name_of(&records, "Zm00001eb000001"), "ZmBZR1");
    }

    #[test]
    fn test_cluster_version_in_other_family_is_named_separately() {
        let assignments = [gene("Zm00001d000001", "bZIP"), gene("Zm00001eb000001", "MYB")];
        let (records, report) = run(&assignments);

        assert_eq!(name_of(&records, "Zm00001d000001"), "ZmBZR1");
        let v5 = records.iter().find(|r| r.gene_id == "Zm00001eb000001").unwrap();
        assert_eq!(v5.family, "MYB");
        assert_eq!(v5.name, "ZmMYB3");
        assert_eq!(v5.origin, NameOrigin::Reassigned);

        assert_eq!(
            report.conflicts,
            vec![ConflictEntry::SplitCluster {
                gene_id: "Zm00001d000001".to_string(),
                family: "bZIP".to_string(),
                identifier: "Zm00001eb000001".to_string(),
                other_family: "MYB".to_string(),
            }]
        );
    }

    #[test]
    fn test_shared_names_stay_within_one_cluster_and_family() {
        let resolver = create_test_resolver();
        let assignments = vec![
            gene("GRMZM2G000001", "bZIP"),
            gene("Zm00001d000001", "bZIP"),
            gene("Zm00001eb000001", "MYB"),
            gene("Zm00001d000002", "bZIP"),
            gene("Zm00001d000006", "WRKY"),
            gene("GRMZM2G000006", "WRKY"),
            gene("N1", "MYB"),
        ];
        let (records, _) = run(&assignments);
        assert_eq!(records.len(), assignments.len());

        let mut holders: HashMap<&str, (ClusterKey, &str)> = HashMap::new();
        for r in &records {
            let holder = (resolver.cluster_key(&r.gene_id), r.family.as_str());
            let first = holders.entry(r.name.as_str()).or_insert_with(|| holder.clone());
            assert_eq!(*first, holder, "{} held by two clusters or families", r.name);
        }

        assert_eq!(name_of(&records, "GRMZM2G000001"), "ZmBZR1");
        assert_eq!(name_of(&records, "Zm00001d000006"), name_of(&records, "GRMZM2G000006"));
        assert_ne!(name_of(&records, "Zm00001eb000001"), name_of(&records, "N1"));
    }

    #[test]
    fn test_new_gene_takes_next_suffix_after_legacy_max() {
        // Every legacy bZIP gene still holds its family: nothing to reuse
        let (records, report) = run(&[
            gene("Zm00001d000001", "bZIP"),
            gene("Zm00001d000002", "bZIP"),
            gene("Zm00001d000006", "bZIP"),
            gene("G2", "bZIP"),
        ]);

        assert_eq!(name_of(&records, "G2"), "ZmBZIP7");
        assert!(report.reassignments.is_empty());
        assert!(report.new_prefixes.is_empty());
    }

    #[test]
    fn test_unused_legacy_name_is_reassigned() {
        // The ZmMYB3 cluster is now bZIP, so ZmMYB3 is free for another MYB gene
        let (records, report) = run(&[gene("Zm00001d000003", "bZIP"), gene("G9", "MYB")]);

        assert_eq!(name_of(&records, "G9"), "ZmMYB3");
        let to_g9: Vec<&Reassignment> = report.reassignments.iter().filter(|r| r.new_gene == "G9").collect();
        assert_eq!(
            to_g9,
            vec![&Reassignment {
                family: "MYB".to_string(),
                old_gene: "GRMZM2G000003".to_string(),
                new_gene: "G9".to_string(),
                previous_name: None,
                name: "ZmMYB3".to_string(),
            }]
        );

        // The old MYB gene gets a bZIP name from the pool, carrying its old name
        assert_eq!(name_of(&records, "Zm00001d000003"), "ZmBZR1");
        let moved = report.reassignments.iter().find(|r| r.new_gene == "Zm00001d000003").unwrap();
        assert_eq!(moved.previous_name.as_deref(), Some("ZmMYB3"));
    }

    #[test]
    fn test_minted_suffixes_increase_in_processing_order() {
        let (records, report) = run(&[gene("N1", "WRKY"), gene("N2", "WRKY"), gene("N3", "WRKY")]);

        assert_eq!(name_of(&records, "N1"), "ZmWRKY1");
        assert_eq!(name_of(&records, "N2"), "ZmWRKY2");
        assert_eq!(name_of(&records, "N3"), "ZmWRKY3");
        assert_eq!(report.new_prefixes.len(), 1);
    }

    #[test]
    fn test_duplicate_legacy_name_is_withheld() {
        let legacy = LegacyRegistry::from_rows(&[
            LegacyRow::new("ZmNAC5", "NAC", "A"),
            LegacyRow::new("ZmNAC5", "NAC", "B"),
        ])
        .unwrap();
        let resolver = IdentityResolver::new();
        let config = NamingConfig::default();
        let mut report = ReportSink::new();

        let records = assign_names(
            &[gene("A", "NAC"), gene("B", "NAC")],
            &legacy,
            &resolver,
            &config,
            HashMap::new(),
            &mut report,
        )
        .unwrap();

        assert_eq!(name_of(&records, "A"), "ZmNAC5");
        assert_eq!(name_of(&records, "B"), "ZmNAC6");
        assert_eq!(
            report.conflicts,
            vec![ConflictEntry::DuplicateName {
                gene_id: "B".to_string(),
                name: "ZmNAC5".to_string(),
                owner: "A (unlinked)".to_string(),
            }]
        );
    }

    #[test]
    fn test_second_legacy_name_in_cluster_is_withheld() {
        let legacy = LegacyRegistry::from_rows(&[
            LegacyRow::new("ZmHSF1", "HSF", "GRMZM2G100001"),
            LegacyRow::new("ZmHSF4", "HSF", "GRMZM2G100004"),
        ])
        .unwrap();
        let resolver = IdentityResolver::build(vec![
            CrossReference::new("GRMZM2G100001", "hsf"),
            CrossReference::new("GRMZM2G100004", "hsf"),
            CrossReference::new("Zm00001d100001", "hsf"),
        ]);
        let config = NamingConfig::default();
        let mut report = ReportSink::new();

        let records = assign_names(
            &[gene("Zm00001d100001", "HSF"), gene("NEW", "HSF")],
            &legacy,
            &resolver,
            &config,
            HashMap::new(),
            &mut report,
        )
        .unwrap();

        assert_eq!(name_of(&records, "Zm00001d100001"), "ZmHSF1");
        // ZmHSF4 is withheld, not handed to another gene
        assert_eq!(name_of(&records, "NEW"), "ZmHSF5");
        assert!(matches!(
            &report.conflicts[0],
            ConflictEntry::AliasConflict { identifier, withheld_name, .. }
                if identifier == "GRMZM2G100004" && withheld_name == "ZmHSF4"
        ));
    }

    #[test]
    fn test_registry_is_total_unique_and_sorted() {
        let assignments = vec![
            gene("N1", "WRKY"),
            gene("Zm00001d000006", "bZIP"),
            gene("N2", "bZIP"),
            gene("Zm00001d000003", "MYB"),
            gene("N3", "MYB"),
        ];
        let (records, _) = run(&assignments);

        assert_eq!(records.len(), assignments.len());
        let names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), records.len());

        let sorted: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let assignments = vec![gene("N1", "WRKY"), gene("N2", "bZIP"), gene("Zm00001d000003", "bZIP")];
        let (first, first_report) = run(&assignments);
        let (second, second_report) = run(&assignments);

        assert_eq!(fingerprint(&first), fingerprint(&second));
        assert_eq!(first_report.render_reassignments(), second_report.render_reassignments());
    }

    #[test]
    fn test_class_labels_applied() {
        let legacy = LegacyRegistry::new();
        let resolver = IdentityResolver::new();
        let config = NamingConfig::default();
        let mut report = ReportSink::new();
        let labels: HashMap<String, ClassLabel> = [("SWI/SNF-SWI3".to_string(), ClassLabel::Coreg)].into_iter().collect();

        let records = assign_names(
            &[gene("C1", "SWI/SNF-SWI3"), gene("T1", "WRKY")],
            &legacy,
            &resolver,
            &config,
            labels,
            &mut report,
        )
        .unwrap();

        assert_eq!(records.iter().find(|r| r.gene_id == "C1").unwrap().class_label, ClassLabel::Coreg);
        assert_eq!(records.iter().find(|r| r.gene_id == "C1").unwrap().name, "ZmSWI3_1");
        assert_eq!(records.iter().find(|r| r.gene_id == "T1").unwrap().class_label, ClassLabel::TF);
    }

    #[test]
    fn test_unresolvable_prefix_aborts() {
        let legacy = LegacyRegistry::new();
        let resolver = IdentityResolver::new();
        let config = NamingConfig::default();
        let mut report = ReportSink::new();

        let err = assign_names(
            &[gene("X", "zinc finger")],
            &legacy,
            &resolver,
            &config,
            HashMap::new(),
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, NamingError::UnresolvablePrefix { .. }));
    }
}
