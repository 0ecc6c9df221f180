// 🧪 Family Classifier - One family per gene from domain evidence
// Rules are tested against every transcript; multi-matches are tie-broken,
// then transcripts fold into genes in input order (first transcript wins).

use crate::domains::{AccessionSets, DomainEvidence};
use crate::error::NamingResult;
use crate::fasta::TranscriptGeneMap;
use crate::report::{ConflictEntry, ReportSink};
use crate::rules::{RawRule, RuleTable};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ============================================================================
// TYPES
// ============================================================================

/// How a transcript matching several rules got its family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// The gene's legacy family was among the candidates
    LegacyAgreement,

    /// Highest entry of the priority family list
    PriorityList,

    /// First matching rule in table order
    RuleOrder,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::LegacyAgreement => "legacy agreement",
            TieBreak::PriorityList => "priority list",
            TieBreak::RuleOrder => "rule order",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneFamilyAssignment {
    pub gene_id: String,
    pub family: String,

    /// Transcript that fixed the gene's family
    pub transcript_id: String,
}

impl GeneFamilyAssignment {
    pub fn new(gene_id: &str, family: &str, transcript_id: &str) -> Self {
        GeneFamilyAssignment {
            gene_id: gene_id.to_string(),
            family: family.to_string(),
            transcript_id: transcript_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// One entry per gene, in order of each gene's first matching transcript
    pub assignments: IndexMap<String, GeneFamilyAssignment>,

    /// Transcript conflicts and multi-match tie-breaks
    pub report: ReportSink,

    /// Matching transcripts with no gene in the mapping
    pub unmapped_transcripts: Vec<String>,
}

impl Classification {
    pub fn family_of(&self, gene_id: &str) -> Option<&str> {
        self.assignments.get(gene_id).map(|a| a.family.as_str())
    }

    pub fn gene_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn to_vec(&self) -> Vec<GeneFamilyAssignment> {
        self.assignments.values().cloned().collect()
    }
}

// ============================================================================
// FAMILY CLASSIFIER
// ============================================================================

pub struct FamilyClassifier<'a> {
    rules: &'a RuleTable,

    /// Highest priority first
    pub priority_families: Vec<String>,

    /// gene id -> families its cluster had in the legacy registry
    pub legacy_families: HashMap<String, IndexSet<String>>,
}

impl<'a> FamilyClassifier<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        FamilyClassifier {
            rules,
            priority_families: Vec::new(),
            legacy_families: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, families: Vec<String>) -> Self {
        self.priority_families = families;
        self
    }

    pub fn with_legacy_families(mut self, legacy: HashMap<String, IndexSet<String>>) -> Self {
        self.legacy_families = legacy;
        self
    }

    pub fn classify(&self, sets: &AccessionSets, transcript_to_gene: &TranscriptGeneMap) -> Classification {
        // Rule order outer, transcript order inner
        let transcripts: Vec<(&str, &[String])> = sets.iter().collect();
        let mut matched: Vec<Vec<&str>> = vec![Vec::new(); transcripts.len()];
        for rule in self.rules.rules() {
            for (i, (_, accessions)) in transcripts.iter().enumerate() {
                if rule.matches(accessions) && !matched[i].contains(&rule.family.as_str()) {
                    matched[i].push(rule.family.as_str());
                }
            }
        }

        let mut result = Classification::default();

        for ((transcript_id, _), candidates) in transcripts.iter().zip(matched.iter()) {
            if candidates.is_empty() {
                continue;
            }

            let gene_id = match transcript_to_gene.get(*transcript_id) {
                Some(gene) if !gene.is_empty() => gene.as_str(),
                _ => {
                    warn!("Transcript {} matched a family but has no gene", transcript_id);
                    result.unmapped_transcripts.push(transcript_id.to_string());
                    continue;
                }
            };

            let family = match self.resolve(gene_id, candidates) {
                (family, None) => family,
                (family, Some(tie_break)) => {
                    debug!(
                        "Transcript {} matched {:?}; chose {} by {}",
                        transcript_id,
                        candidates,
                        family,
                        tie_break.as_str()
                    );
                    result.report.conflict(ConflictEntry::CompetingFamilies {
                        gene_id: gene_id.to_string(),
                        transcript_id: transcript_id.to_string(),
                        families: candidates.iter().map(|f| f.to_string()).collect(),
                        chosen: family.to_string(),
                        tie_break,
                    });
                    family
                }
            };

            match result.assignments.get(gene_id) {
                None => {
                    result.assignments.insert(
                        gene_id.to_string(),
                        GeneFamilyAssignment::new(gene_id, family, transcript_id),
                    );
                }
                Some(decided) if decided.family != family => {
                    result.report.conflict(ConflictEntry::TranscriptDisagreement {
                        gene_id: gene_id.to_string(),
                        kept_transcript: decided.transcript_id.clone(),
                        kept_family: decided.family.clone(),
                        other_transcript: transcript_id.to_string(),
                        other_family: family.to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        info!(
            "Classified {} genes from {} transcripts ({} unmapped)",
            result.assignments.len(),
            transcripts.len(),
            result.unmapped_transcripts.len()
        );

        result
    }

    /// Pick one family out of a transcript's candidates
    fn resolve<'c>(&self, gene_id: &str, candidates: &[&'c str]) -> (&'c str, Option<TieBreak>) {
        if candidates.len() == 1 {
            return (candidates[0], None);
        }

        if let Some(legacy) = self.legacy_families.get(gene_id) {
            if let Some(family) = candidates.iter().find(|f| legacy.contains(**f)) {
                return (*family, Some(TieBreak::LegacyAgreement));
            }
        }

        for preferred in &self.priority_families {
            if let Some(family) = candidates.iter().find(|f| **f == preferred.as_str()) {
                return (*family, Some(TieBreak::PriorityList));
            }
        }

        (candidates[0], Some(TieBreak::RuleOrder))
    }
}

/// One-shot classification straight from raw rows.
/// A malformed rule aborts before any transcript is evaluated.
pub fn classify(
    evidence: &[DomainEvidence],
    rules: &[RawRule],
    transcript_to_gene: &TranscriptGeneMap,
    priority_families: Vec<String>,
) -> NamingResult<Classification> {
    let table = RuleTable::from_rows(rules)?;
    let sets = AccessionSets::from_evidence(evidence);
    Ok(FamilyClassifier::new(&table)
        .with_priority(priority_families)
        .classify(&sets, transcript_to_gene))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_rules() -> RuleTable {
        RuleTable::from_rows(&[
            RawRule::new("ARR-B", "PF00072#1:PF00249#1", ""),
            RawRule::new("MYB", "PF00249#1", "PF00072#1"),
            RawRule::new("G2-like", "G2-like#1", ""),
            RawRule::new("bHLH", "PF00010#1", ""),
        ])
        .unwrap()
    }

    fn genes(pairs: &[(&str, &str)]) -> TranscriptGeneMap {
        pairs.iter().map(|(t, g)| (t.to_string(), g.to_string())).collect()
    }

    #[test]
    fn test_first_transcript_fixes_family_and_conflict_is_logged() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("G3_T01", "PF00249"),
            DomainEvidence::new("G3_T02", "PF00072"),
            DomainEvidence::new("G3_T02", "PF00249"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("G3_T01", "G3"), ("G3_T02", "G3")]);

        let result = FamilyClassifier::new(&rules)
            .with_priority(vec!["MYB".to_string(), "ARR-B".to_string()])
            .classify(&sets, &map);

        assert_eq!(result.family_of("G3"), Some("MYB"));
        assert_eq!(result.assignments["G3"].transcript_id, "G3_T01");
        assert_eq!(
            result.report.conflicts,
            vec![ConflictEntry::TranscriptDisagreement {
                gene_id: "G3".to_string(),
                kept_transcript: "G3_T01".to_string(),
                kept_family: "MYB".to_string(),
                other_transcript: "G3_T02".to_string(),
                other_family: "ARR-B".to_string(),
            }]
        );
    }

    #[test]
    fn test_priority_list_breaks_multi_match() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("T1", "G2-like"),
            DomainEvidence::new("T1", "PF00010"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("T1", "G1")]);

        let result = FamilyClassifier::new(&rules)
            .with_priority(vec!["bHLH".to_string()])
            .classify(&sets, &map);

        assert_eq!(result.family_of("G1"), Some("bHLH"));
        match &result.report.conflicts[0] {
            ConflictEntry::CompetingFamilies { families, tie_break, .. } => {
                assert_eq!(families, &vec!["G2-like".to_string(), "bHLH".to_string()]);
                assert_eq!(*tie_break, TieBreak::PriorityList);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_legacy_agreement_beats_priority() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("T1", "G2-like"),
            DomainEvidence::new("T1", "PF00010"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("T1", "G1")]);
        let legacy: HashMap<String, IndexSet<String>> =
            [("G1".to_string(), ["G2-like".to_string()].into_iter().collect())].into_iter().collect();

        let result = FamilyClassifier::new(&rules)
            .with_priority(vec!["bHLH".to_string()])
            .with_legacy_families(legacy)
            .classify(&sets, &map);

        assert_eq!(result.family_of("G1"), Some("G2-like"));
    }

    #[test]
    fn test_legacy_agreement_with_any_cluster_family() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("T1", "PF00010"),
            DomainEvidence::new("T1", "PF00249"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("T1", "G1")]);
        let legacy: HashMap<String, IndexSet<String>> = [(
            "G1".to_string(),
            ["bZIP".to_string(), "MYB".to_string()].into_iter().collect(),
        )]
        .into_iter()
        .collect();

        let result = FamilyClassifier::new(&rules)
            .with_priority(vec!["bHLH".to_string()])
            .with_legacy_families(legacy)
            .classify(&sets, &map);

        // bZIP is not a candidate; MYB still agrees with the legacy registry
        assert_eq!(result.family_of("G1"), Some("MYB"));
        assert!(matches!(
            &result.report.conflicts[0],
            ConflictEntry::CompetingFamilies { tie_break: TieBreak::LegacyAgreement, .. }
        ));
    }

    #[test]
    fn test_rule_order_fallback() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("T1", "PF00010"),
            DomainEvidence::new("T1", "G2-like"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("T1", "G1")]);

        let result = FamilyClassifier::new(&rules).classify(&sets, &map);

        // G2-like precedes bHLH in the rule table
        assert_eq!(result.family_of("G1"), Some("G2-like"));
    }

    #[test]
    fn test_unmatched_and_unmapped_transcripts() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("T1", "PF99999"),
            DomainEvidence::new("T2", "PF00010"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("T1", "G1")]);

        let result = FamilyClassifier::new(&rules).classify(&sets, &map);

        assert_eq!(result.gene_count(), 0);
        assert_eq!(result.unmapped_transcripts, vec!["T2".to_string()]);
    }

    #[test]
    fn test_gene_order_follows_input_order() {
        let rules = create_test_rules();
        let evidence = vec![
            DomainEvidence::new("B_T1", "PF00010"),
            DomainEvidence::new("A_T1", "PF00010"),
            DomainEvidence::new("B_T2", "PF00010"),
        ];
        let sets = AccessionSets::from_evidence(&evidence);
        let map = genes(&[("A_T1", "A"), ("B_T1", "B"), ("B_T2", "B")]);

        let result = FamilyClassifier::new(&rules).classify(&sets, &map);
        let order: Vec<&str> = result.assignments.keys().map(String::as_str).collect();

        assert_eq!(order, vec!["B", "A"]);
        assert!(result.report.conflicts.is_empty());
    }

    #[test]
    fn test_classify_rejects_malformed_rules() {
        let rules = vec![RawRule::new("MYB", "PF00249", "")];
        let map = TranscriptGeneMap::new();
        let err = classify(&[], &rules, &map, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("MYB"));
    }
}
