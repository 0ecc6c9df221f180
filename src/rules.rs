// 🏷️ Family Rules - Rules as Data
// Required / forbidden accession terms that define each gene family

use crate::error::{NamingError, NamingResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// ACCESSION TERMS
// ============================================================================

/// One term of a rule, e.g. `PF00249#2` = PF00249 must occur at least twice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessionTerm {
    pub accession: String,
    pub min_count: usize,
}

impl AccessionTerm {
    /// Parse `ACC#1` or `ACC#2`. Forbidden terms only allow `#1`.
    fn parse(raw: &str, family: &str, allow_double: bool) -> NamingResult<Self> {
        let malformed = || NamingError::MalformedRule {
            family: family.to_string(),
            term: raw.to_string(),
        };

        let (accession, count) = raw.trim().rsplit_once('#').ok_or_else(malformed)?;
        let min_count = match count {
            "1" => 1,
            "2" if allow_double => 2,
            _ => return Err(malformed()),
        };

        if accession.is_empty() {
            return Err(malformed());
        }

        Ok(AccessionTerm {
            accession: accession.to_string(),
            min_count,
        })
    }

    fn occurrences(&self, accessions: &[String]) -> usize {
        accessions.iter().filter(|a| **a == self.accession).count()
    }
}

impl fmt::Display for AccessionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.accession, self.min_count)
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// A row of the family rule table as it is stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(alias = "GRASSIUS")]
    pub family: String,

    #[serde(alias = "Required")]
    pub required: String,

    #[serde(alias = "Forbidden", default)]
    pub forbidden: String,

    /// Free-text category, e.g. "coregulators"
    #[serde(default)]
    pub category: String,
}

impl RawRule {
    pub fn new(family: &str, required: &str, forbidden: &str) -> Self {
        RawRule {
            family: family.to_string(),
            required: required.to_string(),
            forbidden: forbidden.to_string(),
            category: String::new(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyRule {
    pub family: String,
    pub required: Vec<AccessionTerm>,
    pub forbidden: Vec<AccessionTerm>,
    pub category: String,

    /// Position in the rule table (0 = first evaluated)
    pub rank: usize,
}

impl FamilyRule {
    pub fn parse(raw: &RawRule, rank: usize) -> NamingResult<Self> {
        let family = raw.family.trim();

        let required = raw
            .required
            .split(':')
            .map(|term| AccessionTerm::parse(term, family, true))
            .collect::<NamingResult<Vec<_>>>()?;

        let forbidden_cell = raw.forbidden.trim();
        let forbidden = if forbidden_cell.is_empty() || forbidden_cell == "NA" {
            Vec::new()
        } else {
            forbidden_cell
                .split(':')
                .map(|term| AccessionTerm::parse(term, family, false))
                .collect::<NamingResult<Vec<_>>>()?
        };

        Ok(FamilyRule {
            family: family.to_string(),
            required,
            forbidden,
            category: raw.category.trim().to_string(),
            rank,
        })
    }

    /// Check a transcript's accessions (repeats significant) against this rule
    pub fn matches(&self, accessions: &[String]) -> bool {
        self.required
            .iter()
            .all(|term| term.occurrences(accessions) >= term.min_count)
            && !self
                .forbidden
                .iter()
                .any(|term| term.occurrences(accessions) > 0)
    }

    /// Distinct accessions this rule mentions
    pub fn accessions(&self) -> Vec<&str> {
        let mut accs: Vec<&str> = self
            .required
            .iter()
            .chain(self.forbidden.iter())
            .map(|t| t.accession.as_str())
            .collect();
        accs.sort();
        accs.dedup();
        accs
    }

    fn join_terms(terms: &[AccessionTerm]) -> String {
        terms.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(":")
    }
}

// ============================================================================
// CLASS LABELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    /// Transcription factor
    TF,

    /// Transcriptional coregulator
    Coreg,
}

impl ClassLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::TF => "TF",
            ClassLabel::Coreg => "Coreg",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RULE TABLE
// ============================================================================

/// Read-only rule set, evaluated in table order
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<FamilyRule>,
}

impl RuleTable {
    /// Parse every row; the first malformed rule aborts the whole table
    pub fn from_rows(rows: &[RawRule]) -> NamingResult<Self> {
        let rules = rows
            .iter()
            .enumerate()
            .map(|(rank, raw)| FamilyRule::parse(raw, rank))
            .collect::<NamingResult<Vec<_>>>()?;
        Ok(RuleTable { rules })
    }

    pub fn rules(&self) -> &[FamilyRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, family: &str) -> Option<&FamilyRule> {
        self.rules.iter().find(|r| r.family == family)
    }

    /// Families in table order, without repeats
    pub fn families(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for rule in &self.rules {
            if !seen.contains(&rule.family.as_str()) {
                seen.push(rule.family.as_str());
            }
        }
        seen
    }

    /// Class label per family, from the rule category
    pub fn class_labels(&self, coregulator_category: &str) -> HashMap<String, ClassLabel> {
        self.rules
            .iter()
            .map(|rule| {
                let label = if rule.category.eq_ignore_ascii_case(coregulator_category) {
                    ClassLabel::Coreg
                } else {
                    ClassLabel::TF
                };
                (rule.family.clone(), label)
            })
            .collect()
    }

    /// Render the table in iTAK's TF_Rule.txt format
    pub fn to_itak_rules(&self) -> String {
        let mut out = String::new();
        for (i, rule) in self.rules.iter().enumerate() {
            let forbidden = if rule.forbidden.is_empty() {
                "NA".to_string()
            } else {
                FamilyRule::join_terms(&rule.forbidden)
            };
            out.push_str(&format!(
                "ID:T{:04}\nName:{}\nFamily:{}\nRequired:{}\nAuxiiary:NA\nForbidden:{}\nType:TF\nDesc:NA\n//\n\n",
                i,
                rule.family,
                rule.family,
                FamilyRule::join_terms(&rule.required),
                forbidden
            ));
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn accs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_required_and_forbidden_terms() {
        let rule = FamilyRule::parse(&RawRule::new("MYB", "PF00249#2", "PF00072#1"), 0).unwrap();

        assert!(rule.matches(&accs(&["PF00249", "PF00249"])));
        assert!(!rule.matches(&accs(&["PF00249"])));
        assert!(!rule.matches(&accs(&["PF00249", "PF00249", "PF00072"])));
    }

    #[test]
    fn test_multiple_required_terms() {
        let rule = FamilyRule::parse(&RawRule::new("ARR-B", "PF00072#1:PF00249#1", "NA"), 3).unwrap();

        assert_eq!(rule.rank, 3);
        assert!(rule.forbidden.is_empty());
        assert!(rule.matches(&accs(&["PF00249", "PF00072"])));
        assert!(!rule.matches(&accs(&["PF00072"])));
        assert_eq!(rule.accessions(), vec!["PF00072", "PF00249"]);
    }

    #[test]
    fn test_malformed_required_term_names_family() {
        let err = FamilyRule::parse(&RawRule::new("bHLH", "PF00010", ""), 0).unwrap_err();
        assert_eq!(
            err,
            NamingError::MalformedRule {
                family: "bHLH".to_string(),
                term: "PF00010".to_string()
            }
        );
    }

    #[test]
    fn test_forbidden_double_count_is_malformed() {
        let err = FamilyRule::parse(&RawRule::new("bHLH", "PF00010#1", "PF00249#2"), 0).unwrap_err();
        assert!(matches!(err, NamingError::MalformedRule { .. }));
    }

    #[test]
    fn test_empty_required_is_malformed() {
        assert!(FamilyRule::parse(&RawRule::new("GRAS", "", ""), 0).is_err());
    }

    #[test]
    fn test_table_aborts_on_first_bad_rule() {
        let rows = vec![
            RawRule::new("MYB", "PF00249#2", ""),
            RawRule::new("broken", "PF00001#3", ""),
            RawRule::new("bHLH", "PF00010#1", ""),
        ];
        let err = RuleTable::from_rows(&rows).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_class_labels_from_category() {
        let rows = vec![
            RawRule::new("MYB", "PF00249#2", "").with_category("TF"),
            RawRule::new("SWI/SNF-SWI3", "PF04433#1", "").with_category("coregulators"),
        ];
        let table = RuleTable::from_rows(&rows).unwrap();
        let labels = table.class_labels("coregulators");

        assert_eq!(labels["MYB"], ClassLabel::TF);
        assert_eq!(labels["SWI/SNF-SWI3"], ClassLabel::Coreg);
    }

    #[test]
    fn test_itak_export() {
        let rows = vec![
            RawRule::new("MYB", "PF00249#2", ""),
            RawRule::new("ARR-B", "PF00072#1:PF00249#1", "PF00010#1"),
        ];
        let table = RuleTable::from_rows(&rows).unwrap();
        let text = table.to_itak_rules();

        assert!(text.starts_with("ID:T0000\nName:MYB\nFamily:MYB\nRequired:PF00249#2\nAuxiiary:NA\nForbidden:NA\n"));
        assert!(text.contains("ID:T0001\nName:ARR-B"));
        assert!(text.contains("Required:PF00072#1:PF00249#1"));
        assert!(text.contains("Forbidden:PF00010#1"));
        assert_eq!(text.matches("//\n\n").count(), 2);
    }
}
