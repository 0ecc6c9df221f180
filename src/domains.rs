// 🔬 Domain Evidence - Per-transcript accession matches
// Rows come from an external domain classifier (hmmscan); we only consume them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// EVIDENCE ROWS
// ============================================================================

/// One (transcript, accession) match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvidence {
    pub transcript_id: String,
    pub accession: String,
}

impl DomainEvidence {
    pub fn new(transcript_id: impl Into<String>, accession: impl Into<String>) -> Self {
        DomainEvidence {
            transcript_id: transcript_id.into(),
            accession: accession.into(),
        }
    }
}

/// A scored hit, before threshold filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHit {
    pub transcript_id: String,
    pub accession: String,
    pub model_name: String,
    pub score: Option<f64>,
}

impl DomainHit {
    /// Parse one data line of `hmmscan --domtblout` output.
    ///
    /// Columns used: 0 target (model) name, 1 accession, 3 query name, 7 full-sequence score.
    /// Comment lines and short lines yield `None`.
    pub fn from_domtblout_line(line: &str) -> Option<DomainHit> {
        if line.starts_with('#') {
            return None;
        }

        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 8 {
            return None;
        }

        // Self-built models have no accession; fall back to the model name
        let accession = if cols[1] == "-" { cols[0] } else { cols[1] };

        Some(DomainHit {
            transcript_id: cols[3].to_string(),
            accession: strip_accession_version(accession).to_string(),
            model_name: cols[0].to_string(),
            score: cols[7].parse().ok(),
        })
    }

    pub fn into_evidence(self) -> DomainEvidence {
        DomainEvidence {
            transcript_id: self.transcript_id,
            accession: self.accession,
        }
    }
}

/// "PF00010.27" -> "PF00010"
pub fn strip_accession_version(accession: &str) -> &str {
    match accession.split_once('.') {
        Some((base, _)) => base,
        None => accession,
    }
}

// ============================================================================
// SCORE THRESHOLDS
// ============================================================================

/// Minimum full-sequence scores per accession; unlisted accessions always pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreThresholds {
    thresholds: HashMap<String, f64>,
}

impl ScoreThresholds {
    pub fn new(thresholds: HashMap<String, f64>) -> Self {
        ScoreThresholds { thresholds }
    }

    pub fn empty() -> Self {
        ScoreThresholds {
            thresholds: HashMap::new(),
        }
    }

    pub fn get(&self, accession: &str) -> Option<f64> {
        self.thresholds.get(accession).copied()
    }

    pub fn set(&mut self, accession: impl Into<String>, threshold: f64) {
        self.thresholds.insert(accession.into(), threshold);
    }

    /// Hits without a score (plain two-column input) are kept
    pub fn passes(&self, hit: &DomainHit) -> bool {
        match (self.get(&hit.accession), hit.score) {
            (Some(threshold), Some(score)) => score >= threshold,
            _ => true,
        }
    }

    /// Drop low-scoring hits, keeping input order
    pub fn filter(&self, hits: Vec<DomainHit>) -> Vec<DomainEvidence> {
        hits.into_iter()
            .filter(|hit| self.passes(hit))
            .map(DomainHit::into_evidence)
            .collect()
    }
}

impl Default for ScoreThresholds {
    /// Gathering thresholds used by the iTAK family database
    fn default() -> Self {
        let table: [(&str, f64); 18] = [
            ("PF07716", 1.0),
            ("PF00096", 7.80),
            ("PF00642", 10.00),
            ("PF01422", 15.90),
            ("VARL", 45.0),
            ("Alfin-like", 88.35),
            ("VOZ", 123.3),
            ("ULT", 52.45),
            ("HRT", 22.1),
            ("STER_AP", 110.9),
            ("DNC", 10.4),
            ("LUFS", 38.8),
            ("G2-like", 24.35),
            ("Trihelix", 26.4),
            ("NF-YC", 52.7),
            ("NF-YB", 61.0),
            ("STAT", 150.0),
            ("WUS-HB", 45.2),
        ];

        ScoreThresholds {
            thresholds: table.iter().map(|(acc, t)| (acc.to_string(), *t)).collect(),
        }
    }
}

// ============================================================================
// ACCESSION SETS
// ============================================================================

/// Accessions matched by each transcript, in first-seen transcript order.
/// Repeats are kept: some rules need a domain to occur twice.
#[derive(Debug, Clone, Default)]
pub struct AccessionSets {
    sets: IndexMap<String, Vec<String>>,
}

impl AccessionSets {
    pub fn from_evidence(evidence: &[DomainEvidence]) -> Self {
        let mut sets: IndexMap<String, Vec<String>> = IndexMap::new();
        for row in evidence {
            sets.entry(row.transcript_id.clone())
                .or_default()
                .push(row.accession.clone());
        }
        AccessionSets { sets }
    }

    pub fn get(&self, transcript_id: &str) -> Option<&[String]> {
        self.sets.get(transcript_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sets.iter().map(|(t, accs)| (t.as_str(), accs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
