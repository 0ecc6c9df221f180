// 📋 Report Sink - Append-only logs for manual review
// Recoverable conflicts never stop a run; they accumulate here.
//
// Rendering is a pure function of the entries, so two runs over the same
// input produce byte-identical reports.

use crate::classifier::TieBreak;
use crate::identity::LinkWarning;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// ============================================================================
// ENTRIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConflictEntry {
    /// One transcript matched several family rules
    CompetingFamilies {
        gene_id: String,
        transcript_id: String,
        families: Vec<String>,
        chosen: String,
        tie_break: TieBreak,
    },

    /// Two transcripts of one gene resolved to different families
    TranscriptDisagreement {
        gene_id: String,
        kept_transcript: String,
        kept_family: String,
        other_transcript: String,
        other_family: String,
    },

    /// A name was already owned by another identity cluster
    DuplicateName {
        gene_id: String,
        name: String,
        owner: String,
    },

    /// An alias already held a different name; the new one was withheld
    AliasConflict {
        gene_id: String,
        identifier: String,
        kept_name: String,
        withheld_name: String,
    },

    /// Assembly versions of one gene were classified into different families;
    /// the alias keeps its own family and gets its own name
    SplitCluster {
        gene_id: String,
        family: String,
        identifier: String,
        other_family: String,
    },

    /// Identifier listed under two linking names (last one kept)
    AmbiguousLink(LinkWarning),
}

/// A legacy name that moved from its old gene to a new one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub family: String,
    pub old_gene: String,
    pub new_gene: String,
    /// The new gene's own legacy name, if it had one
    pub previous_name: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixSource {
    Abbreviation,
    Slashed,
    Truncated,
}

impl PrefixSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixSource::Abbreviation => "abbreviation",
            PrefixSource::Slashed => "slashed family",
            PrefixSource::Truncated => "truncation",
        }
    }
}

/// A prefix synthesized because the family had no legacy names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrefix {
    pub family: String,
    pub prefix: String,
    pub source: PrefixSource,
}

// ============================================================================
// REPORT SINK
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSink {
    pub conflicts: Vec<ConflictEntry>,
    pub reassignments: Vec<Reassignment>,
    pub new_prefixes: Vec<NewPrefix>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conflict(&mut self, entry: ConflictEntry) {
        self.conflicts.push(entry);
    }

    pub fn reassignment(&mut self, entry: Reassignment) {
        self.reassignments.push(entry);
    }

    pub fn new_prefix(&mut self, entry: NewPrefix) {
        self.new_prefixes.push(entry);
    }

    pub fn link_warnings(&mut self, warnings: &[LinkWarning]) {
        self.conflicts
            .extend(warnings.iter().cloned().map(ConflictEntry::AmbiguousLink));
    }

    /// Append another sink's entries, keeping order
    pub fn absorb(&mut self, other: ReportSink) {
        self.conflicts.extend(other.conflicts);
        self.reassignments.extend(other.reassignments);
        self.new_prefixes.extend(other.new_prefixes);
    }

    pub fn count_where<F>(&self, pred: F) -> usize
    where
        F: Fn(&ConflictEntry) -> bool,
    {
        self.conflicts.iter().filter(|c| pred(c)).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} conflicts ({} transcript disagreements, {} duplicate names, {} split clusters), {} reassignments, {} new prefixes",
            self.conflicts.len(),
            self.count_where(|c| matches!(c, ConflictEntry::TranscriptDisagreement { .. })),
            self.count_where(|c| {
                matches!(c, ConflictEntry::DuplicateName { .. } | ConflictEntry::AliasConflict { .. })
            }),
            self.count_where(|c| matches!(c, ConflictEntry::SplitCluster { .. })),
            self.reassignments.len(),
            self.new_prefixes.len()
        )
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    pub fn render_conflicts(&self) -> String {
        let mut out = String::new();

        let disagreements = self.count_where(|c| matches!(c, ConflictEntry::TranscriptDisagreement { .. }));
        let _ = writeln!(out, "{} pairs of transcripts had conflicting families\n", disagreements);

        for entry in &self.conflicts {
            match entry {
                ConflictEntry::TranscriptDisagreement {
                    gene_id,
                    kept_transcript,
                    kept_family,
                    other_transcript,
                    other_family,
                } => {
                    let _ = writeln!(out, "conflict: gene {}", gene_id);
                    let _ = writeln!(out, "\ttranscript {} has family {} (kept)", kept_transcript, kept_family);
                    let _ = writeln!(out, "\ttranscript {} has family {}\n", other_transcript, other_family);
                }
                ConflictEntry::CompetingFamilies {
                    gene_id,
                    transcript_id,
                    families,
                    chosen,
                    tie_break,
                } => {
                    let _ = writeln!(out, "competing families: gene {} transcript {}", gene_id, transcript_id);
                    let _ = writeln!(out, "\tmatched {}", families.join(", "));
                    let _ = writeln!(out, "\tchose {} by {}\n", chosen, tie_break.as_str());
                }
                ConflictEntry::DuplicateName { gene_id, name, owner } => {
                    let _ = writeln!(out, "duplicate name: {} for gene {}", name, gene_id);
                    let _ = writeln!(out, "\talready held by {}\n", owner);
                }
                ConflictEntry::AliasConflict {
                    gene_id,
                    identifier,
                    kept_name,
                    withheld_name,
                } => {
                    let _ = writeln!(out, "alias conflict: {} (cluster of gene {})", identifier, gene_id);
                    let _ = writeln!(out, "\tkept {}, withheld {}\n", kept_name, withheld_name);
                }
                ConflictEntry::SplitCluster {
                    gene_id,
                    family,
                    identifier,
                    other_family,
                } => {
                    let _ = writeln!(out, "split cluster: {} ({}) shares a gene with {} ({})", gene_id, family, identifier, other_family);
                    let _ = writeln!(out, "\tnamed separately\n");
                }
                ConflictEntry::AmbiguousLink(w) => {
                    let _ = writeln!(out, "ambiguous link: {}", w.identifier);
                    let _ = writeln!(out, "\tlisted under {} and {}, kept {}\n", w.previous_link, w.current_link, w.current_link);
                }
            }
        }

        out
    }

    pub fn render_reassignments(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} legacy names were reassigned\n", self.reassignments.len());
        for r in &self.reassignments {
            let previous = r.previous_name.as_deref().unwrap_or("(none)");
            let _ = writeln!(
                out,
                "{}\t{} -> {}\t{} -> {}",
                r.family, r.old_gene, r.new_gene, previous, r.name
            );
        }
        out
    }

    pub fn render_new_prefixes(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} families received new prefixes\n", self.new_prefixes.len());
        for p in &self.new_prefixes {
            let _ = writeln!(out, "{}\t{}\t({})", p.family, p.prefix, p.source.as_str());
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

    #[test]
    fn test_conflict_report_counts_disagreements() {
        let mut sink = ReportSink::new();
        sink.conflict(ConflictEntry::TranscriptDisagreement {
            gene_id: "G3".to_string(),
            kept_transcript: "G3_T01".to_string(),
            kept_family: "MYB".to_string(),
            other_transcript: "G3_T02".to_string(),
            other_family: "ARR-B".to_string(),
        });
        sink.conflict(ConflictEntry::DuplicateName {
            gene_id: "G9".to_string(),
            name: "ZmMYB1".to_string(),
            owner: "gene1".to_string(),
        });

        let text = sink.render_conflicts();
        assert!(text.starts_with("1 pairs of transcripts had conflicting families\n"));
        assert!(text.contains("transcript G3_T01 has family MYB (kept)"));
        assert!(text.contains("transcript G3_T02 has family ARR-B"));
        assert!(text.contains("duplicate name: ZmMYB1 for gene G9"));
    }

    #[test]
    fn test_reassignment_report() {
        let mut sink = ReportSink::new();
        sink.reassignment(Reassignment {
            family: "bZIP".to_string(),
            old_gene: "G1".to_string(),
            new_gene: "G2".to_string(),
            previous_name: None,
            name: "ZmbZIP4".to_string(),
        });

        let text = sink.render_reassignments();
        assert!(text.starts_with("1 legacy names were reassigned"));
        assert!(text.contains("bZIP\tG1 -> G2\t(none) -> ZmbZIP4"));
    }

    #[test]
    fn test_absorb_keeps_order() {
        let mut a = ReportSink::new();
        a.new_prefix(NewPrefix {
            family: "LBD".to_string(),
            prefix: "ZmLBD".to_string(),
            source: PrefixSource::Truncated,
        });
        let mut b = ReportSink::new();
        b.new_prefix(NewPrefix {
            family: "AP2/ERF-RAV".to_string(),
            prefix: "ZmRAV".to_string(),
            source: PrefixSource::Slashed,
        });

        a.absorb(b);
        let families: Vec<&str> = a.new_prefixes.iter().map(|p| p.family.as_str()).collect();
        assert_eq!(families, vec!["LBD", "AP2/ERF-RAV"]);
        assert!(a.render_new_prefixes().contains("AP2/ERF-RAV\tZmRAV\t(slashed family)"));
    }
}
