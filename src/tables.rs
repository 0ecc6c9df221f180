// 📂 Tables - File loaders and writers around the naming core
// The core never touches disk; everything it consumes or produces passes through here.

use crate::assigner::NameRecord;
use crate::domains::{strip_accession_version, DomainEvidence, DomainHit, ScoreThresholds};
use crate::identity::{normalize_identifier, CrossReference};
use crate::legacy::LegacyRow;
use crate::rules::RawRule;
use crate::views::RegistryViews;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {} file: {:?}", what, path))
}

// ============================================================================
// CROSS-REFERENCE TABLE
// ============================================================================

/// MaizeGDB association TSV: `linking_name<TAB>id<TAB>id...` after one header line.
/// Retired-assembly ids are dropped; an unknown id prefix aborts.
pub fn read_cross_references<R: Read>(reader: R) -> Result<Vec<CrossReference>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read association row {}", line + 2))?;
        let mut fields = record.iter();
        let Some(linking_name) = fields.next().map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };

        for raw in fields {
            let identifier = normalize_identifier(raw)
                .with_context(|| format!("Bad gene id in association row {}", line + 2))?;
            if let Some(identifier) = identifier {
                rows.push(CrossReference::new(identifier, linking_name));
            }
        }
    }

    debug!("Read {} cross-reference rows", rows.len());
    Ok(rows)
}

pub fn load_cross_references(path: &Path) -> Result<Vec<CrossReference>> {
    read_cross_references(open(path, "association")?)
        .with_context(|| format!("Failed to load associations: {:?}", path))
}

// ============================================================================
// DOMAIN EVIDENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceFormat {
    /// `transcript_id<TAB>accession`, optional header
    Tsv,

    /// hmmscan `--domtblout`
    Domtblout,
}

impl EvidenceFormat {
    /// domtblout starts with `#` comments and is space-aligned
    pub fn detect(content: &str) -> Self {
        match content.lines().find(|l| !l.trim().is_empty()) {
            Some(line) if line.starts_with('#') => EvidenceFormat::Domtblout,
            Some(line) if line.contains('\t') => EvidenceFormat::Tsv,
            Some(_) => EvidenceFormat::Domtblout,
            None => EvidenceFormat::Tsv,
        }
    }
}

/// Either format; domtblout hits below their accession's threshold are dropped
pub fn read_domain_evidence<R: Read>(mut reader: R, thresholds: &ScoreThresholds) -> Result<Vec<DomainEvidence>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .context("Failed to read domain evidence")?;

    let evidence = match EvidenceFormat::detect(&content) {
        EvidenceFormat::Domtblout => {
            let hits: Vec<DomainHit> = content.lines().filter_map(DomainHit::from_domtblout_line).collect();
            let total = hits.len();
            let kept = thresholds.filter(hits);
            debug!("domtblout: kept {} of {} hits", kept.len(), total);
            kept
        }
        EvidenceFormat::Tsv => content
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(transcript, accession)| (transcript.trim(), accession.trim()))
            .filter(|(transcript, accession)| {
                !transcript.is_empty() && !accession.is_empty() && *transcript != "transcript_id"
            })
            .map(|(transcript, accession)| DomainEvidence::new(transcript, strip_accession_version(accession)))
            .collect(),
    };

    Ok(evidence)
}

pub fn load_domain_evidence(path: &Path, thresholds: &ScoreThresholds) -> Result<Vec<DomainEvidence>> {
    read_domain_evidence(open(path, "domain evidence")?, thresholds)
        .with_context(|| format!("Failed to load domain evidence: {:?}", path))
}

// ============================================================================
// RULE AND LEGACY TABLES (CSV)
// ============================================================================

fn read_csv_rows<R, T>(reader: R, what: &str) -> Result<Vec<T>>
where
    R: Read,
    T: serde::de::DeserializeOwned,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to deserialize {} row {}", what, line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_rules<R: Read>(reader: R) -> Result<Vec<RawRule>> {
    read_csv_rows(reader, "family rule")
}

pub fn load_rules(path: &Path) -> Result<Vec<RawRule>> {
    read_rules(open(path, "family rule")?).with_context(|| format!("Failed to load rules: {:?}", path))
}

pub fn read_legacy_names<R: Read>(reader: R) -> Result<Vec<LegacyRow>> {
    read_csv_rows(reader, "legacy name")
}

pub fn load_legacy_names(path: &Path) -> Result<Vec<LegacyRow>> {
    read_legacy_names(open(path, "legacy name")?)
        .with_context(|| format!("Failed to load legacy names: {:?}", path))
}

// ============================================================================
// WRITERS
// ============================================================================

pub fn write_csv_rows<W, T>(writer: W, rows: &[T]) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Registry CSV: gene_id,name,family,class_label,origin
pub fn write_registry<W: Write>(writer: W, records: &[NameRecord]) -> Result<()> {
    write_csv_rows(writer, records)
}

pub fn save_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv_rows(file, rows).with_context(|| format!("Failed to write {:?}", path))
}

pub fn save_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

pub fn save_views(dir: &Path, views: &RegistryViews) -> Result<()> {
    save_csv(&dir.join("gene_name.csv"), &views.gene_names)?;
    save_csv(&dir.join("default_names.csv"), &views.default_names)?;
    save_csv(&dir.join("families.csv"), &views.families)?;
    info!("Wrote {} name views to {:?}", views.default_names.len(), dir);
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
