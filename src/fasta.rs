// 🧾 FASTA Headers - Transcript -> gene mapping
// Headers look like ">Zm00001d000001_P001 pep chromosome:... gene:Zm00001d000001 ..."

use anyhow::{Context, Result};
use bio::io::fasta;
use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// transcript id -> gene id, in file order
pub type TranscriptGeneMap = IndexMap<String, String>;

/// Extract the `gene:` token from a FASTA description
pub fn gene_id_from_description(description: &str) -> Option<&str> {
    description
        .split_whitespace()
        .find_map(|part| part.strip_prefix("gene:"))
        .filter(|gene| !gene.is_empty())
}

fn for_each_annotated<R, F>(reader: R, mut visit: F) -> Result<()>
where
    R: Read,
    F: FnMut(&str, &str),
{
    for record in fasta::Reader::new(reader).records() {
        let record = record.context("Failed to read FASTA record")?;
        if let Some(gene) = record.desc().and_then(gene_id_from_description) {
            visit(record.id(), gene);
        }
    }
    Ok(())
}

/// Records without a `gene:` annotation are skipped
pub fn read_transcript_genes<R: Read>(reader: R) -> Result<TranscriptGeneMap> {
    let mut map = TranscriptGeneMap::new();
    for_each_annotated(reader, |transcript, gene| {
        map.insert(transcript.to_string(), gene.to_string());
    })?;
    debug!("Mapped {} transcripts to genes", map.len());
    Ok(map)
}

/// gene id -> its transcripts, in file order
pub fn read_gene_transcripts<R: Read>(reader: R) -> Result<IndexMap<String, Vec<String>>> {
    let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
    for_each_annotated(reader, |transcript, gene| {
        map.entry(gene.to_string()).or_default().push(transcript.to_string());
    })?;
    Ok(map)
}

pub fn load_transcript_genes(path: &Path) -> Result<TranscriptGeneMap> {
    let file = File::open(path).with_context(|| format!("Failed to open FASTA file: {:?}", path))?;
    read_transcript_genes(file).with_context(|| format!("Failed to parse FASTA file: {:?}", path))
}
