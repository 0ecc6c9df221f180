// ⚙️ Naming Configuration
// JSON file, every field optional; defaults reproduce the maize registry.

use crate::domains::ScoreThresholds;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Literal species marker in front of synthesized prefixes ("Zm" for maize)
    pub species_prefix: String,

    /// Characters of the family name kept when truncating
    pub prefix_length: usize,

    /// Preferred families for multi-match tie-breaks, highest first
    pub priority_families: Vec<String>,

    /// Hand-coded prefixes for families whose names don't truncate well
    pub abbreviations: IndexMap<String, String>,

    /// Legacy family holding unclassified genes; ignored by the audit
    pub orphan_family: String,

    /// Minimum full-sequence score per accession for domtblout input
    pub score_thresholds: ScoreThresholds,

    /// Rule category that marks a family as coregulator instead of TF
    pub coregulator_category: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        let abbreviations = [
            ("AP2/ERF-AP2", "ZmEREB"),
            ("AP2/ERF-ERF", "ZmERF"),
            ("AP2/ERF-RAV", "ZmRAV"),
            ("C2C2-CO-like", "ZmCOL"),
            ("C2C2-Dof", "ZmDOF"),
            ("C2C2-GATA", "ZmGATA"),
            ("C2C2-YABBY", "ZmYAB"),
            ("MYB-related", "ZmMYBR"),
            ("SWI/SNF-SWI3", "ZmSWI3"),
            ("SWI/SNF-BAF60b", "ZmBAF60B"),
        ];

        NamingConfig {
            species_prefix: "Zm".to_string(),
            prefix_length: 5,
            priority_families: Vec::new(),
            abbreviations: abbreviations
                .iter()
                .map(|(family, prefix)| (family.to_string(), prefix.to_string()))
                .collect(),
            orphan_family: "Orphans".to_string(),
            score_thresholds: ScoreThresholds::default(),
            coregulator_category: "coregulators".to_string(),
        }
    }
}

impl NamingConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse naming config JSON")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    /// Default config unless a file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize naming config")
    }
}
