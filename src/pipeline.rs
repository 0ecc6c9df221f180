// 🔗 Naming Pipeline - Identity -> Classification -> Names -> Views
// Single-threaded batch over in-memory tables. No I/O.

use crate::assigner::{fingerprint, NameAssigner, NameRecord};
use crate::audit::FamilyAudit;
use crate::classifier::{Classification, FamilyClassifier};
use crate::config::NamingConfig;
use crate::domains::{AccessionSets, DomainEvidence};
use crate::fasta::TranscriptGeneMap;
use crate::identity::{CrossReference, IdentityResolver};
use crate::legacy::{LegacyRegistry, LegacyRow};
use crate::report::ReportSink;
use crate::rules::{RawRule, RuleTable};
use crate::views::RegistryViews;
use anyhow::{Context, Result};
use tracing::info;

/// Every table a run consumes, already loaded
#[derive(Debug, Clone, Default)]
pub struct NamingInputs {
    pub cross_references: Vec<CrossReference>,
    pub evidence: Vec<DomainEvidence>,
    pub rules: Vec<RawRule>,
    pub legacy: Vec<LegacyRow>,
    pub transcript_genes: TranscriptGeneMap,
}

/// Read-only indexes built once per run
#[derive(Debug, Clone)]
pub struct PreparedTables {
    pub resolver: IdentityResolver,
    pub legacy: LegacyRegistry,
    pub rules: RuleTable,
}

impl PreparedTables {
    /// Fails on a malformed rule or a legacy name without suffix
    pub fn build(inputs: &NamingInputs) -> Result<Self> {
        let rules = RuleTable::from_rows(&inputs.rules).context("Failed to parse family rules")?;
        let legacy = LegacyRegistry::from_rows(&inputs.legacy).context("Failed to parse legacy names")?;
        let resolver = IdentityResolver::build(inputs.cross_references.iter().cloned());

        info!(
            "Prepared {} rules, {} legacy names, {} linked identifiers in {} clusters",
            rules.rule_count(),
            legacy.len(),
            resolver.identifier_count(),
            resolver.cluster_count()
        );

        Ok(PreparedTables { resolver, legacy, rules })
    }

    /// Classify with priority list and legacy-agreement override
    pub fn classify(&self, inputs: &NamingInputs, config: &NamingConfig) -> Classification {
        let genes = inputs.transcript_genes.values().map(String::as_str);
        let legacy_families = self.legacy.families_for_genes(genes, &self.resolver);

        let sets = AccessionSets::from_evidence(&inputs.evidence);
        FamilyClassifier::new(&self.rules)
            .with_priority(config.priority_families.clone())
            .with_legacy_families(legacy_families)
            .classify(&sets, &inputs.transcript_genes)
    }

    pub fn audit(&self, classification: &Classification, config: &NamingConfig) -> FamilyAudit {
        FamilyAudit::compare(classification, &self.legacy, &self.resolver, &config.orphan_family)
    }
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct NamingRun {
    /// Sorted by name, then gene id
    pub registry: Vec<NameRecord>,
    pub classification: Classification,

    /// Link warnings, classification conflicts, then naming events
    pub report: ReportSink,
    pub views: RegistryViews,
    pub audit: FamilyAudit,
    pub fingerprint: String,
}

pub struct NamingPipeline;

impl NamingPipeline {
    pub fn run(inputs: &NamingInputs, config: &NamingConfig) -> Result<NamingRun> {
        let prepared = PreparedTables::build(inputs)?;
        let classification = prepared.classify(inputs, config);

        let mut report = ReportSink::new();
        report.link_warnings(prepared.resolver.warnings());
        report.absorb(classification.report.clone());

        let registry = NameAssigner::new(&prepared.legacy, &prepared.resolver, config)
            .with_class_labels(prepared.rules.class_labels(&config.coregulator_category))
            .assign(&classification.to_vec(), &mut report)
            .context("Failed to assign names")?;

        let views = RegistryViews::build(&registry, &prepared.legacy, &prepared.resolver)
            .context("Failed to build registry views")?;
        let audit = prepared.audit(&classification, config);
        let fingerprint = fingerprint(&registry);

        info!("Run complete: {}", report.summary());
        info!("Registry fingerprint {}", fingerprint);

        Ok(NamingRun {
            registry,
            classification,
            report,
            views,
            audit,
            fingerprint,
        })
    }
}
