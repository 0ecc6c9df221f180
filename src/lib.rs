// GRASSIUS Naming Engine - Core Library
// Gene identity resolution, family classification and protein naming
// across maize assembly versions. Used by the CLI and the integration tests.

pub mod error;
pub mod config;
pub mod identity;       // Identity clusters across assembly versions
pub mod domains;        // Per-transcript domain evidence
pub mod fasta;          // Transcript -> gene from FASTA headers
pub mod rules;          // Family rules (required / forbidden accessions)
pub mod classifier;     // One family per gene
pub mod legacy;         // Previous naming generation
pub mod prefix;         // Family name prefixes
pub mod assigner;       // Retain / reassign / mint names
pub mod report;         // Conflict, reassignment and prefix logs
pub mod views;          // Per-name registry tables
pub mod audit;          // Family drift vs legacy
pub mod tables;         // File loaders and writers
pub mod pipeline;

// Re-export commonly used types
pub use error::{NamingError, NamingResult};
pub use config::NamingConfig;
pub use identity::{
    normalize_identifier, AssemblyVersion, ClusterKey, CrossReference, IdentityResolver, LinkWarning,
};
pub use domains::{AccessionSets, DomainEvidence, DomainHit, ScoreThresholds};
pub use fasta::TranscriptGeneMap;
pub use rules::{ClassLabel, FamilyRule, RawRule, RuleTable};
pub use classifier::{classify, Classification, FamilyClassifier, GeneFamilyAssignment, TieBreak};
pub use legacy::{LegacyName, LegacyRegistry, LegacyRow};
pub use prefix::FamilyPrefixResolver;
pub use assigner::{assign_names, fingerprint, NameAssigner, NameOrigin, NameRecord};
pub use report::{ConflictEntry, NewPrefix, PrefixSource, Reassignment, ReportSink};
pub use views::RegistryViews;
pub use audit::{FamilyAudit, FamilyChange};
pub use pipeline::{NamingInputs, NamingPipeline, NamingRun, PreparedTables};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
