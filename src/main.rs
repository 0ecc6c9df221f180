// GRASSIUS naming CLI
// Loads the input tables, runs the naming engine and writes registry + reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grassius_names::pipeline::{NamingInputs, NamingPipeline, PreparedTables};
use grassius_names::{fasta, tables, IdentityResolver, NamingConfig, RuleTable, VERSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Gene identity resolution and protein naming for the GRASSIUS registry
#[derive(Parser)]
#[command(name = "grassius-names")]
#[command(version = VERSION)]
#[command(about = "🌽 Resolve maize gene identities, classify TF families and assign protein names")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Naming config (JSON); defaults are used when omitted
    #[arg(long, global = true, env = "GRASSIUS_NAMES_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: classify, name, and write registry, reports and views
    Assign(AssignArgs),

    /// Classification only: gene families and the conflict report
    Classify(AssignArgs),

    /// Compare classified families with the legacy registry
    Audit(InputArgs),

    /// Print the identity cluster of one gene id
    Resolve(ResolveArgs),

    /// Write the rule table as an iTAK TF_Rule.txt file
    #[command(name = "export-rules")]
    ExportRules(ExportRulesArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Family rule table (CSV: family,required,forbidden,category)
    #[arg(long)]
    rules: PathBuf,

    /// Domain evidence: two-column TSV or hmmscan --domtblout
    #[arg(long)]
    evidence: PathBuf,

    /// Protein FASTA files with gene: annotations (repeatable)
    #[arg(long, required = true)]
    fasta: Vec<PathBuf>,

    /// Legacy name table (CSV: name,family,accepted,synonym,v3_id)
    #[arg(long)]
    legacy: Option<PathBuf>,

    /// MaizeGDB gene id association table (TSV)
    #[arg(long)]
    associations: Option<PathBuf>,
}

#[derive(Args)]
struct AssignArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output directory
    #[arg(short, long, default_value = "grassius-out")]
    out: PathBuf,
}

#[derive(Args)]
struct ResolveArgs {
    /// Gene id to look up
    identifier: String,

    /// MaizeGDB gene id association table (TSV)
    #[arg(long)]
    associations: PathBuf,
}

#[derive(Args)]
struct ExportRulesArgs {
    /// Family rule table (CSV)
    #[arg(long)]
    rules: PathBuf,

    /// Destination; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = NamingConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Assign(args) => run_assign(&args, &config),
        Commands::Classify(args) => run_classify(&args, &config),
        Commands::Audit(args) => run_audit(&args, &config),
        Commands::Resolve(args) => run_resolve(&args),
        Commands::ExportRules(args) => run_export_rules(&args),
    }
}

// ============================================================================
// INPUT LOADING
// ============================================================================

fn load_inputs(args: &InputArgs, config: &NamingConfig) -> Result<NamingInputs> {
    println!("📂 Loading input tables...");

    let rules = tables::load_rules(&args.rules)?;
    let evidence = tables::load_domain_evidence(&args.evidence, &config.score_thresholds)?;

    let mut transcript_genes = fasta::TranscriptGeneMap::new();
    for path in &args.fasta {
        transcript_genes.extend(fasta::load_transcript_genes(path)?);
    }

    let legacy = match &args.legacy {
        Some(path) => tables::load_legacy_names(path)?,
        None => Vec::new(),
    };
    let cross_references = match &args.associations {
        Some(path) => tables::load_cross_references(path)?,
        None => Vec::new(),
    };

    println!("✓ {} rules, {} evidence rows", rules.len(), evidence.len());
    println!("✓ {} transcripts mapped to genes", transcript_genes.len());
    println!("✓ {} legacy names, {} cross-references", legacy.len(), cross_references.len());

    Ok(NamingInputs {
        cross_references,
        evidence,
        rules,
        legacy,
        transcript_genes,
    })
}

fn prepare_out_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_assign(args: &AssignArgs, config: &NamingConfig) -> Result<()> {
    let inputs = load_inputs(&args.inputs, config)?;

    println!("\n🏷️  Assigning names...");
    let run = NamingPipeline::run(&inputs, config)?;

    prepare_out_dir(&args.out)?;
    tables::save_csv(&args.out.join("registry.csv"), &run.registry)?;
    tables::save_csv(&args.out.join("gene_families.csv"), &run.classification.to_vec())?;
    tables::save_text(&args.out.join("conflicts.txt"), &run.report.render_conflicts())?;
    tables::save_text(&args.out.join("reassignments.txt"), &run.report.render_reassignments())?;
    tables::save_text(&args.out.join("new_prefixes.txt"), &run.report.render_new_prefixes())?;
    tables::save_views(&args.out, &run.views)?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ {} genes named", run.registry.len());
    println!("✓ {}", run.report.summary());
    println!("✓ Registry fingerprint: {}", run.fingerprint);
    println!("📁 Output written to {:?}", args.out);
    Ok(())
}

fn run_classify(args: &AssignArgs, config: &NamingConfig) -> Result<()> {
    let inputs = load_inputs(&args.inputs, config)?;

    println!("\n🧪 Classifying genes...");
    let prepared = PreparedTables::build(&inputs)?;
    let classification = prepared.classify(&inputs, config);

    prepare_out_dir(&args.out)?;
    tables::save_csv(&args.out.join("gene_families.csv"), &classification.to_vec())?;
    tables::save_text(&args.out.join("conflicts.txt"), &classification.report.render_conflicts())?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ {} genes classified", classification.gene_count());
    println!("✓ {} conflicts logged", classification.report.conflicts.len());
    if !classification.unmapped_transcripts.is_empty() {
        println!("⚠️  {} matching transcripts had no gene", classification.unmapped_transcripts.len());
    }
    Ok(())
}

fn run_audit(args: &InputArgs, config: &NamingConfig) -> Result<()> {
    let inputs = load_inputs(args, config)?;
    let prepared = PreparedTables::build(&inputs)?;
    let classification = prepared.classify(&inputs, config);
    let audit = prepared.audit(&classification, config);

    println!("\n🔍 Family audit: {}\n", audit.summary());
    print!("{}", audit.render_changed());
    print!("\n{}", audit.render_missing());
    print!("\n{}", audit.render_new());
    Ok(())
}

fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let resolver = IdentityResolver::build(tables::load_cross_references(&args.associations)?);
    let cluster = resolver.resolve(&args.identifier);

    println!("{} -> {}", args.identifier, resolver.cluster_key(&args.identifier));
    for identifier in &cluster {
        println!("  {}", identifier);
    }
    Ok(())
}

fn run_export_rules(args: &ExportRulesArgs) -> Result<()> {
    let rules = RuleTable::from_rows(&tables::load_rules(&args.rules)?)?;
    let text = rules.to_itak_rules();

    match &args.out {
        Some(path) => {
            tables::save_text(path, &text)?;
            println!("✓ Wrote {} rules to {:?}", rules.rule_count(), path);
        }
        None => print!("{}", text),
    }
    Ok(())
}
