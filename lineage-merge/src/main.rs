//! lineage-merge - Course topic merge tool
//!
//! Finds course records across semesters that are the same underlying course
//! and merges their topics. Runs discovery over every topic, or merges an
//! explicit list of topics with `--topic-ids`. Every run is a single
//! transaction: it commits completely or not at all.

use anyhow::{Context, Result};
use clap::Parser;
use lineage_common::config::{CliOverrides, MergeSettings, SettingsResolver};
use lineage_common::db::init_database;
use lineage_merge::similarity::{CourseTextHeuristics, HttpEmbedder};
use lineage_merge::{
    AuditReviewer, ConsoleReviewer, LinkOracle, ManualMergeOutcome, RenumberingMap, Reviewer,
    RunOptions, SimilarityScorer, TransactionCoordinator,
};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for lineage-merge
#[derive(Parser, Debug)]
#[command(name = "lineage-merge")]
#[command(about = "Merge course topics that denote the same underlying course")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite catalog database
    #[arg(long)]
    database: Option<PathBuf>,

    /// Crosswalk (renumbering map) file mapping old course codes to new ones
    #[arg(long = "cross-walk")]
    cross_walk: Option<PathBuf>,

    /// Sentence embedding endpoint
    #[arg(long)]
    embedding_url: Option<String>,

    /// Merge these topics (left to right) instead of running discovery
    #[arg(short = 't', long = "topic-ids", num_args = 1..)]
    topic_ids: Vec<String>,

    /// Never prompt; log possible links for later audit instead
    #[arg(long)]
    batch: bool,

    /// Skip the confirmation prompt for --topic-ids
    #[arg(short, long)]
    yes: bool,

    /// Apply every merge inside the transaction, then roll back
    #[arg(long)]
    dry_run: bool,

    /// Write possible links found in batch mode to this JSON file
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = SettingsResolver::new(CliOverrides {
        config_path: args.config.clone(),
        database_path: args.database.clone(),
        crosswalk_path: args.cross_walk.clone(),
        embedding_url: args.embedding_url.clone(),
    })
    .resolve()
    .context("Failed to resolve settings")?;

    let default_level = if args.verbose {
        "debug".to_string()
    } else {
        settings.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level)),
        )
        .init();

    info!(
        "Starting lineage-merge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    println!(
        "This run is atomic: all merges are applied in one transaction, \
         and any error rolls the whole run back."
    );

    info!("Database: {}", settings.database_path.display());
    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to open catalog database")?;
    let coordinator = TransactionCoordinator::new(pool);

    if args.topic_ids.is_empty() {
        run_discovery(&args, &settings, &coordinator).await
    } else {
        run_manual(&args, &coordinator).await
    }
}

async fn run_discovery(
    args: &Args,
    settings: &MergeSettings,
    coordinator: &TransactionCoordinator,
) -> Result<()> {
    let crosswalk = match &settings.crosswalk_path {
        Some(path) => RenumberingMap::from_path(path, settings.crosswalk_delimiter)
            .with_context(|| format!("Failed to load crosswalk {}", path.display()))?,
        None => {
            info!("No crosswalk given; only similarity and identity links apply");
            RenumberingMap::empty()
        }
    };
    if crosswalk.branch_len() > 0 {
        info!(
            branched = crosswalk.branch_len(),
            "Crosswalk codes with several destinations are not applied"
        );
        for (old_code, destinations) in crosswalk.branches() {
            debug!(old_code, ?destinations, "Branched crosswalk entry");
        }
    }

    let embedder = HttpEmbedder::new(&settings.embedding)?;
    let scorer = SimilarityScorer::new(
        Box::new(embedder),
        Box::new(CourseTextHeuristics),
        settings.thresholds.clone(),
    );
    let reviewer: Box<dyn Reviewer> = if args.batch {
        Box::new(AuditReviewer::new())
    } else {
        Box::new(ConsoleReviewer::new(io::stdin().lock(), io::stdout()))
    };
    let mut oracle = LinkOracle::new(crosswalk, scorer, reviewer);

    let report = coordinator
        .run_discovery(
            &mut oracle,
            RunOptions {
                dry_run: args.dry_run,
                show_progress: !args.batch,
            },
        )
        .await?;

    info!(
        merges = report.merge_count(),
        same_semester_conflicts = report.same_semester_conflicts,
        rejected_pairs = report.rejected_pairs,
        similarity_checks = report.similarity_checks,
        possible_links = report.possible_links.len(),
        "Run summary"
    );

    if let Some(path) = &args.audit_log {
        let json = serde_json::to_string_pretty(&report.possible_links)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write audit log {}", path.display()))?;
        info!("Wrote {} possible links to {}", report.possible_links.len(), path.display());
    }

    if !report.committed {
        println!("Dry run: no changes were committed.");
    }
    println!("Finished merging topics (performed {} merges).", report.merge_count());
    Ok(())
}

async fn run_manual(args: &Args, coordinator: &TransactionCoordinator) -> Result<()> {
    if args.batch && !args.yes {
        warn!("Batch mode cannot confirm a manual merge; pass --yes to merge unattended");
    }

    let mut reviewer: Box<dyn Reviewer> = if args.batch {
        Box::new(AuditReviewer::new())
    } else {
        Box::new(ConsoleReviewer::new(io::stdin().lock(), io::stdout()).compact())
    };

    let outcome = coordinator
        .run_manual(&args.topic_ids, &mut *reviewer, !args.yes, args.dry_run)
        .await?;

    match outcome {
        ManualMergeOutcome::Merged {
            survivor,
            steps,
            committed,
        } => {
            let absorbed: Vec<i64> = steps.iter().map(|s| s.absorbed).collect();
            if !committed {
                println!("Dry run: no changes were committed.");
            }
            println!(
                "Merged topics {:?} into topic {} (performed {} merges).",
                absorbed,
                survivor,
                steps.len()
            );
        }
        ManualMergeOutcome::Declined => println!("Aborting merge."),
    }
    Ok(())
}
