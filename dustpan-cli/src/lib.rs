use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dustpan_core::{
    CleanConfig, CleanResult, FileCleaner, FileFilter, FileScanner, LocationScan, PruneResult,
    ScanReport, WalkConfig, cache, format_bytes, pruner,
};

pub mod config;

pub use config::FilterProfile;

#[derive(Parser)]
#[command(name = "dustpan")]
#[command(about = "Find, delete and prune files by size, extension and age, and clear OS caches")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List files matching a filter
    Scan {
        /// Directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        filter: FilterArgs,

        /// Sort by size (largest first)
        #[arg(short = 'S', long)]
        sort_by_size: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete files matching a filter
    Delete {
        /// Directory to clean
        path: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        filter: FilterArgs,

        /// Dry run - show what would be deleted without deleting
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Remove directories left empty afterwards (recursive deletes only)
        #[arg(long)]
        prune: bool,
    },
    /// Remove empty subdirectories
    Prune {
        /// Directory to prune (kept itself)
        path: PathBuf,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Inspect or clear OS cache and temp directories
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show the size of each cache location
    Scan {
        /// Operating system whose locations to use
        #[arg(long, default_value = std::env::consts::OS)]
        os: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the files in every cache location
    Clean {
        /// Operating system whose locations to use
        #[arg(long, default_value = std::env::consts::OS)]
        os: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Filter flags shared by `scan` and `delete`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Smallest size to match, e.g. 10KB
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Largest size to match, e.g. 1GiB
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Extension to match (can be specified multiple times)
    #[arg(short = 'e', long = "ext", value_name = "EXT", action = clap::ArgAction::Append)]
    pub extensions: Vec<String>,

    /// Directory name or name prefix to skip (can be specified multiple times)
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Match files last modified more than N days ago
    #[arg(long = "older-than", value_name = "DAYS")]
    pub older_than_days: Option<u64>,

    /// Match files modified within the last N days
    #[arg(long = "newer-than", value_name = "DAYS")]
    pub newer_than_days: Option<u64>,

    /// Filter profile (TOML); defaults to the user config dir
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl FilterArgs {
    /// Merges the flags over the filter profile.
    pub fn resolve(self, recursive: bool) -> Result<(FileFilter, WalkConfig)> {
        let base = FilterProfile::resolve(self.config.as_deref())?;
        let profile = base.overlay(FilterProfile {
            min_size: self.min_size,
            max_size: self.max_size,
            extensions: self.extensions,
            exclude: self.exclude,
            older_than_days: self.older_than_days,
            newer_than_days: self.newer_than_days,
            recursive: recursive.then_some(true),
            threads: self.threads,
        });

        Ok((profile.to_filter()?, profile.walk_config()))
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("dustpan={log_level}"))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            path,
            recursive,
            filter,
            sort_by_size,
            json,
        } => handle_scan_command(&path, recursive, filter, sort_by_size, json),
        Commands::Delete {
            path,
            recursive,
            filter,
            dry_run,
            yes,
            prune,
        } => handle_delete_command(&path, recursive, filter, dry_run, yes, prune),
        Commands::Prune { path, yes } => handle_prune_command(&path, yes),
        Commands::Cache { action } => match action {
            CacheCommands::Scan { os, json } => handle_cache_scan_command(&os, json),
            CacheCommands::Clean { os, yes } => handle_cache_clean_command(&os, yes),
        },
    }
}

fn handle_scan_command(
    path: &Path,
    recursive: bool,
    filter: FilterArgs,
    sort_by_size: bool,
    json: bool,
) -> Result<()> {
    let (filter, walk) = filter.resolve(recursive)?;

    let mut report = FileScanner::new(walk)
        .scan(path, &filter)
        .with_context(|| format!("failed to scan {}", path.display()))?;

    if sort_by_size {
        report.sort_by_size();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report);
    }
    Ok(())
}

fn handle_delete_command(
    path: &Path,
    recursive: bool,
    filter: FilterArgs,
    dry_run: bool,
    yes: bool,
    prune: bool,
) -> Result<()> {
    let (filter, walk) = filter.resolve(recursive)?;

    let mut report = FileScanner::new(walk.clone())
        .scan(path, &filter)
        .with_context(|| format!("failed to scan {}", path.display()))?;

    if report.is_empty() {
        println!("No matching files found.");
        return Ok(());
    }

    report.sort_by_size();
    display_report(&report);

    if !yes
        && !dry_run
        && !confirm(&format!(
            "\nThis will delete {} files and free up {}. Continue? [y/N]: ",
            report.len(),
            report.formatted_size()
        ))?
    {
        println!("Deletion cancelled.");
        return Ok(());
    }

    // A flat delete empties no subdirectory, so there is nothing to prune.
    let prune_after = prune && !dry_run && walk.recursive;
    if prune && !walk.recursive {
        println!("--prune only applies to recursive deletes; skipping.");
    }

    let cleaner = FileCleaner::new(CleanConfig { walk, dry_run });
    let result = cleaner
        .delete_matching(path, &filter)
        .with_context(|| format!("failed to delete under {}", path.display()))?;
    display_clean_result(&result, dry_run);

    if prune_after {
        let pruned = pruner::prune_empty_subfolders(path)
            .with_context(|| format!("failed to prune {}", path.display()))?;
        display_prune_result(&pruned);
    }

    Ok(())
}

fn handle_prune_command(path: &Path, yes: bool) -> Result<()> {
    let empty = pruner::find_empty_subfolders(path)
        .with_context(|| format!("failed to search {}", path.display()))?;

    if empty.is_empty() {
        println!("No empty folders found.");
        return Ok(());
    }

    println!("Found {} empty folders:", empty.len());
    for dir in &empty {
        println!("  {}", dir.strip_prefix(path).unwrap_or(dir).display());
    }

    if !yes && !confirm(&format!("\nRemove {} folders? [y/N]: ", empty.len()))? {
        println!("Pruning cancelled.");
        return Ok(());
    }

    let result = pruner::prune_empty_subfolders(path)
        .with_context(|| format!("failed to prune {}", path.display()))?;
    display_prune_result(&result);
    Ok(())
}

fn handle_cache_scan_command(os: &str, json: bool) -> Result<()> {
    let locations = cache::locations_for(os);
    let scans = cache::scan_all(&locations);

    if json {
        println!("{}", serde_json::to_string_pretty(&scans)?);
    } else {
        display_cache_scans(os, &scans);
    }
    Ok(())
}

fn handle_cache_clean_command(os: &str, yes: bool) -> Result<()> {
    let locations = cache::locations_for(os);
    if locations.is_empty() {
        println!("No known cache locations for {os:?}.");
        return Ok(());
    }

    let scans = cache::scan_all(&locations);
    display_cache_scans(os, &scans);

    let total: u64 = scans.iter().map(|s| s.size).sum();
    if !yes
        && !confirm(&format!(
            "\nThis will clear {} locations (up to {}). Continue? [y/N]: ",
            locations.len(),
            format_bytes(total)
        ))?
    {
        println!("Cache clean cancelled.");
        return Ok(());
    }

    let result = cache::clear_cache(&locations);
    display_clean_result(&result, false);
    Ok(())
}

fn display_report(report: &ScanReport) {
    if report.is_empty() {
        println!("No matching files found.");
        return;
    }

    println!("\nFound {} files:", report.len());
    println!("{:<15} {:<60}", "Size", "Path");
    println!("{}", "-".repeat(75));

    for entry in &report.entries {
        println!(
            "{:<15} {:<60}",
            format_bytes(entry.size),
            report.relative_path(entry).display()
        );
    }

    println!("{}", "-".repeat(75));
    println!("Total size: {}", report.formatted_size());

    if !report.skipped.is_empty() {
        println!("Skipped {} unreadable entries (use -v for details)", report.skipped.len());
    }
    if report.cancelled {
        println!("Scan was cancelled; results are partial.");
    }
}

fn display_cache_scans(os: &str, scans: &[LocationScan]) {
    if scans.is_empty() {
        println!("No known cache locations for {os:?}.");
        return;
    }

    println!("{:<8} {:<10} {:<15} {:<40}", "Kind", "Entries", "Size", "Path");
    println!("{}", "-".repeat(75));

    for scan in scans {
        let size = match &scan.error {
            Some(_) => "-".to_string(),
            None => scan.formatted_size(),
        };
        println!(
            "{:<8} {:<10} {:<15} {:<40}",
            scan.kind.to_string(),
            scan.file_count,
            size,
            scan.path.display()
        );
    }

    let total: u64 = scans.iter().map(|s| s.size).sum();
    println!("{}", "-".repeat(75));
    println!("Total size: {}", format_bytes(total));
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_affirmative(&input))
}

fn is_affirmative(input: &str) -> bool {
    let answer = input.trim().to_lowercase();
    answer == "y" || answer == "yes"
}

fn display_clean_result(result: &CleanResult, dry_run: bool) {
    if dry_run {
        println!("\nDry run completed!");
        println!("Files that would be deleted: {}", result.removed_files);
        println!("Size that would be freed: {}", result.format_size());
    } else {
        println!("\nCleaning completed!");
        println!("Files deleted: {}", result.removed_files);
        println!("Size freed: {}", result.format_size());
    }

    if !result.failures.is_empty() {
        println!("\nFailed to delete {} files:", result.failures.len());
        for failure in &result.failures {
            println!("  - {}: {}", failure.path.display(), failure.error);
        }
    }
}

fn display_prune_result(result: &PruneResult) {
    println!("Empty folders removed: {}", result.removed.len());

    if !result.failures.is_empty() {
        println!("\nFailed to remove {} folders:", result.failures.len());
        for failure in &result.failures {
            println!("  - {}: {}", failure.path.display(), failure.error);
        }
    }
}
