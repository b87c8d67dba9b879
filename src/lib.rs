//! # Dustpan
//!
//! Find, delete and prune files by size, extension and age, and clear the
//! operating system's cache and temp directories.
//!
//! ## Features
//!
//! - Scan a directory tree with a composite filter (size range, extensions,
//!   excluded names, modification age)
//! - Delete the matches in parallel, or preview them with a dry run
//! - Remove directories left empty afterwards, deepest first
//! - Size and clear well-known cache locations, forcing past read-only
//!   files where the platform allows it
//!
//! ## Usage
//!
//! ### Command Line
//!
//! ```bash
//! # List log files over 1MB anywhere below the current directory
//! dustpan scan . -r --ext log --min-size 1MB
//!
//! # Delete temp files older than 30 days, then prune empty folders
//! dustpan delete ./build -r --ext tmp --older-than 30 --prune
//!
//! # See how much the OS caches hold
//! dustpan cache scan
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use dustpan::{CleanConfig, FileCleaner, FileFilter, FileScanner};
//! use std::path::Path;
//!
//! let filter = FileFilter::new().with_extensions(["tmp"]).older_than_days(30);
//!
//! let report = FileScanner::default().scan(Path::new("."), &filter)?;
//! println!("{} files, {}", report.len(), report.formatted_size());
//!
//! // Dry run: nothing is removed
//! let cleaner = FileCleaner::new(CleanConfig { dry_run: true, ..Default::default() });
//! let result = cleaner.delete_matching(Path::new("."), &filter)?;
//! println!("would free {}", result.format_size());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export core functionality
pub use dustpan_core::*;
