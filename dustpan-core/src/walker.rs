use crossbeam_channel::unbounded;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancellationToken;
use crate::error::{Result, check_root};

/// Tree walk configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkConfig {
    /// Walk the whole subtree instead of only the root's immediate children.
    pub recursive: bool,
    pub follow_links: bool,
    /// Depth limit for recursive walks (children of the root are depth 1).
    pub max_depth: Option<usize>,
    /// Worker count. `None` uses the number of available processors.
    pub threads: Option<usize>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_links: false,
            max_depth: None,
            threads: None,
        }
    }
}

impl WalkConfig {
    pub fn worker_count(&self) -> usize {
        self.threads.filter(|n| *n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    fn depth_limit(&self) -> usize {
        if self.recursive {
            self.max_depth.unwrap_or(usize::MAX)
        } else {
            1
        }
    }
}

/// Why an entry was left out of a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The directory listing failed.
    Walk(String),
    /// The entry was listed but could not be stat'ed.
    Metadata(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: Option<PathBuf>,
    pub reason: SkipReason,
}

/// What the collector ends up with once every worker has finished.
#[derive(Debug)]
pub struct WalkSummary<A> {
    pub output: A,
    pub skipped: Vec<SkippedEntry>,
    pub cancelled: bool,
}

enum Event<T> {
    Item(T),
    Skipped(SkippedEntry),
}

/// Walks a directory tree and runs a task on every non-directory entry.
///
/// The calling thread enumerates entries; a fixed-size worker pool pulls them
/// and runs the task, and every result is sent to a single collector thread
/// that owns the aggregate. `run` joins the pool and the collector before it
/// returns, so the output is always complete.
pub struct TreeWalker {
    config: WalkConfig,
    cancel: CancellationToken,
}

impl TreeWalker {
    pub fn new(config: WalkConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Runs `task` on each file under `root` and folds its results with `fold`.
    ///
    /// Entries that fail to list or stat are recorded as skipped. Only a root
    /// that cannot be listed is an error.
    pub fn run<T, A, F, G>(
        &self,
        root: &Path,
        task: F,
        init: A,
        mut fold: G,
    ) -> Result<WalkSummary<A>>
    where
        T: Send,
        A: Send,
        F: Fn(&Path, &Metadata) -> Option<T> + Sync,
        G: FnMut(&mut A, T) + Send,
    {
        check_root(root)?;

        let workers = self.config.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dustpan-worker-{i}"))
            .build()?;
        debug!("walking {:?} with {} workers", root, workers);

        let (sender, receiver) = unbounded::<Event<T>>();
        let cancel = &self.cancel;
        let task = &task;

        let (output, skipped) = std::thread::scope(|scope| {
            let collector = scope.spawn(move || {
                let mut output = init;
                let mut skipped = Vec::new();
                for event in receiver {
                    match event {
                        Event::Item(item) => fold(&mut output, item),
                        Event::Skipped(entry) => skipped.push(entry),
                    }
                }
                (output, skipped)
            });

            let entries = self.entries(root).take_while(|_| !cancel.is_cancelled());
            pool.install(move || {
                entries.par_bridge().for_each_with(sender, |sender, entry| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if let Some(event) = visit(entry, task) {
                        // The collector only hangs up after every sender is gone.
                        let _ = sender.send(event);
                    }
                });
            });

            collector
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        });

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!("walk of {:?} cancelled", root);
        }
        if !skipped.is_empty() {
            debug!("skipped {} entries under {:?}", skipped.len(), root);
        }

        Ok(WalkSummary {
            output,
            skipped,
            cancelled,
        })
    }

    fn entries(&self, root: &Path) -> walkdir::IntoIter {
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.depth_limit())
            .follow_links(self.config.follow_links)
            .into_iter()
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new(WalkConfig::default())
    }
}

fn visit<T, F>(entry: walkdir::Result<DirEntry>, task: &F) -> Option<Event<T>>
where
    F: Fn(&Path, &Metadata) -> Option<T>,
{
    let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
            warn!("walk error: {}", err);
            return Some(Event::Skipped(SkippedEntry {
                path: err.path().map(Path::to_path_buf),
                reason: SkipReason::Walk(err.to_string()),
            }));
        }
    };

    if entry.file_type().is_dir() {
        return None;
    }

    match entry.metadata() {
        Ok(metadata) => task(entry.path(), &metadata).map(Event::Item),
        Err(err) => {
            warn!("cannot stat {:?}: {}", entry.path(), err);
            Some(Event::Skipped(SkippedEntry {
                path: Some(entry.path().to_path_buf()),
                reason: SkipReason::Metadata(err.to_string()),
            }))
        }
    }
}
