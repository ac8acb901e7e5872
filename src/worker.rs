//! Batch orchestration: extract -> generate -> resolve -> apply for every
//! file in a request, on a background worker decoupled from the caller.

use crate::conflict::{self, ResolvedAction};
use crate::config::Config;
use crate::models::{ConflictPolicy, FileItem, Outcome, ProgressEvent, RenamePlan};
use crate::tags;
use crate::template;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything one batch needs, captured up front. Nothing in here is mutated
/// while the batch runs.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub files: Vec<PathBuf>,
    pub template: String,
    pub dry_run: bool,
    pub policy: ConflictPolicy,
    pub max_filename_length: Option<usize>,
}

impl BatchRequest {
    pub fn from_config(cfg: &Config, files: Vec<PathBuf>) -> Self {
        Self {
            files,
            template: cfg.template.clone(),
            dry_run: cfg.dry_run,
            policy: cfg.conflict_policy,
            max_filename_length: cfg.max_filename_length,
        }
    }
}

/// Cooperative cancellation flag, checked once per file boundary. The file
/// in flight always completes before the worker exits.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a batch running on a background task. Progress events arrive in
/// file-processing order; the join handle resolves to the final plan.
pub struct BatchHandle {
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
    pub cancel: CancelToken,
    pub handle: tokio::task::JoinHandle<RenamePlan>,
}

/// Run the batch on a blocking worker task, streaming one progress event per
/// file back over the channel.
pub fn spawn_batch(request: BatchRequest) -> BatchHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || {
        process_files(&request, &worker_cancel, |event| {
            let _ = tx.send(event);
        })
    });
    BatchHandle { events: rx, cancel, handle }
}

/// Sequential batch core. Files are processed strictly one at a time, so the
/// resolver's probe-then-claim has no intra-batch races. Per-file failures
/// never abort the batch; only cancellation stops it early.
pub fn process_files(
    request: &BatchRequest,
    cancel: &CancelToken,
    mut progress: impl FnMut(ProgressEvent),
) -> RenamePlan {
    let total = request.files.len();
    let mut plan = RenamePlan::default();
    // Destinations claimed earlier in this batch. Only consulted in dry-run
    // mode; in commit mode the filesystem itself records every claim.
    let mut planned: HashSet<PathBuf> = HashSet::new();

    log::info!(
        "starting batch of {} file(s) (dry_run={}, policy={:?})",
        total,
        request.dry_run,
        request.policy
    );

    for (i, path) in request.files.iter().enumerate() {
        if cancel.is_requested() {
            log::info!(
                "cancellation requested; stopping after {} of {} file(s)",
                i,
                total
            );
            break;
        }

        let mut item = FileItem::new(path);
        let display_name = item.display_name();

        item.metadata = tags::extract(path);
        item.candidate_name =
            template::generate(&item.metadata, &request.template, request.max_filename_length);

        let status = match item.candidate_name.clone() {
            None => {
                item.outcome = Outcome::Unchanged;
                item.error = Some("template produced no usable name".to_string());
                log::warn!("no usable name for {}", path.display());
                "no usable name".to_string()
            }
            Some(name) => {
                let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let destination = directory.join(format!("{}{}", name, item.extension));
                let action = conflict::resolve_with(&destination, request.policy, |p| {
                    p.exists() || (request.dry_run && planned.contains(p))
                });
                match action {
                    ResolvedAction::Skip => {
                        item.outcome = Outcome::Skipped;
                        format!("skipped, {} already exists", destination.display())
                    }
                    ResolvedAction::UseAsIs(target) | ResolvedAction::UseAlternate(target) => {
                        apply_rename(&mut item, path, target, request.dry_run, &mut planned)
                    }
                }
            }
        };

        match item.outcome {
            Outcome::Renamed => plan.succeeded += 1,
            _ => plan.failed += 1,
        }

        progress(ProgressEvent {
            index: i + 1,
            total,
            display_name,
            status,
        });
        plan.items.push(item);
    }

    log::info!(
        "batch finished: {} succeeded, {} failed",
        plan.succeeded,
        plan.failed
    );
    plan
}

fn apply_rename(
    item: &mut FileItem,
    source: &Path,
    target: PathBuf,
    dry_run: bool,
    planned: &mut HashSet<PathBuf>,
) -> String {
    let target_name = target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());

    if dry_run {
        planned.insert(target.clone());
        item.final_path = Some(target);
        item.outcome = Outcome::Renamed;
        return format!("would rename to {}", target_name);
    }

    match std::fs::rename(source, &target) {
        Ok(()) => {
            item.final_path = Some(target);
            item.outcome = Outcome::Renamed;
            format!("renamed to {}", target_name)
        }
        Err(e) => {
            log::error!(
                "failed to rename {} to {}: {}",
                source.display(),
                target.display(),
                e
            );
            item.final_path = Some(target);
            item.outcome = Outcome::Failed;
            item.error = Some(e.to_string());
            format!("rename failed: {}", e)
        }
    }
}
