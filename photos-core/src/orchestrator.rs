use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::config::{DeletionConfig, DEFAULT_CONCURRENCY};
use crate::deleter::AlbumDeleter;
use crate::error::{ConfigError, DeleteError};
use crate::lister::AlbumLister;
use crate::models::{Album, AlbumCollection, ListingHalt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
}

/// One album queued for deletion.
#[derive(Debug, Clone)]
pub struct DeletionTask {
    pub album: Album,
    state: TaskState,
}

impl DeletionTask {
    pub fn new(album: Album) -> Self {
        Self {
            album,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn start(&mut self) {
        debug_assert_eq!(self.state, TaskState::Pending);
        self.state = TaskState::Running;
    }

    pub fn succeed(&mut self) {
        debug_assert_eq!(self.state, TaskState::Running);
        self.state = TaskState::Succeeded;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        debug_assert_eq!(self.state, TaskState::Running);
        self.state = TaskState::Failed(reason.into());
    }

    /// Report for a finished task, `None` while it is still in flight.
    pub fn into_report(self) -> Option<AlbumReport> {
        match self.state {
            TaskState::Succeeded => Some(AlbumReport::Removed { album: self.album }),
            TaskState::Failed(reason) => Some(AlbumReport::Failed {
                album: self.album,
                reason,
            }),
            TaskState::Pending | TaskState::Running => None,
        }
    }
}

/// What happened to one album during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumReport {
    Skipped { album: Album },
    Removed { album: Album },
    Failed { album: Album, reason: String },
}

impl AlbumReport {
    pub fn album(&self) -> &Album {
        match self {
            AlbumReport::Skipped { album }
            | AlbumReport::Removed { album }
            | AlbumReport::Failed { album, .. } => album,
        }
    }
}

/// Receives one call per resolved album. Calls come from a single drain
/// loop, never concurrently.
pub trait ReportSink: Send + Sync {
    fn report(&self, report: &AlbumReport);
}

impl<F> ReportSink for F
where
    F: Fn(&AlbumReport) + Send + Sync,
{
    fn report(&self, report: &AlbumReport) {
        self(report)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub listing_halt: Option<ListingHalt>,
}

impl RunSummary {
    fn record(&mut self, report: &AlbumReport) {
        match report {
            AlbumReport::Skipped { .. } => self.skipped += 1,
            AlbumReport::Removed { .. } => self.succeeded += 1,
            AlbumReport::Failed { .. } => self.failed += 1,
        }
    }

    pub fn resolved(&self) -> usize {
        self.skipped + self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    pub concurrency: usize,
    pub task_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout: DeletionConfig::default().task_timeout,
        }
    }
}

impl From<&DeletionConfig> for OrchestratorOptions {
    fn from(config: &DeletionConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            task_timeout: config.task_timeout,
        }
    }
}

/// Fixed-size pool of workers draining a queue of deletion tasks.
#[derive(Clone)]
pub struct DeletionPool {
    deleter: Arc<dyn AlbumDeleter>,
    options: OrchestratorOptions,
}

impl DeletionPool {
    pub fn new(
        deleter: Arc<dyn AlbumDeleter>,
        options: OrchestratorOptions,
    ) -> Result<Self, ConfigError> {
        if options.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self { deleter, options })
    }

    /// Delete every album, at most `concurrency` at a time, reporting each
    /// outcome exactly once. Returns after all tasks have resolved.
    pub async fn run(&self, albums: Vec<Album>, sink: &dyn ReportSink) -> RunSummary {
        let mut summary = RunSummary::default();
        if albums.is_empty() {
            return summary;
        }

        // Queue in listing order; workers take from the front.
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let worker_count = self.options.concurrency.min(albums.len());
        for album in albums {
            let _ = task_tx.send(DeletionTask::new(album));
        }
        drop(task_tx);
        let queue = Arc::new(Mutex::new(task_rx));

        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<AlbumReport>();
        let mut workers = JoinSet::new();

        tracing::info!(
            "Starting {} {} deletion workers",
            worker_count,
            self.deleter.name()
        );
        for worker in 0..worker_count {
            let queue = Arc::clone(&queue);
            let report_tx = report_tx.clone();
            let deleter = Arc::clone(&self.deleter);
            let task_timeout = self.options.task_timeout;

            workers.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some(mut task) = next else { break };

                    task.start();
                    tracing::debug!("worker {} deleting album {}", worker, task.album.id);
                    match execute(Arc::clone(&deleter), task.album.clone(), task_timeout).await {
                        Ok(()) => task.succeed(),
                        Err(reason) => task.fail(reason),
                    }

                    if let Some(report) = task.into_report() {
                        if report_tx.send(report).is_err() {
                            break;
                        }
                    }
                }
            });
        }
        drop(report_tx);

        while let Some(report) = report_rx.recv().await {
            match &report {
                AlbumReport::Removed { album } => {
                    tracing::info!("Removed album {} ({})", album.id, album.title)
                }
                AlbumReport::Failed { album, reason } => {
                    tracing::warn!("Failed to remove album {}: {}", album.id, reason)
                }
                AlbumReport::Skipped { .. } => {}
            }
            summary.record(&report);
            sink.report(&report);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Deletion worker stopped abnormally: {}", e);
            }
        }

        summary
    }
}

/// Run one deletion in its own task so a panic or a timeout becomes a
/// failure reason instead of taking the worker down.
async fn execute(
    deleter: Arc<dyn AlbumDeleter>,
    album: Album,
    task_timeout: Duration,
) -> Result<(), String> {
    let handle = tokio::spawn(async move {
        match tokio::time::timeout(task_timeout, deleter.delete(&album)).await {
            Ok(result) => result,
            Err(_) => Err(DeleteError::Timeout(task_timeout)),
        }
    });

    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) if e.is_panic() => Err("deletion task panicked".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Lists albums, skips the non-empty ones and deletes the rest.
#[derive(Clone)]
pub struct Orchestrator {
    lister: AlbumLister,
    pool: DeletionPool,
}

impl Orchestrator {
    pub fn new(
        lister: AlbumLister,
        deleter: Arc<dyn AlbumDeleter>,
        options: OrchestratorOptions,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            lister,
            pool: DeletionPool::new(deleter, options)?,
        })
    }

    pub fn lister(&self) -> &AlbumLister {
        &self.lister
    }

    pub async fn delete_empty_albums(&self, sink: &dyn ReportSink) -> RunSummary {
        let albums = self.lister.list_albums().await;
        self.process(albums, sink).await
    }

    /// Deletion phase for an already completed listing.
    pub async fn process(&self, albums: AlbumCollection, sink: &dyn ReportSink) -> RunSummary {
        let listed = albums.len();
        let listing_halt = albums.halted.clone();
        let (empty, non_empty) = albums.partition_by_emptiness();

        let mut summary = RunSummary::default();
        for album in non_empty {
            let report = AlbumReport::Skipped { album };
            summary.record(&report);
            sink.report(&report);
        }

        tracing::info!(
            "{} of {} albums are empty and will be removed",
            empty.len(),
            listed
        );
        let deleted = self.pool.run(empty, sink).await;

        RunSummary {
            listed,
            skipped: summary.skipped,
            succeeded: deleted.succeeded,
            failed: deleted.failed,
            listing_halt,
        }
    }
}
