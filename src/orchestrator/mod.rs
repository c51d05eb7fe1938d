//! Pipeline Orchestrator: the clipboard-watch loop, the work-item state
//! machine, dedup/preemption policy and error routing between stages.
//!
//! Two tasks run concurrently: a lightweight polling loop sampling the
//! clipboard, and a single pipeline lane that drives one work item at a
//! time through acquire -> language gate -> transcribe -> format ->
//! deliver. The polling loop never blocks on pipeline work; detections
//! land in a single pending slot where the newest valid detection replaces
//! a not-yet-started one.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Notify;

pub mod clipboard;
mod item;

pub use clipboard::{ClipboardSource, SystemClipboard};
pub use item::{ItemError, ItemErrorKind, SourceKind, Stage, WorkItem};

use crate::acquire::AudioAcquirer;
use crate::backend::TranscriptionBackend;
use crate::config::Config;
use crate::delivery::{DeliveryOutcome, SubtitleSink};
use crate::gate::{self, GateDecision};
use crate::utils::format_duration;
use crate::{resolver, subtitle, Result};

/// What the orchestrator did with one observed clipboard value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Same text as last observation, nothing to do.
    Unchanged,
    /// Novel text, but not a resolvable source.
    Ignored,
    /// Resolved, but the same canonical ID is already active or pending.
    Duplicate,
    /// Queued into the empty pending slot.
    Queued,
    /// Queued, replacing an older not-yet-started item.
    Superseded,
}

/// State shared between the polling loop and the pipeline lane. Mutated
/// only under this mutex, and only by the orchestrator.
struct LaneState {
    last_clipboard: Option<String>,
    pending: Option<WorkItem>,
    active: HashSet<String>,
}

pub struct Orchestrator {
    config: Config,
    acquirer: Arc<dyn AudioAcquirer>,
    backend: Arc<dyn TranscriptionBackend>,
    sink: Arc<dyn SubtitleSink>,
    state: Mutex<LaneState>,
    wakeup: Notify,
    workdir: TempDir,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        acquirer: Arc<dyn AudioAcquirer>,
        backend: Arc<dyn TranscriptionBackend>,
        sink: Arc<dyn SubtitleSink>,
    ) -> Result<Self> {
        fs_err::create_dir_all(&config.output_dir)?;
        let workdir = TempDir::new()?;

        Ok(Self {
            config,
            acquirer,
            backend,
            sink,
            state: Mutex::new(LaneState {
                last_clipboard: None,
                pending: None,
                active: HashSet::new(),
            }),
            wakeup: Notify::new(),
            workdir,
        })
    }

    /// Feed one observed clipboard value through detection, dedup and the
    /// single-slot queue.
    pub fn observe(&self, text: &str) -> Detection {
        let mut state = self.state.lock().expect("orchestrator state poisoned");

        if state.last_clipboard.as_deref() == Some(text) {
            return Detection::Unchanged;
        }
        state.last_clipboard = Some(text.to_string());

        // Resolution failures are filtered here and never become items.
        let Some(item) = resolver::resolve(text) else {
            return Detection::Ignored;
        };

        let already_tracked = state.active.contains(&item.canonical_id)
            || state
                .pending
                .as_ref()
                .is_some_and(|p| p.canonical_id == item.canonical_id);
        if already_tracked {
            tracing::debug!("dropping duplicate detection of {}", item.canonical_id);
            return Detection::Duplicate;
        }

        tracing::info!("detected {:?} source: {}", item.source_kind, item.canonical_id);
        let superseded = state.pending.replace(item);
        drop(state);
        self.wakeup.notify_one();

        match superseded {
            Some(old) => {
                tracing::info!("superseding queued item {} before it started", old.canonical_id);
                Detection::Superseded
            }
            None => Detection::Queued,
        }
    }

    /// Move the pending item into the active table.
    fn take_next(&self) -> Option<WorkItem> {
        let mut state = self.state.lock().expect("orchestrator state poisoned");
        let item = state.pending.take()?;
        state.active.insert(item.canonical_id.clone());
        Some(item)
    }

    /// Process the queued item, if any, to a terminal stage. Returns the
    /// terminal stage reached.
    pub async fn process_next(&self) -> Option<Stage> {
        let mut item = self.take_next()?;
        self.drive_with_budget(&mut item).await;
        self.finish(&mut item);
        Some(item.stage())
    }

    /// Drive one item, enforcing the optional per-item wall-clock budget.
    async fn drive_with_budget(&self, item: &mut WorkItem) {
        match self.config.item_timeout_secs {
            Some(secs) => {
                let budget = Duration::from_secs(secs);
                if tokio::time::timeout(budget, self.drive(item)).await.is_err() {
                    item.fail(
                        ItemErrorKind::Timeout,
                        format!("item exceeded {} budget", format_duration(secs as f64)),
                    );
                }
            }
            None => self.drive(item).await,
        }
    }

    /// Drive one item through the stages in strict order. Every stage
    /// failure routes to a terminal state here; nothing propagates out.
    async fn drive(&self, item: &mut WorkItem) {
        // Acquire
        item.advance(Stage::Acquiring);
        let acquired = match self.acquirer.acquire(item, self.workdir.path()).await {
            Ok(acquired) => acquired,
            Err(e) => {
                item.fail(ItemErrorKind::Acquisition, e.to_string());
                return;
            }
        };
        item.audio_path = Some(acquired.audio_path.clone());
        item.title = acquired.title.clone();

        if let Some(duration) = acquired.duration {
            tracing::info!(
                "acquired \"{}\" ({} of audio)",
                item.title.as_deref().unwrap_or(&item.canonical_id),
                format_duration(duration.num_seconds() as f64)
            );
        }

        // Language gate
        item.advance(Stage::LanguageCheck);
        let decision = gate::check(
            acquired.detected_language.as_deref(),
            &self.config.language,
            self.config.bypass_language_check,
        );
        if decision == GateDecision::Reject {
            tracing::info!(
                "skipping {}: language {:?} does not match target {}",
                item.canonical_id,
                acquired.detected_language,
                self.config.language
            );
            item.skip();
            return;
        }

        // The artifact name depends only on acquisition metadata, so the
        // overwrite policy is settled before any transcription cost is spent.
        let artifact = self
            .config
            .output_dir
            .join(subtitle::artifact_name(item.title.as_deref(), &item.canonical_id));

        if artifact.exists() && !self.config.overwrite_existing {
            tracing::info!(
                "skipping {}: {} already exists and overwrite is disabled",
                item.canonical_id,
                artifact.display()
            );
            item.skip();
            return;
        }

        // Transcribe
        item.advance(Stage::Transcribing);
        let segments = match self
            .backend
            .transcribe(&acquired.audio_path, &self.config.language)
            .await
        {
            Ok(segments) => segments,
            Err(e) => {
                item.fail(ItemErrorKind::Transcription, e.to_string());
                return;
            }
        };

        // Format
        item.advance(Stage::Formatting);
        let content = subtitle::render(&segments);
        item.segments = Some(segments);

        if let Err(e) = fs_err::write(&artifact, content) {
            item.fail(ItemErrorKind::Io, e.to_string());
            return;
        }
        item.subtitle_path = Some(artifact.clone());

        // Deliver - best effort, never fails the item.
        item.advance(Stage::Delivering);
        if self.config.delivery.enabled {
            match self.sink.deliver(&artifact).await {
                DeliveryOutcome::Ack => {}
                DeliveryOutcome::Unreachable(reason) => {
                    tracing::warn!(
                        "player unreachable ({}); completed without live sync",
                        reason
                    );
                }
            }
        }

        item.complete();
    }

    /// Evict the item from the active table, clean up its audio file and
    /// emit the one status line per terminal item.
    fn finish(&self, item: &mut WorkItem) {
        {
            let mut state = self.state.lock().expect("orchestrator state poisoned");
            state.active.remove(&item.canonical_id);
        }

        if !self.config.keep_audio {
            if let Some(audio) = item.audio_path.take() {
                if audio.exists() {
                    if let Err(e) = fs_err::remove_file(&audio) {
                        tracing::warn!("could not remove {}: {}", audio.display(), e);
                    }
                }
            }
        }

        match item.stage() {
            Stage::Completed => {
                let artifact = item
                    .subtitle_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                tracing::info!("completed {} -> {}", item.raw_input, artifact);
            }
            Stage::Skipped => {
                tracing::info!("skipped {}", item.raw_input);
            }
            Stage::Failed => {
                let error = item
                    .error
                    .as_ref()
                    .map(|e| format!("{:?}: {}", e.kind, e.message))
                    .unwrap_or_else(|| "unknown error".to_string());
                tracing::error!("failed {}: {}", item.raw_input, error);
            }
            other => {
                debug_assert!(false, "finish called on non-terminal stage {}", other);
            }
        }
    }

    /// Run the polling loop and the pipeline lane until Ctrl+C.
    pub async fn run(self: Arc<Self>, mut clipboard: Box<dyn ClipboardSource>) -> Result<()> {
        let lane = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                loop {
                    this.wakeup.notified().await;
                    while this.process_next().await.is_some() {}
                }
            })
        };

        let poll = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval(Duration::from_millis(this.config.poll_interval_ms));
                loop {
                    ticker.tick().await;
                    match clipboard.read_text() {
                        Ok(Some(text)) => {
                            this.observe(&text);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("could not read clipboard: {}", e);
                        }
                    }
                }
            })
        };

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");
        lane.abort();
        poll.abort();

        Ok(())
    }

    /// Working directory holding in-flight audio files.
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }
}
