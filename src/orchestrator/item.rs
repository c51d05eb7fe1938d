use std::path::PathBuf;

use crate::backend::Segment;

/// What kind of source a clipboard detection resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    YouTubeUrl,
    LocalFile,
}

/// Position of a [`WorkItem`] in the pipeline state machine.
///
/// Non-terminal stages progress strictly forward in declaration order;
/// `Failed` and `Skipped` are terminal and reachable from any non-terminal
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Detected,
    Acquiring,
    LanguageCheck,
    Transcribing,
    Formatting,
    Delivering,
    Completed,
    Failed,
    Skipped,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed | Stage::Skipped)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Detected => "detected",
            Stage::Acquiring => "acquiring",
            Stage::LanguageCheck => "language-check",
            Stage::Transcribing => "transcribing",
            Stage::Formatting => "formatting",
            Stage::Delivering => "delivering",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
            Stage::Skipped => "skipped",
        };
        write!(f, "{}", name)
    }
}

/// Which stage family produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemErrorKind {
    Acquisition,
    Transcription,
    Io,
    Timeout,
}

/// Structured failure record attached to a `Failed` item.
#[derive(Debug, Clone)]
pub struct ItemError {
    pub kind: ItemErrorKind,
    pub message: String,
}

/// The unit of work tracked end-to-end, from clipboard detection to a
/// terminal outcome.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Original clipboard text at time of detection.
    pub raw_input: String,

    /// Classification of the source, immutable once set.
    pub source_kind: SourceKind,

    /// Dedup key: the YouTube video ID or the normalized absolute path.
    pub canonical_id: String,

    /// Best-effort title from acquisition metadata.
    pub title: Option<String>,

    /// Audio file owned by the pipeline for the item's lifetime.
    pub audio_path: Option<PathBuf>,

    /// Timed segments; either absent or complete for the whole audio.
    pub segments: Option<Vec<Segment>>,

    /// Final artifact location, set once.
    pub subtitle_path: Option<PathBuf>,

    /// Failure record, populated exactly when the stage is `Failed`.
    pub error: Option<ItemError>,

    stage: Stage,
}

impl WorkItem {
    pub fn new(raw_input: &str, source_kind: SourceKind, canonical_id: String) -> Self {
        Self {
            raw_input: raw_input.to_string(),
            source_kind,
            canonical_id,
            title: None,
            audio_path: None,
            segments: None,
            subtitle_path: None,
            error: None,
            stage: Stage::Detected,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move forward to the next pipeline stage.
    ///
    /// The orchestrator is the sole caller; transitions that would move
    /// backwards or out of a terminal stage violate the state machine.
    pub fn advance(&mut self, next: Stage) {
        debug_assert!(!self.stage.is_terminal(), "advance out of terminal stage");
        debug_assert!(next > self.stage, "stage must progress forward");
        debug_assert!(next != Stage::Failed && next != Stage::Skipped);
        self.stage = next;
    }

    pub fn complete(&mut self) {
        debug_assert!(!self.stage.is_terminal());
        self.stage = Stage::Completed;
    }

    pub fn fail(&mut self, kind: ItemErrorKind, message: impl Into<String>) {
        debug_assert!(!self.stage.is_terminal());
        self.error = Some(ItemError {
            kind,
            message: message.into(),
        });
        self.stage = Stage::Failed;
    }

    /// Policy skip (e.g. language mismatch), distinct from failure.
    pub fn skip(&mut self) {
        debug_assert!(!self.stage.is_terminal());
        self.stage = Stage::Skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new(
            "https://youtu.be/abc123def45",
            SourceKind::YouTubeUrl,
            "abc123def45".to_string(),
        )
    }

    #[test]
    fn stages_progress_forward() {
        let mut it = item();
        assert_eq!(it.stage(), Stage::Detected);
        it.advance(Stage::Acquiring);
        it.advance(Stage::LanguageCheck);
        it.advance(Stage::Transcribing);
        it.advance(Stage::Formatting);
        it.advance(Stage::Delivering);
        it.complete();
        assert_eq!(it.stage(), Stage::Completed);
        assert!(it.stage().is_terminal());
    }

    #[test]
    fn failure_from_mid_stage_is_terminal_with_error() {
        let mut it = item();
        it.advance(Stage::Acquiring);
        it.fail(ItemErrorKind::Acquisition, "download failed");
        assert_eq!(it.stage(), Stage::Failed);
        assert!(it.stage().is_terminal());
        let err = it.error.as_ref().unwrap();
        assert_eq!(err.kind, ItemErrorKind::Acquisition);
        assert_eq!(err.message, "download failed");
    }

    #[test]
    fn skip_is_terminal_without_error() {
        let mut it = item();
        it.advance(Stage::Acquiring);
        it.advance(Stage::LanguageCheck);
        it.skip();
        assert_eq!(it.stage(), Stage::Skipped);
        assert!(it.error.is_none());
    }

    #[test]
    fn stage_ordering_matches_pipeline_order() {
        assert!(Stage::Detected < Stage::Acquiring);
        assert!(Stage::Acquiring < Stage::LanguageCheck);
        assert!(Stage::LanguageCheck < Stage::Transcribing);
        assert!(Stage::Transcribing < Stage::Formatting);
        assert!(Stage::Formatting < Stage::Delivering);
        assert!(Stage::Delivering < Stage::Completed);
    }
}
