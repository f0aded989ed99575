use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::progress::TransferProgress;

/// Which pitch form the user has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchMode {
    #[default]
    Shift,
    Note,
}

impl PitchMode {
    pub fn toggle(self) -> Self {
        match self {
            PitchMode::Shift => PitchMode::Note,
            PitchMode::Note => PitchMode::Shift,
        }
    }
}

/// The single pitch parameter of a validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PitchParameter {
    ShiftBySemitones(i32),
    /// Trimmed, non-empty note name such as "A#3".
    ToTargetNote(String),
}

impl PitchParameter {
    pub fn mode(&self) -> PitchMode {
        match self {
            PitchParameter::ShiftBySemitones(_) => PitchMode::Shift,
            PitchParameter::ToTargetNote(_) => PitchMode::Note,
        }
    }
}

impl fmt::Display for PitchParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchParameter::ShiftBySemitones(n) => write!(f, "shift {:+} st", n),
            PitchParameter::ToTargetNote(note) => write!(f, "to {}", note),
        }
    }
}

/// A file chosen for upload. `media_type` is what the picker declares for it
/// (derived from the extension), not a sniff of the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub path: PathBuf,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: AudioFile,
    pub parameter: PitchParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Validating,
    Transferring,
    Decoding,
    Complete,
    Failed,
}

impl ProcessingState {
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ProcessingState::Validating | ProcessingState::Transferring | ProcessingState::Decoding
        )
    }
}

/// A successfully decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    pub payload: Arc<[u8]>,
    pub content_type: String,
    pub filename: String,
}

/// Machine-readable summary of a finished run, printed by `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub filename: String,
    pub content_type: String,
    pub bytes: u64,
    pub saved_to: Option<PathBuf>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

/// Emitted by the transfer orchestrator while a request is outstanding.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress(TransferProgress),
    HeadersReceived { status: u16 },
}
