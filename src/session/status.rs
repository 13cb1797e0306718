use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::capture::{CaptureConfig, MediaStream};
use crate::recording::RecordingArtifact;

/// Recorder lifecycle state; decides which operations are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Recording,
    Paused,
    Processing,
    Finished,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Recording => "recording",
            Status::Paused => "paused",
            Status::Processing => "processing",
            Status::Finished => "finished",
        }
    }

    /// Capture is live (recording or paused)
    pub fn is_capturing(&self) -> bool {
        matches!(self, Status::Recording | Status::Paused)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the view layer sees
#[derive(Debug, Clone, Default)]
pub struct RecorderSnapshot {
    pub status: Status,

    /// Seconds recorded so far (paused time excluded)
    pub recording_time: u64,

    /// Live composite stream while recording
    pub preview: Option<MediaStream>,

    /// The finished recording, if any
    pub session: Option<Arc<RecordingArtifact>>,

    /// Last failure message
    pub error: Option<String>,

    /// Capture settings of the current or last recording
    pub config: Option<CaptureConfig>,

    /// Capture tracks currently held
    pub active_streams: usize,

    /// Whether a mixing graph is running
    pub audio_mixing: bool,
}
