use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::stream::MediaStream;
use crate::error::RecorderResult;

/// Constraints for a display-capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Ask the host to include system audio with the display stream
    pub system_audio: bool,
}

/// Constraints for a microphone-capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrophoneConstraints {
    /// Exact device to open; `None` means the host default
    pub device_id: Option<String>,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

/// A media device known to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

/// Capture primitives provided by the host environment
///
/// Implementations grant a stream or deny with a `RecorderError`
/// (`PermissionDenied`, `DeviceUnavailable`, `UserCancelledPicker`, ...).
/// Requests run to completion; there is no cancellation.
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Show the display picker and capture the chosen source
    async fn request_display(&self, constraints: &DisplayConstraints) -> RecorderResult<MediaStream>;

    /// Open a microphone
    async fn request_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> RecorderResult<MediaStream>;

    /// List available media devices
    async fn enumerate_devices(&self) -> RecorderResult<Vec<DeviceInfo>>;

    /// Host name for logging
    fn name(&self) -> &str;
}
