//! Recorder error taxonomy
//!
//! Every failure the capture host, the encoder or the controller can report.
//! The `Display` text is what the view layer shows in `error`.

use thiserror::Error;

use crate::session::Status;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// User or OS refused capture
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Requested microphone is not present
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Display-capture picker dismissed
    #[error("Screen selection was cancelled")]
    UserCancelledPicker,

    /// No candidate container/codec is supported by the encoder backend
    #[error("No supported recording format (tried: {0})")]
    EncoderUnsupported(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    /// The operation is not legal in the recorder's current state
    #[error("Recorder is {0}")]
    InvalidState(Status),

    /// The recorder task is no longer running
    #[error("Recorder is not running")]
    Closed,
}

impl RecorderError {
    /// Stable machine-readable code, used by the HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::PermissionDenied(_) => "PERMISSION_DENIED",
            RecorderError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            RecorderError::UserCancelledPicker => "USER_CANCELLED_PICKER",
            RecorderError::EncoderUnsupported(_) => "ENCODER_UNSUPPORTED",
            RecorderError::Capture(_) => "CAPTURE_ERROR",
            RecorderError::Encoder(_) => "ENCODER_ERROR",
            RecorderError::InvalidState(_) => "INVALID_STATE",
            RecorderError::Closed => "RECORDER_CLOSED",
        }
    }
}

pub type RecorderResult<T> = Result<T, RecorderError>;
