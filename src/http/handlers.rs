use super::state::AppState;
use crate::capture::{CaptureConfig, TrackKind};
use crate::error::RecorderError;
use crate::recording::RecordingArtifact;
use crate::session::{RecorderSnapshot, Status};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub size_bytes: usize,
    pub chunk_count: usize,
}

impl From<&RecordingArtifact> for SessionInfo {
    fn from(artifact: &RecordingArtifact) -> Self {
        Self {
            id: artifact.id().to_string(),
            url: artifact.url().to_string(),
            filename: artifact.filename().to_string(),
            mime_type: artifact.mime_type().to_string(),
            timestamp: artifact.timestamp(),
            duration_ms: artifact.duration_ms(),
            size_bytes: artifact.size_bytes(),
            chunk_count: artifact.chunk_count(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
    pub recording_time: u64,
    pub error: Option<String>,
    pub config: Option<CaptureConfig>,
    pub active_streams: usize,
    pub audio_mixing: bool,
    /// Tracks of the live composite stream
    pub preview: Vec<TrackInfo>,
    pub session: Option<SessionInfo>,
}

impl From<&RecorderSnapshot> for StatusResponse {
    fn from(snapshot: &RecorderSnapshot) -> Self {
        let preview = snapshot
            .preview
            .iter()
            .flat_map(|stream| stream.tracks())
            .map(|track| TrackInfo {
                id: track.id().to_string(),
                kind: track.kind(),
                label: track.label().to_string(),
            })
            .collect();

        Self {
            status: snapshot.status,
            recording_time: snapshot.recording_time,
            error: snapshot.error.clone(),
            config: snapshot.config.clone(),
            active_streams: snapshot.active_streams,
            audio_mixing: snapshot.audio_mixing,
            preview,
            session: snapshot.session.as_deref().map(SessionInfo::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub path: String,
    pub size_bytes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            error: message,
        }),
    )
        .into_response()
}

fn recorder_error_response(e: RecorderError) -> Response {
    let status = match &e {
        RecorderError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        RecorderError::DeviceUnavailable(_) => StatusCode::NOT_FOUND,
        RecorderError::UserCancelledPicker | RecorderError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        RecorderError::EncoderUnsupported(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        RecorderError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        RecorderError::Capture(_) | RecorderError::Encoder(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.code(), e.to_string())
}

fn status_response(state: &AppState) -> Response {
    let snapshot = state.recorder.snapshot();
    (StatusCode::OK, Json(StatusResponse::from(&snapshot))).into_response()
}

fn transition_response(state: &AppState, result: Result<Status, RecorderError>) -> Response {
    match result {
        Ok(_) => status_response(state),
        Err(e) => {
            error!("Recorder operation failed: {}", e);
            recorder_error_response(e)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recorder/start
/// Start a new recording
pub async fn start_recording(
    State(state): State<AppState>,
    Json(config): Json<CaptureConfig>,
) -> impl IntoResponse {
    info!(
        "HTTP start request (mic: {}, system: {})",
        config.mic, config.system
    );

    match state.recorder.start(config).await {
        Ok(_) => status_response(&state),
        Err(e) => recorder_error_response(e),
    }
}

/// POST /recorder/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.recorder.stop().await;
    transition_response(&state, result)
}

/// POST /recorder/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.recorder.pause().await;
    transition_response(&state, result)
}

/// POST /recorder/resume
pub async fn resume_recording(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.recorder.resume().await;
    transition_response(&state, result)
}

/// POST /recorder/reset
pub async fn reset_recorder(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.recorder.reset().await;
    transition_response(&state, result)
}

/// GET /recorder/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    status_response(&state)
}

/// GET /recorder/session
/// Metadata of the finished recording
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.recorder.snapshot().session {
        Some(artifact) => {
            (StatusCode::OK, Json(SessionInfo::from(artifact.as_ref()))).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "NO_SESSION",
            "No finished recording".to_string(),
        ),
    }
}

/// POST /recorder/session/save
/// Write the finished recording into the recordings directory
pub async fn save_session(State(state): State<AppState>) -> impl IntoResponse {
    let Some(artifact) = state.recorder.snapshot().session else {
        return error_response(
            StatusCode::NOT_FOUND,
            "NO_SESSION",
            "No finished recording".to_string(),
        );
    };

    let dir = state.recordings_path.clone();
    let saved = tokio::task::spawn_blocking(move || {
        artifact
            .write_to(&dir)
            .map(|path| (path, artifact.size_bytes()))
    })
    .await;

    match saved {
        Ok(Ok((path, size_bytes))) => (
            StatusCode::OK,
            Json(SaveResponse {
                path: path.display().to_string(),
                size_bytes,
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Failed to save recording: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "SAVE_FAILED", e.to_string())
        }
        Err(e) => {
            error!("Save task panicked: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "SAVE_FAILED", e.to_string())
        }
    }
}

/// GET /recorder/devices
pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    match state.host.enumerate_devices().await {
        Ok(devices) => (StatusCode::OK, Json(devices)).into_response(),
        Err(e) => recorder_error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
