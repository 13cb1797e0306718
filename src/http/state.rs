use crate::capture::CaptureHost;
use crate::session::RecorderHandle;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The recorder every request drives
    pub recorder: RecorderHandle,

    /// Capture host, for device listing
    pub host: Arc<dyn CaptureHost>,

    /// Where saved recordings are written
    pub recordings_path: PathBuf,
}

impl AppState {
    pub fn new(
        recorder: RecorderHandle,
        host: Arc<dyn CaptureHost>,
        recordings_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recorder,
            host,
            recordings_path: recordings_path.into(),
        }
    }
}
