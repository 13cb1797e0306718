//! HTTP API for remote control of the recorder
//!
//! - GET /health - Health check
//! - GET /recorder/status - Current status, elapsed time, last error
//! - GET /recorder/devices - Media devices known to the capture host
//! - POST /recorder/start - Start recording (JSON capture config)
//! - POST /recorder/stop | /pause | /resume | /reset - Lifecycle operations
//! - GET /recorder/session - Finished recording metadata
//! - POST /recorder/session/save - Write the finished recording to disk

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, SessionInfo, StatusResponse};
pub use routes::create_router;
pub use state::AppState;
