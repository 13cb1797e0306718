//! Capture primitives
//!
//! - `stream`: media streams, tracks and frames
//! - `host`: the `CaptureHost` contract the host environment implements
//! - `acquirer`: display/microphone acquisition into an owned `ActiveCapture`
//! - `simulated`: an in-process host for demos and tests

pub mod acquirer;
pub mod host;
pub mod simulated;
pub mod stream;

pub use acquirer::{AcquiredStreams, ActiveCapture, CaptureConfig, StreamAcquirer};
pub use host::{CaptureHost, DeviceInfo, DeviceKind, DisplayConstraints, MicrophoneConstraints};
pub use simulated::{DisplayBehavior, SimulatedHost, SimulatedHostConfig};
pub use stream::{MediaFrame, MediaStream, MediaTrack, TrackKind, TrackSink, VideoFrame};
