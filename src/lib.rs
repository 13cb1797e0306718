pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod recording;
pub mod session;

pub use audio::{AudioFrame, AudioGraph, AudioMixer, AudioStreamSource, MixerConfig};
pub use capture::{
    ActiveCapture, CaptureConfig, CaptureHost, DeviceInfo, MediaStream, MediaTrack,
    SimulatedHost, SimulatedHostConfig, StreamAcquirer, TrackKind,
};
pub use config::{Config, RecorderSettings};
pub use error::{RecorderError, RecorderResult};
pub use http::{create_router, AppState};
pub use recording::{
    ChunkSequence, EncoderBackend, RecordingArtifact, RecordingEngine, SimulatedEncoder,
};
pub use session::{Recorder, RecorderHandle, RecorderSnapshot, Status};
