//! Chunked recording
//!
//! - `encoder`: the host encoder contract and format selection
//! - `engine`: runs an encoder and keeps its output in arrival order
//! - `artifact`: the finished, immutable recording
//! - `simulated`: an in-process encoder for demos and tests

pub mod artifact;
pub mod encoder;
pub mod engine;
pub mod simulated;

pub use artifact::RecordingArtifact;
pub use encoder::{
    container_extension, container_type, select_mime_type, EncoderBackend, EncoderEvent,
    EncoderOptions, StreamEncoder,
};
pub use engine::{ChunkSequence, RecordingEngine};
pub use simulated::SimulatedEncoder;
