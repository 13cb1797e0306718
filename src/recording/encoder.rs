use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::capture::MediaStream;
use crate::error::{RecorderError, RecorderResult};

/// Events delivered by a running encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// One time slice of encoded data (may be empty)
    Data(Vec<u8>),
    /// The encoder failed; no further data follows
    Error(String),
    /// Final flush complete after `stop`
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u64,
}

/// Host-provided streaming encoder factory
pub trait EncoderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Wrap `stream` in a new encoder. The encoder claims the frame
    /// receivers of the stream's tracks when it starts.
    fn create(
        &self,
        stream: MediaStream,
        options: EncoderOptions,
    ) -> RecorderResult<Box<dyn StreamEncoder>>;
}

/// A chunked encoder bound to one stream
pub trait StreamEncoder: Send {
    /// Begin encoding, emitting `Data` once per `timeslice`
    fn start(&mut self, timeslice: Duration) -> RecorderResult<mpsc::Receiver<EncoderEvent>>;

    /// Stop emitting data; buffered data is kept
    fn pause(&mut self);

    fn resume(&mut self);

    /// Flush remaining data, then emit `Stopped`
    fn stop(&mut self);
}

/// Pick the first candidate the backend supports
pub fn select_mime_type(
    backend: &dyn EncoderBackend,
    candidates: &[String],
) -> RecorderResult<String> {
    for candidate in candidates {
        if backend.is_type_supported(candidate) {
            return Ok(candidate.clone());
        }
        debug!("{} does not support {}", backend.name(), candidate);
    }

    Err(RecorderError::EncoderUnsupported(candidates.join(", ")))
}

/// Container media type of a full mime string ("video/webm;codecs=vp9" -> "video/webm")
pub fn container_type(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// File extension for a container media type
pub fn container_extension(container: &str) -> &'static str {
    match container {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}
