use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::artifact::RecordingArtifact;
use super::encoder::{
    container_type, select_mime_type, EncoderBackend, EncoderEvent, EncoderOptions, StreamEncoder,
};
use crate::capture::MediaStream;
use crate::config::EncoderSettings;
use crate::error::RecorderResult;

/// Encoded slices in arrival order
#[derive(Debug, Default, Clone)]
pub struct ChunkSequence {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slice. Empty slices are skipped; returns whether it was kept.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate every slice, in order, with nothing between them
    pub fn assemble(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.total_bytes);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        data
    }
}

/// Drives one encoder over the composite stream and collects its output
pub struct RecordingEngine {
    encoder: Box<dyn StreamEncoder>,
    events: mpsc::Receiver<EncoderEvent>,
    chunks: ChunkSequence,
    mime_type: String,
    stop_requested: bool,
}

impl RecordingEngine {
    /// Choose a recording format, create the encoder and start it
    pub fn start(
        backend: &dyn EncoderBackend,
        stream: MediaStream,
        settings: &EncoderSettings,
    ) -> RecorderResult<Self> {
        let mime_type = select_mime_type(backend, &settings.mime_candidates)?;

        let options = EncoderOptions {
            mime_type: mime_type.clone(),
            video_bits_per_second: settings.video_bits_per_second,
        };

        let mut encoder = backend.create(stream, options)?;
        let events = encoder.start(settings.timeslice())?;

        info!(
            "Recording engine started: {} via {} ({} bps, {}ms slices)",
            mime_type,
            backend.name(),
            settings.video_bits_per_second,
            settings.timeslice_ms
        );

        Ok(Self {
            encoder,
            events,
            chunks: ChunkSequence::new(),
            mime_type,
            stop_requested: false,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn pause(&mut self) {
        self.encoder.pause();
    }

    pub fn resume(&mut self) {
        self.encoder.resume();
    }

    /// Ask for the final flush; completion arrives as `EncoderEvent::Stopped`
    pub fn request_stop(&mut self) {
        if !self.stop_requested {
            self.stop_requested = true;
            self.encoder.stop();
        }
    }

    /// Next encoder event. A closed channel counts as `Stopped`.
    pub async fn next_event(&mut self) -> EncoderEvent {
        self.events.recv().await.unwrap_or(EncoderEvent::Stopped)
    }

    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        let size = chunk.len();
        if self.chunks.push(chunk) {
            debug!(
                "Chunk {} received ({} bytes, {} total)",
                self.chunks.len(),
                size,
                self.chunks.total_bytes()
            );
        }
    }

    /// Assemble the artifact from every chunk received so far
    pub fn finish(mut self, duration: Duration, timestamp: DateTime<Utc>) -> RecordingArtifact {
        self.request_stop();

        let data = self.chunks.assemble();
        let artifact = RecordingArtifact::new(
            data,
            container_type(&self.mime_type).to_string(),
            timestamp,
            duration.as_millis() as u64,
            self.chunks.len(),
        );

        info!(
            "Recording assembled: {} chunks, {} bytes, {:.1}s",
            artifact.chunk_count(),
            artifact.size_bytes(),
            duration.as_secs_f64()
        );

        artifact
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        self.request_stop();
    }
}
