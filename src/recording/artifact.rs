use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::encoder::container_extension;

/// A finished recording. Built once, at stop time, and never modified.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingArtifact {
    id: String,
    #[serde(skip)]
    data: Vec<u8>,
    mime_type: String,
    url: String,
    timestamp: DateTime<Utc>,
    duration_ms: u64,
    filename: String,
    chunk_count: usize,
    size_bytes: usize,
}

impl RecordingArtifact {
    /// `mime_type` is the container type the data is tagged with
    pub fn new(
        data: Vec<u8>,
        mime_type: String,
        timestamp: DateTime<Utc>,
        duration_ms: u64,
        chunk_count: usize,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let filename = Self::filename_for(&timestamp, &mime_type);
        let size_bytes = data.len();

        Self {
            url: format!("recording:{}", id),
            id,
            data,
            mime_type,
            timestamp,
            duration_ms,
            filename,
            chunk_count,
            size_bytes,
        }
    }

    /// `recording-YYYY-MM-DD_HH-MM-SS.<ext>`
    pub fn filename_for(timestamp: &DateTime<Utc>, mime_type: &str) -> String {
        format!(
            "recording-{}.{}",
            timestamp.format("%Y-%m-%d_%H-%M-%S"),
            container_extension(mime_type)
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Opaque locator the view layer uses to refer to this recording
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Write the recording into `dir` under its own filename
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let path = dir.join(&self.filename);
        fs::write(&path, &self.data)
            .with_context(|| format!("Failed to write recording: {:?}", path))?;

        info!(
            "Recording saved: {} ({} bytes, {:.1}s)",
            path.display(),
            self.size_bytes,
            self.duration_ms as f64 / 1000.0
        );

        Ok(path)
    }
}
