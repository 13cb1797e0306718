use serde::{Deserialize, Serialize};

/// Where an audio frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStreamSource {
    /// System audio (applications, browser, etc.)
    System,
    /// Microphone input
    Microphone,
    /// Output of the mixing graph
    Mixed,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    /// Audio stream source
    pub source: AudioStreamSource,
}

