use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::MixerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub recorder: RecorderSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "screen-recorder".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory finished recordings are written to
    pub recordings_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            recordings_path: "recordings".to_string(),
        }
    }
}

/// Everything the recorder needs besides the host and encoder backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecorderSettings {
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub encoder: EncoderSettings,
    #[serde(default)]
    pub mixer: MixerSettings,
}

/// Constraints sent with capture requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 60,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Target video bitrate (5 Mbps)
    pub video_bits_per_second: u64,
    /// Length of each emitted data slice
    pub timeslice_ms: u64,
    /// Recording formats in order of preference
    pub mime_candidates: Vec<String>,
}

impl EncoderSettings {
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms.max(1))
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_bits_per_second: 5_000_000,
            timeslice_ms: 1000,
            mime_candidates: vec![
                "video/webm;codecs=vp9".to_string(),
                "video/webm;codecs=vp8".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub max_buffer_delay_ms: u64,
}

impl Default for MixerSettings {
    fn default() -> Self {
        let mixer = MixerConfig::default();
        Self {
            sample_rate: mixer.sample_rate,
            channels: mixer.channels,
            max_buffer_delay_ms: mixer.max_buffer_delay_ms,
        }
    }
}

impl From<&MixerSettings> for MixerConfig {
    fn from(settings: &MixerSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            max_buffer_delay_ms: settings.max_buffer_delay_ms,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
