//! Stream acquisition with guaranteed release
//!
//! `ActiveCapture` is the single owner of every stream granted for a
//! recording. It is moved into the controller once acquisition succeeds;
//! if acquisition fails half-way it is dropped, which stops whatever was
//! already granted.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::host::{CaptureHost, DeviceKind, DisplayConstraints, MicrophoneConstraints};
use super::stream::MediaStream;
use crate::config::CaptureSettings;
use crate::error::{RecorderError, RecorderResult};

/// What the user asked to record. Fixed for the lifetime of a recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Mix in a microphone
    #[serde(default)]
    pub mic: bool,
    /// Capture system audio with the display
    #[serde(default)]
    pub system: bool,
    /// Specific microphone to open
    #[serde(default)]
    pub mic_device_id: Option<String>,
}

/// Registry of stream handles held for one recording
#[derive(Debug, Default)]
pub struct ActiveCapture {
    streams: Vec<MediaStream>,
}

impl ActiveCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a granted stream
    pub fn register(&mut self, stream: MediaStream) {
        self.streams.push(stream);
    }

    pub fn streams(&self) -> &[MediaStream] {
        &self.streams
    }

    /// Number of held tracks that are still live
    pub fn active_handles(&self) -> usize {
        self.streams.iter().map(MediaStream::live_track_count).sum()
    }

    /// Stop every track of every registered stream and clear the registry.
    /// Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.streams.is_empty() {
            return;
        }

        let count = self.streams.len();
        for stream in self.streams.drain(..) {
            stream.stop_all();
        }

        info!("Released {} capture stream(s)", count);
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Streams granted for a recording, all registered in `capture`
#[derive(Debug)]
pub struct AcquiredStreams {
    pub capture: ActiveCapture,
    pub display: MediaStream,
    pub microphone: Option<MediaStream>,
}

/// Requests display and microphone streams from the host
pub struct StreamAcquirer<'a> {
    host: &'a dyn CaptureHost,
    settings: &'a CaptureSettings,
}

impl<'a> StreamAcquirer<'a> {
    pub fn new(host: &'a dyn CaptureHost, settings: &'a CaptureSettings) -> Self {
        Self { host, settings }
    }

    pub fn display_constraints(&self, config: &CaptureConfig) -> DisplayConstraints {
        DisplayConstraints {
            width: self.settings.width,
            height: self.settings.height,
            frame_rate: self.settings.frame_rate,
            system_audio: config.system,
        }
    }

    pub fn microphone_constraints(&self, config: &CaptureConfig) -> MicrophoneConstraints {
        MicrophoneConstraints {
            device_id: config.mic_device_id.clone(),
            echo_cancellation: self.settings.echo_cancellation,
            noise_suppression: self.settings.noise_suppression,
            auto_gain_control: self.settings.auto_gain_control,
        }
    }

    /// Acquire every stream `config` asks for.
    ///
    /// On error nothing stays held: streams granted before the failure are
    /// released when the partially filled `ActiveCapture` drops.
    pub async fn acquire(&self, config: &CaptureConfig) -> RecorderResult<AcquiredStreams> {
        let mut capture = ActiveCapture::new();

        let display_constraints = self.display_constraints(config);
        info!(
            "Requesting display capture from {} ({}x{} @ {}fps, system audio: {})",
            self.host.name(),
            display_constraints.width,
            display_constraints.height,
            display_constraints.frame_rate,
            display_constraints.system_audio
        );

        let display = self.host.request_display(&display_constraints).await?;
        capture.register(display.clone());

        if config.system && display.audio_tracks().next().is_none() {
            warn!("System audio requested but the display stream carries no audio track");
        }

        let microphone = if config.mic {
            if let Some(device_id) = &config.mic_device_id {
                self.ensure_input_device(device_id).await?;
            }

            let mic_constraints = self.microphone_constraints(config);
            info!(
                "Requesting microphone capture (device: {})",
                mic_constraints.device_id.as_deref().unwrap_or("default")
            );

            let stream = self.host.request_microphone(&mic_constraints).await?;
            capture.register(stream.clone());
            Some(stream)
        } else {
            None
        };

        Ok(AcquiredStreams {
            capture,
            display,
            microphone,
        })
    }

    async fn ensure_input_device(&self, device_id: &str) -> RecorderResult<()> {
        let devices = self.host.enumerate_devices().await?;
        let found = devices
            .iter()
            .any(|d| d.kind == DeviceKind::AudioInput && d.id == device_id);

        if !found {
            return Err(RecorderError::DeviceUnavailable(format!(
                "no audio input with id '{}'",
                device_id
            )));
        }

        Ok(())
    }
}
