//! In-process capture host
//!
//! Grants synthetic display and microphone streams, or denies them on
//! request. Used by the CLI demo, the HTTP server and the test suite,
//! where no real capture backend is available.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::host::{CaptureHost, DeviceInfo, DeviceKind, DisplayConstraints, MicrophoneConstraints};
use super::stream::{MediaFrame, MediaStream, MediaTrack, TrackKind, TrackSink, VideoFrame};
use crate::audio::{AudioFrame, AudioStreamSource};
use crate::error::{RecorderError, RecorderResult};

/// How the simulated display picker responds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayBehavior {
    Grant,
    Deny,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct SimulatedHostConfig {
    pub display: DisplayBehavior,
    /// Whether the picked display can share system audio
    pub system_audio_available: bool,
    pub microphone_denied: bool,
    pub devices: Vec<DeviceInfo>,
    /// Upper bound on the produced video frame rate
    pub max_frame_rate: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration of each produced audio frame
    pub audio_frame_ms: u64,
}

impl Default for SimulatedHostConfig {
    fn default() -> Self {
        Self {
            display: DisplayBehavior::Grant,
            system_audio_available: true,
            microphone_denied: false,
            devices: vec![
                DeviceInfo {
                    id: "default".to_string(),
                    label: "Default Microphone".to_string(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceInfo {
                    id: "usb-mic".to_string(),
                    label: "USB Microphone".to_string(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceInfo {
                    id: "speakers".to_string(),
                    label: "Built-in Speakers".to_string(),
                    kind: DeviceKind::AudioOutput,
                },
            ],
            max_frame_rate: 10,
            sample_rate: 48000,
            channels: 2,
            audio_frame_ms: 100,
        }
    }
}

pub struct SimulatedHost {
    config: SimulatedHostConfig,
    issued: Mutex<Vec<MediaTrack>>,
    display_tracks: Mutex<Vec<MediaTrack>>,
    last_display: Mutex<Option<DisplayConstraints>>,
    last_microphone: Mutex<Option<MicrophoneConstraints>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedHost {
    pub fn new(config: SimulatedHostConfig) -> Self {
        Self {
            config,
            issued: Mutex::new(Vec::new()),
            display_tracks: Mutex::new(Vec::new()),
            last_display: Mutex::new(None),
            last_microphone: Mutex::new(None),
        }
    }

    /// Tracks handed out by this host that have not ended yet
    pub fn live_track_count(&self) -> usize {
        lock(&self.issued).iter().filter(|t| !t.is_ended()).count()
    }

    /// Simulate the user pressing "stop sharing" on every granted display
    pub fn end_display_share(&self) {
        for track in lock(&self.display_tracks).iter() {
            if track.stop() {
                info!("Simulated display share ended: {}", track.label());
            }
        }
    }

    pub fn last_display_constraints(&self) -> Option<DisplayConstraints> {
        lock(&self.last_display).clone()
    }

    pub fn last_microphone_constraints(&self) -> Option<MicrophoneConstraints> {
        lock(&self.last_microphone).clone()
    }

    fn issue(&self, kind: TrackKind, label: &str) -> (MediaTrack, TrackSink) {
        let (track, sink) = MediaTrack::new(kind, label);
        lock(&self.issued).push(track.clone());
        (track, sink)
    }

    fn spawn_video_producer(&self, sink: TrackSink, constraints: &DisplayConstraints) {
        let fps = constraints.frame_rate.min(self.config.max_frame_rate).max(1);
        let period = Duration::from_millis(1000 / fps as u64);
        let (width, height) = (constraints.width, constraints.height);

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);
            let mut sequence: u64 = 0;

            loop {
                ticker.tick().await;
                let frame = VideoFrame {
                    width,
                    height,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                    data: vec![(sequence % 251) as u8; 64],
                };
                if !sink.send(MediaFrame::Video(frame)) {
                    break;
                }
                sequence += 1;
            }
        });
    }

    fn spawn_audio_producer(&self, sink: TrackSink, source: AudioStreamSource) {
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let frame_ms = self.config.audio_frame_ms.max(1);
        let samples_per_frame =
            (sample_rate as u64 * frame_ms / 1000) as usize * channels as usize;
        let level: i16 = match source {
            AudioStreamSource::Microphone => 400,
            _ => 800,
        };

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));

            loop {
                ticker.tick().await;
                let samples = (0..samples_per_frame)
                    .map(|i| if (i / 64) % 2 == 0 { level } else { -level })
                    .collect();
                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                    source,
                };
                if !sink.send(MediaFrame::Audio(frame)) {
                    break;
                }
            }
        });
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(SimulatedHostConfig::default())
    }
}

#[async_trait]
impl CaptureHost for SimulatedHost {
    async fn request_display(&self, constraints: &DisplayConstraints) -> RecorderResult<MediaStream> {
        *lock(&self.last_display) = Some(constraints.clone());

        match self.config.display {
            DisplayBehavior::Deny => {
                return Err(RecorderError::PermissionDenied(
                    "screen capture was not allowed".to_string(),
                ))
            }
            DisplayBehavior::Cancel => return Err(RecorderError::UserCancelledPicker),
            DisplayBehavior::Grant => {}
        }

        let (video, video_sink) = self.issue(TrackKind::Video, "Simulated Display");
        self.spawn_video_producer(video_sink, constraints);
        lock(&self.display_tracks).push(video.clone());

        let mut tracks = vec![video];

        if constraints.system_audio && self.config.system_audio_available {
            let (audio, audio_sink) = self.issue(TrackKind::Audio, "System Audio");
            self.spawn_audio_producer(audio_sink, AudioStreamSource::System);
            tracks.push(audio);
        }

        Ok(MediaStream::new(tracks))
    }

    async fn request_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> RecorderResult<MediaStream> {
        *lock(&self.last_microphone) = Some(constraints.clone());

        if self.config.microphone_denied {
            return Err(RecorderError::PermissionDenied(
                "microphone access was not allowed".to_string(),
            ));
        }

        let device = match &constraints.device_id {
            Some(id) => self
                .config
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::AudioInput && &d.id == id)
                .ok_or_else(|| {
                    RecorderError::DeviceUnavailable(format!("no audio input with id '{}'", id))
                })?,
            None => self
                .config
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::AudioInput)
                .ok_or_else(|| {
                    RecorderError::DeviceUnavailable("no audio input present".to_string())
                })?,
        };

        let (track, sink) = self.issue(TrackKind::Audio, &device.label);
        self.spawn_audio_producer(sink, AudioStreamSource::Microphone);

        Ok(MediaStream::new(vec![track]))
    }

    async fn enumerate_devices(&self) -> RecorderResult<Vec<DeviceInfo>> {
        Ok(self.config.devices.clone())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
