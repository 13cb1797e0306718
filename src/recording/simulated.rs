//! In-process stand-in for a host streaming encoder
//!
//! Produces a frame log rather than compressed video: each frame becomes a
//! small tagged record, and every time slice emits the records gathered
//! since the last one. Good enough to exercise chunking, pausing and the
//! final flush end to end.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::encoder::{EncoderBackend, EncoderEvent, EncoderOptions, StreamEncoder};
use crate::capture::{MediaFrame, MediaStream};
use crate::error::{RecorderError, RecorderResult};

const VIDEO_TAG: u8 = b'V';
const AUDIO_TAG: u8 = b'A';

pub struct SimulatedEncoder {
    supported: Vec<String>,
}

impl SimulatedEncoder {
    /// Supports exactly the given mime types
    pub fn with_supported(supported: Vec<String>) -> Self {
        Self { supported }
    }
}

impl Default for SimulatedEncoder {
    fn default() -> Self {
        Self::with_supported(vec![
            "video/webm;codecs=vp9".to_string(),
            "video/webm;codecs=vp8".to_string(),
        ])
    }
}

impl EncoderBackend for SimulatedEncoder {
    fn name(&self) -> &str {
        "simulated"
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn create(
        &self,
        stream: MediaStream,
        options: EncoderOptions,
    ) -> RecorderResult<Box<dyn StreamEncoder>> {
        if !self.is_type_supported(&options.mime_type) {
            return Err(RecorderError::EncoderUnsupported(options.mime_type));
        }

        Ok(Box::new(SimulatedStreamEncoder {
            stream,
            options,
            control: None,
            task: None,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Pause,
    Resume,
    Stop,
}

struct SimulatedStreamEncoder {
    stream: MediaStream,
    options: EncoderOptions,
    control: Option<mpsc::UnboundedSender<Control>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedStreamEncoder {
    fn send(&self, control: Control) {
        if let Some(tx) = &self.control {
            if tx.send(control).is_err() {
                debug!("Encoder already finished, ignoring {:?}", control);
            }
        }
    }
}

/// Append one frame record: tag, timestamp (LE u64), length (LE u32), payload
fn encode_frame(out: &mut Vec<u8>, frame: &MediaFrame) {
    let (tag, payload): (u8, Vec<u8>) = match frame {
        MediaFrame::Video(video) => (VIDEO_TAG, video.data.clone()),
        MediaFrame::Audio(audio) => (
            AUDIO_TAG,
            audio.samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        ),
    };

    out.push(tag);
    out.extend_from_slice(&frame.timestamp_ms().to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
}

impl StreamEncoder for SimulatedStreamEncoder {
    fn start(&mut self, timeslice: Duration) -> RecorderResult<mpsc::Receiver<EncoderEvent>> {
        if self.task.is_some() {
            return Err(RecorderError::Encoder("encoder already started".to_string()));
        }

        let tracks = self
            .stream
            .tracks()
            .iter()
            .filter_map(|track| match track.take_frames() {
                Some(frames) => Some(frames),
                None => {
                    warn!("Track {} has no frames to encode", track.label());
                    None
                }
            })
            .map(|frames| {
                stream::unfold(frames, |mut frames| async move {
                    frames.recv().await.map(|frame| (frame, frames))
                })
                .boxed()
            });
        let mut frames = stream::select_all(tracks);

        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(64);
        let mime_type = self.options.mime_type.clone();

        let task = tokio::spawn(async move {
            let mut slice = Vec::new();
            let mut paused = false;
            let mut frames_open = true;
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + timeslice, timeslice);

            debug!("Simulated encoder running ({})", mime_type);

            loop {
                tokio::select! {
                    frame = frames.next(), if frames_open => match frame {
                        Some(frame) if !paused => encode_frame(&mut slice, &frame),
                        Some(_) => {}
                        None => frames_open = false,
                    },
                    _ = ticker.tick() => {
                        if !paused {
                            let data = std::mem::take(&mut slice);
                            if event_tx.send(EncoderEvent::Data(data)).await.is_err() {
                                return;
                            }
                        }
                    }
                    control = control_rx.recv() => match control {
                        Some(Control::Pause) => paused = true,
                        Some(Control::Resume) => paused = false,
                        Some(Control::Stop) | None => {
                            let _ = event_tx.send(EncoderEvent::Data(std::mem::take(&mut slice))).await;
                            let _ = event_tx.send(EncoderEvent::Stopped).await;
                            return;
                        }
                    },
                }
            }
        });

        self.control = Some(control_tx);
        self.task = Some(task);

        Ok(event_rx)
    }

    fn pause(&mut self) {
        self.send(Control::Pause);
    }

    fn resume(&mut self) {
        self.send(Control::Resume);
    }

    fn stop(&mut self) {
        self.send(Control::Stop);
    }
}
