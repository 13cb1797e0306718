//! Media streams and tracks
//!
//! A `MediaTrack` is a shared handle: every clone refers to the same
//! underlying track, so stopping one clone ends the track for all holders.
//! Frames flow from the producer (`TrackSink`) to exactly one consumer,
//! which claims them with `take_frames`.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::audio::AudioFrame;

/// Frames buffered per track before the producer starts dropping
const TRACK_BUFFER_FRAMES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// A single captured video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    /// Opaque pixel payload as delivered by the host
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum MediaFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl MediaFrame {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            MediaFrame::Video(frame) => frame.timestamp_ms,
            MediaFrame::Audio(frame) => frame.timestamp_ms,
        }
    }
}

struct TrackInner {
    ended: watch::Sender<bool>,
    frames: Mutex<Option<mpsc::Receiver<MediaFrame>>>,
}

#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live track and the sink its producer writes frames into
    pub fn new(kind: TrackKind, label: impl Into<String>) -> (Self, TrackSink) {
        let (frame_tx, frame_rx) = mpsc::channel(TRACK_BUFFER_FRAMES);
        let (ended, _) = watch::channel(false);

        let inner = Arc::new(TrackInner {
            ended,
            frames: Mutex::new(Some(frame_rx)),
        });

        let track = Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            inner: Arc::clone(&inner),
        };

        (track, TrackSink { tx: frame_tx, inner })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop the track. Safe to call any number of times.
    ///
    /// Returns true only for the call that actually ended the track.
    pub fn stop(&self) -> bool {
        let was_ended = self.inner.ended.send_replace(true);
        if !was_ended {
            // Unclaimed frames are discarded; a consumer that already took
            // the receiver sees the producer go quiet instead.
            if let Ok(mut frames) = self.inner.frames.lock() {
                frames.take();
            }
            debug!("Track stopped: {} ({})", self.label, self.id);
        }
        !was_ended
    }

    pub fn is_ended(&self) -> bool {
        *self.inner.ended.borrow()
    }

    /// Resolves once the track has ended, whoever ended it
    pub async fn ended(&self) {
        let mut rx = self.inner.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Claim the frame receiver. Only the first caller gets it.
    pub fn take_frames(&self) -> Option<mpsc::Receiver<MediaFrame>> {
        self.inner.frames.lock().ok().and_then(|mut frames| frames.take())
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Producer side of a track
#[derive(Clone)]
pub struct TrackSink {
    tx: mpsc::Sender<MediaFrame>,
    inner: Arc<TrackInner>,
}

impl TrackSink {
    /// Push a frame without blocking the producer.
    ///
    /// A full buffer drops the frame (real-time capture never waits);
    /// returns false once the track has ended or its consumer is gone.
    pub fn send(&self, frame: MediaFrame) -> bool {
        if *self.inner.ended.borrow() {
            return false;
        }

        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Track buffer full, dropping frame");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_ended(&self) -> bool {
        *self.inner.ended.borrow()
    }

    /// End the track from the producer side (e.g. the user stopped sharing)
    pub fn end(&self) {
        self.inner.ended.send_replace(true);
    }
}

/// A set of tracks delivered together
#[derive(Clone, Debug)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    /// Number of tracks that have not ended yet
    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| !t.is_ended()).count()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
