//! Audio-processing graph
//!
//! Each input track gets its own source node (a forwarding task) feeding a
//! shared destination. The destination mixes the inputs and publishes the
//! result as a single audio track. A graph is created for one recording and
//! closed when it ends; it is never reused.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::frame::{AudioFrame, AudioStreamSource};
use super::mixer::{AudioMixer, MixerConfig};
use crate::capture::{MediaFrame, MediaTrack, TrackKind};
use crate::error::{RecorderError, RecorderResult};

enum NodeInput {
    Frame(AudioFrame),
    Ended(AudioStreamSource),
}

pub struct AudioGraph {
    id: String,
    destination: MediaTrack,
    sources: Vec<AudioStreamSource>,
    source_nodes: Vec<JoinHandle<()>>,
    mixer_task: Option<JoinHandle<()>>,
}

impl AudioGraph {
    /// Route every input track through its own source node into one mixed
    /// output track.
    ///
    /// Claims the frame receiver of each input; fails if one was already
    /// taken by another consumer.
    pub fn connect(
        inputs: Vec<(AudioStreamSource, MediaTrack)>,
        config: MixerConfig,
    ) -> RecorderResult<Self> {
        let id = uuid::Uuid::new_v4().to_string();
        let (destination, sink) = MediaTrack::new(TrackKind::Audio, "Mixed Audio");
        let (node_tx, mut node_rx) = mpsc::channel::<NodeInput>(256);

        let mut receivers = Vec::with_capacity(inputs.len());
        for (source, track) in &inputs {
            let frames = track.take_frames().ok_or_else(|| {
                RecorderError::Capture(format!(
                    "audio track '{}' is already consumed",
                    track.label()
                ))
            })?;
            receivers.push((*source, frames));
        }

        let sources: Vec<AudioStreamSource> = receivers.iter().map(|(s, _)| *s).collect();

        let source_nodes = receivers
            .into_iter()
            .map(|(source, mut frames)| {
                let node_tx = node_tx.clone();
                tokio::spawn(async move {
                    while let Some(frame) = frames.recv().await {
                        if let MediaFrame::Audio(mut audio) = frame {
                            audio.source = source;
                            if node_tx.send(NodeInput::Frame(audio)).await.is_err() {
                                return;
                            }
                        }
                    }
                    let _ = node_tx.send(NodeInput::Ended(source)).await;
                })
            })
            .collect();
        drop(node_tx);

        let mut mixer = AudioMixer::new(config, &sources);
        let mixer_task = tokio::spawn(async move {
            while let Some(input) = node_rx.recv().await {
                match input {
                    NodeInput::Frame(frame) => mixer.buffer_frame(frame),
                    NodeInput::Ended(source) => {
                        debug!("Audio graph input ended: {:?}", source);
                        mixer.mark_finished(source);
                    }
                }

                while let Some(mixed) = mixer.next_ready() {
                    if !sink.send(MediaFrame::Audio(mixed)) {
                        return;
                    }
                }
            }

            for mixed in mixer.drain() {
                if !sink.send(MediaFrame::Audio(mixed)) {
                    break;
                }
            }
        });

        info!("Audio graph {} connected ({} sources: {:?})", id, sources.len(), sources);

        Ok(Self {
            id,
            destination,
            sources,
            source_nodes,
            mixer_task: Some(mixer_task),
        })
    }

    /// The single mixed output track
    pub fn output(&self) -> MediaTrack {
        self.destination.clone()
    }

    pub fn sources(&self) -> &[AudioStreamSource] {
        &self.sources
    }

    pub fn is_closed(&self) -> bool {
        self.mixer_task.is_none()
    }

    /// Disconnect every node and end the output track. Idempotent.
    pub fn close(&mut self) {
        let Some(mixer_task) = self.mixer_task.take() else {
            return;
        };

        for node in self.source_nodes.drain(..) {
            node.abort();
        }
        mixer_task.abort();
        self.destination.stop();

        info!("Audio graph {} closed", self.id);
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.close();
    }
}
