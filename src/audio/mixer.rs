// Audio mixer for combining system audio and microphone streams
//
// The mixer buffers frames per source, waits until every live source has
// a frame (or one source has stalled past the buffering limit) and sums
// the samples with clipping.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use super::frame::{AudioFrame, AudioStreamSource};

/// Configuration for audio mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Expected sample rate of every input and of the output
    pub sample_rate: u32,
    /// Expected channel count of every input and of the output
    pub channels: u16,
    /// Maximum buffering delay in milliseconds (default: 200ms)
    /// A source lagging further than this no longer holds back the mix
    pub max_buffer_delay_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            max_buffer_delay_ms: 200,
        }
    }
}

/// Time-aligning sample mixer
pub struct AudioMixer {
    config: MixerConfig,
    /// Buffers for each connected source
    buffers: HashMap<AudioStreamSource, VecDeque<AudioFrame>>,
    /// Sources whose input has closed
    finished: HashSet<AudioStreamSource>,
    current_position_ms: u64,
}

impl AudioMixer {
    pub fn new(config: MixerConfig, sources: &[AudioStreamSource]) -> Self {
        let buffers = sources.iter().map(|s| (*s, VecDeque::new())).collect();

        Self {
            config,
            buffers,
            finished: HashSet::new(),
            current_position_ms: 0,
        }
    }

    pub fn source_count(&self) -> usize {
        self.buffers.len()
    }

    /// Buffer a frame based on its source type
    pub fn buffer_frame(&mut self, frame: AudioFrame) {
        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return;
        }

        if frame.channels != self.config.channels {
            warn!(
                "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.config.channels, frame.channels
            );
            return;
        }

        match self.buffers.get_mut(&frame.source) {
            Some(buffer) => buffer.push_back(frame),
            None => {
                debug!("Skipping frame from unconnected source: {:?}", frame.source);
                return;
            }
        }

        self.cleanup_old_frames();
    }

    /// Mark a source as closed; it no longer holds back the mix
    pub fn mark_finished(&mut self, source: AudioStreamSource) {
        self.finished.insert(source);
    }

    /// Remove frames that are too old (beyond max buffer delay)
    fn cleanup_old_frames(&mut self) {
        let cutoff_time = self
            .current_position_ms
            .saturating_sub(self.config.max_buffer_delay_ms);

        for (source, buffer) in &mut self.buffers {
            while let Some(frame) = buffer.front() {
                if frame.timestamp_ms < cutoff_time {
                    warn!(
                        "Dropping old {:?} frame at {}ms (current position: {}ms)",
                        source, frame.timestamp_ms, self.current_position_ms
                    );
                    buffer.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Whether the next chunk can be mixed without waiting on a source
    fn is_ready(&self) -> bool {
        let mut any_buffered = false;
        let mut all_live_present = true;
        let mut oldest = u64::MAX;
        let mut newest = 0;

        for (source, buffer) in &self.buffers {
            match (buffer.front(), buffer.back()) {
                (Some(front), Some(back)) => {
                    any_buffered = true;
                    oldest = oldest.min(front.timestamp_ms);
                    newest = newest.max(back.timestamp_ms);
                }
                _ => {
                    if !self.finished.contains(source) {
                        all_live_present = false;
                    }
                }
            }
        }

        if !any_buffered {
            return false;
        }

        // A stalled source stops holding the others back
        all_live_present || newest.saturating_sub(oldest) > self.config.max_buffer_delay_ms
    }

    /// Mix the next chunk if every live source has contributed
    pub fn next_ready(&mut self) -> Option<AudioFrame> {
        if !self.is_ready() {
            return None;
        }
        self.mix_next_chunk()
    }

    /// Mix whatever is buffered, regardless of readiness
    pub fn drain(&mut self) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        while let Some(mixed) = self.mix_next_chunk() {
            out.push(mixed);
        }
        out
    }

    /// Pop one frame from each source buffer and mix them
    ///
    /// Returns None if there's no data available in any buffer
    fn mix_next_chunk(&mut self) -> Option<AudioFrame> {
        let frames_to_mix: Vec<AudioFrame> = self
            .buffers
            .values_mut()
            .filter_map(|buffer| buffer.pop_front())
            .collect();

        if frames_to_mix.is_empty() {
            return None;
        }

        let mixed = self.mix_frames(&frames_to_mix);
        self.current_position_ms = mixed.timestamp_ms;
        Some(mixed)
    }

    /// Mix audio frames together by adding their samples
    ///
    /// Uses the earliest timestamp and the longest frame; shorter frames
    /// contribute silence past their end.
    pub fn mix_frames(&self, frames: &[AudioFrame]) -> AudioFrame {
        let timestamp_ms = frames.iter().map(|f| f.timestamp_ms).min().unwrap_or(0);
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);

        let mixed_samples = (0..max_len)
            .map(|i| {
                let sum: i32 = frames
                    .iter()
                    .map(|frame| frame.samples.get(i).copied().unwrap_or(0) as i32)
                    .sum();
                sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
            })
            .collect();

        AudioFrame {
            samples: mixed_samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            timestamp_ms,
            source: AudioStreamSource::Mixed,
        }
    }
}
