//! Recorder lifecycle controller
//!
//! `Recorder` runs as a single task that owns every recording resource:
//! the held capture streams, the audio graph, the encoder and its chunks.
//! Commands from `RecorderHandle`s, encoder output, clock ticks and the
//! end of the display track are all handled on that one task, in the order
//! they arrive.
//!
//! Acquisition suspends the task. Commands sent meanwhile wait in the queue
//! and run once it completes; a queued `stop` (or shutdown) aborts the start
//! instead of letting it begin recording.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::clock::SessionClock;
use super::status::{RecorderSnapshot, Status};
use crate::audio::{AudioGraph, AudioStreamSource, MixerConfig};
use crate::capture::{
    AcquiredStreams, ActiveCapture, CaptureConfig, CaptureHost, MediaStream, MediaTrack,
    StreamAcquirer,
};
use crate::config::RecorderSettings;
use crate::error::{RecorderError, RecorderResult};
use crate::recording::{EncoderBackend, EncoderEvent, RecordingArtifact, RecordingEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Stop,
    Pause,
    Resume,
    Reset,
}

enum Command {
    Start {
        config: CaptureConfig,
        reply: oneshot::Sender<RecorderResult<Status>>,
    },
    Transition {
        operation: Operation,
        reply: oneshot::Sender<Status>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct Recorder {
    host: Arc<dyn CaptureHost>,
    encoders: Arc<dyn EncoderBackend>,
    settings: RecorderSettings,
    commands: mpsc::Receiver<Command>,
    /// Commands received during acquisition, handled before new ones
    deferred: VecDeque<Command>,
    snapshot_tx: watch::Sender<RecorderSnapshot>,

    status: Status,
    clock: SessionClock,
    config: Option<CaptureConfig>,
    capture: Option<ActiveCapture>,
    graph: Option<AudioGraph>,
    engine: Option<RecordingEngine>,
    display_video: Option<MediaTrack>,
    preview: Option<MediaStream>,
    session: Option<Arc<RecordingArtifact>>,
    error: Option<String>,
}

impl Recorder {
    /// Start the recorder task and return a handle to it.
    ///
    /// The task runs until `shutdown` is called or every handle is dropped;
    /// either way all held resources are released.
    pub fn spawn(
        host: Arc<dyn CaptureHost>,
        encoders: Arc<dyn EncoderBackend>,
        settings: RecorderSettings,
    ) -> RecorderHandle {
        let (command_tx, commands) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(RecorderSnapshot::default());

        let recorder = Self {
            host,
            encoders,
            settings,
            commands,
            deferred: VecDeque::new(),
            snapshot_tx,
            status: Status::Idle,
            clock: SessionClock::new(Duration::from_secs(1)),
            config: None,
            capture: None,
            graph: None,
            engine: None,
            display_video: None,
            preview: None,
            session: None,
            error: None,
        };

        tokio::spawn(recorder.run());

        RecorderHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }

    async fn run(mut self) {
        info!(
            "Recorder running (capture host: {}, encoder: {})",
            self.host.name(),
            self.encoders.name()
        );

        loop {
            if let Some(command) = self.deferred.pop_front() {
                if !self.handle_command(command).await {
                    break;
                }
                continue;
            }

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("All recorder handles dropped");
                        self.teardown();
                        break;
                    }
                },
                _ = self.clock.tick() => self.publish(),
                event = next_encoder_event(&mut self.engine) => self.on_encoder_event(event),
                _ = wait_for_end(&self.display_video), if self.status.is_capturing() => {
                    self.on_display_ended()
                }
            }
        }

        info!("Recorder stopped");
    }

    /// Returns false when the recorder should exit
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start { config, reply } => {
                let result = self.start(config).await;
                let _ = reply.send(result);
            }
            Command::Transition { operation, reply } => {
                let status = match operation {
                    Operation::Stop => self.stop(),
                    Operation::Pause => self.pause(),
                    Operation::Resume => self.resume(),
                    Operation::Reset => self.reset(),
                };
                let _ = reply.send(status);
            }
            Command::Shutdown { reply } => {
                self.teardown();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn start(&mut self, config: CaptureConfig) -> RecorderResult<Status> {
        if self.status != Status::Idle {
            warn!("Start ignored: recorder is {}", self.status);
            return Err(RecorderError::InvalidState(self.status));
        }

        self.release_resources();
        self.error = None;
        self.session = None;

        info!(
            "Starting recording (mic: {}, system audio: {})",
            config.mic, config.system
        );

        let launched = self.launch(&config).await;

        if launched.is_ok() && self.stop_queued() {
            info!("Stop requested during acquisition, releasing captured streams");
            self.engine = None;
            self.release_resources();
            self.status = Status::Idle;
            self.publish();
            return Ok(self.status);
        }

        match launched {
            Ok(()) => {
                self.config = Some(config);
                self.status = Status::Recording;
                self.clock.start();
                info!("Recording started");
                self.publish();
                Ok(self.status)
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.engine = None;
                self.release_resources();
                self.error = Some(e.to_string());
                self.status = Status::Idle;
                self.publish();
                Err(e)
            }
        }
    }

    /// Acquire streams, wire audio and start the engine.
    ///
    /// Nothing is stored on `self` until every step succeeded; on error the
    /// locals drop in reverse order, closing the graph before the capture
    /// streams are released.
    async fn launch(&mut self, config: &CaptureConfig) -> RecorderResult<()> {
        let acquirer = StreamAcquirer::new(self.host.as_ref(), &self.settings.capture);
        let AcquiredStreams {
            capture,
            display,
            microphone,
        } = acquirer.acquire(config).await?;

        let video = display.video_tracks().next().cloned().ok_or_else(|| {
            RecorderError::Capture("display stream has no video track".to_string())
        })?;
        if video.is_ended() {
            return Err(RecorderError::UserCancelledPicker);
        }

        let mut audio_inputs = Vec::new();
        if config.system {
            if let Some(track) = display.audio_tracks().next() {
                audio_inputs.push((AudioStreamSource::System, track.clone()));
            }
        }
        if let Some(track) = microphone.as_ref().and_then(|m| m.audio_tracks().next()) {
            audio_inputs.push((AudioStreamSource::Microphone, track.clone()));
        }

        // One source passes straight through; only two need mixing
        let (audio_track, graph) = if audio_inputs.len() > 1 {
            let graph = AudioGraph::connect(audio_inputs, MixerConfig::from(&self.settings.mixer))?;
            (Some(graph.output()), Some(graph))
        } else {
            (audio_inputs.pop().map(|(_, track)| track), None)
        };

        let mut tracks = vec![video.clone()];
        tracks.extend(audio_track);
        let composite = MediaStream::new(tracks);

        let engine = RecordingEngine::start(
            self.encoders.as_ref(),
            composite.clone(),
            &self.settings.encoder,
        )?;

        self.capture = Some(capture);
        self.graph = graph;
        self.engine = Some(engine);
        self.display_video = Some(video);
        self.preview = Some(composite);

        Ok(())
    }

    /// Move commands that arrived during acquisition onto the deferred
    /// queue. True if any of them stops or shuts down the recorder.
    fn stop_queued(&mut self) -> bool {
        let mut stop = false;
        while let Ok(command) = self.commands.try_recv() {
            stop |= matches!(
                command,
                Command::Transition {
                    operation: Operation::Stop,
                    ..
                } | Command::Shutdown { .. }
            );
            self.deferred.push_back(command);
        }
        stop
    }

    fn stop(&mut self) -> Status {
        if !self.status.is_capturing() {
            debug!("Stop ignored: recorder is {}", self.status);
            return self.status;
        }

        info!("Stopping recording at {}s", self.clock.elapsed_secs());
        self.clock.stop();

        match self.engine.as_mut() {
            Some(engine) => {
                engine.request_stop();
                self.status = Status::Processing;
            }
            None => {
                warn!("No recording engine while capturing, discarding session");
                self.release_resources();
                self.status = Status::Idle;
            }
        }

        self.publish();
        self.status
    }

    fn pause(&mut self) -> Status {
        if self.status != Status::Recording {
            debug!("Pause ignored: recorder is {}", self.status);
            return self.status;
        }

        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
        self.clock.pause();
        self.status = Status::Paused;
        info!("Recording paused at {}s", self.clock.elapsed_secs());
        self.publish();
        self.status
    }

    fn resume(&mut self) -> Status {
        if self.status != Status::Paused {
            debug!("Resume ignored: recorder is {}", self.status);
            return self.status;
        }

        if let Some(engine) = self.engine.as_mut() {
            engine.resume();
        }
        self.clock.resume();
        self.status = Status::Recording;
        info!("Recording resumed at {}s", self.clock.elapsed_secs());
        self.publish();
        self.status
    }

    fn reset(&mut self) -> Status {
        if self.status != Status::Finished {
            debug!("Reset ignored: recorder is {}", self.status);
            return self.status;
        }

        self.session = None;
        self.config = None;
        self.error = None;
        self.clock.reset();
        self.status = Status::Idle;
        info!("Recorder reset");
        self.publish();
        self.status
    }

    fn on_encoder_event(&mut self, event: EncoderEvent) {
        match event {
            EncoderEvent::Data(chunk) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.push_chunk(chunk);
                }
            }
            EncoderEvent::Error(message) => {
                let e = RecorderError::Encoder(message);
                error!("Encoder failed: {}", e);
                self.error = Some(e.to_string());
                self.finalize();
            }
            EncoderEvent::Stopped => self.finalize(),
        }
    }

    /// The user stopped sharing: treated as an ordinary stop
    fn on_display_ended(&mut self) {
        info!("Display capture ended by the user");
        self.stop();
    }

    /// Build the artifact from every chunk received and release capture
    fn finalize(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };

        self.clock.stop();
        let artifact = engine.finish(self.clock.active_duration(), Utc::now());
        info!(
            "Recording finished: {} ({} bytes)",
            artifact.filename(),
            artifact.size_bytes()
        );

        self.session = Some(Arc::new(artifact));
        self.release_resources();
        self.status = Status::Finished;
        self.publish();
    }

    fn release_resources(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            graph.close();
        }
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
        self.display_video = None;
        self.preview = None;
    }

    /// Unconditional cleanup when the recorder goes away
    fn teardown(&mut self) {
        if self.engine.take().is_some() {
            warn!("Recorder shut down while {}, discarding recording", self.status);
        }
        self.clock.stop();
        self.release_resources();
        if self.status != Status::Finished {
            self.status = Status::Idle;
        }
        self.publish();
    }

    fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            status: self.status,
            recording_time: self.clock.elapsed_secs(),
            preview: self.preview.clone(),
            session: self.session.clone(),
            error: self.error.clone(),
            config: self.config.clone(),
            active_streams: self
                .capture
                .as_ref()
                .map_or(0, ActiveCapture::active_handles),
            audio_mixing: self.graph.as_ref().is_some_and(|g| !g.is_closed()),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

async fn next_encoder_event(engine: &mut Option<RecordingEngine>) -> EncoderEvent {
    match engine {
        Some(engine) => engine.next_event().await,
        None => std::future::pending().await,
    }
}

async fn wait_for_end(track: &Option<MediaTrack>) {
    match track {
        Some(track) => track.ended().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running `Recorder`
#[derive(Clone)]
pub struct RecorderHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<RecorderSnapshot>,
}

impl RecorderHandle {
    /// Begin recording. Only acts from `idle`; otherwise fails with
    /// `InvalidState` and changes nothing.
    ///
    /// Returns `Idle` if a `stop` sent during acquisition aborted the start.
    pub async fn start(&self, config: CaptureConfig) -> RecorderResult<Status> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { config, reply })
            .await
            .map_err(|_| RecorderError::Closed)?;
        rx.await.map_err(|_| RecorderError::Closed)?
    }

    pub async fn stop(&self) -> RecorderResult<Status> {
        self.transition(Operation::Stop).await
    }

    pub async fn pause(&self) -> RecorderResult<Status> {
        self.transition(Operation::Pause).await
    }

    pub async fn resume(&self) -> RecorderResult<Status> {
        self.transition(Operation::Resume).await
    }

    pub async fn reset(&self) -> RecorderResult<Status> {
        self.transition(Operation::Reset).await
    }

    /// Release everything and stop the recorder task. Calling it again,
    /// from any handle, is a no-op.
    pub async fn shutdown(&self) -> RecorderResult<()> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> Status {
        self.snapshot.borrow().status
    }

    /// Watch every snapshot the recorder publishes
    pub fn subscribe(&self) -> watch::Receiver<RecorderSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until the recorder reaches `status`
    pub async fn wait_for_status(&self, status: Status) -> RecorderResult<RecorderSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| s.status == status)
            .await
            .map_err(|_| RecorderError::Closed)?
            .clone();
        Ok(snapshot)
    }

    async fn transition(&self, operation: Operation) -> RecorderResult<Status> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Transition { operation, reply })
            .await
            .map_err(|_| RecorderError::Closed)?;
        rx.await.map_err(|_| RecorderError::Closed)
    }
}
