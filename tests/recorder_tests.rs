// Integration tests for the recorder lifecycle
//
// These tests drive a Recorder over the simulated capture host and
// encoder, with tokio's clock paused so elapsed-time checks are exact.

use anyhow::Result;
use async_trait::async_trait;
use screen_recorder::capture::{
    CaptureHost, DeviceInfo, DisplayBehavior, DisplayConstraints, MicrophoneConstraints,
    SimulatedHostConfig,
};
use screen_recorder::recording::{EncoderBackend, EncoderEvent, EncoderOptions, StreamEncoder};
use screen_recorder::{
    CaptureConfig, MediaStream, RecorderError, RecorderHandle, RecorderResult, RecorderSettings,
    SimulatedEncoder, SimulatedHost, Status, TrackKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Holds every display request until the test opens the gate
#[derive(Default)]
struct GatedHost {
    inner: SimulatedHost,
    entered: Notify,
    gate: Notify,
}

#[async_trait]
impl CaptureHost for GatedHost {
    async fn request_display(&self, constraints: &DisplayConstraints) -> RecorderResult<MediaStream> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.request_display(constraints).await
    }

    async fn request_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> RecorderResult<MediaStream> {
        self.inner.request_microphone(constraints).await
    }

    async fn enumerate_devices(&self) -> RecorderResult<Vec<DeviceInfo>> {
        self.inner.enumerate_devices().await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Emits one slice, then fails
struct FailingEncoder;

impl EncoderBackend for FailingEncoder {
    fn name(&self) -> &str {
        "failing"
    }

    fn is_type_supported(&self, _mime_type: &str) -> bool {
        true
    }

    fn create(
        &self,
        _stream: MediaStream,
        _options: EncoderOptions,
    ) -> RecorderResult<Box<dyn StreamEncoder>> {
        Ok(Box::new(FailingStreamEncoder))
    }
}

struct FailingStreamEncoder;

impl StreamEncoder for FailingStreamEncoder {
    fn start(&mut self, timeslice: Duration) -> RecorderResult<mpsc::Receiver<EncoderEvent>> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(timeslice).await;
            let _ = tx.send(EncoderEvent::Data(b"partial".to_vec())).await;
            tokio::time::sleep(timeslice).await;
            let _ = tx.send(EncoderEvent::Error("disk full".to_string())).await;
        });
        Ok(rx)
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn stop(&mut self) {}
}

fn spawn_recorder(
    host: &Arc<SimulatedHost>,
    encoder: impl EncoderBackend + 'static,
) -> RecorderHandle {
    screen_recorder::Recorder::spawn(
        host.clone(),
        Arc::new(encoder),
        RecorderSettings::default(),
    )
}

fn video_only() -> CaptureConfig {
    CaptureConfig::default()
}

fn mic_and_system() -> CaptureConfig {
    CaptureConfig {
        mic: true,
        system: true,
        mic_device_id: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_then_stop_produces_artifact() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    assert_eq!(recorder.status(), Status::Idle);
    assert_eq!(recorder.start(video_only()).await?, Status::Recording);

    let snapshot = recorder.snapshot();
    assert!(snapshot.preview.is_some(), "Preview should be live while recording");
    assert_eq!(snapshot.config, Some(video_only()));
    assert!(snapshot.session.is_none());

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(recorder.snapshot().recording_time, 3);

    let status = recorder.stop().await?;
    assert_eq!(status, Status::Processing);

    let finished = recorder.wait_for_status(Status::Finished).await?;
    let artifact = finished.session.expect("Finished recorder should hold a session");

    assert_eq!(artifact.mime_type(), "video/webm");
    assert!(artifact.size_bytes() > 0, "Artifact should contain encoded data");
    assert_eq!(artifact.size_bytes(), artifact.data().len());
    assert!(artifact.chunk_count() >= 3, "Expected one chunk per elapsed second");
    assert!(artifact.filename().starts_with("recording-"));
    assert!(artifact.filename().ends_with(".webm"));
    assert!(artifact.url().starts_with("recording:"));
    assert_eq!(artifact.duration_ms(), 3500);

    assert!(finished.preview.is_none(), "Preview should be cleared after stop");
    assert!(finished.error.is_none());
    assert_eq!(finished.active_streams, 0);
    assert_eq!(host.live_track_count(), 0, "All capture tracks should be stopped");

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_recording_time() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    recorder.start(video_only()).await?;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(recorder.pause().await?, Status::Paused);
    assert_eq!(recorder.snapshot().recording_time, 2);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        recorder.snapshot().recording_time,
        2,
        "Time should not advance while paused"
    );
    assert!(host.live_track_count() > 0, "Capture stays live while paused");

    assert_eq!(recorder.resume().await?, Status::Recording);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(recorder.snapshot().recording_time, 3);

    recorder.stop().await?;
    let finished = recorder.wait_for_status(Status::Finished).await?;
    let artifact = finished.session.expect("session");
    assert_eq!(artifact.duration_ms(), 4000, "Paused time is excluded");

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_paused_finishes() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    recorder.start(video_only()).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    recorder.pause().await?;

    recorder.stop().await?;
    let finished = recorder.wait_for_status(Status::Finished).await?;
    assert!(finished.session.is_some());
    assert_eq!(host.live_track_count(), 0);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_illegal_operations_are_noops() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    // Nothing to act on while idle
    assert_eq!(recorder.stop().await?, Status::Idle);
    assert_eq!(recorder.pause().await?, Status::Idle);
    assert_eq!(recorder.resume().await?, Status::Idle);
    assert_eq!(recorder.reset().await?, Status::Idle);
    assert_eq!(host.live_track_count(), 0);

    recorder.start(video_only()).await?;
    let live = host.live_track_count();

    // A second start must not acquire anything new
    assert_eq!(
        recorder.start(mic_and_system()).await,
        Err(RecorderError::InvalidState(Status::Recording))
    );
    assert_eq!(host.live_track_count(), live);
    assert_eq!(recorder.snapshot().config, Some(video_only()));

    assert_eq!(recorder.resume().await?, Status::Recording);
    assert_eq!(recorder.reset().await?, Status::Recording);

    recorder.pause().await?;
    assert_eq!(recorder.pause().await?, Status::Paused);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reset_returns_to_idle_from_finished() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    recorder.start(video_only()).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    recorder.stop().await?;
    recorder.wait_for_status(Status::Finished).await?;

    // Start is not legal until the finished session is reset
    assert_eq!(
        recorder.start(video_only()).await,
        Err(RecorderError::InvalidState(Status::Finished))
    );

    assert_eq!(recorder.reset().await?, Status::Idle);
    let snapshot = recorder.snapshot();
    assert!(snapshot.session.is_none(), "Reset discards the session");
    assert!(snapshot.config.is_none());
    assert_eq!(snapshot.recording_time, 0);

    // A second recording can follow
    assert_eq!(recorder.start(video_only()).await?, Status::Recording);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_display_denied_leaves_recorder_idle() -> Result<()> {
    let host = Arc::new(SimulatedHost::new(SimulatedHostConfig {
        display: DisplayBehavior::Deny,
        ..Default::default()
    }));
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let result = recorder.start(mic_and_system()).await;
    assert!(
        matches!(result, Err(RecorderError::PermissionDenied(_))),
        "Expected PermissionDenied, got {:?}",
        result
    );

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.status, Status::Idle);
    assert!(snapshot.error.is_some(), "Failure should be surfaced");
    assert_eq!(host.live_track_count(), 0);
    assert!(
        host.last_microphone_constraints().is_none(),
        "Microphone must not be requested after the display failed"
    );

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_picker_cancel_is_reported() -> Result<()> {
    let host = Arc::new(SimulatedHost::new(SimulatedHostConfig {
        display: DisplayBehavior::Cancel,
        ..Default::default()
    }));
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let result = recorder.start(video_only()).await;
    assert_eq!(result, Err(RecorderError::UserCancelledPicker));
    assert_eq!(recorder.status(), Status::Idle);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_mic_device_releases_display() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let config = CaptureConfig {
        mic: true,
        system: true,
        mic_device_id: Some("no-such-mic".to_string()),
    };

    let result = recorder.start(config).await;
    assert!(
        matches!(result, Err(RecorderError::DeviceUnavailable(_))),
        "Expected DeviceUnavailable, got {:?}",
        result
    );
    assert!(host.last_display_constraints().is_some(), "Display was granted first");
    assert_eq!(host.live_track_count(), 0, "Granted display must be released");
    assert_eq!(recorder.snapshot().active_streams, 0);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_microphone_denied_releases_display() -> Result<()> {
    let host = Arc::new(SimulatedHost::new(SimulatedHostConfig {
        microphone_denied: true,
        ..Default::default()
    }));
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let result = recorder.start(mic_and_system()).await;
    assert!(matches!(result, Err(RecorderError::PermissionDenied(_))));
    assert_eq!(host.live_track_count(), 0);
    assert_eq!(recorder.status(), Status::Idle);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_system_audio_passes_through_without_mixing() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let config = CaptureConfig {
        system: true,
        ..Default::default()
    };
    recorder.start(config).await?;

    let snapshot = recorder.snapshot();
    assert!(!snapshot.audio_mixing, "A single source needs no graph");

    let preview = snapshot.preview.expect("preview");
    assert_eq!(preview.video_tracks().count(), 1);
    assert_eq!(preview.audio_tracks().count(), 1);
    assert_eq!(preview.audio_tracks().next().map(|t| t.label()), Some("System Audio"));
    assert_eq!(snapshot.active_streams, 2);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_mic_and_system_are_mixed_into_one_track() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    recorder.start(mic_and_system()).await?;

    let snapshot = recorder.snapshot();
    assert!(snapshot.audio_mixing, "Two sources should run through the graph");
    assert_eq!(snapshot.active_streams, 3, "Video, system audio and microphone");

    let preview = snapshot.preview.expect("preview");
    let audio: Vec<_> = preview.audio_tracks().collect();
    assert_eq!(audio.len(), 1, "Composite carries exactly one audio track");
    assert_eq!(audio[0].kind(), TrackKind::Audio);
    assert_eq!(audio[0].label(), "Mixed Audio");

    let mic = host.last_microphone_constraints().expect("mic requested");
    assert!(mic.echo_cancellation && mic.noise_suppression && mic.auto_gain_control);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    recorder.stop().await?;
    let finished = recorder.wait_for_status(Status::Finished).await?;

    assert!(!finished.audio_mixing, "Graph closes when the recording ends");
    assert!(finished.session.is_some());
    assert_eq!(host.live_track_count(), 0);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ending_display_share_stops_recording() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    recorder.start(mic_and_system()).await?;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    host.end_display_share();

    let finished = recorder.wait_for_status(Status::Finished).await?;
    assert!(finished.session.is_some(), "Ending the share is an ordinary stop");
    assert!(finished.error.is_none());
    assert_eq!(host.live_track_count(), 0, "Microphone released too");

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_encoder_releases_capture() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::with_supported(Vec::new()));

    let result = recorder.start(mic_and_system()).await;
    assert!(
        matches!(result, Err(RecorderError::EncoderUnsupported(_))),
        "Expected EncoderUnsupported, got {:?}",
        result
    );

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.status, Status::Idle);
    assert!(!snapshot.audio_mixing);
    assert_eq!(host.live_track_count(), 0);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_falls_back_to_vp8() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let encoder = SimulatedEncoder::with_supported(vec!["video/webm;codecs=vp8".to_string()]);
    let recorder = spawn_recorder(&host, encoder);

    recorder.start(video_only()).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    recorder.stop().await?;

    let finished = recorder.wait_for_status(Status::Finished).await?;
    let artifact = finished.session.expect("session");
    assert_eq!(artifact.mime_type(), "video/webm", "Tagged with the container type");

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_and_is_idempotent() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());
    let other = recorder.clone();

    recorder.start(mic_and_system()).await?;
    assert!(host.live_track_count() > 0);

    recorder.shutdown().await?;
    assert_eq!(host.live_track_count(), 0, "Shutdown while recording releases capture");

    other.shutdown().await?;
    recorder.shutdown().await?;

    let result = recorder.start(video_only()).await;
    assert_eq!(result, Err(RecorderError::Closed));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_every_transition() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());
    let mut updates = recorder.subscribe();

    recorder.start(video_only()).await?;
    updates.changed().await?;
    assert_eq!(updates.borrow_and_update().status, Status::Recording);

    recorder.pause().await?;
    updates.changed().await?;
    assert_eq!(updates.borrow_and_update().status, Status::Paused);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_encoder_error_keeps_gathered_chunks() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, FailingEncoder);

    recorder.start(video_only()).await?;

    let finished = recorder.wait_for_status(Status::Finished).await?;
    let artifact = finished.session.expect("session");
    assert_eq!(artifact.data(), b"partial", "Chunks before the failure are kept");

    let error = finished.error.expect("encoder failure should be surfaced");
    assert!(error.contains("disk full"), "Unexpected error text: {}", error);
    assert_eq!(host.live_track_count(), 0);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_microphone_alone_passes_through() -> Result<()> {
    let host = Arc::new(SimulatedHost::default());
    let recorder = spawn_recorder(&host, SimulatedEncoder::default());

    let config = CaptureConfig {
        mic: true,
        ..Default::default()
    };
    recorder.start(config).await?;

    let snapshot = recorder.snapshot();
    assert!(!snapshot.audio_mixing, "A lone microphone needs no graph");
    assert_eq!(snapshot.active_streams, 2, "Video and microphone");

    let preview = snapshot.preview.expect("preview");
    assert_eq!(preview.video_tracks().count(), 1);
    assert_eq!(preview.audio_tracks().count(), 1);
    assert_eq!(
        preview.audio_tracks().next().map(|t| t.label()),
        Some("Default Microphone")
    );

    let display = host.last_display_constraints().expect("display requested");
    assert!(!display.system_audio);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_acquisition_aborts_to_idle() -> Result<()> {
    let host = Arc::new(GatedHost::default());
    let recorder = screen_recorder::Recorder::spawn(
        host.clone(),
        Arc::new(SimulatedEncoder::default()),
        RecorderSettings::default(),
    );

    let starting = tokio::spawn({
        let recorder = recorder.clone();
        async move { recorder.start(mic_and_system()).await }
    });
    host.entered.notified().await;

    let stopping = tokio::spawn({
        let recorder = recorder.clone();
        async move { recorder.stop().await }
    });

    // Let the stop reach the queue, then let the display request finish
    tokio::time::sleep(Duration::from_millis(10)).await;
    host.gate.notify_one();

    assert_eq!(starting.await??, Status::Idle, "Start is aborted, not failed");
    assert_eq!(stopping.await??, Status::Idle);

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.status, Status::Idle);
    assert!(snapshot.session.is_none(), "No session is published");
    assert!(snapshot.error.is_none(), "An abort is not an error");
    assert!(snapshot.preview.is_none());
    assert!(!snapshot.audio_mixing);
    assert_eq!(snapshot.active_streams, 0);
    assert_eq!(host.inner.live_track_count(), 0, "Acquired streams are released");

    // The recorder is usable again
    host.gate.notify_one();
    assert_eq!(recorder.start(video_only()).await?, Status::Recording);

    recorder.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_acquisition_applies_after_start() -> Result<()> {
    let host = Arc::new(GatedHost::default());
    let recorder = screen_recorder::Recorder::spawn(
        host.clone(),
        Arc::new(SimulatedEncoder::default()),
        RecorderSettings::default(),
    );

    let starting = tokio::spawn({
        let recorder = recorder.clone();
        async move { recorder.start(video_only()).await }
    });
    host.entered.notified().await;

    let pausing = tokio::spawn({
        let recorder = recorder.clone();
        async move { recorder.pause().await }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    host.gate.notify_one();

    assert_eq!(starting.await??, Status::Recording);
    assert_eq!(pausing.await??, Status::Paused, "Queued commands run in order");
    assert!(host.inner.live_track_count() > 0);

    recorder.shutdown().await?;
    assert_eq!(host.inner.live_track_count(), 0);
    Ok(())
}
