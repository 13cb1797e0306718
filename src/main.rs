use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screen_recorder::{
    create_router, AppState, CaptureConfig, CaptureHost, Config, Recorder, SimulatedEncoder,
    SimulatedHost, Status,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "screen-recorder", about = "Screen and audio capture recorder")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/screen-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Record for a fixed duration and save the result
    Record {
        /// Recording length in seconds
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        /// Mix in the microphone
        #[arg(long)]
        mic: bool,
        /// Capture system audio
        #[arg(long)]
        system: bool,
        /// Microphone device id
        #[arg(long)]
        mic_device: Option<String>,
    },
    /// List capture devices
    Devices,
}

fn load_config(path: &str) -> Result<Config> {
    let file_exists = ["toml", "yaml", "json"]
        .iter()
        .any(|ext| Path::new(&format!("{}.{}", path, ext)).exists());

    if file_exists {
        Config::load(path).with_context(|| format!("Failed to load config: {}", path))
    } else {
        warn!("No config found at {}, using defaults", path);
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    // Real capture and encoding belong to the host platform; the bundled
    // simulated backends stand in for them here.
    let host = Arc::new(SimulatedHost::default());
    let encoders = Arc::new(SimulatedEncoder::default());

    match cli.command {
        Command::Serve => {
            let recorder = Recorder::spawn(host.clone(), encoders, cfg.recorder.clone());
            let state = AppState::new(recorder.clone(), host, &cfg.output.recordings_path);
            let app = create_router(state);

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP API listening on {}", addr);
            axum::serve(listener, app).await.context("HTTP server failed")?;

            recorder.shutdown().await?;
        }

        Command::Record {
            seconds,
            mic,
            system,
            mic_device,
        } => {
            let recorder = Recorder::spawn(host, encoders, cfg.recorder.clone());
            let config = CaptureConfig {
                mic,
                system,
                mic_device_id: mic_device,
            };

            recorder.start(config).await?;
            info!("Recording for {} seconds", seconds);
            tokio::time::sleep(Duration::from_secs(seconds)).await;

            recorder.stop().await?;
            let snapshot = recorder.wait_for_status(Status::Finished).await?;

            match snapshot.session {
                Some(artifact) => {
                    let path = artifact.write_to(&cfg.output.recordings_path)?;
                    info!("Saved {}", path.display());
                }
                None => warn!("Recording produced no session"),
            }

            recorder.shutdown().await?;
        }

        Command::Devices => {
            let devices = host.enumerate_devices().await?;
            for device in devices {
                println!("{:?}\t{}\t{}", device.kind, device.id, device.label);
            }
        }
    }

    Ok(())
}
