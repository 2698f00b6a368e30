//! Camera streaming server CLI

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use mjpeg_camera_streamer::benchmark::{self, BenchOptions, BenchReport};
use mjpeg_camera_streamer::camera::{Camera, CameraError, FrameSize};
use mjpeg_camera_streamer::config::{Config, ServerMode};
use mjpeg_camera_streamer::server::{Server, ServerStats, SessionContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "camstream")]
#[command(about = "MJPEG/BMP camera streaming over HTTP")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the configured scheduling mode
        #[arg(short, long, value_enum)]
        mode: Option<ServerMode>,
    },

    /// Measure capture FPS for every pixel format and frame size
    Bench {
        /// Seconds measured per cell
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },

    /// Measure capture plus BMP conversion FPS for the raw formats
    BenchConvert {
        /// Seconds measured per cell
        #[arg(long, default_value_t = 3)]
        seconds: u64,

        /// Frame size index to measure at (defaults to the configured size)
        #[arg(long)]
        frame_size: Option<i32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    info!(config_path = %cli.config, "Loading configuration");
    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config).with_context(|| format!("loading {}", cli.config))?
    } else {
        warn!(config_path = %cli.config, "Config file not found, using defaults");
        Config::default()
    };

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        mode: None,
    }) {
        Command::Serve { port, mode } => serve(config, port, mode).await,
        Command::Bench { seconds } => {
            let opts = BenchOptions {
                duration: Duration::from_secs(seconds),
                ..Default::default()
            };
            run_bench(config, move |camera| benchmark::capture_benchmark(camera, &opts)).await
        }
        Command::BenchConvert {
            seconds,
            frame_size,
        } => {
            let sizes = match frame_size {
                Some(index) => vec![FrameSize::from_index(index)
                    .with_context(|| format!("no frame size with index {}", index))?],
                None => Vec::new(),
            };
            let opts = BenchOptions {
                duration: Duration::from_secs(seconds),
                sizes,
                ..Default::default()
            };
            run_bench(config, move |camera| benchmark::convert_benchmark(camera, &opts)).await
        }
    }
}

async fn serve(mut config: Config, port: Option<u16>, mode: Option<ServerMode>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(mode) = mode {
        config.server.mode = mode;
    }

    let page = tokio::fs::read(&config.server.page)
        .await
        .with_context(|| format!("loading page {}", config.server.page.display()))?;
    info!(page = %config.server.page.display(), bytes = page.len(), "Page loaded");

    let camera = Arc::new(Camera::open(&config.camera).context("opening camera")?);
    info!(
        sensor = %camera.sensor_name(),
        frame_size = %camera.frame_size(),
        pixel_format = %camera.pixel_format(),
        "Camera ready"
    );
    if config.camera.init {
        camera.init().context("initializing camera")?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stats = Arc::new(ServerStats::default());
    let ctx = SessionContext {
        camera: Arc::clone(&camera),
        page: Bytes::from(page),
        request_buffer: config.server.request_buffer,
        request_timeout: config.request_timeout(),
        stream: config.stream.settings(),
        stats: Arc::clone(&stats),
        shutdown: shutdown_rx,
    };

    let server = Server::bind(config.listen_addr(), config.server.mode, ctx)
        .await
        .with_context(|| format!("binding {}", config.listen_addr()))?;
    info!("Server started, press Ctrl+C to stop");

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        shutdown_tx.send_replace(true);
    });

    server.run().await?;

    if let Err(e) = camera.deinit() {
        warn!(error = %e, "Failed to deinitialize camera");
    }

    let snapshot = stats.snapshot();
    info!(
        connections = snapshot.connections,
        frames = snapshot.frames_sent,
        bytes = snapshot.bytes_sent,
        rpc_ok = snapshot.rpc_ok,
        rpc_failed = snapshot.rpc_failed,
        refused = snapshot.streams_refused,
        "Final stats"
    );
    Ok(())
}

async fn run_bench<F>(config: Config, bench: F) -> Result<()>
where
    F: FnOnce(&Camera) -> Result<BenchReport, CameraError> + Send + 'static,
{
    let camera = Camera::open(&config.camera).context("opening camera")?;
    let report = tokio::task::spawn_blocking(move || {
        let report = bench(&camera);
        if let Err(e) = camera.deinit() {
            warn!(error = %e, "Failed to deinitialize camera");
        }
        report
    })
    .await??;

    println!("{}", report);
    Ok(())
}
