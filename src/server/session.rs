//! Per-connection session handling
//!
//! A session reads one request line and then serves the page, answers a
//! configuration RPC, or streams frames until the client goes away. The
//! socket is shut down exactly once when the session ends, whatever the
//! outcome, and a stream always gives the device back through its
//! [`StreamClaim`](crate::camera::StreamClaim).

use super::dispatcher::{dispatch_get, dispatch_set};
use super::request::{read_request, Route};
use super::response::{frame_content_type, part_header, Response, Status, STREAM_HEADER};
use super::stats::{ServerStats, StreamStats};
use crate::bridge::FrameBridge;
use crate::camera::{Camera, CameraError, StreamClaim};
use crate::convert;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
}

/// Stream tuning shared by every session
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Pause after initializing the device before the first frame
    pub warmup: Duration,
    /// Longest wait for a single frame
    pub frame_timeout: Duration,
    /// Frames between periodic statistics lines; 0 disables them
    pub stats_interval_frames: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(1000),
            frame_timeout: Duration::from_millis(5000),
            stats_interval_frames: 100,
        }
    }
}

/// Everything a session needs besides its socket
#[derive(Clone)]
pub struct SessionContext {
    pub camera: Arc<Camera>,
    pub page: Bytes,
    pub request_buffer: usize,
    /// Longest wait for the request line
    pub request_timeout: Duration,
    pub stream: StreamSettings,
    pub stats: Arc<ServerStats>,
    pub shutdown: watch::Receiver<bool>,
}

/// Resolves once shutdown has been signalled; never if the sender is gone
pub async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Serves one connection and closes it
pub async fn handle_connection<S>(mut socket: S, peer: SocketAddr, ctx: SessionContext)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ctx.stats.connection_opened();

    match serve(&mut socket, peer, &ctx).await {
        Ok(()) => debug!(peer = %peer, "Session finished"),
        Err(SessionError::Io(e)) => debug!(peer = %peer, error = %e, "Connection closed"),
        Err(e) => error!(peer = %peer, error = %e, "Session failed"),
    }

    if let Err(e) = socket.shutdown().await {
        debug!(peer = %peer, error = %e, "Socket shutdown failed");
    }
}

async fn serve<S>(socket: &mut S, peer: SocketAddr, ctx: &SessionContext) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = read_request(socket, ctx.request_buffer, ctx.request_timeout).await?;
    let route = Route::classify(&request);
    debug!(peer = %peer, ?route, "Request");

    match route {
        Route::Stream => stream(socket, peer, ctx).await,
        Route::Set { field, value } => {
            let response = dispatch_set(&ctx.camera, &field, value.as_deref());
            ctx.stats.rpc(response.status == Status::Ok);
            write_response(socket, &response).await
        }
        Route::Get { field } => {
            let response = dispatch_get(&ctx.camera, &field);
            ctx.stats.rpc(response.status == Status::Ok);
            write_response(socket, &response).await
        }
        Route::Page => write_response(socket, &Response::html(ctx.page.clone())).await,
    }
}

async fn write_response<S>(socket: &mut S, response: &Response) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    socket.write_all(&response.to_bytes()).await?;
    socket.flush().await?;
    Ok(())
}

/// Decrements the active stream count however the stream ends
struct ActiveStream<'a>(&'a ServerStats);

impl<'a> ActiveStream<'a> {
    fn new(stats: &'a ServerStats) -> Self {
        stats.stream_started();
        Self(stats)
    }
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        self.0.stream_ended();
    }
}

async fn stream<S>(socket: &mut S, peer: SocketAddr, ctx: &SessionContext) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    let claim = match ctx.camera.claim_stream() {
        Ok(claim) => claim,
        Err(CameraError::Busy) => {
            warn!(peer = %peer, "Stream refused, camera busy");
            ctx.stats.stream_refused();
            return write_response(socket, &Response::busy()).await;
        }
        Err(e) => return Err(e.into()),
    };

    let _active = ActiveStream::new(&ctx.stats);
    info!(peer = %peer, "Stream started");

    let started = Instant::now();
    let mut stats = StreamStats::default();
    let result = run_stream(socket, ctx, &claim, &mut stats).await;

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        peer = %peer,
        frames = stats.frames_sent,
        converted = stats.frames_converted,
        fps = %format!("{:.1}", stats.calculate_fps(&StreamStats::default(), elapsed)),
        "Stream ended"
    );
    result
}

async fn run_stream<S>(
    socket: &mut S,
    ctx: &SessionContext,
    claim: &StreamClaim,
    stats: &mut StreamStats,
) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    let camera = claim.camera();
    let mut shutdown = ctx.shutdown.clone();

    if !camera.is_initialized() {
        camera.init()?;
        if !ctx.stream.warmup.is_zero() {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => return Ok(()),
                _ = tokio::time::sleep(ctx.stream.warmup) => {}
            }
        }
    }

    socket.write_all(STREAM_HEADER).await?;
    socket.flush().await?;

    let mut bridge = FrameBridge::new(Arc::clone(camera), ctx.stream.frame_timeout);
    let mut window = (stats.clone(), Instant::now());

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => {
                info!("Shutdown requested, ending stream");
                return Ok(());
            }
            frame = bridge.acquire() => frame?,
        };

        // The format is taken from each frame; a reconfiguration may change it mid-stream
        let body = if frame.is_jpeg() {
            frame.data.clone()
        } else {
            match convert::frame_to_bmp(&frame) {
                Ok(bmp) => {
                    stats.frames_converted += 1;
                    bmp
                }
                Err(e) => {
                    stats.conversion_errors += 1;
                    warn!(format = %frame.format, error = %e, "Dropping frame that failed to convert");
                    continue;
                }
            }
        };
        let header = part_header(frame_content_type(frame.format));
        drop(frame);

        socket.write_all(&header).await?;
        socket.write_all(&body).await?;
        socket.write_all(b"\r\n").await?;
        socket.flush().await?;

        let written = header.len() + body.len() + 2;
        stats.frames_sent += 1;
        stats.bytes_sent += written as u64;
        ctx.stats.frame_sent(written);

        let interval = ctx.stream.stats_interval_frames;
        if interval > 0 && stats.frames_sent % interval == 0 {
            let elapsed = window.1.elapsed().as_secs_f64();
            info!(
                frames = stats.frames_sent,
                fps = %format!("{:.1}", stats.calculate_fps(&window.0, elapsed)),
                kbps = %format!("{:.0}", stats.calculate_bitrate_kbps(&window.0, elapsed)),
                "Stream stats"
            );
            window = (stats.clone(), Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FrameSize, PipelineConfig, SimulatedSensor};

    fn context(shutdown: watch::Receiver<bool>) -> SessionContext {
        let sensor = SimulatedSensor::new("OV2640", 100).unwrap();
        let pipeline = PipelineConfig {
            frame_size: FrameSize::QQVGA,
            ..Default::default()
        };
        SessionContext {
            camera: Arc::new(Camera::new(Box::new(sensor), pipeline)),
            page: Bytes::from_static(b"<html>cam</html>"),
            request_buffer: 1024,
            request_timeout: Duration::from_secs(2),
            stream: StreamSettings {
                warmup: Duration::ZERO,
                ..Default::default()
            },
            stats: Arc::new(ServerStats::default()),
            shutdown,
        }
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[tokio::test]
    async fn test_page_bytes() {
        let (_tx, rx) = watch::channel(false);
        let socket = tokio_test::io::Builder::new()
            .read(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
            .write(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
                  Content-Length: 16\r\nConnection: close\r\n\r\n<html>cam</html>",
            )
            .build();
        handle_connection(socket, peer(), context(rx)).await;
    }

    #[tokio::test]
    async fn test_set_and_get_bytes() {
        let (_tx, rx) = watch::channel(false);
        let ctx = context(rx);

        let set = tokio_test::io::Builder::new()
            .read(b"GET /set_brightness?value=2 HTTP/1.1\r\n")
            .write(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .build();
        handle_connection(set, peer(), ctx.clone()).await;

        let get = tokio_test::io::Builder::new()
            .read(b"GET /get_brightness HTTP/1.1\r\n")
            .write(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\
                  Content-Length: 1\r\nConnection: close\r\n\r\n2",
            )
            .build();
        handle_connection(get, peer(), ctx.clone()).await;

        let snapshot = ctx.stats.snapshot();
        assert_eq!(snapshot.rpc_ok, 2);
        assert_eq!(snapshot.connections, 2);
    }

    #[tokio::test]
    async fn test_request_without_crlf_is_answered() {
        use tokio::io::AsyncReadExt;

        for request in [&b"GET /set_brightness?value=1 HTTP/1.1\n"[..], b"GET /set_brightness?value=1"] {
            let (_tx, rx) = watch::channel(false);
            let mut ctx = context(rx);
            ctx.request_timeout = Duration::from_millis(100);

            // The client keeps its write side open
            let (mut client, server) = tokio::io::duplex(4096);
            client.write_all(request).await.unwrap();
            let session = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

            let mut response = Vec::new();
            tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut response))
                .await
                .expect("no response")
                .unwrap();
            assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
            session.await.unwrap();
            assert_eq!(ctx.camera.brightness(), 1);
        }
    }

    #[tokio::test]
    async fn test_busy_stream_gets_503() {
        let (_tx, rx) = watch::channel(false);
        let ctx = context(rx);
        let _claim = ctx.camera.claim_stream().unwrap();

        let socket = tokio_test::io::Builder::new()
            .read(b"GET /stream HTTP/1.1\r\n")
            .write(
                b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\n\
                  Content-Length: 11\r\nConnection: close\r\n\r\ncamera busy",
            )
            .build();
        handle_connection(socket, peer(), ctx.clone()).await;

        assert_eq!(ctx.stats.snapshot().streams_refused, 1);
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let ctx = context(rx);
        let camera = Arc::clone(&ctx.camera);
        let stats = Arc::clone(&ctx.stats);

        let (client, server) = tokio::io::duplex(1 << 20);
        let session = tokio::spawn(handle_connection(server, peer(), ctx));

        let mut client = client;
        client.write_all(b"GET /stream HTTP/1.1\r\n\r\n").await.unwrap();

        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        while received.windows(7).filter(|w| *w == b"--frame").count() < 2 {
            let n = tokio::io::AsyncReadExt::read(&mut client, &mut chunk).await.unwrap();
            assert!(n > 0, "stream closed early");
            received.extend_from_slice(&chunk[..n]);
        }
        assert!(received.starts_with(STREAM_HEADER));
        assert!(camera.is_initialized());

        tx.send(true).unwrap();
        session.await.unwrap();

        assert!(!camera.is_initialized());
        assert!(!camera.is_streaming());
        assert_eq!(stats.snapshot().active_streams, 0);
    }
}
