//! Server and stream statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters, shared by every session
#[derive(Debug, Default)]
pub struct ServerStats {
    connections: AtomicU64,
    active_streams: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    rpc_ok: AtomicU64,
    rpc_failed: AtomicU64,
    streams_refused: AtomicU64,
}

impl ServerStats {
    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_started(&self) {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_ended(&self) {
        self.active_streams.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn stream_refused(&self) {
        self.streams_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn rpc(&self, ok: bool) {
        let counter = if ok { &self.rpc_ok } else { &self.rpc_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            rpc_ok: self.rpc_ok.load(Ordering::Relaxed),
            rpc_failed: self.rpc_failed.load(Ordering::Relaxed),
            streams_refused: self.streams_refused.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub connections: u64,
    pub active_streams: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub rpc_ok: u64,
    pub rpc_failed: u64,
    pub streams_refused: u64,
}

/// Per-stream counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamStats {
    /// Frames written to the client
    pub frames_sent: u64,

    /// Bytes written, part headers included
    pub bytes_sent: u64,

    /// Frames converted to BMP before sending
    pub frames_converted: u64,

    /// Frames skipped because conversion failed
    pub conversion_errors: u64,
}

impl StreamStats {
    /// Frame rate between two samples
    pub fn calculate_fps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let frames_delta = self.frames_sent.saturating_sub(previous.frames_sent);
        frames_delta as f64 / elapsed_secs
    }

    /// Bitrate in kbps between two samples
    pub fn calculate_bitrate_kbps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let bytes_delta = self.bytes_sent.saturating_sub(previous.bytes_sent);
        (bytes_delta as f64 * 8.0) / elapsed_secs / 1000.0
    }

    /// Share of captured frames that could not be sent
    pub fn error_rate(&self) -> f64 {
        let total = self.frames_sent + self.conversion_errors;
        if total == 0 {
            return 0.0;
        }

        self.conversion_errors as f64 / total as f64
    }
}
