//! Configuration management for the camera server

use crate::camera::{FrameSize, GrabMode, PipelineConfig, PixelFormat};
use crate::server::StreamSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

/// How connections are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// One task per connection on a single-threaded runtime
    #[default]
    Cooperative,
    /// Accept, handle and close one connection at a time
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub mode: ServerMode,

    /// HTML page served for every path that is not an endpoint
    #[serde(default = "default_page")]
    pub page: PathBuf,

    /// Bytes read from a request before it is classified
    #[serde(default = "default_request_buffer")]
    pub request_buffer: usize,

    /// Longest wait for a complete request line (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            mode: ServerMode::default(),
            page: default_page(),
            request_buffer: default_request_buffer(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Test-pattern sensor, no hardware needed
    #[default]
    Simulated,
    /// GStreamer source (needs the `gstreamer` feature)
    Gstreamer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub driver: DriverKind,

    /// Sensor model impersonated by the simulated driver
    /// - "OV2640", "OV3660" or "OV5640"
    #[serde(default = "default_sensor")]
    pub sensor: String,

    #[serde(default = "default_frame_size")]
    pub frame_size: FrameSize,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: PixelFormat,

    /// JPEG quality, 0-63, lower is better
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_fb_count")]
    pub fb_count: u8,

    #[serde(default = "default_grab_mode")]
    pub grab_mode: GrabMode,

    /// Initialize the device at startup instead of on first stream
    #[serde(default)]
    pub init: bool,

    /// Frames per second produced by the sensor
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Source device for the GStreamer driver
    /// - Linux: "/dev/video0"
    /// - macOS: "0"
    #[serde(default)]
    pub device: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            sensor: default_sensor(),
            frame_size: default_frame_size(),
            pixel_format: default_pixel_format(),
            jpeg_quality: default_jpeg_quality(),
            fb_count: default_fb_count(),
            grab_mode: default_grab_mode(),
            init: false,
            fps: default_fps(),
            device: String::new(),
        }
    }
}

impl CameraConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            frame_size: self.frame_size,
            pixel_format: self.pixel_format,
            jpeg_quality: self.jpeg_quality,
            fb_count: self.fb_count,
            grab_mode: self.grab_mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Delay after device init before the first frame (milliseconds)
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    /// Longest wait for one frame (milliseconds)
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Frames between statistics log lines, 0 disables them
    #[serde(default = "default_stats_interval_frames")]
    pub stats_interval_frames: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup_ms(),
            frame_timeout_ms: default_frame_timeout_ms(),
            stats_interval_frames: default_stats_interval_frames(),
        }
    }
}

impl StreamConfig {
    pub fn settings(&self) -> StreamSettings {
        StreamSettings {
            warmup: Duration::from_millis(self.warmup_ms),
            frame_timeout: Duration::from_millis(self.frame_timeout_ms),
            stats_interval_frames: self.stats_interval_frames,
        }
    }
}

// Default value functions
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_page() -> PathBuf {
    PathBuf::from("web/index.html")
}
fn default_request_buffer() -> usize {
    1024
}
fn default_request_timeout_ms() -> u64 {
    2000
}
fn default_sensor() -> String {
    "OV2640".to_string()
}
fn default_frame_size() -> FrameSize {
    FrameSize::QVGA
}
fn default_pixel_format() -> PixelFormat {
    PixelFormat::Jpeg
}
fn default_jpeg_quality() -> u8 {
    12
}
fn default_fb_count() -> u8 {
    1
}
fn default_grab_mode() -> GrabMode {
    GrabMode::WhenEmpty
}
fn default_fps() -> u32 {
    25
}
fn default_warmup_ms() -> u64 {
    1000
}
fn default_frame_timeout_ms() -> u64 {
    5000
}
fn default_stats_interval_frames() -> u64 {
    100
}

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// Address the server listens on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if !(64..=8192).contains(&server.request_buffer) {
            return Err(ConfigError::Invalid(format!(
                "request_buffer must be between 64 and 8192, got {}",
                server.request_buffer
            )));
        }

        if server.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }

        let cam = &self.camera;
        if cam.jpeg_quality > 63 {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be between 0 and 63, got {}",
                cam.jpeg_quality
            )));
        }

        if !(1..=2).contains(&cam.fb_count) {
            return Err(ConfigError::Invalid(format!(
                "fb_count must be 1 or 2, got {}",
                cam.fb_count
            )));
        }

        if cam.fps == 0 || cam.fps > 120 {
            return Err(ConfigError::Invalid(format!(
                "fps must be between 1 and 120, got {}",
                cam.fps
            )));
        }

        if self.stream.frame_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "frame_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Saves configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.mode, ServerMode::Cooperative);
        assert_eq!(config.server.request_buffer, 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.camera.driver, DriverKind::Simulated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
[server]
port = 9000
mode = "sequential"
page = "www/cam.html"

[camera]
sensor = "OV5640"
frame_size = "VGA"
pixel_format = "RGB565"
jpeg_quality = 10
fb_count = 2
grab_mode = "LATEST"
init = true

[stream]
warmup_ms = 0
        "#;

        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.mode, ServerMode::Sequential);
        assert_eq!(config.server.page, PathBuf::from("www/cam.html"));
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");

        let pipeline = config.camera.pipeline();
        assert_eq!(pipeline.frame_size, FrameSize::VGA);
        assert_eq!(pipeline.pixel_format, PixelFormat::Rgb565);
        assert_eq!(pipeline.fb_count, 2);
        assert_eq!(pipeline.grab_mode, GrabMode::Latest);
        assert!(config.camera.init);

        let settings = config.stream.settings();
        assert!(settings.warmup.is_zero());
        assert_eq!(settings.frame_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_quality() {
        let result = Config::from_str("[camera]\njpeg_quality = 64\n");
        assert_matches!(result, Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_request_timeout() {
        let result = Config::from_str("[server]\nrequest_timeout_ms = 0\n");
        assert_matches!(result, Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_fb_count() {
        let result = Config::from_str("[camera]\nfb_count = 3\n");
        assert_matches!(result, Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_frame_size() {
        let result = Config::from_str("[camera]\nframe_size = \"8K\"\n");
        assert_matches!(result, Err(ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 8181;
        config.camera.frame_size = FrameSize::SVGA;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.port, 8181);
        assert_eq!(loaded.camera.frame_size, FrameSize::SVGA);
    }

    #[test]
    fn test_missing_file() {
        assert_matches!(Config::load("/nonexistent/config.toml"), Err(ConfigError::Io(_)));
    }
}
