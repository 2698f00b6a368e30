//! Interface of the native camera driver

use super::controls::Control;
use super::types::{FrameSize, GrabMode, PixelFormat};
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Status codes reported by the native driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("camera not found")]
    NotFound,

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("timed out")]
    Timeout,

    #[error("out of memory")]
    NoMem,

    #[error("driver error: {0}")]
    Other(String),
}

/// Pipeline-level settings; changing any of them reinitializes the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub frame_size: FrameSize,
    pub pixel_format: PixelFormat,
    /// 0-63, lower means better quality
    pub jpeg_quality: u8,
    pub fb_count: u8,
    pub grab_mode: GrabMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::QVGA,
            pixel_format: PixelFormat::Jpeg,
            jpeg_quality: 12,
            fb_count: 1,
            grab_mode: GrabMode::WhenEmpty,
        }
    }
}

/// Static description of the attached sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInfo {
    pub name: String,
    pub max_frame_size: FrameSize,
    pub supports_jpeg: bool,
    pub sccb_address: u8,
    pub pixel_formats: Vec<PixelFormat>,
}

impl SensorInfo {
    pub fn supports(&self, format: PixelFormat) -> bool {
        self.pixel_formats.contains(&format)
    }
}

/// A filled driver buffer as handed out by [`SensorDriver::fb_get`]
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

/// Synchronous capture/configure interface of a camera driver.
///
/// Buffers are filled by a producer owned by the driver. A buffer handed
/// out by `fb_get` stays claimed until `fb_return`; with `fb_count == 1`
/// nothing new is produced while it is claimed.
pub trait SensorDriver: Send {
    /// Brings up the sensor with the given pipeline
    fn init(&mut self, config: &PipelineConfig) -> Result<(), DriverError>;

    /// Tears the pipeline down and returns every buffer
    fn deinit(&mut self) -> Result<(), DriverError>;

    fn info(&self) -> SensorInfo;

    /// True when `fb_get` would return a frame without waiting
    fn frame_ready(&mut self) -> bool;

    /// Takes the oldest filled buffer, if any
    fn fb_get(&mut self) -> Option<RawFrame>;

    /// Waits up to `timeout` for a filled buffer
    fn fb_wait(&mut self, timeout: Duration) -> Option<RawFrame>;

    /// Gives the claimed buffer back to the producer
    fn fb_return(&mut self);

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError>;

    fn set_control(&mut self, control: Control, value: i32) -> Result<(), DriverError>;
}
