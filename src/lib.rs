//! MJPEG/BMP camera streaming over HTTP
//!
//! A small HTTP/1.1 server in front of a single-buffered camera:
//! - `GET /stream` sends a `multipart/x-mixed-replace` stream of JPEG or BMP frames
//! - `GET /set_<field>?value=<v>` and `GET /get_<field>` change and read sensor settings
//! - anything else returns the static page
//!
//! # Example
//!
//! ```no_run
//! use mjpeg_camera_streamer::camera::{Camera, PipelineConfig, SimulatedSensor};
//!
//! let sensor = SimulatedSensor::new("OV2640", 25)?;
//! let camera = Camera::new(Box::new(sensor), PipelineConfig::default());
//! camera.init()?;
//! camera.set_brightness(1)?;
//! let frame = camera.capture_blocking(std::time::Duration::from_secs(1))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod benchmark;
pub mod bridge;
pub mod camera;
pub mod config;
pub mod convert;
pub mod server;

// Re-exports for convenience
pub use bridge::{BridgeState, FrameBridge};
pub use camera::{Camera, CameraError, Frame, FrameSize, PixelFormat, ReconfigureRequest};
pub use config::{Config, ServerMode};
pub use server::{Server, SessionContext, StreamSettings};
