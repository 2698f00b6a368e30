//! Host platform detection for the GStreamer driver

use std::env;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformInfo {
    /// macOS (avfvideosrc)
    MacOS,

    /// Raspberry Pi with libcamera
    RaspberryPi,

    /// Any other Linux host (v4l2src)
    Linux,
}

impl PlatformInfo {
    pub fn detect() -> Self {
        match env::consts::OS {
            "macos" => PlatformInfo::MacOS,
            "linux" if is_raspberry_pi() => PlatformInfo::RaspberryPi,
            _ => PlatformInfo::Linux,
        }
    }

    /// Source element for `device`, with caps left to the caller
    pub fn source_element(self, device: &str) -> String {
        match self {
            PlatformInfo::MacOS => format!("avfvideosrc device-index={}", device_index(device)),
            PlatformInfo::RaspberryPi if device.is_empty() => "libcamerasrc".to_string(),
            PlatformInfo::RaspberryPi => format!("libcamerasrc camera-name=\"{}\"", device),
            PlatformInfo::Linux if device.is_empty() => "v4l2src device=/dev/video0".to_string(),
            PlatformInfo::Linux => format!("v4l2src device={}", device),
        }
    }
}

fn is_raspberry_pi() -> bool {
    Path::new("/proc/device-tree/model").exists()
        || Path::new("/sys/firmware/devicetree/base/model").exists()
}

fn device_index(device: &str) -> u32 {
    device
        .trim_start_matches("/dev/video")
        .parse()
        .unwrap_or(0)
}
