//! Sensor enumerations and the captured frame type

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output resolution of the sensor pipeline.
///
/// Discriminants follow the native driver numbering, which is also the value
/// exchanged over the `/set_frame_size` and `/get_frame_size` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum FrameSize {
    R96X96 = 0,
    QQVGA,
    QCIF,
    HQVGA,
    R240X240,
    QVGA,
    CIF,
    HVGA,
    VGA,
    SVGA,
    XGA,
    HD,
    SXGA,
    UXGA,
    FHD,
    P_HD,
    P_3MP,
    QXGA,
    QHD,
    WQXGA,
    P_FHD,
    QSXGA,
}

impl FrameSize {
    pub const ALL: [FrameSize; 22] = [
        FrameSize::R96X96,
        FrameSize::QQVGA,
        FrameSize::QCIF,
        FrameSize::HQVGA,
        FrameSize::R240X240,
        FrameSize::QVGA,
        FrameSize::CIF,
        FrameSize::HVGA,
        FrameSize::VGA,
        FrameSize::SVGA,
        FrameSize::XGA,
        FrameSize::HD,
        FrameSize::SXGA,
        FrameSize::UXGA,
        FrameSize::FHD,
        FrameSize::P_HD,
        FrameSize::P_3MP,
        FrameSize::QXGA,
        FrameSize::QHD,
        FrameSize::WQXGA,
        FrameSize::P_FHD,
        FrameSize::QSXGA,
    ];

    /// Width and height in pixels
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            FrameSize::R96X96 => (96, 96),
            FrameSize::QQVGA => (160, 120),
            FrameSize::QCIF => (176, 144),
            FrameSize::HQVGA => (240, 176),
            FrameSize::R240X240 => (240, 240),
            FrameSize::QVGA => (320, 240),
            FrameSize::CIF => (400, 296),
            FrameSize::HVGA => (480, 320),
            FrameSize::VGA => (640, 480),
            FrameSize::SVGA => (800, 600),
            FrameSize::XGA => (1024, 768),
            FrameSize::HD => (1280, 720),
            FrameSize::SXGA => (1280, 1024),
            FrameSize::UXGA => (1600, 1200),
            FrameSize::FHD => (1920, 1080),
            FrameSize::P_HD => (720, 1280),
            FrameSize::P_3MP => (864, 1536),
            FrameSize::QXGA => (2048, 1536),
            FrameSize::QHD => (2560, 1440),
            FrameSize::WQXGA => (2560, 1600),
            FrameSize::P_FHD => (1080, 1920),
            FrameSize::QSXGA => (2560, 1920),
        }
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Pixel encoding produced by the sensor pipeline (driver numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    Rgb565 = 0,
    Yuv422 = 1,
    Grayscale = 3,
    Jpeg = 4,
    Rgb888 = 5,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::Rgb565,
        PixelFormat::Yuv422,
        PixelFormat::Grayscale,
        PixelFormat::Jpeg,
        PixelFormat::Rgb888,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.index() == index)
    }

    /// Bytes per pixel for raw formats, `None` for compressed output
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Rgb565 | PixelFormat::Yuv422 => Some(2),
            PixelFormat::Grayscale => Some(1),
            PixelFormat::Rgb888 => Some(3),
            PixelFormat::Jpeg => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Yuv422 => "YUV422",
            PixelFormat::Grayscale => "GRAYSCALE",
            PixelFormat::Jpeg => "JPEG",
            PixelFormat::Rgb888 => "RGB888",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// When the driver refills frame buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrabMode {
    /// Fill a buffer only when one is free
    WhenEmpty = 0,
    /// Keep overwriting with the most recent frame
    Latest = 1,
}

impl GrabMode {
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(GrabMode::WhenEmpty),
            1 => Some(GrabMode::Latest),
            _ => None,
        }
    }
}

/// Analog gain ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainCeiling {
    X2 = 0,
    X4,
    X8,
    X16,
    X32,
    X64,
    X128,
}

impl GainCeiling {
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(GainCeiling::X2),
            1 => Some(GainCeiling::X4),
            2 => Some(GainCeiling::X8),
            3 => Some(GainCeiling::X16),
            4 => Some(GainCeiling::X32),
            5 => Some(GainCeiling::X64),
            6 => Some(GainCeiling::X128),
            _ => None,
        }
    }
}

/// A captured frame.
///
/// The bytes are only meaningful until the buffer is released back to the
/// driver; callers consume the frame before asking for the next one.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_jpeg(&self) -> bool {
        self.format == PixelFormat::Jpeg
    }
}
