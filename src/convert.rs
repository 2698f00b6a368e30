//! Frame format conversion
//!
//! Raw sensor output (RGB565 big-endian, RGB888, GRAYSCALE, YUV422 in YUYV
//! order) and JPEG can be turned into RGB888, BMP or JPEG. The streaming
//! path uses [`frame_to_bmp`] for every frame that is not already JPEG.

use crate::camera::{Frame, PixelFormat};
use bytes::Bytes;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("buffer of {actual} bytes does not hold a {width}x{height} {format} frame ({expected} bytes)")]
    SizeMismatch {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported conversion: {0}")]
    Unsupported(String),

    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Maps the driver's 0-63 quality scale (lower is better) onto 1-100
pub fn encoder_quality(driver_quality: i32) -> u8 {
    let q = driver_quality.clamp(0, 63);
    (100 - q * 90 / 63) as u8
}

fn check_size(data: &[u8], format: PixelFormat, width: u32, height: u32) -> Result<(), ConvertError> {
    if let Some(bpp) = format.bytes_per_pixel() {
        let expected = width as usize * height as usize * bpp;
        if data.len() != expected {
            return Err(ConvertError::SizeMismatch {
                format,
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
    }
    Ok(())
}

/// Decodes any supported frame into packed RGB888
pub fn to_rgb888(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ConvertError> {
    check_size(data, format, width, height)?;

    let rgb = match format {
        PixelFormat::Rgb888 => data.to_vec(),
        PixelFormat::Rgb565 => data
            .chunks_exact(2)
            .flat_map(|px| {
                let v = u16::from_be_bytes([px[0], px[1]]);
                let r = ((v >> 11) & 0x1F) as u8;
                let g = ((v >> 5) & 0x3F) as u8;
                let b = (v & 0x1F) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
            })
            .collect(),
        PixelFormat::Grayscale => data.iter().flat_map(|&l| [l, l, l]).collect(),
        PixelFormat::Yuv422 => data
            .chunks_exact(4)
            .flat_map(|px| {
                let a = yuv_to_rgb(px[0], px[1], px[3]);
                let b = yuv_to_rgb(px[2], px[1], px[3]);
                [a[0], a[1], a[2], b[0], b[1], b[2]]
            })
            .collect(),
        PixelFormat::Jpeg => {
            let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
            decoded.to_rgb8().into_raw()
        }
    };
    Ok(rgb)
}

/// Encodes packed RGB888 into the given sensor output format
pub fn encode_rgb888(
    rgb: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    driver_quality: i32,
) -> Result<Bytes, ConvertError> {
    check_size(rgb, PixelFormat::Rgb888, width, height)?;

    let out = match format {
        PixelFormat::Rgb888 => rgb.to_vec(),
        PixelFormat::Rgb565 => rgb
            .chunks_exact(3)
            .flat_map(|px| {
                let v = (u16::from(px[0] >> 3) << 11) | (u16::from(px[1] >> 2) << 5) | u16::from(px[2] >> 3);
                v.to_be_bytes()
            })
            .collect(),
        PixelFormat::Grayscale => rgb.chunks_exact(3).map(|px| luma(px[0], px[1], px[2])).collect(),
        PixelFormat::Yuv422 => {
            if width % 2 != 0 {
                return Err(ConvertError::Unsupported(format!(
                    "YUV422 needs an even width, got {}",
                    width
                )));
            }
            rgb.chunks_exact(6)
                .flat_map(|px| {
                    let (y0, u0, v0) = rgb_to_yuv(px[0], px[1], px[2]);
                    let (y1, u1, v1) = rgb_to_yuv(px[3], px[4], px[5]);
                    let u = ((u16::from(u0) + u16::from(u1)) / 2) as u8;
                    let v = ((u16::from(v0) + u16::from(v1)) / 2) as u8;
                    [y0, u, y1, v]
                })
                .collect()
        }
        PixelFormat::Jpeg => {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, encoder_quality(driver_quality)).write_image(
                rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
            out
        }
    };
    Ok(Bytes::from(out))
}

/// Converts a captured frame into a BMP image
pub fn frame_to_bmp(frame: &Frame) -> Result<Bytes, ConvertError> {
    let rgb = to_rgb888(&frame.data, frame.format, frame.width, frame.height)?;
    let mut out = Vec::with_capacity(rgb.len() + 54);
    BmpEncoder::new(&mut out).write_image(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)?;
    Ok(Bytes::from(out))
}

/// Converts a captured frame into JPEG; JPEG frames are passed through
pub fn frame_to_jpeg(frame: &Frame, driver_quality: i32) -> Result<Bytes, ConvertError> {
    if frame.is_jpeg() {
        return Ok(frame.data.clone());
    }
    let rgb = to_rgb888(&frame.data, frame.format, frame.width, frame.height)?;
    encode_rgb888(&rgb, frame.width, frame.height, PixelFormat::Jpeg, driver_quality)
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8) as u8
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let y = (77 * r + 150 * g + 29 * b) >> 8;
    let u = ((-43 * r - 85 * g + 128 * b) >> 8) + 128;
    let v = ((128 * r - 107 * g - 21 * b) >> 8) + 128;
    (y.clamp(0, 255) as u8, u.clamp(0, 255) as u8, v.clamp(0, 255) as u8)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = i32::from(y);
    let u = i32::from(u) - 128;
    let v = i32::from(v) - 128;
    let r = y + ((359 * v) >> 8);
    let g = y - ((88 * u + 183 * v) >> 8);
    let b = y + ((454 * u) >> 8);
    [r.clamp(0, 255) as u8, g.clamp(0, 255) as u8, b.clamp(0, 255) as u8]
}
