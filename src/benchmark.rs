//! Capture and conversion throughput benchmarks
//!
//! Both run synchronously against an initialized [`Camera`] using
//! `capture_blocking`, so they belong on a blocking thread.

use crate::camera::{Camera, CameraError, FrameSize, PixelFormat, ReconfigureRequest};
use crate::convert;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BenchOptions {
    /// Measurement time per cell
    pub duration: Duration,
    /// Frames are discarded for this long after each reconfiguration
    pub warmup: Duration,
    /// Longest wait for a single frame before the cell reads "No image"
    pub frame_timeout: Duration,
    /// Frame sizes to measure; empty means every size up to the sensor maximum
    pub sizes: Vec<FrameSize>,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(3),
            warmup: Duration::from_millis(500),
            frame_timeout: Duration::from_secs(2),
            sizes: Vec::new(),
        }
    }
}

/// Result of one measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Fps(f64),
    /// The pipeline ran but produced no frame in time
    NoImage,
    /// The pipeline was rejected or capture failed
    Error,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Fps(fps) => write!(f, "{:.1}", fps),
            Cell::NoImage => f.write_str("No image"),
            Cell::Error => f.write_str("ERR"),
        }
    }
}

/// A labelled grid of measurements
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Cell>)>,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        write!(f, "{:<10}", "")?;
        for column in &self.columns {
            write!(f, "{:>10}", column)?;
        }
        writeln!(f)?;
        for (label, cells) in &self.rows {
            write!(f, "{:<10}", label)?;
            for cell in cells {
                write!(f, "{:>10}", cell.to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn measure(camera: &Camera, opts: &BenchOptions, to_bmp: bool) -> Cell {
    let warmup_end = Instant::now() + opts.warmup;
    while Instant::now() < warmup_end {
        match camera.capture_blocking(opts.frame_timeout) {
            Ok(Some(_)) => {}
            Ok(None) => return Cell::NoImage,
            Err(_) => return Cell::Error,
        }
    }

    let start = Instant::now();
    let mut frames = 0u64;
    while start.elapsed() < opts.duration {
        match camera.capture_blocking(opts.frame_timeout) {
            Ok(Some(frame)) => {
                if to_bmp && !frame.is_jpeg() {
                    if let Err(e) = convert::frame_to_bmp(&frame) {
                        warn!(error = %e, "Conversion failed");
                        return Cell::Error;
                    }
                }
                frames += 1;
            }
            Ok(None) if frames == 0 => return Cell::NoImage,
            Ok(None) => break,
            Err(_) => return Cell::Error,
        }
    }
    camera.release();

    Cell::Fps(frames as f64 / start.elapsed().as_secs_f64())
}

fn reconfigure_and_measure(
    camera: &Camera,
    request: ReconfigureRequest,
    opts: &BenchOptions,
    to_bmp: bool,
) -> Cell {
    match camera.reconfigure(&request) {
        Ok(()) => measure(camera, opts, to_bmp),
        Err(e) => {
            debug!(?request, error = %e, "Pipeline rejected");
            Cell::Error
        }
    }
}

/// Capture FPS for every pixel format and frame size
pub fn capture_benchmark(camera: &Camera, opts: &BenchOptions) -> Result<BenchReport, CameraError> {
    camera.init()?;
    let max = camera.max_frame_size();
    let sizes: Vec<FrameSize> = if opts.sizes.is_empty() {
        FrameSize::ALL.into_iter().filter(|s| *s <= max).collect()
    } else {
        opts.sizes.clone()
    };

    let mut rows = Vec::with_capacity(sizes.len());
    for size in sizes {
        let cells = PixelFormat::ALL
            .into_iter()
            .map(|format| {
                let request = ReconfigureRequest::new().frame_size(size).pixel_format(format);
                let cell = reconfigure_and_measure(camera, request, opts, false);
                info!(size = %size, format = %format, result = %cell, "Measured");
                cell
            })
            .collect();
        rows.push((size.to_string(), cells));
    }

    Ok(BenchReport {
        title: format!("Capture FPS, sensor {}", camera.sensor_name()),
        columns: PixelFormat::ALL.iter().map(|f| f.to_string()).collect(),
        rows,
    })
}

/// Capture plus BMP conversion FPS for each raw format and buffer count
pub fn convert_benchmark(camera: &Camera, opts: &BenchOptions) -> Result<BenchReport, CameraError> {
    camera.init()?;
    let formats: Vec<PixelFormat> = PixelFormat::ALL
        .into_iter()
        .filter(|f| *f != PixelFormat::Jpeg)
        .collect();
    let size = opts.sizes.first().copied().unwrap_or_else(|| camera.frame_size());

    let rows = [1u8, 2]
        .into_iter()
        .map(|fb_count| {
            let cells = formats
                .iter()
                .map(|&format| {
                    let request = ReconfigureRequest::new()
                        .frame_size(size)
                        .pixel_format(format)
                        .fb_count(fb_count);
                    let cell = reconfigure_and_measure(camera, request, opts, true);
                    info!(fb_count, format = %format, result = %cell, "Measured");
                    cell
                })
                .collect();
            (format!("fb_count={}", fb_count), cells)
        })
        .collect();

    Ok(BenchReport {
        title: format!("Capture + BMP conversion FPS at {}", size),
        columns: formats.iter().map(|f| f.to_string()).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{PipelineConfig, SimulatedSensor};

    fn quick() -> BenchOptions {
        BenchOptions {
            duration: Duration::from_millis(100),
            warmup: Duration::ZERO,
            frame_timeout: Duration::from_millis(500),
            sizes: vec![FrameSize::R96X96],
        }
    }

    #[test]
    fn test_capture_benchmark_marks_rejected_formats() {
        let sensor = SimulatedSensor::new("OV2640", 100).unwrap();
        let camera = Camera::new(Box::new(sensor), PipelineConfig::default());

        let report = capture_benchmark(&camera, &quick()).unwrap();
        assert_eq!(report.rows.len(), 1);
        let cells = &report.rows[0].1;
        let rgb888 = PixelFormat::ALL
            .iter()
            .position(|f| *f == PixelFormat::Rgb888)
            .unwrap();
        assert_eq!(cells[rgb888], Cell::Error);
        assert!(matches!(cells[0], Cell::Fps(fps) if fps > 0.0));
        camera.deinit().unwrap();
    }

    #[test]
    fn test_convert_benchmark_rows() {
        let sensor = SimulatedSensor::new("OV5640", 100).unwrap();
        let camera = Camera::new(Box::new(sensor), PipelineConfig::default());

        let report = convert_benchmark(&camera, &quick()).unwrap();
        assert_eq!(report.columns.len(), 4);
        assert_eq!(report.rows[0].0, "fb_count=1");
        assert_eq!(report.rows[1].0, "fb_count=2");
        for (_, cells) in &report.rows {
            assert!(cells.iter().all(|c| matches!(c, Cell::Fps(_))));
        }
        camera.deinit().unwrap();
    }

    #[test]
    fn test_report_table() {
        let report = BenchReport {
            title: "t".to_string(),
            columns: vec!["JPEG".to_string()],
            rows: vec![
                ("QVGA".to_string(), vec![Cell::Fps(12.34)]),
                ("UXGA".to_string(), vec![Cell::NoImage]),
            ],
        };
        let table = report.to_string();
        assert!(table.contains("      JPEG"));
        assert!(table.contains("QVGA            12.3"));
        assert!(table.contains("No image"));
    }
}
