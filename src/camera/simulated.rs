//! Test-pattern sensor with a background frame producer
//!
//! Behaves like the native driver as far as the adapter can tell: frames
//! are produced by an independent thread into `fb_count` buffer slots, a
//! slot handed out by `fb_get` is not refilled until `fb_return`, and a
//! pipeline the sensor cannot produce is rejected at `init`.

use super::controls::{Control, SensorSettings};
use super::driver::{DriverError, PipelineConfig, RawFrame, SensorDriver, SensorInfo};
use super::types::{FrameSize, GrabMode, PixelFormat};
use crate::convert;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sensors the simulator can impersonate
pub fn sensor_info(model: &str) -> Option<SensorInfo> {
    let raw_and_jpeg = vec![
        PixelFormat::Rgb565,
        PixelFormat::Yuv422,
        PixelFormat::Grayscale,
        PixelFormat::Jpeg,
    ];
    match model.to_ascii_uppercase().as_str() {
        "OV2640" => Some(SensorInfo {
            name: "OV2640".to_string(),
            max_frame_size: FrameSize::UXGA,
            supports_jpeg: true,
            sccb_address: 0x30,
            pixel_formats: raw_and_jpeg,
        }),
        "OV3660" => Some(SensorInfo {
            name: "OV3660".to_string(),
            max_frame_size: FrameSize::QXGA,
            supports_jpeg: true,
            sccb_address: 0x3C,
            pixel_formats: PixelFormat::ALL.to_vec(),
        }),
        "OV5640" => Some(SensorInfo {
            name: "OV5640".to_string(),
            max_frame_size: FrameSize::QSXGA,
            supports_jpeg: true,
            sccb_address: 0x3C,
            pixel_formats: PixelFormat::ALL.to_vec(),
        }),
        _ => None,
    }
}

/// Buffer traffic counters, shared with whoever holds a clone
#[derive(Debug, Default)]
pub struct SensorCounters {
    pub frames_produced: AtomicU64,
    pub fb_gets: AtomicU64,
    pub fb_returns: AtomicU64,
    /// `fb_get` calls made while another buffer was still claimed
    pub overlapping_claims: AtomicU64,
}

struct Slots {
    ready: VecDeque<RawFrame>,
    claimed: bool,
    config: PipelineConfig,
    settings: SensorSettings,
    sequence: u64,
}

impl Slots {
    fn has_room(&self) -> bool {
        self.ready.len() + usize::from(self.claimed) < usize::from(self.config.fb_count)
    }
}

struct Shared {
    slots: Mutex<Slots>,
    filled: Condvar,
    running: AtomicBool,
    counters: Arc<SensorCounters>,
}

pub struct SimulatedSensor {
    info: SensorInfo,
    interval: Duration,
    shared: Arc<Shared>,
    producer: Option<JoinHandle<()>>,
}

impl SimulatedSensor {
    /// Creates a sensor impersonating `model` that produces `fps` frames/s
    pub fn new(model: &str, fps: u32) -> Result<Self, DriverError> {
        let info = sensor_info(model).ok_or(DriverError::NotFound)?;
        let fps = fps.max(1);

        Ok(Self {
            info,
            interval: Duration::from_secs(1) / fps,
            shared: Arc::new(Shared {
                slots: Mutex::new(Slots {
                    ready: VecDeque::new(),
                    claimed: false,
                    config: PipelineConfig::default(),
                    settings: SensorSettings::default(),
                    sequence: 0,
                }),
                filled: Condvar::new(),
                running: AtomicBool::new(false),
                counters: Arc::new(SensorCounters::default()),
            }),
            producer: None,
        })
    }

    pub fn counters(&self) -> Arc<SensorCounters> {
        Arc::clone(&self.shared.counters)
    }

    fn stop_producer(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.filled.notify_all();
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                warn!("Frame producer thread panicked");
            }
        }
    }
}

impl SensorDriver for SimulatedSensor {
    fn init(&mut self, config: &PipelineConfig) -> Result<(), DriverError> {
        if self.producer.is_some() {
            return Err(DriverError::InvalidState("already initialized".to_string()));
        }
        if !self.info.supports(config.pixel_format) {
            return Err(DriverError::NotSupported(format!(
                "{} cannot produce {}",
                self.info.name, config.pixel_format
            )));
        }
        if config.frame_size > self.info.max_frame_size {
            return Err(DriverError::InvalidArg(format!(
                "frame size {} exceeds sensor maximum {}",
                config.frame_size, self.info.max_frame_size
            )));
        }
        if !(1..=2).contains(&config.fb_count) {
            return Err(DriverError::InvalidArg(format!(
                "fb_count {} not in 1..=2",
                config.fb_count
            )));
        }

        {
            let mut slots = self.shared.slots.lock();
            slots.ready.clear();
            slots.claimed = false;
            slots.config = *config;
            slots.settings.set(Control::Quality, i32::from(config.jpeg_quality));
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("sensor-producer".to_string())
            .spawn(move || produce(shared, interval))
            .map_err(|e| DriverError::Other(e.to_string()))?;
        self.producer = Some(handle);

        info!(
            sensor = %self.info.name,
            frame_size = %config.frame_size,
            pixel_format = %config.pixel_format,
            fb_count = config.fb_count,
            "Simulated sensor started"
        );
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), DriverError> {
        self.stop_producer();
        let mut slots = self.shared.slots.lock();
        slots.ready.clear();
        slots.claimed = false;
        Ok(())
    }

    fn info(&self) -> SensorInfo {
        self.info.clone()
    }

    fn frame_ready(&mut self) -> bool {
        self.shared.running.load(Ordering::Acquire) && !self.shared.slots.lock().ready.is_empty()
    }

    fn fb_get(&mut self) -> Option<RawFrame> {
        let mut slots = self.shared.slots.lock();
        let frame = slots.ready.pop_front()?;
        self.take_claim(&mut slots);
        Some(frame)
    }

    fn fb_wait(&mut self, timeout: Duration) -> Option<RawFrame> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.shared.slots.lock();
        while slots.ready.is_empty() {
            if !self.shared.running.load(Ordering::Acquire) {
                return None;
            }
            if self.shared.filled.wait_until(&mut slots, deadline).timed_out() {
                break;
            }
        }
        let frame = slots.ready.pop_front()?;
        self.take_claim(&mut slots);
        Some(frame)
    }

    fn fb_return(&mut self) {
        let mut slots = self.shared.slots.lock();
        if slots.claimed {
            slots.claimed = false;
            self.shared.counters.fb_returns.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError> {
        if size > self.info.max_frame_size {
            return Err(DriverError::InvalidArg(format!("frame size {}", size)));
        }
        self.shared.slots.lock().config.frame_size = size;
        Ok(())
    }

    fn set_control(&mut self, control: Control, value: i32) -> Result<(), DriverError> {
        if !control.accepts(value) {
            return Err(DriverError::InvalidArg(format!("{} = {}", control, value)));
        }
        self.shared.slots.lock().settings.set(control, value);
        Ok(())
    }
}

impl SimulatedSensor {
    fn take_claim(&self, slots: &mut Slots) {
        let counters = &self.shared.counters;
        if slots.claimed {
            counters.overlapping_claims.fetch_add(1, Ordering::Relaxed);
        }
        slots.claimed = true;
        counters.fb_gets.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        self.stop_producer();
    }
}

fn produce(shared: Arc<Shared>, interval: Duration) {
    debug!("Frame producer running");

    while shared.running.load(Ordering::Acquire) {
        thread::sleep(interval);

        let (config, settings, sequence) = {
            let mut slots = shared.slots.lock();
            let can_overwrite =
                slots.config.grab_mode == GrabMode::Latest && !slots.ready.is_empty();
            if !slots.has_room() && !can_overwrite {
                continue;
            }
            slots.sequence += 1;
            (slots.config, slots.settings.clone(), slots.sequence)
        };

        let (width, height) = config.frame_size.dimensions();
        let rgb = render_pattern(width, height, &settings, sequence);
        let data = match convert::encode_rgb888(
            &rgb,
            width,
            height,
            config.pixel_format,
            settings.get(Control::Quality),
        ) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to encode test frame");
                continue;
            }
        };

        let frame = RawFrame {
            data,
            format: config.pixel_format,
            width,
            height,
        };

        let mut slots = shared.slots.lock();
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
        // The pipeline may have been changed while this frame was rendered
        if slots.config.pixel_format != config.pixel_format {
            continue;
        }
        if !slots.has_room() {
            let overwrite = slots.config.grab_mode == GrabMode::Latest && !slots.ready.is_empty();
            if !overwrite {
                continue;
            }
            slots.ready.pop_front();
        }
        slots.ready.push_back(frame);
        shared.counters.frames_produced.fetch_add(1, Ordering::Relaxed);
        shared.filled.notify_all();
    }

    debug!("Frame producer stopped");
}

/// Renders an RGB888 test pattern honoring the image-affecting tunables
fn render_pattern(width: u32, height: u32, settings: &SensorSettings, sequence: u64) -> Vec<u8> {
    const BARS: [[u8; 3]; 8] = [
        [255, 255, 255],
        [255, 255, 0],
        [0, 255, 255],
        [0, 255, 0],
        [255, 0, 255],
        [255, 0, 0],
        [0, 0, 255],
        [0, 0, 0],
    ];

    let (w, h) = (width as usize, height as usize);
    let offset = settings.get(Control::Brightness) * 24;
    let hmirror = settings.flag(Control::Hmirror);
    let vflip = settings.flag(Control::Vflip);
    let colorbar = settings.flag(Control::Colorbar);
    let band = (sequence as usize * 4) % w.max(1);

    let mut rgb = vec![0u8; w * h * 3];
    for y in 0..h {
        let sy = if vflip { h - 1 - y } else { y };
        for x in 0..w {
            let sx = if hmirror { w - 1 - x } else { x };
            let pixel = if colorbar {
                BARS[sx * BARS.len() / w]
            } else if sx.abs_diff(band) < 4 {
                [255, 255, 255]
            } else {
                [
                    (sx * 255 / w.max(1)) as u8,
                    (sy * 255 / h.max(1)) as u8,
                    ((sequence as usize * 3) % 256) as u8,
                ]
            };
            let i = (y * w + x) * 3;
            for c in 0..3 {
                rgb[i + c] = (i32::from(pixel[c]) + offset).clamp(0, 255) as u8;
            }
        }
    }
    rgb
}
