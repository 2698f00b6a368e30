//! GStreamer-backed camera driver
//!
//! Runs a `source ! videoflip ! videobalance ! videoscale ! <encoder> !
//! appsink` pipeline. The appsink queue plays the role of the driver frame
//! buffers: its depth is `fb_count`, and `GrabMode::Latest` makes it drop
//! the oldest sample instead of stalling the source.

use super::controls::{Control, SensorSettings};
use super::driver::{DriverError, PipelineConfig, RawFrame, SensorDriver, SensorInfo};
use super::platform::PlatformInfo;
use super::types::{FrameSize, GrabMode, PixelFormat};
use crate::convert::encoder_quality;
use bytes::Bytes;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::time::Duration;
use tracing::{debug, info};

struct Running {
    pipeline: gst::Pipeline,
    sink: gst_app::AppSink,
    flip: gst::Element,
    balance: gst::Element,
    encoder: Option<gst::Element>,
    config: PipelineConfig,
}

pub struct GstSensor {
    device: String,
    fps: u32,
    platform: PlatformInfo,
    settings: SensorSettings,
    running: Option<Running>,
    pending: Option<RawFrame>,
}

impl GstSensor {
    pub fn new(device: &str, fps: u32) -> Result<Self, DriverError> {
        gst::init().map_err(|e| DriverError::Other(e.to_string()))?;
        Ok(Self {
            device: device.to_string(),
            fps: fps.max(1),
            platform: PlatformInfo::detect(),
            settings: SensorSettings::default(),
            running: None,
            pending: None,
        })
    }

    fn pipeline_string(&self, config: &PipelineConfig) -> String {
        let (width, height) = config.frame_size.dimensions();
        let tail = match config.pixel_format {
            PixelFormat::Jpeg => format!(
                "video/x-raw,width={},height={} ! jpegenc name=enc quality={}",
                width,
                height,
                encoder_quality(i32::from(config.jpeg_quality))
            ),
            raw => format!(
                "video/x-raw,format={},width={},height={}",
                raw_caps_format(raw),
                width,
                height
            ),
        };

        format!(
            "{} ! video/x-raw,framerate={}/1 ! videoconvert ! videoflip name=flip ! \
             videobalance name=balance ! videoscale ! videoconvert ! {} ! appsink name=sink",
            self.platform.source_element(&self.device),
            self.fps,
            tail
        )
    }

    fn apply_control(running: &Running, settings: &SensorSettings, control: Control) {
        match control {
            Control::Hmirror | Control::Vflip => {
                let direction = match (
                    settings.flag(Control::Hmirror),
                    settings.flag(Control::Vflip),
                ) {
                    (false, false) => "identity",
                    (true, false) => "horiz",
                    (false, true) => "vert",
                    (true, true) => "180",
                };
                running.flip.set_property_from_str("video-direction", direction);
            }
            Control::Brightness => {
                let value = f64::from(settings.get(control)) * 0.25;
                running.balance.set_property("brightness", value);
            }
            Control::Contrast => {
                let value = 1.0 + f64::from(settings.get(control)) * 0.25;
                running.balance.set_property("contrast", value);
            }
            Control::Saturation => {
                let value = 1.0 + f64::from(settings.get(control)) * 0.5;
                running.balance.set_property("saturation", value);
            }
            Control::Quality => {
                if let Some(encoder) = &running.encoder {
                    let quality = i32::from(encoder_quality(settings.get(control)));
                    encoder.set_property("quality", quality);
                }
            }
            _ => {}
        }
    }

    fn pull(&mut self, timeout: gst::ClockTime) -> Option<RawFrame> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }
        let running = self.running.as_ref()?;
        let sample = running.sink.try_pull_sample(timeout)?;
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;

        let config = running.config;
        let mut data = map.as_slice().to_vec();
        if config.pixel_format == PixelFormat::Rgb565 {
            // GStreamer RGB16 is native endian, the driver contract is big endian
            for px in data.chunks_exact_mut(2) {
                let v = u16::from_ne_bytes([px[0], px[1]]);
                px.copy_from_slice(&v.to_be_bytes());
            }
        }

        Some(RawFrame {
            data: Bytes::from(data),
            format: config.pixel_format,
            width: config.frame_size.width(),
            height: config.frame_size.height(),
        })
    }
}

fn raw_caps_format(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Rgb565 => "RGB16",
        PixelFormat::Yuv422 => "YUY2",
        PixelFormat::Grayscale => "GRAY8",
        PixelFormat::Rgb888 | PixelFormat::Jpeg => "RGB",
    }
}

fn state_error(e: gst::StateChangeError) -> DriverError {
    DriverError::InvalidState(format!("{:?}", e))
}

impl SensorDriver for GstSensor {
    fn init(&mut self, config: &PipelineConfig) -> Result<(), DriverError> {
        if self.running.is_some() {
            return Err(DriverError::InvalidState("already initialized".to_string()));
        }

        let description = self.pipeline_string(config);
        debug!(pipeline = %description, "Creating GStreamer pipeline");

        let pipeline = gst::parse::launch(&description)
            .map_err(|e| DriverError::InvalidArg(e.to_string()))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| DriverError::Other("not a pipeline".to_string()))?;

        let element = |name: &str| {
            pipeline
                .by_name(name)
                .ok_or_else(|| DriverError::Other(format!("no element named {}", name)))
        };
        let sink = element("sink")?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| DriverError::Other("not an appsink".to_string()))?;
        let flip = element("flip")?;
        let balance = element("balance")?;
        let encoder = pipeline.by_name("enc");

        sink.set_property("max-buffers", u32::from(config.fb_count));
        sink.set_property("drop", config.grab_mode == GrabMode::Latest);
        sink.set_property("emit-signals", false);

        let running = Running {
            pipeline,
            sink,
            flip,
            balance,
            encoder,
            config: *config,
        };
        self.settings.set(Control::Quality, i32::from(config.jpeg_quality));
        for control in Control::ALL {
            Self::apply_control(&running, &self.settings, control);
        }

        if let Err(e) = running.pipeline.set_state(gst::State::Playing) {
            running.pipeline.set_state(gst::State::Null).ok();
            return Err(state_error(e));
        }

        info!(
            platform = ?self.platform,
            frame_size = %config.frame_size,
            pixel_format = %config.pixel_format,
            "GStreamer camera started"
        );
        self.running = Some(running);
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), DriverError> {
        self.pending = None;
        if let Some(running) = self.running.take() {
            running
                .pipeline
                .set_state(gst::State::Null)
                .map_err(state_error)?;
            info!("GStreamer camera stopped");
        }
        Ok(())
    }

    fn info(&self) -> SensorInfo {
        SensorInfo {
            name: format!("{:?}", self.platform),
            max_frame_size: FrameSize::QSXGA,
            supports_jpeg: true,
            sccb_address: 0,
            pixel_formats: PixelFormat::ALL.to_vec(),
        }
    }

    fn frame_ready(&mut self) -> bool {
        if self.pending.is_none() {
            self.pending = self.pull(gst::ClockTime::ZERO);
        }
        self.pending.is_some()
    }

    fn fb_get(&mut self) -> Option<RawFrame> {
        self.pull(gst::ClockTime::ZERO)
    }

    fn fb_wait(&mut self, timeout: Duration) -> Option<RawFrame> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.pull(gst::ClockTime::from_mseconds(millis))
    }

    fn fb_return(&mut self) {}

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError> {
        match &self.running {
            Some(running) if running.config.frame_size != size => Err(DriverError::NotSupported(
                "frame size change needs a pipeline restart".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn set_control(&mut self, control: Control, value: i32) -> Result<(), DriverError> {
        if !control.accepts(value) {
            return Err(DriverError::InvalidArg(format!("{} = {}", control, value)));
        }
        self.settings.set(control, value);
        if let Some(running) = &self.running {
            Self::apply_control(running, &self.settings, control);
        }
        Ok(())
    }
}

impl Drop for GstSensor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.pipeline.set_state(gst::State::Null);
        }
    }
}
