//! Camera device adapter
//!
//! [`Camera`] owns the native driver and its single frame-buffer claim. All
//! methods take `&self`; the driver sits behind a mutex that is never held
//! across an `.await`, so one `Arc<Camera>` can be shared by every session.

pub mod controls;
pub mod driver;
#[cfg(feature = "gstreamer")]
pub mod gst;
#[cfg(feature = "gstreamer")]
mod platform;
pub mod simulated;
mod types;

pub use controls::{Control, SensorSettings};
pub use driver::{DriverError, PipelineConfig, RawFrame, SensorDriver, SensorInfo};
#[cfg(feature = "gstreamer")]
pub use platform::PlatformInfo;
pub use simulated::SimulatedSensor;
pub use types::{Frame, FrameSize, GainCeiling, GrabMode, PixelFormat};

use crate::config::{CameraConfig, DriverKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Largest frame-buffer count the driver can run with
pub const MAX_FB_COUNT: u8 = 2;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera not initialized")]
    NotInitialized,

    #[error("camera busy: another stream holds the device")]
    Busy,

    #[error("invalid value {value} for {field}")]
    InvalidValue { field: String, value: i32 },

    #[error("reconfiguration of {field} failed: {reason}")]
    Reconfiguration {
        field: String,
        reason: ReconfigureReason,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Why a reconfiguration request was refused
#[derive(Error, Debug)]
pub enum ReconfigureReason {
    #[error("not a pipeline field")]
    UnknownField,

    #[error("invalid value {0}")]
    InvalidValue(i32),

    #[error("device rejected the pipeline: {0}")]
    Rejected(DriverError),
}

/// Pipeline fields to change in one atomic reconfiguration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconfigureRequest {
    pub frame_size: Option<FrameSize>,
    pub pixel_format: Option<PixelFormat>,
    pub grab_mode: Option<GrabMode>,
    pub fb_count: Option<u8>,
}

impl ReconfigureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_size(mut self, size: FrameSize) -> Self {
        self.frame_size = Some(size);
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = Some(format);
        self
    }

    pub fn grab_mode(mut self, mode: GrabMode) -> Self {
        self.grab_mode = Some(mode);
        self
    }

    pub fn fb_count(mut self, count: u8) -> Self {
        self.fb_count = Some(count);
        self
    }

    /// Builds a request from wire-level `name = value` pairs
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, CameraError>
    where
        I: IntoIterator<Item = (&'a str, i32)>,
    {
        fields
            .into_iter()
            .try_fold(Self::new(), |request, (name, value)| request.with_field(name, value))
    }

    pub fn with_field(self, name: &str, value: i32) -> Result<Self, CameraError> {
        let invalid = || CameraError::Reconfiguration {
            field: name.to_string(),
            reason: ReconfigureReason::InvalidValue(value),
        };

        match name {
            "frame_size" | "framesize" => {
                Ok(self.frame_size(FrameSize::from_index(value).ok_or_else(invalid)?))
            }
            "pixel_format" => Ok(self.pixel_format(PixelFormat::from_index(value).ok_or_else(invalid)?)),
            "grab_mode" => Ok(self.grab_mode(GrabMode::from_index(value).ok_or_else(invalid)?)),
            "fb_count" => {
                let count = u8::try_from(value).ok().filter(|c| *c >= 1).ok_or_else(invalid)?;
                Ok(self.fb_count(count))
            }
            _ => Err(CameraError::Reconfiguration {
                field: name.to_string(),
                reason: ReconfigureReason::UnknownField,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Name of the first field the request touches
    fn primary_field(&self) -> &'static str {
        if self.frame_size.is_some() {
            "frame_size"
        } else if self.pixel_format.is_some() {
            "pixel_format"
        } else if self.grab_mode.is_some() {
            "grab_mode"
        } else {
            "fb_count"
        }
    }
}

struct Inner {
    driver: Box<dyn SensorDriver>,
    info: SensorInfo,
    pipeline: PipelineConfig,
    settings: SensorSettings,
    initialized: bool,
    claimed: bool,
}

impl Inner {
    fn release(&mut self) {
        if self.claimed {
            self.driver.fb_return();
            self.claimed = false;
        }
    }

    fn apply_settings(&mut self) {
        if let Err(e) = self.driver.set_frame_size(self.pipeline.frame_size) {
            warn!(frame_size = %self.pipeline.frame_size, error = %e, "Sensor refused stored frame size");
        }
        for (control, value) in self.settings.iter() {
            if let Err(e) = self.driver.set_control(control, value) {
                warn!(field = %control, value, error = %e, "Sensor refused stored setting");
            }
        }
    }

    fn claim(&mut self, raw: Option<RawFrame>) -> Option<Frame> {
        let raw = raw?;
        self.claimed = true;
        Some(Frame {
            data: raw.data,
            format: raw.format,
            width: raw.width,
            height: raw.height,
        })
    }
}

/// Device adapter around a [`SensorDriver`]
pub struct Camera {
    inner: Mutex<Inner>,
    streaming: AtomicBool,
}

impl Camera {
    /// Wraps a driver; the device stays uninitialized until [`Camera::init`]
    pub fn new(driver: Box<dyn SensorDriver>, mut pipeline: PipelineConfig) -> Self {
        let info = driver.info();
        if pipeline.frame_size > info.max_frame_size {
            warn!(
                requested = %pipeline.frame_size,
                max = %info.max_frame_size,
                "Frame size scaled down to the sensor maximum"
            );
            pipeline.frame_size = info.max_frame_size;
        }
        pipeline.fb_count = pipeline.fb_count.clamp(1, MAX_FB_COUNT);

        let mut settings = SensorSettings::default();
        settings.set(Control::Quality, i32::from(pipeline.jpeg_quality));

        Self {
            inner: Mutex::new(Inner {
                driver,
                info,
                pipeline,
                settings,
                initialized: false,
                claimed: false,
            }),
            streaming: AtomicBool::new(false),
        }
    }

    /// Opens the driver selected by `config`; the device is not initialized
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let driver: Box<dyn SensorDriver> = match config.driver {
            DriverKind::Simulated => Box::new(SimulatedSensor::new(&config.sensor, config.fps)?),
            #[cfg(feature = "gstreamer")]
            DriverKind::Gstreamer => Box::new(gst::GstSensor::new(&config.device, config.fps)?),
            #[cfg(not(feature = "gstreamer"))]
            DriverKind::Gstreamer => {
                return Err(DriverError::NotSupported(
                    "built without the gstreamer feature".to_string(),
                )
                .into())
            }
        };
        Ok(Self::new(driver, config.pipeline()))
    }

    /// Brings the device up with the stored pipeline and settings
    pub fn init(&self) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.initialized {
            return Ok(());
        }

        info!(sensor = %inner.info.name, "Initializing camera");
        let pipeline = inner.pipeline;
        inner.driver.init(&pipeline)?;
        inner.initialized = true;
        inner.apply_settings();
        info!("Camera initialized successfully");
        Ok(())
    }

    /// Returns any claimed buffer and shuts the device down
    pub fn deinit(&self) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if !inner.initialized {
            return Ok(());
        }

        inner.release();
        inner.initialized = false;
        inner.driver.deinit()?;
        info!("Camera deinitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// True when a filled buffer is waiting to be captured
    pub fn frame_available(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.initialized && inner.driver.frame_ready()
    }

    /// Hands the claimed buffer (if any) back so the producer can refill it
    pub fn release(&self) {
        self.inner.lock().release();
    }

    /// Takes the next filled buffer without waiting.
    ///
    /// Any previously claimed buffer is released first. `Ok(None)` means no
    /// frame is ready yet.
    pub fn capture(&self) -> Result<Option<Frame>, CameraError> {
        let mut inner = self.inner.lock();
        if !inner.initialized {
            return Err(CameraError::NotInitialized);
        }
        inner.release();
        let raw = inner.driver.fb_get();
        Ok(inner.claim(raw))
    }

    /// Like [`Camera::capture`] but waits up to `timeout` for the producer.
    ///
    /// Blocks the calling thread; meant for synchronous callers only.
    pub fn capture_blocking(&self, timeout: Duration) -> Result<Option<Frame>, CameraError> {
        let mut inner = self.inner.lock();
        if !inner.initialized {
            return Err(CameraError::NotInitialized);
        }
        inner.release();
        let raw = inner.driver.fb_wait(timeout);
        Ok(inner.claim(raw))
    }

    /// Applies pipeline changes atomically.
    ///
    /// On a running device the pipeline is torn down and brought up again;
    /// if the driver rejects the new pipeline the previous one is restored
    /// and `CameraError::Reconfiguration` names the offending field. On a
    /// stopped device the request is validated and stored for the next
    /// `init`. Tunables are re-applied after every reinitialization.
    pub fn reconfigure(&self, request: &ReconfigureRequest) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        let prior = inner.pipeline;
        let mut next = prior;

        if let Some(size) = request.frame_size {
            next.frame_size = if size > inner.info.max_frame_size {
                warn!(
                    requested = %size,
                    max = %inner.info.max_frame_size,
                    "Frame size scaled down to the sensor maximum"
                );
                inner.info.max_frame_size
            } else {
                size
            };
        }
        if let Some(format) = request.pixel_format {
            if !inner.info.supports(format) {
                return Err(CameraError::Reconfiguration {
                    field: "pixel_format".to_string(),
                    reason: ReconfigureReason::Rejected(DriverError::NotSupported(format!(
                        "{} does not support {}",
                        inner.info.name, format
                    ))),
                });
            }
            next.pixel_format = format;
        }
        if let Some(mode) = request.grab_mode {
            next.grab_mode = mode;
        }
        if let Some(count) = request.fb_count {
            if count > MAX_FB_COUNT {
                warn!(requested = count, "Frame buffer count limited to {}", MAX_FB_COUNT);
            }
            next.fb_count = count.clamp(1, MAX_FB_COUNT);
        }

        if next == prior {
            debug!("Reconfiguration requested with unchanged pipeline");
            return Ok(());
        }

        if !inner.initialized {
            inner.pipeline = next;
            info!(?next, "Pipeline stored for next initialization");
            return Ok(());
        }

        info!(?next, "Reconfiguring camera");
        let field = request.primary_field();
        inner.release();
        if let Err(e) = inner.driver.deinit() {
            inner.initialized = false;
            return Err(CameraError::Reconfiguration {
                field: field.to_string(),
                reason: ReconfigureReason::Rejected(e),
            });
        }

        match inner.driver.init(&next) {
            Ok(()) => {
                inner.pipeline = next;
                inner.apply_settings();
                info!("Camera reconfigured successfully");
                Ok(())
            }
            Err(rejected) => {
                warn!(field, error = %rejected, "Pipeline rejected, restoring previous configuration");
                match inner.driver.init(&prior) {
                    Ok(()) => inner.apply_settings(),
                    Err(e) => {
                        inner.initialized = false;
                        error!(error = %e, "Failed to restore previous pipeline, camera is down");
                    }
                }
                Err(CameraError::Reconfiguration {
                    field: field.to_string(),
                    reason: ReconfigureReason::Rejected(rejected),
                })
            }
        }
    }

    /// Claims the device for one streaming session.
    ///
    /// Fails with `CameraError::Busy` while another claim is alive. Dropping
    /// the claim releases the buffer and deinitializes the device.
    pub fn claim_stream(self: &Arc<Self>) -> Result<StreamClaim, CameraError> {
        self.streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CameraError::Busy)?;
        debug!("Stream claim taken");
        Ok(StreamClaim {
            camera: Arc::clone(self),
        })
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Current value of a tunable
    pub fn control(&self, control: Control) -> i32 {
        self.inner.lock().settings.get(control)
    }

    /// Changes a tunable in place; the stored value is kept on failure
    pub fn set_control(&self, control: Control, value: i32) -> Result<(), CameraError> {
        if !control.accepts(value) {
            return Err(CameraError::InvalidValue {
                field: control.name().to_string(),
                value,
            });
        }

        let mut inner = self.inner.lock();
        if inner.initialized {
            inner.driver.set_control(control, value)?;
        }
        inner.settings.set(control, value);
        if control == Control::Quality {
            inner.pipeline.jpeg_quality = value as u8;
        }
        debug!(field = %control, value, "Sensor setting updated");
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        self.inner.lock().pipeline.frame_size
    }

    /// Changes the output resolution without reinitializing the pipeline
    pub fn set_frame_size(&self, size: FrameSize) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        let size = if size > inner.info.max_frame_size {
            warn!(
                requested = %size,
                max = %inner.info.max_frame_size,
                "Frame size scaled down to the sensor maximum"
            );
            inner.info.max_frame_size
        } else {
            size
        };
        if inner.initialized {
            match inner.driver.set_frame_size(size) {
                Ok(()) => {}
                Err(DriverError::NotSupported(_)) => {
                    drop(inner);
                    debug!(size = %size, "Frame size needs a pipeline restart");
                    return self.reconfigure(&ReconfigureRequest::new().frame_size(size));
                }
                Err(e) => return Err(e.into()),
            }
        }
        inner.pipeline.frame_size = size;
        Ok(())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.inner.lock().pipeline.pixel_format
    }

    pub fn grab_mode(&self) -> GrabMode {
        self.inner.lock().pipeline.grab_mode
    }

    pub fn fb_count(&self) -> u8 {
        self.inner.lock().pipeline.fb_count
    }

    pub fn pipeline(&self) -> PipelineConfig {
        self.inner.lock().pipeline
    }

    pub fn pixel_width(&self) -> u32 {
        self.frame_size().width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.frame_size().height()
    }

    pub fn max_frame_size(&self) -> FrameSize {
        self.inner.lock().info.max_frame_size
    }

    pub fn sensor_name(&self) -> String {
        self.inner.lock().info.name.clone()
    }

    pub fn supports_jpeg(&self) -> bool {
        self.inner.lock().info.supports_jpeg
    }

    pub fn address(&self) -> u8 {
        self.inner.lock().info.sccb_address
    }

    pub fn sensor_info(&self) -> SensorInfo {
        self.inner.lock().info.clone()
    }

    pub fn gainceiling(&self) -> GainCeiling {
        GainCeiling::from_index(self.control(Control::GainCeiling)).unwrap_or(GainCeiling::X2)
    }

    pub fn set_gainceiling(&self, ceiling: GainCeiling) -> Result<(), CameraError> {
        self.set_control(Control::GainCeiling, ceiling.index())
    }
}

macro_rules! int_accessors {
    ($($get:ident, $set:ident => $control:ident;)*) => {
        impl Camera {
            $(
                pub fn $get(&self) -> i32 {
                    self.control(Control::$control)
                }

                pub fn $set(&self, value: i32) -> Result<(), CameraError> {
                    self.set_control(Control::$control, value)
                }
            )*
        }
    };
}

macro_rules! bool_accessors {
    ($($get:ident, $set:ident => $control:ident;)*) => {
        impl Camera {
            $(
                pub fn $get(&self) -> bool {
                    self.control(Control::$control) != 0
                }

                pub fn $set(&self, value: bool) -> Result<(), CameraError> {
                    self.set_control(Control::$control, i32::from(value))
                }
            )*
        }
    };
}

int_accessors! {
    contrast, set_contrast => Contrast;
    brightness, set_brightness => Brightness;
    saturation, set_saturation => Saturation;
    sharpness, set_sharpness => Sharpness;
    denoise, set_denoise => Denoise;
    quality, set_quality => Quality;
    agc_gain, set_agc_gain => AgcGain;
    aec_value, set_aec_value => AecValue;
    special_effect, set_special_effect => SpecialEffect;
    wb_mode, set_wb_mode => WbMode;
    ae_level, set_ae_level => AeLevel;
}

bool_accessors! {
    colorbar, set_colorbar => Colorbar;
    whitebal, set_whitebal => Whitebal;
    gain_ctrl, set_gain_ctrl => GainCtrl;
    exposure_ctrl, set_exposure_ctrl => ExposureCtrl;
    hmirror, set_hmirror => Hmirror;
    vflip, set_vflip => Vflip;
    aec2, set_aec2 => Aec2;
    awb_gain, set_awb_gain => AwbGain;
    dcw, set_dcw => Dcw;
    bpc, set_bpc => Bpc;
    wpc, set_wpc => Wpc;
    raw_gma, set_raw_gma => RawGma;
    lenc, set_lenc => Lenc;
}

/// Exclusive right to stream from the device.
///
/// Cleanup runs on every exit path of the owning session, including
/// cancellation of its task.
pub struct StreamClaim {
    camera: Arc<Camera>,
}

impl StreamClaim {
    pub fn camera(&self) -> &Arc<Camera> {
        &self.camera
    }
}

impl Drop for StreamClaim {
    fn drop(&mut self) {
        self.camera.release();
        if let Err(e) = self.camera.deinit() {
            warn!(error = %e, "Failed to deinitialize camera after stream");
        }
        self.camera.streaming.store(false, Ordering::Release);
        debug!("Stream claim released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Driver that always has a frame and records buffer traffic
    #[derive(Default)]
    struct ScriptedSensor {
        outstanding: Arc<AtomicU32>,
        max_outstanding: Arc<AtomicU32>,
        reject_format: Option<PixelFormat>,
        refuse_frame_size: bool,
        inits: Arc<AtomicU32>,
    }

    impl SensorDriver for ScriptedSensor {
        fn init(&mut self, config: &PipelineConfig) -> Result<(), DriverError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if Some(config.pixel_format) == self.reject_format {
                return Err(DriverError::NotSupported("scripted".to_string()));
            }
            Ok(())
        }

        fn deinit(&mut self) -> Result<(), DriverError> {
            self.outstanding.store(0, Ordering::SeqCst);
            Ok(())
        }

        fn info(&self) -> SensorInfo {
            SensorInfo {
                name: "SCRIPTED".to_string(),
                max_frame_size: FrameSize::UXGA,
                supports_jpeg: true,
                sccb_address: 0x30,
                pixel_formats: PixelFormat::ALL.to_vec(),
            }
        }

        fn frame_ready(&mut self) -> bool {
            true
        }

        fn fb_get(&mut self) -> Option<RawFrame> {
            let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_outstanding.fetch_max(now, Ordering::SeqCst);
            Some(RawFrame {
                data: bytes::Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
                format: PixelFormat::Jpeg,
                width: 320,
                height: 240,
            })
        }

        fn fb_wait(&mut self, _timeout: Duration) -> Option<RawFrame> {
            self.fb_get()
        }

        fn fb_return(&mut self) {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }

        fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError> {
            if self.refuse_frame_size {
                return Err(DriverError::InvalidArg(format!("frame size {}", size)));
            }
            Ok(())
        }

        fn set_control(&mut self, _control: Control, _value: i32) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn test_init_survives_refused_frame_size() {
        let sensor = ScriptedSensor {
            refuse_frame_size: true,
            ..Default::default()
        };
        let camera = Camera::new(Box::new(sensor), PipelineConfig::default());
        camera.set_brightness(1).unwrap();
        camera.init().unwrap();

        assert!(camera.is_initialized());
        assert_eq!(camera.frame_size(), FrameSize::QVGA);
        assert_eq!(camera.brightness(), 1);
        assert!(camera.capture().unwrap().is_some());
    }

    #[test]
    fn test_capture_requires_init() {
        let camera = Camera::new(Box::<ScriptedSensor>::default(), PipelineConfig::default());
        assert!(matches!(camera.capture(), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn test_capture_releases_previous_buffer() {
        let sensor = ScriptedSensor::default();
        let max_outstanding = Arc::clone(&sensor.max_outstanding);
        let camera = Camera::new(Box::new(sensor), PipelineConfig::default());
        camera.init().unwrap();

        for _ in 0..10 {
            let frame = camera.capture().unwrap().unwrap();
            assert!(frame.is_jpeg());
        }
        assert_eq!(max_outstanding.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_settings_survive_deinit() {
        let camera = Camera::new(Box::<ScriptedSensor>::default(), PipelineConfig::default());
        camera.set_brightness(2).unwrap();
        camera.set_hmirror(true).unwrap();
        camera.init().unwrap();
        camera.deinit().unwrap();
        assert_eq!(camera.brightness(), 2);
        assert!(camera.hmirror());
    }

    #[test]
    fn test_set_control_out_of_range() {
        let camera = Camera::new(Box::<ScriptedSensor>::default(), PipelineConfig::default());
        let err = camera.set_contrast(5).unwrap_err();
        assert!(matches!(err, CameraError::InvalidValue { value: 5, .. }));
        assert_eq!(camera.contrast(), 0);
    }

    #[test]
    fn test_reconfigure_restores_on_rejection() {
        let sensor = ScriptedSensor {
            reject_format: Some(PixelFormat::Grayscale),
            ..Default::default()
        };
        let inits = Arc::clone(&sensor.inits);
        let camera = Camera::new(Box::new(sensor), PipelineConfig::default());
        camera.init().unwrap();

        let err = camera
            .reconfigure(&ReconfigureRequest::new().pixel_format(PixelFormat::Grayscale))
            .unwrap_err();
        match err {
            CameraError::Reconfiguration { field, reason } => {
                assert_eq!(field, "pixel_format");
                assert!(matches!(reason, ReconfigureReason::Rejected(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        // init, rejected init, restoring init
        assert_eq!(inits.load(Ordering::SeqCst), 3);
        assert!(camera.is_initialized());
        assert_eq!(camera.pixel_format(), PixelFormat::Jpeg);
    }

    #[test]
    fn test_reconfigure_clamps() {
        let camera = Camera::new(Box::<ScriptedSensor>::default(), PipelineConfig::default());
        camera
            .reconfigure(&ReconfigureRequest::new().frame_size(FrameSize::QSXGA).fb_count(5))
            .unwrap();
        assert_eq!(camera.frame_size(), FrameSize::UXGA);
        assert_eq!(camera.fb_count(), 2);
    }

    #[test]
    fn test_request_from_fields() {
        let request =
            ReconfigureRequest::from_fields([("framesize", 8), ("pixel_format", 3)]).unwrap();
        assert_eq!(request.frame_size, Some(FrameSize::VGA));
        assert_eq!(request.pixel_format, Some(PixelFormat::Grayscale));

        assert!(matches!(
            ReconfigureRequest::from_fields([("brightness", 1)]),
            Err(CameraError::Reconfiguration {
                reason: ReconfigureReason::UnknownField,
                ..
            })
        ));
        assert!(matches!(
            ReconfigureRequest::from_fields([("frame_size", 999)]),
            Err(CameraError::Reconfiguration {
                reason: ReconfigureReason::InvalidValue(999),
                ..
            })
        ));
    }

    #[test]
    fn test_stream_claim_is_exclusive() {
        let camera = Arc::new(Camera::new(
            Box::<ScriptedSensor>::default(),
            PipelineConfig::default(),
        ));
        let claim = camera.claim_stream().unwrap();
        camera.init().unwrap();
        assert!(matches!(camera.claim_stream(), Err(CameraError::Busy)));

        drop(claim);
        assert!(!camera.is_initialized());
        assert!(!camera.is_streaming());
        assert!(camera.claim_stream().is_ok());
    }
}
