use assert_matches::assert_matches;
use mjpeg_camera_streamer::camera::{
    Camera, CameraError, FrameSize, GrabMode, PipelineConfig, PixelFormat, ReconfigureReason,
    ReconfigureRequest, SimulatedSensor,
};
use mjpeg_camera_streamer::config::Config;
use mjpeg_camera_streamer::convert;
use rstest::rstest;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn running_camera(model: &str) -> Camera {
    let sensor = SimulatedSensor::new(model, 100).unwrap();
    let pipeline = PipelineConfig {
        frame_size: FrameSize::QQVGA,
        ..Default::default()
    };
    let camera = Camera::new(Box::new(sensor), pipeline);
    camera.init().unwrap();
    camera
}

#[rstest]
#[case(PixelFormat::Rgb565, 160 * 120 * 2)]
#[case(PixelFormat::Yuv422, 160 * 120 * 2)]
#[case(PixelFormat::Grayscale, 160 * 120)]
#[case(PixelFormat::Rgb888, 160 * 120 * 3)]
fn test_raw_formats_after_reconfigure(#[case] format: PixelFormat, #[case] bytes: usize) {
    let camera = running_camera("OV5640");
    camera
        .reconfigure(&ReconfigureRequest::new().pixel_format(format))
        .unwrap();

    let frame = camera.capture_blocking(WAIT).unwrap().expect("frame");
    assert_eq!(frame.format, format);
    assert_eq!(frame.len(), bytes);

    let bmp = convert::frame_to_bmp(&frame).unwrap();
    assert_eq!(&bmp[..2], b"BM");
    camera.deinit().unwrap();
}

#[test]
fn test_tunables_survive_reconfigure() {
    let camera = running_camera("OV5640");
    camera.set_brightness(-1).unwrap();
    camera.set_vflip(true).unwrap();
    camera.set_quality(20).unwrap();

    let request = ReconfigureRequest::from_fields([
        ("frame_size", FrameSize::R96X96.index()),
        ("grab_mode", GrabMode::Latest.index()),
        ("fb_count", 2),
    ])
    .unwrap();
    camera.reconfigure(&request).unwrap();

    assert_eq!(camera.brightness(), -1);
    assert!(camera.vflip());
    assert_eq!(camera.quality(), 20);
    assert_eq!(camera.pipeline().jpeg_quality, 20);
    assert_eq!(camera.fb_count(), 2);
    assert_eq!(camera.grab_mode(), GrabMode::Latest);

    let frame = camera.capture_blocking(WAIT).unwrap().expect("frame");
    assert_eq!((frame.width, frame.height), (96, 96));
    camera.deinit().unwrap();
}

#[test]
fn test_rejected_pipeline_is_restored() {
    let camera = running_camera("OV2640");
    let before = camera.pipeline();

    let err = camera
        .reconfigure(
            &ReconfigureRequest::new()
                .frame_size(FrameSize::VGA)
                .pixel_format(PixelFormat::Rgb888),
        )
        .unwrap_err();
    assert_matches!(
        err,
        CameraError::Reconfiguration { ref field, reason: ReconfigureReason::Rejected(_) }
            if field == "pixel_format"
    );

    assert_eq!(camera.pipeline(), before);
    assert!(camera.is_initialized());
    let frame = camera.capture_blocking(WAIT).unwrap().expect("frame");
    assert!(frame.is_jpeg());
    camera.deinit().unwrap();
}

#[test]
fn test_reconfigure_while_stopped_applies_at_init() {
    let sensor = SimulatedSensor::new("OV3660", 100).unwrap();
    let camera = Camera::new(Box::new(sensor), PipelineConfig::default());

    camera
        .reconfigure(
            &ReconfigureRequest::new()
                .frame_size(FrameSize::R96X96)
                .pixel_format(PixelFormat::Grayscale),
        )
        .unwrap();
    assert!(!camera.is_initialized());

    camera.init().unwrap();
    let frame = camera.capture_blocking(WAIT).unwrap().expect("frame");
    assert_eq!(frame.format, PixelFormat::Grayscale);
    assert_eq!(frame.len(), 96 * 96);
    camera.deinit().unwrap();
}

#[test]
fn test_camera_from_config() {
    let config = Config::from_str(
        r#"
[camera]
sensor = "OV3660"
frame_size = "QXGA"
fb_count = 2
"#,
    )
    .unwrap();

    let camera = Camera::open(&config.camera).unwrap();
    assert_eq!(camera.sensor_name(), "OV3660");
    assert_eq!(camera.max_frame_size(), FrameSize::QXGA);
    assert_eq!(camera.frame_size(), FrameSize::QXGA);
    assert_eq!(camera.fb_count(), 2);
    assert!(!camera.is_initialized());
}

#[test]
fn test_oversized_frame_size_is_clamped() {
    let sensor = SimulatedSensor::new("OV2640", 100).unwrap();
    let pipeline = PipelineConfig {
        frame_size: FrameSize::QSXGA,
        ..Default::default()
    };
    let camera = Camera::new(Box::new(sensor), pipeline);
    assert_eq!(camera.frame_size(), FrameSize::UXGA);
}
