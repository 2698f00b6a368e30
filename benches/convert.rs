use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mjpeg_camera_streamer::camera::{Frame, FrameSize, PixelFormat};
use mjpeg_camera_streamer::convert;

fn gradient(width: u32, height: u32) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| {
            let x = i % width;
            let y = i / width;
            [(x * 255 / width) as u8, (y * 255 / height) as u8, 128]
        })
        .collect()
}

fn raw_frame(size: FrameSize, format: PixelFormat) -> Frame {
    let (width, height) = size.dimensions();
    let rgb = gradient(width, height);
    Frame {
        data: convert::encode_rgb888(&rgb, width, height, format, 12).unwrap(),
        format,
        width,
        height,
    }
}

fn benchmark_frame_to_bmp(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_to_bmp");

    for format in [
        PixelFormat::Rgb565,
        PixelFormat::Yuv422,
        PixelFormat::Grayscale,
        PixelFormat::Rgb888,
    ] {
        let frame = raw_frame(FrameSize::QVGA, format);
        group.bench_with_input(BenchmarkId::new("qvga", format), &frame, |b, frame| {
            b.iter(|| convert::frame_to_bmp(black_box(frame)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_jpeg_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("jpeg_encode");

    for size in [FrameSize::QQVGA, FrameSize::QVGA, FrameSize::VGA] {
        let (width, height) = size.dimensions();
        let rgb = gradient(width, height);
        group.bench_with_input(BenchmarkId::new("quality_12", size), &rgb, |b, rgb| {
            b.iter(|| {
                convert::encode_rgb888(black_box(rgb), width, height, PixelFormat::Jpeg, 12).unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_jpeg_to_bmp(c: &mut Criterion) {
    let frame = {
        let raw = raw_frame(FrameSize::QVGA, PixelFormat::Rgb888);
        Frame {
            data: convert::frame_to_jpeg(&raw, 12).unwrap(),
            format: PixelFormat::Jpeg,
            ..raw
        }
    };

    c.bench_function("jpeg_qvga_to_bmp", |b| {
        b.iter(|| convert::frame_to_bmp(black_box(&frame)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_frame_to_bmp,
    benchmark_jpeg_encode,
    benchmark_jpeg_to_bmp
);
criterion_main!(benches);
