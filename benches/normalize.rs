//! Benchmarks for image normalization.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::hint::black_box;
use std::io::Cursor;
use vision_assist::image::normalize;

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

fn photo_like(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Benchmark normalization of inputs that are already RGB
fn bench_rgb_inputs(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_rgb");

    for &(width, height) in &[(640u32, 480u32), (1920, 1080)] {
        let img = DynamicImage::ImageRgb8(photo_like(width, height));
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let bytes = encode(&img, format);
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", format), format!("{}x{}", width, height)),
                &bytes,
                |b, bytes| b.iter(|| normalize(black_box(bytes)).unwrap()),
            );
        }
    }

    group.finish();
}

/// Benchmark inputs that need an RGBA -> RGB conversion first
fn bench_alpha_input(c: &mut Criterion) {
    let rgb = photo_like(1280, 720);
    let rgba = RgbaImage::from_fn(1280, 720, |x, y| {
        let p = rgb.get_pixel(x, y).0;
        Rgba([p[0], p[1], p[2], 200])
    });
    let bytes = encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

    let mut group = c.benchmark_group("normalize_rgba");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("png_1280x720", |b| {
        b.iter(|| normalize(black_box(&bytes)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_rgb_inputs, bench_alpha_input);
criterion_main!(benches);
