//! Benchmarks for the bilinear flow warp and stride alignment

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowwarp::{crop, f16, pad, padded_size, scalar, warp_bilinear, warp_bilinear_f16, PAD_STRIDE};
use ndarray::Array3;

const SIZES: [(usize, usize); 3] = [(256, 144), (640, 360), (1920, 1080)];

fn test_image(w: usize, h: usize) -> Array3<f32> {
    Array3::from_shape_fn((3, h, w), |(c, y, x)| ((c * 31 + y * 7 + x) % 256) as f32 / 255.0)
}

/// Smooth swirl with sub-pixel magnitudes in both directions.
fn test_flow(w: usize, h: usize) -> Array3<f32> {
    Array3::from_shape_fn((2, h, w), |(q, y, x)| {
        let (fx, fy) = (x as f32 / w as f32, y as f32 / h as f32);
        if q == 0 {
            4.5 * (fy * 6.0).sin()
        } else {
            -3.25 * (fx * 6.0).cos()
        }
    })
}

fn benchmark_warp_f32(c: &mut Criterion) {
    let mut group = c.benchmark_group("warp_bilinear_f32");

    for &(w, h) in SIZES.iter() {
        let image = test_image(w, h);
        let flow = test_flow(w, h);
        let label = format!("{w}x{h}");
        group.throughput(Throughput::Elements((3 * w * h) as u64));

        // Auto-dispatch (AVX2 when available)
        group.bench_with_input(BenchmarkId::new("auto", &label), &label, |b, _| {
            b.iter(|| black_box(warp_bilinear(&image.view(), &flow.view()).unwrap()))
        });

        #[cfg(target_arch = "x86_64")]
        if is_x86_feature_detected!("avx2") {
            group.bench_with_input(BenchmarkId::new("avx2", &label), &label, |b, _| {
                b.iter(|| {
                    let mut output = Array3::<f32>::zeros((3, h, w));
                    unsafe {
                        flowwarp::simd::avx2::warp_bilinear_f32_avx2(
                            &image.view(),
                            &flow.view(),
                            &mut output.view_mut(),
                        );
                    }
                    black_box(output)
                })
            });
        }

        group.bench_with_input(BenchmarkId::new("scalar", &label), &label, |b, _| {
            b.iter(|| {
                let mut output = Array3::<f32>::zeros((3, h, w));
                scalar::warp_bilinear_scalar(&image.view(), &flow.view(), &mut output.view_mut());
                black_box(output)
            })
        });
    }

    group.finish();
}

fn benchmark_warp_f16(c: &mut Criterion) {
    let mut group = c.benchmark_group("warp_bilinear_f16");

    for &(w, h) in SIZES[..2].iter() {
        let image = test_image(w, h).mapv(f16::from_f32);
        let flow = test_flow(w, h);
        let label = format!("{w}x{h}");
        group.throughput(Throughput::Elements((3 * w * h) as u64));

        group.bench_with_input(BenchmarkId::new("scalar", &label), &label, |b, _| {
            b.iter(|| black_box(warp_bilinear_f16(&image.view(), &flow.view()).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_pad_crop(c: &mut Criterion) {
    let mut group = c.benchmark_group("pad_crop");

    for &(w, h) in SIZES.iter() {
        let image = test_image(w, h);
        let (wp, hp) = padded_size(w, h, PAD_STRIDE).unwrap();
        let padded = pad(&image.view(), wp, hp).unwrap();
        let label = format!("{w}x{h}");
        group.throughput(Throughput::Elements((3 * w * h) as u64));

        group.bench_with_input(BenchmarkId::new("pad", &label), &label, |b, _| {
            b.iter(|| black_box(pad(&image.view(), wp, hp).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("crop", &label), &label, |b, _| {
            b.iter(|| black_box(crop(&padded.view(), w, h).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_warp_f32, benchmark_warp_f16, benchmark_pad_crop);
criterion_main!(benches);
