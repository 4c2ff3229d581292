//! Correctness tests for the warp kernel and the pad/infer/crop pipeline

use approx::assert_relative_eq;
use flowwarp::{
    crop, pad, padded_size, scalar, warp_bilinear, Error, FrameModel, Interpolator,
    InterpolatorConfig, ModelInputs, Result, PAD_STRIDE,
};
use ndarray::{s, Array3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Straightforward per-pixel bilinear backward warp with per-corner clamping.
fn reference_warp(image: &Array3<f32>, flow: &Array3<f32>) -> Array3<f32> {
    let (c, h, w) = image.dim();
    let clamp = |v: f32, len: usize| -> usize { (v.max(0.0) as usize).min(len - 1) };
    Array3::from_shape_fn((c, h, w), |(q, y, x)| {
        let sx = x as f32 + flow[[0, y, x]];
        let sy = y as f32 + flow[[1, y, x]];
        let (fx, fy) = (sx.floor(), sy.floor());
        let (a, b) = (sx - fx, sy - fy);
        let (x0, x1) = (clamp(fx, w), clamp(fx + 1.0, w));
        let (y0, y1) = (clamp(fy, h), clamp(fy + 1.0, h));
        let top = image[[q, y0, x0]] * (1.0 - a) + image[[q, y0, x1]] * a;
        let bottom = image[[q, y1, x0]] * (1.0 - a) + image[[q, y1, x1]] * a;
        top * (1.0 - b) + bottom * b
    })
}

fn random_image(rng: &mut ChaCha8Rng, c: usize, h: usize, w: usize) -> Array3<f32> {
    Array3::from_shape_fn((c, h, w), |_| rng.random_range(0.0f32..1.0))
}

/// Blends the frames via a zero-flow warp of each, like a model whose flow
/// estimate is the identity.
struct WarpBlendModel;

impl FrameModel for WarpBlendModel {
    fn infer(&mut self, inputs: &ModelInputs<'_>) -> Result<Array3<f32>> {
        let t = inputs.timestep[[0, 0, 0]];
        let (_c, h, w) = inputs.image0.dim();
        let flow = Array3::<f32>::zeros((2, h, w));
        let warped0 = warp_bilinear(&inputs.image0, &flow.view())?;
        let warped1 = warp_bilinear(&inputs.image1, &flow.view())?;
        Ok(warped0 * (1.0 - t) + warped1 * t)
    }
}

#[test]
fn test_matches_reference_warp() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for &(h, w) in &[(1, 1), (3, 7), (17, 33), (32, 64)] {
        let image = random_image(&mut rng, 3, h, w);
        let flow = Array3::from_shape_fn((2, h, w), |_| rng.random_range(-6.0f32..6.0));

        let ours = warp_bilinear(&image.view(), &flow.view()).unwrap();
        let expected = reference_warp(&image, &flow);

        let max_diff = ours
            .iter()
            .zip(expected.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 1e-5, "{h}x{w}: max diff {max_diff} exceeds tolerance");
    }
}

#[test]
fn test_identity_preserves_values() {
    let image = Array3::from_shape_fn((3, 20, 21), |(c, y, x)| (c * 1000 + y * 21 + x) as f32);
    let flow = Array3::<f32>::zeros((2, 20, 21));
    let output = warp_bilinear(&image.view(), &flow.view()).unwrap();
    assert_eq!(output, image);
}

#[test]
fn test_half_pixel_shift_midpoint() {
    // Single row [10, 20], dx = 0.5 at x = 0 samples halfway between them
    let image = Array3::from_shape_vec((1, 1, 2), vec![10.0f32, 20.0]).unwrap();
    let flow = Array3::from_shape_vec((2, 1, 2), vec![0.5f32, 0.5, 0.0, 0.0]).unwrap();
    let output = warp_bilinear(&image.view(), &flow.view()).unwrap();
    assert_relative_eq!(output[[0, 0, 0]], 15.0);
    // x = 1 reads past the right edge, which clamps to the last column
    assert_relative_eq!(output[[0, 0, 1]], 20.0);
}

#[test]
fn test_boundary_clamp_repeats_edges() {
    let image = Array3::from_shape_fn((1, 6, 8), |(_, y, x)| (y * 8 + x) as f32);
    let mut flow = Array3::<f32>::zeros((2, 6, 8));
    flow.slice_mut(s![0, .., ..]).fill(-100.0);
    flow.slice_mut(s![1, .., ..]).fill(100.0);

    let output = warp_bilinear(&image.view(), &flow.view()).unwrap();
    // Every sample lands beyond the bottom-left corner
    assert!(output.iter().all(|&v| v == image[[0, 5, 0]]));
}

#[test]
fn test_output_stays_within_input_range() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let image = random_image(&mut rng, 3, 24, 40);
    let flow = Array3::from_shape_fn((2, 24, 40), |_| rng.random_range(-50.0f32..50.0));

    let output = warp_bilinear(&image.view(), &flow.view()).unwrap();
    let lo = image.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = image.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    for &v in output.iter() {
        assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "{v} outside [{lo}, {hi}]");
    }
}

#[test]
fn test_row_by_row_serial_matches_dispatch() {
    let mut rng = ChaCha8Rng::seed_from_u64(19);
    let (c, h, w) = (3, 13, 45);
    let image = random_image(&mut rng, c, h, w);
    let flow = Array3::from_shape_fn((2, h, w), |_| rng.random_range(-9.0f32..9.0));

    let plane_len = h * w;
    let image_slice = image.as_slice().unwrap();
    let flow_slice = flow.as_slice().unwrap();
    let mut serial = vec![0.0f32; c * plane_len];
    for q in 0..c {
        let plane = &image_slice[q * plane_len..(q + 1) * plane_len];
        for y in 0..h {
            let fx = &flow_slice[y * w..(y + 1) * w];
            let fy = &flow_slice[plane_len + y * w..plane_len + (y + 1) * w];
            let out = &mut serial[q * plane_len + y * w..q * plane_len + (y + 1) * w];
            scalar::warp_row(plane, fx, fy, y, w, h, out);
        }
    }

    let dispatched = warp_bilinear(&image.view(), &flow.view()).unwrap();
    for (a, b) in dispatched.iter().zip(serial.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_pad_crop_round_trip_and_zero_fill() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for &(w, h) in &[(1, 1), (32, 32), (33, 17), (100, 75)] {
        let image = random_image(&mut rng, 3, h, w);
        let (wp, hp) = padded_size(w, h, PAD_STRIDE).unwrap();
        assert_eq!(wp % PAD_STRIDE, 0);
        assert_eq!(hp % PAD_STRIDE, 0);
        assert!(wp >= w && wp - w < PAD_STRIDE);
        assert!(hp >= h && hp - h < PAD_STRIDE);

        let padded = pad(&image.view(), wp, hp).unwrap();
        assert!(padded.slice(s![.., h.., ..]).iter().all(|&v| v == 0.0));
        assert!(padded.slice(s![.., .., w..]).iter().all(|&v| v == 0.0));
        assert_eq!(crop(&padded.view(), w, h).unwrap(), image);
    }
}

#[test]
fn test_pipeline_preserves_size_33x17() {
    let (w, h) = (33, 17);
    let frame0: Vec<f32> = (0..w * h * 3).map(|i| (i % 251) as f32 / 251.0).collect();
    let frame1: Vec<f32> = frame0.iter().map(|v| 1.0 - v).collect();

    let mut interpolator =
        Interpolator::with_model(InterpolatorConfig::default(), WarpBlendModel).unwrap();
    let out = interpolator.interpolate(&frame0, &frame1, w, h, 0.5).unwrap();

    assert_eq!(out.len(), w * h * 3);
    for v in out {
        assert_relative_eq!(v, 0.5, epsilon = 1e-6);
    }
}

#[test]
fn test_pipeline_endpoints_reproduce_inputs() {
    let (w, h) = (40, 9);
    let frame0: Vec<f32> = (0..w * h * 3).map(|i| (i % 17) as f32).collect();
    let frame1: Vec<f32> = (0..w * h * 3).map(|i| (i % 5) as f32).collect();

    let mut interpolator =
        Interpolator::with_model(InterpolatorConfig::default(), WarpBlendModel).unwrap();
    let frames = interpolator
        .interpolate_many(&frame0, &frame1, w, h, &[0.0, 1.0])
        .unwrap();
    assert_eq!(frames[0], frame0);
    assert_eq!(frames[1], frame1);
}

#[test]
fn test_not_ready_before_init() {
    let mut interpolator =
        Interpolator::<WarpBlendModel>::new(InterpolatorConfig::default()).unwrap();
    assert_eq!(
        interpolator.interpolate(&[0.0; 12], &[0.0; 12], 2, 2, 0.5),
        Err(Error::NotReady)
    );

    interpolator
        .init(&|_: &InterpolatorConfig| -> Result<WarpBlendModel> { Ok(WarpBlendModel) })
        .unwrap();
    assert!(interpolator.interpolate(&[0.0; 12], &[0.0; 12], 2, 2, 0.5).is_ok());
}

#[test]
fn test_dimension_contract_violations() {
    let image = Array3::<f32>::zeros((3, 8, 8));
    let short_flow = Array3::<f32>::zeros((1, 8, 8));
    let small_flow = Array3::<f32>::zeros((2, 8, 7));
    let empty = Array3::<f32>::zeros((3, 0, 8));

    assert_eq!(
        warp_bilinear(&image.view(), &short_flow.view()),
        Err(Error::FlowChannels(1))
    );
    assert!(matches!(
        warp_bilinear(&image.view(), &small_flow.view()),
        Err(Error::DimensionMismatch { .. })
    ));
    assert!(matches!(
        warp_bilinear(&empty.view(), &Array3::<f32>::zeros((2, 0, 8)).view()),
        Err(Error::EmptyDimension { .. })
    ));
}
