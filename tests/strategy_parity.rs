//! Numerical parity of the compute strategies
//!
//! For a fixed input and fixed weights, every implemented strategy of a
//! layer kind must produce the same output within 1e-4.

mod common;

use common::{assert_allclose_f32, wave, wave_tensor, EPSILON};
use convr::prelude::*;

fn run_strategy(layer: &mut Layer<f32>, input: &TensorBuffer<f32>, strategy: Strategy) -> Vec<f32> {
    layer.forward(input, strategy).unwrap();
    layer.output().unwrap().as_slice().to_vec()
}

fn loaded_conv(dir: &std::path::Path) -> Layer<f32> {
    let w_path = dir.join("conv_w.bin");
    let b_path = dir.join("conv_b.bin");
    // 3x3x4x35 filter bank; 35 output channels exercise the SIMD tail
    store_tensor(
        &w_path,
        &TensorBuffer::from_vec(wave(3 * 3 * 4 * 35, 0.071), &[3, 3, 4, 35]).unwrap(),
    )
    .unwrap();
    store_tensor(
        &b_path,
        &TensorBuffer::from_vec(wave(35, 0.33), &[35]).unwrap(),
    )
    .unwrap();

    let mut layer: Layer<f32> = Conv2dLayer::new(
        TensorSpec::new(DType::F32, [16, 14, 4]),
        TensorSpec::new(DType::F32, [14, 12, 35]),
        TensorSpec::with_source(DType::F32, [3, 3, 4, 35], &w_path),
        TensorSpec::with_source(DType::F32, [35], &b_path),
    )
    .unwrap()
    .into();
    layer.allocate().unwrap();
    layer.load().unwrap();
    layer
}

#[test]
fn test_conv_strategy_parity() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = loaded_conv(dir.path());
    let input = wave_tensor(&[16, 14, 4], 0.049);

    let baseline = run_strategy(&mut layer, &input, Strategy::Naive);
    for strategy in [Strategy::Threaded, Strategy::Tiled, Strategy::Simd] {
        let out = run_strategy(&mut layer, &input, strategy);
        assert_allclose_f32(
            &baseline,
            &out,
            EPSILON as f32,
            &format!("conv {strategy}"),
        );
    }
}

#[test]
fn test_dense_strategy_parity() {
    let dir = tempfile::tempdir().unwrap();
    let w_path = dir.path().join("dense_w.bin");
    let b_path = dir.path().join("dense_b.bin");
    // 130 outputs: not a multiple of the vector width or the tile edge
    store_tensor(
        &w_path,
        &TensorBuffer::from_vec(wave(96 * 130, 0.023), &[96, 130]).unwrap(),
    )
    .unwrap();
    store_tensor(
        &b_path,
        &TensorBuffer::from_vec(wave(130, 0.41), &[130]).unwrap(),
    )
    .unwrap();

    let mut layer: Layer<f32> = DenseLayer::new(
        TensorSpec::new(DType::F32, [96]),
        TensorSpec::new(DType::F32, [130]),
        TensorSpec::with_source(DType::F32, [96, 130], &w_path),
        TensorSpec::with_source(DType::F32, [130], &b_path),
    )
    .unwrap()
    .into();
    layer.allocate().unwrap();
    layer.load().unwrap();

    let input = wave_tensor(&[96], 0.087);
    let baseline = run_strategy(&mut layer, &input, Strategy::Naive);
    for strategy in [Strategy::Threaded, Strategy::Tiled, Strategy::Simd] {
        let out = run_strategy(&mut layer, &input, strategy);
        assert_allclose_f32(
            &baseline,
            &out,
            EPSILON as f32,
            &format!("dense {strategy}"),
        );
    }
}

#[test]
fn test_maxpool_strategy_parity() {
    let mut layer: Layer<f32> = MaxPool2dLayer::new(
        TensorSpec::new(DType::F32, [12, 10, 21]),
        TensorSpec::new(DType::F32, [6, 5, 21]),
    )
    .unwrap()
    .into();
    layer.allocate().unwrap();

    let input = wave_tensor(&[12, 10, 21], 0.31);
    let baseline = run_strategy(&mut layer, &input, Strategy::Naive);
    for strategy in [Strategy::Threaded, Strategy::Simd] {
        let out = run_strategy(&mut layer, &input, strategy);
        // Max selection is exact, not approximate
        assert_eq!(baseline, out, "maxpool {strategy}");
    }
}

#[test]
fn test_softmax_strategy_parity() {
    let mut layer: Layer<f32> = SoftmaxLayer::new(
        TensorSpec::new(DType::F32, [200]),
        TensorSpec::new(DType::F32, [200]),
    )
    .unwrap()
    .into();
    layer.allocate().unwrap();

    let input = wave_tensor(&[200], 0.13);
    let baseline = run_strategy(&mut layer, &input, Strategy::Naive);
    let threaded = run_strategy(&mut layer, &input, Strategy::Threaded);
    assert_allclose_f32(&baseline, &threaded, EPSILON as f32, "softmax threaded");
}
