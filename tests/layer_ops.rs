//! Integration tests for the individual layer kinds

mod common;

use common::{wave, wave_tensor};
use convr::prelude::*;

fn conv_specs(
    input: [usize; 3],
    filter: [usize; 2],
    c_out: usize,
) -> (TensorSpec, TensorSpec, TensorSpec, TensorSpec) {
    let [h, w, c] = input;
    let [fh, fw] = filter;
    (
        TensorSpec::new(DType::F32, [h, w, c]),
        TensorSpec::new(DType::F32, [h - fh + 1, w - fw + 1, c_out]),
        TensorSpec::new(DType::F32, [fh, fw, c, c_out]),
        TensorSpec::new(DType::F32, [c_out]),
    )
}

#[test]
fn test_conv_output_geometry() {
    // 64x64x3 input, 5x5x3x32 filter, stride 1, no padding => 60x60x32
    let (inp, out, w, b) = conv_specs([64, 64, 3], [5, 5], 32);
    assert_eq!(out.dims(), &[60, 60, 32]);

    let mut layer = Conv2dLayer::<f32>::new(inp, out, w, b).unwrap();
    layer.allocate().unwrap();

    let input = wave_tensor(&[64, 64, 3], 0.013);
    layer.forward(&input, Strategy::Naive).unwrap();
    assert_eq!(layer.output().unwrap().shape(), &[60, 60, 32]);
}

#[test]
fn test_conv_rejects_wrong_output_spec() {
    let (inp, _, w, b) = conv_specs([64, 64, 3], [5, 5], 32);
    let wrong = TensorSpec::new(DType::F32, [64, 64, 32]);
    assert!(matches!(
        Conv2dLayer::<f32>::new(inp, wrong, w, b),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_conv_zero_filter_zero_output() {
    let (inp, out, w, b) = conv_specs([10, 10, 3], [3, 3], 4);
    let mut layer = Conv2dLayer::<f32>::new(inp, out, w, b).unwrap();
    layer.allocate().unwrap();

    // Weights and bias allocate zero-initialized; any input maps to zero
    let input = wave_tensor(&[10, 10, 3], 0.41);
    layer.forward(&input, Strategy::Naive).unwrap();
    assert!(layer.output().unwrap().as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn test_conv_known_values() {
    // 2x2 input, one channel, 1x1 unit filter, bias 0.5: out = in + 0.5
    let dir = tempfile::tempdir().unwrap();
    let w_path = dir.path().join("w.bin");
    let b_path = dir.path().join("b.bin");
    store_tensor(
        &w_path,
        &TensorBuffer::from_vec(vec![1.0f32], &[1, 1, 1, 1]).unwrap(),
    )
    .unwrap();
    store_tensor(&b_path, &TensorBuffer::from_vec(vec![0.5f32], &[1]).unwrap()).unwrap();

    let mut layer = Conv2dLayer::<f32>::new(
        TensorSpec::new(DType::F32, [2, 2, 1]),
        TensorSpec::new(DType::F32, [2, 2, 1]),
        TensorSpec::with_source(DType::F32, [1, 1, 1, 1], &w_path),
        TensorSpec::with_source(DType::F32, [1], &b_path),
    )
    .unwrap();
    layer.allocate().unwrap();
    layer.load().unwrap();

    let input = TensorBuffer::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2, 1]).unwrap();
    layer.forward(&input, Strategy::Naive).unwrap();
    assert_eq!(layer.output().unwrap().as_slice(), &[1.5, 2.5, 3.5, 4.5]);
}

#[test]
fn test_conv_compute_before_allocate() {
    let (inp, out, w, b) = conv_specs([8, 8, 2], [3, 3], 4);
    let mut layer = Conv2dLayer::<f32>::new(inp, out, w, b).unwrap();

    let input = wave_tensor(&[8, 8, 2], 0.3);
    assert!(matches!(
        layer.forward(&input, Strategy::Naive),
        Err(Error::AllocationState { .. })
    ));
}

#[test]
fn test_dense_known_values() {
    // w = [[1,0,1],[0,1,1]], b = 0, in = [2,3] => out = [2,3,5]
    let dir = tempfile::tempdir().unwrap();
    let w_path = dir.path().join("w.bin");
    let b_path = dir.path().join("b.bin");
    store_tensor(
        &w_path,
        &TensorBuffer::from_vec(vec![1.0f32, 0.0, 1.0, 0.0, 1.0, 1.0], &[2, 3]).unwrap(),
    )
    .unwrap();
    store_tensor(
        &b_path,
        &TensorBuffer::from_vec(vec![0.0f32; 3], &[3]).unwrap(),
    )
    .unwrap();

    let mut layer = DenseLayer::<f32>::new(
        TensorSpec::new(DType::F32, [2]),
        TensorSpec::new(DType::F32, [3]),
        TensorSpec::with_source(DType::F32, [2, 3], &w_path),
        TensorSpec::with_source(DType::F32, [3], &b_path),
    )
    .unwrap();
    layer.allocate().unwrap();
    layer.load().unwrap();

    let input = TensorBuffer::from_vec(vec![2.0f32, 3.0], &[2]).unwrap();
    layer.forward(&input, Strategy::Naive).unwrap();
    assert_eq!(layer.output().unwrap().as_slice(), &[2.0, 3.0, 5.0]);
}

#[test]
fn test_dense_accepts_flattened_input() {
    // A [4][4][2] producer feeds a dense layer declared over [32]
    let mut layer = DenseLayer::<f32>::new(
        TensorSpec::new(DType::F32, [32]),
        TensorSpec::new(DType::F32, [5]),
        TensorSpec::new(DType::F32, [32, 5]),
        TensorSpec::new(DType::F32, [5]),
    )
    .unwrap();
    layer.allocate().unwrap();

    let input = wave_tensor(&[4, 4, 2], 0.19);
    layer.forward(&input, Strategy::Naive).unwrap();

    let wrong = wave_tensor(&[4, 4, 3], 0.19);
    assert!(matches!(
        layer.forward(&wrong, Strategy::Naive),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_maxpool_known_values() {
    let mut layer = MaxPool2dLayer::<f32>::new(
        TensorSpec::new(DType::F32, [4, 4, 1]),
        TensorSpec::new(DType::F32, [2, 2, 1]),
    )
    .unwrap();
    assert_eq!(layer.pool(), 2);
    layer.allocate().unwrap();

    #[rustfmt::skip]
    let input = TensorBuffer::from_vec(
        vec![
            1.0f32, 2.0, 5.0, 0.0,
            3.0, 4.0, 1.0, 1.0,
            0.0, 0.0, 9.0, 8.0,
            0.0, -1.0, 7.0, 6.0,
        ],
        &[4, 4, 1],
    )
    .unwrap();

    layer.forward(&input, Strategy::Naive).unwrap();
    assert_eq!(layer.output().unwrap().as_slice(), &[4.0, 5.0, 0.0, 9.0]);
}

#[test]
fn test_maxpool_rejects_bad_output_spec() {
    assert!(matches!(
        MaxPool2dLayer::<f32>::new(
            TensorSpec::new(DType::F32, [4, 4, 2]),
            TensorSpec::new(DType::F32, [2, 2, 1]),
        ),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_softmax_distribution() {
    let mut layer = SoftmaxLayer::<f32>::new(
        TensorSpec::new(DType::F32, [200]),
        TensorSpec::new(DType::F32, [200]),
    )
    .unwrap();
    layer.allocate().unwrap();

    let input = TensorBuffer::from_vec(wave(200, 0.17), &[200]).unwrap();
    layer.forward(&input, Strategy::Naive).unwrap();

    let out = layer.output().unwrap().as_slice();
    let total: f32 = out.iter().sum();
    assert!((total - 1.0).abs() < 1e-5);
    assert!(out.iter().all(|&v| v > 0.0));
}

#[test]
fn test_softmax_stable_with_large_logits() {
    let mut layer = SoftmaxLayer::<f32>::new(
        TensorSpec::new(DType::F32, [3]),
        TensorSpec::new(DType::F32, [3]),
    )
    .unwrap();
    layer.allocate().unwrap();

    let input = TensorBuffer::from_vec(vec![500.0f32, 499.0, 400.0], &[3]).unwrap();
    layer.forward(&input, Strategy::Naive).unwrap();

    let out = layer.output().unwrap().as_slice();
    assert!(out.iter().all(|v| v.is_finite()));
    assert!(out[0] > out[1] && out[1] > out[2]);
}

#[test]
fn test_unsupported_strategies_fail_explicitly() {
    let mut pool = MaxPool2dLayer::<f32>::new(
        TensorSpec::new(DType::F32, [4, 4, 2]),
        TensorSpec::new(DType::F32, [2, 2, 2]),
    )
    .unwrap();
    pool.allocate().unwrap();
    let input = wave_tensor(&[4, 4, 2], 0.3);
    assert!(matches!(
        pool.forward(&input, Strategy::Tiled),
        Err(Error::UnsupportedStrategy { .. })
    ));

    let mut softmax = SoftmaxLayer::<f32>::new(
        TensorSpec::new(DType::F32, [8]),
        TensorSpec::new(DType::F32, [8]),
    )
    .unwrap();
    softmax.allocate().unwrap();
    let input = wave_tensor(&[8], 0.3);
    assert!(matches!(
        softmax.forward(&input, Strategy::Simd),
        Err(Error::UnsupportedStrategy { .. })
    ));
    assert!(matches!(
        softmax.forward(&input, Strategy::Tiled),
        Err(Error::UnsupportedStrategy { .. })
    ));

    // The output buffer is untouched by a failed request
    softmax.forward(&input, Strategy::Naive).unwrap();
    let before: Vec<f32> = softmax.output().unwrap().as_slice().to_vec();
    let _ = softmax.forward(&input, Strategy::Tiled);
    assert_eq!(softmax.output().unwrap().as_slice(), &before[..]);
}
