//! Strategy comparison on the toy network's first convolution
//! (64x64x3 input, 5x5x3x32 filter bank)

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use convr::prelude::*;

fn wave(n: usize, step: f32) -> Vec<f32> {
    (0..n).map(|i| (i as f32 * step).sin()).collect()
}

fn conv_layer() -> Conv2dLayer<f32> {
    let mut layer = Conv2dLayer::new(
        TensorSpec::new(DType::F32, [64, 64, 3]),
        TensorSpec::new(DType::F32, [60, 60, 32]),
        TensorSpec::new(DType::F32, [5, 5, 3, 32]),
        TensorSpec::new(DType::F32, [32]),
    )
    .unwrap();
    layer.allocate().unwrap();

    layer
        .weights_mut()
        .buffer_mut()
        .unwrap()
        .as_mut_slice()
        .copy_from_slice(&wave(5 * 5 * 3 * 32, 0.071));
    layer
        .bias_mut()
        .buffer_mut()
        .unwrap()
        .as_mut_slice()
        .copy_from_slice(&wave(32, 0.33));

    layer
}

fn bench_conv_strategies(c: &mut Criterion) {
    let mut layer = conv_layer();
    let input = TensorBuffer::from_vec(wave(64 * 64 * 3, 0.013), &[64, 64, 3]).unwrap();

    let mut group = c.benchmark_group("conv2d_64x64x3_5x5x32");
    for strategy in Strategy::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy),
            &strategy,
            |b, &strategy| {
                b.iter(|| {
                    layer.forward(black_box(&input), strategy).unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_conv_strategies);
criterion_main!(benches);
