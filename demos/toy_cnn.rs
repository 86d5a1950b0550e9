//! Toy CNN driver: builds the fixed 13-layer classification topology,
//! loads weights from a data directory, and runs one image through it.
//!
//! ```text
//! cargo run --example toy_cnn -- --data-dir ./data --image image_0.bin
//! ```
//!
//! Expected layout under `--data-dir`: `convN_weights.bin` /
//! `convN_biases.bin` for N in 0..6, `denseN_weights.bin` /
//! `denseN_biases.bin` for N in 0..2, plus the input image file.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use convr::prelude::*;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg {
    Naive,
    Threaded,
    Tiled,
    Simd,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Naive => Strategy::Naive,
            StrategyArg::Threaded => Strategy::Threaded,
            StrategyArg::Tiled => Strategy::Tiled,
            StrategyArg::Simd => Strategy::Simd,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run the toy CNN over one image")]
struct Cli {
    /// Directory holding weight, bias, and image files
    #[arg(long, default_value = "./data")]
    data_dir: std::path::PathBuf,

    /// Input image file name (64x64x3 f32, channel-last)
    #[arg(long, default_value = "image_0.bin")]
    image: String,

    /// Compute strategy for every layer
    #[arg(long, value_enum, default_value = "naive")]
    strategy: StrategyArg,

    /// Verbose diagnostics
    #[arg(long)]
    debug: bool,

    /// Run only this layer index, feeding it the loaded image
    #[arg(long)]
    single_layer: Option<usize>,

    /// Compare the final output against layer_12_output.bin within 1e-4
    #[arg(long)]
    verify: bool,
}

/// Convolution layer from the toy topology's spec table
fn conv(
    config: &EngineConfig,
    name: &str,
    input: [usize; 3],
    filter: [usize; 2],
    c_out: usize,
) -> Result<Conv2dLayer<f32>> {
    let [h, w, c] = input;
    let [fh, fw] = filter;
    Conv2dLayer::new(
        TensorSpec::new(DType::F32, [h, w, c]),
        TensorSpec::new(DType::F32, [h - fh + 1, w - fw + 1, c_out]),
        TensorSpec::with_source(DType::F32, [fh, fw, c, c_out], config.weight_path(name)),
        TensorSpec::with_source(DType::F32, [c_out], config.bias_path(name)),
    )
    .with_context(|| format!("building {name}"))
}

fn pool(input: [usize; 3]) -> Result<MaxPool2dLayer<f32>> {
    let [h, w, c] = input;
    Ok(MaxPool2dLayer::new(
        TensorSpec::new(DType::F32, [h, w, c]),
        TensorSpec::new(DType::F32, [h / 2, w / 2, c]),
    )?)
}

fn dense(config: &EngineConfig, name: &str, in_w: usize, out_w: usize) -> Result<DenseLayer<f32>> {
    DenseLayer::new(
        TensorSpec::new(DType::F32, [in_w]),
        TensorSpec::new(DType::F32, [out_w]),
        TensorSpec::with_source(DType::F32, [in_w, out_w], config.weight_path(name)),
        TensorSpec::with_source(DType::F32, [out_w], config.bias_path(name)),
    )
    .with_context(|| format!("building {name}"))
}

/// The fixed toy topology: 6 convolutions, 3 pools, 2 dense, softmax
fn build_toy_model(config: &EngineConfig) -> Result<Model<f32>> {
    let mut model = Model::new();

    model.add_layer(conv(config, "conv0", [64, 64, 3], [5, 5], 32)?)?;
    model.add_layer(conv(config, "conv1", [60, 60, 32], [5, 5], 32)?)?;
    model.add_layer(pool([56, 56, 32])?)?;
    model.add_layer(conv(config, "conv2", [28, 28, 32], [3, 3], 64)?)?;
    model.add_layer(conv(config, "conv3", [26, 26, 64], [3, 3], 64)?)?;
    model.add_layer(pool([24, 24, 64])?)?;
    model.add_layer(conv(config, "conv4", [12, 12, 64], [3, 3], 64)?)?;
    model.add_layer(conv(config, "conv5", [10, 10, 64], [3, 3], 128)?)?;
    model.add_layer(pool([8, 8, 128])?)?;
    // Flatten is a reshape of the same row-major elements; dense0 accepts
    // the 4x4x128 producer directly
    model.add_layer(dense(config, "dense0", 2048, 256)?)?;
    model.add_layer(dense(config, "dense1", 256, 200)?)?;
    model.add_layer(SoftmaxLayer::new(
        TensorSpec::new(DType::F32, [200]),
        TensorSpec::new(DType::F32, [200]),
    )?)?;

    Ok(model)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = EngineConfig::builder(&cli.data_dir)
        .debug(cli.debug)
        .single_layer(cli.single_layer)
        .build();
    let strategy: Strategy = cli.strategy.into();

    let mut model = build_toy_model(&config)?;
    model.alloc_layers().context("allocating layer buffers")?;
    model.load_layers().context("loading weights and biases")?;

    let image_path = config.tensor_path(&cli.image);
    let image = load_tensor::<f32>(&image_path, &[64, 64, 3])
        .with_context(|| format!("loading image {}", image_path.display()))?;

    let scores = match config.single_layer() {
        Some(index) => {
            tracing::info!(index, %strategy, "running single layer");
            model.infer_layer(&image, index, strategy)?.clone()
        }
        None => {
            tracing::info!(layers = model.num_layers(), %strategy, "running forward pass");
            model.infer(&image, strategy)?.clone()
        }
    };

    let mut ranked: Vec<(usize, f32)> = scores
        .as_slice()
        .iter()
        .copied()
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("top-5 classes:");
    for (class, score) in ranked.iter().take(5) {
        println!("  class {class:>3}  score {score:.6}");
    }

    if cli.verify {
        let reference_path = config.reference_path(model.num_layers() - 1);
        let reference = load_tensor::<f32>(&reference_path, scores.shape())
            .with_context(|| format!("loading reference {}", reference_path.display()))?;
        let diff = scores.max_abs_diff(&reference)?;
        if scores.all_close(&reference, 1e-4)? {
            println!("verify: PASS (max abs diff {diff:.2e})");
        } else {
            anyhow::bail!("verify: FAIL (max abs diff {diff:.2e})");
        }
    }

    model.free_layers()?;
    Ok(())
}
