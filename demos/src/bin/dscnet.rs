//! DSCNet command line tool
//!
//! ## Usage
//!
//! ```bash
//! # Output levels of a configuration, as JSON
//! cargo run --bin dscnet -- shapes --config dscnet.json
//!
//! # One forward pass on a random batch
//! cargo run --bin dscnet -- run --batch 2 --width 128 --height 96
//!
//! # Mean forward time over 10 passes
//! cargo run --release --bin dscnet -- bench --size 256 --iterations 10
//!
//! # Default configuration to a file
//! cargo run --bin dscnet -- init-config --output dscnet.json
//! ```

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, ensure, Context, Result};
use burn::{prelude::*, tensor::Distribution};
use clap::{Parser, Subcommand};
use dscnet::{DscNet, DscNetConfig, INPUT_CHANNELS};
use dscnet_demos::{create_device, get_backend_name, init_tracing, SelectedBackend, SelectedDevice};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dscnet")]
#[command(author, version, about = "DSCNet: a dynamic snake convolution backbone", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the channel count and stride of every output level as JSON
    Shapes {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run one forward pass on random input and log the level shapes
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Batch size
        #[arg(short, long, default_value = "1")]
        batch: usize,

        /// Input width (multiple of 32)
        #[arg(long, default_value = "224")]
        width: usize,

        /// Input height (multiple of 32)
        #[arg(long, default_value = "224")]
        height: usize,
    },

    /// Time repeated forward passes on square random input
    Bench {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input width and height (multiple of 32)
        #[arg(short, long, default_value = "224")]
        size: usize,

        /// Number of timed forward passes
        #[arg(short, long, default_value = "10")]
        iterations: usize,
    },

    /// Write the default configuration as JSON
    InitConfig {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Shapes { config } => {
            let config = load_config(config.as_deref())?;
            let shapes = config.output_shape()?;
            println!("{}", serde_json::to_string_pretty(&shapes)?);
        }
        Commands::Run {
            config,
            batch,
            width,
            height,
        } => {
            let config = load_config(config.as_deref())?;
            let device = create_device();
            info!(backend = get_backend_name(), "initializing model");
            let model = config.init::<SelectedBackend>(&device)?;

            let input = random_input([batch, INPUT_CHANNELS, width, height], &device);
            let start = Instant::now();
            let pyramid = model.forward(input)?;
            for feature in pyramid.iter() {
                info!(
                    level = feature.name(),
                    channels = feature.shape.channels,
                    stride = feature.shape.stride,
                    shape = ?feature.tensor.dims(),
                    "output level"
                );
            }
            info!(elapsed = ?start.elapsed(), "forward pass completed");
        }
        Commands::Bench {
            config,
            size,
            iterations,
        } => {
            ensure!(iterations > 0, "iterations must be positive");
            let config = load_config(config.as_deref())?;
            let device = create_device();
            info!(backend = get_backend_name(), size, iterations, "benchmarking");
            let model = config.init::<SelectedBackend>(&device)?;

            // warmup
            forward_blocking(&model, size, &device)?;

            let start = Instant::now();
            for _ in 0..iterations {
                forward_blocking(&model, size, &device)?;
            }
            let elapsed = start.elapsed();
            let mean = elapsed.div_f64(iterations as f64);
            info!(total = ?elapsed, mean = ?mean, "benchmark completed");
        }
        Commands::InitConfig { output } => {
            DscNetConfig::new()
                .save(&output)
                .with_context(|| format!("Failed to write config file: {}", output.display()))?;
            info!(path = %output.display(), "wrote default configuration");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DscNetConfig> {
    let config = match path {
        Some(path) => DscNetConfig::load(path)
            .map_err(|err| anyhow!("Failed to load config file {}: {err}", path.display()))?,
        None => DscNetConfig::new(),
    };
    config.validate()?;
    Ok(config)
}

fn random_input(shape: [usize; 4], device: &SelectedDevice) -> Tensor<SelectedBackend, 4> {
    Tensor::random(shape, Distribution::Default, device)
}

/// Runs one pass and reads every level back so asynchronous backends finish the work.
fn forward_blocking(
    model: &DscNet<SelectedBackend>,
    size: usize,
    device: &SelectedDevice,
) -> Result<()> {
    let input = random_input([1, INPUT_CHANNELS, size, size], device);
    for feature in model.forward(input)? {
        let _ = feature.tensor.sum().into_scalar();
    }
    Ok(())
}
