use clap::Parser;
use image::ImageFormat;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use crate::errors::{HairSegError, Result};
use crate::model::ModelConfig;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Input image, or a directory of frames processed in name order.
    pub input: PathBuf,

    #[arg(default_value = "output")]
    pub output: PathBuf,

    /// Path stem of the model pair (`<stem>.onnx` and `<stem>.bin`).
    #[arg(short, long)]
    pub model: PathBuf,

    #[arg(short, long, default_value_t = 512)]
    pub target_size: u32,

    /// Per-channel mean subtracted from raw pixel values.
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], default_values_t = [0.0; 3])]
    pub mean: Vec<f32>,

    /// Per-channel scale applied after mean subtraction.
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], default_values_t = [1.0 / 255.0; 3])]
    pub norm: Vec<f32>,

    #[arg(long)]
    pub use_gpu: bool,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(short, long, default_value_t = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1))]
    pub num_threads: usize,

    /// Skip memory-pattern planning to lower peak memory.
    #[arg(long)]
    pub reduced_memory: bool,

    /// Port name the input tensor binds to.
    #[arg(long, default_value = "input")]
    pub input_tensor: String,

    /// Port name the mask is read from.
    #[arg(long, default_value = "1006")]
    pub output_tensor: String,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,
}

impl Config {
    pub fn model_config(&self) -> Result<ModelConfig> {
        let mut config = ModelConfig::new(
            self.target_size,
            triplet(&self.mean, "mean")?,
            triplet(&self.norm, "norm")?,
            self.use_gpu,
        );
        config.device_id = self.device_id;
        config.num_threads = self.num_threads;
        config.reduced_memory = self.reduced_memory;
        config.input_name = self.input_tensor.clone();
        config.output_name = self.output_tensor.clone();
        Ok(config)
    }
}

fn triplet(values: &[f32], field: &str) -> Result<[f32; 3]> {
    values.try_into().map_err(|_| HairSegError::Validation {
        field: field.to_string(),
        reason: format!("expects 3 values, got {}", values.len()),
    })
}

fn check_format(s: &str) -> std::result::Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|ext| format!("`{ext}`"))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{s} is not supported. {supported_message}"))?;
    if !format.writing_enabled() {
        return Err(format!("{s} is not supported. {supported_message}"));
    }

    Ok(s.to_string())
}
