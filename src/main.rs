use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use hair_seg_rs::{Compositor, Config, Model};

fn main() -> Result<()> {
    let config = Config::parse();

    ensure!(config.input.exists(), "Input path does not exist");

    let model = Model::load(&config.model, config.model_config()?)?;
    let mut compositor = Compositor::new(model);

    if config.input.is_dir() {
        let frame_paths = WalkDir::new(&config.input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| ImageFormat::from_path(e.path()).is_ok())
            .map(|e| e.into_path())
            .collect::<Vec<_>>();

        let progress_bar = ProgressBar::new(frame_paths.len() as u64);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
            )?
            .progress_chars("#>-"),
        );

        // The overlay color advances once per frame; name order decides
        // which frame gets which color.
        for path in &frame_paths {
            let output_path =
                construct_output_path(path, &config.input, &config.output, &config.format)?;
            process_frame(&mut compositor, path, &output_path)?;
            progress_bar.inc(1);
        }

        progress_bar.finish();
    } else {
        let file_name = config
            .input
            .file_name()
            .context("Input path has no file name")?;
        fs::create_dir_all(&config.output)?;
        let output_path = config.output.join(file_name).with_extension(&config.format);
        process_frame(&mut compositor, &config.input, &output_path)?;
    }

    Ok(())
}

fn process_frame(
    compositor: &mut Compositor<Model>,
    path: &Path,
    output_path: &Path,
) -> Result<()> {
    let mut frame = image::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?
        .into_rgb8();

    compositor.draw(&mut frame)?;

    frame
        .save(output_path)
        .with_context(|| format!("Failed to save image: {}", output_path.display()))
}

fn relocate(path: &Path, prefix: &Path, new_prefix: &Path) -> Result<PathBuf> {
    let relative = path
        .strip_prefix(prefix)
        .with_context(|| format!("{} is not under {}", path.display(), prefix.display()))?;
    Ok(new_prefix.join(relative))
}

fn construct_output_path(
    path: &Path,
    input_dir: &Path,
    output_dir: &Path,
    format: &str,
) -> Result<PathBuf> {
    let output_path = relocate(path, input_dir, output_dir)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(output_path.with_extension(format))
}
