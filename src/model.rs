use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use image::{imageops, imageops::FilterType, ImageBuffer, Luma, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

use crate::{
    errors::{HairSegError, Result},
    traits::{AssetStore, HairSegmentationModel},
};

/// Hair probability mask at the model's native resolution, values
/// nominally in `[0, 1]`.
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Suffixes the model stem resolves to: the network graph and the external
/// weight data the graph references.
const GRAPH_SUFFIX: &str = ".onnx";
const WEIGHTS_SUFFIX: &str = ".bin";

/// Everything the loader needs to know about the trained network.
///
/// Fixed once the model is loaded. The port names default to the shipped
/// hair model's graph but stay configurable so a retrained network with
/// different port names needs no code change.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Side length of the square network input.
    pub target_size: u32,
    /// Per-channel mean subtracted from raw `0..=255` values.
    pub mean: [f32; 3],
    /// Per-channel scale applied after mean subtraction.
    pub norm: [f32; 3],
    /// Prefer GPU execution providers over the CPU fallback.
    pub use_gpu: bool,
    pub device_id: i32,
    /// Thread count for the engine's intra-op pool.
    pub num_threads: usize,
    /// Skip memory-pattern planning, trading throughput for peak memory.
    pub reduced_memory: bool,
    /// Port the input tensor binds to.
    pub input_name: String,
    /// Port the mask scores are read from.
    pub output_name: String,
}

impl ModelConfig {
    pub fn new(target_size: u32, mean: [f32; 3], norm: [f32; 3], use_gpu: bool) -> Self {
        Self {
            target_size,
            mean,
            norm,
            use_gpu,
            device_id: 0,
            num_threads: default_num_threads(),
            reduced_memory: false,
            input_name: "input".to_string(),
            output_name: "1006".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(512, [0.0; 3], [1.0 / 255.0; 3], false)
    }
}

fn default_num_threads() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// ONNX-backed hair segmentation model.
///
/// Owns the engine session and its pooled intermediate memory; dropping a
/// `Model` (or replacing it) releases everything from that load.
pub struct Model {
    config: ModelConfig,
    session: Mutex<Session>,
}

impl Model {
    /// Load the model pair `<stem>.onnx` / `<stem>.bin` from the
    /// filesystem.
    pub fn load(stem: impl AsRef<Path>, config: ModelConfig) -> Result<Self> {
        let (graph_path, weights_path) = companion_paths(stem.as_ref());
        for path in [&graph_path, &weights_path] {
            if !path.is_file() {
                return Err(HairSegError::FileSystem {
                    path: path.clone(),
                    operation: "model file lookup".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        let session = session_builder(&config)?
            .commit_from_file(&graph_path)
            .map_err(|e| HairSegError::Model {
                operation: format!("model load: {}", graph_path.display()),
                source: Box::new(e),
            })?;

        Self::from_session(session, config)
    }

    /// Load the same model pair out of a packaged asset store.
    ///
    /// The engine resolves the weight data relative to the graph file, so
    /// both assets are staged side by side in a temporary directory before
    /// the commit.
    pub fn load_from_assets(
        store: &dyn AssetStore,
        stem: &str,
        config: ModelConfig,
    ) -> Result<Self> {
        let graph = store.read(&format!("{stem}{GRAPH_SUFFIX}"))?;
        let weights = store.read(&format!("{stem}{WEIGHTS_SUFFIX}"))?;

        let base = Path::new(stem)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(stem);
        let staging = tempfile::tempdir().map_err(|e| HairSegError::FileSystem {
            path: std::env::temp_dir(),
            operation: "staging directory creation".to_string(),
            source: e,
        })?;
        let graph_path = staging.path().join(format!("{base}{GRAPH_SUFFIX}"));
        let weights_path = staging.path().join(format!("{base}{WEIGHTS_SUFFIX}"));
        for (path, data) in [(&graph_path, graph), (&weights_path, weights)] {
            fs::write(path, data).map_err(|e| HairSegError::FileSystem {
                path: path.clone(),
                operation: "asset staging".to_string(),
                source: e,
            })?;
        }

        let session = session_builder(&config)?
            .commit_from_file(&graph_path)
            .map_err(|e| HairSegError::Model {
                operation: format!("model load from assets: {stem}"),
                source: Box::new(e),
            })?;

        Self::from_session(session, config)
    }

    fn from_session(mut session: Session, config: ModelConfig) -> Result<Self> {
        // Static graphs report their spatial size; dynamic dims come back
        // negative and skip the check.
        if let Some(shape) = session
            .inputs
            .first()
            .and_then(|input| input.input_type.tensor_shape())
        {
            if shape.len() == 4 && shape[2] > 0 && shape[2] as u32 != config.target_size {
                return Err(HairSegError::Validation {
                    field: "target_size".to_string(),
                    reason: format!(
                        "is {} but the network input is {}",
                        config.target_size, shape[2]
                    ),
                });
            }
        }

        // Warm-up pass: binds the pooled intermediate memory before the
        // first real frame arrives.
        let size = config.target_size as usize;
        let data = Array4::<f32>::zeros((1, 3, size, size));
        session
            .run(ort::inputs![config.input_name.as_str() => TensorRef::from_array_view(&data).map_err(|e| HairSegError::Model {
                operation: "warm-up tensor creation".to_string(),
                source: Box::new(e),
            })?])
            .map_err(|e| HairSegError::Model {
                operation: "warm-up pass".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            config,
            session: Mutex::new(session),
        })
    }

    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl HairSegmentationModel for Model {
    fn segment(&self, frame: &RgbImage) -> Result<Mask> {
        let tensor = preprocess(
            frame,
            self.config.target_size,
            &self.config.mean,
            &self.config.norm,
        );
        let scores = self.predict(tensor.view())?;
        mask_from_scores(scores, self.config.target_size)
    }

    fn target_size(&self) -> u32 {
        self.config.target_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ArrayD<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(
            ort::inputs![self.config.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?],
        )?;
        let scores = outputs
            .get(self.config.output_name.as_str())
            .ok_or_else(|| HairSegError::Model {
                operation: format!("output port `{}` lookup", self.config.output_name),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no tensor bound to that name",
                )),
            })?;
        Ok(scores.try_extract_array::<f32>()?.to_owned())
    }
}

fn session_builder(config: &ModelConfig) -> Result<SessionBuilder> {
    let mut builder = SessionBuilder::new()
        .map_err(|e| HairSegError::Model {
            operation: "session builder initialization".to_string(),
            source: Box::new(e),
        })?
        .with_intra_threads(config.num_threads)
        .map_err(|e| HairSegError::Model {
            operation: "thread pool configuration".to_string(),
            source: Box::new(e),
        })?
        .with_memory_pattern(!config.reduced_memory)
        .map_err(|e| HairSegError::Model {
            operation: "memory pattern configuration".to_string(),
            source: Box::new(e),
        })?;

    if config.use_gpu {
        builder = builder
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(config.device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(config.device_id)
                    .build(),
            ])
            .map_err(|e| HairSegError::Model {
                operation: "execution provider setup".to_string(),
                source: Box::new(e),
            })?;
    }

    Ok(builder)
}

fn companion_paths(stem: &Path) -> (PathBuf, PathBuf) {
    let mut graph = stem.as_os_str().to_os_string();
    graph.push(GRAPH_SUFFIX);
    let mut weights = stem.as_os_str().to_os_string();
    weights.push(WEIGHTS_SUFFIX);
    (graph.into(), weights.into())
}

/// Convert a frame into the engine's `1x3xHxW` float layout.
///
/// The resize produces a fresh buffer at the target resolution, so the
/// caller's frame is never touched past this point. Mean subtraction and
/// normalization run on the raw `0..=255` channel values.
pub fn preprocess(
    frame: &RgbImage,
    target_size: u32,
    mean: &[f32; 3],
    norm: &[f32; 3],
) -> Array4<f32> {
    let resized = imageops::resize(frame, target_size, target_size, FilterType::Triangle);
    let mut tensor = resized
        .as_ndarray3()
        .slice_move(s![NewAxis, .., .., ..])
        .mapv(f32::from);
    for (c, mut channel) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        channel.map_inplace(|v| *v = (*v - mean[c]) * norm[c]);
    }
    tensor
}

/// Wrap raw network output as a square mask, rejecting any shape that does
/// not hold exactly `target_size * target_size` scores.
pub fn mask_from_scores(scores: ArrayD<f32>, target_size: u32) -> Result<Mask> {
    let expected = (target_size as usize).pow(2);
    if scores.len() != expected {
        return Err(HairSegError::Model {
            operation: "mask extraction".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "network returned {} scores for a {size}x{size} mask",
                    scores.len(),
                    size = target_size
                ),
            )),
        });
    }

    let (data, _) = scores.into_raw_vec_and_offset();
    ImageBuffer::from_raw(target_size, target_size, data).ok_or_else(|| {
        HairSegError::ImageProcessing {
            operation: "mask buffer creation".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "score data does not fill the mask dimensions",
            )),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn companion_paths_append_suffixes() {
        let (graph, weights) = companion_paths(Path::new("models/hairseg.v2"));
        assert_eq!(graph, PathBuf::from("models/hairseg.v2.onnx"));
        assert_eq!(weights, PathBuf::from("models/hairseg.v2.bin"));
    }

    #[test]
    fn default_config_matches_shipped_model_ports() {
        let config = ModelConfig::default();
        assert_eq!(config.input_name, "input");
        assert_eq!(config.output_name, "1006");
        assert_eq!(config.target_size, 512);
    }

    #[test]
    fn load_rejects_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("absent");
        let err = Model::load(&stem, ModelConfig::default()).unwrap_err();
        assert!(matches!(err, HairSegError::FileSystem { .. }));
    }

    #[test]
    fn load_requires_the_weight_companion_too() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("hairseg");
        fs::write(dir.path().join("hairseg.onnx"), b"graph").unwrap();

        let err = Model::load(&stem, ModelConfig::default()).unwrap_err();
        match err {
            HairSegError::FileSystem { path, .. } => {
                assert_eq!(path, dir.path().join("hairseg.bin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn preprocess_applies_mean_and_norm_per_channel() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([255, 0, 128]));
        let tensor = preprocess(&frame, 1, &[0.0, 0.0, 128.0], &[1.0 / 255.0, 1.0, 0.5]);

        assert_eq!(tensor.shape(), &[1, 3, 1, 1]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 2, 0, 0]], 0.0);
    }

    #[test]
    fn preprocess_resizes_to_target() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let tensor = preprocess(&frame, 16, &[0.0; 3], &[1.0; 3]);
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
    }

    #[test]
    fn mask_from_scores_keeps_square_shape() {
        let scores = ArrayD::<f32>::zeros(vec![1, 1, 4, 4]);
        let mask = mask_from_scores(scores, 4).unwrap();
        assert_eq!(mask.dimensions(), (4, 4));
    }

    #[test]
    fn mask_from_scores_rejects_shape_mismatch() {
        let scores = ArrayD::<f32>::zeros(vec![1, 2, 4, 4]);
        let err = mask_from_scores(scores, 4).unwrap_err();
        assert!(matches!(err, HairSegError::Model { .. }));
    }
}
