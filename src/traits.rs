use crate::errors::Result;
use crate::model::Mask;
use image::RgbImage;
use ndarray::prelude::*;

/// Abstraction over the hair segmentation model.
///
/// The compositor depends on this seam instead of the concrete ONNX-backed
/// model so tests can substitute deterministic mocks.
pub trait HairSegmentationModel: Send + Sync {
    /// Run one forward pass on the frame and return the hair probability
    /// mask at the model's native resolution.
    fn segment(&self, frame: &RgbImage) -> Result<Mask>;

    /// Side length of the square input the network was trained on.
    fn target_size(&self) -> u32;

    /// Low-level forward pass on an already prepared `1x3xHxW` tensor.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ArrayD<f32>>;
}

/// Read-only access to packaged assets.
///
/// Stands in for whatever container ships the model files (an app bundle,
/// an archive, a plain directory). Names are logical, not paths.
pub trait AssetStore: Send + Sync {
    /// Return the full contents of the named asset.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}
