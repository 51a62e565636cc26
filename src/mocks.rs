use crate::errors::Result;
use crate::model::Mask;
use crate::traits::HairSegmentationModel;
use image::{ImageBuffer, Luma, RgbImage};
use ndarray::prelude::*;

/// Mock segmentation model returning a constant mask.
///
/// Keeps compositor behavior testable without a model file or an engine
/// runtime.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub target_size: u32,
    pub mask_value: f32,
}

impl MockSegmentationModel {
    pub const fn new(target_size: u32) -> Self {
        Self {
            target_size,
            mask_value: 0.0,
        }
    }

    pub const fn with_mask_value(target_size: u32, mask_value: f32) -> Self {
        Self {
            target_size,
            mask_value,
        }
    }
}

impl HairSegmentationModel for MockSegmentationModel {
    fn segment(&self, _frame: &RgbImage) -> Result<Mask> {
        Ok(ImageBuffer::from_pixel(
            self.target_size,
            self.target_size,
            Luma([self.mask_value]),
        ))
    }

    fn target_size(&self) -> u32 {
        self.target_size
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ArrayD<f32>> {
        let shape = tensor.shape();
        Ok(ArrayD::from_elem(
            vec![shape[0], 1, shape[2], shape[3]],
            self.mask_value,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_mask_matches_target_size() {
        let mock = MockSegmentationModel::new(256);
        let frame = RgbImage::new(640, 480);

        let mask = mock.segment(&frame).unwrap();
        assert_eq!(mask.dimensions(), (256, 256));
    }

    #[test]
    fn mock_predict_returns_single_channel_scores() {
        let mock = MockSegmentationModel::with_mask_value(8, 0.5);
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));

        let scores = mock.predict(tensor.view()).unwrap();
        assert_eq!(scores.shape(), &[1, 1, 8, 8]);
        assert!(scores.iter().all(|&v| v == 0.5));
    }
}
