use image::{imageops, imageops::FilterType, Rgb, RgbImage};

use crate::{
    errors::{HairSegError, Result},
    imageops::tint,
    model::Mask,
    traits::HairSegmentationModel,
};

/// Overlay colors in frame channel order (RGB), cycled one entry per drawn
/// frame.
pub const PALETTE: [Rgb<u8>; 8] = [
    Rgb([255, 0, 0]),
    Rgb([0, 85, 255]),
    Rgb([0, 170, 255]),
    Rgb([85, 0, 255]),
    Rgb([170, 0, 255]),
    Rgb([0, 255, 0]),
    Rgb([255, 255, 170]),
    Rgb([255, 255, 255]),
];

/// Blends a cycling overlay color into frames wherever the model sees
/// hair.
///
/// The color index is part of the compositor state: each successful draw
/// advances it by one, wrapping back to the first entry after the last.
/// Failed draws leave the index untouched.
pub struct Compositor<M> {
    model: M,
    color_index: usize,
}

impl<M: HairSegmentationModel> Compositor<M> {
    pub const fn new(model: M) -> Self {
        Self {
            model,
            color_index: 0,
        }
    }

    /// Run segmentation on the frame without compositing.
    pub fn segment(&self, frame: &RgbImage) -> Result<Mask> {
        self.model.segment(frame)
    }

    /// Segment the frame and blend the current overlay color into it in
    /// place, weighted per pixel by the hair probability.
    pub fn draw(&mut self, frame: &mut RgbImage) -> Result<()> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(HairSegError::Validation {
                field: "frame".to_string(),
                reason: "has zero width or height".to_string(),
            });
        }

        let mask = self.model.segment(frame)?;
        let mask = imageops::resize(&mask, width, height, FilterType::Triangle);
        tint(frame, &mask, PALETTE[self.color_index]).map_err(|e| {
            HairSegError::ImageProcessing {
                operation: "overlay blend".to_string(),
                source: e.into(),
            }
        })?;

        self.color_index = (self.color_index + 1) % PALETTE.len();
        Ok(())
    }

    /// Index of the color the next draw will use.
    pub const fn color_index(&self) -> usize {
        self.color_index
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Swap in a different model, returning the previous one.
    ///
    /// Dropping the returned model releases the old session and its pooled
    /// memory, so repeated loads never accumulate.
    pub fn replace_model(&mut self, model: M) -> M {
        std::mem::replace(&mut self.model, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmentationModel;

    #[test]
    fn palette_has_eight_distinct_entries() {
        for (i, a) in PALETTE.iter().enumerate() {
            for b in &PALETTE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn draw_rejects_empty_frames() {
        let mut compositor = Compositor::new(MockSegmentationModel::new(8));
        let mut frame = RgbImage::new(0, 0);
        let err = compositor.draw(&mut frame).unwrap_err();
        assert!(matches!(err, HairSegError::Validation { .. }));
        assert_eq!(compositor.color_index(), 0);
    }

    #[test]
    fn failed_draw_does_not_advance_the_color() {
        let mut compositor = Compositor::new(MockSegmentationModel::new(8));
        let mut frame = RgbImage::new(4, 4);
        compositor.draw(&mut frame).unwrap();
        assert_eq!(compositor.color_index(), 1);

        let mut empty = RgbImage::new(0, 0);
        assert!(compositor.draw(&mut empty).is_err());
        assert_eq!(compositor.color_index(), 1);
    }
}
