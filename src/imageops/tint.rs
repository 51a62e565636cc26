use anyhow::{ensure, Result};
use image::{ImageBuffer, Luma, Pixel, Primitive, Rgb, RgbImage};
use num_traits::AsPrimitive;
use rayon::prelude::*;

use crate::imageops::normalized_max;

/// Blend a solid color into the frame in place, weighted per pixel by the
/// mask.
///
/// Each channel is computed as `color * alpha + original * (1 - alpha)` in
/// f32 and truncated back to u8, with alpha clamped to `[0, 1]`. Rows are
/// processed in parallel.
pub fn tint<SM>(
    frame: &mut RgbImage,
    mask: &ImageBuffer<Luma<SM>, Vec<SM>>,
    color: Rgb<u8>,
) -> Result<()>
where
    Luma<SM>: Pixel<Subpixel = SM>,
    SM: Primitive + AsPrimitive<f32> + Send + Sync + 'static,
{
    ensure!(
        frame.dimensions() == mask.dimensions(),
        "frame and mask dimensions do not match: frame {:?}, mask {:?}",
        frame.dimensions(),
        mask.dimensions()
    );

    let width = frame.width() as usize;
    if width == 0 {
        return Ok(());
    }

    let max: f32 = normalized_max::<SM>();
    let Rgb([overlay_r, overlay_g, overlay_b]) = color;

    frame
        .par_chunks_exact_mut(width * 3)
        .zip(mask.par_chunks_exact(width))
        .for_each(|(row, alphas)| {
            for (pixel, &alpha) in row.chunks_exact_mut(3).zip(alphas) {
                let weight = (alpha.as_() / max).clamp(0.0, 1.0);
                pixel[0] = mix(overlay_r, pixel[0], weight);
                pixel[1] = mix(overlay_g, pixel[1], weight);
                pixel[2] = mix(overlay_b, pixel[2], weight);
            }
        });

    Ok(())
}

fn mix(overlay: u8, base: u8, weight: f32) -> u8 {
    (f32::from(overlay) * weight + f32::from(base) * (1.0 - weight)) as u8
}
