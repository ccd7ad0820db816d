//! Bounds image size before embedding.

use image::RgbImage;
use image::imageops::{self, FilterType};

/// Downscale `image` so its longer side is at most `max_dimension`.
///
/// Images already within the bound are returned as-is. Otherwise the longer
/// side becomes exactly `max_dimension` and the shorter side is scaled by the
/// same factor (rounded, at least 1px), resampled with Lanczos3.
pub fn resize(image: RgbImage, max_dimension: u32) -> RgbImage {
    assert!(max_dimension > 0, "max_dimension must be positive");

    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image;
    }

    let (new_width, new_height) = bounded_dimensions(width, height, max_dimension);
    imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

/// Target dimensions for an image exceeding `max_dimension`
pub fn bounded_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scale_short = |short: u32, long: u32| -> u32 {
        let scaled = (short as u64 * max_dimension as u64 + long as u64 / 2) / long as u64;
        (scaled as u32).max(1)
    };

    if width >= height {
        (max_dimension, scale_short(height, width))
    } else {
        (scale_short(width, height), max_dimension)
    }
}
