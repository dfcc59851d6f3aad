//! Pure raster steps of the composition pipeline.
//!
//! Nothing here touches the network or the filesystem; given the same inputs
//! every function returns the same pixels.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{ComposeError, Result};

/// Where the resized cutout landed on the canvas. Offsets may be negative
/// when the cutout is larger than the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Tight bounding box `(x, y, width, height)` of all pixels with non-zero alpha.
pub fn foreground_bounds(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, px) in img.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        found = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crop away the transparent margin around the foreground.
pub fn crop_to_foreground(img: &RgbaImage) -> Result<RgbaImage> {
    let (x, y, w, h) = foreground_bounds(img).ok_or(ComposeError::EmptyForeground)?;
    Ok(imageops::crop_imm(img, x, y, w, h).to_image())
}

/// Width that keeps the aspect ratio when `height` is scaled to `target`.
///
/// Rounds to the nearest pixel (halves round up) and never returns 0.
pub fn scaled_width(width: u32, height: u32, target: u32) -> Result<u32> {
    if height == 0 {
        return Err(ComposeError::DegenerateCrop);
    }
    let (w, h, t) = (u64::from(width), u64::from(height), u64::from(target));
    let scaled = (2 * w * t + h) / (2 * h);
    Ok(u32::try_from(scaled).unwrap_or(u32::MAX).max(1))
}

/// Largest pixel area the resize step may allocate, for the output and for
/// the intermediate column pass alike (about 100 MB of RGBA8).
pub const MAX_RESIZE_PIXELS: u64 = 25_000_000;

/// Scale so the height is exactly `target`, using Lanczos3 resampling.
///
/// Fails with [`ComposeError::ResultTooLarge`] instead of allocating past
/// [`MAX_RESIZE_PIXELS`]; a thin sliver scaled to a large height would
/// otherwise exhaust memory.
pub fn resize_to_height(img: &RgbaImage, target: u32) -> Result<RgbaImage> {
    let (w, h) = img.dimensions();
    let new_w = scaled_width(w, h, target)?;
    let widest = u64::from(new_w.max(w));
    if widest * u64::from(target) > MAX_RESIZE_PIXELS {
        return Err(ComposeError::ResultTooLarge {
            width: new_w,
            height: target,
        });
    }
    Ok(imageops::resize(img, new_w, target, FilterType::Lanczos3))
}

/// Top-left offset that centres `item` on `canvas`, using floor division.
pub fn center_offset(canvas: (u32, u32), item: (u32, u32)) -> (i64, i64) {
    let dx = i64::from(canvas.0) - i64::from(item.0);
    let dy = i64::from(canvas.1) - i64::from(item.1);
    (dx.div_euclid(2), dy.div_euclid(2))
}

/// Steps 2-7: crop, resize, centre and paste `cutout` onto `canvas`.
///
/// `canvas` is taken by value; callers pass a copy of the template.
pub fn compose_onto(
    mut canvas: RgbaImage,
    cutout: &RgbaImage,
    max_height: u32,
) -> Result<(RgbaImage, Placement)> {
    let cropped = crop_to_foreground(cutout)?;
    let resized = resize_to_height(&cropped, max_height)?;
    let (x, y) = center_offset(canvas.dimensions(), resized.dimensions());
    // Pixels outside the canvas are clipped; the cutout's alpha is the mask.
    imageops::overlay(&mut canvas, &resized, x, y);

    let placement = Placement {
        x,
        y,
        width: resized.width(),
        height: resized.height(),
    };
    Ok((canvas, placement))
}

/// Lossless PNG encoding; keeps the alpha channel.
pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ComposeError::Encode(e.to_string()))?;
    Ok(buf)
}
