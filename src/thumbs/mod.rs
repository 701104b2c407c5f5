//! Thumbnail generation.
//!
//! Thumbnails are fixed-size JPEG crops anchored at a focal position: the
//! largest crop window matching the target aspect ratio is slid along
//! whichever axis has slack, by a caller-supplied percentage. Used on upload
//! and again when the user repositions the focal point.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ThumbnailConfig;

#[derive(Debug, Error)]
pub enum ThumbError {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}

/// Percentage focal point within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbPosition {
    pub x: u8,
    pub y: u8,
}

impl Default for ThumbPosition {
    /// Slightly above center; faces tend to sit in the upper half.
    fn default() -> Self {
        Self { x: 50, y: 25 }
    }
}

impl ThumbPosition {
    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x: x.min(100),
            y: y.min(100),
        }
    }
}

/// Crop window in source pixel coordinates: (x, y, width, height).
///
/// The window is the largest rectangle of the target aspect ratio that fits
/// the source, shifted along the slack axis by the focal percentage and
/// clamped to the source bounds.
pub fn crop_window(
    src_w: u32,
    src_h: u32,
    target_w: u32,
    target_h: u32,
    pos: ThumbPosition,
) -> (u32, u32, u32, u32) {
    let src_ratio = src_w as f64 / src_h as f64;
    let target_ratio = target_w as f64 / target_h as f64;

    if src_ratio > target_ratio {
        // Source is proportionally wider: full height, horizontal slack.
        let crop_w = ((src_h as f64 * target_ratio).round() as u32).min(src_w).max(1);
        let slack = src_w - crop_w;
        let x = (slack as f64 * pos.x as f64 / 100.0).round() as u32;
        (x.min(slack), 0, crop_w, src_h)
    } else {
        // Source is proportionally taller (or equal): full width, vertical slack.
        let crop_h = ((src_w as f64 / target_ratio).round() as u32).min(src_h).max(1);
        let slack = src_h - crop_h;
        let y = (slack as f64 * pos.y as f64 / 100.0).round() as u32;
        (0, y.min(slack), src_w, crop_h)
    }
}

/// Generates focal-point thumbnails at a fixed target size.
pub struct Thumbnailer {
    width: u32,
    height: u32,
    quality: u8,
}

impl Thumbnailer {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            quality: config.jpeg_quality,
        }
    }

    /// Generate a JPEG thumbnail from raw image bytes.
    ///
    /// A decode failure is surfaced as an error; callers must not substitute
    /// a blank thumbnail for it. Batch callers catch and count instead of
    /// propagating.
    pub fn generate(&self, data: &[u8], pos: ThumbPosition) -> Result<Vec<u8>, ThumbError> {
        let img = image::load_from_memory(data).map_err(ThumbError::Decode)?;

        let (cx, cy, cw, ch) = crop_window(img.width(), img.height(), self.width, self.height, pos);
        let cropped = img.crop_imm(cx, cy, cw, ch);
        let resized = cropped.resize_exact(self.width, self.height, imageops::FilterType::Lanczos3);

        // Paint a neutral background first so source transparency does not
        // come out black in the JPEG.
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, image::Rgba([240, 240, 240, 255]));
        imageops::overlay(&mut canvas, &resized.to_rgba8(), 0, 0);
        let flat = DynamicImage::ImageRgba8(canvas).to_rgb8();

        let mut out = Vec::new();
        let mut cursor = Cursor::new(&mut out);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, self.quality);
        flat.write_with_encoder(encoder).map_err(ThumbError::Encode)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(width: u32, height: u32) -> ThumbnailConfig {
        ThumbnailConfig {
            width,
            height,
            jpeg_quality: 85,
        }
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn square_source_non_square_target_centers_at_50() {
        // Square source, 600x400 target: vertical axis has the slack.
        let (x, y, w, h) = crop_window(1000, 1000, 600, 400, ThumbPosition::new(50, 50));
        assert_eq!(x, 0);
        assert_eq!(w, 1000);
        assert_eq!(h, 667);
        // Centered along the cropped axis.
        assert_eq!(y, (1000 - 667 + 1) / 2);
        assert!(y + h <= 1000);
    }

    #[test]
    fn position_zero_pins_top_left() {
        let (x, y, _, _) = crop_window(1000, 1000, 600, 400, ThumbPosition::new(0, 0));
        assert_eq!((x, y), (0, 0));

        let (x, y, _, _) = crop_window(2000, 500, 600, 400, ThumbPosition::new(0, 0));
        assert_eq!((x, y), (0, 0));
    }

    #[test]
    fn position_hundred_pins_bottom_right() {
        let (x, y, w, h) = crop_window(1000, 1000, 600, 400, ThumbPosition::new(100, 100));
        assert_eq!(x + w, 1000);
        assert_eq!(y + h, 1000);

        let (x, y, w, h) = crop_window(2000, 500, 600, 400, ThumbPosition::new(100, 100));
        assert_eq!(x + w, 2000);
        assert_eq!(y + h, 500);
    }

    #[test]
    fn wider_source_slides_horizontally() {
        // 2000x500 source, 600x400 target: crop is full-height, 750 wide.
        let (x, y, w, h) = crop_window(2000, 500, 600, 400, ThumbPosition::new(50, 50));
        assert_eq!((y, h), (0, 500));
        assert_eq!(w, 750);
        assert_eq!(x, (2000 - 750 + 1) / 2);
    }

    #[test]
    fn exact_ratio_has_no_slack() {
        let (x, y, w, h) = crop_window(1200, 800, 600, 400, ThumbPosition::new(100, 100));
        assert_eq!((x, y, w, h), (0, 0, 1200, 800));
    }

    #[test]
    fn generates_fixed_size_jpeg() {
        let src = RgbaImage::from_pixel(800, 800, image::Rgba([200, 30, 30, 255]));
        let thumb = Thumbnailer::new(&test_config(600, 400));
        let jpeg = thumb.generate(&png_bytes(&src), ThumbPosition::default()).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (600, 400));
        assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn focal_position_selects_region() {
        // Left half red, right half blue; square target on a wide source.
        let mut src = RgbaImage::from_pixel(400, 100, image::Rgba([0, 0, 255, 255]));
        for y in 0..100 {
            for x in 0..200 {
                src.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
            }
        }
        let bytes = png_bytes(&src);
        let thumb = Thumbnailer::new(&test_config(100, 100));

        let left = thumb.generate(&bytes, ThumbPosition::new(0, 50)).unwrap();
        let left_img = image::load_from_memory(&left).unwrap().to_rgb8();
        let p = left_img.get_pixel(50, 50);
        assert!(p[0] > 180 && p[2] < 80, "expected red, got {p:?}");

        let right = thumb.generate(&bytes, ThumbPosition::new(100, 50)).unwrap();
        let right_img = image::load_from_memory(&right).unwrap().to_rgb8();
        let p = right_img.get_pixel(50, 50);
        assert!(p[2] > 180 && p[0] < 80, "expected blue, got {p:?}");
    }

    #[test]
    fn transparency_becomes_neutral_fill_not_black() {
        let src = RgbaImage::from_pixel(200, 200, image::Rgba([0, 0, 0, 0]));
        let thumb = Thumbnailer::new(&test_config(100, 100));
        let jpeg = thumb.generate(&png_bytes(&src), ThumbPosition::default()).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let p = decoded.get_pixel(50, 50);
        assert!(p[0] > 200 && p[1] > 200 && p[2] > 200, "expected neutral fill, got {p:?}");
    }

    #[test]
    fn undecodable_source_is_an_explicit_error() {
        let thumb = Thumbnailer::new(&test_config(600, 400));
        let err = thumb.generate(b"definitely not an image", ThumbPosition::default());
        assert!(matches!(err, Err(ThumbError::Decode(_))));
    }

    #[test]
    fn position_is_clamped() {
        let pos = ThumbPosition::new(250, 180);
        assert_eq!((pos.x, pos.y), (100, 100));
    }

    #[test]
    fn default_position_sits_above_center() {
        let pos = ThumbPosition::default();
        assert_eq!((pos.x, pos.y), (50, 25));
    }
}
