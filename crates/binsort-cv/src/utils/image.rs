//! Image loading and saving helpers

use crate::Result;
use anyhow::Context;
use image::{ImageFormat, RgbImage};
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// File extensions accepted as still-image frames
    pub const SUPPORTED_EXTENSIONS: [&'static str; 4] = ["png", "jpg", "jpeg", "bmp"];

    /// Load image as 8-bit RGB
    pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(img.to_rgb8())
    }

    /// Save as JPEG regardless of the path's extension
    pub fn save_jpeg<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
        image
            .save_with_format(&path, ImageFormat::Jpeg)
            .with_context(|| format!("Failed to save image: {:?}", path.as_ref()))
    }

    pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| Self::SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(ImageUtils::is_supported("frame.JPG"));
        assert!(ImageUtils::is_supported("dir/frame.png"));
        assert!(!ImageUtils::is_supported("clip.mp4"));
        assert!(!ImageUtils::is_supported("noext"));
    }

    #[test]
    fn test_jpeg_round_trip_dimensions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.jpg");

        ImageUtils::save_jpeg(&RgbImage::new(32, 24), &path)?;
        let loaded = ImageUtils::load_rgb(&path)?;

        assert_eq!(loaded.dimensions(), (32, 24));
        Ok(())
    }
}
