//! Frame sources
//!
//! Capture devices and video decoding live outside this crate. What ships
//! here are still-image sources: a single picture, a directory of pictures,
//! or frames already held in memory.

use crate::error::PipelineError;
use crate::traits::FrameSource;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use image::RgbImage;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One acquired frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position in acquisition order, starting at 0
    pub index: u64,
    pub image: RgbImage,
    pub origin: Option<PathBuf>,
}

/// What the operator asked to read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Camera(u32),
    Path(PathBuf),
}

impl SourceSpec {
    /// Purely numeric strings name a camera device, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = trimmed.parse() {
                return SourceSpec::Camera(index);
            }
        }
        SourceSpec::Path(PathBuf::from(raw))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "camera {}", index),
            SourceSpec::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reads frames from image files, in file name order for directories
#[derive(Debug)]
pub struct ImageSource {
    pending: VecDeque<PathBuf>,
    next_index: u64,
}

impl ImageSource {
    pub fn open(spec: &SourceSpec) -> Result<Self> {
        match spec {
            SourceSpec::Camera(_) => Err(PipelineError::source_unavailable(
                spec.to_string(),
                "camera capture is not available in this build",
            )
            .into()),
            SourceSpec::Path(path) => Self::open_path(path),
        }
    }

    fn open_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();

        if path.is_dir() {
            let mut files = Vec::new();
            let entries = fs::read_dir(path)
                .map_err(|e| PipelineError::source_unavailable(&name, e.to_string()))?;
            for entry in entries {
                let entry_path = entry
                    .with_context(|| format!("Failed to read directory: {:?}", path))?
                    .path();
                if entry_path.is_file() && ImageUtils::is_supported(&entry_path) {
                    files.push(entry_path);
                }
            }

            if files.is_empty() {
                return Err(
                    PipelineError::source_unavailable(name, "directory contains no images").into(),
                );
            }
            files.sort();
            debug!(frames = files.len(), dir = ?path, "Opened image directory");
            return Ok(Self::from_paths(files));
        }

        if path.is_file() {
            if !ImageUtils::is_supported(path) {
                return Err(PipelineError::source_unavailable(
                    name,
                    "unsupported media type (only still images can be read)",
                )
                .into());
            }
            return Ok(Self::from_paths(vec![path.to_path_buf()]));
        }

        Err(PipelineError::source_unavailable(name, "no such file or directory").into())
    }

    fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            pending: paths.into(),
            next_index: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.pending.pop_front() {
            match ImageUtils::load_rgb(&path) {
                Ok(image) => {
                    let frame = Frame {
                        index: self.next_index,
                        image,
                        origin: Some(path),
                    };
                    self.next_index += 1;
                    return Ok(Some(frame));
                }
                Err(e) => {
                    warn!(path = ?path, error = %format!("{e:#}"), "Skipping unreadable frame")
                }
            }
        }
        Ok(None)
    }
}

/// Serves frames from memory
#[derive(Debug, Default)]
pub struct MemorySource {
    images: VecDeque<RgbImage>,
    next_index: u64,
}

impl MemorySource {
    pub fn new(images: Vec<RgbImage>) -> Self {
        Self {
            images: images.into(),
            next_index: 0,
        }
    }

    /// `count` blank frames of the given size
    pub fn blank(count: usize, width: u32, height: u32) -> Self {
        Self::new(vec![RgbImage::new(width, height); count])
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.images.pop_front().map(|image| {
            let frame = Frame {
                index: self.next_index,
                image,
                origin: None,
            };
            self.next_index += 1;
            frame
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_parsing() {
        assert_eq!(SourceSpec::parse("0"), SourceSpec::Camera(0));
        assert_eq!(SourceSpec::parse("12"), SourceSpec::Camera(12));
        assert_eq!(SourceSpec::parse("video.mp4"), SourceSpec::Path("video.mp4".into()));
        assert_eq!(SourceSpec::parse("-1"), SourceSpec::Path("-1".into()));
        assert_eq!(SourceSpec::parse(""), SourceSpec::Path("".into()));
    }

    fn unavailable(result: Result<ImageSource>) -> bool {
        matches!(
            result.unwrap_err().downcast_ref::<PipelineError>(),
            Some(PipelineError::SourceUnavailable { .. })
        )
    }

    #[test]
    fn test_camera_is_unavailable() {
        assert!(unavailable(ImageSource::open(&SourceSpec::Camera(0))));
    }

    #[test]
    fn test_missing_path_is_unavailable() {
        assert!(unavailable(ImageSource::open(&SourceSpec::parse("no/such/dir"))));
    }

    #[test]
    fn test_video_file_is_unavailable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let clip = dir.path().join("clip.mp4");
        fs::write(&clip, b"not really a video")?;
        assert!(unavailable(ImageSource::open(&SourceSpec::Path(clip))));
        Ok(())
    }

    #[test]
    fn test_directory_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        ImageUtils::save_jpeg(&RgbImage::new(8, 8), dir.path().join("b.jpg"))?;
        ImageUtils::save_jpeg(&RgbImage::new(4, 4), dir.path().join("a.jpg"))?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;
        fs::write(dir.path().join("c.png"), "corrupt")?;

        let mut source = ImageSource::open(&SourceSpec::Path(dir.path().to_path_buf()))?;
        assert_eq!(source.remaining(), 3);

        let first = source.next_frame()?.expect("first frame");
        assert_eq!(first.index, 0);
        assert_eq!(first.image.dimensions(), (4, 4));

        let second = source.next_frame()?.expect("second frame");
        assert_eq!(second.index, 1);
        assert_eq!(second.image.dimensions(), (8, 8));

        // The corrupt png is skipped and the source ends.
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_directory_is_unavailable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(unavailable(ImageSource::open(&SourceSpec::Path(
            dir.path().to_path_buf()
        ))));
        Ok(())
    }

    #[test]
    fn test_memory_source() -> Result<()> {
        let mut source = MemorySource::blank(2, 4, 4);
        assert_eq!(source.next_frame()?.map(|f| f.index), Some(0));
        assert_eq!(source.next_frame()?.map(|f| f.index), Some(1));
        assert!(source.next_frame()?.is_none());
        Ok(())
    }
}
