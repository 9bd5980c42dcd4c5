//! Scripted detector
//!
//! Plays back precomputed detections from a JSON script, one entry per
//! frame, in place of a live model:
//!
//! ```json
//! {
//!   "names": { "0": "cardboard_paper", "1": "plastic", "2": "metal" },
//!   "frames": [
//!     [],
//!     [{ "class_id": 0, "confidence": 0.92, "bbox": [12, 30, 200, 180] }]
//!   ]
//! }
//! ```
//!
//! Frames past the end of the script get no detections.

use crate::bbox::Detection;
use crate::error::PipelineError;
use crate::source::Frame;
use crate::traits::ObjectDetector;
use crate::Result;
use binsort_core::ClassNames;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ReplayScript {
    names: ClassNames,
    #[serde(default)]
    frames: Vec<Vec<Detection>>,
}

#[derive(Debug)]
pub struct ReplayDetector {
    names: ClassNames,
    frames: VecDeque<Vec<Detection>>,
}

impl ReplayDetector {
    pub fn new(names: ClassNames, frames: Vec<Vec<Detection>>) -> Self {
        Self {
            names,
            frames: frames.into(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model_error = |reason: String| PipelineError::Model(format!("{:?}: {}", path, reason));

        let text = std::fs::read_to_string(path).map_err(|e| model_error(e.to_string()))?;
        let script: ReplayScript =
            serde_json::from_str(&text).map_err(|e| model_error(e.to_string()))?;

        info!(
            classes = script.names.len(),
            frames = script.frames.len(),
            path = ?path,
            "Loaded detection script"
        );
        Ok(Self::new(script.names, script.frames))
    }

    /// Replace the class table shipped with the script
    pub fn with_names(mut self, names: ClassNames) -> Self {
        self.names = names;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ObjectDetector for ReplayDetector {
    /// Scripted detections are already in frame coordinates, so the input
    /// size is not used.
    fn detect(&mut self, _frame: &Frame, _input_size: u32) -> Result<Vec<Detection>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }
}
