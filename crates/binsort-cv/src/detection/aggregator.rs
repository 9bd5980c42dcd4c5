//! Per-frame reduction of raw detections

use super::overlay::OverlayItem;
use crate::bbox::Detection;
use binsort_core::{ClassConfidenceMap, ClassNames, Command, CommandTable};
use serde::Serialize;

/// Everything a frame's decision depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameAggregate {
    pub classes: ClassConfidenceMap,
    /// Detections that passed the confidence floor, duplicates included
    pub object_count: usize,
    pub overlays: Vec<OverlayItem>,
}

impl FrameAggregate {
    /// Filter, label and group one frame's detections. Nothing carries over
    /// from previous frames.
    pub fn from_detections(detections: &[Detection], names: &ClassNames) -> Self {
        let mut aggregate = FrameAggregate::default();

        for detection in detections {
            let label = names.label(detection.class_id);
            if !aggregate.classes.observe(&label, detection.confidence) {
                continue;
            }

            aggregate.object_count += 1;
            aggregate.overlays.push(OverlayItem {
                class_id: detection.class_id,
                label,
                confidence: detection.confidence,
                bbox: detection.bbox,
            });
        }

        aggregate
    }

    /// Winning label and its confidence
    pub fn best(&self) -> Option<(&str, f64)> {
        self.classes.best()
    }

    pub fn command(&self, table: &CommandTable) -> Option<Command> {
        table.classify(&self.classes)
    }
}
