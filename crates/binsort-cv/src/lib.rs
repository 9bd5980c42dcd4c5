//! Binsort vision pipeline
//!
//! Turns per-frame object detections into debounced actuation commands and
//! keeps an append-only history of every activation.

pub mod bbox;
pub mod detection;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use bbox::{BBox, Detection};
pub use detection::{FrameAggregate, PipelineConfig, ReplayDetector};
pub use error::PipelineError;
pub use history::{HistoryRecord, HistoryRecorder};
pub use pipeline::{FrameOutcome, Pipeline, RunSummary, StopHandle};
pub use publish::{LogPublisher, MqttPublisher, RecordingPublisher};
pub use source::{Frame, ImageSource, MemorySource, SourceSpec};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Seams to the external collaborators of the pipeline
pub mod traits {
    use super::*;
    use binsort_core::{ClassNames, Command};

    /// Blocking frame acquisition. `Ok(None)` means the source is exhausted.
    pub trait FrameSource {
        fn next_frame(&mut self) -> Result<Option<Frame>>;
    }

    /// Blocking object detection over one frame
    pub trait ObjectDetector {
        fn detect(&mut self, frame: &Frame, input_size: u32) -> Result<Vec<Detection>>;
        fn class_names(&self) -> &ClassNames;
    }

    /// Delivery of a fired command to the actuation channel.
    ///
    /// Must not block on an unreachable channel. `Ok` means the command was
    /// accepted for delivery; for MQTT that is a queued request, not a broker
    /// acknowledgement. Under `AdvancePolicy::OnConfirmed` the lockout is
    /// confirmed on that signal.
    pub trait CommandPublisher {
        fn publish(&mut self, command: Command) -> Result<()>;
    }

    impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            (**self).next_frame()
        }
    }

    impl<D: ObjectDetector + ?Sized> ObjectDetector for Box<D> {
        fn detect(&mut self, frame: &Frame, input_size: u32) -> Result<Vec<Detection>> {
            (**self).detect(frame, input_size)
        }

        fn class_names(&self) -> &ClassNames {
            (**self).class_names()
        }
    }

    impl<P: CommandPublisher + ?Sized> CommandPublisher for Box<P> {
        fn publish(&mut self, command: Command) -> Result<()> {
            (**self).publish(command)
        }
    }
}
