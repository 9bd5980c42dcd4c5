//! Per-frame detection handling

pub mod aggregator;
pub mod config;
pub mod overlay;
pub mod replay;

pub use aggregator::FrameAggregate;
pub use config::{HistoryConfig, MqttConfig, PipelineConfig};
pub use overlay::{Hud, OverlayItem, annotate};
pub use replay::ReplayDetector;
