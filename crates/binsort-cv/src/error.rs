use thiserror::Error;

/// Failures the pipeline distinguishes when deciding whether to stop or
/// carry on with the next frame.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not open source '{source_name}': {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Detection model failed: {0}")]
    Model(String),

    #[error("Failed to persist history to {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Failed to publish {command} to '{topic}': {reason}")]
    Publish {
        command: String,
        topic: String,
        reason: String,
    },
}

impl PipelineError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
