//! Command line arguments

use anyhow::Result;
use binsort_core::AdvancePolicy;
use binsort_cv::PipelineConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "binsort",
    version,
    about = "Sends recycling bin commands from object detections"
)]
pub struct Args {
    /// Detection script standing in for the model
    #[arg(long)]
    pub model: PathBuf,
    /// Camera index, image file or image directory
    #[arg(long, default_value = "0")]
    pub source: String,
    /// Model input size in pixels
    #[arg(long)]
    pub resolution: Option<u32>,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Class names file overriding the model's own table
    #[arg(long)]
    pub names: Option<PathBuf>,
    #[arg(long)]
    pub broker: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long)]
    pub history_dir: Option<PathBuf>,
    /// Minimum seconds between two activations
    #[arg(long)]
    pub lockout_secs: Option<f64>,
    /// Start from the production preset (10 minute lockout)
    #[arg(long, conflicts_with = "config")]
    pub production: bool,
    /// Only start the lockout once publish and history both succeeded
    #[arg(long)]
    pub confirm_before_lockout: bool,
    /// Log commands instead of publishing them
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Config file (or preset) with command line overrides applied
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None if self.production => PipelineConfig::production(),
            None => PipelineConfig::default(),
        };

        if let Some(resolution) = self.resolution {
            config.input_resolution = resolution;
        }
        if let Some(broker) = &self.broker {
            config.mqtt.broker = broker.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
        if let Some(topic) = &self.topic {
            config.mqtt.topic = topic.clone();
        }
        if let Some(dir) = &self.history_dir {
            config.history.dir = dir.clone();
        }
        if let Some(secs) = self.lockout_secs {
            config.lockout_secs = secs;
        }
        if self.confirm_before_lockout {
            config.advance_policy = AdvancePolicy::OnConfirmed;
        }

        config.validate()?;
        Ok(config)
    }
}
