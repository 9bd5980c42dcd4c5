//! Pipeline configuration

use crate::Result;
use anyhow::{Context, ensure};
use binsort_core::{AdvancePolicy, CommandRule, CommandTable, ring::FPS_WINDOW_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub lockout_secs: f64,
    pub advance_policy: AdvancePolicy,
    pub input_resolution: u32,
    pub fps_window: usize,
    pub frame_budget_ms: Option<u64>,
    pub command_rules: Vec<CommandRule>,
    pub history: HistoryConfig,
    pub mqtt: MqttConfig,
}

/// Where and how activations are recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub dir: PathBuf,
    pub log_file: String,
    pub comment: String,
}

/// Actuation channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lockout_secs: 5.0,
            advance_policy: AdvancePolicy::OnAttempt,
            input_resolution: 640,
            fps_window: FPS_WINDOW_CAPACITY,
            frame_budget_ms: None,
            command_rules: CommandTable::default().rules().to_vec(),
            history: HistoryConfig::default(),
            mqtt: MqttConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: "historial".into(),
            log_file: "activaciones.csv".into(),
            comment: crate::history::DEFAULT_COMMENT.into(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "10.22.77.55".into(),
            port: 1883,
            topic: "detreci".into(),
            client_id: "binsort".into(),
            keep_alive_secs: 60,
        }
    }
}

impl PipelineConfig {
    /// Deployment settings: one activation per ten minutes
    pub fn production() -> Self {
        Self {
            lockout_secs: 10.0 * 60.0,
            ..Default::default()
        }
    }

    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.lockout_secs.is_finite() && self.lockout_secs >= 0.0,
            "lockout_secs must be a non-negative number, got {}",
            self.lockout_secs
        );
        ensure!(self.input_resolution > 0, "input_resolution must be positive");
        ensure!(self.fps_window > 0, "fps_window must be positive");
        ensure!(!self.mqtt.topic.is_empty(), "mqtt.topic must not be empty");
        ensure!(
            !self.mqtt.client_id.is_empty() && !self.mqtt.client_id.starts_with(' '),
            "mqtt.client_id must be non-empty and not start with a space"
        );
        ensure!(!self.history.log_file.is_empty(), "history.log_file must not be empty");
        Ok(())
    }

    pub fn lockout_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.lockout_secs)
            .with_context(|| format!("Invalid lockout duration: {}", self.lockout_secs))
    }

    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_budget_ms.map(Duration::from_millis)
    }

    pub fn command_table(&self) -> CommandTable {
        CommandTable::from_rules(self.command_rules.clone())
    }

    pub fn log_path(&self) -> PathBuf {
        self.history.dir.join(&self.history.log_file)
    }
}
