//! Command publishers

use crate::detection::MqttConfig;
use crate::error::PipelineError;
use crate::traits::CommandPublisher;
use crate::Result;
use anyhow::Context;
use binsort_core::Command;
use rumqttc::{Client, ClientError, Event, MqttOptions, Packet, QoS};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requests the event loop may hold before publishing starts failing
pub const MQTT_REQUEST_CAPACITY: usize = 16;

/// Publishes command payloads to an MQTT topic.
///
/// The session is opened once; its network event loop runs on a background
/// thread and reconnects on its own after failures. Publishing never blocks:
/// while the broker is unreachable the request queue fills up and further
/// commands are reported as publish failures.
pub struct MqttPublisher {
    client: Client,
    topic: String,
}

impl MqttPublisher {
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));

        let (client, mut connection) = Client::new(options, MQTT_REQUEST_CAPACITY);
        let broker = format!("{}:{}", config.broker, config.port);

        thread::Builder::new()
            .name("mqtt-eventloop".into())
            .spawn(move || {
                for notification in connection.iter() {
                    match notification {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!(broker = %broker, "Connected to MQTT broker")
                        }
                        Ok(event) => debug!(?event, "MQTT event"),
                        Err(e) => {
                            warn!(broker = %broker, error = %e, "MQTT connection error");
                            thread::sleep(Duration::from_secs(1));
                        }
                    }
                }
            })
            .context("Failed to start MQTT event loop")?;

        Ok(Self {
            client,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl CommandPublisher for MqttPublisher {
    /// `Ok` means the command was queued for the event loop, not that the
    /// broker received it.
    fn publish(&mut self, command: Command) -> Result<()> {
        self.client
            .try_publish(self.topic.as_str(), QoS::AtMostOnce, false, command.as_str())
            .map_err(|e| {
                let reason = match e {
                    ClientError::TryRequest(_) => {
                        "request queue full, broker unreachable".to_string()
                    }
                    other => other.to_string(),
                };
                PipelineError::Publish {
                    command: command.to_string(),
                    topic: self.topic.clone(),
                    reason,
                }
            })?;
        Ok(())
    }
}

/// Logs commands instead of sending them
#[derive(Debug, Default)]
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl CommandPublisher for LogPublisher {
    fn publish(&mut self, command: Command) -> Result<()> {
        info!(topic = %self.topic, payload = command.as_str(), "Dry run, command not sent");
        Ok(())
    }
}

/// Keeps every published command in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    sent: Vec<Command>,
    failing: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Vec::new(),
            failing: true,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn sent(&self) -> &[Command] {
        &self.sent
    }
}

impl CommandPublisher for RecordingPublisher {
    fn publish(&mut self, command: Command) -> Result<()> {
        if self.failing {
            return Err(PipelineError::Publish {
                command: command.to_string(),
                topic: "memory".into(),
                reason: "publisher is offline".into(),
            }
            .into());
        }
        self.sent.push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_publisher() -> Result<()> {
        let mut publisher = RecordingPublisher::new();
        publisher.publish(Command::Paper)?;
        publisher.publish(Command::Metal)?;
        assert_eq!(publisher.sent(), &[Command::Paper, Command::Metal]);

        publisher.set_failing(true);
        let err = publisher.publish(Command::Plastic).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Publish { .. })
        ));
        assert_eq!(publisher.sent().len(), 2);
        Ok(())
    }

    #[test]
    fn test_mqtt_publish_without_broker_never_blocks() -> Result<()> {
        let config = MqttConfig {
            broker: "127.0.0.1".into(),
            port: 1,
            ..Default::default()
        };
        let mut publisher = MqttPublisher::connect(&config)?;
        assert_eq!(publisher.topic(), "detreci");

        let attempts = MQTT_REQUEST_CAPACITY * 3;
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let results: Vec<_> = (0..attempts)
                .map(|_| publisher.publish(Command::Paper))
                .collect();
            let _ = tx.send(results);
        });

        let results = rx
            .recv_timeout(Duration::from_secs(10))
            .context("publish blocked on a full request queue")?;
        assert_eq!(results.len(), attempts);

        // The first requests are queued, the rest are rejected.
        assert!(results[0].is_ok());
        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert!(failures.len() >= attempts - MQTT_REQUEST_CAPACITY);
        for err in failures {
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::Publish { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn test_log_publisher() -> Result<()> {
        LogPublisher::new("detreci").publish(Command::Plastic)
    }
}
