//! Text message output.
//!
//! | Service | Delivery                               | Requires    |
//! |---------|----------------------------------------|-------------|
//! | print   | info-level log line, target `message`  | -           |
//! | sns     | notification topic                     | `topic_arn` |
//! | mqtt    | pub/sub broker                         | `topic`     |
//!
//! The message text comes from the action, falling back to the device's
//! `message`.

use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::{NotifyPort, Publication, PublishPort};
use crate::config::{ActionSpec, MessageConfig};
use crate::error::{ActionError, ConfigError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    Print,
    Sns { topic_arn: String },
    Mqtt { topic: String, qos: u8, retain: bool },
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Sns { .. } => "sns",
            Self::Mqtt { .. } => "mqtt",
        }
    }
}

pub struct MessageOutput {
    service: Service,
    message: Option<String>,
    publisher: Arc<dyn PublishPort>,
    notifier: Arc<dyn NotifyPort>,
}

impl MessageOutput {
    pub fn build(
        name: &str,
        config: &MessageConfig,
        publisher: Arc<dyn PublishPort>,
        notifier: Arc<dyn NotifyPort>,
    ) -> Result<Self, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            device: name.to_owned(),
            field,
        };
        let service = match config.service.as_deref() {
            None | Some("print") => Service::Print,
            Some("sns") => Service::Sns {
                topic_arn: config.topic_arn.clone().ok_or_else(|| missing("topic_arn"))?,
            },
            Some("mqtt") => {
                let qos = config.qos.unwrap_or(1);
                if qos > 2 {
                    return Err(ConfigError::InvalidField {
                        device: name.to_owned(),
                        field: "qos",
                        reason: format!("{qos} is not 0, 1 or 2"),
                    });
                }
                Service::Mqtt {
                    topic: config.topic.clone().ok_or_else(|| missing("topic"))?,
                    qos,
                    retain: config.retain.unwrap_or(true),
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidField {
                    device: name.to_owned(),
                    field: "service",
                    reason: format!("'{other}' is not print, sns or mqtt"),
                });
            }
        };
        Ok(Self {
            service,
            message: config.message.clone(),
            publisher,
            notifier,
        })
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub(super) fn action(&self, device: &str, spec: &ActionSpec) -> Result<(), ActionError> {
        let message = spec
            .message
            .as_deref()
            .or(self.message.as_deref())
            .ok_or_else(|| ActionError::MissingField {
                device: device.to_owned(),
                field: "message",
            })?;
        let sent = match &self.service {
            Service::Print => {
                info!(target: "message", "{}", message);
                Ok(())
            }
            Service::Sns { topic_arn } => self.notifier.notify(topic_arn, message),
            Service::Mqtt { topic, qos, retain } => self.publisher.publish(&Publication {
                topic: topic.clone(),
                payload: message.to_owned(),
                qos: *qos,
                retain: *retain,
            }),
        };
        if let Err(e) = sent {
            warn!("{}: {} delivery failed: {}", device, self.service.name(), e);
        }
        Ok(())
    }
}
