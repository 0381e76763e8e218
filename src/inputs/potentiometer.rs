//! Analog potentiometer read through an ADC expander channel.
//!
//! The raw reading is scaled to 0–100, truncated to a whole number and
//! mapped to the smallest configured threshold strictly above it. With
//! thresholds `[30, 60, 100]`:
//!
//! | Value  | Bucket |
//! |--------|--------|
//! | 0–29   | 30     |
//! | 30–59  | 60     |
//! | 60–99  | 100    |
//! | 100    | none   |
//!
//! A value with no bucket changes nothing. Potentiometers have no
//! interrupts, so the panel's polling loop samples them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::app::ports::{AnalogInput, HardwarePort};
use crate::config::{ActionMap, PotentiometerConfig};
use crate::device::{Label, opened};
use crate::error::ConfigError;
use crate::expander::Expander;

use super::Reading;

/// One bucket boundary: values strictly below `limit` (and at or above the
/// previous limit) report `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub limit: f64,
    pub label: Label,
}

pub struct Potentiometer {
    channel: Arc<dyn AnalogInput>,
    thresholds: Vec<Threshold>,
}

impl Potentiometer {
    pub fn build(
        name: &str,
        config: &PotentiometerConfig,
        expanders: &BTreeMap<String, Expander>,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let source = config
            .source_device
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                device: name.to_owned(),
                field: "source_device",
            })?;
        let expander = expanders
            .get(source)
            .ok_or_else(|| ConfigError::UnknownSource {
                device: name.to_owned(),
                source: source.to_owned(),
            })?;
        if !expander.chip().is_adc() {
            return Err(ConfigError::InvalidField {
                device: name.to_owned(),
                field: "source_device",
                reason: format!("{source} ({}) is not an ADC", expander.chip().model),
            });
        }
        let channel_no = expander.channel(name, config.source_channel)?;
        let thresholds = thresholds(name, &config.actions)?;
        let channel = opened(name, hardware.analog_input(expander.chip(), channel_no))?;
        Ok(Self {
            channel,
            thresholds,
        })
    }

    /// Thresholds in ascending order.
    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Current position on the 0–100 scale.
    pub fn value(&self) -> f64 {
        scale(self.channel.read())
    }

    pub fn sample(&self) -> Reading {
        let value = self.value();
        Reading {
            status: bucket(&self.thresholds, value).cloned(),
            value: Some(value),
            force: false,
        }
    }
}

/// Scale a normalised reading to 0–100, dropping the fraction.
///
/// The product is taken in `f32` so a reading such as `0.45`, stored just
/// below its decimal value, still lands on 45.
pub fn scale(raw: f32) -> f64 {
    f64::from((raw.clamp(0.0, 1.0) * 100.0).trunc())
}

/// First threshold strictly greater than `value`. `thresholds` must be
/// sorted ascending.
pub fn bucket(thresholds: &[Threshold], value: f64) -> Option<&Label> {
    thresholds
        .iter()
        .find(|t| value < t.limit)
        .map(|t| &t.label)
}

/// Parse action labels into sorted numeric thresholds.
fn thresholds(name: &str, actions: &ActionMap) -> Result<Vec<Threshold>, ConfigError> {
    let mut parsed = actions
        .keys()
        .map(|label| match label.as_str().trim().parse::<f64>() {
            Ok(limit) if limit.is_finite() => Ok(Threshold {
                limit,
                label: label.clone(),
            }),
            _ => Err(ConfigError::InvalidField {
                device: name.to_owned(),
                field: "actions",
                reason: format!("threshold '{label}' is not a number"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    parsed.sort_by(|a, b| a.limit.total_cmp(&b.limit));
    Ok(parsed)
}
