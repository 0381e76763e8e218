//! Quadrature rotary encoder on two GPIO lines.
//!
//! Every detent produces a forced status change. The status is either the
//! step count after the move (`absolute`) or `up` / `down`
//! (`directional`). Forcing bypasses the no-change gate, so turning a
//! directional encoder the same way twice fires twice. The debounce gate
//! still applies.
//!
//! Re-sampling an encoder only refreshes its value; it never produces a
//! status, so no re-verification timer is armed after a change.

use std::sync::Arc;

use crate::app::ports::{HardwarePort, Rotation, RotaryInput};
use crate::config::RotaryEncoderConfig;
use crate::device::{Label, gpio_pin, opened};
use crate::error::ConfigError;

use super::{Notify, Reading, Signal};

/// Step bound used when `total_segments` is not configured.
pub const DEFAULT_MAX_STEPS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Status is the step count.
    Absolute,
    /// Status is `up` or `down`.
    Directional,
}

pub struct RotaryEncoder {
    encoder: Arc<dyn RotaryInput>,
    value_type: ValueType,
    max_steps: u32,
}

impl RotaryEncoder {
    pub fn build(
        name: &str,
        config: &RotaryEncoderConfig,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let up = gpio_pin(name, "gpio_pins.up", config.gpio_pins.get("up"))?;
        let down = gpio_pin(name, "gpio_pins.down", config.gpio_pins.get("down"))?;
        let value_type = match config.value_type.as_deref() {
            None | Some("absolute") => ValueType::Absolute,
            Some("directional") => ValueType::Directional,
            Some(other) => {
                return Err(ConfigError::InvalidField {
                    device: name.to_owned(),
                    field: "value_type",
                    reason: format!("'{other}' is neither 'absolute' nor 'directional'"),
                });
            }
        };
        // Each detent spans two segments.
        let max_steps = config
            .total_segments
            .map_or(DEFAULT_MAX_STEPS, |total| total / 2);
        let encoder = opened(name, hardware.rotary_input(up, down, max_steps))?;
        Ok(Self {
            encoder,
            value_type,
            max_steps,
        })
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn reading(&self, rotation: Rotation, steps: i64) -> Reading {
        let status = match self.value_type {
            ValueType::Absolute => Label::new(steps.to_string()),
            ValueType::Directional => Label::from(rotation.label()),
        };
        Reading::status(status).with_value(steps as f64).forced()
    }

    pub fn sample(&self) -> Reading {
        Reading::value_only(self.encoder.steps() as f64)
    }

    pub(super) fn subscribe(&self, notify: Notify) {
        self.encoder.on_rotate(Box::new(move |rotation, steps| {
            notify(Signal::Rotation(rotation, steps));
        }));
    }
}
