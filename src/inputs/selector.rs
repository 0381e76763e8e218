//! Multi-position selector switch: one GPIO line per position.
//!
//! The selection is the first asserted position in configuration order.
//! With nothing asserted (between detents) there is no selection and no
//! status change.

use std::sync::Arc;

use crate::app::ports::{DigitalInput, HardwarePort};
use crate::config::SelectorSwitchConfig;
use crate::device::{Label, gpio_pin, opened};
use crate::error::ConfigError;

use super::{Notify, Reading, Signal};

pub struct SelectorSwitch {
    positions: Vec<(Label, Arc<dyn DigitalInput>)>,
}

impl SelectorSwitch {
    pub fn build(
        name: &str,
        config: &SelectorSwitchConfig,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        if config.gpio_pins.is_empty() {
            return Err(ConfigError::MissingField {
                device: name.to_owned(),
                field: "gpio_pins",
            });
        }
        let positions = config
            .gpio_pins
            .iter()
            .map(|(label, pin)| {
                let pin = gpio_pin(name, "gpio_pins", Some(*pin))?;
                let line = opened(name, hardware.digital_input(pin, true))?;
                Ok((label.clone(), line))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { positions })
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.positions.iter().map(|(label, _)| label)
    }

    pub fn selection(&self) -> Option<&Label> {
        self.positions
            .iter()
            .find(|(_, line)| line.is_active())
            .map(|(label, _)| label)
    }

    pub fn sample(&self) -> Reading {
        Reading {
            status: self.selection().cloned(),
            value: None,
            force: false,
        }
    }

    /// Only closing contacts matter; a position opening just means the
    /// switch is travelling to the next one.
    pub(super) fn subscribe(&self, notify: Notify) {
        for (_, line) in &self.positions {
            let notify = Arc::clone(&notify);
            line.on_edge(Box::new(move |active| {
                if active {
                    notify(Signal::Edge(true));
                }
            }));
        }
    }
}
