//! Momentary push button on a GPIO line.
//!
//! Reports `pressed` (value 100) and `released` (value 0). With the default
//! pull-up wiring the line idles high and a press pulls it to ground; the
//! hardware collaborator hides that inversion behind
//! [`DigitalInput::is_active`].

use std::sync::Arc;

use crate::app::ports::{DigitalInput, HardwarePort};
use crate::config::ButtonConfig;
use crate::device::{gpio_pin, opened};
use crate::error::ConfigError;

use super::{Notify, Reading, Signal};

pub const PRESSED: &str = "pressed";
pub const RELEASED: &str = "released";

pub struct Button {
    line: Arc<dyn DigitalInput>,
    pin: u8,
    pull_up: bool,
}

impl Button {
    pub fn build(
        name: &str,
        config: &ButtonConfig,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let pin = gpio_pin(name, "gpio_pin", config.gpio_pin)?;
        let pull_up = config.pull_up.unwrap_or(true);
        let line = opened(name, hardware.digital_input(pin, pull_up))?;
        Ok(Self { line, pin, pull_up })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn pull_up(&self) -> bool {
        self.pull_up
    }

    pub fn is_pressed(&self) -> bool {
        self.line.is_active()
    }

    /// Status and value for a contact state.
    pub fn reading(pressed: bool) -> Reading {
        if pressed {
            Reading::status(PRESSED).with_value(100.0)
        } else {
            Reading::status(RELEASED).with_value(0.0)
        }
    }

    pub fn sample(&self) -> Reading {
        Self::reading(self.is_pressed())
    }

    pub(super) fn subscribe(&self, notify: Notify) {
        self.line
            .on_edge(Box::new(move |active| notify(Signal::Edge(active))));
    }
}
