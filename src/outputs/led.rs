//! LED output on a PWM-capable GPIO line.
//!
//! Verbs:
//!
//! - `on`, `off`: settle at full or zero brightness.
//! - `value`: settle at the action's `value` (0.0–1.0).
//! - `blink`, `flicker_on`, `flicker_off`, `fade_on`, `fade_off`: timed
//!   effects (see [`led_patterns`](super::led_patterns)), run on an effect
//!   thread owned by the device's [`EffectSlot`].
//!
//! `on`/`flicker_on` at full brightness and `off`/`flicker_off` on a dark
//! LED are no-ops. The running effect has already been cancelled by then.
//!
//! Every write happens under the connection lock after checking the
//! writer's generation, so an effect that lost the output can never write
//! over its successor.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::app::ports::{HardwarePort, PwmOutput};
use crate::config::{ActionSpec, LedConfig};
use crate::device::{DeviceState, Label, gpio_pin, opened, seconds};
use crate::error::{ActionError, ConfigError};
use crate::timer::lock;

use super::effect::{EffectLease, EffectSlot};
use super::led_patterns::{Effect, MAX_BLINK_ITERATIONS};

pub const DEFAULT_DURATION_SECS: f64 = 1.0;
pub const DEFAULT_ITERATIONS: u32 = 1;

pub const ON: &str = "on";
pub const OFF: &str = "off";

struct LedOutput {
    pwm: Box<dyn PwmOutput>,
    level: f32,
}

impl LedOutput {
    fn write(&mut self, level: f32) {
        self.pwm.set_intensity(level);
        self.level = level;
    }
}

pub struct Led {
    pin: u8,
    output: Arc<Mutex<LedOutput>>,
}

impl Led {
    /// Opens the line and drives it off.
    pub fn build(
        name: &str,
        config: &LedConfig,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let pin = gpio_pin(name, "gpio_pin", config.gpio_pin)?;
        let pwm = opened(name, hardware.pwm_output(pin))?;
        let mut output = LedOutput { pwm, level: 0.0 };
        output.write(0.0);
        Ok(Self {
            pin,
            output: Arc::new(Mutex::new(output)),
        })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn is_on(&self) -> bool {
        lock(&self.output).level > 0.0
    }

    pub fn level(&self) -> f32 {
        lock(&self.output).level
    }

    pub fn state(&self) -> DeviceState {
        let output = lock(&self.output);
        DeviceState {
            last_status: Some(Label::from(if output.level > 0.0 { ON } else { OFF })),
            last_value: Some(f64::from(output.level)),
        }
    }

    pub(super) fn action(
        &self,
        device: &str,
        verb: &str,
        spec: &ActionSpec,
        effects: &EffectSlot,
        generation: u64,
    ) -> Result<(), ActionError> {
        let level = self.level();
        let full = level >= 1.0;
        let dark = level <= 0.0;
        if (full && matches!(verb, "on" | "flicker_on")) || (dark && matches!(verb, "off" | "flicker_off")) {
            debug!("{}: already {}, '{}' skipped", device, if full { ON } else { OFF }, verb);
            return Ok(());
        }

        match verb {
            "on" => self.settle(effects, generation, 1.0),
            "off" => self.settle(effects, generation, 0.0),
            "value" => {
                let value = spec.value.ok_or_else(|| ActionError::MissingField {
                    device: device.to_owned(),
                    field: "value",
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ActionError::InvalidField {
                        device: device.to_owned(),
                        field: "value",
                        reason: format!("{value} is outside 0.0-1.0"),
                    });
                }
                self.settle(effects, generation, value as f32);
            }
            _ => {
                let effect = self.effect(device, verb, spec)?;
                let output = Arc::clone(&self.output);
                let owner = device.to_owned();
                let started = effects.spawn(
                    &format!("{}-{}", device, effect.name()),
                    generation,
                    move |lease| run_effect(&owner, &output, effect, &lease),
                );
                match started {
                    Ok(true) => info!("{}: {} started", device, effect.name()),
                    Ok(false) => debug!("{}: {} superseded before start", device, effect.name()),
                    Err(e) => warn!("{}: {} not started: {}", device, effect.name(), e),
                }
            }
        }
        Ok(())
    }

    fn effect(&self, device: &str, verb: &str, spec: &ActionSpec) -> Result<Effect, ActionError> {
        let duration = seconds(spec.duration.unwrap_or(DEFAULT_DURATION_SECS)).map_err(|reason| {
            ActionError::InvalidField {
                device: device.to_owned(),
                field: "duration",
                reason,
            }
        })?;
        let iterations = spec.iterations.unwrap_or(DEFAULT_ITERATIONS);
        if iterations > MAX_BLINK_ITERATIONS {
            return Err(ActionError::InvalidField {
                device: device.to_owned(),
                field: "iterations",
                reason: format!("{iterations} exceeds {MAX_BLINK_ITERATIONS}"),
            });
        }
        Effect::from_verb(verb, iterations, duration).ok_or_else(|| ActionError::UnsupportedVerb {
            device: device.to_owned(),
            verb: verb.to_owned(),
        })
    }

    /// Immediate write on behalf of the action holding `generation`.
    fn settle(&self, effects: &EffectSlot, generation: u64, level: f32) {
        let mut output = lock(&self.output);
        if effects.generation() == generation {
            output.write(level);
        }
    }
}

fn run_effect(device: &str, output: &Mutex<LedOutput>, effect: Effect, lease: &EffectLease) {
    let mut interrupted = false;
    for step in effect.steps() {
        {
            let mut out = lock(output);
            if !lease.may_write() {
                interrupted = true;
                break;
            }
            out.write(step.level);
        }
        if !lease.sleep(step.hold) {
            interrupted = true;
            break;
        }
    }
    let cancelled = interrupted || lease.is_cancelled();

    let mut out = lock(output);
    if !lease.owns_output() {
        debug!("{}: {} superseded", device, effect.name());
        return;
    }
    if let Some(level) = effect.terminal(cancelled) {
        out.write(level);
    }
    if cancelled {
        debug!("{}: {} stopped at {:.2}", device, effect.name(), out.level);
    } else {
        debug!("{}: {} finished", device, effect.name());
    }
}
