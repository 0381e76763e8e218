//! Haptic motor on an I²C haptic driver.
//!
//! Plays one of the driver's built-in waveform effects (1–123). The
//! action's `effect` overrides the device default and becomes the new
//! default for later actions.

use std::sync::Mutex;

use log::info;

use crate::app::ports::{HapticMotor, HardwarePort, Motor};
use crate::config::{ActionSpec, HapticConfig};
use crate::device::opened;
use crate::error::{ActionError, ConfigError};
use crate::timer::lock;

pub const MIN_EFFECT: i64 = 1;
pub const MAX_EFFECT: i64 = 123;

pub struct Haptic {
    motor: Mutex<Box<dyn HapticMotor>>,
    motor_type: Motor,
    effect: Mutex<Option<u8>>,
}

impl Haptic {
    pub fn build(
        name: &str,
        config: &HapticConfig,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::InvalidField {
            device: name.to_owned(),
            field,
            reason,
        };
        match config.source_bus.as_deref() {
            None => {
                return Err(ConfigError::MissingField {
                    device: name.to_owned(),
                    field: "source_bus",
                });
            }
            Some(bus) if bus.eq_ignore_ascii_case("i2c") => {}
            Some(bus) => return Err(invalid("source_bus", format!("'{bus}' is not i2c"))),
        }
        let motor_type = match config.motor.as_deref() {
            None | Some("erm") => Motor::Erm,
            Some("lra") => Motor::Lra,
            Some(other) => return Err(invalid("motor", format!("'{other}' is neither erm nor lra"))),
        };
        let effect = config
            .effect
            .map(effect_id)
            .transpose()
            .map_err(|reason| invalid("effect", reason))?;
        let motor = opened(name, hardware.haptic(motor_type))?;
        Ok(Self {
            motor: Mutex::new(motor),
            motor_type,
            effect: Mutex::new(effect),
        })
    }

    pub fn motor_type(&self) -> Motor {
        self.motor_type
    }

    pub fn default_effect(&self) -> Option<u8> {
        *lock(&self.effect)
    }

    pub(super) fn action(&self, device: &str, spec: &ActionSpec) -> Result<(), ActionError> {
        let effect = {
            let mut default = lock(&self.effect);
            if let Some(requested) = spec.effect {
                let id = effect_id(requested).map_err(|reason| ActionError::InvalidField {
                    device: device.to_owned(),
                    field: "effect",
                    reason,
                })?;
                *default = Some(id);
            }
            default.ok_or_else(|| ActionError::MissingField {
                device: device.to_owned(),
                field: "effect",
            })?
        };
        info!("{}: playing effect {}", device, effect);
        lock(&self.motor).play(effect);
        Ok(())
    }
}

fn effect_id(value: i64) -> Result<u8, String> {
    if (MIN_EFFECT..=MAX_EFFECT).contains(&value) {
        Ok(value as u8)
    } else {
        Err(format!("effect {value} is outside {MIN_EFFECT}-{MAX_EFFECT}"))
    }
}
