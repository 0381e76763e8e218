//! Device identity shared by every input, output and expander.
//!
//! A device is a named, typed node in the panel. Inputs report status
//! labels, outputs carry out actions, expanders only supply channels to
//! other devices. Whatever the role, each exposes the same small surface
//! through [`Device`]: a name, a kind and its last-known state.

use core::fmt;
use std::borrow::Borrow;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::{ConfigError, HardwareError};

/// Highest GPIO line available on the header.
pub const MAX_GPIO_PIN: u8 = 27;

// ───────────────────────────────────────────────────────────────
// Status labels
// ───────────────────────────────────────────────────────────────

/// A status reported by an input: `pressed`, `up`, a selector position or a
/// potentiometer threshold such as `60`.
///
/// Labels deserialise from any YAML scalar, so `30:` and `"30":` name the
/// same status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Label;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a status label (string, number or boolean)")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Label, E> {
                Ok(Label::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Label, E> {
                Ok(Label(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Label, E> {
                Ok(Label(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Label, E> {
                Ok(Label(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Label, E> {
                Ok(Label(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Label, E> {
                Ok(Label(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

// ───────────────────────────────────────────────────────────────
// Device identity
// ───────────────────────────────────────────────────────────────

/// Every device type the panel can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Expander,
    Button,
    Potentiometer,
    RotaryEncoder,
    SelectorSwitch,
    Led,
    Haptic,
    Http,
    Message,
    Sound,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expander => "expander",
            Self::Button => "button",
            Self::Potentiometer => "potentiometer",
            Self::RotaryEncoder => "rotary_encoder",
            Self::SelectorSwitch => "selector_switch",
            Self::Led => "led",
            Self::Haptic => "haptic",
            Self::Http => "http",
            Self::Message => "message",
            Self::Sound => "sound",
        }
    }

    pub fn is_input(self) -> bool {
        matches!(
            self,
            Self::Button | Self::Potentiometer | Self::RotaryEncoder | Self::SelectorSwitch
        )
    }

    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::Led | Self::Haptic | Self::Http | Self::Message | Self::Sound
        )
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-known status and numeric value of a device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub last_status: Option<Label>,
    pub last_value: Option<f64>,
}

/// Common surface of inputs, outputs and expanders.
pub trait Device {
    fn name(&self) -> &str;
    fn kind(&self) -> DeviceKind;
    fn state(&self) -> DeviceState;
}

// ───────────────────────────────────────────────────────────────
// Shared field checks
// ───────────────────────────────────────────────────────────────

/// Validate a GPIO line number from configuration.
pub(crate) fn gpio_pin(
    device: &str,
    field: &'static str,
    pin: Option<i64>,
) -> Result<u8, ConfigError> {
    let pin = pin.ok_or_else(|| ConfigError::MissingField {
        device: device.to_owned(),
        field,
    })?;
    match u8::try_from(pin) {
        Ok(p) if p <= MAX_GPIO_PIN => Ok(p),
        _ => Err(ConfigError::InvalidField {
            device: device.to_owned(),
            field,
            reason: format!("pin {pin} is outside 0-{MAX_GPIO_PIN}"),
        }),
    }
}

/// Attach the device name to a hardware open failure.
pub(crate) fn opened<T>(device: &str, result: Result<T, HardwareError>) -> Result<T, ConfigError> {
    result.map_err(|e| ConfigError::Hardware {
        device: device.to_owned(),
        reason: e.reason,
    })
}

/// Convert a seconds value into a [`Duration`], rejecting negative,
/// non-finite and overflowing values.
pub(crate) fn seconds(value: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value).map_err(|_| format!("{value} is not a valid number of seconds"))
}
