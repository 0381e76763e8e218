//! Panel configuration.
//!
//! The YAML document has three device sections plus a few panel-wide knobs:
//!
//! ```yaml
//! polling_interval: 2.5
//! expanders:
//!   adc0: { type: adc, chip: mcp3008 }
//! outputs:
//!   porch: { type: led, gpio_pin: 18 }
//! inputs:
//!   doorbell:
//!     type: button
//!     gpio_pin: 17
//!     actions:
//!       pressed:
//!         - { name: porch, action: blink, iterations: 3, duration: 3 }
//! ```
//!
//! Each device entry is parsed on its own so that every failure names the
//! device it came from. Cross-references (`source_device`, action targets)
//! are checked later, when the [`Panel`](crate::app::panel::Panel) is built.

use core::fmt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::device::{DeviceKind, Label, seconds};
use crate::error::ConfigError;

/// Interval between polling passes over monitored inputs.
pub const DEFAULT_POLLING_INTERVAL_SECS: f64 = 2.5;
/// Debounce window applied to inputs that do not set their own.
pub const DEFAULT_DEBOUNCE_SECS: f64 = 0.5;
/// Where sound outputs look for their files.
pub const DEFAULT_SOUND_DIR: &str = "/opt/control/sounds";

const OUTPUT_TYPES: &[&str] = &["led", "haptic", "http", "message", "sound"];
const INPUT_TYPES: &[&str] = &["button", "potentiometer", "rotary_encoder", "selector_switch"];

/// JSON object used for HTTP request bodies.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ───────────────────────────────────────────────────────────────
// Document
// ───────────────────────────────────────────────────────────────

/// Parsed panel configuration.
#[derive(Debug, Clone, Default)]
pub struct PanelConfig {
    pub polling_interval: Option<f64>,
    pub expanders: BTreeMap<String, ExpanderConfig>,
    pub outputs: BTreeMap<String, OutputConfig>,
    pub inputs: BTreeMap<String, InputConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    polling_interval: Option<f64>,
    expanders: Option<BTreeMap<String, Value>>,
    outputs: Option<BTreeMap<String, Value>>,
    inputs: Option<BTreeMap<String, Value>>,
}

impl PanelConfig {
    pub fn from_yaml_str(doc: &str) -> Result<Self, ConfigError> {
        let raw: RawDocument = if doc.trim().is_empty() {
            RawDocument::default()
        } else {
            serde_yaml::from_str::<Option<RawDocument>>(doc)
                .map_err(|e| ConfigError::Parse(e.to_string()))?
                .unwrap_or_default()
        };
        Ok(Self {
            polling_interval: raw.polling_interval,
            expanders: parse_section(raw.expanders, None)?,
            outputs: parse_section(raw.outputs, Some(OUTPUT_TYPES))?,
            inputs: parse_section(raw.inputs, Some(INPUT_TYPES))?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let doc = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&doc)
    }

    /// Polling interval, defaulted and validated.
    pub fn polling_interval(&self) -> Result<Duration, ConfigError> {
        let secs = self.polling_interval.unwrap_or(DEFAULT_POLLING_INTERVAL_SECS);
        match seconds(secs) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            Ok(_) => Err(panel_field("polling_interval", "must be greater than zero".into())),
            Err(reason) => Err(panel_field("polling_interval", reason)),
        }
    }
}

fn panel_field(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidField {
        device: "panel".into(),
        field,
        reason,
    }
}

/// Parse one section entry by entry. `kinds` restricts the accepted `type`
/// values; expanders accept any.
fn parse_section<T: DeserializeOwned>(
    section: Option<BTreeMap<String, Value>>,
    kinds: Option<&[&str]>,
) -> Result<BTreeMap<String, T>, ConfigError> {
    let mut parsed = BTreeMap::new();
    for (name, value) in section.unwrap_or_default() {
        let kind = match value.get("type") {
            None | Some(Value::Null) => {
                return Err(ConfigError::MissingField {
                    device: name,
                    field: "type",
                });
            }
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => {
                return Err(ConfigError::InvalidField {
                    device: name,
                    field: "type",
                    reason: "expected a string".into(),
                });
            }
        };
        if let Some(kinds) = kinds {
            if !kinds.contains(&kind.as_str()) {
                return Err(ConfigError::UnknownType { device: name, kind });
            }
        }
        let entry = serde_yaml::from_value(value).map_err(|e| ConfigError::Invalid {
            device: name.clone(),
            reason: e.to_string(),
        })?;
        parsed.insert(name, entry);
    }
    Ok(parsed)
}

// ───────────────────────────────────────────────────────────────
// Expanders
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpanderConfig {
    pub chip: Option<String>,
}

// ───────────────────────────────────────────────────────────────
// Outputs
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    Led(LedConfig),
    Haptic(HapticConfig),
    Http(HttpConfig),
    Message(MessageConfig),
    Sound(SoundConfig),
}

impl OutputConfig {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Led(_) => DeviceKind::Led,
            Self::Haptic(_) => DeviceKind::Haptic,
            Self::Http(_) => DeviceKind::Http,
            Self::Message(_) => DeviceKind::Message,
            Self::Sound(_) => DeviceKind::Sound,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedConfig {
    pub gpio_pin: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HapticConfig {
    pub source_bus: Option<String>,
    /// `erm` (default) or `lra`.
    pub motor: Option<String>,
    /// Default effect id, 1–123.
    pub effect: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    pub method: Option<String>,
    pub url: Option<String>,
    pub bearer_token: Option<String>,
    pub post_data: Option<JsonMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageConfig {
    /// `print` (default), `sns` or `mqtt`.
    pub service: Option<String>,
    pub message: Option<String>,
    pub topic_arn: Option<String>,
    pub topic: Option<String>,
    pub qos: Option<u8>,
    pub retain: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoundConfig {
    pub file: Option<String>,
    pub directory: Option<PathBuf>,
}

// ───────────────────────────────────────────────────────────────
// Inputs
// ───────────────────────────────────────────────────────────────

/// Status label → ordered list of actions.
pub type ActionMap = BTreeMap<Label, Vec<ActionSpec>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    Button(ButtonConfig),
    Potentiometer(PotentiometerConfig),
    RotaryEncoder(RotaryEncoderConfig),
    SelectorSwitch(SelectorSwitchConfig),
}

impl InputConfig {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Button(_) => DeviceKind::Button,
            Self::Potentiometer(_) => DeviceKind::Potentiometer,
            Self::RotaryEncoder(_) => DeviceKind::RotaryEncoder,
            Self::SelectorSwitch(_) => DeviceKind::SelectorSwitch,
        }
    }

    pub fn debounce(&self) -> Option<f64> {
        match self {
            Self::Button(c) => c.debounce,
            Self::Potentiometer(c) => c.debounce,
            Self::RotaryEncoder(c) => c.debounce,
            Self::SelectorSwitch(c) => c.debounce,
        }
    }

    pub fn actions(&self) -> &ActionMap {
        match self {
            Self::Button(c) => &c.actions,
            Self::Potentiometer(c) => &c.actions,
            Self::RotaryEncoder(c) => &c.actions,
            Self::SelectorSwitch(c) => &c.actions,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ButtonConfig {
    pub gpio_pin: Option<i64>,
    /// Defaults to `true`: the line idles high and a press pulls it low.
    pub pull_up: Option<bool>,
    pub debounce: Option<f64>,
    #[serde(default)]
    pub actions: ActionMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PotentiometerConfig {
    pub source_device: Option<String>,
    pub source_channel: Option<i64>,
    pub debounce: Option<f64>,
    /// Keys are numeric thresholds on the 0–100 scale.
    #[serde(default)]
    pub actions: ActionMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RotaryEncoderConfig {
    /// Must contain `up` and `down`.
    #[serde(default)]
    pub gpio_pins: PinMap,
    /// `absolute` (default) or `directional`.
    pub value_type: Option<String>,
    pub total_segments: Option<u32>,
    pub debounce: Option<f64>,
    #[serde(default)]
    pub actions: ActionMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorSwitchConfig {
    /// Position label → GPIO line, in document order.
    #[serde(default)]
    pub gpio_pins: PinMap,
    pub debounce: Option<f64>,
    #[serde(default)]
    pub actions: ActionMap,
}

/// Label → pin pairs that keep document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinMap(pub Vec<(Label, i64)>);

impl PinMap {
    pub fn get(&self, label: &str) -> Option<i64> {
        self.0
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, pin)| *pin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Label, i64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for PinMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PinMapVisitor;

        impl<'de> Visitor<'de> for PinMapVisitor {
            type Value = PinMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of labels to GPIO pins")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PinMap, A::Error> {
                let mut pins = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, pin)) = map.next_entry::<Label, i64>()? {
                    pins.push((label, pin));
                }
                Ok(PinMap(pins))
            }
        }

        deserializer.deserialize_map(PinMapVisitor)
    }
}

// ───────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────

/// One entry of an input's action list.
///
/// Only `name`, `init` and `delay` mean anything to the panel. Every other
/// field is an override the target output merges over its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionSpec {
    /// Target output.
    #[serde(rename = "name")]
    pub target: Option<String>,
    /// Verb understood by the target (`on`, `blink`, ...).
    #[serde(rename = "action")]
    pub verb: Option<String>,
    /// Also run when replaying state at startup.
    #[serde(default)]
    pub init: bool,
    /// Cooldown in seconds between two firings of this entry.
    pub delay: Option<f64>,

    pub value: Option<f64>,
    pub duration: Option<f64>,
    pub iterations: Option<u32>,
    pub effect: Option<i64>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub bearer_token: Option<String>,
    pub post_data: Option<JsonMap>,
    pub message: Option<String>,
    pub file: Option<String>,
}

impl ActionSpec {
    pub fn new(target: &str) -> Self {
        Self {
            target: Some(target.to_owned()),
            ..Self::default()
        }
    }

    pub fn verb(mut self, verb: &str) -> Self {
        self.verb = Some(verb.to_owned());
        self
    }
}
