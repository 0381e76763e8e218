//! Output devices.
//!
//! Every output runs at most one action at a time. A new action first
//! supersedes whatever the device is doing (see [`effect`]), then records
//! itself and dispatches to the variant.

pub mod effect;
pub mod haptic;
pub mod http;
pub mod led;
pub mod led_patterns;
pub mod message;
pub mod sound;

use std::sync::Mutex;
use std::time::Duration;

use log::debug;

use crate::app::ports::Ports;
use crate::config::{ActionSpec, OutputConfig};
use crate::device::{Device, DeviceKind, DeviceState, Label};
use crate::error::{ActionError, ConfigError};
use crate::timer::lock;

pub use effect::{EffectLease, EffectSlot};
pub use haptic::Haptic;
pub use http::HttpOutput;
pub use led::Led;
pub use message::MessageOutput;
pub use sound::SoundOutput;

pub enum OutputKind {
    Led(Led),
    Haptic(Haptic),
    Http(HttpOutput),
    Message(MessageOutput),
    Sound(SoundOutput),
}

impl OutputKind {
    fn device_kind(&self) -> DeviceKind {
        match self {
            Self::Led(_) => DeviceKind::Led,
            Self::Haptic(_) => DeviceKind::Haptic,
            Self::Http(_) => DeviceKind::Http,
            Self::Message(_) => DeviceKind::Message,
            Self::Sound(_) => DeviceKind::Sound,
        }
    }

    /// Verb used when an action names none. LEDs have no default.
    fn default_verb(&self) -> Option<String> {
        match self {
            Self::Led(_) => None,
            Self::Haptic(_) => Some("play".into()),
            Self::Http(h) => Some(h.default_method()),
            Self::Message(m) => Some(m.service().name().into()),
            Self::Sound(s) => Some(s.default_file().unwrap_or("play").into()),
        }
    }
}

/// Last action carried out by an output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRecord {
    pub last_action: Option<String>,
    pub last_action_at: Option<Duration>,
}

pub struct OutputDevice {
    name: String,
    kind: OutputKind,
    effects: EffectSlot,
    record: Mutex<ActionRecord>,
}

impl OutputDevice {
    pub fn build(name: &str, config: &OutputConfig, ports: &Ports) -> Result<Self, ConfigError> {
        let hardware = ports.hardware.as_ref();
        let kind = match config {
            OutputConfig::Led(c) => OutputKind::Led(Led::build(name, c, hardware)?),
            OutputConfig::Haptic(c) => OutputKind::Haptic(Haptic::build(name, c, hardware)?),
            OutputConfig::Http(c) => {
                OutputKind::Http(HttpOutput::new(c.clone(), ports.http.clone()))
            }
            OutputConfig::Message(c) => OutputKind::Message(MessageOutput::build(
                name,
                c,
                ports.publisher.clone(),
                ports.notifier.clone(),
            )?),
            OutputConfig::Sound(c) => OutputKind::Sound(SoundOutput::new(c, ports.audio.clone())),
        };
        Ok(Self {
            name: name.to_owned(),
            kind,
            effects: EffectSlot::new(),
            record: Mutex::new(ActionRecord::default()),
        })
    }

    pub fn variant(&self) -> &OutputKind {
        &self.kind
    }

    /// Carry out `spec` at time `now`.
    ///
    /// The running effect is superseded even when the new action then
    /// fails validation.
    pub fn action(&self, spec: &ActionSpec, now: Duration) -> Result<(), ActionError> {
        let verb = spec
            .verb
            .clone()
            .or_else(|| self.kind.default_verb())
            .ok_or_else(|| ActionError::MissingField {
                device: self.name.clone(),
                field: "action",
            })?;

        let generation = self.effects.supersede();
        debug!("{}: '{}' (generation {})", self.name, verb, generation);
        {
            let mut record = lock(&self.record);
            record.last_action = Some(verb.clone());
            record.last_action_at = Some(now);
        }

        match &self.kind {
            OutputKind::Led(led) => led.action(&self.name, &verb, spec, &self.effects, generation),
            OutputKind::Haptic(haptic) => haptic.action(&self.name, spec),
            OutputKind::Http(http) => http.action(&self.name, spec),
            OutputKind::Message(message) => message.action(&self.name, spec),
            OutputKind::Sound(sound) => sound.action(&self.name, spec),
        }
    }

    /// Cancel the running effect; it still writes its terminal state.
    pub fn stop(&self) -> bool {
        self.effects.stop()
    }

    pub fn is_busy(&self) -> bool {
        self.effects.is_running()
    }

    /// Block until every effect task has finished.
    pub fn wait(&self) {
        self.effects.wait();
    }

    pub fn shutdown(&self) {
        self.effects.shutdown();
    }

    pub fn last_action(&self) -> ActionRecord {
        lock(&self.record).clone()
    }
}

impl Device for OutputDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind.device_kind()
    }

    fn state(&self) -> DeviceState {
        match &self.kind {
            OutputKind::Led(led) => led.state(),
            _ => DeviceState {
                last_status: lock(&self.record).last_action.clone().map(Label::from),
                last_value: None,
            },
        }
    }
}
