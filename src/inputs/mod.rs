//! Input devices and the status-change state machine they share.
//!
//! ```text
//!   interrupt / sample ──▶ Reading ──▶ debounce gate ──▶ no-change gate
//!                                                             │ accept
//!        cancel pending re-check ◀── stamp time, store status ◀┘
//!                  │
//!                  ▼
//!        panel.take_action(..) ──▶ arm re-check (debounce + 100 ms)
//! ```
//!
//! The re-check re-samples hardware once the debounce window has passed.
//! It catches an edge that arrived inside the window and was dropped, e.g.
//! a quick release right after a press.
//!
//! Each device's gates and state update run under the device's own lock,
//! so a signal racing the polling loop or a re-check can never slip
//! between the check and the set.

pub mod button;
pub mod potentiometer;
pub mod rotary;
pub mod selector;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::events::{IgnoreReason, PanelEvent};
use crate::app::panel::Panel;
use crate::app::ports::{HardwarePort, Rotation};
use crate::config::{DEFAULT_DEBOUNCE_SECS, InputConfig};
use crate::device::{Device, DeviceKind, DeviceState, Label, seconds};
use crate::error::ConfigError;
use crate::expander::Expander;
use crate::timer::{CancelToken, OneShotTimer, lock};

pub use button::Button;
pub use potentiometer::Potentiometer;
pub use rotary::RotaryEncoder;
pub use selector::SelectorSwitch;

/// How long past the debounce window the re-check fires.
pub const RECHECK_MARGIN: Duration = Duration::from_millis(100);

/// Signal sink handed to hardware callbacks.
pub(crate) type Notify = Arc<dyn Fn(Signal) + Send + Sync>;

/// Interrupt delivered by an input's hardware connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A digital line changed; carries the new asserted state.
    Edge(bool),
    /// An encoder moved one detent; carries the step count after the move.
    Rotation(Rotation, i64),
}

/// Candidate status (and value) produced by an interrupt or a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// `None` when the hardware state maps to no status.
    pub status: Option<Label>,
    pub value: Option<f64>,
    /// Bypass the no-change gate.
    pub force: bool,
}

impl Reading {
    pub fn status(status: impl Into<Label>) -> Self {
        Self {
            status: Some(status.into()),
            value: None,
            force: false,
        }
    }

    pub fn value_only(value: f64) -> Self {
        Self {
            status: None,
            value: Some(value),
            force: false,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Variants
// ───────────────────────────────────────────────────────────────

pub enum InputKind {
    Button(Button),
    Potentiometer(Potentiometer),
    RotaryEncoder(RotaryEncoder),
    SelectorSwitch(SelectorSwitch),
}

impl InputKind {
    fn device_kind(&self) -> DeviceKind {
        match self {
            Self::Button(_) => DeviceKind::Button,
            Self::Potentiometer(_) => DeviceKind::Potentiometer,
            Self::RotaryEncoder(_) => DeviceKind::RotaryEncoder,
            Self::SelectorSwitch(_) => DeviceKind::SelectorSwitch,
        }
    }

    fn sample(&self) -> Reading {
        match self {
            Self::Button(b) => b.sample(),
            Self::Potentiometer(p) => p.sample(),
            Self::RotaryEncoder(r) => r.sample(),
            Self::SelectorSwitch(s) => s.sample(),
        }
    }

    fn interpret(&self, signal: Signal) -> Option<Reading> {
        match (self, signal) {
            (Self::Button(_), Signal::Edge(pressed)) => Some(Button::reading(pressed)),
            (Self::RotaryEncoder(r), Signal::Rotation(rotation, steps)) => {
                Some(r.reading(rotation, steps))
            }
            (Self::SelectorSwitch(s), Signal::Edge(true)) => Some(s.sample()),
            _ => None,
        }
    }

    /// Whether a re-sample can produce a status.
    fn resamples(&self) -> bool {
        !matches!(self, Self::RotaryEncoder(_))
    }

    fn subscribe(&self, notify: Notify) {
        match self {
            Self::Button(b) => b.subscribe(notify),
            Self::RotaryEncoder(r) => r.subscribe(notify),
            Self::SelectorSwitch(s) => s.subscribe(notify),
            Self::Potentiometer(_) => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// InputDevice
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct InputState {
    last_status: Option<Label>,
    last_value: Option<f64>,
    last_changed_at: Option<Duration>,
    recheck: Option<OneShotTimer>,
}

/// A named input: hardware variant plus debounced status state.
pub struct InputDevice {
    name: String,
    kind: InputKind,
    debounce: Duration,
    state: Mutex<InputState>,
}

impl InputDevice {
    pub fn build(
        name: &str,
        config: &InputConfig,
        expanders: &BTreeMap<String, Expander>,
        hardware: &dyn HardwarePort,
    ) -> Result<Self, ConfigError> {
        let debounce = seconds(config.debounce().unwrap_or(DEFAULT_DEBOUNCE_SECS)).map_err(
            |reason| ConfigError::InvalidField {
                device: name.to_owned(),
                field: "debounce",
                reason,
            },
        )?;
        let kind = match config {
            InputConfig::Button(c) => InputKind::Button(Button::build(name, c, hardware)?),
            InputConfig::Potentiometer(c) => {
                InputKind::Potentiometer(Potentiometer::build(name, c, expanders, hardware)?)
            }
            InputConfig::RotaryEncoder(c) => {
                InputKind::RotaryEncoder(RotaryEncoder::build(name, c, hardware)?)
            }
            InputConfig::SelectorSwitch(c) => {
                InputKind::SelectorSwitch(SelectorSwitch::build(name, c, hardware)?)
            }
        };
        Ok(Self {
            name: name.to_owned(),
            kind,
            debounce,
            state: Mutex::new(InputState::default()),
        })
    }

    pub fn variant(&self) -> &InputKind {
        &self.kind
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Inputs without interrupts are sampled by the polling loop.
    pub fn needs_monitoring(&self) -> bool {
        matches!(self.kind, InputKind::Potentiometer(_))
    }

    pub fn last_status(&self) -> Option<Label> {
        lock(&self.state).last_status.clone()
    }

    pub fn last_value(&self) -> Option<f64> {
        lock(&self.state).last_value
    }

    pub fn has_pending_recheck(&self) -> bool {
        lock(&self.state)
            .recheck
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Sample hardware and feed the result through the gates.
    ///
    /// Returns whether the status changed.
    pub fn update_status(&self, panel: &Panel, startup: bool) -> Result<bool, ConfigError> {
        let mut state = lock(&self.state);
        let reading = self.kind.sample();
        self.apply(&mut state, panel, reading, startup)
    }

    /// Interrupt path.
    pub fn handle_signal(&self, panel: &Panel, signal: Signal) -> Result<bool, ConfigError> {
        let mut state = lock(&self.state);
        let Some(reading) = self.kind.interpret(signal) else {
            return Ok(false);
        };
        self.apply(&mut state, panel, reading, false)
    }

    /// Offer `status` directly, as if the hardware had reported it.
    pub fn change_status(
        &self,
        panel: &Panel,
        status: Label,
        startup: bool,
        force: bool,
    ) -> Result<bool, ConfigError> {
        let mut state = lock(&self.state);
        let reading = Reading {
            status: Some(status),
            value: None,
            force,
        };
        self.apply(&mut state, panel, reading, startup)
    }

    /// Deferred re-verification. A timer cancelled after its sleep ended
    /// but before it got the lock does nothing.
    pub(crate) fn recheck(&self, panel: &Panel, token: &CancelToken) -> Result<bool, ConfigError> {
        let mut state = lock(&self.state);
        if token.is_cancelled() {
            return Ok(false);
        }
        state.recheck = None;
        debug!("{}: re-verifying hardware state", self.name);
        let reading = self.kind.sample();
        self.apply(&mut state, panel, reading, false)
    }

    /// Cancel a pending re-check, handing the timer back for joining.
    pub(crate) fn cancel_recheck(&self) -> Option<OneShotTimer> {
        let timer = lock(&self.state).recheck.take()?;
        timer.cancel();
        Some(timer)
    }

    /// Route hardware interrupts to `panel`.
    pub(crate) fn subscribe(&self, panel: Weak<Panel>) {
        let name = self.name.clone();
        self.kind.subscribe(Arc::new(move |signal| {
            if let Some(panel) = panel.upgrade() {
                panel.signal(&name, signal);
            }
        }));
    }

    fn apply(
        &self,
        state: &mut InputState,
        panel: &Panel,
        reading: Reading,
        startup: bool,
    ) -> Result<bool, ConfigError> {
        if let Some(value) = reading.value {
            state.last_value = Some(value);
        }
        let Some(status) = reading.status else {
            return Ok(false);
        };

        let now = panel.now();
        if let Some(changed_at) = state.last_changed_at {
            if now.saturating_sub(changed_at) <= self.debounce {
                debug!("{}: '{}' inside debounce window, ignored", self.name, status);
                self.ignored(panel, status, IgnoreReason::Debounce);
                return Ok(false);
            }
        }
        if !reading.force && state.last_status.as_ref() == Some(&status) {
            debug!("{}: still '{}'", self.name, status);
            self.ignored(panel, status, IgnoreReason::Unchanged);
            return Ok(false);
        }

        if let Some(timer) = state.recheck.take() {
            timer.cancel();
        }
        state.last_changed_at = Some(now);
        state.last_status = Some(status.clone());
        if startup {
            info!("{} -> {} (startup)", self.name, status);
        } else {
            info!("{} -> {}", self.name, status);
        }
        panel.emit(&PanelEvent::StatusChanged {
            device: self.name.clone(),
            status: status.clone(),
            startup,
        });

        let dispatched = panel.take_action(self, &status, startup);
        if !startup && self.kind.resamples() {
            self.arm_recheck(state, panel);
        }
        dispatched.map(|()| true)
    }

    fn ignored(&self, panel: &Panel, status: Label, reason: IgnoreReason) {
        panel.emit(&PanelEvent::StatusIgnored {
            device: self.name.clone(),
            status,
            reason,
        });
    }

    fn arm_recheck(&self, state: &mut InputState, panel: &Panel) {
        let owner = panel.handle();
        let name = self.name.clone();
        let started = OneShotTimer::start(
            &format!("recheck-{}", self.name),
            self.debounce.saturating_add(RECHECK_MARGIN),
            move |token| {
                if let Some(panel) = owner.upgrade() {
                    panel.recheck_input(&name, token);
                }
            },
        );
        match started {
            Ok(timer) => state.recheck = Some(timer),
            Err(e) => warn!("{}: re-check timer not started: {}", self.name, e),
        }
    }
}

impl Device for InputDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind.device_kind()
    }

    fn state(&self) -> DeviceState {
        let state = lock(&self.state);
        DeviceState {
            last_status: state.last_status.clone(),
            last_value: state.last_value,
        }
    }
}
