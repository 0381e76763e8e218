//! Port traits: the boundary between the panel core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Panel / devices (domain)
//! ```
//!
//! Hardware (pins, ADC channels, PWM, haptic drivers), fire-and-forget
//! transports (HTTP, pub/sub, notifications, audio), time and event output
//! all sit behind these traits. The panel holds them as trait objects in a
//! [`Ports`] bundle, so tests and dry runs swap in recording or logging
//! adapters without touching device logic.
//!
//! Everything here is `Send + Sync` (or `Send` for exclusively-owned
//! handles): devices are driven from interrupt callbacks, timer threads,
//! effect tasks and the polling loop at once.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{HardwareError, TransportError};
use crate::expander::Chip;

// ───────────────────────────────────────────────────────────────
// Input connections (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Callback for a digital edge; receives the new asserted state.
pub type EdgeCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Callback for one encoder detent; receives the direction and the step
/// count after the move.
pub type RotationCallback = Box<dyn Fn(Rotation, i64) + Send + Sync>;

/// Direction of one rotary encoder step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Status label used by directional encoders.
    pub fn label(self) -> &'static str {
        match self {
            Self::Clockwise => "up",
            Self::CounterClockwise => "down",
        }
    }
}

/// A digital line: button contact or selector position.
pub trait DigitalInput: Send + Sync {
    /// `true` while the line is asserted (pressed / selected), after
    /// accounting for pull-up inversion.
    fn is_active(&self) -> bool;

    /// Register a callback for every edge on this line.
    fn on_edge(&self, callback: EdgeCallback);
}

/// One analog channel, normalised to `0.0..=1.0`.
pub trait AnalogInput: Send + Sync {
    fn read(&self) -> f32;
}

/// Quadrature rotary encoder.
pub trait RotaryInput: Send + Sync {
    /// Current step count, bounded by the encoder's `max_steps`.
    fn steps(&self) -> i64;

    fn on_rotate(&self, callback: RotationCallback);
}

// ───────────────────────────────────────────────────────────────
// Output connections (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Dimmable (or plain on/off) output line.
pub trait PwmOutput: Send {
    /// Drive the line at `value` in `0.0..=1.0`. On/off lines treat any
    /// value above zero as on.
    fn set_intensity(&mut self, value: f32);
}

/// Haptic motor driver.
pub trait HapticMotor: Send {
    /// Play a built-in waveform effect (1–123).
    fn play(&mut self, effect: u8);
}

/// Haptic actuator type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motor {
    /// Eccentric rotating mass.
    Erm,
    /// Linear resonant actuator.
    Lra,
}

// ───────────────────────────────────────────────────────────────
// Hardware factory
// ───────────────────────────────────────────────────────────────

/// Opens hardware connections while the panel is being built.
pub trait HardwarePort: Send + Sync {
    fn digital_input(&self, pin: u8, pull_up: bool) -> Result<Arc<dyn DigitalInput>, HardwareError>;

    fn analog_input(&self, chip: &Chip, channel: u8) -> Result<Arc<dyn AnalogInput>, HardwareError>;

    fn rotary_input(
        &self,
        up: u8,
        down: u8,
        max_steps: u32,
    ) -> Result<Arc<dyn RotaryInput>, HardwareError>;

    fn pwm_output(&self, pin: u8) -> Result<Box<dyn PwmOutput>, HardwareError>;

    fn haptic(&self, motor: Motor) -> Result<Box<dyn HapticMotor>, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Transports (fire-and-forget)
// ───────────────────────────────────────────────────────────────

/// Fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Upper-case method, e.g. `GET`.
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

pub trait HttpPort: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<(), TransportError>;
}

/// Message for the pub/sub broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

pub trait PublishPort: Send + Sync {
    fn publish(&self, publication: &Publication) -> Result<(), TransportError>;
}

/// SMS / push notification service.
pub trait NotifyPort: Send + Sync {
    fn notify(&self, topic_arn: &str, message: &str) -> Result<(), TransportError>;
}

pub trait AudioPort: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Time and events
// ───────────────────────────────────────────────────────────────

/// Monotonic time source. Only differences between readings matter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// The panel emits structured [`PanelEvent`](super::events::PanelEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::PanelEvent);
}

// ───────────────────────────────────────────────────────────────
// Bundle
// ───────────────────────────────────────────────────────────────

/// Every collaborator a [`Panel`](super::panel::Panel) needs.
#[derive(Clone)]
pub struct Ports {
    pub hardware: Arc<dyn HardwarePort>,
    pub http: Arc<dyn HttpPort>,
    pub publisher: Arc<dyn PublishPort>,
    pub notifier: Arc<dyn NotifyPort>,
    pub audio: Arc<dyn AudioPort>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}
