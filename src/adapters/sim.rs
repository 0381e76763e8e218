//! Simulated hardware and logging transports.
//!
//! [`SimulatedHardware`] stands in for the GPIO header, ADC expanders and
//! haptic driver. Lines are driven from outside (`press`, `release`,
//! `rotate`, `set_analog`) and every output write is recorded, which makes
//! it the backend for dry runs and integration tests alike.
//!
//! [`LoggingTransport`] implements every transport port by logging what it
//! would have sent.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::info;

use crate::app::ports::{
    AnalogInput, AudioPort, DigitalInput, EdgeCallback, HapticMotor, HardwarePort, HttpPort,
    HttpRequest, Motor, NotifyPort, Publication, PublishPort, PwmOutput, RotaryInput, Rotation,
    RotationCallback,
};
use crate::error::{HardwareError, TransportError};
use crate::expander::Chip;
use crate::timer::lock;

// ───────────────────────────────────────────────────────────────
// Lines
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimLine {
    active: Mutex<bool>,
    callbacks: Mutex<Vec<EdgeCallback>>,
}

impl SimLine {
    fn drive(&self, active: bool, notify: bool) {
        *lock(&self.active) = active;
        if notify {
            for callback in lock(&self.callbacks).iter() {
                callback(active);
            }
        }
    }
}

impl DigitalInput for SimLine {
    fn is_active(&self) -> bool {
        *lock(&self.active)
    }

    fn on_edge(&self, callback: EdgeCallback) {
        lock(&self.callbacks).push(callback);
    }
}

struct SimEncoder {
    up: u8,
    down: u8,
    max_steps: i64,
    steps: Mutex<i64>,
    callbacks: Mutex<Vec<RotationCallback>>,
}

impl SimEncoder {
    fn turn(&self, rotation: Rotation) {
        let steps = {
            let mut steps = lock(&self.steps);
            *steps = match rotation {
                Rotation::Clockwise => (*steps + 1).min(self.max_steps),
                Rotation::CounterClockwise => (*steps - 1).max(-self.max_steps),
            };
            *steps
        };
        for callback in lock(&self.callbacks).iter() {
            callback(rotation, steps);
        }
    }
}

impl RotaryInput for SimEncoder {
    fn steps(&self) -> i64 {
        *lock(&self.steps)
    }

    fn on_rotate(&self, callback: RotationCallback) {
        lock(&self.callbacks).push(callback);
    }
}

#[derive(Default)]
struct SimChannel {
    value: Mutex<f32>,
}

impl AnalogInput for SimChannel {
    fn read(&self) -> f32 {
        *lock(&self.value)
    }
}

struct SimPwm {
    history: Arc<Mutex<Vec<f32>>>,
}

impl PwmOutput for SimPwm {
    fn set_intensity(&mut self, value: f32) {
        lock(&self.history).push(value);
    }
}

struct SimHaptic {
    plays: Arc<Mutex<Vec<u8>>>,
}

impl HapticMotor for SimHaptic {
    fn play(&mut self, effect: u8) {
        lock(&self.plays).push(effect);
    }
}

// ───────────────────────────────────────────────────────────────
// SimulatedHardware
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    claimed: BTreeSet<u8>,
    lines: BTreeMap<u8, Arc<SimLine>>,
    encoders: Vec<Arc<SimEncoder>>,
    channels: BTreeMap<(String, u8), Arc<SimChannel>>,
    pwm: BTreeMap<u8, Arc<Mutex<Vec<f32>>>>,
}

impl Registry {
    fn claim(&mut self, pin: u8) -> Result<(), HardwareError> {
        if self.claimed.insert(pin) {
            Ok(())
        } else {
            Err(HardwareError::new(format!("GPIO {pin} is already in use")))
        }
    }
}

/// In-memory hardware backend.
#[derive(Default)]
pub struct SimulatedHardware {
    registry: Mutex<Registry>,
    haptic_plays: Arc<Mutex<Vec<u8>>>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, pin: u8) -> Option<Arc<SimLine>> {
        lock(&self.registry).lines.get(&pin).cloned()
    }

    /// Assert the line and deliver the edge. Returns `false` for a pin
    /// nothing has opened.
    pub fn press(&self, pin: u8) -> bool {
        self.line(pin).map(|l| l.drive(true, true)).is_some()
    }

    pub fn release(&self, pin: u8) -> bool {
        self.line(pin).map(|l| l.drive(false, true)).is_some()
    }

    /// Change a line without delivering the edge, as if the interrupt was
    /// lost.
    pub fn set_line_silently(&self, pin: u8, active: bool) -> bool {
        self.line(pin).map(|l| l.drive(active, false)).is_some()
    }

    pub fn is_active(&self, pin: u8) -> Option<bool> {
        self.line(pin).map(|l| l.is_active())
    }

    /// Turn the encoder that owns `pin` one detent.
    pub fn rotate(&self, pin: u8, rotation: Rotation) -> bool {
        let encoder = lock(&self.registry)
            .encoders
            .iter()
            .find(|e| e.up == pin || e.down == pin)
            .cloned();
        encoder.map(|e| e.turn(rotation)).is_some()
    }

    /// Set an ADC channel, normalised to `0.0..=1.0`. Channels that were
    /// never opened are created, so values can be staged before startup.
    pub fn set_analog(&self, chip: &str, channel: u8, value: f32) {
        let key = (chip.to_ascii_lowercase(), channel);
        let sim = Arc::clone(lock(&self.registry).channels.entry(key).or_default());
        *lock(&sim.value) = value.clamp(0.0, 1.0);
    }

    /// Every intensity written to the PWM line on `pin`, oldest first.
    pub fn pwm_history(&self, pin: u8) -> Vec<f32> {
        lock(&self.registry)
            .pwm
            .get(&pin)
            .map(|h| lock(h).clone())
            .unwrap_or_default()
    }

    pub fn pwm_level(&self, pin: u8) -> Option<f32> {
        self.pwm_history(pin).last().copied()
    }

    pub fn haptic_plays(&self) -> Vec<u8> {
        lock(&self.haptic_plays).clone()
    }
}

impl HardwarePort for SimulatedHardware {
    fn digital_input(&self, pin: u8, pull_up: bool) -> Result<Arc<dyn DigitalInput>, HardwareError> {
        let mut registry = lock(&self.registry);
        registry.claim(pin)?;
        let line = Arc::new(SimLine::default());
        registry.lines.insert(pin, Arc::clone(&line));
        info!("sim: GPIO {} input (pull_up={})", pin, pull_up);
        Ok(line)
    }

    fn analog_input(&self, chip: &Chip, channel: u8) -> Result<Arc<dyn AnalogInput>, HardwareError> {
        let key = (chip.model.to_ascii_lowercase(), channel);
        let sim = Arc::clone(lock(&self.registry).channels.entry(key).or_default());
        info!("sim: {} channel {}", chip.model, channel);
        Ok(sim)
    }

    fn rotary_input(
        &self,
        up: u8,
        down: u8,
        max_steps: u32,
    ) -> Result<Arc<dyn RotaryInput>, HardwareError> {
        let mut registry = lock(&self.registry);
        registry.claim(up)?;
        registry.claim(down)?;
        let encoder = Arc::new(SimEncoder {
            up,
            down,
            max_steps: i64::from(max_steps),
            steps: Mutex::new(0),
            callbacks: Mutex::new(Vec::new()),
        });
        registry.encoders.push(Arc::clone(&encoder));
        info!("sim: encoder on GPIO {}/{}", up, down);
        Ok(encoder)
    }

    fn pwm_output(&self, pin: u8) -> Result<Box<dyn PwmOutput>, HardwareError> {
        let mut registry = lock(&self.registry);
        registry.claim(pin)?;
        let history = Arc::new(Mutex::new(Vec::new()));
        registry.pwm.insert(pin, Arc::clone(&history));
        info!("sim: GPIO {} PWM output", pin);
        Ok(Box::new(SimPwm { history }))
    }

    fn haptic(&self, motor: Motor) -> Result<Box<dyn HapticMotor>, HardwareError> {
        info!("sim: haptic driver ({:?})", motor);
        Ok(Box::new(SimHaptic {
            plays: Arc::clone(&self.haptic_plays),
        }))
    }
}

// ───────────────────────────────────────────────────────────────
// LoggingTransport
// ───────────────────────────────────────────────────────────────

/// Logs every request instead of sending it.
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl HttpPort for LoggingTransport {
    fn send(&self, request: &HttpRequest) -> Result<(), TransportError> {
        match &request.body {
            Some(body) => info!(target: "transport", "{} {} {}", request.method, request.url, body),
            None => info!(target: "transport", "{} {}", request.method, request.url),
        }
        Ok(())
    }
}

impl PublishPort for LoggingTransport {
    fn publish(&self, publication: &Publication) -> Result<(), TransportError> {
        info!(
            target: "transport",
            "publish {} (qos={}, retain={}): {}",
            publication.topic, publication.qos, publication.retain, publication.payload
        );
        Ok(())
    }
}

impl NotifyPort for LoggingTransport {
    fn notify(&self, topic_arn: &str, message: &str) -> Result<(), TransportError> {
        info!(target: "transport", "notify {}: {}", topic_arn, message);
        Ok(())
    }
}

impl AudioPort for LoggingTransport {
    fn play(&self, path: &Path) -> Result<(), TransportError> {
        info!(target: "transport", "play {}", path.display());
        Ok(())
    }
}
