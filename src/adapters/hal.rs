//! embedded-hal 1.0 pin adapters.
//!
//! Wrap any HAL implementation (a Linux GPIO character device, a board
//! support crate) so the panel can drive it through its ports:
//!
//! | Adapter          | HAL trait       | Port            |
//! |------------------|-----------------|-----------------|
//! | [`HalPwm`]       | `SetDutyCycle`  | `PwmOutput`     |
//! | [`HalSwitch`]    | `OutputPin`     | `PwmOutput`     |
//! | [`HalInput`]     | `InputPin`      | `DigitalInput`  |
//!
//! `InputPin` has no interrupt support, so [`HalInput`] detects edges in
//! [`poll`](HalInput::poll), which the owner calls from its own loop.

use std::sync::Mutex;

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::{DigitalInput, EdgeCallback, PwmOutput};
use crate::timer::lock;

// ───────────────────────────────────────────────────────────────
// Outputs
// ───────────────────────────────────────────────────────────────

/// Dimmable LED on a PWM channel.
pub struct HalPwm<P: SetDutyCycle> {
    channel: P,
    max_duty: u16,
}

impl<P: SetDutyCycle> HalPwm<P> {
    pub fn new(channel: P) -> Self {
        let max_duty = channel.max_duty_cycle();
        Self { channel, max_duty }
    }

    fn duty(&self, value: f32) -> u16 {
        (value.clamp(0.0, 1.0) * f32::from(self.max_duty)).round() as u16
    }
}

impl<P: SetDutyCycle + Send> PwmOutput for HalPwm<P> {
    fn set_intensity(&mut self, value: f32) {
        let duty = self.duty(value);
        if let Err(e) = self.channel.set_duty_cycle(duty) {
            warn!("PWM write failed: {:?}", e);
        }
    }
}

/// Plain on/off line. Any intensity above zero drives it high.
pub struct HalSwitch<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> HalSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin + Send> PwmOutput for HalSwitch<P> {
    fn set_intensity(&mut self, value: f32) {
        let result = if value > 0.0 {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("GPIO write failed: {:?}", e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Inputs
// ───────────────────────────────────────────────────────────────

struct InputState<P> {
    pin: P,
    last: bool,
}

/// Digital input with software edge detection.
pub struct HalInput<P: InputPin> {
    state: Mutex<InputState<P>>,
    pull_up: bool,
    callbacks: Mutex<Vec<EdgeCallback>>,
}

impl<P: InputPin> HalInput<P> {
    /// With `pull_up` the line idles high and reads active when low.
    pub fn new(mut pin: P, pull_up: bool) -> Self {
        let last = read_active(&mut pin, pull_up);
        Self {
            state: Mutex::new(InputState { pin, last }),
            pull_up,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Sample the line and fire callbacks if it changed since the last
    /// poll. Returns the new state on an edge.
    pub fn poll(&self) -> Option<bool> {
        let active = {
            let mut state = lock(&self.state);
            let active = read_active(&mut state.pin, self.pull_up);
            if active == state.last {
                return None;
            }
            state.last = active;
            active
        };
        for callback in lock(&self.callbacks).iter() {
            callback(active);
        }
        Some(active)
    }
}

fn read_active<P: InputPin>(pin: &mut P, pull_up: bool) -> bool {
    match pin.is_high() {
        Ok(high) => high != pull_up,
        Err(e) => {
            warn!("GPIO read failed: {:?}", e);
            false
        }
    }
}

impl<P: InputPin + Send> DigitalInput for HalInput<P> {
    fn is_active(&self) -> bool {
        let mut state = lock(&self.state);
        read_active(&mut state.pin, self.pull_up)
    }

    fn on_edge(&self, callback: EdgeCallback) {
        lock(&self.callbacks).push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as DigitalErrorType;
    use embedded_hal::pwm::ErrorType as PwmErrorType;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakePwm {
        duty: Arc<AtomicUsize>,
    }

    impl PwmErrorType for FakePwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty.store(usize::from(duty), Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakePin {
        high: Arc<AtomicBool>,
    }

    impl DigitalErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.high.load(Ordering::SeqCst))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.high.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn pwm_scales_to_max_duty() {
        let duty = Arc::new(AtomicUsize::new(0));
        let mut led = HalPwm::new(FakePwm { duty: Arc::clone(&duty) });
        led.set_intensity(0.25);
        assert_eq!(duty.load(Ordering::SeqCst), 250);
        led.set_intensity(2.0);
        assert_eq!(duty.load(Ordering::SeqCst), 1000);
    }

    #[test]
    fn pull_up_input_reports_edges_once() {
        let high = Arc::new(AtomicBool::new(true));
        let input = HalInput::new(FakePin { high: Arc::clone(&high) }, true);
        let edges = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&edges);
        input.on_edge(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!input.is_active());
        assert_eq!(input.poll(), None);
        high.store(false, Ordering::SeqCst);
        assert_eq!(input.poll(), Some(true));
        assert_eq!(input.poll(), None);
        assert_eq!(edges.load(Ordering::SeqCst), 1);
    }
}
