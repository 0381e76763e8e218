//! Timed LED effect plans.
//!
//! An effect is a list of steps (write a level, then hold it) plus a rule
//! for the level it settles on, which depends on whether it was cancelled.
//! The LED driver walks the steps on an effect thread; the plans themselves
//! are pure and tested here.
//!
//! | Effect      | Steps | Step shape                                   | Done | Cancelled |
//! |-------------|-------|----------------------------------------------|------|-----------|
//! | blink       | 2n−1  | on, off, on, … each d/(2n−1)                 | off  | off       |
//! | flicker_on  | 15    | off (8−i)·d/45, then (i+1)/8 for i·d/45      | on   | off       |
//! | flicker_off | 15    | (8−i)/8 for (8−i)·d/45, then off for i·d/45  | off  | off       |
//! | fade_on     | 32    | (i+1)/32 for d/32                            | on   | as is     |
//! | fade_off    | 32    | (32−i)/32 for d/32                           | off  | off       |
//!
//! Flicker steps skip the leading segment for `i = 0`. A cancelled fade_on
//! leaves the LED at whatever level the ramp had reached.

use std::time::Duration;

const FLICKER_STEPS: u32 = 8;
const FLICKER_DIVISOR: u32 = 45;
const FADE_STEPS: u32 = 32;

/// Upper bound on blink iterations accepted from configuration.
pub const MAX_BLINK_ITERATIONS: u32 = 10_000;

/// Write `level`, then hold it for `hold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub level: f32,
    pub hold: Duration,
}

impl Step {
    fn new(level: f32, hold: Duration) -> Self {
        Self { level, hold }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Blink { iterations: u32, duration: Duration },
    FlickerOn { duration: Duration },
    FlickerOff { duration: Duration },
    FadeOn { duration: Duration },
    FadeOff { duration: Duration },
}

impl Effect {
    /// Map an action verb to its effect. `None` for non-effect verbs.
    pub fn from_verb(verb: &str, iterations: u32, duration: Duration) -> Option<Self> {
        match verb {
            "blink" => Some(Self::Blink {
                iterations,
                duration,
            }),
            "flicker_on" => Some(Self::FlickerOn { duration }),
            "flicker_off" => Some(Self::FlickerOff { duration }),
            "fade_on" => Some(Self::FadeOn { duration }),
            "fade_off" => Some(Self::FadeOff { duration }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Blink { .. } => "blink",
            Self::FlickerOn { .. } => "flicker_on",
            Self::FlickerOff { .. } => "flicker_off",
            Self::FadeOn { .. } => "fade_on",
            Self::FadeOff { .. } => "fade_off",
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        match *self {
            Self::Blink {
                iterations,
                duration,
            } => blink(iterations, duration),
            Self::FlickerOn { duration } => {
                let unit = duration / FLICKER_DIVISOR;
                let mut steps = Vec::with_capacity(2 * FLICKER_STEPS as usize);
                for i in 0..FLICKER_STEPS {
                    if i != 0 {
                        steps.push(Step::new(0.0, unit * (FLICKER_STEPS - i)));
                    }
                    let level = (i + 1) as f32 / FLICKER_STEPS as f32;
                    steps.push(Step::new(level, unit * i));
                }
                steps
            }
            Self::FlickerOff { duration } => {
                let unit = duration / FLICKER_DIVISOR;
                let mut steps = Vec::with_capacity(2 * FLICKER_STEPS as usize);
                for i in 0..FLICKER_STEPS {
                    if i != 0 {
                        let level = (FLICKER_STEPS - i) as f32 / FLICKER_STEPS as f32;
                        steps.push(Step::new(level, unit * (FLICKER_STEPS - i)));
                    }
                    steps.push(Step::new(0.0, unit * i));
                }
                steps
            }
            Self::FadeOn { duration } => {
                let hold = duration / FADE_STEPS;
                (0..FADE_STEPS)
                    .map(|i| Step::new((i + 1) as f32 / FADE_STEPS as f32, hold))
                    .collect()
            }
            Self::FadeOff { duration } => {
                let hold = duration / FADE_STEPS;
                (0..FADE_STEPS)
                    .map(|i| Step::new((FADE_STEPS - i) as f32 / FADE_STEPS as f32, hold))
                    .collect()
            }
        }
    }

    /// Level to settle on once the steps end. `None` leaves the output
    /// where the last step put it.
    pub fn terminal(&self, cancelled: bool) -> Option<f32> {
        match self {
            Self::Blink { .. } | Self::FlickerOff { .. } | Self::FadeOff { .. } => Some(0.0),
            Self::FlickerOn { .. } => Some(if cancelled { 0.0 } else { 1.0 }),
            Self::FadeOn { .. } => {
                if cancelled {
                    None
                } else {
                    Some(1.0)
                }
            }
        }
    }

    /// Sum of all step holds.
    pub fn total_duration(&self) -> Duration {
        self.steps()
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.hold))
    }
}

fn blink(iterations: u32, duration: Duration) -> Vec<Step> {
    if iterations == 0 {
        return Vec::new();
    }
    let segments = iterations.saturating_mul(2) - 1;
    let half = duration / segments;
    let mut steps = Vec::with_capacity(segments as usize);
    for i in 0..iterations {
        if i != 0 {
            steps.push(Step::new(0.0, half));
        }
        steps.push(Step::new(1.0, half));
    }
    steps
}
