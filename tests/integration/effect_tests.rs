//! LED effects and the haptic driver, observed through the simulated PWM
//! line and motor.

use std::thread;
use std::time::Duration;

use picontrol::config::ActionSpec;
use picontrol::error::ActionError;

use crate::mock_hw::Harness;

const OUTPUTS: &str = r#"
outputs:
  porch: { type: led, gpio_pin: 18 }
  buzz: { type: haptic, source_bus: i2c, motor: lra, effect: 10 }
  tap: { type: haptic, source_bus: I2C }
"#;

const PIN: u8 = 18;

fn led(verb: &str) -> ActionSpec {
    ActionSpec::new("porch").verb(verb)
}

fn timed(verb: &str, secs: f64) -> ActionSpec {
    ActionSpec {
        duration: Some(secs),
        ..led(verb)
    }
}

// ── LED effects ───────────────────────────────────────────────

#[test]
fn blink_alternates_and_ends_dark() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    let spec = ActionSpec {
        iterations: Some(3),
        ..timed("blink", 0.3)
    };
    porch.action(&spec, h.panel.now()).unwrap();
    porch.wait();

    assert_eq!(h.hw.pwm_history(PIN), [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    assert!(!porch.is_busy());
}

#[test]
fn new_action_supersedes_running_effect() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&timed("fade_on", 2.0), h.panel.now()).unwrap();
    thread::sleep(Duration::from_millis(150));
    porch.action(&led("on"), h.panel.now()).unwrap();
    porch.wait();

    let settled = h.hw.pwm_history(PIN);
    assert_eq!(settled.last(), Some(&1.0));
    thread::sleep(Duration::from_millis(150));
    assert_eq!(h.hw.pwm_history(PIN).len(), settled.len(), "faded after losing the line");
}

#[test]
fn stopped_fade_off_still_goes_dark() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&led("on"), h.panel.now()).unwrap();
    porch.action(&timed("fade_off", 2.0), h.panel.now()).unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(porch.stop());
    porch.wait();

    assert_eq!(h.hw.pwm_level(PIN), Some(0.0));
}

#[test]
fn stopped_fade_on_keeps_partial_level() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&timed("fade_on", 2.0), h.panel.now()).unwrap();
    thread::sleep(Duration::from_millis(150));
    porch.stop();
    porch.wait();

    let level = h.hw.pwm_level(PIN).unwrap();
    assert!(level > 0.0 && level < 1.0, "level {level}");
}

#[test]
fn stopping_an_effect_with_an_enormous_duration_still_goes_dark() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&timed("blink", 1.8e19), h.panel.now()).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(porch.is_busy());
    assert_eq!(h.hw.pwm_level(PIN), Some(1.0));

    assert!(porch.stop());
    porch.wait();
    assert_eq!(h.hw.pwm_level(PIN), Some(0.0));
}

#[test]
fn flicker_on_finishes_lit_and_repeats_are_skipped() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&timed("flicker_on", 0.09), h.panel.now()).unwrap();
    porch.wait();
    assert_eq!(h.hw.pwm_level(PIN), Some(1.0));

    let writes = h.hw.pwm_history(PIN).len();
    porch.action(&timed("flicker_on", 0.09), h.panel.now()).unwrap();
    porch.action(&led("on"), h.panel.now()).unwrap();
    porch.wait();
    assert_eq!(h.hw.pwm_history(PIN).len(), writes);
}

#[test]
fn off_on_a_dark_led_writes_nothing() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();
    porch.action(&led("off"), h.panel.now()).unwrap();
    porch.action(&led("flicker_off"), h.panel.now()).unwrap();
    porch.wait();
    assert_eq!(h.hw.pwm_history(PIN), [0.0]);
}

#[test]
fn value_verb_is_validated() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();

    let err = porch.action(&led("value"), h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::MissingField { field: "value", .. }));

    let too_bright = ActionSpec {
        value: Some(1.5),
        ..led("value")
    };
    let err = porch.action(&too_bright, h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::InvalidField { field: "value", .. }));

    let dim = ActionSpec {
        value: Some(0.25),
        ..led("value")
    };
    porch.action(&dim, h.panel.now()).unwrap();
    assert_eq!(h.hw.pwm_level(PIN), Some(0.25));
}

#[test]
fn led_rejects_unknown_verbs_and_missing_verb() {
    let h = Harness::started(OUTPUTS);
    let porch = h.panel.output("porch").unwrap();

    let err = porch.action(&led("strobe"), h.panel.now()).unwrap_err();
    assert_eq!(
        err,
        ActionError::UnsupportedVerb {
            device: "porch".into(),
            verb: "strobe".into()
        }
    );
    let err = porch.action(&ActionSpec::new("porch"), h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::MissingField { field: "action", .. }));
}

#[test]
fn excessive_blink_iterations_are_rejected() {
    let h = Harness::started(OUTPUTS);
    let spec = ActionSpec {
        iterations: Some(1_000_000),
        ..led("blink")
    };
    let err = h.panel.output("porch").unwrap().action(&spec, h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::InvalidField { field: "iterations", .. }));
}

// ── Haptic ────────────────────────────────────────────────────

#[test]
fn haptic_override_becomes_the_new_default() {
    let h = Harness::started(OUTPUTS);
    let buzz = h.panel.output("buzz").unwrap();
    let play = ActionSpec::new("buzz");
    let strong = ActionSpec {
        effect: Some(47),
        ..ActionSpec::new("buzz")
    };

    buzz.action(&play, h.panel.now()).unwrap();
    buzz.action(&strong, h.panel.now()).unwrap();
    buzz.action(&play, h.panel.now()).unwrap();

    assert_eq!(h.hw.haptic_plays(), [10, 47, 47]);
    assert_eq!(buzz.last_action().last_action.as_deref(), Some("play"));
}

#[test]
fn haptic_without_any_effect_fails_at_action_time() {
    let h = Harness::started(OUTPUTS);
    let tap = h.panel.output("tap").unwrap();
    let err = tap.action(&ActionSpec::new("tap"), h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::MissingField { field: "effect", .. }));

    let out_of_range = ActionSpec {
        effect: Some(124),
        ..ActionSpec::new("tap")
    };
    let err = tap.action(&out_of_range, h.panel.now()).unwrap_err();
    assert!(matches!(err, ActionError::InvalidField { field: "effect", .. }));
    assert!(h.hw.haptic_plays().is_empty());
}
