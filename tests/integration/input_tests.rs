//! Input state machines end to end: debounce, re-verification and the
//! variant-specific status mapping.

use std::time::Duration;

use picontrol::app::events::{IgnoreReason, PanelEvent};
use picontrol::app::ports::Rotation;
use picontrol::device::Label;

use crate::mock_hw::{Harness, eventually};

fn labels(items: &[&str]) -> Vec<Label> {
    items.iter().map(|s| Label::from(*s)).collect()
}

const BUTTON: &str = r#"
polling_interval: 60
outputs:
  porch: { type: http, url: http://hub/porch }
inputs:
  bell:
    type: button
    gpio_pin: 17
    debounce: 0.05
    actions:
      pressed: [{ name: porch }]
"#;

// ── Button / debounce ─────────────────────────────────────────

#[test]
fn reports_inside_debounce_window_fire_once() {
    let h = Harness::started(BUTTON);

    h.hw.press(17);
    h.hw.release(17);
    h.hw.press(17);

    assert_eq!(h.transport.requests().len(), 1);
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            PanelEvent::StatusIgnored { reason: IgnoreReason::Debounce, .. }
        )),
        2
    );
}

#[test]
fn debounce_measures_from_last_accepted_change() {
    let h = Harness::started(BUTTON);

    h.hw.press(17);
    h.clock.advance(Duration::from_millis(50));
    h.hw.release(17);
    assert_eq!(h.sink.statuses("bell"), labels(&["released", "pressed"]));

    h.clock.advance(Duration::from_millis(1));
    h.hw.release(17);
    assert_eq!(
        h.sink.statuses("bell"),
        labels(&["released", "pressed", "released"])
    );
}

#[test]
fn repeated_status_is_not_a_change() {
    let h = Harness::started(BUTTON);
    h.hw.press(17);
    h.clock.advance_secs(1.0);
    h.hw.press(17);
    assert_eq!(h.transport.requests().len(), 1);
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            PanelEvent::StatusIgnored { reason: IgnoreReason::Unchanged, .. }
        )),
        1
    );
}

#[test]
fn recheck_recovers_a_dropped_release() {
    let h = Harness::started(BUTTON);
    let bell = h.panel.input("bell").unwrap();

    h.hw.press(17);
    assert!(bell.has_pending_recheck());
    // Release lands inside the window and is dropped.
    h.hw.release(17);
    assert_eq!(bell.last_status(), Some(Label::from("pressed")));

    // Let the window pass on the panel clock; the timer fires at
    // debounce + 100 ms of real time.
    h.clock.advance_secs(1.0);
    assert!(eventually(|| bell.last_status() == Some(Label::from("released"))));
    assert_eq!(h.transport.requests().len(), 1);
}

#[test]
fn accepted_change_cancels_pending_recheck() {
    let h = Harness::started(BUTTON);
    let bell = h.panel.input("bell").unwrap();

    h.hw.press(17);
    h.clock.advance_secs(1.0);
    h.hw.release(17);
    h.clock.advance_secs(1.0);
    h.hw.press(17);
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(
        h.sink.statuses("bell"),
        labels(&["released", "pressed", "released", "pressed"])
    );
    assert_eq!(h.transport.requests().len(), 2);
}

#[test]
fn shutdown_cancels_rechecks_and_ignores_signals() {
    let h = Harness::started(BUTTON);
    h.hw.press(17);
    h.panel.shutdown();
    assert!(!h.panel.input("bell").unwrap().has_pending_recheck());
    assert!(!h.panel.is_running());

    h.clock.advance_secs(5.0);
    h.hw.release(17);
    assert_eq!(h.sink.statuses("bell"), labels(&["released", "pressed"]));
    assert_eq!(h.sink.count(|e| matches!(e, PanelEvent::Stopped { .. })), 1);
}

// ── Potentiometer ─────────────────────────────────────────────

const DIMMER: &str = r#"
polling_interval: 60
expanders:
  adc0: { type: adc, chip: mcp3008 }
outputs:
  lamp: { type: http, url: http://hub/lamp }
inputs:
  dimmer:
    type: potentiometer
    source_device: adc0
    source_channel: 3
    actions:
      100: [{ name: lamp, post_data: { level: high } }]
      30: [{ name: lamp, post_data: { level: low } }]
      60: [{ name: lamp, post_data: { level: mid } }]
"#;

#[test]
fn potentiometer_dispatches_on_bucket_changes_only() {
    // Parked at the top: 100 falls in no bucket, so startup stays quiet.
    let h = Harness::started_with(DIMMER, |hw| hw.set_analog("mcp3008", 3, 1.0));
    assert!(h.sink.statuses("dimmer").is_empty());

    for value in [0.10, 0.25, 0.45, 0.45, 0.80] {
        h.hw.set_analog("mcp3008", 3, value);
        h.clock.advance_secs(1.0);
        h.panel.update_input("dimmer").unwrap();
    }

    assert_eq!(h.sink.statuses("dimmer"), labels(&["30", "60", "100"]));
    assert_eq!(h.transport.requests().len(), 3);
    assert_eq!(h.panel.input("dimmer").unwrap().last_value(), Some(80.0));
}

#[test]
fn polling_loop_samples_potentiometers() {
    let yaml = DIMMER.replace("polling_interval: 60", "polling_interval: 0.02");
    let h = Harness::started_with(&yaml, |hw| hw.set_analog("mcp3008", 3, 1.0));
    h.hw.set_analog("mcp3008", 3, 0.5);
    assert!(eventually(|| h.sink.statuses("dimmer") == labels(&["60"])));
}

#[test]
fn potentiometer_needs_an_adc_channel_in_range() {
    let bad_channel = DIMMER.replace("source_channel: 3", "source_channel: 8");
    assert!(Harness::build(&bad_channel).is_err());
    let bad_source = DIMMER.replace("source_device: adc0", "source_device: adc9");
    assert!(Harness::build(&bad_source).is_err());
}

// ── Rotary encoder ────────────────────────────────────────────

const VOLUME: &str = r#"
outputs:
  amp: { type: http, url: http://hub/amp }
inputs:
  volume:
    type: rotary_encoder
    gpio_pins: { up: 5, down: 6 }
    value_type: directional
    debounce: 0
    actions:
      up: [{ name: amp, post_data: { step: 1 } }]
      down: [{ name: amp, post_data: { step: -1 } }]
  position:
    type: rotary_encoder
    gpio_pins: { up: 12, down: 13 }
    total_segments: 4
    debounce: 0
"#;

#[test]
fn directional_steps_always_fire() {
    let h = Harness::started(VOLUME);
    for _ in 0..3 {
        h.clock.advance(Duration::from_millis(1));
        h.hw.rotate(5, Rotation::Clockwise);
    }
    h.clock.advance(Duration::from_millis(1));
    h.hw.rotate(6, Rotation::CounterClockwise);

    assert_eq!(h.sink.statuses("volume"), labels(&["up", "up", "up", "down"]));
    assert_eq!(h.transport.requests().len(), 4);
    assert!(!h.panel.input("volume").unwrap().has_pending_recheck());
}

#[test]
fn absolute_encoder_reports_bounded_steps() {
    let h = Harness::started(VOLUME);
    for _ in 0..4 {
        h.clock.advance(Duration::from_millis(1));
        h.hw.rotate(12, Rotation::Clockwise);
    }
    // total_segments 4 → max 2 steps; the bound repeats but still fires.
    assert_eq!(h.sink.statuses("position"), labels(&["1", "2", "2", "2"]));
    assert_eq!(h.panel.input("position").unwrap().last_value(), Some(2.0));
}

#[test]
fn rotation_without_clock_advance_is_debounced() {
    let h = Harness::started(VOLUME);
    h.hw.rotate(5, Rotation::Clockwise);
    h.hw.rotate(5, Rotation::Clockwise);
    assert_eq!(h.sink.statuses("volume"), labels(&["up"]));
}

// ── Selector switch ───────────────────────────────────────────

const MODE: &str = r#"
outputs:
  hub: { type: http, url: http://hub/mode }
inputs:
  mode:
    type: selector_switch
    gpio_pins: { night: 23, day: 22, away: 24 }
    debounce: 0.1
    actions:
      day: [{ name: hub, post_data: { mode: day }, init: true }]
      night: [{ name: hub, post_data: { mode: night } }]
"#;

#[test]
fn selector_reports_closing_positions() {
    let h = Harness::started_with(MODE, |_| {});
    assert!(h.sink.statuses("mode").is_empty(), "nothing asserted at startup");

    h.hw.press(22);
    h.clock.advance_secs(1.0);
    h.hw.release(22);
    h.clock.advance_secs(1.0);
    h.hw.press(23);

    assert_eq!(h.sink.statuses("mode"), labels(&["day", "night"]));
    assert_eq!(h.transport.requests().len(), 2);
}

#[test]
fn enormous_debounce_keeps_the_recheck_armed() {
    let yaml = MODE.replace("debounce: 0.1", "debounce: 1.8e19");
    let h = Harness::started(&yaml);
    let mode = h.panel.input("mode").unwrap();

    h.hw.press(22);
    assert_eq!(mode.last_status(), Some(Label::from("day")));
    std::thread::sleep(Duration::from_millis(50));
    assert!(mode.has_pending_recheck());

    h.clock.advance_secs(1.0);
    h.hw.press(23);
    assert_eq!(mode.last_status(), Some(Label::from("day")), "still debounced");
    h.panel.shutdown();
    assert!(!mode.has_pending_recheck());
}

#[test]
fn selector_without_positions_is_rejected() {
    let yaml = "inputs:\n  mode: { type: selector_switch }\n";
    assert!(Harness::build(yaml).is_err());
}
