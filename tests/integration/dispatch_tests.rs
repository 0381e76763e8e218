//! Action dispatch: ordering, startup replay, cooldown, error handling and
//! the pass-through outputs.

use std::time::Duration;

use picontrol::app::events::PanelEvent;
use picontrol::device::{Device, Label};
use picontrol::error::{ActionError, ConfigError};

use crate::mock_hw::Harness;

const PANEL: &str = r#"
outputs:
  porch: { type: led, gpio_pin: 18 }
  lights:
    type: http
    url: http://hub/api
    bearer_token: secret
    post_data: { room: hall }
  bare: { type: http }
  notify: { type: message, service: sns, topic_arn: "arn:aws:sns:eu:1:panel", message: ring }
  mqtt: { type: message, service: mqtt, topic: home/panel }
  chime: { type: sound, file: chime.mp3, directory: /snd }
inputs:
  doorbell:
    type: button
    gpio_pin: 17
    actions:
      pressed:
        - { name: lights, post_data: { on: true }, delay: 5 }
        - { name: notify }
        - { name: chime }
      released:
        - { name: porch, action: "on", init: true }
        - { name: mqtt, message: idle }
        - { name: notify, message: boot, init: true }
  fault:
    type: button
    gpio_pin: 27
    actions:
      pressed:
        - { name: bare }
        - { name: chime, file: buzz.ogg }
        - { name: porch, action: blink, iterations: 2, duration: 0.04 }
"#;

fn label(s: &str) -> Label {
    Label::from(s)
}

#[test]
fn startup_replay_runs_only_init_actions_in_order() {
    let h = Harness::started(PANEL);

    let startup: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PanelEvent::ActionDispatched { input, output, .. } if input == "doorbell" => {
                Some(output)
            }
            _ => None,
        })
        .collect();
    assert_eq!(startup, ["porch", "notify"]);
    assert!(h.transport.publications.lock().unwrap().is_empty(), "mqtt is not init");
    assert_eq!(
        h.transport.notifications.lock().unwrap().as_slice(),
        [("arn:aws:sns:eu:1:panel".to_owned(), "boot".to_owned())]
    );
    assert_eq!(h.hw.pwm_level(18), Some(1.0));
    assert_eq!(
        h.panel.input("doorbell").unwrap().last_status(),
        Some(label("released"))
    );
}

#[test]
fn startup_replay_arms_no_recheck() {
    let h = Harness::started(PANEL);
    assert!(!h.panel.input("doorbell").unwrap().has_pending_recheck());
}

#[test]
fn cooldown_suppresses_then_allows() {
    let h = Harness::started(PANEL);
    let doorbell = h.panel.input("doorbell").unwrap();
    let pressed = label("pressed");
    h.transport.requests.lock().unwrap().clear();

    h.clock.set(Duration::from_secs(100));
    h.panel.take_action(doorbell, &pressed, false).unwrap();
    h.clock.set(Duration::from_secs(103));
    h.panel.take_action(doorbell, &pressed, false).unwrap();
    h.clock.set(Duration::from_secs(106));
    h.panel.take_action(doorbell, &pressed, false).unwrap();

    assert_eq!(h.transport.requests().len(), 2);
    let suppressed = h.sink.count(|e| {
        matches!(e, PanelEvent::ActionSuppressed { output, remaining, .. }
            if output == "lights" && *remaining == Duration::from_secs(2))
    });
    assert_eq!(suppressed, 1);
    // Entries without a delay are unaffected.
    assert_eq!(h.transport.plays.lock().unwrap().len(), 3);
}

#[test]
fn http_request_merges_defaults_and_overrides() {
    let h = Harness::started(PANEL);
    h.transport.requests.lock().unwrap().clear();
    h.panel
        .take_action(h.panel.input("doorbell").unwrap(), &label("pressed"), false)
        .unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "http://hub/api");
    assert_eq!(req.body, Some(serde_json::json!({ "room": "hall", "on": true })));
    assert!(req
        .headers
        .contains(&("Authorization".to_owned(), "Bearer secret".to_owned())));

    let plays = h.transport.plays.lock().unwrap().clone();
    assert_eq!(plays, [std::path::PathBuf::from("/snd/chime.mp3")]);
}

#[test]
fn action_errors_do_not_stop_the_chain() {
    let h = Harness::started(PANEL);
    h.sink.clear();
    h.panel
        .take_action(h.panel.input("fault").unwrap(), &label("pressed"), false)
        .unwrap();

    let failures: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PanelEvent::ActionFailed { output, error, .. } => Some((output, error)),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(
        failures[0],
        (
            "bare".to_owned(),
            ActionError::MissingField {
                device: "bare".into(),
                field: "url"
            }
        )
    );
    assert!(matches!(
        failures[1].1,
        ActionError::InvalidField { field: "file", .. }
    ));
    assert_eq!(h.sink.dispatched(), [("porch".to_owned(), Some("blink".to_owned()))]);

    let porch = h.panel.output("porch").unwrap();
    porch.wait();
    assert_eq!(porch.last_action().last_action.as_deref(), Some("blink"));
}

#[test]
fn transport_failures_are_swallowed() {
    let h = Harness::started(PANEL);
    h.transport.fail_all();
    h.sink.clear();
    h.panel
        .take_action(h.panel.input("doorbell").unwrap(), &label("pressed"), false)
        .unwrap();
    assert_eq!(h.sink.dispatched().len(), 3);
    assert_eq!(h.sink.count(|e| matches!(e, PanelEvent::ActionFailed { .. })), 0);
}

#[test]
fn message_services_route_to_their_ports() {
    let h = Harness::started(PANEL);
    h.panel
        .take_action(h.panel.input("doorbell").unwrap(), &label("released"), false)
        .unwrap();
    let publications = h.transport.publications.lock().unwrap().clone();
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0].topic, "home/panel");
    assert_eq!(publications[0].payload, "idle");
    assert_eq!(publications[0].qos, 1);
    assert!(publications[0].retain);
}

#[test]
fn outputs_record_default_verbs() {
    let h = Harness::started(PANEL);
    h.clock.set(Duration::from_secs(42));
    h.panel
        .take_action(h.panel.input("doorbell").unwrap(), &label("pressed"), false)
        .unwrap();
    let lights = h.panel.output("lights").unwrap().last_action();
    assert_eq!(lights.last_action.as_deref(), Some("post"));
    assert_eq!(lights.last_action_at, Some(Duration::from_secs(42)));
    assert_eq!(
        h.panel.output("notify").unwrap().state().last_status,
        Some(label("sns"))
    );
    assert_eq!(
        h.panel.output("chime").unwrap().last_action().last_action.as_deref(),
        Some("chime.mp3")
    );
}

// ── Construction errors ───────────────────────────────────────

#[test]
fn unknown_output_fails_construction_naming_both() {
    let yaml = r#"
outputs:
  porch: { type: led, gpio_pin: 18 }
inputs:
  doorbell:
    type: button
    gpio_pin: 17
    actions:
      pressed:
        - { name: porch, action: "on" }
        - { name: ghost, action: "on" }
"#;
    let err = Harness::build(yaml).err().expect("ghost output must be rejected");
    assert_eq!(
        err,
        ConfigError::UnknownOutput {
            input: "doorbell".into(),
            status: "pressed".into(),
            index: 1,
            output: "ghost".into(),
        }
    );
    let text = err.to_string();
    assert!(text.contains("doorbell") && text.contains("ghost"));
}

#[test]
fn duplicate_device_names_are_rejected() {
    let yaml = r#"
outputs:
  lamp: { type: led, gpio_pin: 18 }
inputs:
  lamp: { type: button, gpio_pin: 17 }
"#;
    let err = Harness::build(yaml).err().expect("duplicate must be rejected");
    assert_eq!(err, ConfigError::DuplicateName { device: "lamp".into() });
}

#[test]
fn shared_pin_is_a_hardware_error() {
    let yaml = r#"
outputs:
  lamp: { type: led, gpio_pin: 17 }
inputs:
  bell: { type: button, gpio_pin: 17 }
"#;
    let err = Harness::build(yaml).err().expect("pin reuse must be rejected");
    assert!(matches!(err, ConfigError::Hardware { ref device, .. } if device == "bell"));
}

#[test]
fn missing_required_fields_name_the_device() {
    let cases = [
        ("outputs:\n  lamp: { type: led }\n", "lamp", "gpio_pin"),
        ("outputs:\n  buzz: { type: haptic }\n", "buzz", "source_bus"),
        ("outputs:\n  sms: { type: message, service: sns }\n", "sms", "topic_arn"),
        ("expanders:\n  adc: { type: adc }\n", "adc", "chip"),
        ("inputs:\n  knob: { type: potentiometer }\n", "knob", "source_device"),
    ];
    for (yaml, device, field) in cases {
        let err = Harness::build(yaml).err().expect("should fail");
        assert_eq!(
            err,
            ConfigError::MissingField {
                device: device.into(),
                field
            },
            "{yaml}"
        );
    }
}

#[test]
fn pins_outside_the_header_are_rejected() {
    let err = Harness::build("inputs:\n  b: { type: button, gpio_pin: 40 }\n")
        .err()
        .expect("should fail");
    assert!(matches!(err, ConfigError::InvalidField { field: "gpio_pin", .. }));
}

#[test]
fn registry_exposes_every_device() {
    let h = Harness::build(PANEL).unwrap();
    assert!(!h.panel.is_running());
    assert_eq!(h.panel.devices().count(), 8);
    assert_eq!(h.panel.device("chime").map(|d| d.kind().as_str()), Some("sound"));
    assert!(h.panel.device("nope").is_none());
}
