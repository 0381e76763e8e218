//! Test doubles for integration tests.
//!
//! The panel runs on [`SimulatedHardware`]; time comes from a
//! [`ManualClock`] the test advances explicitly, and every event and
//! transport call is recorded for assertions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use picontrol::adapters::sim::SimulatedHardware;
use picontrol::app::events::PanelEvent;
use picontrol::app::panel::Panel;
use picontrol::app::ports::{
    AudioPort, Clock, EventSink, HttpPort, HttpRequest, NotifyPort, Ports, Publication,
    PublishPort,
};
use picontrol::config::PanelConfig;
use picontrol::device::Label;
use picontrol::error::{ConfigError, TransportError};

// ── ManualClock ───────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    pub fn set(&self, at: Duration) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PanelEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<PanelEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Accepted statuses of `device`, oldest first.
    pub fn statuses(&self, device: &str) -> Vec<Label> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PanelEvent::StatusChanged { device: d, status, .. } if d == device => Some(status),
                _ => None,
            })
            .collect()
    }

    /// `(output, verb)` of every dispatched action, in order.
    pub fn dispatched(&self) -> Vec<(String, Option<String>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PanelEvent::ActionDispatched { output, verb, .. } => Some((output, verb)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&PanelEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &PanelEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── RecordingTransport ────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Mutex<Vec<HttpRequest>>,
    pub publications: Mutex<Vec<Publication>>,
    pub notifications: Mutex<Vec<(String, String)>>,
    pub plays: Mutex<Vec<PathBuf>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingTransport {
    /// Make every later call report failure (after recording it).
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn result(&self) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(TransportError::Failed("injected".into()))
        } else {
            Ok(())
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpPort for RecordingTransport {
    fn send(&self, request: &HttpRequest) -> Result<(), TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result()
    }
}

impl PublishPort for RecordingTransport {
    fn publish(&self, publication: &Publication) -> Result<(), TransportError> {
        self.publications.lock().unwrap().push(publication.clone());
        self.result()
    }
}

impl NotifyPort for RecordingTransport {
    fn notify(&self, topic_arn: &str, message: &str) -> Result<(), TransportError> {
        self.notifications
            .lock()
            .unwrap()
            .push((topic_arn.to_owned(), message.to_owned()));
        self.result()
    }
}

impl AudioPort for RecordingTransport {
    fn play(&self, path: &Path) -> Result<(), TransportError> {
        self.plays.lock().unwrap().push(path.to_owned());
        self.result()
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub panel: Arc<Panel>,
    pub hw: Arc<SimulatedHardware>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
    pub transport: Arc<RecordingTransport>,
}

#[allow(dead_code)]
impl Harness {
    /// Build (but do not start) a panel from YAML.
    pub fn build(yaml: &str) -> Result<Self, ConfigError> {
        Self::build_with(yaml, |_| {})
    }

    /// Build with a hook to stage hardware state before devices open.
    pub fn build_with(
        yaml: &str,
        stage: impl FnOnce(&SimulatedHardware),
    ) -> Result<Self, ConfigError> {
        let config = PanelConfig::from_yaml_str(yaml)?;
        let hw = Arc::new(SimulatedHardware::new());
        stage(&hw);
        let clock = Arc::new(ManualClock::default());
        let sink = Arc::new(RecordingSink::default());
        let transport = Arc::new(RecordingTransport::default());
        let ports = Ports {
            hardware: hw.clone(),
            http: transport.clone(),
            publisher: transport.clone(),
            notifier: transport.clone(),
            audio: transport.clone(),
            clock: clock.clone(),
            events: sink.clone(),
        };
        let panel = Panel::new("test", &config, &ports)?;
        Ok(Self {
            panel,
            hw,
            clock,
            sink,
            transport,
        })
    }

    /// Build, start, then move the clock well past every startup debounce
    /// window.
    pub fn started(yaml: &str) -> Self {
        let harness = Self::build(yaml).expect("config should build");
        harness.panel.start().expect("panel should start");
        harness.clock.advance_secs(10.0);
        harness
    }

    pub fn started_with(yaml: &str, stage: impl FnOnce(&SimulatedHardware)) -> Self {
        let harness = Self::build_with(yaml, stage).expect("config should build");
        harness.panel.start().expect("panel should start");
        harness.clock.advance_secs(10.0);
        harness
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.panel.shutdown();
    }
}

/// Poll `cond` for up to two seconds.
#[allow(dead_code)]
pub fn eventually(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}
