//! The control panel: device registry, action dispatch and polling loop.
//!
//! ```text
//!  DigitalInput / RotaryInput ──signal()──▶ ┌──────────────────┐
//!  polling loop ───────────update_input()──▶ │      Panel       │ ──▶ EventSink
//!  re-check timer ────────recheck_input()──▶ │ inputs · actions │
//!                                            └────────┬─────────┘
//!                                    take_action()    ▼
//!                                             OutputDevice::action
//! ```
//!
//! The registry and action table are fixed once [`Panel::new`] returns.
//! Mutable state lives inside the devices, each behind its own lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::{InputConfig, PanelConfig};
use crate::device::{Device, Label};
use crate::error::ConfigError;
use crate::expander::Expander;
use crate::inputs::{InputDevice, Signal};
use crate::outputs::OutputDevice;
use crate::timer::{CancelToken, lock, spawn_task};

use super::actions::ActionTable;
use super::events::PanelEvent;
use super::ports::{Clock, EventSink, Ports};

pub struct Panel {
    name: String,
    expanders: BTreeMap<String, Expander>,
    inputs: BTreeMap<String, Arc<InputDevice>>,
    outputs: BTreeMap<String, Arc<OutputDevice>>,
    actions: ActionTable,
    polling_interval: Duration,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    stop: CancelToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    subscribed: AtomicBool,
    stopped: AtomicBool,
    this: Weak<Panel>,
}

impl Panel {
    /// Build every device and validate the action table.
    ///
    /// Does **not** start anything; call [`start`](Self::start) next.
    pub fn new(name: &str, config: &PanelConfig, ports: &Ports) -> Result<Arc<Self>, ConfigError> {
        Self::with_actions(name, config, ports, ActionTable::build)
    }

    fn with_actions(
        name: &str,
        config: &PanelConfig,
        ports: &Ports,
        build_actions: impl FnOnce(
            &BTreeMap<String, InputConfig>,
            &BTreeSet<&str>,
        ) -> Result<ActionTable, ConfigError>,
    ) -> Result<Arc<Self>, ConfigError> {
        let polling_interval = config.polling_interval()?;
        check_unique_names(config)?;

        let expanders = config
            .expanders
            .iter()
            .map(|(name, c)| Ok((name.clone(), Expander::build(name, c)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let outputs = config
            .outputs
            .iter()
            .map(|(name, c)| Ok((name.clone(), Arc::new(OutputDevice::build(name, c, ports)?))))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let output_names: BTreeSet<&str> = outputs.keys().map(String::as_str).collect();
        let actions = build_actions(&config.inputs, &output_names)?;

        let inputs = config
            .inputs
            .iter()
            .map(|(name, c)| {
                let device = InputDevice::build(name, c, &expanders, ports.hardware.as_ref())?;
                Ok((name.clone(), Arc::new(device)))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        info!(
            "Panel '{}' built: {} expanders, {} outputs, {} inputs, {} actions",
            name,
            expanders.len(),
            outputs.len(),
            inputs.len(),
            actions.len()
        );

        Ok(Arc::new_cyclic(|this| Self {
            name: name.to_owned(),
            expanders,
            inputs,
            outputs,
            actions,
            polling_interval,
            clock: Arc::clone(&ports.clock),
            sink: Arc::clone(&ports.events),
            stop: CancelToken::new(),
            monitor: Mutex::new(None),
            started: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            this: this.clone(),
        }))
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Register interrupt callbacks, replay current input state and start
    /// the polling loop. Calling it again after it succeeded does nothing;
    /// after a failure it retries.
    pub fn start(&self) -> Result<(), ConfigError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.launch() {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        info!("Panel '{}' started", self.name);
        self.emit(&PanelEvent::Started {
            panel: self.name.clone(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
        });
        Ok(())
    }

    fn launch(&self) -> Result<(), ConfigError> {
        if !self.subscribed.swap(true, Ordering::SeqCst) {
            for input in self.inputs.values() {
                input.subscribe(self.handle());
            }
        }
        for input in self.inputs.values() {
            input.update_status(self, true)?;
        }

        if self.inputs.values().any(|i| i.needs_monitoring()) {
            let owner = self.handle();
            let stop = self.stop.clone();
            let interval = self.polling_interval;
            let handle = spawn_task(&format!("{}-monitor", self.name), move || {
                monitor(&owner, &stop, interval);
            })
            .map_err(|e| ConfigError::Hardware {
                device: self.name.clone(),
                reason: format!("polling loop not started: {e}"),
            })?;
            *lock(&self.monitor) = Some(handle);
        }
        Ok(())
    }

    /// Stop the polling loop, re-check timers and every output effect,
    /// waiting for each to exit.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.cancel();
        if let Some(handle) = lock(&self.monitor).take() {
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
        for input in self.inputs.values() {
            if let Some(timer) = input.cancel_recheck() {
                timer.join(true);
            }
        }
        for output in self.outputs.values() {
            output.shutdown();
        }
        info!("Panel '{}' stopped", self.name);
        self.emit(&PanelEvent::Stopped {
            panel: self.name.clone(),
        });
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.stop.is_cancelled()
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Run the actions configured for `status` on `input`, in order.
    ///
    /// During startup replay only `init` actions run. An [`ActionError`]
    /// skips that action and the chain carries on; a broken
    /// cross-reference aborts with [`ConfigError`].
    ///
    /// [`ActionError`]: crate::error::ActionError
    pub fn take_action(
        &self,
        input: &InputDevice,
        status: &Label,
        startup: bool,
    ) -> Result<(), ConfigError> {
        let source = input.name();
        for (index, entry) in self.actions.actions(source, status.as_str()).iter().enumerate() {
            let target = entry.target().ok_or_else(|| ConfigError::MissingTarget {
                input: source.to_owned(),
                status: status.to_string(),
                index,
            })?;
            if startup && !entry.spec.init {
                debug!("{}/{}: '{}' skipped at startup", source, status, target);
                continue;
            }
            let output = self.outputs.get(target).ok_or_else(|| ConfigError::UnknownOutput {
                input: source.to_owned(),
                status: status.to_string(),
                index,
                output: target.to_owned(),
            })?;

            let now = self.now();
            if let Err(remaining) = entry.try_fire(now) {
                debug!(
                    "{}/{}: '{}' cooling down for {:?}",
                    source, status, target, remaining
                );
                self.emit(&PanelEvent::ActionSuppressed {
                    input: source.to_owned(),
                    status: status.clone(),
                    output: target.to_owned(),
                    remaining,
                });
                continue;
            }

            match output.action(&entry.spec, now) {
                Ok(()) => {
                    info!(
                        "{}/{} -> {} {}",
                        source,
                        status,
                        target,
                        entry.spec.verb.as_deref().unwrap_or("(default)")
                    );
                    self.emit(&PanelEvent::ActionDispatched {
                        input: source.to_owned(),
                        status: status.clone(),
                        output: target.to_owned(),
                        verb: entry.spec.verb.clone(),
                    });
                }
                Err(e) => {
                    warn!("{}/{}: {}", source, status, e);
                    self.emit(&PanelEvent::ActionFailed {
                        input: source.to_owned(),
                        output: target.to_owned(),
                        error: e,
                    });
                }
            }
        }
        Ok(())
    }

    /// Interrupt path for the named input.
    pub fn signal(&self, name: &str, signal: Signal) {
        if self.stop.is_cancelled() {
            return;
        }
        let Some(input) = self.inputs.get(name) else {
            warn!("signal for unknown input '{}'", name);
            return;
        };
        if let Err(e) = input.handle_signal(self, signal) {
            error!("{}: {}", name, e);
        }
    }

    /// Re-sample one input now. Returns whether its status changed.
    pub fn update_input(&self, name: &str) -> Result<bool, ConfigError> {
        match self.inputs.get(name) {
            Some(input) => input.update_status(self, false),
            None => {
                warn!("update for unknown input '{}'", name);
                Ok(false)
            }
        }
    }

    pub(crate) fn recheck_input(&self, name: &str, token: &CancelToken) {
        if self.stop.is_cancelled() {
            return;
        }
        if let Some(input) = self.inputs.get(name) {
            if let Err(e) = input.recheck(self, token) {
                error!("{}: {}", name, e);
            }
        }
    }

    // ── Collaborators ─────────────────────────────────────────

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn emit(&self, event: &PanelEvent) {
        self.sink.emit(event);
    }

    /// Non-owning handle for callbacks and timer threads.
    pub fn handle(&self) -> Weak<Panel> {
        self.this.clone()
    }

    // ── Registry ──────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    pub fn input(&self, name: &str) -> Option<&Arc<InputDevice>> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Arc<OutputDevice>> {
        self.outputs.get(name)
    }

    pub fn expander(&self, name: &str) -> Option<&Expander> {
        self.expanders.get(name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Arc<InputDevice>> {
        self.inputs.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Arc<OutputDevice>> {
        self.outputs.values()
    }

    /// Any device by name.
    pub fn device(&self, name: &str) -> Option<&dyn Device> {
        if let Some(input) = self.inputs.get(name) {
            return Some(input.as_ref());
        }
        if let Some(output) = self.outputs.get(name) {
            return Some(output.as_ref());
        }
        self.expanders.get(name).map(|e| e as &dyn Device)
    }

    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> {
        self.expanders
            .values()
            .map(|e| e as &dyn Device)
            .chain(self.outputs.values().map(|o| o.as_ref() as &dyn Device))
            .chain(self.inputs.values().map(|i| i.as_ref() as &dyn Device))
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Polling loop body. Holds the panel only for the length of one pass.
fn monitor(owner: &Weak<Panel>, stop: &CancelToken, interval: Duration) {
    while stop.sleep(interval) {
        let Some(panel) = owner.upgrade() else {
            break;
        };
        for input in panel.inputs.values().filter(|i| i.needs_monitoring()) {
            if let Err(e) = input.update_status(&panel, false) {
                error!("{}: {}", input.name(), e);
            }
        }
    }
    debug!("polling loop exited");
}

fn check_unique_names(config: &PanelConfig) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    let names = config
        .expanders
        .keys()
        .chain(config.outputs.keys())
        .chain(config.inputs.keys());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateName {
                device: name.clone(),
            });
        }
    }
    Ok(())
}
