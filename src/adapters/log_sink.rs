//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering each [`PanelEvent`] as one log
//! line on the `panel` target.

use log::{debug, info, warn};

use crate::app::events::PanelEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`PanelEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &PanelEvent) {
        match event {
            PanelEvent::Started {
                panel,
                inputs,
                outputs,
            } => {
                info!(target: "panel", "START | {} | inputs={} outputs={}", panel, inputs, outputs);
            }
            PanelEvent::StatusChanged {
                device,
                status,
                startup,
            } => {
                info!(
                    target: "panel",
                    "STATUS | {} = {}{}",
                    device,
                    status,
                    if *startup { " (startup)" } else { "" }
                );
            }
            PanelEvent::StatusIgnored {
                device,
                status,
                reason,
            } => {
                debug!(target: "panel", "IGNORE | {} = {} ({:?})", device, status, reason);
            }
            PanelEvent::ActionDispatched {
                input,
                status,
                output,
                verb,
            } => {
                info!(
                    target: "panel",
                    "ACTION | {}/{} -> {} {}",
                    input,
                    status,
                    output,
                    verb.as_deref().unwrap_or("-")
                );
            }
            PanelEvent::ActionSuppressed {
                input,
                status,
                output,
                remaining,
            } => {
                debug!(
                    target: "panel",
                    "COOLDOWN | {}/{} -> {} ({:.1}s left)",
                    input,
                    status,
                    output,
                    remaining.as_secs_f64()
                );
            }
            PanelEvent::ActionFailed {
                input,
                output,
                error,
            } => {
                warn!(target: "panel", "FAILED | {} -> {}: {}", input, output, error);
            }
            PanelEvent::Stopped { panel } => {
                info!(target: "panel", "STOP | {}", panel);
            }
        }
    }
}
