//! Outbound panel events.
//!
//! The [`Panel`](super::panel::Panel) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log them, publish them, or record them for
//! a test to inspect.

use std::time::Duration;

use crate::device::Label;
use crate::error::ActionError;

/// Why an input's candidate status was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Arrived inside the debounce window of the previous change.
    Debounce,
    /// Same as the current status, and not forced.
    Unchanged,
}

/// Structured events emitted by the panel core.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// The panel finished startup replay and is live.
    Started {
        panel: String,
        inputs: usize,
        outputs: usize,
    },

    /// An input accepted a new status.
    StatusChanged {
        device: String,
        status: Label,
        startup: bool,
    },

    /// An input dropped a candidate status.
    StatusIgnored {
        device: String,
        status: Label,
        reason: IgnoreReason,
    },

    /// An action was handed to its output.
    ActionDispatched {
        input: String,
        status: Label,
        output: String,
        verb: Option<String>,
    },

    /// An action was skipped because its cooldown has not elapsed.
    ActionSuppressed {
        input: String,
        status: Label,
        output: String,
        remaining: Duration,
    },

    /// The output rejected an action; the rest of the chain still ran.
    ActionFailed {
        input: String,
        output: String,
        error: ActionError,
    },

    /// The panel was shut down.
    Stopped { panel: String },
}
