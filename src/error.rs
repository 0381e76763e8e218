//! Error types for the control panel.
//!
//! Failures fall into two families, split by how the panel reacts to them:
//!
//! - [`ConfigError`] is fatal. It comes out of building a
//!   [`Panel`](crate::app::panel::Panel) from configuration, or out of a
//!   dispatch that hits a broken cross-reference, and aborts startup.
//! - [`ActionError`] belongs to a single output action. The panel logs it,
//!   skips that action and carries on with the rest of the chain.
//!
//! Collaborators report [`HardwareError`] while devices are being opened and
//! [`TransportError`] at runtime. Transport failures never reach the dispatch
//! path: output devices log them and move on.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Malformed or inconsistent panel configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The document could not be read or is not valid YAML.
    Parse(String),
    /// A device entry is missing a required field.
    MissingField { device: String, field: &'static str },
    /// A device field is present but its value is unusable.
    InvalidField {
        device: String,
        field: &'static str,
        reason: String,
    },
    /// A device entry failed to deserialise.
    Invalid { device: String, reason: String },
    /// The `type` of a device is not supported in its section.
    UnknownType { device: String, kind: String },
    /// An expander names a chip missing from the chip table.
    UnknownChip { device: String, chip: String },
    /// A `source_device` does not name a configured expander.
    UnknownSource { device: String, source: String },
    /// Two devices share one name.
    DuplicateName { device: String },
    /// An action entry has no target output name.
    MissingTarget {
        input: String,
        status: String,
        index: usize,
    },
    /// An action entry targets an output that does not exist.
    UnknownOutput {
        input: String,
        status: String,
        index: usize,
        output: String,
    },
    /// The hardware collaborator refused to open a connection.
    Hardware { device: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(reason) => write!(f, "configuration unreadable: {reason}"),
            Self::MissingField { device, field } => {
                write!(f, "device '{device}': missing required field '{field}'")
            }
            Self::InvalidField {
                device,
                field,
                reason,
            } => write!(f, "device '{device}': invalid '{field}': {reason}"),
            Self::Invalid { device, reason } => write!(f, "device '{device}': {reason}"),
            Self::UnknownType { device, kind } => {
                write!(f, "device '{device}': unsupported type '{kind}'")
            }
            Self::UnknownChip { device, chip } => {
                write!(f, "expander '{device}': unknown chip '{chip}'")
            }
            Self::UnknownSource { device, source } => {
                write!(f, "device '{device}': source device '{source}' is not an expander")
            }
            Self::DuplicateName { device } => write!(f, "device name '{device}' is used twice"),
            Self::MissingTarget {
                input,
                status,
                index,
            } => write!(
                f,
                "input '{input}': action #{index} for '{status}' has no output name"
            ),
            Self::UnknownOutput {
                input,
                status,
                index,
                output,
            } => write!(
                f,
                "input '{input}': action #{index} for '{status}' targets unknown output '{output}'"
            ),
            Self::Hardware { device, reason } => {
                write!(f, "device '{device}': hardware unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Action errors
// ---------------------------------------------------------------------------

/// A single output action that could not be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    /// A field required by the action resolved to nothing after merging
    /// device defaults with the action's overrides.
    MissingField { device: String, field: &'static str },
    /// A field resolved to a value the device cannot use.
    InvalidField {
        device: String,
        field: &'static str,
        reason: String,
    },
    /// The device does not understand the requested verb.
    UnsupportedVerb { device: String, verb: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { device, field } => {
                write!(f, "output '{device}': no '{field}' available")
            }
            Self::InvalidField {
                device,
                field,
                reason,
            } => write!(f, "output '{device}': invalid '{field}': {reason}"),
            Self::UnsupportedVerb { device, verb } => {
                write!(f, "output '{device}': unsupported action '{verb}'")
            }
        }
    }
}

impl std::error::Error for ActionError {}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// A hardware connection could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareError {
    pub reason: String,
}

impl HardwareError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for HardwareError {}

/// A fire-and-forget transport (HTTP, pub/sub, notification, audio) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport could not be started at all.
    Unavailable(String),
    /// The transport ran but reported failure.
    Failed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "transport unavailable: {msg}"),
            Self::Failed(msg) => write!(f, "transport failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}
