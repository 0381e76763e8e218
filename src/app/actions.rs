//! Per-input action table with cooldown stamps.
//!
//! Built once from configuration and read-only afterwards, apart from each
//! entry's `last_fired_at` stamp, which sits behind its own lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{ActionSpec, InputConfig};
use crate::device::{Label, seconds};
use crate::error::ConfigError;
use crate::timer::lock;

/// One configured action plus its cooldown state.
#[derive(Debug)]
pub struct ActionEntry {
    pub spec: ActionSpec,
    delay: Option<Duration>,
    last_fired_at: Mutex<Option<Duration>>,
}

impl ActionEntry {
    pub fn new(spec: ActionSpec, delay: Option<Duration>) -> Self {
        Self {
            spec,
            delay,
            last_fired_at: Mutex::new(None),
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.spec.target.as_deref()
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn last_fired_at(&self) -> Option<Duration> {
        *lock(&self.last_fired_at)
    }

    /// Claim a firing at `now`.
    ///
    /// Inside the cooldown window this returns the time left and leaves the
    /// stamp alone. Entries without a delay always fire.
    pub fn try_fire(&self, now: Duration) -> Result<(), Duration> {
        let Some(delay) = self.delay else {
            return Ok(());
        };
        let mut last = lock(&self.last_fired_at);
        if let Some(fired) = *last {
            let elapsed = now.saturating_sub(fired);
            if elapsed <= delay {
                return Err(delay - elapsed);
            }
        }
        *last = Some(now);
        Ok(())
    }
}

/// input name → status → ordered entries.
#[derive(Debug, Default)]
pub struct ActionTable {
    entries: BTreeMap<String, BTreeMap<Label, Vec<ActionEntry>>>,
}

impl ActionTable {
    /// Validate every action against the known outputs.
    pub fn build(
        inputs: &BTreeMap<String, InputConfig>,
        outputs: &BTreeSet<&str>,
    ) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for (input, config) in inputs {
            let mut statuses = BTreeMap::new();
            for (status, specs) in config.actions() {
                let mut list = Vec::with_capacity(specs.len());
                for (index, spec) in specs.iter().enumerate() {
                    check_target(input, status, index, spec, outputs)?;
                    let delay = spec
                        .delay
                        .map(seconds)
                        .transpose()
                        .map_err(|reason| ConfigError::InvalidField {
                            device: input.clone(),
                            field: "delay",
                            reason,
                        })?;
                    list.push(ActionEntry::new(spec.clone(), delay));
                }
                statuses.insert(status.clone(), list);
            }
            entries.insert(input.clone(), statuses);
        }
        Ok(Self { entries })
    }

    /// Entries for `status` on `input`, in declared order.
    pub fn actions(&self, input: &str, status: &str) -> &[ActionEntry] {
        self.entries
            .get(input)
            .and_then(|statuses| statuses.get(status))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn with_entry(mut self, input: &str, status: &str, entry: ActionEntry) -> Self {
        self.entries
            .entry(input.to_owned())
            .or_default()
            .entry(Label::from(status))
            .or_default()
            .push(entry);
        self
    }
}

/// Resolve the entry's target, failing with the error that names it.
pub(crate) fn check_target<'a>(
    input: &str,
    status: &Label,
    index: usize,
    spec: &'a ActionSpec,
    outputs: &BTreeSet<&str>,
) -> Result<&'a str, ConfigError> {
    let target = spec.target.as_deref().ok_or_else(|| ConfigError::MissingTarget {
        input: input.to_owned(),
        status: status.to_string(),
        index,
    })?;
    if !outputs.contains(target) {
        return Err(ConfigError::UnknownOutput {
            input: input.to_owned(),
            status: status.to_string(),
            index,
            output: target.to_owned(),
        });
    }
    Ok(target)
}
