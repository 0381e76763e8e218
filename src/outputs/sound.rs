//! Sound output: plays an audio file from the sounds directory.
//!
//! File names are relative to the directory and may not leave it: absolute
//! paths and `..` components are rejected.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::AudioPort;
use crate::config::{ActionSpec, DEFAULT_SOUND_DIR, SoundConfig};
use crate::error::ActionError;

/// Playable file formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("mp3") {
            Some(Self::Mp3)
        } else if ext.eq_ignore_ascii_case("wav") {
            Some(Self::Wav)
        } else {
            None
        }
    }
}

pub struct SoundOutput {
    directory: PathBuf,
    file: Option<String>,
    audio: Arc<dyn AudioPort>,
}

impl SoundOutput {
    pub fn new(config: &SoundConfig, audio: Arc<dyn AudioPort>) -> Self {
        Self {
            directory: config
                .directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOUND_DIR)),
            file: config.file.clone(),
            audio,
        }
    }

    pub fn default_file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Resolve the file to play for `spec`.
    pub fn path(&self, device: &str, spec: &ActionSpec) -> Result<PathBuf, ActionError> {
        let file = spec
            .file
            .as_deref()
            .or(self.file.as_deref())
            .ok_or_else(|| ActionError::MissingField {
                device: device.to_owned(),
                field: "file",
            })?;
        let relative = Path::new(file);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ActionError::InvalidField {
                device: device.to_owned(),
                field: "file",
                reason: format!("{file} is not inside {}", self.directory.display()),
            });
        }
        let path = self.directory.join(relative);
        if AudioFormat::from_path(&path).is_none() {
            return Err(ActionError::InvalidField {
                device: device.to_owned(),
                field: "file",
                reason: format!("{file} is neither .mp3 nor .wav"),
            });
        }
        Ok(path)
    }

    pub(super) fn action(&self, device: &str, spec: &ActionSpec) -> Result<(), ActionError> {
        let path = self.path(device, spec)?;
        info!("{}: playing {}", device, path.display());
        if let Err(e) = self.audio.play(&path) {
            warn!("{}: playback of {} failed: {}", device, path.display(), e);
        }
        Ok(())
    }
}
