//! Transports that hand work to external programs.
//!
//! | Adapter          | Port        | Program              |
//! |------------------|-------------|----------------------|
//! | [`CurlHttp`]     | `HttpPort`  | `curl`               |
//! | [`CommandAudio`] | `AudioPort` | `mpg123` / `aplay`   |
//!
//! The child is started synchronously, so a missing program is reported
//! back to the caller. Waiting for it happens on a short-lived named
//! thread that logs a non-zero exit.

use std::path::Path;
use std::process::{Child, Command, Stdio};

use log::{debug, warn};

use crate::app::ports::{AudioPort, HttpPort, HttpRequest};
use crate::error::TransportError;
use crate::outputs::sound::AudioFormat;
use crate::timer::spawn_task;

fn launch(mut cmd: Command, what: &str) -> Result<(), TransportError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| TransportError::Unavailable(format!("{program}: {e}")))?;
    let label = what.to_owned();
    spawn_task(&format!("wait-{program}"), move || reap(child, &label))
        .map(|_| ())
        .map_err(|e| TransportError::Failed(format!("{program}: waiter not started: {e}")))
}

fn reap(mut child: Child, what: &str) {
    match child.wait() {
        Ok(status) if status.success() => debug!("{} finished", what),
        Ok(status) => warn!("{} exited with {}", what, status),
        Err(e) => warn!("{}: wait failed: {}", what, e),
    }
}

// ───────────────────────────────────────────────────────────────
// HTTP
// ───────────────────────────────────────────────────────────────

/// Issues requests with `curl`.
#[derive(Debug, Default)]
pub struct CurlHttp;

impl CurlHttp {
    pub fn command(request: &HttpRequest) -> Command {
        let mut cmd = Command::new("curl");
        cmd.args(["--silent", "--show-error", "--fail", "--max-time", "10"]);
        cmd.arg("--request").arg(&request.method);
        for (name, value) in &request.headers {
            cmd.arg("--header").arg(format!("{name}: {value}"));
        }
        if let Some(body) = &request.body {
            cmd.arg("--data").arg(body.to_string());
        }
        cmd.arg(&request.url);
        cmd
    }
}

impl HttpPort for CurlHttp {
    fn send(&self, request: &HttpRequest) -> Result<(), TransportError> {
        launch(
            Self::command(request),
            &format!("{} {}", request.method, request.url),
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Audio
// ───────────────────────────────────────────────────────────────

/// Plays `.mp3` with `mpg123` and `.wav` with `aplay`.
#[derive(Debug, Default)]
pub struct CommandAudio;

impl CommandAudio {
    pub fn command(path: &Path) -> Result<Command, TransportError> {
        let program = match AudioFormat::from_path(path) {
            Some(AudioFormat::Mp3) => "mpg123",
            Some(AudioFormat::Wav) => "aplay",
            None => {
                return Err(TransportError::Failed(format!(
                    "{}: unsupported format",
                    path.display()
                )));
            }
        };
        let mut cmd = Command::new(program);
        cmd.arg("-q").arg(path);
        Ok(cmd)
    }
}

impl AudioPort for CommandAudio {
    fn play(&self, path: &Path) -> Result<(), TransportError> {
        launch(Self::command(path)?, &path.display().to_string())
    }
}
