//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements                         | Connects to                  |
//! |-------------|------------------------------------|------------------------------|
//! | `hal`       | PwmOutput, DigitalInput            | embedded-hal 1.0 pins / PWM  |
//! | `log_sink`  | EventSink                          | `log` facade                 |
//! | `process`   | HttpPort, AudioPort                | `curl`, `mpg123`, `aplay`    |
//! | `sim`       | HardwarePort                       | in-memory lines and channels |
//! |             | HttpPort, PublishPort, NotifyPort, AudioPort | `log` facade (dry run) |
//! | `time`      | Clock                              | `std::time::Instant`         |

pub mod hal;
pub mod log_sink;
pub mod process;
pub mod sim;
pub mod time;

use std::sync::Arc;

use crate::app::ports::{AudioPort, HttpPort, Ports};

use self::log_sink::LogEventSink;
use self::process::{CommandAudio, CurlHttp};
use self::sim::{LoggingTransport, SimulatedHardware};
use self::time::MonotonicClock;

/// Ports for running on simulated hardware.
///
/// With `dry_run` every transport only logs. Otherwise HTTP and audio
/// start external programs; publishing and notifications are always
/// logged.
pub fn simulated_ports(hardware: Arc<SimulatedHardware>, dry_run: bool) -> Ports {
    let logging = Arc::new(LoggingTransport);
    let http: Arc<dyn HttpPort>;
    let audio: Arc<dyn AudioPort>;
    if dry_run {
        http = logging.clone();
        audio = logging.clone();
    } else {
        http = Arc::new(CurlHttp);
        audio = Arc::new(CommandAudio);
    }
    Ports {
        hardware,
        http,
        publisher: logging.clone(),
        notifier: logging,
        audio,
        clock: Arc::new(MonotonicClock::new()),
        events: Arc::new(LogEventSink::new()),
    }
}
