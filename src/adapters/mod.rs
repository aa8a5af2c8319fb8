//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `sim_io`       | DigitalIo          | In-memory tank model         |
//! | `hal_io`       | DigitalIo          | embedded-hal pins (rppal)    |
//! | `time`         | Clock              | `Instant` / virtual time     |
//! | `log_sink`     | EventSink          | `log` output                 |
//! |                | ReportSink         |                              |
//! | `channel_sink` | EventSink          | mpsc channel to the surface  |
//! | `gate`         | OperatorGate       | auto-confirm / mpsc prompt   |
//! | `history`      | RecordSink         | JSON database + text logs    |

pub mod channel_sink;
pub mod gate;
pub mod hal_io;
pub mod history;
pub mod log_sink;
pub mod sim_io;
pub mod time;

use log::info;

use crate::app::ports::DigitalIo;
use crate::config::WasherConfig;

use sim_io::SimulatedIo;

/// Pick the GPIO backend for this machine.
///
/// With the `rpi` feature the Raspberry Pi pins are claimed if the GPIO
/// device opens; everywhere else, and on any failure, the simulator is
/// bound instead.  The controller behaves the same on either.
pub fn probe_backend(config: &WasherConfig) -> Box<dyn DigitalIo + Send> {
    #[cfg(feature = "rpi")]
    {
        match hal_io::open_rppal(&config.pins) {
            Ok(io) => {
                info!("gpio: Raspberry Pi backend");
                return Box::new(io);
            }
            Err(e) => log::warn!("gpio: {e}; falling back to simulator"),
        }
    }
    #[cfg(not(feature = "rpi"))]
    let _ = config;

    info!("gpio: simulated backend");
    Box::new(SimulatedIo::new())
}
