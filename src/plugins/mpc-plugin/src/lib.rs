//! Music Player Daemon play statistics.
//!
//! Follows a running daemon and records on library items how often songs are
//! played through or skipped, along with a rating derived from both.

pub mod connection;
pub mod error;
pub mod protocol;
pub mod rating;
pub mod session;
pub mod stats;
pub mod tracker;

pub use connection::{Daemon, Interrupter, MpdConnection};
pub use error::{MpcError, MpcResult};
pub use rating::{classify, rate, Outcome};
pub use session::{RetryPolicy, Session, StopHandle};
pub use stats::StatsWriter;
pub use tracker::{Clock, NowPlaying, SystemClock, Tracker, TrackerSettings};

use playtally_core::{Library, MpcConfig};
use std::time::Duration;

/// Connect to the configured daemon and track playback until `stop` fires.
/// Also returns once the daemon stays unreachable or rejects the password.
///
/// Stopping closes the socket, so a pending `idle` returns straight away.
pub fn run_tracker(config: &MpcConfig, library: &dyn Library, stop: StopHandle) -> MpcResult<()> {
    tracing::info!(host = %config.host, port = config.port, "starting play statistics tracker");
    let connection = MpdConnection::new(config.host.clone(), config.port);
    let interrupter = connection.interrupter();
    stop.on_stop(move || interrupter.interrupt());
    let session = Session::new(
        connection,
        Some(config.password.clone()),
        RetryPolicy {
            attempts: config.retries,
            interval: Duration::from_secs(config.retry_interval_secs),
        },
    );
    Tracker::new(session, library, TrackerSettings::from(config), SystemClock)
        .with_stop_handle(stop)
        .run()
}
