pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod line;
pub mod ports;
pub mod session;
pub mod sink;

use std::sync::atomic::AtomicBool;

use clock::Clock;
use config::LoggerConfig;
use connection::{LineSource, SerialConnection};
use error::SessionError;
use session::{Session, SessionNotification, Summary};
use sink::FileSink;

/// Connects to the device described by config, and logs everything it sends
/// to config.output until stop is set (e.g. from a signal handler) or the
/// connection fails.
///
/// notify receives every console-worthy event, including open failures:
/// callers don't need to report the returned error themselves. Nothing is
/// retried. If the output can't be opened, the connection is closed again
/// before returning.
pub fn log_device(
    config: &LoggerConfig,
    clock: impl Clock,
    stop: &AtomicBool,
    mut notify: impl FnMut(&SessionNotification),
) -> Result<Summary, SessionError> {
    let mut connection = match SerialConnection::open(config) {
        Ok(connection) => connection,
        Err(e) => {
            let e = SessionError::from(e);
            notify(&SessionNotification::Failed(&e));
            return Err(e);
        }
    };
    notify(&SessionNotification::Connected {
        port: connection.path(),
        baud_rate: config.baud_rate,
    });

    let sink = match FileSink::open(&config.output) {
        Ok(sink) => sink,
        Err(e) => {
            let e = SessionError::from(e);
            notify(&SessionNotification::Failed(&e));
            if let Err(close_error) = connection.close() {
                tracing::warn!("failed to close {}: {close_error}", config.port);
            }
            return Err(e);
        }
    };
    notify(&SessionNotification::LoggingTo(sink.path()));
    tracing::info!(
        "logging {} to {}",
        config.port,
        config.output.display()
    );

    Session::new(connection, sink, clock).run(stop, notify)
}
