//! Error types.
//!
//! Everything in here is fatal for a logging session: the recoverable case
//! (a line that isn't valid UTF-8) never produces an error, it is reported
//! via SessionNotification::DecodeError instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a LineSource (i.e. the serial connection).
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("poll failed: {0}")]
    Poll(#[source] serialport::Error),

    #[error("device disconnected")]
    Disconnected,

    #[error("connection already closed")]
    Closed,
}

/// Errors raised by a RecordSink (i.e. the output file).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("{}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("close failed: {0}")]
    Close(#[source] std::io::Error),

    #[error("sink already closed")]
    Closed,
}

/// Reasons for a logging session to fail (as opposed to being stopped).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Serial port error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Output file error: {0}")]
    Sink(#[from] SinkError),
}
