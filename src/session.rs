use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{format_timestamp, Clock};
use crate::connection::LineSource;
use crate::error::{ConnectionError, SessionError, SinkError};
use crate::line::{self, Line};
use crate::sink::RecordSink;

/// Everything a session has to say, in order. Display renders the console
/// line for each notification.
#[derive(Debug)]
pub enum SessionNotification<'a> {
    Connected {
        port: &'a str,
        baud_rate: u32,
    },
    LoggingTo(&'a Path),
    /// The session is about to start reading lines.
    Started,
    Comment(&'a str),
    /// The header record as written to the output (i.e. including the
    /// real_time column). Only sent for the first header in a session.
    Header(&'a str),
    /// A data record was written.
    Record {
        /// Number of records written so far, including this one.
        count: u64,
        timestamp: &'a str,
        line: &'a str,
    },
    Unknown(&'a str),
    /// A line could not be decoded and was dropped.
    DecodeError,
    /// Logging was stopped on request.
    Stopped {
        total_lines: u64,
    },
    /// Logging failed, or could not start. Cleanup still follows (if there
    /// was anything to clean up).
    Failed(&'a SessionError),
    /// Both the output and the connection have been released.
    Closed,
}

impl fmt::Display for SessionNotification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotification::Connected { port, baud_rate } => {
                write!(f, "✓ Connected to {port} at {baud_rate} baud")
            }
            SessionNotification::LoggingTo(path) => {
                write!(f, "✓ Logging to: {}", path.display())
            }
            SessionNotification::Started => {
                write!(f, "\nStarting data capture...\nPress Ctrl+C to stop\n")
            }
            SessionNotification::Comment(comment) => write!(f, "{comment}"),
            SessionNotification::Header(header) => write!(f, "Header: {header}"),
            SessionNotification::Record {
                count,
                timestamp,
                line,
            } => write!(f, "[{count:04}] {timestamp} | {line}"),
            SessionNotification::Unknown(line) => write!(f, "? {line}"),
            SessionNotification::DecodeError => {
                write!(f, "⚠ Decode error - skipping malformed data")
            }
            SessionNotification::Stopped { total_lines } => {
                write!(f, "✓ Stopped logging. Total lines: {total_lines}")
            }
            SessionNotification::Failed(error) => match error {
                SessionError::Connection(ConnectionError::Open { path, source }) => {
                    write!(f, "✗ Error opening {path}: {source}")
                }
                SessionError::Sink(SinkError::Open { source, .. }) => {
                    write!(f, "✗ Error opening output file: {source}")
                }
                error => write!(f, "✗ {error}"),
            },
            SessionNotification::Closed => write!(f, "✓ Files closed"),
        }
    }
}

/// Returned when a session ends because it was asked to stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    pub lines_written: u64,
    pub header_written: bool,
}

/// A logging session: reads lines from source, and appends timestamped data
/// records (plus the header, once) to sink.
pub struct Session<S, K, C> {
    source: S,
    sink: K,
    clock: C,
    // The device resends its header whenever it resets, but we only want it
    // once per output.
    header_written: bool,
    line_count: u64,
}

impl<S: LineSource, K: RecordSink, C: Clock> Session<S, K, C> {
    pub fn new(source: S, sink: K, clock: C) -> Session<S, K, C> {
        Session {
            source,
            sink,
            clock,
            header_written: false,
            line_count: 0,
        }
    }

    /// Number of data records written so far.
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Handles one raw line from the device. Only sink failures are errors:
    /// undecodable lines are reported via notify and otherwise ignored.
    pub fn process_line<F>(&mut self, raw: &[u8], notify: &mut F) -> Result<(), SinkError>
    where
        F: FnMut(&SessionNotification),
    {
        let Ok(text) = std::str::from_utf8(raw) else {
            tracing::debug!("dropping {} byte line with invalid UTF-8", raw.len());
            notify(&SessionNotification::DecodeError);
            return Ok(());
        };
        let Some(line) = line::classify(text) else {
            return Ok(());
        };

        match line {
            Line::Comment(comment) => notify(&SessionNotification::Comment(comment)),
            Line::Header(header) => {
                if self.header_written {
                    tracing::debug!("ignoring repeated header: {header}");
                    return Ok(());
                }
                let record = line::header_record(header);
                self.sink.write_record(&record)?;
                self.header_written = true;
                notify(&SessionNotification::Header(&record));
            }
            Line::Data(data) => {
                let timestamp = format_timestamp(self.clock.now());
                self.sink.write_record(&format!("{timestamp},{data}"))?;
                self.line_count += 1;
                notify(&SessionNotification::Record {
                    count: self.line_count,
                    timestamp: &timestamp,
                    line: data,
                });
            }
            Line::Unknown(unknown) => notify(&SessionNotification::Unknown(unknown)),
        }
        Ok(())
    }

    /// Logs until stop is set or something fails. Either way, sink and
    /// source are closed (exactly once) before returning.
    pub fn run<F>(mut self, stop: &AtomicBool, mut notify: F) -> Result<Summary, SessionError>
    where
        F: FnMut(&SessionNotification),
    {
        notify(&SessionNotification::Started);
        let mut result = self.read_until_stopped(stop, &mut notify);

        match &result {
            Ok(()) => {
                tracing::info!("stop requested after {} records", self.line_count);
                notify(&SessionNotification::Stopped {
                    total_lines: self.line_count,
                });
            }
            Err(e) => {
                tracing::debug!("session failed: {e:?}");
                notify(&SessionNotification::Failed(e));
            }
        }

        // Both handles are released even if closing one of them fails.
        if let Err(e) = self.close() {
            notify(&SessionNotification::Failed(&e));
            if result.is_ok() {
                result = Err(e);
            }
        }
        notify(&SessionNotification::Closed);

        result.map(|()| Summary {
            lines_written: self.line_count,
            header_written: self.header_written,
        })
    }

    fn read_until_stopped<F>(
        &mut self,
        stop: &AtomicBool,
        notify: &mut F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(&SessionNotification),
    {
        if !self.source.is_open() {
            return Err(ConnectionError::Closed.into());
        }
        while !stop.load(Ordering::Relaxed) {
            let Some(raw) = self.source.try_read_line()? else {
                continue;
            };
            self.process_line(&raw, notify)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let sink_result = self.sink.close();
        let source_result = self.source.close();
        sink_result?;
        source_result?;
        Ok(())
    }
}
