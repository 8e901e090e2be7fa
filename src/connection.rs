use std::io::{BufRead, ErrorKind};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::config::LoggerConfig;
use crate::error::ConnectionError;

/// Something that delivers lines of raw bytes, one at a time. This is the
/// only view of the device that the logging session has, which lets tests
/// drive a session without hardware.
pub trait LineSource {
    /// Returns the next line (including its terminator, if one was received)
    /// or None if nothing is available yet. Implementations must not block
    /// indefinitely: callers rely on regular returns to notice stop requests.
    fn try_read_line(&mut self) -> Result<Option<Vec<u8>>, ConnectionError>;

    fn is_open(&self) -> bool;

    /// Releases the underlying device. Closing more than once is a no-op.
    fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Lines longer than this are handed over in pieces.
pub const MAX_LINE_LEN: usize = 4096;

/// Reads one line from reader, giving up on the line once timeout has
/// elapsed. Returns:
/// - the line, including its trailing newline if present.
/// - the partial line, if the deadline passed (or a read timed out) after
///   receiving some data, or if the line reached MAX_LINE_LEN. The device
///   may simply not terminate its last line.
/// - None, if nothing was received.
/// End-of-stream is a disconnect: a serial device can't legitimately "end".
fn read_line_from<R: BufRead>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, ConnectionError> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConnectionError::Read(e)),
        };
        if available.is_empty() {
            if line.is_empty() {
                return Err(ConnectionError::Disconnected);
            }
            // The next call reports the disconnect.
            break;
        }

        let available = &available[..available.len().min(MAX_LINE_LEN - line.len())];
        let (used, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        line.extend_from_slice(&available[..used]);
        reader.consume(used);
        if complete {
            return Ok(Some(line));
        }
        if line.len() >= MAX_LINE_LEN || Instant::now() >= deadline {
            break;
        }
    }

    if line.is_empty() {
        Ok(None)
    } else {
        tracing::debug!("returning {} byte partial line", line.len());
        Ok(Some(line))
    }
}

/// A LineSource backed by a real serial port.
pub struct SerialConnection {
    path: String,
    // None once closed.
    reader: Option<std::io::BufReader<Box<dyn SerialPort>>>,
    poll_interval: Duration,
    read_timeout: Duration,
}

impl SerialConnection {
    pub fn open(config: &LoggerConfig) -> Result<SerialConnection, ConnectionError> {
        // 8N1 without flow control is what the USB-UART bridges default to.
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            // Only applies once we know there's something to read, see
            // try_read_line. A trickle of bytes without a newline is bounded
            // by the same timeout in read_line_from.
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| ConnectionError::Open {
                path: config.port.clone(),
                source,
            })?;
        tracing::debug!(
            "opened {} at {} baud (timeout {:?})",
            config.port,
            config.baud_rate,
            config.read_timeout
        );

        Ok(SerialConnection {
            path: config.port.clone(),
            reader: Some(std::io::BufReader::new(port)),
            poll_interval: config.poll_interval,
            read_timeout: config.read_timeout,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl LineSource for SerialConnection {
    fn try_read_line(&mut self) -> Result<Option<Vec<u8>>, ConnectionError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(ConnectionError::Closed);
        };
        // BufReader may already hold the start of the next line (or several
        // lines), in which case the port itself may well report nothing
        // pending.
        if reader.buffer().is_empty() {
            let pending = reader
                .get_ref()
                .bytes_to_read()
                .map_err(ConnectionError::Poll)?;
            if pending == 0 {
                std::thread::sleep(self.poll_interval);
                return Ok(None);
            }
        }
        read_line_from(reader, self.read_timeout)
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        if self.reader.take().is_some() {
            tracing::debug!("closed {}", self.path);
        }
        Ok(())
    }
}
