use std::path::PathBuf;
use std::time::Duration;

/// Default baud rate of the ESP32 bridge.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Upper bound for a single line read, once we know data is pending.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to sleep when no input is pending. Also bounds how long it takes
/// to notice a stop request while the device is quiet.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const DEFAULT_OUTPUT: &str = "sensor_data.csv";

/// Everything needed to start a logging session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    pub port: String,
    pub output: PathBuf,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub poll_interval: Duration,
}

impl LoggerConfig {
    pub fn new(port: impl Into<String>, output: impl Into<PathBuf>) -> LoggerConfig {
        LoggerConfig {
            port: port.into(),
            output: output.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: READ_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> LoggerConfig {
        self.baud_rate = baud_rate;
        self
    }
}
