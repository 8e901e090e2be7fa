use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sensorlog::clock::LocalClock;
use sensorlog::config::{LoggerConfig, DEFAULT_BAUD_RATE, DEFAULT_OUTPUT};
use sensorlog::ports::{self, PortInfo};
use sensorlog::session::SessionNotification;

/// Log CSV data from a serial device (e.g. an ESP32 bridge) to a file,
/// prefixing every record with the host's local time.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Examples:
  sensorlog COM3 data.csv             # Windows
  sensorlog /dev/ttyUSB0 data.csv     # Linux
  sensorlog -l                        # List available ports
  sensorlog -a data.csv               # Auto-detect ESP32"
)]
struct Args {
    /// Serial port (e.g. COM3 or /dev/ttyUSB0)
    port: Option<String>,

    /// Output CSV file [default: sensor_data.csv]
    output: Option<PathBuf>,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// List available serial ports and exit
    #[arg(short, long)]
    list: bool,

    /// Auto-detect the ESP32 port
    #[arg(short, long)]
    auto: bool,

    /// Verbose (debug) diagnostics on stderr; RUST_LOG takes precedence
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_ports(ports: &[PortInfo]) {
    if ports.is_empty() {
        println!("No serial ports found!");
        return;
    }
    println!("\nAvailable serial ports:");
    for port in ports {
        println!("  {} - {}", port.path, port.description);
    }
}

fn print_notification(notification: &SessionNotification) {
    if let SessionNotification::Stopped { .. } = notification {
        // Make sure we're not on the same line as the terminal's "^C".
        println!("\n");
    }
    println!("{notification}");
}

/// Port and output file as named on the command line.
#[derive(Debug, PartialEq)]
struct Targets {
    port: Option<String>,
    output: PathBuf,
    /// A port given alongside an output in auto-detect mode.
    ignored_port: Option<String>,
}

impl Args {
    fn targets(&self) -> Targets {
        let (port, output, ignored_port) = match (self.auto, &self.port, &self.output) {
            // "sensorlog -a data.csv": the only positional is the output.
            (true, Some(port), None) => (None, Some(PathBuf::from(port)), None),
            (true, port, output) => (None, output.clone(), port.clone()),
            (false, port, output) => (port.clone(), output.clone(), None),
        };
        Targets {
            port,
            output: output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            ignored_port,
        }
    }
}

fn example_hint(port: &str) -> String {
    format!("Example: {} {port} {DEFAULT_OUTPUT}", env!("CARGO_BIN_NAME"))
}

/// Works out which port to use, printing the reason if there is none.
fn select_port(auto: bool, targets: &Targets) -> Option<String> {
    if auto {
        if let Some(port) = &targets.ignored_port {
            tracing::warn!("ignoring port {port} in auto-detect mode");
        }

        return match ports::find_device() {
            Some(port) => {
                println!("Auto-detected ESP32 on: {}", port.path);
                Some(port.path)
            }
            None => {
                println!("\n✗ Could not auto-detect ESP32. Available ports:");
                print_ports(&ports::list_ports());
                None
            }
        };
    }

    if targets.port.is_none() {
        println!("Error: Please specify a serial port or use -a for auto-detect");
        println!("\nAvailable ports:");
        let ports = ports::list_ports();
        print_ports(&ports);
        if let Some(first) = ports.first() {
            println!("\n{}", example_hint(&first.path));
        }
    }
    targets.port.clone()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    eprintln!("sensorlog (v{})", env!("CARGO_PKG_VERSION"));

    // Must happen before ctrlc starts its thread, see LocalClock::detect.
    let clock = LocalClock::detect();

    if args.list {
        print_ports(&ports::list_ports());
        return ExitCode::SUCCESS;
    }

    let targets = args.targets();
    let Some(port) = select_port(args.auto, &targets) else {
        return ExitCode::FAILURE;
    };
    let config = LoggerConfig::new(port, targets.output).baud_rate(args.baud);

    let stop = Arc::new(AtomicBool::new(false));
    let request_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        request_stop.store(true, Ordering::Relaxed);
    }) {
        // Logging still works, but Ctrl+C will kill us without cleanup. The
        // file is flushed per record, so nothing is lost.
        tracing::warn!("unable to install Ctrl+C handler: {e}");
    }

    match sensorlog::log_device(&config, clock, &stop, print_notification) {
        Ok(_) => ExitCode::SUCCESS,
        // Already reported via print_notification.
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_targets() {
        struct TestCase<'a> {
            name: &'a str,
            input: &'a [&'a str],
            expected: Targets,
        }
        let tests = [
            TestCase {
                name: "PortAndOutput",
                input: &["/dev/ttyUSB0", "data.csv"],
                expected: Targets {
                    port: Some("/dev/ttyUSB0".into()),
                    output: "data.csv".into(),
                    ignored_port: None,
                },
            },
            TestCase {
                name: "DefaultOutput",
                input: &["COM3"],
                expected: Targets {
                    port: Some("COM3".into()),
                    output: "sensor_data.csv".into(),
                    ignored_port: None,
                },
            },
            TestCase {
                name: "NoPositionals",
                input: &[],
                expected: Targets {
                    port: None,
                    output: "sensor_data.csv".into(),
                    ignored_port: None,
                },
            },
            TestCase {
                name: "AutoLonePositionalIsOutput",
                input: &["-a", "data.csv"],
                expected: Targets {
                    port: None,
                    output: "data.csv".into(),
                    ignored_port: None,
                },
            },
            TestCase {
                name: "AutoIgnoresPort",
                input: &["--auto", "/dev/ttyUSB0", "data.csv"],
                expected: Targets {
                    port: None,
                    output: "data.csv".into(),
                    ignored_port: Some("/dev/ttyUSB0".into()),
                },
            },
            TestCase {
                name: "AutoDefaultOutput",
                input: &["-a"],
                expected: Targets {
                    port: None,
                    output: "sensor_data.csv".into(),
                    ignored_port: None,
                },
            },
        ];
        for case in tests {
            let argv = std::iter::once("sensorlog").chain(case.input.iter().copied());
            let args = Args::try_parse_from(argv).unwrap();
            let got = args.targets();
            assert_eq!(
                got, case.expected,
                "{}: got={got:?}, want={:?}",
                case.name, case.expected
            );
        }
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from(["sensorlog", "COM3"]).unwrap();
        assert_eq!(args.baud, 115_200);
        assert!(!args.list && !args.auto && !args.verbose);

        let args = Args::try_parse_from(["sensorlog", "-b", "9600", "-l", "-v"]).unwrap();
        assert_eq!(args.baud, 9600);
        assert!(args.list && args.verbose);

        assert!(Args::try_parse_from(["sensorlog", "--baud", "fast"]).is_err());
        assert!(Args::try_parse_from(["sensorlog", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_example_hint() {
        assert_eq!(
            example_hint("/dev/ttyUSB0"),
            "Example: sensorlog /dev/ttyUSB0 sensor_data.csv"
        );
    }
}
