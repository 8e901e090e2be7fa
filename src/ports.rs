use serialport::{SerialPortInfo, SerialPortType};

/// Substrings (lowercase) of port descriptions that indicate a likely bridge:
/// the common USB-UART chips, plus boards that report their own name.
pub const AUTO_DETECT_KEYWORDS: [&str; 5] = ["cp210", "ch340", "usb-serial", "esp32", "feather"];

/// A serial port available on this machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path, e.g. "/dev/ttyUSB0" or "COM3".
    pub path: String,
    /// Human readable description, "n/a" if nothing better is known.
    pub description: String,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let description = match info.port_type {
            SerialPortType::UsbPort(usb_info) => usb_info
                .product
                .or(usb_info.manufacturer)
                .unwrap_or_else(|| {
                    format!("USB VID:PID={:04x}:{:04x}", usb_info.vid, usb_info.pid)
                }),
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "n/a".to_string(),
        };
        PortInfo {
            path: info.port_name,
            description,
        }
    }
}

/// Sort key putting ttyACM* first, then ttyUSB* (both numerically), then
/// everything else by name.
fn port_sort_key(path: &str) -> (u8, usize, String) {
    let basename = path.rsplit('/').next().unwrap_or(path);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// Lists available serial ports, in a stable order. Enumeration failures are
/// treated the same as "no ports".
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("unable to enumerate serial ports: {e}");
            Vec::new()
        }
    };
    ports.sort_by_key(|port| port_sort_key(&port.path));
    tracing::debug!("found {} serial port(s)", ports.len());
    ports
}

/// Returns the first port whose description matches one of
/// AUTO_DETECT_KEYWORDS (case-insensitively). There is no further
/// disambiguation if several ports match.
pub fn auto_detect(ports: &[PortInfo]) -> Option<&PortInfo> {
    ports.iter().find(|port| {
        let description = port.description.to_lowercase();
        AUTO_DETECT_KEYWORDS
            .iter()
            .any(|keyword| description.contains(keyword))
    })
}

/// Convenience wrapper combining list_ports and auto_detect.
pub fn find_device() -> Option<PortInfo> {
    auto_detect(&list_ports()).cloned()
}
