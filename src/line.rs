/// Prefix of the header line emitted by the device after every reset.
pub const HEADER_PREFIX: &str = "timestamp,";

/// Column prepended to the device's header when it is persisted.
pub const REAL_TIME_COLUMN: &str = "real_time";

/// Line represents a single (trimmed, non-empty) line received from the
/// device. Every line falls into exactly one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// Diagnostic output from the device, display only.
    Comment(&'a str),
    /// CSV header, e.g. "timestamp,level,temp".
    Header(&'a str),
    /// CSV data record, e.g. "123,45.6,22.1".
    Data(&'a str),
    /// Anything we don't recognise, display only.
    Unknown(&'a str),
}

impl<'a> Line<'a> {
    /// Returns the line as it was received (minus surrounding whitespace).
    pub fn text(&self) -> &'a str {
        match *self {
            Line::Comment(text) | Line::Header(text) | Line::Data(text) | Line::Unknown(text) => {
                text
            }
        }
    }
}

/// Classify a line received from the device. Surrounding whitespace
/// (including the trailing CR that many devices send) is removed first.
/// Returns None for lines that are empty after trimming: these are skipped
/// entirely rather than treated as Unknown.
pub fn classify(raw: &str) -> Option<Line<'_>> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    Some(match line {
        line if line.starts_with('#') => Line::Comment(line),
        line if line.starts_with(HEADER_PREFIX) => Line::Header(line),
        // Only the first character is checked, so "-abc" is data too.
        line if line.starts_with(|c: char| c.is_ascii_digit()) || line.starts_with('-') => {
            Line::Data(line)
        }
        line => Line::Unknown(line),
    })
}

/// Header record as written to the output file.
pub fn header_record(header: &str) -> String {
    format!("{REAL_TIME_COLUMN},{header}")
}
