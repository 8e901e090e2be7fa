use time::{OffsetDateTime, UtcOffset};

/// Source of host-side timestamps for data records.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in a fixed UTC offset.
///
/// The offset is resolved once, up front: the time crate refuses to look up
/// the local offset once the process has more than one thread (on most Unix
/// platforms), and installing the ctrlc handler spawns one.
#[derive(Clone, Copy, Debug)]
pub struct LocalClock {
    offset: UtcOffset,
}

impl LocalClock {
    /// Must be called before spawning any threads, see above. Falls back to
    /// UTC if the local offset can't be determined.
    pub fn detect() -> LocalClock {
        let offset = match UtcOffset::current_local_offset() {
            Ok(offset) => offset,
            Err(e) => {
                tracing::warn!("unable to determine local UTC offset, using UTC: {e}");
                UtcOffset::UTC
            }
        };
        tracing::debug!("using UTC offset {offset}");
        LocalClock { offset }
    }

    pub fn with_offset(offset: UtcOffset) -> LocalClock {
        LocalClock { offset }
    }
}

impl Clock for LocalClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Formats a timestamp with millisecond precision. Sub-millisecond digits are
/// truncated, not rounded, so a timestamp never moves into the next second.
/// Output looks like "2024-05-01 13:45:12.042".
pub fn format_timestamp(date_time: OffsetDateTime) -> String {
    let format = time::macros::format_description!(
        version = 2,
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    );
    // Only fails for non-ISO years (> 9999 etc.), which the system clock
    // won't produce.
    date_time
        .format(&format)
        .unwrap_or_else(|_| date_time.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn test_format_timestamp() {
        struct TestCase<'a> {
            name: &'a str,
            input: OffsetDateTime,
            expected: &'a str,
        }
        let tests = [
            TestCase {
                name: "Millis",
                input: datetime!(2024-05-01 13:45:12.042 UTC),
                expected: "2024-05-01 13:45:12.042",
            },
            TestCase {
                name: "WholeSecond",
                input: datetime!(2024-01-09 00:00:00 UTC),
                expected: "2024-01-09 00:00:00.000",
            },
            TestCase {
                name: "TruncatesMicros",
                input: datetime!(2024-12-31 23:59:59.999999 UTC),
                expected: "2024-12-31 23:59:59.999",
            },
            TestCase {
                name: "NonUtcOffset",
                input: datetime!(2024-05-01 13:45:12.5 +2),
                expected: "2024-05-01 13:45:12.500",
            },
        ];
        for case in tests {
            let got = format_timestamp(case.input);
            assert_eq!(
                got, case.expected,
                "{}: got={got:?}, want={:?}",
                case.name, case.expected
            );
        }
    }

    #[test]
    fn test_local_clock_uses_offset() {
        let clock = LocalClock::with_offset(offset!(+5:30));
        assert_eq!(clock.now().offset(), offset!(+5:30));
    }
}
