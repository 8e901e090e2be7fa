use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SinkError;

/// Append-only destination for records. Each record is one line of output;
/// implementations add the line terminator.
pub trait RecordSink {
    fn write_record(&mut self, record: &str) -> Result<(), SinkError>;

    /// Flushes and releases the sink. Closing more than once is a no-op.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// A RecordSink appending to a file. Records are flushed as soon as their
/// newline is written, so anyone tailing the file sees every record as it
/// arrives (and nothing is lost if we're killed).
pub struct FileSink {
    path: PathBuf,
    // None once closed.
    writer: Option<LineWriter<File>>,
}

impl FileSink {
    /// Opens path for appending, creating it if needed. Existing content is
    /// never touched.
    pub fn open(path: impl AsRef<Path>) -> Result<FileSink, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("opened {} for appending", path.display());
        Ok(FileSink {
            path,
            writer: Some(LineWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn write_record(&mut self, record: &str) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::Closed);
        };
        writeln!(writer, "{record}").map_err(SinkError::Write)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush().map_err(SinkError::Close)?;
        tracing::debug!("closed {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_and_flushes_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "existing\n").unwrap();

        let mut sink = FileSink::open(&path).unwrap();
        sink.write_record("real_time,timestamp,a").unwrap();
        // Visible without closing the sink.
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing\nreal_time,timestamp,a\n"
        );
        sink.write_record("2024-01-01 00:00:00.000,1").unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing\nreal_time,timestamp,a\n2024-01-01 00:00:00.000,1\n"
        );
        assert!(matches!(sink.write_record("1"), Err(SinkError::Closed)));
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");
        match FileSink::open(&path) {
            Err(SinkError::Open { path: failed, .. }) => assert_eq!(failed, path),
            Err(e) => panic!("unexpected error: {e:?}"),
            Ok(_) => panic!("opening a file in a missing directory must fail"),
        }
    }
}
