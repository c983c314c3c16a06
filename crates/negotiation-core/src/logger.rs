//! Event Logger
//!
//! Append-only JSONL log of a run's lifecycle events.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use negotiation_events::SimEvent;

/// Writes one JSON line per event.
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    event_count: u64,
}

impl EventLogger {
    /// Create a new event logger writing to the specified path.
    ///
    /// An existing file is truncated; a log covers exactly one run.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
        })
    }

    /// Create a logger that discards events
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
        }
    }

    /// Number of events logged so far
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Log an event
    pub fn log(&mut self, event: &SimEvent) -> std::io::Result<()> {
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = event.to_jsonl()?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush event log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use negotiation_events::{EventType, TerminationReason};
    use std::io::BufRead;

    #[test]
    fn test_event_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        {
            let mut logger = EventLogger::new(&path).unwrap();
            logger.log(&SimEvent::stimulus("us", "10% tariffs")).unwrap();
            logger.log(&SimEvent::iteration_start(0, "us", "10% tariffs")).unwrap();
            logger
                .log(&SimEvent::iteration_end(0, 1, TerminationReason::BelowScoreThreshold))
                .unwrap();
            assert_eq!(logger.event_count(), 3);
        }

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 3);

        let last = SimEvent::from_jsonl(&lines[2]).unwrap();
        assert_eq!(last.event_type(), EventType::IterationEnd);
    }

    #[test]
    fn test_new_log_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "stale\n").unwrap();

        {
            let mut logger = EventLogger::new(&path).unwrap();
            logger.log(&SimEvent::stimulus("us", "x")).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_null_logger_counts() {
        let mut logger = EventLogger::null();
        logger.log(&SimEvent::stimulus("us", "x")).unwrap();
        assert_eq!(logger.event_count(), 1);
    }
}
