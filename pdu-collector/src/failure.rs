use std::time::Duration;

use pdu_client::device::{FetchError, ParseError};

/// What went wrong during one tick.
#[derive(thiserror::Error, Debug)]
pub enum TickFailureKind {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("rejected snapshot: {0}")]
    Rejected(String),
}

impl TickFailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::Parse(_) => "parse",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// A tick that produced no rows. Never fatal to the polling loop.
#[derive(thiserror::Error, Debug)]
#[error("values for timestamp {timestamp} failed: {kind} (took {} seconds)", .elapsed.as_secs())]
pub struct TickFailure {
    pub timestamp: i64,
    pub elapsed: Duration,
    pub kind: TickFailureKind,
}

impl TickFailure {
    pub fn new(timestamp: i64, elapsed: Duration, kind: impl Into<TickFailureKind>) -> Self {
        Self {
            timestamp,
            elapsed,
            kind: kind.into(),
        }
    }

    /// Emit the single diagnostic line for this failure.
    pub fn log(&self) {
        tracing::warn!(
            timestamp = self.timestamp,
            elapsed_secs = self.elapsed.as_secs(),
            kind = self.kind.label(),
            "{self}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_lines(failure: &TickFailure) -> Vec<String> {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || failure.log());

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn status_failure_is_logged_as_one_line_with_code_and_timestamp() {
        let failure = TickFailure::new(
            1000,
            Duration::from_millis(2_400),
            FetchError::Status {
                code: 500,
                reason: "Internal Server Error".to_string(),
            },
        );

        let lines = logged_lines(&failure);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("values for timestamp 1000 failed"));
        assert!(lines[0].contains("HTTP status 500"));
        assert!(lines[0].contains("took 2 seconds"));
    }

    #[test]
    fn timeout_is_logged_as_one_line_with_timestamp() {
        let failure = TickFailure::new(1005, Duration::from_secs(8), FetchError::Timeout);

        let lines = logged_lines(&failure);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("values for timestamp 1005 failed: timed out"));
    }

    #[test]
    fn status_failure_message_has_code_and_timestamp() {
        let failure = TickFailure::new(
            1000,
            Duration::from_millis(2_400),
            FetchError::Status {
                code: 500,
                reason: "Internal Server Error".to_string(),
            },
        );

        let msg = failure.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("500"));
        assert!(msg.contains("took 2 seconds"));
        assert_eq!(failure.kind.label(), "status");
    }

    #[test]
    fn labels_distinguish_failure_sources() {
        let parse = TickFailureKind::from(ParseError::MissingField("$.sensor_values".into()));
        assert_eq!(parse.label(), "parse");
        assert_eq!(TickFailureKind::Rejected("gap".into()).label(), "rejected");
        assert_eq!(TickFailureKind::from(FetchError::Timeout).label(), "timeout");
    }
}
