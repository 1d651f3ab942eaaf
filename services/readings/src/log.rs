//! Append-ordered collection of readings with signed ordinal lookup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reading::SensorReading;

/// Errors from selecting a reading out of the log.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no readings recorded yet")]
    Empty,
    #[error("reading index {index} out of range (0-{})", .len - 1)]
    OutOfRange { index: i64, len: usize },
}

/// Every reading recorded so far, oldest first.
///
/// Serializes as a bare JSON array so the on-disk log is just the list of
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingLog {
    readings: Vec<SensorReading>,
}

impl ReadingLog {
    pub fn new() -> Self {
        ReadingLog::default()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Append a reading at the end of the log.
    pub fn push(&mut self, reading: SensorReading) {
        self.readings.push(reading);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// Most recently recorded reading, if any.
    pub fn last(&self) -> Option<&SensorReading> {
        self.readings.last()
    }

    /// Select a reading by signed ordinal.
    ///
    /// Non-negative indexes count from the oldest reading; negative indexes
    /// count back from the newest, so `-1` is always the latest. Either
    /// direction past the ends is an error that reports the valid range.
    pub fn select(&self, index: i64) -> Result<&SensorReading, SelectError> {
        let len = self.readings.len();
        if len == 0 {
            return Err(SelectError::Empty);
        }

        let resolved = if index < 0 {
            let back = index.unsigned_abs() as usize;
            if back > len {
                return Err(SelectError::OutOfRange { index, len });
            }
            len - back
        } else {
            let forward = index as usize;
            if forward >= len {
                return Err(SelectError::OutOfRange { index, len });
            }
            forward
        };

        Ok(&self.readings[resolved])
    }
}

impl From<Vec<SensorReading>> for ReadingLog {
    fn from(readings: Vec<SensorReading>) -> Self {
        ReadingLog { readings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(n: usize) -> ReadingLog {
        let mut log = ReadingLog::new();
        for i in 0..n {
            log.push(SensorReading::from_payload(
                &format!(r#"{{"temperature": {i}}}"#),
                format!("2024-06-01 12:00:0{i}"),
            ));
        }
        log
    }

    #[test]
    fn test_negative_index_counts_from_newest() {
        let log = log_of(3);

        assert_eq!(log.select(-1).unwrap().timestamp(), "2024-06-01 12:00:02");
        assert_eq!(log.select(-3).unwrap().timestamp(), "2024-06-01 12:00:00");
    }

    #[test]
    fn test_non_negative_index_counts_from_oldest() {
        let log = log_of(3);

        assert_eq!(log.select(0).unwrap().timestamp(), "2024-06-01 12:00:00");
        assert_eq!(log.select(2).unwrap().timestamp(), "2024-06-01 12:00:02");
    }

    #[test]
    fn test_out_of_range_reports_valid_range() {
        let log = log_of(3);

        let err = log.select(3).unwrap_err();
        assert!(matches!(err, SelectError::OutOfRange { index: 3, len: 3 }));
        assert_eq!(
            err.to_string(),
            "reading index 3 out of range (0-2)"
        );

        let err = log.select(-4).unwrap_err();
        assert!(matches!(err, SelectError::OutOfRange { index: -4, len: 3 }));
        assert_eq!(
            err.to_string(),
            "reading index -4 out of range (0-2)"
        );
    }

    #[test]
    fn test_empty_log_is_its_own_error() {
        let log = ReadingLog::new();
        assert!(matches!(log.select(-1), Err(SelectError::Empty)));
        assert!(matches!(log.select(0), Err(SelectError::Empty)));
    }

    #[test]
    fn test_log_serializes_as_bare_array() {
        let log = log_of(2);
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 2);

        let back: ReadingLog = serde_json::from_value(value).unwrap();
        assert_eq!(back, log);
    }
}
