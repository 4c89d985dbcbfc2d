//! Error taxonomy for ctcperm
//!
//! Every variant here is fatal for the run. Undefined statistics and small
//! groups are not errors; they are reported per group by the estimator.

use thiserror::Error;

/// Errors raised while configuring a run or reading its input
#[derive(Error, Debug)]
pub enum Error {
    #[error("Stat = {0} not supported")]
    UnsupportedScore(String),

    #[error("Missing header line: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid header on line {line}: {value:?}")]
    InvalidHeader { line: usize, value: String },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Record on line {line} has {found} fields, but the run is in {expected} mode")]
    ModeMismatch {
        line: usize,
        expected: &'static str,
        found: usize,
    },

    #[error("Too many contingency table pairs for avtime {avtime}. Max = {max}")]
    CapacityExceeded { avtime: i64, max: usize },

    #[error("Contingency counts overflow when adding the pair at valid_time {valid_time}")]
    CountOverflow { valid_time: i64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_score_message() {
        let err = Error::UnsupportedScore("HSS".to_string());
        assert_eq!(err.to_string(), "Stat = HSS not supported");
    }

    #[test]
    fn test_capacity_message_names_limit() {
        let err = Error::CapacityExceeded {
            avtime: 1200,
            max: 10,
        };
        assert!(err.to_string().contains("Max = 10"));
        assert!(err.to_string().contains("1200"));
    }

    #[test]
    fn test_count_overflow_names_valid_time() {
        let err = Error::CountOverflow { valid_time: 42 };
        assert!(err.to_string().contains("overflow"));
        assert!(err.to_string().contains("valid_time 42"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
