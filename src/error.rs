use std::fmt;

use crate::case::CasePath;

/// Errors that abort an entire run before or at its boundary.
///
/// Per-case failures are not represented here — they are data
/// (`TestResult::failure`), not `Result::Err`. Only conditions that make the
/// whole run meaningless reach this type.
#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    #[error("unknown version {requested:?}; known versions: {}", known.join(", "))]
    UnknownVersion {
        requested: String,
        known: Vec<String>,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to parse expected-errors file: {0}")]
    ExpectedErrorsParse(String),

    #[error("expected-errors keys didn't match anything: {}", .0.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", "))]
    UnmatchedExpectedErrors(Vec<CasePath>),
}

pub type Result<T, E = ConformanceError> = std::result::Result<T, E>;

/// A path-scoped comparison failure, produced by the value comparator.
///
/// Carries enough to render `"BUG IN TEST CASE: ..."` vs. an ordinary
/// mismatch without the caller needing to re-parse the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareFailure {
    pub message: String,
    pub is_bug_in_test_case: bool,
}

impl CompareFailure {
    pub fn bug(message: impl Into<String>) -> Self {
        CompareFailure {
            message: format!("BUG IN TEST CASE: {}", message.into()),
            is_bug_in_test_case: true,
        }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        CompareFailure {
            message: message.into(),
            is_bug_in_test_case: false,
        }
    }
}

impl fmt::Display for CompareFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
