//! The expected-errors table: a drain, not a dictionary. Every entry must be
//! consumed by exactly one invalid-decoder case during the run; whatever is
//! left over at the end is a run-terminating configuration error.

use std::collections::HashMap;

use crate::case::CasePath;
use crate::error::ConformanceError;

#[derive(Debug, Default, Clone)]
pub struct ExpectedErrors {
    table: HashMap<String, String>,
}

impl ExpectedErrors {
    pub fn new() -> Self {
        ExpectedErrors::default()
    }

    /// Accepts keys with or without a leading `invalid/` and a trailing
    /// `.toml`, normalizing them all to `invalid/<name>`.
    pub fn insert(&mut self, raw_key: &str, expected_substring: impl Into<String>) {
        let key = CasePath::normalize_invalid_key(raw_key);
        self.table.insert(key, expected_substring.into());
    }

    pub fn from_toml(source: &str) -> Result<Self, ConformanceError> {
        let raw: HashMap<String, String> =
            toml::from_str(source).map_err(|e| ConformanceError::ExpectedErrorsParse(e.to_string()))?;
        let mut out = ExpectedErrors::new();
        for (k, v) in raw {
            out.insert(&k, v);
        }
        Ok(out)
    }

    pub fn from_json(source: &str) -> Result<Self, ConformanceError> {
        let raw: HashMap<String, String> =
            serde_json::from_str(source).map_err(|e| ConformanceError::ExpectedErrorsParse(e.to_string()))?;
        let mut out = ExpectedErrors::new();
        for (k, v) in raw {
            out.insert(&k, v);
        }
        Ok(out)
    }

    /// Removes and returns the expected substring for `case`, if any.
    pub fn take(&mut self, case: &CasePath) -> Option<String> {
        self.table.remove(case.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drains the table, returning the keys nobody consumed.
    pub fn into_unmatched(self) -> Vec<CasePath> {
        self.table.into_keys().map(CasePath::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_prefix_and_suffix_variants() {
        let mut e = ExpectedErrors::new();
        e.insert("invalid/a", "oh noes");
        e.insert("dir/c.toml", "oh noes");
        assert_eq!(e.take(&CasePath::new("invalid/a")), Some("oh noes".to_string()));
        assert_eq!(
            e.take(&CasePath::new("invalid/dir/c")),
            Some("oh noes".to_string())
        );
    }

    #[test]
    fn unmatched_after_drain() {
        let mut e = ExpectedErrors::new();
        e.insert("file/doesn/exist", "oh noes");
        assert!(e.take(&CasePath::new("invalid/other")).is_none());
        let unmatched = e.into_unmatched();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].as_str(), "invalid/file/doesn/exist");
    }
}
