use std::fmt;

/// A logical test case name, rooted at `valid/`, `encoder/`, or `invalid/`,
/// with no file extension (e.g. `valid/string/simple`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CasePath(String);

impl CasePath {
    pub fn new(path: impl Into<String>) -> Self {
        CasePath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> CaseKind {
        if self.0.starts_with("valid/") {
            CaseKind::DecoderValid
        } else if self.0.starts_with("encoder/") {
            CaseKind::Encoder
        } else if self.0.starts_with("invalid/") {
            CaseKind::DecoderInvalid
        } else {
            // Enumeration guarantees one of the three roots; reaching here
            // means a caller constructed a CasePath by hand.
            panic!("case path {:?} has no recognized root", self.0)
        }
    }

    /// Strips the root prefix and `.toml` suffix from a raw key, as accepted
    /// by the expected-errors table (e.g. `invalid/a`, `dir/c.toml`, `a`).
    pub fn normalize_invalid_key(raw: &str) -> String {
        let raw = raw.strip_prefix("invalid/").unwrap_or(raw);
        let raw = raw.strip_suffix(".toml").unwrap_or(raw);
        format!("invalid/{raw}")
    }
}

impl fmt::Display for CasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CasePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which family a case belongs to, derived from the first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseKind {
    DecoderValid,
    DecoderInvalid,
    Encoder,
}

/// The outcome of running a single case.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub path: CasePath,
    pub kind: CaseKind,
    pub skipped: bool,
    pub failure: Option<String>,
    /// The expected-errors substring this case was checked against, if any.
    pub key: Option<String>,
    pub input: String,
    pub output: String,
    pub output_from_stderr: bool,
    pub pid: Option<u32>,
    pub want: Option<String>,
}

impl TestResult {
    /// A case that was excluded before it ever ran, either by the `-run`
    /// filter or by the `-skip` list.
    pub fn skipped_stub(path: CasePath) -> Self {
        let kind = path.kind();
        TestResult {
            path,
            kind,
            skipped: true,
            failure: None,
            key: None,
            input: String::new(),
            output: String::new(),
            output_from_stderr: false,
            pid: None,
            want: None,
        }
    }

    pub fn failed(&self) -> bool {
        !self.skipped && self.failure.is_some()
    }

    pub fn passed(&self) -> bool {
        !self.skipped && self.failure.is_none()
    }
}

/// Aggregate counters and per-case records for a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tests: Vec<TestResult>,
    pub skipped: usize,
    pub passed_valid: usize,
    pub passed_invalid: usize,
    pub passed_encoder: usize,
    pub failed_valid: usize,
    pub failed_invalid: usize,
    pub failed_encoder: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed_valid + self.failed_invalid + self.failed_encoder == 0
    }

    pub fn total_failed(&self) -> usize {
        self.failed_valid + self.failed_invalid + self.failed_encoder
    }

    /// Sorts results `valid/*` < `encoder/*` < `invalid/*`, alphabetical
    /// within each group, and recomputes the counters from scratch.
    pub(crate) fn finalize(mut self) -> Self {
        self.tests.sort_by(|a, b| {
            fn group(k: CaseKind) -> u8 {
                match k {
                    CaseKind::DecoderValid => 0,
                    CaseKind::Encoder => 1,
                    CaseKind::DecoderInvalid => 2,
                }
            }
            group(a.kind)
                .cmp(&group(b.kind))
                .then_with(|| a.path.as_str().cmp(b.path.as_str()))
        });

        self.skipped = 0;
        self.passed_valid = 0;
        self.passed_invalid = 0;
        self.passed_encoder = 0;
        self.failed_valid = 0;
        self.failed_invalid = 0;
        self.failed_encoder = 0;

        for t in &self.tests {
            if t.skipped {
                self.skipped += 1;
                continue;
            }
            let failed = t.failure.is_some();
            match (t.kind, failed) {
                (CaseKind::DecoderValid, false) => self.passed_valid += 1,
                (CaseKind::DecoderValid, true) => self.failed_valid += 1,
                (CaseKind::DecoderInvalid, false) => self.passed_invalid += 1,
                (CaseKind::DecoderInvalid, true) => self.failed_invalid += 1,
                (CaseKind::Encoder, false) => self.passed_encoder += 1,
                (CaseKind::Encoder, true) => self.failed_encoder += 1,
            }
        }

        self
    }
}
