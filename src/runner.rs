//! Drives a whole run: selection, bounded-parallel execution, and
//! aggregation. Grounded on the reference `Runner.Run` in `runner.go` for
//! the per-case classification rules, and on `sqllogictest::Runner::run_parallel_async`
//! / the `conformance-rust` runner for the `buffer_unordered` concurrency
//! pattern.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use futures::{stream, StreamExt};

use crate::case::{CaseKind, CasePath, RunReport, TestResult};
use crate::corpus::Corpus;
use crate::encoder_value;
use crate::error::{ConformanceError, Result};
use crate::expected_errors::ExpectedErrors;
use crate::parser::{InvokeError, Parser};
use crate::select::{apply_run_filter, enumerate_cases, is_skipped};
use crate::value::{self, TaggedValue};
use crate::version::EffectiveExclusions;

/// Every knob described in the external configuration table. No flag
/// parsing lives here — a caller builds this directly.
#[derive(Clone)]
pub struct RunConfig {
    pub version: String,
    pub run: Vec<String>,
    pub skip: Vec<String>,
    pub parallel: usize,
    pub timeout: Duration,
    pub int_as_float: bool,
    pub errors: ExpectedErrors,
    pub skip_must_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            version: "latest".to_string(),
            run: Vec::new(),
            skip: Vec::new(),
            parallel: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: Duration::from_secs(1),
            int_as_float: false,
            errors: ExpectedErrors::new(),
            skip_must_error: false,
        }
    }
}

impl RunConfig {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_run(mut self, patterns: Vec<String>) -> Self {
        self.run = patterns;
        self
    }

    pub fn with_skip(mut self, patterns: Vec<String>) -> Self {
        self.skip = patterns;
        self
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_int_as_float(mut self, enabled: bool) -> Self {
        self.int_as_float = enabled;
        self
    }

    pub fn with_errors(mut self, errors: ExpectedErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_skip_must_error(mut self, enabled: bool) -> Self {
        self.skip_must_error = enabled;
        self
    }
}

/// Runs a corpus against a parser and produces a [`RunReport`].
pub struct Runner<'a> {
    corpus: &'a dyn Corpus,
    parser: &'a dyn Parser,
    config: RunConfig,
}

impl<'a> Runner<'a> {
    pub fn new(corpus: &'a dyn Corpus, parser: &'a dyn Parser, config: RunConfig) -> Self {
        Runner {
            corpus,
            parser,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let exclusions = EffectiveExclusions::resolve(&self.config.version)?;
        let enumerated = enumerate_cases(self.corpus, &exclusions);
        let selected = apply_run_filter(&enumerated, &self.config.run)?;

        // Fail fast on a malformed -skip pattern rather than discovering it
        // mid-run on whichever case happens to hit it first.
        for pattern in &self.config.skip {
            glob::Pattern::new(pattern).map_err(|source| ConformanceError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let selected_set: HashSet<&CasePath> = selected.iter().collect();
        let mut results: Vec<TestResult> = enumerated
            .iter()
            .filter(|c| !selected_set.contains(c))
            .map(|c| TestResult::skipped_stub(c.clone()))
            .collect();

        let errors = Mutex::new(self.config.errors.clone());

        let mut executed: Vec<TestResult> = stream::iter(selected.iter())
            .map(|case| self.execute_one(case, &errors))
            .buffer_unordered(self.config.parallel.max(1))
            .collect()
            .await;

        results.append(&mut executed);

        let unmatched = errors.into_inner().unwrap().into_unmatched();
        if !unmatched.is_empty() {
            for key in &unmatched {
                tracing::warn!(key = key.as_str(), "expected-errors entry never matched a case");
            }
            return Err(ConformanceError::UnmatchedExpectedErrors(unmatched));
        }

        Ok(RunReport {
            tests: results,
            ..Default::default()
        }
        .finalize())
    }

    async fn execute_one(&self, case: &CasePath, errors: &Mutex<ExpectedErrors>) -> TestResult {
        let should_skip = is_skipped(case, &self.config.skip).unwrap_or(false);

        if should_skip && !self.config.skip_must_error {
            return TestResult::skipped_stub(case.clone());
        }

        let mut result = self.run_case_body(case).await;

        if should_skip && self.config.skip_must_error {
            return invert_for_skip_must_error(result);
        }

        if case.kind() == CaseKind::DecoderInvalid {
            let expected = errors.lock().unwrap().take(case);
            if let Some(expected_substring) = expected {
                result.key = Some(expected_substring.clone());
                if result.failure.is_none() && !result.output.contains(&expected_substring) {
                    result.failure = Some(format!(
                        "{:?} does not contain {:?}",
                        result.output, expected_substring
                    ));
                }
            }
        }

        result
    }

    async fn run_case_body(&self, case: &CasePath) -> TestResult {
        tracing::debug!(case = case.as_str(), "running case");
        let kind = case.kind();
        let input_ext = if kind == CaseKind::Encoder { "json" } else { "toml" };
        let input_path = format!("{}.{input_ext}", case.as_str());

        let Some(input_bytes) = self.corpus.read(&input_path) else {
            return bug_result(case, kind, format!("missing input file {input_path}"));
        };
        let input_bytes = input_bytes.to_vec();
        let input_str = String::from_utf8_lossy(&input_bytes).to_string();

        let invocation = match self.parser.invoke(&input_bytes, self.config.timeout).await {
            Ok(inv) => inv,
            Err(InvokeError::Timeout(d)) => {
                return TestResult {
                    path: case.clone(),
                    kind,
                    skipped: false,
                    failure: Some(format!(
                        "command timed out after {d:?}; increase timeout if this isn't an infinite loop"
                    )),
                    key: None,
                    input: input_str,
                    output: String::new(),
                    output_from_stderr: false,
                    pid: None,
                    want: None,
                };
            }
            Err(e) => {
                return TestResult {
                    path: case.clone(),
                    kind,
                    skipped: false,
                    failure: Some(e.to_string()),
                    key: None,
                    input: input_str,
                    output: String::new(),
                    output_from_stderr: false,
                    pid: None,
                    want: None,
                };
            }
        };

        let mut result = TestResult {
            path: case.clone(),
            kind,
            skipped: false,
            failure: None,
            key: None,
            input: input_str,
            output: invocation.output.clone(),
            output_from_stderr: invocation.output_from_stderr,
            pid: invocation.pid,
            want: None,
        };

        match kind {
            CaseKind::DecoderInvalid => {
                if !invocation.output_from_stderr {
                    result.failure = Some("Expected an error, but no error was reported.".to_string());
                }
            }
            CaseKind::DecoderValid => self.finish_decoder_valid(case, &invocation.output, &mut result),
            CaseKind::Encoder => self.finish_encoder(case, &invocation.output, &mut result),
        }

        result
    }

    fn finish_decoder_valid(&self, case: &CasePath, output: &str, result: &mut TestResult) {
        if result.output_from_stderr {
            result.failure = Some(output.to_string());
            return;
        }
        if output.trim().is_empty() {
            result.failure = Some("stdout is empty".to_string());
            return;
        }

        let want_path = format!("{}.json", case.as_str());
        let Some(want_bytes) = self.corpus.read(&want_path) else {
            result.failure = Some(format!("BUG IN TEST CASE: missing reference file {want_path}"));
            return;
        };
        result.want = Some(String::from_utf8_lossy(want_bytes).to_string());

        let want_json: serde_json::Value = match serde_json::from_slice(want_bytes) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("BUG IN TEST CASE: invalid reference JSON: {e}"));
                return;
            }
        };
        let have_json: serde_json::Value = match serde_json::from_str(output) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("Malformed parser output: invalid JSON: {e}"));
                return;
            }
        };

        let want_tv = match TaggedValue::from_json(&want_json) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("BUG IN TEST CASE: {e}"));
                return;
            }
        };
        let have_tv = match TaggedValue::from_json(&have_json) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("Malformed parser output: {e}"));
                return;
            }
        };

        if let Err(failure) = value::compare(&want_tv, &have_tv) {
            result.failure = Some(failure.message);
        }
    }

    fn finish_encoder(&self, case: &CasePath, output: &str, result: &mut TestResult) {
        if result.output_from_stderr {
            result.failure = Some(output.to_string());
            return;
        }
        if output.trim().is_empty() {
            result.failure = Some("stdout is empty".to_string());
            return;
        }

        let want_path = format!("{}.toml", case.as_str());
        let Some(want_bytes) = self.corpus.read(&want_path) else {
            result.failure = Some(format!("BUG IN TEST CASE: missing reference file {want_path}"));
            return;
        };
        let want_str = String::from_utf8_lossy(want_bytes).to_string();
        result.want = Some(want_str.clone());

        let mut want_value: toml::Value = match toml::from_str(&want_str) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("BUG IN TEST CASE: invalid reference TOML: {e}"));
                return;
            }
        };
        let have_value: toml::Value = match toml::from_str(output) {
            Ok(v) => v,
            Err(e) => {
                result.failure = Some(format!("Malformed parser output: invalid TOML: {e}"));
                return;
            }
        };

        if self.config.int_as_float {
            want_value = encoder_value::normalize_int_as_float(want_value);
        }

        if let Err(failure) = encoder_value::compare(&want_value, &have_value) {
            result.failure = Some(failure.message);
        }
    }
}

fn bug_result(case: &CasePath, kind: CaseKind, message: String) -> TestResult {
    TestResult {
        path: case.clone(),
        kind,
        skipped: false,
        failure: Some(format!("BUG IN TEST CASE: {message}")),
        key: None,
        input: String::new(),
        output: String::new(),
        output_from_stderr: false,
        pid: None,
        want: None,
    }
}

fn invert_for_skip_must_error(mut result: TestResult) -> TestResult {
    if result.failure.is_some() {
        result.failure = None;
        result.skipped = true;
    } else {
        result.skipped = false;
        result.failure = Some("Test skipped with -skip but didn't fail".to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MapCorpus;
    use crate::parser::ScriptedParser;

    fn corpus() -> MapCorpus {
        MapCorpus::new()
            .with_file("valid/a.toml", "a=1")
            .with_file("valid/a.json", r#"{"a": {"type":"integer","value":"1"}}"#)
            .with_file("invalid/a.toml", "a=")
            .with_file("invalid/b.toml", "b=")
            .with_file("invalid/dir/c.toml", "c=")
    }

    // Scenario A: pass-valid.
    #[tokio::test]
    async fn scenario_a_pass_valid() {
        let corpus = corpus();
        let parser = ScriptedParser::new().respond(
            "a=1",
            r#"{"a": {"type":"integer","value":"1"}}"#,
            false,
        );
        let config = RunConfig::default().with_run(vec!["valid/a".to_string()]);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        assert_eq!(report.passed_valid, 1);
        assert_eq!(report.total_failed(), 0);
    }

    // Scenario B: fail-invalid-without-error.
    #[tokio::test]
    async fn scenario_b_fail_invalid_without_error() {
        let corpus = MapCorpus::new().with_file("invalid/a.toml", "a=");
        let parser = ScriptedParser::new().respond(
            "a=",
            r#"{"a": {"type":"integer","value":"0"}}"#,
            false,
        );
        let config = RunConfig::default().with_run(vec!["invalid/a".to_string()]);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        assert_eq!(report.failed_invalid, 1);
        assert_eq!(
            report.tests[0].failure.as_deref(),
            Some("Expected an error, but no error was reported.")
        );
    }

    // Scenario C: pass-invalid-with-error.
    #[tokio::test]
    async fn scenario_c_pass_invalid_with_error() {
        let corpus = MapCorpus::new().with_file("invalid/a.toml", "a=");
        let parser = ScriptedParser::new().respond("a=", "parse error at col 3", true);
        let config = RunConfig::default().with_run(vec!["invalid/a".to_string()]);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        assert_eq!(report.passed_invalid, 1);
    }

    // Scenario D: expected-error miss.
    #[tokio::test]
    async fn scenario_d_expected_error_miss() {
        let corpus = MapCorpus::new().with_file("invalid/a.toml", "a=");
        let parser = ScriptedParser::new().respond("a=", "parse error at col 3", true);
        let mut errors = ExpectedErrors::new();
        errors.insert("invalid/a", "token xyz");
        let config = RunConfig::default()
            .with_run(vec!["invalid/a".to_string()])
            .with_errors(errors);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        assert_eq!(report.failed_invalid, 1);
        assert!(report.tests[0]
            .failure
            .as_deref()
            .unwrap()
            .contains("does not contain"));
    }

    // Scenario F: skip-must-error contradiction.
    #[tokio::test]
    async fn scenario_f_skip_must_error_contradiction() {
        let corpus = corpus();
        let parser = ScriptedParser::new().respond(
            "a=1",
            r#"{"a": {"type":"integer","value":"1"}}"#,
            false,
        );
        let config = RunConfig::default()
            .with_run(vec!["valid/a".to_string()])
            .with_skip(vec!["valid/a".to_string()])
            .with_skip_must_error(true);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        assert_eq!(report.failed_valid, 1);
        assert_eq!(
            report.tests[0].failure.as_deref(),
            Some("Test skipped with -skip but didn't fail")
        );
    }

    #[tokio::test]
    async fn unmatched_expected_error_key_aborts_run() {
        let corpus = MapCorpus::new();
        let parser = ScriptedParser::new();
        let mut errors = ExpectedErrors::new();
        errors.insert("file/doesn/exist", "oh noes");
        let config = RunConfig::default().with_errors(errors);
        let err = Runner::new(&corpus, &parser, config).run().await.unwrap_err();
        assert!(matches!(err, ConformanceError::UnmatchedExpectedErrors(_)));
    }

    #[tokio::test]
    async fn run_filter_unselected_cases_are_skipped() {
        let corpus = corpus();
        let parser = ScriptedParser::new().respond(
            "a=1",
            r#"{"a": {"type":"integer","value":"1"}}"#,
            false,
        );
        let config = RunConfig::default().with_run(vec!["valid/a".to_string()]);
        let report = Runner::new(&corpus, &parser, config).run().await.unwrap();
        // valid/a ran; the three invalid/* cases were enumerated but unselected.
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn results_are_sorted_valid_then_encoder_then_invalid() {
        let corpus = MapCorpus::new()
            .with_file("valid/z.toml", "a=1")
            .with_file("valid/z.json", r#"{"a":{"type":"integer","value":"1"}}"#)
            .with_file("invalid/a.toml", "a=");
        let parser = ScriptedParser::new()
            .respond("a=1", r#"{"a":{"type":"integer","value":"1"}}"#, false)
            .respond("a=", "bad", true);
        let report = Runner::new(&corpus, &parser, RunConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(report.tests[0].path.as_str(), "valid/z");
        assert_eq!(report.tests[1].path.as_str(), "invalid/a");
    }
}
