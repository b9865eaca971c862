//! Scenario E from the testable-properties list: a parser that never
//! returns within the configured timeout must be killed and the case must
//! fail with the timeout message, without hanging the run.

use std::time::Duration;

use toml_conformance::{Invocation, InvokeError, MapCorpus, Parser, RunConfig, Runner};

struct SleepyParser;

#[async_trait::async_trait]
impl Parser for SleepyParser {
    async fn invoke(&self, _input: &[u8], _timeout: Duration) -> Result<Invocation, InvokeError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Invocation {
            pid: Some(1),
            output: "unreachable\n".to_string(),
            output_from_stderr: false,
        })
    }

    fn command(&self) -> Vec<String> {
        vec!["sleepy".to_string()]
    }
}

#[tokio::test]
async fn scenario_e_timeout_fails_case_without_hanging() {
    let corpus = MapCorpus::new().with_file("valid/a.toml", "a=1");
    let config = RunConfig::default()
        .with_run(vec!["valid/a".to_string()])
        .with_timeout(Duration::from_millis(20));
    let parser = SleepyParser;

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        Runner::new(&corpus, &parser, config).run(),
    )
    .await
    .expect("run must not hang")
    .unwrap();

    assert_eq!(report.failed_valid, 1);
    assert!(report.tests[0]
        .failure
        .as_deref()
        .unwrap()
        .contains("timed out"));
}
