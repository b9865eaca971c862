//! Exercises the on-disk corpus loader end to end against a tiny directory
//! tree written by the test itself.

use toml_conformance::{FsCorpus, RunConfig, Runner, ScriptedParser};

#[tokio::test]
async fn loads_a_real_directory_tree_and_runs_against_it() {
    let dir = tempfile::tempdir().unwrap();
    let valid = dir.path().join("valid/string");
    std::fs::create_dir_all(&valid).unwrap();
    std::fs::write(valid.join("simple.toml"), "a=1").unwrap();
    std::fs::write(
        valid.join("simple.json"),
        r#"{"a": {"type":"integer","value":"1"}}"#,
    )
    .unwrap();

    let corpus = FsCorpus::load(dir.path()).unwrap();
    let parser = ScriptedParser::new().respond(
        "a=1",
        r#"{"a": {"type":"integer","value":"1"}}"#,
        false,
    );
    let config = RunConfig::default().with_run(vec!["valid/string/simple".to_string()]);
    let report = Runner::new(&corpus, &parser, config).run().await.unwrap();

    assert_eq!(report.passed_valid, 1);
    assert!(report.is_success());
}
