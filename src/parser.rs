//! The parser adapter: drives an external subprocess under the
//! stdin/stdout protocol described in the corpus layout, or (for tests) a
//! scripted test double.
//!
//! Grounded on `sqllogictest-bin`'s `ExternalDriver` for child-process
//! lifecycle management, and on the reference `runParser` in `runner.go` for
//! the exit-code/stream routing rules.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// What happened when a parser was invoked on one case.
pub struct Invocation {
    pub pid: Option<u32>,
    pub output: String,
    pub output_from_stderr: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("command timed out after {0:?}; increase timeout if this isn't an infinite loop")]
    Timeout(Duration),
    #[error("failed to spawn parser: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("parser exited with code {code}: {stderr}")]
    Runtime { code: i32, stderr: String },
}

/// A capability that can run a case's input through a parser and report
/// what came back. Implemented by a subprocess driver and, for tests, a
/// scripted double.
#[async_trait::async_trait]
pub trait Parser: Send + Sync {
    async fn invoke(&self, input: &[u8], timeout: Duration) -> Result<Invocation, InvokeError>;

    /// The argv used to report which command produced a result. Not used to
    /// drive execution.
    fn command(&self) -> Vec<String>;
}

/// Spawns `argv[0] argv[1..]`, feeding `input` on stdin and classifying the
/// captured stdout/stderr per the subprocess protocol.
pub struct SubprocessParser {
    argv: Vec<String>,
}

impl SubprocessParser {
    pub fn new(argv: Vec<String>) -> Self {
        assert!(!argv.is_empty(), "parser command must not be empty");
        SubprocessParser { argv }
    }
}

#[async_trait::async_trait]
impl Parser for SubprocessParser {
    async fn invoke(&self, input: &[u8], timeout: Duration) -> Result<Invocation, InvokeError> {
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(InvokeError::Spawn)?;

        let pid = child.id();

        let mut stdin = child.stdin.take().expect("stdin was piped");
        let input = input.to_vec();
        let write_task = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
            drop(stdin);
        });

        let wait = async move {
            let _ = write_task.await;
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result.map_err(InvokeError::Spawn)?,
            Err(_) => {
                tracing::debug!(?pid, ?timeout, "parser timed out");
                return Err(InvokeError::Timeout(timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let code = output.status.code();
        tracing::debug!(?pid, ?code, "parser exited");

        match code {
            Some(0) => {}
            Some(1) => {
                if stderr.is_empty() {
                    stderr = "Exit 1".to_string();
                }
            }
            other => {
                return Err(InvokeError::Runtime {
                    code: other.unwrap_or(-1),
                    stderr,
                });
            }
        }

        let output_from_stderr = !stderr.is_empty();
        let output = if output_from_stderr {
            format!("{stderr}\n")
        } else {
            format!("{stdout}\n")
        };

        Ok(Invocation {
            pid,
            output,
            output_from_stderr,
        })
    }

    fn command(&self) -> Vec<String> {
        self.argv.clone()
    }
}

/// A scripted parser for tests, mapping exact input strings to a canned
/// response. Mirrors the reference suite's `testParser`.
pub struct ScriptedParser {
    responses: Vec<(String, String, bool)>,
}

impl ScriptedParser {
    pub fn new() -> Self {
        ScriptedParser {
            responses: Vec::new(),
        }
    }

    pub fn respond(mut self, input: &str, output: &str, from_stderr: bool) -> Self {
        self.responses
            .push((input.to_string(), output.to_string(), from_stderr));
        self
    }
}

impl Default for ScriptedParser {
    fn default() -> Self {
        ScriptedParser::new()
    }
}

#[async_trait::async_trait]
impl Parser for ScriptedParser {
    async fn invoke(&self, input: &[u8], _timeout: Duration) -> Result<Invocation, InvokeError> {
        let input = String::from_utf8_lossy(input);
        for (want, output, from_stderr) in &self.responses {
            if want == input.as_ref() {
                return Ok(Invocation {
                    pid: Some(42),
                    output: format!("{output}\n"),
                    output_from_stderr: *from_stderr,
                });
            }
        }
        panic!("unscripted input: {input:?}");
    }

    fn command(&self) -> Vec<String> {
        vec!["test-double".to_string()]
    }
}
