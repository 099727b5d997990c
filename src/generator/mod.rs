//! # Generator Module
//!
//! Boundary to the external item generator.
//!
//! The generator is a separate executable that asks an LLM for item
//! definitions and writes them as a JSON array to an output path. This module
//! builds its command line, streams its output into the log and waits for it
//! to exit. Cancellation kills the process; nothing inside the import core is
//! interrupted.

use crate::{ForgeError, ForgeResult};
use log::{info, warn};
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One generation batch to request from the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub item_type_name: String,
    pub count: u32,
    pub model: String,
    /// Profile (preset) the generator should follow
    pub profile_id: String,
    pub output_path: PathBuf,
}

impl GenerationRequest {
    /// Command-line flags understood by the generator.
    ///
    /// # Examples
    ///
    /// ```
    /// use itemforge::GenerationRequest;
    /// use std::path::PathBuf;
    ///
    /// let request = GenerationRequest {
    ///     item_type_name: "Food".to_string(),
    ///     count: 5,
    ///     model: "llama3".to_string(),
    ///     profile_id: "survival_food".to_string(),
    ///     output_path: PathBuf::from("out/food.json"),
    /// };
    /// assert_eq!(
    ///     request.to_args(),
    ///     vec!["--type", "Food", "--count", "5", "--model", "llama3",
    ///          "--preset", "survival_food", "--output", "out/food.json"]
    /// );
    /// ```
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--type".to_string(),
            self.item_type_name.clone(),
            "--count".to_string(),
            self.count.to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--preset".to_string(),
            self.profile_id.clone(),
            "--output".to_string(),
            self.output_path.to_string_lossy().into_owned(),
        ]
    }
}

/// Result of a successful generator run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub output_path: PathBuf,
    /// Lines the generator printed to stdout
    pub stdout_lines: usize,
}

/// Launches the generator executable.
#[derive(Debug, Clone)]
pub struct GeneratorProcess {
    executable: PathBuf,
    base_args: Vec<String>,
}

impl GeneratorProcess {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            base_args: Vec::new(),
        }
    }

    /// Arguments placed before the request flags.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the generator to completion.
    pub async fn run(&self, request: &GenerationRequest) -> ForgeResult<GenerationOutcome> {
        self.run_until(request, std::future::pending::<()>()).await
    }

    /// Runs the generator, killing it if `cancel` completes first.
    ///
    /// A non-zero exit status or a missing output file is reported as
    /// [`ForgeError::GeneratorFailed`]; cancellation as [`ForgeError::Cancelled`].
    pub async fn run_until<F>(
        &self,
        request: &GenerationRequest,
        cancel: F,
    ) -> ForgeResult<GenerationOutcome>
    where
        F: Future<Output = ()>,
    {
        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(
            "Generating {} {} item(s) with model '{}' (profile '{}')",
            request.count, request.item_type_name, request.model, request.profile_id
        );

        let mut child = Command::new(&self.executable)
            .args(&self.base_args)
            .args(request.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ForgeError::GeneratorFailed(format!(
                    "cannot start {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out, false)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(forward_lines(err, true)));

        tokio::pin!(cancel);
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = &mut cancel => {
                warn!("Generation cancelled, stopping {}", self.executable.display());
                child.kill().await?;
                return Err(ForgeError::Cancelled);
            }
        };

        let stdout_lines = match stdout {
            Some(task) => task.await.map(|(count, _)| count).unwrap_or(0),
            None => 0,
        };
        let stderr_tail = match stderr {
            Some(task) => task.await.map(|(_, tail)| tail).unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ForgeError::GeneratorFailed(format!(
                "exit status {}: {}",
                code,
                stderr_tail.join(" | ")
            )));
        }

        if !request.output_path.is_file() {
            return Err(ForgeError::GeneratorFailed(format!(
                "no output written to {}",
                request.output_path.display()
            )));
        }

        Ok(GenerationOutcome {
            output_path: request.output_path.clone(),
            stdout_lines,
        })
    }
}

/// Logs each line of a child stream.
///
/// Returns the line count and, for stderr, the trailing lines.
async fn forward_lines<R>(reader: R, is_stderr: bool) -> (usize, Vec<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::new();
    let mut count = 0;

    while let Ok(Some(line)) = lines.next_line().await {
        count += 1;
        if is_stderr {
            warn!("[generator] {}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        } else {
            info!("[generator] {}", line);
        }
    }

    (count, tail.into_iter().collect())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(output_path: PathBuf) -> GenerationRequest {
        GenerationRequest {
            item_type_name: "Food".to_string(),
            count: 2,
            model: "test-model".to_string(),
            profile_id: "survival_food".to_string(),
            output_path,
        }
    }

    /// A shell stand-in that writes a fixed batch to the `--output` path.
    fn stub_generator(script: &str) -> GeneratorProcess {
        GeneratorProcess::new("sh").with_base_args(["-c", script, "generator"])
    }

    const WRITE_OUTPUT: &str = r#"
        while [ $# -gt 0 ]; do
            if [ "$1" = "--output" ]; then
                printf '[{"id":"food_1"},{"id":"food_2"}]' > "$2"
            fi
            shift
        done
        echo "done"
    "#;

    #[tokio::test]
    async fn test_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("batch").join("food.json");

        let outcome = stub_generator(WRITE_OUTPUT)
            .run(&request(output.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.output_path, output);
        assert_eq!(outcome.stdout_lines, 1);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("food_2"));
    }

    #[tokio::test]
    async fn test_stdout_lines_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("seq 1 500; {}", WRITE_OUTPUT);

        let outcome = stub_generator(&script)
            .run(&request(dir.path().join("food.json")))
            .await
            .unwrap();

        assert_eq!(outcome.stdout_lines, 501);
    }

    #[tokio::test]
    async fn test_failure_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let result = stub_generator("echo 'model unavailable' >&2; exit 3")
            .run(&request(dir.path().join("food.json")))
            .await;

        match result {
            Err(ForgeError::GeneratorFailed(message)) => {
                assert!(message.contains("exit status 3"));
                assert!(message.contains("model unavailable"));
            }
            other => panic!("expected generator failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = stub_generator("exit 0")
            .run(&request(dir.path().join("food.json")))
            .await;

        assert!(matches!(result, Err(ForgeError::GeneratorFailed(_))));
    }

    #[tokio::test]
    async fn test_cancel_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let result = stub_generator("sleep 30")
            .run_until(&request(dir.path().join("food.json")), async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            })
            .await;

        assert!(matches!(result, Err(ForgeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let result = GeneratorProcess::new(dir.path().join("no-such-generator"))
            .run(&request(dir.path().join("food.json")))
            .await;

        assert!(matches!(result, Err(ForgeError::GeneratorFailed(ref m)) if m.contains("cannot start")));
    }
}
