//! Engine invocation as a child process.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
  process::Stdio,
  time::{Duration, Instant},
};

use async_trait::async_trait;
use ruletest_core::EngineConfig;
use tokio::{process::Command, time::timeout};
use tracing::{debug, error, trace, warn};

use super::{EngineError, EngineOutput, MatchEngine};

/// Runs `program args.. rule_flag <rule> <samples..>` and decodes its stdout.
#[derive(Debug, Clone)]
pub struct CommandEngine {
  config: EngineConfig,
}

impl CommandEngine {
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  /// Arguments passed to the program for one invocation.
  pub fn arguments(&self, rule_file: &Path, samples: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = self.config.args.iter().map(OsString::from).collect();
    if !self.config.rule_flag.is_empty() {
      args.push(OsString::from(&self.config.rule_flag));
    }
    args.push(rule_file.as_os_str().to_owned());
    args.extend(samples.iter().map(|s| s.as_os_str().to_owned()));
    args
  }

  fn timeout(&self) -> Option<Duration> {
    (self.config.timeout_secs > 0).then(|| Duration::from_secs(self.config.timeout_secs))
  }
}

#[async_trait]
impl MatchEngine for CommandEngine {
  fn name(&self) -> &str {
    &self.config.program
  }

  async fn run(&self, rule_file: &Path, samples: &[PathBuf]) -> Result<EngineOutput, EngineError> {
    let start = Instant::now();
    let args = self.arguments(rule_file, samples);

    debug!(
      program = %self.config.program,
      args = ?args,
      "Invoking engine"
    );

    let mut cmd = Command::new(&self.config.program);
    cmd
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let child = match cmd.spawn() {
      Ok(child) => child,
      Err(e) => {
        error!(err = %e, program = %self.config.program, "Failed to spawn engine");
        return Err(e.into());
      }
    };

    // Dropping the pending future on expiry kills the child
    let output = match self.timeout() {
      Some(limit) => match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
          warn!(
            timeout_secs = self.config.timeout_secs,
            rule_file = %rule_file.display(),
            "Engine timed out"
          );
          return Err(EngineError::Timeout(self.config.timeout_secs));
        }
      },
      None => child.wait_with_output().await?,
    };

    if !output.status.success() {
      let code = output.status.code().unwrap_or(-1);
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      warn!(
        exit_code = code,
        rule_file = %rule_file.display(),
        "Engine exited with failure"
      );
      return Err(EngineError::ProcessFailed { code, stderr });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    trace!(
      output_len = stdout.len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "Engine completed"
    );

    let decoded = EngineOutput::from_json(&stdout).inspect_err(|e| {
      error!(
        err = %e,
        output_preview = %stdout.chars().take(200).collect::<String>(),
        "Failed to decode engine output"
      );
    })?;

    for engine_error in &decoded.errors {
      warn!(rule_file = %rule_file.display(), "Engine reported: {}", engine_error);
    }

    debug!(
      findings = decoded.results.len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "Engine run finished"
    );
    Ok(decoded)
  }
}
