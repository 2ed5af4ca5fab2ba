//! Sequential run orchestration: discover, invoke, parse, score, aggregate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ruletest_core::{Config, DiscoveryConfig};
use tracing::{debug, error, info, warn};

use crate::annotations::{FileAnnotations, MarkerSyntax};
use crate::discovery::{Discovery, RulePairing, discover};
use crate::engine::{EngineError, EngineOutput, MatchEngine};
use crate::scoring::{FindingIndex, RuleFileResult, RunSummary, score_pairing};
use crate::{HarnessError, Result};

/// Knobs that shape a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
  /// Treat `todoruleid` markers as not expected
  pub ignore_todo: bool,
  /// A failed engine invocation fails the run
  pub fail_on_engine_error: bool,
  /// Glob on rule file base names
  pub filter: Option<String>,
}

impl RunOptions {
  pub fn from_config(config: &Config) -> Self {
    Self {
      ignore_todo: config.scoring.ignore_todo,
      fail_on_engine_error: config.scoring.fail_on_engine_error,
      filter: None,
    }
  }
}

/// Drives one engine over every rule file under a directory.
pub struct Runner<E: MatchEngine> {
  engine: E,
  discovery: DiscoveryConfig,
  syntax: MarkerSyntax,
  options: RunOptions,
}

impl<E: MatchEngine> Runner<E> {
  pub fn new(engine: E, config: &Config, options: RunOptions) -> Self {
    Self {
      engine,
      discovery: config.discovery.clone(),
      syntax: MarkerSyntax::from_config(&config.annotations),
      options,
    }
  }

  pub fn options(&self) -> &RunOptions {
    &self.options
  }

  /// Pair rule files with samples, applying the filter if one is set.
  pub fn discover(&self, root: &Path) -> Result<Discovery> {
    let discovery = discover(root, &self.discovery)?;
    Ok(match &self.options.filter {
      Some(pattern) => discovery.filter(pattern),
      None => discovery,
    })
  }

  /// Test every rule file under `root`.
  ///
  /// Pairs are processed one at a time. A failed engine invocation is
  /// recorded and the run moves on; every other error stops the run.
  pub async fn run(&self, root: &Path) -> Result<RunSummary> {
    let start = Instant::now();
    let discovery = self.discover(root)?;
    let mut summary = RunSummary::new();

    for rule_file in discovery.untested {
      summary.record_untested(rule_file);
    }

    info!(
      engine = self.engine.name(),
      "Testing {} rule files",
      discovery.pairings.len()
    );

    for pairing in &discovery.pairings {
      debug!(
        rule_file = %pairing.rule_file.display(),
        samples = pairing.samples.len(),
        "Running engine"
      );

      let output = match self.engine.run(&pairing.rule_file, &pairing.samples).await {
        Ok(output) => output,
        Err(EngineError::Decode(source)) => {
          error!(rule_file = %pairing.rule_file.display(), "Engine output could not be decoded");
          return Err(HarnessError::EngineOutput {
            rule_file: pairing.rule_file.clone(),
            source,
          });
        }
        Err(e) => {
          warn!(rule_file = %pairing.rule_file.display(), err = %e, "Engine invocation failed");
          summary.record_invocation_error(&pairing.rule_file, e.to_string());
          continue;
        }
      };

      let result = self.score(pairing, &output).await?;
      summary.record_result(result);
    }

    info!(
      tested = summary.tested_count(),
      untested = summary.untested_count(),
      invocation_errors = summary.invocation_error_count(),
      failures = summary.failures().len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "Run complete"
    );
    Ok(summary)
  }

  /// Exit code for a finished run under this runner's policy.
  pub fn exit_code(&self, summary: &RunSummary) -> i32 {
    summary.exit_code(self.options.fail_on_engine_error)
  }

  /// Reconcile one engine run against the annotations in its samples.
  async fn score(&self, pairing: &RulePairing, output: &EngineOutput) -> Result<RuleFileResult> {
    let findings = FindingIndex::from_output(output);
    let annotations = load_samples(&pairing.samples, &self.syntax, self.options.ignore_todo).await?;

    let mut result = RuleFileResult::new(&pairing.rule_file, &pairing.samples);
    result.todo_count = annotations.values().map(|a| a.todo_count).sum();
    result.scores = score_pairing(&findings, &annotations)?;

    debug!(
      rule_file = %pairing.rule_file.display(),
      findings = findings.len(),
      rule_ids = result.scores.len(),
      "Scored rule file"
    );
    Ok(result)
  }
}

async fn load_samples(
  samples: &[PathBuf],
  syntax: &MarkerSyntax,
  ignore_todo: bool,
) -> Result<BTreeMap<PathBuf, FileAnnotations>> {
  let mut annotations = BTreeMap::new();
  for sample in samples {
    annotations.insert(sample.clone(), FileAnnotations::load(sample, syntax, ignore_todo).await?);
  }
  Ok(annotations)
}
