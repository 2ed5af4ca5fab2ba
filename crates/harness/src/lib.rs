//! Correctness harness for pattern-matching rule files.
//!
//! Every rule file is paired by base name with one or more annotated sample
//! files. The external matching engine is run on each pair and its findings
//! are reconciled, line by line, against the `ruleid:` / `todoruleid:`
//! comments in the samples.
//!
//! ## Key Concepts
//!
//! - **Discovery**: rule files and their same-named samples
//! - **Annotations**: expectations parsed from sample comments
//! - **Engine**: black-box matcher invoked out of process
//! - **Scoring**: per rule-id confusion matrices and the run verdict
//! - **Reports**: console (human), JSON (machine), Markdown (summary)

pub mod annotations;
pub mod discovery;
pub mod engine;
pub mod reports;
pub mod runner;
pub mod scoring;

use std::path::PathBuf;

pub use annotations::{FileAnnotations, MarkerSyntax, parse_annotations};
pub use discovery::{Discovery, RulePairing, discover};
pub use engine::{CommandEngine, EngineError, EngineFinding, EngineOutput, MatchEngine};
pub use reports::{ConsoleReport, JsonReport, MarkdownReport};
pub use runner::{RunOptions, Runner};
pub use scoring::{ConfusionMatrix, FindingIndex, InvocationError, RuleFileResult, RunSummary, compute_confusion_matrix};
use thiserror::Error;

/// Harness errors.
///
/// Every variant is fatal: the run stops and no verdict is produced. Engine
/// invocation failures are not represented here because they are recorded
/// in the [`RunSummary`] instead.
#[derive(Debug, Error)]
pub enum HarnessError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Directory walk failed: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("Discovery error: {0}")]
  Discovery(String),

  #[error("{}:{line}: annotation marker without a rule id: {text:?}", file.display())]
  MalformedAnnotation { file: PathBuf, line: usize, text: String },

  #[error(
    "rule {rule_id} fired more than once on line {line} of {}; rules under test must not fire multiple times on the same line",
    file.display()
  )]
  DuplicateFinding { file: PathBuf, rule_id: String, line: usize },

  #[error("Engine output for {} could not be decoded: {source}", rule_file.display())]
  EngineOutput {
    rule_file: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

pub type Result<T> = std::result::Result<T, HarnessError>;
