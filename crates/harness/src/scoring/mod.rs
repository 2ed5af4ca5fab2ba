//! Reconciling reported findings against annotated expectations.
//!
//! - Confusion: per rule-id TP/TN/FP/FN for one set of lines
//! - Index: findings grouped by file and rule id
//! - Summary: per rule file results, run-wide totals and the verdict

mod confusion;
mod index;
mod summary;

pub use confusion::{ConfusionMatrix, compute_confusion_matrix};
pub use index::{FindingIndex, score_file, score_pairing};
pub use summary::{InvocationError, RuleFileResult, RunSummary};
