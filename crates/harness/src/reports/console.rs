//! Plain-text status table.

use std::fmt::Write as _;

use crate::scoring::{ConfusionMatrix, RuleFileResult, RunSummary};

const SEPARATOR_WIDTH: usize = 120;
const RULE_ID_WIDTH: usize = 60;

/// Console report: counts, one block per tested rule file, and the verdict.
pub struct ConsoleReport {
  content: String,
}

impl ConsoleReport {
  pub fn from_summary(summary: &RunSummary, fail_on_engine_error: bool) -> Self {
    let mut content = String::new();

    Self::write_counts(&mut content, summary);
    for result in &summary.tested {
      Self::write_rule_file(&mut content, result);
    }
    Self::write_invocation_errors(&mut content, summary);
    Self::write_verdict(&mut content, summary, fail_on_engine_error);

    Self { content }
  }

  fn write_counts(out: &mut String, summary: &RunSummary) {
    let _ = writeln!(out, "{} rule files missing tests", summary.untested_count());
    let _ = writeln!(out, "{} rule files tested", summary.tested_count());
    let _ = writeln!(out, "check id scoring:");
  }

  fn write_rule_file(out: &mut String, result: &RuleFileResult) {
    let _ = writeln!(out, "{}", "=".repeat(SEPARATOR_WIDTH));
    let _ = writeln!(out, "{}", result.rule_file.display());

    if result.no_checks_fired() {
      let _ = writeln!(out, " no checks fired (TODOs: {})", result.todo_count);
      return;
    }

    for (rule_id, cm) in &result.scores {
      let _ = writeln!(out, "{}", status_line(rule_id, cm, result.todo_count));
    }
  }

  fn write_invocation_errors(out: &mut String, summary: &RunSummary) {
    if summary.invocation_errors.is_empty() {
      return;
    }
    let _ = writeln!(out, "{}", "=".repeat(SEPARATOR_WIDTH));
    let _ = writeln!(out, "{} engine invocations failed:", summary.invocation_error_count());
    for error in &summary.invocation_errors {
      let _ = writeln!(out, "  {}: {}", error.rule_file.display(), error.message);
    }
  }

  fn write_verdict(out: &mut String, summary: &RunSummary, fail_on_engine_error: bool) {
    let failures = summary.failures().len();
    if failures > 0 {
      let _ = writeln!(out, "{failures} checks failed tests");
    } else if fail_on_engine_error && !summary.invocation_errors.is_empty() {
      let _ = writeln!(
        out,
        "{} engine invocations failed, no checks failed tests",
        summary.invocation_error_count()
      );
    } else {
      let _ = writeln!(out, "all tests passed");
    }
  }

  pub fn content(&self) -> &str {
    &self.content
  }
}

/// `✔ - <rule id padded>TP: n\tTN:n\t FP: n\t FN: n (TODOs: n)`
fn status_line(rule_id: &str, cm: &ConfusionMatrix, todo_count: usize) -> String {
  let status = if cm.is_good() { '✔' } else { '⚠' };
  let todo_text = if todo_count > 0 {
    format!("(TODOs: {todo_count})")
  } else {
    String::new()
  };
  let (tp, tn, fp, fn_) = cm.as_tuple();
  format!(
    "{status} - {rule_id:<width$}TP: {tp}\tTN:{tn}\t FP: {fp}\t FN: {fn_} {todo_text}",
    width = RULE_ID_WIDTH
  )
}
