//! Markdown report generation.

use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;

use crate::Result;
use crate::scoring::RunSummary;

/// Markdown report generator.
pub struct MarkdownReport {
  content: String,
}

impl MarkdownReport {
  /// Create a markdown report from a finished run.
  pub fn from_summary(summary: &RunSummary, root: &Path, fail_on_engine_error: bool) -> Self {
    let mut content = String::new();

    Self::write_header(&mut content, root);
    Self::write_summary(&mut content, summary, fail_on_engine_error);
    Self::write_rule_table(&mut content, summary);
    Self::write_rule_files(&mut content, summary);
    Self::write_problems(&mut content, summary);

    Self { content }
  }

  fn write_header(out: &mut String, root: &Path) {
    let _ = writeln!(out, "# Rule Test Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Generated:** {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "**Version:** {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "**Directory:** `{}`", root.display());
    let _ = writeln!(out);
  }

  fn write_summary(out: &mut String, summary: &RunSummary, fail_on_engine_error: bool) {
    let verdict = if summary.passed(fail_on_engine_error) {
      "✅ PASSED"
    } else {
      "❌ FAILED"
    };

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| **Verdict** | {} |", verdict);
    let _ = writeln!(out, "| **Rule files tested** | {} |", summary.tested_count());
    let _ = writeln!(out, "| **Rule files missing tests** | {} |", summary.untested_count());
    let _ = writeln!(out, "| **Engine invocation errors** | {} |", summary.invocation_error_count());
    let _ = writeln!(out, "| **Rule ids** | {} |", summary.totals.len());
    let _ = writeln!(out, "| **Failed rule ids** | {} |", summary.failures().len());
    let _ = writeln!(out, "| **TODO annotations** | {} |", summary.todo_count);
    let _ = writeln!(out);
  }

  fn write_rule_table(out: &mut String, summary: &RunSummary) {
    if summary.totals.is_empty() {
      return;
    }

    let _ = writeln!(out, "## Rule Ids");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Status | Rule id | TP | TN | FP | FN |");
    let _ = writeln!(out, "|--------|---------|----|----|----|----|");

    for (rule_id, cm) in &summary.totals {
      let icon = if cm.is_good() { "✅" } else { "❌" };
      let (tp, tn, fp, fn_) = cm.as_tuple();
      let _ = writeln!(out, "| {} | `{}` | {} | {} | {} | {} |", icon, rule_id, tp, tn, fp, fn_);
    }
    let _ = writeln!(out);
  }

  fn write_rule_files(out: &mut String, summary: &RunSummary) {
    if summary.tested.is_empty() {
      return;
    }

    let _ = writeln!(out, "## Rule Files");
    let _ = writeln!(out);

    for result in &summary.tested {
      let _ = writeln!(out, "### `{}`", result.rule_file.display());
      let _ = writeln!(out);
      if result.no_checks_fired() {
        let _ = writeln!(out, "No checks fired (TODOs: {})", result.todo_count);
        let _ = writeln!(out);
        continue;
      }

      let failures = result.failures();
      if failures.is_empty() {
        let _ = writeln!(out, "All {} checks good", result.scores.len());
      } else {
        let _ = writeln!(out, "**Failed:** `{}`", failures.join("`, `"));
      }
      if result.todo_count > 0 {
        let _ = writeln!(out, "- TODOs: {}", result.todo_count);
      }
      let _ = writeln!(out);
    }
  }

  fn write_problems(out: &mut String, summary: &RunSummary) {
    if !summary.invocation_errors.is_empty() {
      let _ = writeln!(out, "## Engine Errors");
      let _ = writeln!(out);
      for error in &summary.invocation_errors {
        let _ = writeln!(out, "- `{}`: {}", error.rule_file.display(), error.message);
      }
      let _ = writeln!(out);
    }

    if !summary.untested.is_empty() {
      let _ = writeln!(out, "## Missing Tests");
      let _ = writeln!(out);
      for rule_file in &summary.untested {
        let _ = writeln!(out, "- `{}`", rule_file.display());
      }
      let _ = writeln!(out);
    }
  }

  /// Save to a markdown file.
  pub fn save(&self, path: &Path) -> Result<()> {
    std::fs::write(path, &self.content)?;
    Ok(())
  }

  /// Get the markdown content.
  pub fn content(&self) -> &str {
    &self.content
  }
}
