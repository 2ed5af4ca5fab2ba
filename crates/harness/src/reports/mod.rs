//! Report rendering for run summaries.
//!
//! - Console: the status table printed after a run
//! - JSON: machine-readable, for CI and comparison between runs
//! - Markdown: human-readable summary

mod console;
mod json;
mod markdown;

pub use console::ConsoleReport;
pub use json::JsonReport;
pub use markdown::MarkdownReport;
