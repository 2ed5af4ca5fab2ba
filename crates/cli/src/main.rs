//! `ruletest`: run every rule file under a directory against its annotated
//! samples and report per rule id how the findings matched.
//!
//! Exit codes: 0 all checks good, 1 at least one check failed (or an engine
//! invocation failed under the strict policy), 2 the harness itself failed.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use harness::{CommandEngine, ConsoleReport, Discovery, JsonReport, MarkdownReport, RunOptions, Runner};
use ruletest_core::Config;
use tracing::info;

mod logging;

/// Exit code for errors that stop the run before a verdict exists
const FATAL_EXIT_CODE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "ruletest")]
#[command(about = "Run rule files against their annotated samples and score the findings")]
#[command(version)]
struct Cli {
  /// Folder to collect tests from
  #[arg(default_value = ".")]
  directory: PathBuf,

  /// Ignore rules marked as todoruleid: in test files
  #[arg(long)]
  ignore_todo: bool,

  /// Debug output
  #[arg(short, long)]
  verbose: bool,

  /// Config file (default: <DIRECTORY>/.ruletest.toml, then the user config)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Matching engine executable
  #[arg(long)]
  engine: Option<String>,

  /// Seconds before an engine run is abandoned (0 disables)
  #[arg(long)]
  timeout: Option<u64>,

  /// Only test rule files whose base name matches this glob
  #[arg(long)]
  filter: Option<String>,

  /// Do not fail the run when the engine itself fails
  #[arg(long)]
  allow_engine_errors: bool,

  /// Write a JSON report to this file
  #[arg(long)]
  json: Option<PathBuf>,

  /// Write a Markdown report to this file
  #[arg(long)]
  markdown: Option<PathBuf>,

  /// List rule files and their samples without running the engine
  #[arg(long)]
  list: bool,

  /// Print a default config file and exit
  #[arg(long)]
  print_config: bool,
}

impl Cli {
  /// Resolve the config and apply command-line overrides.
  fn load_config(&self) -> anyhow::Result<Config> {
    let mut config = match &self.config {
      Some(path) => Config::load(path)?,
      None => Config::load_for_project(&self.directory)?,
    };

    if let Some(engine) = &self.engine {
      config.engine.program = engine.clone();
    }
    if let Some(timeout) = self.timeout {
      config.engine.timeout_secs = timeout;
    }
    if self.ignore_todo {
      config.scoring.ignore_todo = true;
    }
    if self.allow_engine_errors {
      config.scoring.fail_on_engine_error = false;
    }
    Ok(config)
  }

  fn run_options(&self, config: &Config) -> RunOptions {
    RunOptions {
      filter: self.filter.clone(),
      ..RunOptions::from_config(config)
    }
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
  let cli = Cli::parse();

  if cli.print_config {
    print!("{}", Config::generate_template());
    return;
  }

  let config = match cli.load_config() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("Error: {e:#}");
      std::process::exit(FATAL_EXIT_CODE);
    }
  };

  logging::init_logging(cli.verbose, &config.log.level);

  match run(&cli, &config).await {
    Ok(code) => std::process::exit(code),
    Err(e) => {
      eprintln!("Error: {e:#}");
      std::process::exit(FATAL_EXIT_CODE);
    }
  }
}

/// Test the directory and print the report. Returns the verdict's exit code.
async fn run(cli: &Cli, config: &Config) -> anyhow::Result<i32> {
  let engine = CommandEngine::new(config.engine.clone());
  let runner = Runner::new(engine, config, cli.run_options(config));

  if cli.list {
    let discovery = runner.discover(&cli.directory)?;
    print!("{}", render_listing(&discovery));
    return Ok(0);
  }

  info!("Collecting rule files from {}", cli.directory.display());
  let summary = runner.run(&cli.directory).await?;
  let fail_on_engine_error = runner.options().fail_on_engine_error;

  print!("{}", ConsoleReport::from_summary(&summary, fail_on_engine_error).content());

  if let Some(path) = &cli.json {
    JsonReport::from_summary(&summary, &cli.directory, fail_on_engine_error)
      .save(path)
      .with_context(|| format!("writing JSON report to {}", path.display()))?;
    info!("JSON report written to {}", path.display());
  }

  if let Some(path) = &cli.markdown {
    MarkdownReport::from_summary(&summary, &cli.directory, fail_on_engine_error)
      .save(path)
      .with_context(|| format!("writing Markdown report to {}", path.display()))?;
    info!("Markdown report written to {}", path.display());
  }

  Ok(runner.exit_code(&summary))
}

fn render_listing(discovery: &Discovery) -> String {
  let mut out = String::new();
  for pairing in &discovery.pairings {
    out.push_str(&format!("{}\n", pairing.rule_file.display()));
    for sample in &pairing.samples {
      out.push_str(&format!("  {}\n", display_name(sample)));
    }
  }
  if !discovery.untested.is_empty() {
    out.push_str(&format!("{} rule files missing tests:\n", discovery.untested.len()));
    for rule_file in &discovery.untested {
      out.push_str(&format!("  {}\n", rule_file.display()));
    }
  }
  out
}

fn display_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}
