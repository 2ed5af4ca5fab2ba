//! Logging setup for the command line

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse log level from config string
fn parse_log_level(level: &str) -> Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => Level::ERROR,
    "warn" => Level::WARN,
    "info" => Level::INFO,
    "debug" => Level::DEBUG,
    "trace" => Level::TRACE,
    _ => Level::INFO,
  }
}

/// Initialize logging on stderr so stdout carries only the report.
///
/// `--verbose` forces DEBUG, otherwise the configured level applies.
/// `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool, level: &str) {
  let level = if verbose { Level::DEBUG } else { parse_log_level(level) };

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}
