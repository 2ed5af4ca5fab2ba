//! Configuration system for ruletest with per-project overrides.
//!
//! Config priority: explicit file > project-relative (.ruletest.toml) > user (~/.config/ruletest/config.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the project-level config, looked up in the target directory.
pub const PROJECT_CONFIG_FILE: &str = ".ruletest.toml";

/// Errors raised when an explicitly requested config file cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// How to invoke the external matching engine.
///
/// The final command line is `program args.. rule_flag <rule file> <samples..>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Executable name or path (default: "sgrep-lint")
  pub program: String,

  /// Arguments placed before the rule flag (default: ["--no-rewrite-rule-ids"])
  pub args: Vec<String>,

  /// Flag that introduces the rule file (default: "-f")
  pub rule_flag: String,

  /// Per-invocation timeout in seconds, 0 disables it (default: 300)
  pub timeout_secs: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      program: "sgrep-lint".to_string(),
      args: vec!["--no-rewrite-rule-ids".to_string()],
      rule_flag: "-f".to_string(),
      timeout_secs: 300,
    }
  }
}

// ============================================================================
// Discovery Configuration
// ============================================================================

/// Rule/sample pairing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
  /// Extensions (without the dot) that mark rule-definition files
  pub rule_extensions: Vec<String>,

  /// Directory names that are never descended into
  pub exclude_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
  fn default() -> Self {
    Self {
      rule_extensions: vec!["yml".to_string(), "yaml".to_string()],
      exclude_dirs: vec![".git".to_string()],
    }
  }
}

impl DiscoveryConfig {
  /// Check whether an extension marks a rule-definition file
  pub fn is_rule_extension(&self, ext: &str) -> bool {
    self.rule_extensions.iter().any(|e| e.trim_start_matches('.') == ext)
  }
}

// ============================================================================
// Annotation Configuration
// ============================================================================

/// Annotation syntax settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
  /// Comment leaders recognised in front of `ruleid` / `todoruleid` markers
  pub comment_prefixes: Vec<String>,
}

impl Default for AnnotationConfig {
  fn default() -> Self {
    Self {
      comment_prefixes: vec!["#".to_string()],
    }
  }
}

// ============================================================================
// Scoring Configuration
// ============================================================================

/// Scoring policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  /// Do not treat `todoruleid` markers as expectations (default: false)
  pub ignore_todo: bool,

  /// A failed engine invocation fails the whole run (default: true)
  pub fail_on_engine_error: bool,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      ignore_todo: false,
      fail_on_engine_error: true,
    }
  }
}

// ============================================================================
// Log Configuration
// ============================================================================

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
  /// External engine invocation
  #[serde(default)]
  pub engine: EngineConfig,

  /// Rule/sample discovery
  #[serde(default)]
  pub discovery: DiscoveryConfig,

  /// Annotation syntax
  #[serde(default)]
  pub annotations: AnnotationConfig,

  /// Scoring policy
  #[serde(default)]
  pub scoring: ScoringConfig,

  /// Logging
  #[serde(default)]
  pub log: LogConfig,
}

impl Config {
  /// Load config from an explicit path, failing loudly if it cannot be used
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load config for a test directory, with fallback to user config.
  ///
  /// A config file that exists but cannot be read or parsed is an error
  /// rather than a silent fallback to the next layer.
  pub fn load_for_project(project_path: &Path) -> Result<Self, ConfigError> {
    // Try project-relative first
    let project_config = Self::project_config_path(project_path);
    if project_config.exists() {
      return Self::load(&project_config);
    }

    // Fall back to user config
    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
    {
      return Self::load(&user_config_path);
    }

    Ok(Self::default())
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("RULETEST_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("ruletest").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("ruletest").join("config.toml"))
  }

  /// Get the project-relative config path
  pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(PROJECT_CONFIG_FILE)
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();
    let quoted = |items: &[String]| {
      items
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ")
    };

    format!(
      r#"# ruletest configuration
# Place at <test dir>/{project_file} or ~/.config/ruletest/config.toml

[engine]
# Executable of the external matching engine
program = "{program}"
# Arguments placed before the rule flag
args = [{args}]
# Flag that introduces the rule file
rule_flag = "{rule_flag}"
# Per-invocation timeout in seconds (0 = no timeout)
timeout_secs = {timeout_secs}

[discovery]
# Extensions marking rule-definition files
rule_extensions = [{rule_extensions}]
# Directory names never descended into
exclude_dirs = [{exclude_dirs}]

[annotations]
# Comment leaders recognised before ruleid/todoruleid markers
comment_prefixes = [{comment_prefixes}]

[scoring]
# Treat todoruleid markers as not expected
ignore_todo = {ignore_todo}
# A failed engine invocation fails the whole run
fail_on_engine_error = {fail_on_engine_error}

[log]
# Log level: off, error, warn, info, debug, trace
level = "{level}"
"#,
      project_file = PROJECT_CONFIG_FILE,
      program = defaults.engine.program,
      args = quoted(&defaults.engine.args),
      rule_flag = defaults.engine.rule_flag,
      timeout_secs = defaults.engine.timeout_secs,
      rule_extensions = quoted(&defaults.discovery.rule_extensions),
      exclude_dirs = quoted(&defaults.discovery.exclude_dirs),
      comment_prefixes = quoted(&defaults.annotations.comment_prefixes),
      ignore_todo = defaults.scoring.ignore_todo,
      fail_on_engine_error = defaults.scoring.fail_on_engine_error,
      level = defaults.log.level,
    )
  }
}
