//! Shared configuration for the ruletest workspace.

mod config;

pub use config::{
  AnnotationConfig, Config, ConfigError, DiscoveryConfig, EngineConfig, LogConfig, PROJECT_CONFIG_FILE, ScoringConfig,
};
