//! Rule/sample pairing by naming convention.
//!
//! `eqeq.yaml` is tested against every non-rule file next to it whose path
//! minus extension is also `eqeq` (`eqeq.py`, `eqeq.js`, ...).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ruletest_core::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{HarnessError, Result};

/// A rule file and the samples it runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePairing {
  pub rule_file: PathBuf,
  pub samples: Vec<PathBuf>,
}

impl RulePairing {
  /// Base name of the rule file (file name without its extension).
  pub fn name(&self) -> String {
    self
      .rule_file
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

/// Outcome of scanning a test directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
  /// Rule files with at least one sample, in path order
  pub pairings: Vec<RulePairing>,
  /// Rule files with no sample
  pub untested: Vec<PathBuf>,
}

impl Discovery {
  /// Keep only rule files whose base name matches a glob pattern.
  ///
  /// An invalid pattern keeps everything.
  pub fn filter(mut self, pattern: &str) -> Self {
    let pattern = match glob::Pattern::new(pattern) {
      Ok(pattern) => pattern,
      Err(e) => {
        warn!("Ignoring invalid filter pattern {:?}: {}", pattern, e);
        return self;
      }
    };
    let matches = |path: &Path| {
      path
        .file_stem()
        .is_some_and(|stem| pattern.matches(&stem.to_string_lossy()))
    };
    self.pairings.retain(|p| matches(p.rule_file.as_path()));
    self.untested.retain(|p| matches(p.as_path()));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.pairings.is_empty() && self.untested.is_empty()
  }
}

/// Path with its last extension removed.
fn base_name(path: &Path) -> PathBuf {
  path.with_extension("")
}

fn is_rule_file(path: &Path, config: &DiscoveryConfig) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| config.is_rule_extension(ext))
}

/// Recursively list files under `root`, skipping excluded directories.
///
/// Symlinks to files are listed under their own name; symlinked directories
/// are not descended into.
fn walk_files(root: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
  let walker = WalkDir::new(root)
    .follow_links(false)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| {
      let excluded = e.depth() > 0
        && e.file_type().is_dir()
        && config
          .exclude_dirs
          .iter()
          .any(|d| e.file_name().to_string_lossy() == d.as_str());
      !excluded
    });

  let mut files = Vec::new();
  for entry in walker {
    let entry = entry?;
    let file_type = entry.file_type();
    if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

/// Find every rule file under `root` and pair it with its samples.
///
/// Pairing uses the names as walked (under the canonical root), so a
/// symlinked file pairs by its own name. Samples are then resolved so they
/// compare equal to the paths the engine reports findings under.
pub fn discover(root: &Path, config: &DiscoveryConfig) -> Result<Discovery> {
  if !root.is_dir() {
    return Err(HarnessError::Discovery(format!("{} is not a directory", root.display())));
  }
  let root = std::fs::canonicalize(root)?;

  let files = walk_files(&root, config)?;
  debug!("Scanned {} files under {}", files.len(), root.display());

  let (rule_files, others): (Vec<PathBuf>, Vec<PathBuf>) = files.into_iter().partition(|p| is_rule_file(p, config));

  let mut samples_by_base: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
  for sample in others {
    samples_by_base
      .entry(base_name(&sample))
      .or_insert_with(Vec::new)
      .push(sample);
  }

  let mut discovery = Discovery::default();
  for rule_file in rule_files {
    match samples_by_base.get(&base_name(&rule_file)) {
      Some(samples) => {
        debug!("{} -> {} sample(s)", rule_file.display(), samples.len());
        discovery.pairings.push(RulePairing {
          rule_file,
          samples: samples
            .iter()
            .map(std::fs::canonicalize)
            .collect::<std::io::Result<Vec<_>>>()?,
        });
      }
      None => {
        debug!("{} has no samples", rule_file.display());
        discovery.untested.push(rule_file);
      }
    }
  }

  info!(
    "Discovered {} tested and {} untested rule files",
    discovery.pairings.len(),
    discovery.untested.len()
  );
  Ok(discovery)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use tempfile::TempDir;

  use super::*;

  fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
  }

  fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect()
  }

  #[test]
  fn test_pairs_by_base_name() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "python/eqeq.yaml");
    touch(temp.path(), "python/eqeq.py");
    touch(temp.path(), "python/other.py");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(discovery.pairings[0].name(), "eqeq");
    assert_eq!(names(&discovery.pairings[0].samples), vec!["eqeq.py"]);
    assert!(discovery.untested.is_empty());
  }

  #[test]
  fn test_multiple_samples_share_one_rule() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "eval.yml");
    touch(temp.path(), "eval.js");
    touch(temp.path(), "eval.py");
    touch(temp.path(), "eval.ts");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(names(&discovery.pairings[0].samples), vec!["eval.js", "eval.py", "eval.ts"]);
  }

  #[test]
  fn test_rule_without_samples_is_untested() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "lonely.yaml");
    touch(temp.path(), "paired.yaml");
    touch(temp.path(), "paired.go");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(names(&discovery.untested), vec!["lonely.yaml"]);
  }

  #[test]
  fn test_samples_must_share_directory() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "a/eqeq.yaml");
    touch(temp.path(), "b/eqeq.py");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert!(discovery.pairings.is_empty());
    assert_eq!(discovery.untested.len(), 1);
  }

  #[test]
  fn test_two_rule_extensions_do_not_pair_with_each_other() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "rule.yaml");
    touch(temp.path(), "rule.yml");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert!(discovery.pairings.is_empty());
    assert_eq!(discovery.untested.len(), 2);
  }

  #[test]
  fn test_excluded_dirs_skipped() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), ".git/hooks.yaml");
    touch(temp.path(), ".git/hooks.py");
    touch(temp.path(), "rules/x.yaml");
    touch(temp.path(), "rules/x.rb");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(discovery.pairings[0].name(), "x");
  }

  #[test]
  fn test_paths_are_canonical() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "eqeq.yaml");
    touch(temp.path(), "eqeq.py");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();
    let sample = &discovery.pairings[0].samples[0];
    assert!(sample.is_absolute());
    assert_eq!(sample, &std::fs::canonicalize(sample).unwrap());
  }

  #[test]
  fn test_filter_by_glob() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "eqeq.yaml");
    touch(temp.path(), "eqeq.py");
    touch(temp.path(), "eval.yaml");
    touch(temp.path(), "eval.py");
    touch(temp.path(), "exec.yaml");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap().filter("ev*");

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(discovery.pairings[0].name(), "eval");
    assert!(discovery.untested.is_empty());
  }

  #[test]
  fn test_invalid_filter_keeps_everything() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "eqeq.yaml");
    touch(temp.path(), "eqeq.py");
    touch(temp.path(), "lonely.yaml");

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap().filter("[eq");

    assert_eq!(discovery.pairings.len(), 1);
    assert_eq!(discovery.untested.len(), 1);
  }

  #[cfg(unix)]
  #[test]
  fn test_symlinked_sample_is_paired() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "rules/eqeq.yaml");
    touch(temp.path(), "shared/eqeq.py");
    std::os::unix::fs::symlink(temp.path().join("shared/eqeq.py"), temp.path().join("rules/eqeq.py")).unwrap();

    let discovery = discover(&temp.path().join("rules"), &DiscoveryConfig::default()).unwrap();

    assert_eq!(discovery.pairings.len(), 1);
    assert!(discovery.untested.is_empty());
    // The sample is handed out resolved, matching how findings are indexed
    let target = std::fs::canonicalize(temp.path().join("shared/eqeq.py")).unwrap();
    assert_eq!(discovery.pairings[0].samples, vec![target]);
  }

  #[cfg(unix)]
  #[test]
  fn test_dangling_symlink_skipped() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "eqeq.yaml");
    std::os::unix::fs::symlink(temp.path().join("gone.py"), temp.path().join("eqeq.py")).unwrap();

    let discovery = discover(temp.path(), &DiscoveryConfig::default()).unwrap();

    assert!(discovery.pairings.is_empty());
    assert_eq!(discovery.untested.len(), 1);
  }

  #[test]
  fn test_missing_root_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = discover(&temp.path().join("missing"), &DiscoveryConfig::default()).unwrap_err();
    assert!(matches!(err, HarnessError::Discovery(_)));
  }
}
