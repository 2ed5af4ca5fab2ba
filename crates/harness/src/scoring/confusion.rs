//! Confusion matrix for one rule id.

use std::collections::BTreeSet;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Agreement between reported and expected lines.
///
/// True negatives are always zero: samples have no way to label a line as
/// one the rule must stay silent on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
  pub true_positives: usize,
  pub true_negatives: usize,
  pub false_positives: usize,
  pub false_negatives: usize,
}

impl ConfusionMatrix {
  pub fn new(true_positives: usize, true_negatives: usize, false_positives: usize, false_negatives: usize) -> Self {
    Self {
      true_positives,
      true_negatives,
      false_positives,
      false_negatives,
    }
  }

  /// `(tp, tn, fp, fn)`
  pub fn as_tuple(&self) -> (usize, usize, usize, usize) {
    (
      self.true_positives,
      self.true_negatives,
      self.false_positives,
      self.false_negatives,
    )
  }

  /// No false positives and no false negatives.
  ///
  /// A rule that never fires and is never expected to is good as well.
  pub fn is_good(&self) -> bool {
    self.false_positives == 0 && self.false_negatives == 0
  }
}

impl AddAssign for ConfusionMatrix {
  fn add_assign(&mut self, other: Self) {
    self.true_positives += other.true_positives;
    self.true_negatives += other.true_negatives;
    self.false_positives += other.false_positives;
    self.false_negatives += other.false_negatives;
  }
}

impl Add for ConfusionMatrix {
  type Output = Self;

  fn add(mut self, other: Self) -> Self {
    self += other;
    self
  }
}

/// Score one set of reported lines against one set of expected lines.
pub fn compute_confusion_matrix(reported: &BTreeSet<usize>, expected: &BTreeSet<usize>) -> ConfusionMatrix {
  ConfusionMatrix {
    true_positives: expected.intersection(reported).count(),
    true_negatives: 0,
    false_positives: reported.difference(expected).count(),
    false_negatives: expected.difference(reported).count(),
  }
}
