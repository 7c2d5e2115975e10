//! Scoring of one alignment run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::matcher::{MatchOutcome, MatchResult, TimedDetection};
use crate::domain::{normalize_action, GroundTruthInterval};

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// F1 = 2 * P * R / (P + R). Returns 0.0 when P + R == 0.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Median of a sample; even-length samples average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Timing error statistics across matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAccuracy {
    pub mean_time_diff: f64,
    pub median_time_diff: f64,
    pub max_time_diff: f64,
    /// Matches whose detection fell inside the interval bounds
    pub within_interval: usize,
    /// `within_interval / matches`
    pub within_interval_rate: f64,
}

impl TemporalAccuracy {
    /// `None` when there are no matches.
    pub fn from_matches(matches: &[MatchResult]) -> Option<Self> {
        let diffs: Vec<f64> = matches.iter().map(|m| m.time_diff).collect();
        let median_time_diff = median(&diffs)?;
        let within_interval = matches.iter().filter(|m| m.within_interval).count();

        Some(Self {
            mean_time_diff: diffs.iter().sum::<f64>() / diffs.len() as f64,
            median_time_diff,
            max_time_diff: diffs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            within_interval,
            within_interval_rate: ratio(within_interval, matches.len()),
        })
    }
}

/// Counts for one normalized action label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBreakdown {
    pub ground_truth: usize,
    pub detections: usize,
    pub matched: usize,
}

impl ActionBreakdown {
    /// matched / ground truth. Returns 0.0 when the label has no ground truth.
    pub fn recall(&self) -> f64 {
        ratio(self.matched, self.ground_truth)
    }
}

/// Precision, recall, F1 and timing statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_detections: usize,
    pub total_ground_truth: usize,
    pub matches: usize,
    pub false_positives: usize,
    pub missed: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub temporal: Option<TemporalAccuracy>,
    /// Keyed by normalized action label
    pub per_action: BTreeMap<String, ActionBreakdown>,
}

impl PerformanceMetrics {
    pub fn compute(
        outcome: &MatchOutcome,
        detections: &[TimedDetection],
        ground_truth: &[GroundTruthInterval],
    ) -> Self {
        let matches = outcome.matches.len();
        let precision = ratio(matches, detections.len());
        let recall = ratio(matches, ground_truth.len());

        let mut per_action: BTreeMap<String, ActionBreakdown> = BTreeMap::new();
        for gt in ground_truth {
            per_action.entry(normalize_action(&gt.action)).or_default().ground_truth += 1;
        }
        for det in detections {
            per_action.entry(normalize_action(&det.action)).or_default().detections += 1;
        }
        for m in &outcome.matches {
            if let Some(gt) = ground_truth.get(m.ground_truth_index) {
                per_action.entry(normalize_action(&gt.action)).or_default().matched += 1;
            }
        }

        Self {
            total_detections: detections.len(),
            total_ground_truth: ground_truth.len(),
            matches,
            false_positives: outcome.false_positives.len(),
            missed: outcome.missed.len(),
            precision,
            recall,
            f1: f1_score(precision, recall),
            temporal: TemporalAccuracy::from_matches(&outcome.matches),
            per_action,
        }
    }
}
