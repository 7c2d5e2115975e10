//! Greedy one-to-one matching of detections to ground-truth intervals.
//!
//! Detections are visited in the order they were loaded. Each claims the
//! nearest-center interval that is still unclaimed, has an overlapping
//! normalized label, and is temporally eligible (inside the interval, or
//! within `tolerance` seconds of its center). Ties keep the earliest
//! interval. The result depends on detection order and is not a globally
//! optimal assignment. A detection without a logged clock never matches.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{format_clock, labels_intersect, normalize_action, GroundTruthInterval, TimeSource};

/// A detection placed on the video timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedDetection {
    pub timestamp: NaiveTime,
    pub action: String,
    pub accepted: Option<bool>,
    pub time_source: TimeSource,
    /// Seconds since video start; negative when logged before it
    pub time_seconds: f64,
}

impl TimedDetection {
    pub fn clock(&self) -> String {
        format_clock(self.timestamp)
    }

    /// False when the timestamp is a midnight placeholder
    pub fn has_clock(&self) -> bool {
        self.time_source != TimeSource::Placeholder
    }
}

/// One detection paired with one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub detection_index: usize,
    pub ground_truth_index: usize,
    /// |detection time - stretched interval center|
    pub time_diff: f64,
    /// Detection fell inside the (stretched) interval bounds
    pub within_interval: bool,
    pub original_center: f64,
    pub stretched_center: f64,
}

/// Matches plus the leftovers on each side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matches: Vec<MatchResult>,
    /// Indices of detections that matched nothing
    pub false_positives: Vec<usize>,
    /// Indices of intervals no detection claimed
    pub missed: Vec<usize>,
}

/// Run the greedy pass.
pub fn greedy_match(
    detections: &[TimedDetection],
    ground_truth: &[GroundTruthInterval],
    tolerance: f64,
) -> MatchOutcome {
    let labels: Vec<String> = ground_truth
        .iter()
        .map(|gt| normalize_action(&gt.action))
        .collect();
    let mut claimed = vec![false; ground_truth.len()];
    let mut outcome = MatchOutcome::default();

    for (det_idx, det) in detections.iter().enumerate() {
        if !det.has_clock() {
            tracing::debug!(detection = det_idx, "No logged clock; counted as false positive");
            outcome.false_positives.push(det_idx);
            continue;
        }
        let action = normalize_action(&det.action);
        let t = det.time_seconds;

        let mut best: Option<(usize, f64)> = None;
        for (gt_idx, gt) in ground_truth.iter().enumerate() {
            if claimed[gt_idx] || !labels_intersect(&action, &labels[gt_idx]) {
                continue;
            }

            let diff = (t - gt.center()).abs();
            if !gt.contains(t) && diff > tolerance {
                continue;
            }

            if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                best = Some((gt_idx, diff));
            }
        }

        match best {
            Some((gt_idx, diff)) => {
                claimed[gt_idx] = true;
                let gt = &ground_truth[gt_idx];
                tracing::debug!(
                    detection = det_idx,
                    ground_truth = gt_idx,
                    time_diff = diff,
                    "Matched"
                );
                outcome.matches.push(MatchResult {
                    detection_index: det_idx,
                    ground_truth_index: gt_idx,
                    time_diff: diff,
                    within_interval: gt.contains(t),
                    original_center: gt.original_center(),
                    stretched_center: gt.center(),
                });
            }
            None => outcome.false_positives.push(det_idx),
        }
    }

    outcome.missed = claimed
        .iter()
        .enumerate()
        .filter(|(_, &c)| !c)
        .map(|(i, _)| i)
        .collect();

    outcome
}
