//! Timeline stretching.
//!
//! The wall-clock span covered by detections rarely equals the labelled span
//! of the ground truth (replay speed, pauses, drift). A single global affine
//! map is fitted so the ground-truth timeline starts where the detections
//! start and covers the same span:
//!
//! ```text
//! stretched = (original - gt_start) * factor + detection_start
//! factor    = detection_span / gt_span          (1.0 when gt_span <= 0)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::GroundTruthInterval;

/// Fitted stretch parameters for one alignment run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchPlan {
    pub factor: f64,
    pub detection_start: f64,
    pub detection_end: f64,
    pub gt_start: f64,
    pub gt_end: f64,
    /// Ground-truth span was zero or negative; `factor` fell back to 1.0
    pub degenerate: bool,
}

impl StretchPlan {
    /// Fit a plan. Returns `None` when either side is empty, in which case
    /// nothing is stretched.
    pub fn compute(detection_times: &[f64], ground_truth: &[GroundTruthInterval]) -> Option<Self> {
        if detection_times.is_empty() || ground_truth.is_empty() {
            return None;
        }

        let detection_start = detection_times.iter().copied().fold(f64::INFINITY, f64::min);
        let detection_end = detection_times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let gt_start = ground_truth
            .iter()
            .map(|gt| gt.original_start)
            .fold(f64::INFINITY, f64::min);
        let gt_end = ground_truth
            .iter()
            .map(|gt| gt.original_end)
            .fold(f64::NEG_INFINITY, f64::max);

        let gt_span = gt_end - gt_start;
        let degenerate = gt_span <= 0.0;
        let factor = if degenerate {
            1.0
        } else {
            (detection_end - detection_start) / gt_span
        };

        Some(Self {
            factor,
            detection_start,
            detection_end,
            gt_start,
            gt_end,
            degenerate,
        })
    }

    pub fn detection_span(&self) -> f64 {
        self.detection_end - self.detection_start
    }

    pub fn gt_span(&self) -> f64 {
        self.gt_end - self.gt_start
    }

    /// Map a ground-truth time onto the detection timeline
    pub fn map(&self, t: f64) -> f64 {
        (t - self.gt_start) * self.factor + self.detection_start
    }

    /// Rewrite the working bounds of every interval from its labelled bounds.
    pub fn apply(&self, ground_truth: &mut [GroundTruthInterval]) {
        for gt in ground_truth.iter_mut() {
            gt.start_seconds = self.map(gt.original_start);
            gt.end_seconds = self.map(gt.original_end);
            gt.stretched_duration = Some(gt.end_seconds - gt.start_seconds);
        }
    }
}
