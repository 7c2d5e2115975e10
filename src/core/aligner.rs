//! Temporal aligner.
//!
//! Owns the detections, the ground-truth arena and the alignment context for
//! one run. Lifecycle:
//!
//! ```text
//! Unloaded → DetectionsLoaded → GroundTruthLoaded → StartTimeSet
//!          → Stretched (optional) → Matched → Reported
//! ```
//!
//! Matching without a video start time fails with
//! [`AlignError::PreconditionNotSet`]. Detections whose time is only a
//! placeholder stay out of the stretch fit and are scored as false positives.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::matcher::{greedy_match, MatchOutcome, MatchResult, TimedDetection};
use super::metrics::PerformanceMetrics;
use super::stretch::StretchPlan;
use crate::domain::{parse_clock, Detection, GroundTruthInterval, TimeSource};

/// Default matching tolerance in seconds
pub const DEFAULT_TOLERANCE_SECONDS: f64 = 10.0;

/// Alignment failures
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Precondition not set: {what}")]
    PreconditionNotSet { what: &'static str },

    #[error("Invalid video start time '{value}': expected HH:MM:SS")]
    InvalidStartTime { value: String },
}

/// Settings and derived values for one alignment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentContext {
    pub tolerance_seconds: f64,
    pub stretch_enabled: bool,
    /// Score only detections interpreted as accepted
    pub accepted_only: bool,
    pub video_start_time: Option<NaiveTime>,
    /// Factor used by the last match pass; 1.0 until then
    pub stretch_factor: f64,
}

impl Default for AlignmentContext {
    fn default() -> Self {
        Self {
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            stretch_enabled: true,
            accepted_only: false,
            video_start_time: None,
            stretch_factor: 1.0,
        }
    }
}

/// Where the aligner is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignerStage {
    Unloaded,
    DetectionsLoaded,
    GroundTruthLoaded,
    StartTimeSet,
    Stretched,
    Matched,
    Reported,
}

/// The fields of a detection the aligner needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPoint {
    pub timestamp: NaiveTime,
    pub action: String,
    pub accepted: Option<bool>,
    pub time_source: TimeSource,
}

impl From<&Detection> for DetectionPoint {
    fn from(d: &Detection) -> Self {
        Self {
            timestamp: d.timestamp,
            action: d.action.clone(),
            accepted: d.accepted,
            time_source: d.time_source,
        }
    }
}

/// Everything produced by one match pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResults {
    pub context: AlignmentContext,
    /// Scored detections, placed on the video timeline
    pub detections: Vec<TimedDetection>,
    /// Ground truth with working bounds as used for matching
    pub ground_truth: Vec<GroundTruthInterval>,
    pub matches: Vec<MatchResult>,
    pub false_positives: Vec<usize>,
    pub missed: Vec<usize>,
    pub stretch: Option<StretchPlan>,
}

impl AlignmentResults {
    pub fn total_detections(&self) -> usize {
        self.detections.len()
    }

    pub fn total_ground_truth(&self) -> usize {
        self.ground_truth.len()
    }

    pub fn stretch_factor(&self) -> f64 {
        self.context.stretch_factor
    }

    fn outcome(&self) -> MatchOutcome {
        MatchOutcome {
            matches: self.matches.clone(),
            false_positives: self.false_positives.clone(),
            missed: self.missed.clone(),
        }
    }
}

/// Aligns wall-clock detections with a video-relative ground truth
#[derive(Debug, Clone)]
pub struct TemporalAligner {
    context: AlignmentContext,
    detections: Vec<DetectionPoint>,
    ground_truth: Vec<GroundTruthInterval>,
    stage: AlignerStage,
}

impl Default for TemporalAligner {
    fn default() -> Self {
        Self::new(AlignmentContext::default())
    }
}

impl TemporalAligner {
    pub fn new(context: AlignmentContext) -> Self {
        Self {
            context,
            detections: Vec::new(),
            ground_truth: Vec::new(),
            stage: AlignerStage::Unloaded,
        }
    }

    pub fn context(&self) -> &AlignmentContext {
        &self.context
    }

    pub fn stage(&self) -> AlignerStage {
        self.stage
    }

    /// Ground-truth arena, with working bounds from the last match pass
    pub fn ground_truth(&self) -> &[GroundTruthInterval] {
        &self.ground_truth
    }

    /// Replace the detection set. Order is kept; it drives matching.
    pub fn load_detections<I, T>(&mut self, detections: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<DetectionPoint>,
    {
        self.detections = detections.into_iter().map(Into::into).collect();
        self.stage = AlignerStage::DetectionsLoaded;
        info!(count = self.detections.len(), "Loaded detections");
    }

    /// Replace the ground-truth arena. An empty table is allowed.
    pub fn load_ground_truth(&mut self, ground_truth: Vec<GroundTruthInterval>) {
        self.ground_truth = ground_truth;
        self.stage = AlignerStage::GroundTruthLoaded;
        info!(count = self.ground_truth.len(), "Loaded ground truth");
    }

    /// Set the wall clock at which the video started (`HH:MM:SS`).
    pub fn set_video_start_time(&mut self, value: &str) -> Result<(), AlignError> {
        let start = parse_clock(value).ok_or_else(|| AlignError::InvalidStartTime {
            value: value.to_string(),
        })?;
        self.context.video_start_time = Some(start);
        self.stage = AlignerStage::StartTimeSet;
        Ok(())
    }

    /// Convert, stretch and match.
    ///
    /// Each call starts from the labelled ground-truth bounds, so repeated
    /// calls on the same input give identical results.
    #[instrument(skip(self))]
    pub fn find_temporal_matches(&mut self) -> Result<AlignmentResults, AlignError> {
        let start = self
            .context
            .video_start_time
            .ok_or(AlignError::PreconditionNotSet {
                what: "video start time",
            })?;

        let detections: Vec<TimedDetection> = self
            .detections
            .iter()
            .filter(|d| !self.context.accepted_only || d.accepted.unwrap_or(true))
            .map(|d| TimedDetection {
                timestamp: d.timestamp,
                action: d.action.clone(),
                accepted: d.accepted,
                time_source: d.time_source,
                time_seconds: (d.timestamp - start).num_seconds() as f64,
            })
            .collect();

        let unclocked = detections.iter().filter(|d| !d.has_clock()).count();
        if unclocked > 0 {
            warn!(
                count = unclocked,
                "Detections without a logged clock are scored as false positives"
            );
        }

        for gt in self.ground_truth.iter_mut() {
            gt.reset();
        }

        let stretch = if self.context.stretch_enabled {
            let times: Vec<f64> = detections
                .iter()
                .filter(|d| d.has_clock())
                .map(|d| d.time_seconds)
                .collect();
            StretchPlan::compute(&times, &self.ground_truth)
        } else {
            None
        };

        match &stretch {
            Some(plan) => {
                if plan.degenerate {
                    warn!(
                        gt_span = plan.gt_span(),
                        "Ground truth span is not positive; using stretch factor 1.0"
                    );
                } else if plan.detection_span() == 0.0 {
                    warn!("Detections span zero seconds; ground truth collapses to one instant");
                }
                plan.apply(&mut self.ground_truth);
                self.context.stretch_factor = plan.factor;
                self.stage = AlignerStage::Stretched;
                info!(
                    factor = plan.factor,
                    detection_span = plan.detection_span(),
                    gt_span = plan.gt_span(),
                    "Stretched ground truth timeline"
                );
            }
            None => self.context.stretch_factor = 1.0,
        }

        let outcome = greedy_match(
            &detections,
            &self.ground_truth,
            self.context.tolerance_seconds,
        );
        self.stage = AlignerStage::Matched;
        info!(
            matches = outcome.matches.len(),
            false_positives = outcome.false_positives.len(),
            missed = outcome.missed.len(),
            "Matching complete"
        );

        Ok(AlignmentResults {
            context: self.context.clone(),
            detections,
            ground_truth: self.ground_truth.clone(),
            matches: outcome.matches,
            false_positives: outcome.false_positives,
            missed: outcome.missed,
            stretch,
        })
    }

    /// Score a match pass.
    pub fn analyze_performance(&mut self, results: &AlignmentResults) -> PerformanceMetrics {
        self.stage = AlignerStage::Reported;
        PerformanceMetrics::compute(&results.outcome(), &results.detections, &results.ground_truth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(clock: &str, action: &str, accepted: Option<bool>) -> DetectionPoint {
        DetectionPoint {
            timestamp: parse_clock(clock).unwrap(),
            action: action.to_string(),
            accepted,
            time_source: TimeSource::Logged,
        }
    }

    fn aligner(stretch: bool) -> TemporalAligner {
        TemporalAligner::new(AlignmentContext {
            stretch_enabled: stretch,
            ..AlignmentContext::default()
        })
    }

    #[test]
    fn test_requires_start_time() {
        let mut a = aligner(true);
        a.load_detections(vec![point("15:00:10", "flip", None)]);
        a.load_ground_truth(vec![GroundTruthInterval::new(0.0, 20.0, "flip", "c")]);

        let err = a.find_temporal_matches().unwrap_err();
        assert!(matches!(err, AlignError::PreconditionNotSet { .. }));
        assert_eq!(a.stage(), AlignerStage::GroundTruthLoaded);
    }

    #[test]
    fn test_invalid_start_time() {
        let mut a = aligner(true);
        let err = a.set_video_start_time("3pm").unwrap_err();
        assert!(matches!(err, AlignError::InvalidStartTime { .. }));
        assert!(a.context().video_start_time.is_none());
    }

    #[test]
    fn test_single_match_without_stretch() {
        let mut a = aligner(false);
        a.load_detections(vec![point("15:00:12", "add-food", Some(true))]);
        a.load_ground_truth(vec![GroundTruthInterval::new(10.0, 15.0, "add-food", "food")]);
        a.set_video_start_time("15:00:00").unwrap();

        let results = a.find_temporal_matches().unwrap();
        assert_eq!(a.stage(), AlignerStage::Matched);
        assert_eq!(results.detections[0].time_seconds, 12.0);
        assert_eq!(results.matches.len(), 1);
        assert_eq!(results.matches[0].time_diff, 0.5);
        assert!(results.matches[0].within_interval);
        assert_eq!(results.stretch_factor(), 1.0);
        assert!(results.stretch.is_none());

        // Disabled stretch leaves bounds untouched
        let gt = &results.ground_truth[0];
        assert_eq!(gt.start_seconds, gt.original_start);
        assert_eq!(gt.end_seconds, gt.original_end);

        let metrics = a.analyze_performance(&results);
        assert_eq!(a.stage(), AlignerStage::Reported);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn test_negative_time_kept() {
        let mut a = aligner(false);
        a.load_detections(vec![point("14:59:50", "flip", None)]);
        a.load_ground_truth(Vec::new());
        a.set_video_start_time("15:00:00").unwrap();

        let results = a.find_temporal_matches().unwrap();
        assert_eq!(results.detections[0].time_seconds, -10.0);
    }

    #[test]
    fn test_stretch_and_rerun_deterministic() {
        let mut a = aligner(true);
        a.load_detections(vec![
            point("15:00:00", "flip", None),
            point("15:01:40", "stir", None),
        ]);
        a.load_ground_truth(vec![
            GroundTruthInterval::new(0.0, 10.0, "flip", "c"),
            GroundTruthInterval::new(40.0, 50.0, "stir", "c"),
        ]);
        a.set_video_start_time("15:00:00").unwrap();

        let first = a.find_temporal_matches().unwrap();
        assert_eq!(first.stretch_factor(), 2.0);
        assert_eq!(first.ground_truth[1].start_seconds, 80.0);
        assert_eq!(first.ground_truth[1].end_seconds, 100.0);
        assert_eq!(first.matches.len(), 2);

        let second = a.find_temporal_matches().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_accepted_only_filter() {
        let mut a = TemporalAligner::new(AlignmentContext {
            accepted_only: true,
            stretch_enabled: false,
            ..AlignmentContext::default()
        });
        a.load_detections(vec![
            point("15:00:05", "flip", Some(false)),
            point("15:00:06", "flip", None),
            point("15:00:07", "flip", Some(true)),
        ]);
        a.load_ground_truth(vec![GroundTruthInterval::new(0.0, 10.0, "flip", "c")]);
        a.set_video_start_time("15:00:00").unwrap();

        let results = a.find_temporal_matches().unwrap();
        assert_eq!(results.total_detections(), 2);
        assert_eq!(results.detections[0].accepted, None);
    }

    #[test]
    fn test_placeholder_time_left_out_of_stretch() {
        let mut a = aligner(true);
        let mut unclocked = point("00:00:00", "flip", Some(false));
        unclocked.time_source = TimeSource::Placeholder;
        a.load_detections(vec![
            unclocked,
            point("15:00:10", "flip", None),
            point("15:01:50", "stir", None),
        ]);
        a.load_ground_truth(vec![
            GroundTruthInterval::new(0.0, 10.0, "flip", "c"),
            GroundTruthInterval::new(90.0, 100.0, "stir", "c"),
        ]);
        a.set_video_start_time("15:00:00").unwrap();

        let results = a.find_temporal_matches().unwrap();
        let plan = results.stretch.unwrap();
        assert_eq!(plan.factor, 1.0);
        assert_eq!(plan.detection_start, 10.0);
        assert_eq!(results.matches.len(), 2);
        assert_eq!(results.false_positives, vec![0]);
    }
}
