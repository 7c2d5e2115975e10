//! Extraction statistics and cross-run aggregation.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{format_clock, Detection};

/// Confidence at or above this is "high"
pub const HIGH_CONFIDENCE: f64 = 80.0;
/// Confidence at or above this (and below high) is "medium"
pub const MEDIUM_CONFIDENCE: f64 = 60.0;
/// Analyses slower than this many seconds are flagged
pub const SLOW_ANALYSIS_SECONDS: f64 = 5.0;

/// Mean and range of one numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ValueStats {
    /// `None` for an empty sample.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Accept/reject tally for one action label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Detections per confidence band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    /// >= 80%
    pub high: usize,
    /// 60% to 80%
    pub medium: usize,
    /// < 60%
    pub low: usize,
}

/// A detection named by clock and action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineMark {
    pub timestamp: NaiveTime,
    pub action: String,
}

impl std::fmt::Display for TimelineMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", format_clock(self.timestamp), self.action)
    }
}

/// Statistics over one extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Keyed by the action as written in the log, sorted
    pub by_action: BTreeMap<String, ActionCounts>,
    pub confidence: Option<ValueStats>,
    pub confidence_buckets: ConfidenceBuckets,
    pub similarity: Option<ValueStats>,
    pub analysis_duration: Option<ValueStats>,
    pub slow_analyses: usize,
    pub first: Option<TimelineMark>,
    pub last: Option<TimelineMark>,
}

impl ExtractionSummary {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut summary = Self {
            total: detections.len(),
            ..Self::default()
        };

        for d in detections {
            let counts = summary.by_action.entry(d.action.clone()).or_default();
            counts.total += 1;
            if d.is_accepted() {
                counts.accepted += 1;
                summary.accepted += 1;
            } else {
                counts.rejected += 1;
                summary.rejected += 1;
            }

            if d.confidence >= HIGH_CONFIDENCE {
                summary.confidence_buckets.high += 1;
            } else if d.confidence >= MEDIUM_CONFIDENCE {
                summary.confidence_buckets.medium += 1;
            } else {
                summary.confidence_buckets.low += 1;
            }

            if d.analysis_duration.is_some_and(|s| s > SLOW_ANALYSIS_SECONDS) {
                summary.slow_analyses += 1;
            }
        }

        summary.confidence = ValueStats::from_values(detections.iter().map(|d| d.confidence));
        summary.similarity = ValueStats::from_values(detections.iter().filter_map(|d| d.similarity));
        summary.analysis_duration =
            ValueStats::from_values(detections.iter().filter_map(|d| d.analysis_duration));

        let mark = |d: &Detection| TimelineMark {
            timestamp: d.timestamp,
            action: d.action.clone(),
        };
        summary.first = detections.first().map(mark);
        summary.last = detections.last().map(mark);

        summary
    }

    /// Accepted share in percent; 0 for an empty run
    pub fn acceptance_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.accepted as f64 / self.total as f64 * 100.0
        }
    }
}

/// One extracted log inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub source: String,
    pub summary: ExtractionSummary,
}

/// A log the batch could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub source: String,
    pub error: String,
}

/// Aggregate over all successful runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub runs: usize,
    pub successful: usize,
    pub total_detections: usize,
    pub total_accepted: usize,
    pub total_rejected: usize,
    pub avg_detections_per_run: f64,
    /// Percent across all detections
    pub overall_acceptance_rate: f64,
    /// Means of per-run averages; runs without the field are skipped
    pub avg_confidence: Option<f64>,
    pub avg_similarity: Option<f64>,
    pub avg_analysis_time: Option<f64>,
}

/// Results of extracting several logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: Vec<BatchRun>,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn push(&mut self, source: impl Into<String>, summary: ExtractionSummary) {
        self.runs.push(BatchRun {
            source: source.into(),
            summary,
        });
    }

    pub fn push_failure(&mut self, source: impl Into<String>, error: impl ToString) {
        self.failures.push(BatchFailure {
            source: source.into(),
            error: error.to_string(),
        });
    }

    pub fn totals(&self) -> BatchTotals {
        let successful = self.runs.len();
        let total_detections: usize = self.runs.iter().map(|r| r.summary.total).sum();
        let total_accepted: usize = self.runs.iter().map(|r| r.summary.accepted).sum();
        let total_rejected: usize = self.runs.iter().map(|r| r.summary.rejected).sum();

        let mean_of = |pick: fn(&ExtractionSummary) -> Option<ValueStats>| {
            ValueStats::from_values(self.runs.iter().filter_map(|r| pick(&r.summary)).map(|s| s.mean))
                .map(|s| s.mean)
        };

        BatchTotals {
            runs: successful + self.failures.len(),
            successful,
            total_detections,
            total_accepted,
            total_rejected,
            avg_detections_per_run: if successful == 0 {
                0.0
            } else {
                total_detections as f64 / successful as f64
            },
            overall_acceptance_rate: if total_detections == 0 {
                0.0
            } else {
                total_accepted as f64 / total_detections as f64 * 100.0
            },
            avg_confidence: mean_of(|s| s.confidence),
            avg_similarity: mean_of(|s| s.similarity),
            avg_analysis_time: mean_of(|s| s.analysis_duration),
        }
    }
}
