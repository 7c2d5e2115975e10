//! Human-readable reports and the JSON report envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::summary::{BatchSummary, ExtractionSummary};
use crate::core::{AlignmentResults, PerformanceMetrics};
use crate::domain::{format_clock, Detection, ObjectSighting};

/// Compute SHA256 hash of bytes, formatted as "sha256:{hex}"
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(result))
}

/// Wraps a JSON report with run provenance.
///
/// Every invocation gets a fresh `run_id`; `log_digest` ties the report to
/// the exact input text.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope<T: Serialize> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_digest: Option<String>,
    pub report: T,
}

impl<T: Serialize> ReportEnvelope<T> {
    pub fn new(report: T, source: Option<&[u8]>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            log_digest: source.map(compute_hash),
            report,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// JSON body of an extraction run
#[derive(Debug, Serialize)]
pub struct ExtractionPayload<'a> {
    pub summary: &'a ExtractionSummary,
    pub detections: &'a [Detection],
    pub sightings: &'a [ObjectSighting],
}

/// JSON body of an alignment run
#[derive(Debug, Serialize)]
pub struct AlignmentPayload<'a> {
    pub metrics: &'a PerformanceMetrics,
    pub results: &'a AlignmentResults,
}

fn pct(x: f64) -> String {
    format!("{:.1}%", x * 100.0)
}

/// Text report for one extraction run
pub struct ExtractionReport<'a> {
    pub summary: &'a ExtractionSummary,
    pub detections: &'a [Detection],
    pub sightings: &'a [ObjectSighting],
}

impl fmt::Display for ExtractionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "Detections: {} ({} accepted, {} rejected)", s.total, s.accepted, s.rejected)?;
        if s.total == 0 {
            return writeln!(f, "No detections found");
        }
        writeln!(f, "Acceptance rate: {:.1}%", s.acceptance_rate())?;

        writeln!(f)?;
        writeln!(f, "{:<8} {:<10} {:<32} {:>8} {:<8}", "#", "TIME", "ACTION", "CONF", "STATUS")?;
        writeln!(f, "{}", "-".repeat(70))?;
        for (i, d) in self.detections.iter().enumerate() {
            let status = match d.accepted {
                Some(true) => "accepted",
                Some(false) => "rejected",
                None => "-",
            };
            writeln!(
                f,
                "{:<8} {:<10} {:<32} {:>7.1}% {:<8}",
                i + 1,
                d.clock(),
                d.action,
                d.confidence,
                status
            )?;
        }

        writeln!(f)?;
        writeln!(f, "By action:")?;
        for (action, c) in &s.by_action {
            writeln!(f, "  {:<30} {:>4} total {:>4} accepted {:>4} rejected", action, c.total, c.accepted, c.rejected)?;
        }

        writeln!(f)?;
        if let Some(c) = s.confidence {
            writeln!(f, "Confidence: avg {:.1}% (range {:.1}% - {:.1}%)", c.mean, c.min, c.max)?;
        }
        let b = s.confidence_buckets;
        writeln!(f, "  high (>=80%): {}  medium (60-80%): {}  low (<60%): {}", b.high, b.medium, b.low)?;
        if let Some(c) = s.similarity {
            writeln!(f, "Similarity: avg {:.1}% (range {:.1}% - {:.1}%)", c.mean, c.min, c.max)?;
        }
        if let Some(c) = s.analysis_duration {
            writeln!(f, "Analysis time: avg {:.1}s (range {:.1}s - {:.1}s), {} slow (>5s)", c.mean, c.min, c.max, s.slow_analyses)?;
        }
        if let (Some(first), Some(last)) = (&s.first, &s.last) {
            writeln!(f, "First detection: {}", first)?;
            writeln!(f, "Last detection: {}", last)?;
        }

        if !self.sightings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Object sightings: {}", self.sightings.len())?;
            for sighting in self.sightings {
                match sighting.confidence {
                    Some(c) => writeln!(f, "  {} {} ({:.2})", format_clock(sighting.timestamp), sighting.label, c)?,
                    None => writeln!(f, "  {} {}", format_clock(sighting.timestamp), sighting.label)?,
                }
            }
        }
        Ok(())
    }
}

/// Text report for one alignment run
pub struct AlignmentReport<'a> {
    pub results: &'a AlignmentResults,
    pub metrics: &'a PerformanceMetrics,
}

impl AlignmentReport<'_> {
    fn write_matches(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.results;
        writeln!(f, "Matches:")?;
        if r.matches.is_empty() {
            return writeln!(f, "  (none)");
        }
        writeln!(
            f,
            "  {:<10} {:>8} {:<24} {:<16} {:>9} {:>9} {:>7} {:<6}",
            "TIME", "SECONDS", "DETECTION", "GROUND TRUTH", "ORIG MID", "MID", "DIFF", "INSIDE"
        )?;
        for m in &r.matches {
            let (Some(det), Some(gt)) = (r.detections.get(m.detection_index), r.ground_truth.get(m.ground_truth_index)) else {
                continue;
            };
            writeln!(
                f,
                "  {:<10} {:>8.1} {:<24} {:<16} {:>9.1} {:>9.1} {:>6.1}s {:<6}",
                det.clock(),
                det.time_seconds,
                det.action,
                gt.action,
                m.original_center,
                m.stretched_center,
                m.time_diff,
                if m.within_interval { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for AlignmentReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.results;
        let m = self.metrics;

        writeln!(f, "Temporal Alignment Report")?;
        writeln!(f, "{}", "=".repeat(60))?;
        if let Some(start) = r.context.video_start_time {
            writeln!(f, "Video start time: {}", format_clock(start))?;
        }
        writeln!(f, "Tolerance: {:.1}s", r.context.tolerance_seconds)?;
        match &r.stretch {
            Some(plan) => writeln!(
                f,
                "Stretch factor: {:.3} (detections {:.1}s over ground truth {:.1}s)",
                plan.factor,
                plan.detection_span(),
                plan.gt_span()
            )?,
            None if r.context.stretch_enabled => writeln!(f, "Stretch factor: 1.000 (nothing to stretch)")?,
            None => writeln!(f, "Stretch factor: 1.000 (disabled)")?,
        }
        if r.context.accepted_only {
            writeln!(f, "Scoring accepted detections only")?;
        }

        writeln!(f)?;
        writeln!(f, "Detections: {}", m.total_detections)?;
        writeln!(f, "Ground truth: {}", m.total_ground_truth)?;
        writeln!(f, "Matches: {}", m.matches)?;
        writeln!(f, "False positives: {}", m.false_positives)?;
        writeln!(f, "Missed: {}", m.missed)?;
        writeln!(f)?;
        writeln!(f, "Precision: {}", pct(m.precision))?;
        writeln!(f, "Recall: {}", pct(m.recall))?;
        writeln!(f, "F1: {:.3}", m.f1)?;

        if let Some(t) = &m.temporal {
            writeln!(f)?;
            writeln!(f, "Timing error: mean {:.2}s, median {:.2}s, max {:.2}s", t.mean_time_diff, t.median_time_diff, t.max_time_diff)?;
            writeln!(f, "Inside interval: {}/{} ({})", t.within_interval, m.matches, pct(t.within_interval_rate))?;
        }

        if !m.per_action.is_empty() {
            writeln!(f)?;
            writeln!(f, "  {:<24} {:>6} {:>6} {:>8} {:>8}", "ACTION", "GT", "DET", "MATCHED", "RECALL")?;
            for (action, b) in &m.per_action {
                writeln!(f, "  {:<24} {:>6} {:>6} {:>8} {:>8}", action, b.ground_truth, b.detections, b.matched, pct(b.recall()))?;
            }
        }

        writeln!(f)?;
        self.write_matches(f)?;

        if !r.false_positives.is_empty() {
            writeln!(f)?;
            writeln!(f, "False positives:")?;
            for det in r.false_positives.iter().filter_map(|&i| r.detections.get(i)) {
                if det.has_clock() {
                    writeln!(f, "  {} ({:.1}s) {}", det.clock(), det.time_seconds, det.action)?;
                } else {
                    writeln!(f, "  --:--:-- (no clock) {}", det.action)?;
                }
            }
        }

        if !r.missed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Missed ground truth:")?;
            for gt in r.missed.iter().filter_map(|&i| r.ground_truth.get(i)) {
                writeln!(
                    f,
                    "  {:.1}s - {:.1}s {} (stretched {:.1}s - {:.1}s)",
                    gt.original_start, gt.original_end, gt.action, gt.start_seconds, gt.end_seconds
                )?;
            }
        }
        Ok(())
    }
}

/// Text report for a batch of extractions
pub struct BatchReport<'a>(pub &'a BatchSummary);

impl fmt::Display for BatchReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batch = self.0;
        writeln!(f, "{:<40} {:>6} {:>9} {:>9} {:>8}", "LOG", "TOTAL", "ACCEPTED", "REJECTED", "AVG CONF")?;
        writeln!(f, "{}", "-".repeat(76))?;
        for run in &batch.runs {
            let avg = run
                .summary
                .confidence
                .map(|c| format!("{:.1}%", c.mean))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<40} {:>6} {:>9} {:>9} {:>8}",
                run.source, run.summary.total, run.summary.accepted, run.summary.rejected, avg
            )?;
        }
        for failure in &batch.failures {
            writeln!(f, "{:<40} failed: {}", failure.source, failure.error)?;
        }

        let t = batch.totals();
        writeln!(f)?;
        writeln!(f, "Logs processed: {}/{}", t.successful, t.runs)?;
        writeln!(f, "Total detections: {}", t.total_detections)?;
        writeln!(f, "Accepted: {}", t.total_accepted)?;
        writeln!(f, "Rejected: {}", t.total_rejected)?;
        writeln!(f, "Detections per log: {:.1}", t.avg_detections_per_run)?;
        writeln!(f, "Overall acceptance rate: {:.1}%", t.overall_acceptance_rate)?;
        if let Some(v) = t.avg_confidence {
            writeln!(f, "Average confidence: {:.1}%", v)?;
        }
        if let Some(v) = t.avg_similarity {
            writeln!(f, "Average similarity: {:.1}%", v)?;
        }
        if let Some(v) = t.avg_analysis_time {
            writeln!(f, "Average analysis time: {:.1}s", v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlignmentContext, TemporalAligner};
    use crate::domain::GroundTruthInterval;

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            compute_hash(b"hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_envelope_fresh_ids() {
        let a = ReportEnvelope::new(1u8, Some(b"log".as_slice()));
        let b = ReportEnvelope::new(1u8, Some(b"log".as_slice()));
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.log_digest, b.log_digest);

        let json: serde_json::Value = serde_json::from_str(&a.to_json().unwrap()).unwrap();
        assert_eq!(json["report"], 1);
        assert!(json["log_digest"].as_str().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn test_alignment_report_sections() {
        let mut aligner = TemporalAligner::new(AlignmentContext {
            stretch_enabled: false,
            ..AlignmentContext::default()
        });
        aligner.load_detections(vec![
            crate::core::DetectionPoint {
                timestamp: crate::domain::parse_clock("10:00:12").unwrap(),
                action: "Add Food".to_string(),
                accepted: Some(true),
                time_source: crate::domain::TimeSource::Logged,
            },
            crate::core::DetectionPoint {
                timestamp: crate::domain::parse_clock("10:05:00").unwrap(),
                action: "Flip".to_string(),
                accepted: None,
                time_source: crate::domain::TimeSource::Logged,
            },
        ]);
        aligner.load_ground_truth(vec![
            GroundTruthInterval::new(10.0, 15.0, "add-food", "food"),
            GroundTruthInterval::new(100.0, 110.0, "stir", "cooking"),
        ]);
        aligner.set_video_start_time("10:00:00").unwrap();
        let results = aligner.find_temporal_matches().unwrap();
        let metrics = aligner.analyze_performance(&results);

        let text = AlignmentReport {
            results: &results,
            metrics: &metrics,
        }
        .to_string();
        assert!(text.contains("Stretch factor: 1.000 (disabled)"));
        assert!(text.contains("Precision: 50.0%"));
        assert!(text.contains("Recall: 50.0%"));
        assert!(text.contains("False positives:\n  10:05:00 (300.0s) Flip"));
        assert!(text.contains("Missed ground truth:\n  100.0s - 110.0s stir"));
    }
}
