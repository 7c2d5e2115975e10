//! Timeline Integration Tests
//!
//! Tests for exporting an extraction run and aligning from the export.

use actioneval::core::{AlignmentContext, DetectionPoint, TemporalAligner};
use actioneval::domain::{Detection, GroundTruthInterval};
use actioneval::extract::extract_detections;
use actioneval::report::{read_timeline, timeline_path_for, write_timeline, TimelineEntry};
use tempfile::TempDir;

const LOG: &str = "\
🎬 ===== MOTION DETECTED ===== 🎬
⏰ Time: 15:00:04 | Duration: 2.0s
📋 ===== CLAUDE RESPONSE ===== 📋
🎭 Detected Action: Add Pan
🎯 Confidence: 90.0%
📋 ===========================
✅ Action ACCEPTED: Add Pan (90.0% ≥ 75.0%)
🎬 ===== MOTION DETECTED ===== 🎬
⏰ Time: 15:00:21 | Duration: 2.0s
📋 ===== CLAUDE RESPONSE ===== 📋
🎭 Detected Action: Add Food
🎯 Confidence: 55.0%
📋 ===========================
❌ Action REJECTED: Add Food (55.0% < 75.0%)
🎬 ===== MOTION DETECTED ===== 🎬
⏰ Time: 15:00:42 | Duration: 2.0s
📋 ===== CLAUDE RESPONSE ===== 📋
🎭 Detected Action: Stir
🎯 Confidence: 81.0%
📋 ===========================
✅ Action ACCEPTED: Stir (81.0% ≥ 75.0%)
";

fn ground_truth() -> Vec<GroundTruthInterval> {
    vec![
        GroundTruthInterval::new(2.0, 6.0, "add-pan", "pan"),
        GroundTruthInterval::new(18.0, 24.0, "add-food", "food"),
        GroundTruthInterval::new(40.0, 45.0, "stir", "food"),
    ]
}

fn align<I, T>(points: I, context: AlignmentContext) -> (usize, Vec<usize>, Vec<usize>, f64)
where
    I: IntoIterator<Item = T>,
    T: Into<DetectionPoint>,
{
    let mut aligner = TemporalAligner::new(context);
    aligner.load_detections(points);
    aligner.load_ground_truth(ground_truth());
    aligner.set_video_start_time("15:00:00").unwrap();
    let results = aligner.find_temporal_matches().unwrap();
    let metrics = aligner.analyze_performance(&results);
    (
        results.matches.len(),
        results.false_positives,
        results.missed,
        metrics.f1,
    )
}

fn export_and_reload(detections: &[Detection]) -> (TempDir, Vec<TimelineEntry>) {
    let dir = TempDir::new().unwrap();
    let path = timeline_path_for(&dir.path().join("server.log"));
    write_timeline(&path, detections).unwrap();
    assert!(path.ends_with("server_timeline.log"));
    let entries = read_timeline(&path).unwrap();
    (dir, entries)
}

#[test]
fn test_export_preserves_order_and_status() {
    let detections = extract_detections(LOG);
    assert_eq!(detections.len(), 3);

    let (_dir, entries) = export_and_reload(&detections);
    assert_eq!(entries.len(), 3);
    for (entry, det) in entries.iter().zip(&detections) {
        assert_eq!(entry.timestamp, det.timestamp);
        assert_eq!(entry.action, det.action);
        assert_eq!(entry.accepted, det.accepted);
    }
    assert_eq!(entries[1].accepted, Some(false));
}

#[test]
fn test_alignment_from_export_matches_direct_alignment() {
    let context = AlignmentContext {
        stretch_enabled: false,
        ..AlignmentContext::default()
    };
    let detections = extract_detections(LOG);
    let direct = align(&detections, context.clone());

    let (_dir, entries) = export_and_reload(&detections);
    let reloaded = align(&entries, context);

    assert_eq!(direct, reloaded);
    assert_eq!(direct.0, 3);
    assert_eq!(direct.3, 1.0);
}

#[test]
fn test_accepted_only_uses_exported_status() {
    let context = AlignmentContext {
        stretch_enabled: false,
        accepted_only: true,
        ..AlignmentContext::default()
    };
    let detections = extract_detections(LOG);
    let (_dir, entries) = export_and_reload(&detections);

    let (matches, false_positives, missed, _) = align(&entries, context);
    assert_eq!(matches, 2);
    assert!(false_positives.is_empty());
    assert_eq!(missed, vec![1]);
}
