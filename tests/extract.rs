//! Extraction Integration Tests
//!
//! Tests for detection extraction across the supported log formats.

use actioneval::domain::{format_clock, normalize_action, LogFormat, TimeSource};
use actioneval::extract::{extract_detections, ExtractOptions, Extractor};

const ADD_FOOD_BLOCK: &str = "\
2025-06-10T15:17:29.800Z INFO camera frame 1842
🎬 ===== MOTION DETECTED ===== 🎬
📊 Similarity: 91.3% (threshold: 80.0%)
⏰ Time: 15:17:30 | Duration: 3.2s
📋 ===== CLAUDE RESPONSE ===== 📋
🎭 Detected Action: Add Food
🎯 Confidence: 85.2%
⏱️  Analysis Duration: 2.1s
📋 ===========================
✅ Action ACCEPTED: Add Food (85.2% ≥ 75.0%)
2025-06-10T15:17:33.100Z INFO camera frame 1843";

fn motion_block(time: &str, action: &str, confidence: &str) -> String {
    format!(
        "🎬 ===== MOTION DETECTED ===== 🎬\n\
         ⏰ Time: {} | Duration: 1.0s\n\
         📋 ===== CLAUDE RESPONSE ===== 📋\n\
         🎭 Detected Action: {}\n\
         🎯 Confidence: {}\n\
         📋 ===========================\n",
        time, action, confidence
    )
}

#[test]
fn test_single_accepted_motion_block() {
    let detections = extract_detections(ADD_FOOD_BLOCK);

    assert_eq!(detections.len(), 1);
    let d = &detections[0];
    assert_eq!(d.action, "Add Food");
    assert_eq!(d.confidence, 85.2);
    assert_eq!(d.accepted, Some(true));
    assert_eq!(format_clock(d.timestamp), "15:17:30");
    assert_eq!(d.format, LogFormat::MotionBlock);
}

#[test]
fn test_single_rejected_line() {
    let detections = extract_detections("❌ Action rejected: Remove Pan (45.1% < 75.0%)");

    assert_eq!(detections.len(), 1);
    let d = &detections[0];
    assert_eq!(d.action, "Remove Pan");
    assert_eq!(d.confidence, 45.1);
    assert_eq!(d.threshold, Some(75.0));
    assert_eq!(d.accepted, Some(false));
    assert_eq!(d.format, LogFormat::InlineDecision);
}

#[test]
fn test_blocks_missing_required_fields_are_dropped() {
    let missing_confidence = motion_block("15:00:00", "Flip", "").replace("🎯 Confidence: \n", "");
    let missing_time = motion_block("15:00:00", "Flip", "70.0%").replace("⏰ Time: 15:00:00 | Duration: 1.0s\n", "");
    let missing_action = motion_block("15:00:00", "Flip", "70.0%").replace("🎭 Detected Action: Flip\n", "");
    let complete = motion_block("15:00:10", "Stir", "66.0%");

    let log = format!("{}{}{}{}", missing_confidence, missing_time, missing_action, complete);
    let detections = extract_detections(&log);

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].action, "Stir");
}

#[test]
fn test_none_action_never_yields() {
    let log = format!(
        "{}{}❌ Action rejected: (none) (12.0% < 75.0%)\n",
        motion_block("15:00:00", "(none)", "40.0%"),
        motion_block("15:00:05", "  (NONE)", "40.0%"),
    );
    assert!(extract_detections(&log).is_empty());
}

#[test]
fn test_unparseable_optional_field_degrades() {
    let log = ADD_FOOD_BLOCK.replace("Similarity: 91.3%", "Similarity: 9.1.3%");
    let detections = extract_detections(&log);

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].similarity, None);
    assert_eq!(detections[0].confidence, 85.2);
}

#[test]
fn test_mixed_formats_in_log_order() {
    let log = format!(
        "{}\n\
         2025-06-10T15:18:00.000Z INFO ❌ Action rejected: Flip (52.0% < 75.0%)\n\
         2025-06-10T15:18:40.000Z INFO 🍳 Burner 2: Remove Lid\n\
         2025-06-10T15:18:40.500Z INFO Confidence: 81.0% Duration: 0.9s\n\
         ==========================================\n\
         ✅ ACTION ACCEPTED: Season\n\
         \x20  Confidence: 90.0% (≥ 75.0% required)\n\
         \x20  Time: 15:19:10\n\
         ==========================================\n",
        ADD_FOOD_BLOCK
    );
    let detections = extract_detections(&log);

    let summary: Vec<(&str, LogFormat, String)> = detections
        .iter()
        .map(|d| (d.action.as_str(), d.format, d.clock()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Add Food", LogFormat::MotionBlock, "15:17:30".to_string()),
            ("Flip", LogFormat::InlineDecision, "15:18:00".to_string()),
            ("Remove Lid", LogFormat::Burner, "15:18:40".to_string()),
            ("Season", LogFormat::InlineDecision, "15:19:10".to_string()),
        ]
    );
    assert_eq!(detections[1].time_source, TimeSource::Logged);
    assert_eq!(detections[2].burner_id, Some(2));
    assert_eq!(detections[3].threshold, Some(75.0));
}

#[test]
fn test_extract_all_collects_sightings() {
    let log = format!(
        "{}\n2025-06-10T15:17:31.004Z INFO Food detected and added to cache: egg (confidence: 0.91)\n",
        ADD_FOOD_BLOCK
    );
    let extraction = Extractor::new(ExtractOptions::default()).extract_all(&log);

    assert_eq!(extraction.detections.len(), 1);
    assert_eq!(extraction.sightings.len(), 1);
    assert_eq!(extraction.sightings[0].label, "egg");
}

#[test]
fn test_independent_runs_share_nothing() {
    let extractor = Extractor::default();
    let first = extractor.extract("❌ Action rejected: Flip (52.0% < 75.0%)");
    let second = extractor.extract("❌ Action rejected: Flip (52.0% < 75.0%)");
    assert_eq!(first, second);
    // No clock leaks from a previous run
    assert_eq!(second[0].time_source, TimeSource::Placeholder);
}

#[test]
fn test_normalization_idempotent_over_extracted_labels() {
    let detections = extract_detections(ADD_FOOD_BLOCK);
    for d in &detections {
        let once = normalize_action(&d.action);
        assert_eq!(once, "add-food");
        assert_eq!(normalize_action(&once), once);
    }
}

#[test]
fn test_timestamp_prefixed_motion_block() {
    let lines = [
        "🎬 ===== MOTION DETECTED ===== 🎬",
        "📊 Similarity: 88.0% (threshold: 80.0%)",
        "⏰ Time: 15:18:10 | Duration: 1.4s",
        "📋 ===== CLAUDE RESPONSE ===== 📋",
        "🎭 Detected Action: Flip",
        "🎯 Confidence: 60.2%",
        "⏱️  Analysis Duration: 1.9s",
        "📋 ===========================",
        "❌ Action REJECTED: Flip (60.2% < 75.0%)",
        "camera frame 1901",
    ];
    let log: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("2025-06-10T15:18:{:02}.000Z INFO classifier {}\n", 10 + i, line))
        .collect();

    let detections = extract_detections(&log);

    assert_eq!(detections.len(), 1);
    let d = &detections[0];
    assert_eq!(d.action, "Flip");
    assert_eq!(d.accepted, Some(false));
    assert_eq!(d.confidence, 60.2);
    assert_eq!(format_clock(d.timestamp), "15:18:10");
    assert_eq!(d.raw_lines.len(), 9);
    assert!(d.raw_lines.iter().all(|l| !l.contains("camera frame")));
}
