//! Object-detection side events.
//!
//! The vision pipeline logs `... added to cache: <label> (confidence: 0.91)`
//! whenever it caches a recognised object. These are reported alongside the
//! action detections but never aligned against ground truth.

use chrono::{DateTime, NaiveTime, Utc};

use super::patterns::Patterns;
use crate::domain::{parse_clock, ObjectSighting};

/// Collect every object sighting in the log, in log order.
pub fn extract_sightings(patterns: &Patterns, log_text: &str) -> Vec<ObjectSighting> {
    log_text
        .lines()
        .filter_map(|line| parse_sighting(patterns, line))
        .collect()
}

fn parse_sighting(patterns: &Patterns, line: &str) -> Option<ObjectSighting> {
    let (stamp, label, confidence) = patterns.sighting(line)?;
    let confidence = confidence.trim().parse::<f64>().ok();
    let label = label.trim().to_string();

    match DateTime::parse_from_rfc3339(stamp) {
        Ok(at) => Some(ObjectSighting::at(at.with_timezone(&Utc), label, confidence)),
        Err(_) => {
            // Out-of-range calendar fields; keep the clock portion if it reads.
            let timestamp = clock_portion(stamp)?;
            Some(ObjectSighting {
                observed_at: None,
                timestamp,
                label,
                confidence,
            })
        }
    }
}

fn clock_portion(stamp: &str) -> Option<NaiveTime> {
    let (_, rest) = stamp.split_once('T')?;
    parse_clock(rest.get(..8)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format_clock;

    #[test]
    fn test_extract_sightings() {
        let log = "\
2025-06-10T15:17:31.004Z INFO Food detected and added to cache: egg (confidence: 0.91)
2025-06-10T15:17:32.000Z INFO unrelated
2025-06-10T15:17:40.500Z INFO Food detected and added to cache: bell pepper (confidence: 0.78)";
        let s = extract_sightings(&Patterns::new(), log);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].label, "egg");
        assert_eq!(s[0].confidence, Some(0.91));
        assert_eq!(format_clock(s[0].timestamp), "15:17:31");
        assert!(s[0].observed_at.is_some());
        assert_eq!(s[1].label, "bell pepper");
    }

    #[test]
    fn test_bad_confidence_degrades() {
        let log = "2025-06-10T15:17:31.004Z Food detected and added to cache: egg (confidence: high)";
        let s = extract_sightings(&Patterns::new(), log);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].confidence, None);
    }

    #[test]
    fn test_invalid_date_keeps_clock() {
        let log = "2025-13-40T09:05:00.000Z Food detected and added to cache: egg (confidence: 0.5)";
        let s = extract_sightings(&Patterns::new(), log);
        assert_eq!(s.len(), 1);
        assert!(s[0].observed_at.is_none());
        assert_eq!(format_clock(s[0].timestamp), "09:05:00");
    }
}
