//! Marker and field patterns for the classifier log formats.
//!
//! Patterns are compiled into a [`Patterns`] value owned by each extraction
//! run rather than a global, so independent runs share nothing.

use chrono::NaiveTime;
use regex::Regex;

use crate::domain::parse_clock;

/// Parsed inline `(<confidence>% <op> <threshold>%)` expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlineScore {
    pub confidence: Option<f64>,
    pub threshold: Option<f64>,
}

/// Accept/reject line (`✅ ACTION ACCEPTED: Add Food (85.0% ≥ 75.0%)`)
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub accepted: bool,
    pub action: String,
    pub inline: Option<InlineScore>,
}

/// Outcome of a marker found right after a motion block closes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { threshold: Option<f64> },
    Rejected { threshold: Option<f64> },
    NoAction,
}

/// Per-burner action line (`2025-06-10T15:17:30.123Z ... 🍳 Burner 2: Flip`)
#[derive(Debug, Clone, PartialEq)]
pub struct BurnerLine {
    pub burner_id: Option<u32>,
    pub action: String,
    pub clock: Option<NaiveTime>,
}

/// Compiled pattern set
#[derive(Debug, Clone)]
pub struct Patterns {
    motion_start: Regex,
    response_start: Regex,
    block_close: Regex,
    similarity: Regex,
    time_with_duration: Regex,
    detected_action: Regex,
    confidence: Regex,
    required_threshold: Regex,
    analysis_duration: Regex,
    decision: Regex,
    inline_score: Regex,
    no_action: Regex,
    burner: Regex,
    burner_confidence: Regex,
    iso_clock: Regex,
    sighting: Regex,
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a literal pattern. The pattern set is fixed at build time and
/// covered by tests, so a failure here is a programming error.
pub(crate) fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {:?}: {}", pattern, e))
}

fn number(s: Option<regex::Match<'_>>) -> Option<f64> {
    s.and_then(|m| m.as_str().parse::<f64>().ok())
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            motion_start: re(r"(?i)=====\s*MOTION DETECTED\s*====="),
            response_start: re(r"(?i)=====\s*(?:\w+\s+)?RESPONSE\s*====="),
            block_close: re(r"={20,}\s*$"),
            similarity: re(r"(?i)Similarity:\s*([\d.]+)%"),
            time_with_duration: re(r"(?i)\bTime:\s*(\d{2}:\d{2}:\d{2})(?:.*?Duration:\s*([\d.]+)s)?"),
            detected_action: re(r#"(?i)Detected Action:\s*([^{"\s]+(?:[ \t]+[^{"\s]+)*)"#),
            confidence: re(r"(?i)\bConfidence:\s*([\d.]+)%"),
            required_threshold: re(r"\(\s*(?:≥|>=|<|≤|<=|>)\s*([\d.]+)%"),
            analysis_duration: re(r"(?i)Analysis Duration:\s*([\d.]+)s"),
            decision: re(r"(?i)\baction\s+(accepted|rejected)\s*:\s*(.*)$"),
            inline_score: re(r"\(\s*([\d.]+)%\s*(?:≥|>=|<=|≤|>|<)\s*([\d.]+)%[^)]*\)"),
            no_action: re(r"(?i)no action detected"),
            burner: re(r"(?i)Burner\s+(\d+):\s*([^{]+)"),
            burner_confidence: re(r"(?i)Confidence:\s*([\d.]+)%(?:.*?Duration:\s*([\d.]+)s)?"),
            iso_clock: re(r"\d{4}-\d{2}-\d{2}[T ](\d{2}:\d{2}:\d{2})"),
            sighting: re(
                r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z).*?added to cache:\s*(.+?)\s*\(confidence:\s*([^)]*)\)",
            ),
        }
    }

    pub fn is_motion_start(&self, line: &str) -> bool {
        self.motion_start.is_match(line)
    }

    pub fn is_response_start(&self, line: &str) -> bool {
        !self.is_motion_start(line) && self.response_start.is_match(line)
    }

    pub fn is_block_close(&self, line: &str) -> bool {
        self.block_close.is_match(line)
    }

    pub fn similarity(&self, line: &str) -> Option<f64> {
        self.similarity.captures(line).and_then(|c| number(c.get(1)))
    }

    /// `Time: HH:MM:SS` with an optional trailing `Duration: <x>s`.
    ///
    /// Returns `None` when no valid clock is present; the duration is
    /// independently optional.
    pub fn time_and_duration(&self, line: &str) -> Option<(NaiveTime, Option<f64>)> {
        let caps = self.time_with_duration.captures(line)?;
        let clock = parse_clock(caps.get(1)?.as_str())?;
        Some((clock, number(caps.get(2))))
    }

    pub fn detected_action(&self, line: &str) -> Option<String> {
        self.detected_action
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// `Confidence: <x>%` as (confidence, threshold). Either part may be absent.
    pub fn confidence(&self, line: &str) -> Option<(Option<f64>, Option<f64>)> {
        let caps = self.confidence.captures(line)?;
        let value = number(caps.get(1));
        let threshold = self
            .required_threshold
            .captures(&line[caps.get(0).map_or(0, |m| m.end())..])
            .and_then(|c| number(c.get(1)));
        Some((value, threshold))
    }

    pub fn analysis_duration(&self, line: &str) -> Option<Option<f64>> {
        self.analysis_duration
            .captures(line)
            .map(|c| number(c.get(1)))
    }

    fn inline_score(&self, text: &str) -> Option<(usize, InlineScore)> {
        let caps = self.inline_score.captures(text)?;
        let start = caps.get(0)?.start();
        Some((
            start,
            InlineScore {
                confidence: number(caps.get(1)),
                threshold: number(caps.get(2)),
            },
        ))
    }

    /// Parse an accept/reject line.
    pub fn decision(&self, line: &str) -> Option<Decision> {
        let caps = self.decision.captures(line)?;
        let accepted = caps.get(1)?.as_str().eq_ignore_ascii_case("accepted");
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let (action, inline) = match self.inline_score(rest) {
            Some((start, score)) => (&rest[..start], Some(score)),
            None => (rest, None),
        };

        Some(Decision {
            accepted,
            action: action.trim().to_string(),
            inline,
        })
    }

    /// Acceptance marker following a closed motion block
    pub fn verdict(&self, line: &str) -> Option<Verdict> {
        if let Some(decision) = self.decision(line) {
            let threshold = decision.inline.and_then(|s| s.threshold);
            return Some(if decision.accepted {
                Verdict::Accepted { threshold }
            } else {
                Verdict::Rejected { threshold }
            });
        }
        if self.no_action.is_match(line) {
            return Some(Verdict::NoAction);
        }
        None
    }

    pub fn burner(&self, line: &str) -> Option<BurnerLine> {
        let caps = self.burner.captures(line)?;
        Some(BurnerLine {
            burner_id: caps.get(1).and_then(|m| m.as_str().parse().ok()),
            action: caps.get(2)?.as_str().trim().to_string(),
            clock: self.leading_clock(line),
        })
    }

    /// Confidence line that follows a burner line, as (confidence, duration)
    pub fn burner_confidence(&self, line: &str) -> Option<(Option<f64>, Option<f64>)> {
        let caps = self.burner_confidence.captures(line)?;
        Some((number(caps.get(1)), number(caps.get(2))))
    }

    /// Clock of an ISO-8601 style timestamp anywhere in the line
    pub fn leading_clock(&self, line: &str) -> Option<NaiveTime> {
        self.iso_clock
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_clock(m.as_str()))
    }

    /// Raw parts of an object sighting line: (iso timestamp, label, confidence text)
    pub fn sighting<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
        let caps = self.sighting.captures(line)?;
        Some((
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_markers() {
        let p = Patterns::new();
        assert!(p.is_motion_start("🎬 ===== MOTION DETECTED ===== 🎬"));
        assert!(p.is_motion_start("INFO ===== motion detected ====="));
        assert!(p.is_response_start("📋 ===== CLAUDE RESPONSE ===== 📋"));
        assert!(!p.is_response_start("🎬 ===== MOTION DETECTED ===== 🎬"));
        assert!(p.is_block_close("📋 ==========================="));
        assert!(p.is_block_close("=========================================="));
        assert!(p.is_block_close(
            "2025-06-10T15:17:32.010Z INFO classifier 📋 ==========================="
        ));
        assert!(!p.is_block_close("📋 ===== CLAUDE RESPONSE ===== 📋"));
    }

    #[test]
    fn test_time_and_duration() {
        let p = Patterns::new();
        let (t, d) = p.time_and_duration("⏰ Time: 15:17:30 | Duration: 3.2s").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(15, 17, 30).unwrap());
        assert_eq!(d, Some(3.2));

        let (_, d) = p.time_and_duration("   Time: 15:18:45").unwrap();
        assert_eq!(d, None);

        // Unparseable duration degrades to absent
        let (_, d) = p.time_and_duration("⏰ Time: 15:17:30 Duration: 1.2.3s").unwrap();
        assert_eq!(d, None);

        assert!(p.time_and_duration("⏱️  Analysis Duration: 2.1s").is_none());
    }

    #[test]
    fn test_detected_action_stops_at_json() {
        let p = Patterns::new();
        assert_eq!(
            p.detected_action("🎭 Detected Action: Add Food  ").as_deref(),
            Some("Add Food")
        );
        assert_eq!(
            p.detected_action(r#"🎭 Detected Action: Flip {"raw": "flip"}"#).as_deref(),
            Some("Flip")
        );
        assert_eq!(
            p.detected_action("🎭 Detected Action: (none)").as_deref(),
            Some("(none)")
        );
    }

    #[test]
    fn test_confidence_with_threshold() {
        let p = Patterns::new();
        assert_eq!(p.confidence("🎯 Confidence: 85.2%"), Some((Some(85.2), None)));
        assert_eq!(
            p.confidence("   Confidence: 92.5% (≥ 75.0% required)"),
            Some((Some(92.5), Some(75.0)))
        );
        assert_eq!(p.confidence("Confidence: ..%"), Some((None, None)));
        assert_eq!(p.confidence("no score here"), None);
    }

    #[test]
    fn test_decision_inline() {
        let p = Patterns::new();

        let d = p.decision("❌ Action rejected: Remove Pan (45.1% < 75.0%)").unwrap();
        assert!(!d.accepted);
        assert_eq!(d.action, "Remove Pan");
        let inline = d.inline.unwrap();
        assert_eq!(inline.confidence, Some(45.1));
        assert_eq!(inline.threshold, Some(75.0));

        let d = p.decision("✅ ACTION ACCEPTED: Add Food (85.0% ≥ 75.0%)").unwrap();
        assert!(d.accepted);
        assert_eq!(d.action, "Add Food");
        assert_eq!(d.inline.unwrap().threshold, Some(75.0));
    }

    #[test]
    fn test_decision_without_inline() {
        let p = Patterns::new();
        let d = p.decision("✅ action accepted: Remove Lid").unwrap();
        assert!(d.accepted);
        assert_eq!(d.action, "Remove Lid");
        assert!(d.inline.is_none());

        // The sentinel survives untouched so the scanner can drop it
        let d = p.decision("✅ Action ACCEPTED: (none)").unwrap();
        assert_eq!(d.action, "(none)");
    }

    #[test]
    fn test_verdicts() {
        let p = Patterns::new();
        assert_eq!(
            p.verdict("✅ Action ACCEPTED: Add Food"),
            Some(Verdict::Accepted { threshold: None })
        );
        assert_eq!(
            p.verdict("❌ Action REJECTED: Flip (60.2% < 75.0%)"),
            Some(Verdict::Rejected { threshold: Some(75.0) })
        );
        assert_eq!(p.verdict("❌ No action detected"), Some(Verdict::NoAction));
        assert_eq!(p.verdict("some other line"), None);
    }

    #[test]
    fn test_burner_line() {
        let p = Patterns::new();
        let b = p
            .burner("2025-06-10T15:17:30.123Z INFO 🍳 Burner 2: Add Food {\"x\":1}")
            .unwrap();
        assert_eq!(b.burner_id, Some(2));
        assert_eq!(b.action, "Add Food");
        assert_eq!(b.clock, NaiveTime::from_hms_opt(15, 17, 30));

        assert_eq!(
            p.burner_confidence("📊 Confidence: 88.0% | Duration: 2.5s"),
            Some((Some(88.0), Some(2.5)))
        );
    }

    #[test]
    fn test_sighting_parts() {
        let p = Patterns::new();
        let line = "2025-06-10T15:17:31.004Z INFO Food detected and added to cache: scrambled egg (confidence: 0.91)";
        assert_eq!(
            p.sighting(line),
            Some(("2025-06-10T15:17:31.004Z", "scrambled egg", "0.91"))
        );
    }
}
