//! Detection records produced by the log extractor.
//!
//! A detection is one classifier decision recovered from the server log:
//! when it happened (wall clock), which action was named, how confident the
//! model was, and whether the decision pipeline accepted it.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock format used by log lines and the video start time.
pub const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Sentinel action emitted by the classifier when nothing was recognised.
pub const NONE_ACTION: &str = "(none)";

/// Parse an `HH:MM:SS` wall-clock string.
///
/// Sub-second precision is not supported; anything other than exactly
/// three colon-separated fields yields `None`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), CLOCK_FORMAT).ok()
}

/// Format a clock time as `HH:MM:SS`.
pub fn format_clock(t: NaiveTime) -> String {
    t.format(CLOCK_FORMAT).to_string()
}

/// Where a detection's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// Read from a `Time:` field or timestamp prefix belonging to the record
    Logged,
    /// Carried over from the most recent clock seen earlier in the log
    Carried,
    /// No clock seen anywhere before the record; midnight stands in
    Placeholder,
}

/// Wire format a detection was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Motion block + model response block + acceptance marker
    MotionBlock,
    /// Single accept/reject line, optionally with an inline threshold
    InlineDecision,
    /// Per-burner action line with a trailing confidence line
    Burner,
}

/// A structured record derived from one classifier log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Wall-clock time of day (seconds resolution)
    pub timestamp: NaiveTime,

    /// Provenance of `timestamp`
    pub time_source: TimeSource,

    /// Action label as written in the log, whitespace-trimmed
    pub action: String,

    /// Model confidence percentage
    pub confidence: f64,

    /// Acceptance threshold percentage, when the log printed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// Motion similarity percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,

    /// Motion segment duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Model analysis wall time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_duration: Option<f64>,

    /// Upstream decision. `None` means the log carried no decision marker;
    /// see [`Detection::is_accepted`] for how that is scored.
    pub accepted: Option<bool>,

    /// Burner index for the legacy per-burner format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burner_id: Option<u32>,

    /// Which wire format produced this record
    pub format: LogFormat,

    /// Verbatim source lines, for audit and export only
    #[serde(default)]
    pub raw_lines: Vec<String>,
}

impl Detection {
    /// Interpret the upstream decision: an absent marker counts as accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted.unwrap_or(true)
    }

    /// `HH:MM:SS` form of the timestamp
    pub fn clock(&self) -> String {
        format_clock(self.timestamp)
    }
}

/// Returns true when `action` is the classifier's "nothing recognised" sentinel.
pub fn is_none_action(action: &str) -> bool {
    action.trim().eq_ignore_ascii_case(NONE_ACTION)
}

/// Object-detection side event ("... added to cache: <label> (confidence: x)")
///
/// These never take part in temporal alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSighting {
    /// Full UTC instant from the log line, when it parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,

    /// Time of day of the sighting
    pub timestamp: NaiveTime,

    /// Object label
    pub label: String,

    /// Detector confidence (0..1 as printed by the detector)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ObjectSighting {
    /// Build from a UTC instant, truncating to whole seconds of the day.
    pub fn at(observed_at: DateTime<Utc>, label: String, confidence: Option<f64>) -> Self {
        let t = observed_at.time();
        let timestamp = t.with_nanosecond(0).unwrap_or(t);
        Self {
            observed_at: Some(observed_at),
            timestamp,
            label,
            confidence,
        }
    }
}
