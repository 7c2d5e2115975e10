//! Normalized timeline export.
//!
//! The export is the durable record of one extraction run: a header, one
//! block per detection with its status and verbatim source lines, and a
//! summary. The aligner reads detections back from the
//! `# Detection N - HH:MM:SS - <action>` headers, so that line shape and
//! the `# Status:` line that follows it must not change. A detection whose
//! clock is only a placeholder carries an extra `# Time: placeholder` line.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::summary::ExtractionSummary;
use crate::core::DetectionPoint;
use crate::domain::{format_clock, parse_clock, Detection, TimeSource};
use crate::extract::patterns::re;

const RULE_WIDTH: usize = 80;
const SEPARATOR_WIDTH: usize = 60;
const PLACEHOLDER_MARK: &str = "# Time: placeholder";

/// Borrowing wrapper that renders a detection list as a timeline export
pub struct TimelineExport<'a> {
    detections: &'a [Detection],
    summary: ExtractionSummary,
}

impl<'a> TimelineExport<'a> {
    pub fn new(detections: &'a [Detection]) -> Self {
        Self {
            detections,
            summary: ExtractionSummary::from_detections(detections),
        }
    }

    pub fn summary(&self) -> &ExtractionSummary {
        &self.summary
    }

    fn write_block(f: &mut fmt::Formatter<'_>, index: usize, d: &Detection) -> fmt::Result {
        writeln!(f, "# Detection {} - {} - {}", index, d.clock(), d.action)?;
        writeln!(
            f,
            "# Status: {}",
            if d.is_accepted() { "ACCEPTED" } else { "REJECTED" }
        )?;
        if d.time_source == TimeSource::Placeholder {
            writeln!(f, "{}", PLACEHOLDER_MARK)?;
        }

        if d.raw_lines.is_empty() {
            writeln!(f, "Time: {}", d.clock())?;
            writeln!(f, "Action: {}", d.action)?;
            writeln!(f, "Confidence: {}%", d.confidence)?;
            if let Some(s) = d.similarity {
                writeln!(f, "Similarity: {}%", s)?;
            }
            if let Some(s) = d.duration {
                writeln!(f, "Duration: {}s", s)?;
            }
            if let Some(s) = d.analysis_duration {
                writeln!(f, "Analysis Duration: {}s", s)?;
            }
        } else {
            for line in &d.raw_lines {
                writeln!(f, "{}", line)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        writeln!(f)
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let s = &self.summary;

        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "# ANALYSIS SUMMARY")?;
        writeln!(f, "{}", rule)?;

        writeln!(f)?;
        writeln!(f, "# Detection Counts by Action:")?;
        for (action, c) in &s.by_action {
            writeln!(
                f,
                "# {}: {} total (✅{} accepted, ❌{} rejected)",
                action, c.total, c.accepted, c.rejected
            )?;
        }

        if s.total == 0 {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "# Performance Statistics:")?;
        writeln!(f, "# Total detections: {}", s.total)?;
        writeln!(
            f,
            "# Acceptance rate: {}/{} ({:.1}%)",
            s.accepted,
            s.total,
            s.acceptance_rate()
        )?;
        if let Some(c) = s.confidence {
            writeln!(f, "# Average confidence: {:.1}%", c.mean)?;
            writeln!(f, "# Confidence range: {:.1}% - {:.1}%", c.min, c.max)?;
        }
        if let Some(c) = s.similarity {
            writeln!(f, "# Average similarity: {:.1}%", c.mean)?;
            writeln!(f, "# Similarity range: {:.1}% - {:.1}%", c.min, c.max)?;
        }
        if let Some(c) = s.analysis_duration {
            writeln!(f, "# Average analysis time: {:.1}s", c.mean)?;
            writeln!(f, "# Analysis time range: {:.1}s - {:.1}s", c.min, c.max)?;
        }

        writeln!(f)?;
        writeln!(f, "# Timeline Summary:")?;
        if let Some(first) = &s.first {
            writeln!(f, "# First detection: {}", first)?;
        }
        if let Some(last) = &s.last {
            writeln!(f, "# Last detection: {}", last)?;
        }
        Ok(())
    }
}

impl fmt::Display for TimelineExport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Classifier Detection Timeline")?;
        writeln!(f, "# Extracted classification results in chronological order")?;
        writeln!(f, "# Format: Motion Detection + Model Analysis + Acceptance")?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f)?;

        writeln!(f, "Total detections found: {}", self.summary.total)?;
        writeln!(
            f,
            "Accepted: {}, Rejected: {}",
            self.summary.accepted, self.summary.rejected
        )?;
        writeln!(f)?;

        for (i, d) in self.detections.iter().enumerate() {
            Self::write_block(f, i + 1, d)?;
        }

        self.write_summary(f)
    }
}

/// Render the export for a detection list.
pub fn export_timeline(detections: &[Detection]) -> String {
    TimelineExport::new(detections).to_string()
}

/// Write the export to disk.
pub fn write_timeline(path: &Path, detections: &[Detection]) -> std::io::Result<()> {
    std::fs::write(path, export_timeline(detections))?;
    tracing::info!(path = %path.display(), detections = detections.len(), "Timeline exported");
    Ok(())
}

/// Default export location: `<log-stem>_timeline.log` beside the log.
pub fn timeline_path_for(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "classification".to_string());
    log_path.with_file_name(format!("{}_timeline.log", stem))
}

/// One detection recovered from an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub index: usize,
    pub timestamp: NaiveTime,
    pub action: String,
    /// From the `# Status:` line; `None` when the line is absent
    pub accepted: Option<bool>,
    /// `Placeholder` when the block is marked `# Time: placeholder`
    pub time_source: TimeSource,
}

impl From<&TimelineEntry> for DetectionPoint {
    fn from(e: &TimelineEntry) -> Self {
        Self {
            timestamp: e.timestamp,
            action: e.action.clone(),
            accepted: e.accepted,
            time_source: e.time_source,
        }
    }
}

/// Reads detection headers back out of an export
#[derive(Debug, Clone)]
pub struct TimelineParser {
    header: Regex,
    status: Regex,
}

impl Default for TimelineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineParser {
    pub fn new() -> Self {
        Self {
            header: re(r"^#\s*Detection\s+(\d+)\s+-\s+(\d{2}:\d{2}:\d{2})\s+-\s+([^#\n]+)"),
            status: re(r"^#\s*Status:\s*(ACCEPTED|REJECTED)\b"),
        }
    }

    /// Entries in file order. Headers with an impossible clock are skipped.
    ///
    /// `# Status:` and `# Time: placeholder` lines count only in the run of
    /// comment lines directly under a header.
    pub fn parse(&self, text: &str) -> Vec<TimelineEntry> {
        let mut entries: Vec<TimelineEntry> = Vec::new();
        let mut in_header = false;

        for line in text.lines() {
            if let Some(caps) = self.header.captures(line) {
                in_header = false;
                let Some(timestamp) = parse_clock(&caps[2]) else {
                    tracing::debug!(line, "Skipping timeline header with invalid clock");
                    continue;
                };
                entries.push(TimelineEntry {
                    index: caps[1].parse().unwrap_or(entries.len() + 1),
                    timestamp,
                    action: caps[3].trim().to_string(),
                    accepted: None,
                    time_source: TimeSource::Logged,
                });
                in_header = true;
                continue;
            }

            if !in_header {
                continue;
            }
            let Some(last) = entries.last_mut() else {
                in_header = false;
                continue;
            };
            if let Some(caps) = self.status.captures(line) {
                last.accepted = Some(&caps[1] == "ACCEPTED");
            } else if line.trim() == PLACEHOLDER_MARK {
                last.time_source = TimeSource::Placeholder;
            } else {
                in_header = false;
            }
        }

        entries
    }
}

/// Parse an export with a fresh parser.
pub fn parse_timeline(text: &str) -> Vec<TimelineEntry> {
    TimelineParser::new().parse(text)
}

/// Read and parse an export from disk.
pub fn read_timeline(path: &Path) -> std::io::Result<Vec<TimelineEntry>> {
    let text = std::fs::read_to_string(path)?;
    let entries = parse_timeline(&text);
    tracing::info!(path = %path.display(), entries = entries.len(), "Loaded timeline");
    Ok(entries)
}
