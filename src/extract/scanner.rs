//! Line scanner that assembles detections from classifier log text.
//!
//! The scanner is an explicit state machine: [`Extractor::step`] maps a
//! `(ScanState, line)` pair to a new state plus at most one finished
//! [`Detection`]. Nothing outside the state value is mutated, so the whole
//! scan is a left fold over the lines.
//!
//! Three wire formats are recognised:
//!
//! - **Motion block**: `MOTION DETECTED` marker, similarity and `Time:` lines,
//!   a model `RESPONSE` section with action/confidence/analysis duration,
//!   a closing `====` separator and, within a few lines, an acceptance marker.
//! - **Inline decision**: `Action accepted|rejected: <action> (85.0% ≥ 75.0%)`,
//!   optionally followed by `Confidence:` and `Time:` lines.
//! - **Burner**: `Burner <n>: <action>` followed by a `Confidence:` line.
//!
//! A record missing its action, confidence or timestamp is dropped, as is
//! any record whose action is the `(none)` sentinel.

use chrono::NaiveTime;
use tracing::debug;

use super::patterns::Patterns;
use crate::domain::{is_none_action, Detection, LogFormat, TimeSource};

/// Lines inspected after a motion block closes for its acceptance marker
pub const DEFAULT_ACCEPTANCE_WINDOW: usize = 5;

/// Lines inspected after a decision or burner line for follow-up fields
pub const DEFAULT_FOLLOW_UP_WINDOW: usize = 4;

/// Tunables for the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub acceptance_window: usize,
    pub follow_up_window: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            acceptance_window: DEFAULT_ACCEPTANCE_WINDOW,
            follow_up_window: DEFAULT_FOLLOW_UP_WINDOW,
        }
    }
}

/// A record under construction
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    format: LogFormat,
    action: Option<String>,
    confidence: Option<f64>,
    threshold: Option<f64>,
    timestamp: Option<(NaiveTime, TimeSource)>,
    similarity: Option<f64>,
    duration: Option<f64>,
    analysis_duration: Option<f64>,
    accepted: Option<bool>,
    burner_id: Option<u32>,
    raw_lines: Vec<String>,
}

impl Pending {
    fn new(format: LogFormat, line: &str) -> Self {
        Self {
            format,
            action: None,
            confidence: None,
            threshold: None,
            timestamp: None,
            similarity: None,
            duration: None,
            analysis_duration: None,
            accepted: None,
            burner_id: None,
            raw_lines: vec![line.to_string()],
        }
    }

    fn push(&mut self, line: &str) {
        self.raw_lines.push(line.to_string());
    }

    /// Apply the materialization rule. Incomplete records yield `None`.
    fn into_detection(self) -> Option<Detection> {
        let action = match self.action {
            Some(a) if !a.trim().is_empty() && !is_none_action(&a) => a.trim().to_string(),
            other => {
                debug!(format = ?self.format, action = ?other, "Dropping record without a usable action");
                return None;
            }
        };
        let Some(confidence) = self.confidence else {
            debug!(%action, "Dropping record without confidence");
            return None;
        };
        let Some((timestamp, time_source)) = self.timestamp else {
            debug!(%action, "Dropping record without timestamp");
            return None;
        };

        Some(Detection {
            timestamp,
            time_source,
            action,
            confidence,
            threshold: self.threshold,
            similarity: self.similarity,
            duration: self.duration,
            analysis_duration: self.analysis_duration,
            accepted: self.accepted,
            burner_id: self.burner_id,
            format: self.format,
            raw_lines: self.raw_lines,
        })
    }
}

/// Where the scanner is within the current record
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanPhase {
    /// Between records
    #[default]
    Idle,
    /// Motion block, before the model response marker
    MotionSection(Pending),
    /// Motion block, inside the model response
    ResponseSection(Pending),
    /// Motion block closed; looking for the acceptance marker
    BlockClosed { pending: Pending, remaining: usize },
    /// Decision or burner line seen; waiting for a confidence line
    AwaitingConfidence { pending: Pending, remaining: usize },
    /// Decision complete; a `Time:` line may still refine the timestamp
    AwaitingTime { pending: Pending, remaining: usize },
}

/// Full scanner state threaded through the fold
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanState {
    pub phase: ScanPhase,
    /// Most recent wall clock seen anywhere in the log
    pub clock: Option<NaiveTime>,
}

/// Stateless extraction engine: compiled patterns plus options
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    patterns: Patterns,
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            patterns: Patterns::new(),
            options,
        }
    }

    pub fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    /// Scan the full log text and return detections in the order their
    /// records closed.
    pub fn extract(&self, log_text: &str) -> Vec<Detection> {
        let mut detections = Vec::new();
        let mut state = ScanState::default();

        for line in log_text.lines() {
            let (next, emitted) = self.step(state, line);
            detections.extend(emitted);
            state = next;
        }
        detections.extend(self.finish(state));

        debug!(detections = detections.len(), "Scan complete");
        detections
    }

    /// Flush whatever record is open at end of input.
    pub fn finish(&self, state: ScanState) -> Option<Detection> {
        match state.phase {
            ScanPhase::Idle => None,
            ScanPhase::MotionSection(p)
            | ScanPhase::ResponseSection(p)
            | ScanPhase::BlockClosed { pending: p, .. }
            | ScanPhase::AwaitingConfidence { pending: p, .. }
            | ScanPhase::AwaitingTime { pending: p, .. } => p.into_detection(),
        }
    }

    /// Advance the scanner by one line.
    pub fn step(&self, state: ScanState, line: &str) -> (ScanState, Option<Detection>) {
        let line_clock = self
            .patterns
            .leading_clock(line)
            .or_else(|| self.patterns.time_and_duration(line).map(|(t, _)| t));
        let carried = state.clock;
        let clock = line_clock.or(carried);

        let (phase, emitted) = match state.phase {
            ScanPhase::Idle => (self.start(line, line_clock, carried), None),
            ScanPhase::MotionSection(p) => (self.motion_line(p, line, line_clock, carried), None),
            ScanPhase::ResponseSection(p) => self.response_line(p, line, line_clock, carried),
            ScanPhase::BlockClosed { pending, remaining } => {
                self.closed_line(pending, remaining, line, line_clock, carried)
            }
            ScanPhase::AwaitingConfidence { pending, remaining } => {
                self.confidence_line(pending, remaining, line, line_clock, carried)
            }
            ScanPhase::AwaitingTime { pending, remaining } => {
                self.time_line(pending, remaining, line, line_clock, carried)
            }
        };

        (ScanState { phase, clock }, emitted)
    }

    /// True when the line opens a record of any format
    fn opens_record(&self, line: &str) -> bool {
        self.patterns.is_motion_start(line)
            || self.patterns.decision(line).is_some()
            || self.patterns.burner(line).is_some()
    }

    /// Timestamp for a record that has no `Time:` field of its own (yet)
    fn provisional_time(
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (NaiveTime, TimeSource) {
        match (line_clock, carried) {
            (Some(t), _) => (t, TimeSource::Logged),
            (None, Some(t)) => (t, TimeSource::Carried),
            (None, None) => (NaiveTime::MIN, TimeSource::Placeholder),
        }
    }

    /// Idle: look for the start of a record
    fn start(
        &self,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> ScanPhase {
        if self.patterns.is_motion_start(line) {
            return ScanPhase::MotionSection(Pending::new(LogFormat::MotionBlock, line));
        }

        if let Some(decision) = self.patterns.decision(line) {
            let mut p = Pending::new(LogFormat::InlineDecision, line);
            p.action = Some(decision.action);
            p.accepted = Some(decision.accepted);
            p.timestamp = Some(Self::provisional_time(line_clock, carried));

            let remaining = self.options.follow_up_window;
            return match decision.inline {
                Some(score) => {
                    p.confidence = score.confidence;
                    p.threshold = score.threshold;
                    ScanPhase::AwaitingTime { pending: p, remaining }
                }
                None => ScanPhase::AwaitingConfidence { pending: p, remaining },
            };
        }

        if let Some(burner) = self.patterns.burner(line) {
            let mut p = Pending::new(LogFormat::Burner, line);
            p.action = Some(burner.action);
            p.burner_id = burner.burner_id;
            p.timestamp = Some(Self::provisional_time(burner.clock, carried));
            return ScanPhase::AwaitingConfidence {
                pending: p,
                remaining: self.options.follow_up_window,
            };
        }

        ScanPhase::Idle
    }

    /// Close `pending` and let the current line start over from Idle
    fn restart(
        &self,
        pending: Pending,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (ScanPhase, Option<Detection>) {
        let emitted = pending.into_detection();
        (self.start(line, line_clock, carried), emitted)
    }

    fn motion_line(
        &self,
        mut p: Pending,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> ScanPhase {
        if self.patterns.is_motion_start(line) {
            debug!("Motion block restarted before a model response");
            return self.start(line, line_clock, carried);
        }

        p.push(line);
        if self.patterns.is_response_start(line) {
            return ScanPhase::ResponseSection(p);
        }

        if let Some(similarity) = self.patterns.similarity(line) {
            p.similarity = Some(similarity);
        } else if let Some((t, duration)) = self.patterns.time_and_duration(line) {
            p.timestamp = Some((t, TimeSource::Logged));
            p.duration = duration;
        }
        ScanPhase::MotionSection(p)
    }

    fn response_line(
        &self,
        mut p: Pending,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (ScanPhase, Option<Detection>) {
        if self.patterns.is_motion_start(line) {
            return self.restart(p, line, line_clock, carried);
        }

        p.push(line);
        if self.patterns.is_block_close(line) {
            return (
                ScanPhase::BlockClosed {
                    pending: p,
                    remaining: self.options.acceptance_window,
                },
                None,
            );
        }

        if let Some(action) = self.patterns.detected_action(line) {
            p.action = Some(action);
        } else if let Some((confidence, threshold)) = self.patterns.confidence(line) {
            p.confidence = confidence;
            if threshold.is_some() {
                p.threshold = threshold;
            }
        } else if let Some(analysis) = self.patterns.analysis_duration(line) {
            p.analysis_duration = analysis;
        }
        (ScanPhase::ResponseSection(p), None)
    }

    fn closed_line(
        &self,
        mut p: Pending,
        remaining: usize,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (ScanPhase, Option<Detection>) {
        use super::patterns::Verdict;

        if let Some(verdict) = self.patterns.verdict(line) {
            p.push(line);
            match verdict {
                Verdict::Accepted { threshold } => {
                    p.accepted = Some(true);
                    p.threshold = p.threshold.or(threshold);
                }
                Verdict::Rejected { threshold } => {
                    p.accepted = Some(false);
                    p.threshold = p.threshold.or(threshold);
                }
                Verdict::NoAction => p.accepted = Some(false),
            }
            return (ScanPhase::Idle, p.into_detection());
        }

        if self.opens_record(line) {
            return self.restart(p, line, line_clock, carried);
        }

        match remaining.saturating_sub(1) {
            0 => (ScanPhase::Idle, p.into_detection()),
            remaining => (ScanPhase::BlockClosed { pending: p, remaining }, None),
        }
    }

    fn confidence_line(
        &self,
        mut p: Pending,
        remaining: usize,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (ScanPhase, Option<Detection>) {
        if self.opens_record(line) {
            return self.restart(p, line, line_clock, carried);
        }
        let remaining = remaining.saturating_sub(1);

        if p.format == LogFormat::Burner {
            if let Some((confidence, duration)) = self.patterns.burner_confidence(line) {
                p.push(line);
                p.confidence = confidence;
                p.duration = duration;
                return (ScanPhase::Idle, p.into_detection());
            }
        } else if let Some((confidence, threshold)) = self.patterns.confidence(line) {
            p.push(line);
            p.confidence = confidence;
            if threshold.is_some() {
                p.threshold = threshold;
            }
            return match remaining {
                0 => (ScanPhase::Idle, p.into_detection()),
                remaining => (ScanPhase::AwaitingTime { pending: p, remaining }, None),
            };
        } else if let Some((t, _)) = self.patterns.time_and_duration(line) {
            p.push(line);
            p.timestamp = Some((t, TimeSource::Logged));
        }

        match remaining {
            0 => (ScanPhase::Idle, p.into_detection()),
            remaining => (ScanPhase::AwaitingConfidence { pending: p, remaining }, None),
        }
    }

    fn time_line(
        &self,
        mut p: Pending,
        remaining: usize,
        line: &str,
        line_clock: Option<NaiveTime>,
        carried: Option<NaiveTime>,
    ) -> (ScanPhase, Option<Detection>) {
        if self.opens_record(line) {
            return self.restart(p, line, line_clock, carried);
        }

        if let Some((t, _)) = self.patterns.time_and_duration(line) {
            p.push(line);
            p.timestamp = Some((t, TimeSource::Logged));
            return (ScanPhase::Idle, p.into_detection());
        }

        match remaining.saturating_sub(1) {
            0 => (ScanPhase::Idle, p.into_detection()),
            remaining => (ScanPhase::AwaitingTime { pending: p, remaining }, None),
        }
    }
}

/// Extract detections with default options.
pub fn extract_detections(log_text: &str) -> Vec<Detection> {
    Extractor::default().extract(log_text)
}
