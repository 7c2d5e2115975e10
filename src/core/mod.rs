//! Core alignment logic.
//!
//! This module contains:
//! - Stretch: global affine remap of the ground-truth timeline
//! - Matcher: greedy detection/ground-truth pairing
//! - Metrics: precision, recall, F1 and timing statistics
//! - Aligner: lifecycle that ties the above together

pub mod aligner;
pub mod matcher;
pub mod metrics;
pub mod stretch;

// Re-export commonly used types
pub use aligner::{
    AlignError, AlignerStage, AlignmentContext, AlignmentResults, DetectionPoint, TemporalAligner,
    DEFAULT_TOLERANCE_SECONDS,
};
pub use matcher::{greedy_match, MatchOutcome, MatchResult, TimedDetection};
pub use metrics::{f1_score, median, ActionBreakdown, PerformanceMetrics, TemporalAccuracy};
pub use stretch::StretchPlan;
