//! Domain types for action evaluation.
//!
//! This module contains the core data structures:
//! - Detection: one classifier decision recovered from a log
//! - Action: label normalization shared by counting and matching
//! - GroundTruth: labelled action intervals

pub mod action;
pub mod detection;
pub mod ground_truth;

// Re-export commonly used types
pub use action::{labels_intersect, normalize_action};
pub use detection::{
    format_clock, is_none_action, parse_clock, Detection, LogFormat, ObjectSighting, TimeSource,
    CLOCK_FORMAT,
};
pub use ground_truth::{load_ground_truth, read_ground_truth, GroundTruthError, GroundTruthInterval};
