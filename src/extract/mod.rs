//! Detection extraction from classifier log text.
//!
//! Turns raw, emoji-tagged server output into ordered [`Detection`] records
//! and a secondary stream of [`ObjectSighting`] side events.
//!
//! # Design Principles
//!
//! - **Tolerant**: malformed or partial blocks are dropped, never reported as errors.
//! - **No double counting**: lines consumed by a record are never rescanned.
//! - **Isolated runs**: patterns live in an [`Extractor`] value, not a global.
//!
//! # Example
//!
//! ```
//! use actioneval::extract::extract_detections;
//!
//! let log = "❌ Action rejected: Remove Pan (45.1% < 75.0%)";
//! let detections = extract_detections(log);
//! assert_eq!(detections[0].action, "Remove Pan");
//! assert_eq!(detections[0].accepted, Some(false));
//! ```

use crate::domain::{Detection, ObjectSighting};

pub mod patterns;
pub mod scanner;
pub mod sightings;

pub use patterns::Patterns;
pub use scanner::{
    extract_detections, ExtractOptions, Extractor, ScanPhase, ScanState,
    DEFAULT_ACCEPTANCE_WINDOW, DEFAULT_FOLLOW_UP_WINDOW,
};
pub use sightings::extract_sightings;

/// Everything recovered from one log
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub detections: Vec<Detection>,
    pub sightings: Vec<ObjectSighting>,
}

impl Extractor {
    /// Run both passes over the same text.
    pub fn extract_all(&self, log_text: &str) -> Extraction {
        let detections = self.extract(log_text);
        let sightings = extract_sightings(self.patterns(), log_text);
        tracing::info!(
            detections = detections.len(),
            sightings = sightings.len(),
            "Extraction complete"
        );
        Extraction {
            detections,
            sightings,
        }
    }
}
