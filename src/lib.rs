//! actioneval - Classifier log extraction and temporal alignment
//!
//! Recovers action detections from free-form classifier server logs and
//! scores them against a hand-labelled ground-truth timeline.
//!
//! # Architecture
//!
//! The system is a two-stage batch pipeline:
//! - Extraction turns raw log text into ordered `Detection` records
//! - Alignment places detections on the video timeline, stretches the
//!   ground truth to match, pairs the two greedily and scores the result
//!
//! Each run is an independent value; there is no shared state between runs.
//!
//! # Modules
//!
//! - `domain`: Data structures (Detection, GroundTruthInterval, action labels)
//! - `extract`: Log scanning state machine and object sightings
//! - `core`: Alignment logic (stretch, matcher, metrics, aligner)
//! - `report`: Timeline export, summaries and rendered reports
//! - `config`: Config file discovery and input limits
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Extract detections and write server_timeline.log
//! actioneval extract server.log
//!
//! # Align the export against ground truth
//! actioneval align server_timeline.log --start 15:17:00 --ground-truth gt.csv
//!
//! # Both in one go
//! actioneval analyze server.log --start 15:17:00 --ground-truth gt.csv
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod extract;
pub mod report;

// Re-export main types at crate root for convenience
pub use core::{AlignError, AlignmentContext, AlignmentResults, PerformanceMetrics, TemporalAligner};
pub use domain::{Detection, GroundTruthError, GroundTruthInterval, ObjectSighting};
pub use extract::{extract_detections, Extractor};
pub use report::{export_timeline, parse_timeline, ExtractionSummary};
