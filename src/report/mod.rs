//! Reporting for extraction and alignment runs.
//!
//! - Timeline: the re-parseable export of one extraction run
//! - Summary: extraction statistics and batch aggregation
//! - Render: text reports and the JSON envelope

pub mod render;
pub mod summary;
pub mod timeline;

pub use render::{
    compute_hash, AlignmentPayload, AlignmentReport, BatchReport, ExtractionPayload,
    ExtractionReport, ReportEnvelope,
};
pub use summary::{
    ActionCounts, BatchFailure, BatchRun, BatchSummary, BatchTotals, ConfidenceBuckets,
    ExtractionSummary, TimelineMark, ValueStats,
};
pub use timeline::{
    export_timeline, parse_timeline, read_timeline, timeline_path_for, write_timeline,
    TimelineEntry, TimelineExport, TimelineParser,
};
