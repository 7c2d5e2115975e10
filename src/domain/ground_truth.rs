//! Ground-truth action timeline.
//!
//! The ground truth is a hand-labelled table of action intervals measured in
//! seconds from the start of the recorded video. Rows are loaded once, then
//! the aligner rewrites the working `start_seconds`/`end_seconds` copies when
//! it stretches the timeline.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ground truth could not be produced from its source
#[derive(Debug, Error)]
pub enum GroundTruthError {
    #[error("Ground truth unavailable ({path}): {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

impl GroundTruthError {
    fn unavailable(path: &Path, reason: impl ToString) -> Self {
        GroundTruthError::Unavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// One row of the ground-truth CSV
#[derive(Debug, Clone, Deserialize)]
struct GroundTruthRow {
    start_time_seconds: f64,
    end_time_seconds: f64,
    action_label: String,
    category_label: String,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

/// One labelled action interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthInterval {
    /// Start, seconds from video start, as labelled
    pub original_start: f64,
    /// End, seconds from video start, as labelled
    pub original_end: f64,
    /// Action label as labelled
    pub action: String,
    /// Category label as labelled
    pub category: String,
    /// Labelled duration (`end - start` when the column was empty)
    pub duration: f64,
    /// Working start, possibly stretched
    pub start_seconds: f64,
    /// Working end, possibly stretched
    pub end_seconds: f64,
    /// Width of the working interval after stretching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stretched_duration: Option<f64>,
}

impl GroundTruthInterval {
    pub fn new(start: f64, end: f64, action: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            original_start: start,
            original_end: end,
            action: action.into(),
            category: category.into(),
            duration: end - start,
            start_seconds: start,
            end_seconds: end,
            stretched_duration: None,
        }
    }

    /// Midpoint of the working interval
    pub fn center(&self) -> f64 {
        (self.start_seconds + self.end_seconds) / 2.0
    }

    /// Midpoint of the labelled interval
    pub fn original_center(&self) -> f64 {
        (self.original_start + self.original_end) / 2.0
    }

    /// Inclusive containment test against the working interval
    pub fn contains(&self, t: f64) -> bool {
        self.start_seconds <= t && t <= self.end_seconds
    }

    /// Drop any stretching and restore the labelled bounds
    pub fn reset(&mut self) {
        self.start_seconds = self.original_start;
        self.end_seconds = self.original_end;
        self.stretched_duration = None;
    }
}

/// Load ground truth from a CSV file.
///
/// Every failure (missing file, bad header, unparseable row) surfaces as
/// [`GroundTruthError::Unavailable`] so callers can decide whether to
/// continue with an empty timeline.
pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruthInterval>, GroundTruthError> {
    let file = std::fs::File::open(path).map_err(|e| GroundTruthError::unavailable(path, e))?;
    read_ground_truth(file, path)
}

/// Load ground truth from any reader; `origin` is only used in errors.
pub fn read_ground_truth<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<Vec<GroundTruthInterval>, GroundTruthError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut intervals = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: GroundTruthRow = result
            .map_err(|e| GroundTruthError::unavailable(origin, format!("row {}: {}", i + 1, e)))?;

        if row.start_time_seconds > row.end_time_seconds {
            return Err(GroundTruthError::unavailable(
                origin,
                format!(
                    "row {}: start {} is after end {}",
                    i + 1,
                    row.start_time_seconds,
                    row.end_time_seconds
                ),
            ));
        }

        let mut interval = GroundTruthInterval::new(
            row.start_time_seconds,
            row.end_time_seconds,
            row.action_label,
            row.category_label,
        );
        if let Some(d) = row.duration_seconds {
            interval.duration = d;
        }
        intervals.push(interval);
    }

    tracing::debug!(rows = intervals.len(), path = %origin.display(), "Loaded ground truth");
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const CSV: &str = "\
start_time_seconds,end_time_seconds,action_label,category_label,duration_seconds
10.0,15.0,add-food,food,5.0
20.5,22.0,flip,cooking,
";

    #[test]
    fn test_read_rows() {
        let rows = read_ground_truth(CSV.as_bytes(), Path::new("mem.csv")).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].action, "add-food");
        assert_eq!(rows[0].category, "food");
        assert_eq!(rows[0].duration, 5.0);
        assert_eq!(rows[0].start_seconds, rows[0].original_start);
        assert_eq!(rows[0].center(), 12.5);

        // Empty duration column is derived
        assert_eq!(rows[1].duration, 1.5);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let err = load_ground_truth(&temp.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, GroundTruthError::Unavailable { .. }));
    }

    #[test]
    fn test_bad_row_is_unavailable() {
        let csv = "start_time_seconds,end_time_seconds,action_label,category_label\nabc,1.0,flip,x\n";
        let err = read_ground_truth(csv.as_bytes(), Path::new("bad.csv")).unwrap_err();
        let GroundTruthError::Unavailable { reason, .. } = err;
        assert!(reason.contains("row 1"));
    }

    #[test]
    fn test_reversed_interval_rejected() {
        let csv = "start_time_seconds,end_time_seconds,action_label,category_label\n5.0,1.0,flip,x\n";
        assert!(read_ground_truth(csv.as_bytes(), Path::new("rev.csv")).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gt.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(CSV.as_bytes()).unwrap();

        let rows = load_ground_truth(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let gt = GroundTruthInterval::new(10.0, 15.0, "flip", "cooking");
        assert!(gt.contains(10.0));
        assert!(gt.contains(15.0));
        assert!(!gt.contains(15.01));
    }
}
