//! Command-line interface for actioneval.
//!
//! Provides commands for extracting detections from classifier logs,
//! aligning them against ground truth, and summarising several runs.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{self, InputLimits, ResolvedConfig};
use crate::core::{AlignmentResults, DetectionPoint, PerformanceMetrics, TemporalAligner};
use crate::domain::{load_ground_truth, GroundTruthInterval};
use crate::extract::{Extraction, Extractor};
use crate::report::{
    read_timeline, timeline_path_for, write_timeline, AlignmentPayload, AlignmentReport,
    BatchReport, BatchSummary, ExtractionPayload, ExtractionReport, ExtractionSummary,
    ReportEnvelope,
};

/// Fallback export name when the log came from stdin
const STDIN_TIMELINE_NAME: &str = "classification_timeline.log";

/// actioneval - Classifier log extraction and temporal alignment
#[derive(Parser, Debug)]
#[command(name = "actioneval")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract detections from a classifier log and export a timeline
    Extract {
        /// Log file (reads from stdin if not provided)
        log: Option<PathBuf>,

        #[command(flatten)]
        output: ExportArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Align detections from a timeline export against ground truth
    Align {
        /// Timeline export (or a raw log with --raw)
        input: PathBuf,

        /// Treat the input as a raw classifier log
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        align: AlignArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Extract, export and align in one run
    Analyze {
        /// Log file
        log: PathBuf,

        #[command(flatten)]
        output: ExportArgs,

        #[command(flatten)]
        align: AlignArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Extract several logs and aggregate the results
    Batch {
        /// Log files or glob patterns (e.g. "runs/*/server.log")
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Timeline export options
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Where to write the timeline export (default: <log-stem>_timeline.log)
    #[arg(long, conflicts_with = "no_timeline")]
    pub timeline: Option<PathBuf>,

    /// Skip writing the timeline export
    #[arg(long)]
    pub no_timeline: bool,
}

/// Alignment options shared by `align` and `analyze`
#[derive(Args, Debug, Clone)]
pub struct AlignArgs {
    /// Wall clock at which the video started (HH:MM:SS)
    #[arg(long)]
    pub start: String,

    /// Ground-truth CSV
    #[arg(long, env = "ACTIONEVAL_GROUND_TRUTH")]
    pub ground_truth: Option<PathBuf>,

    /// Matching tolerance in seconds
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Disable timeline stretching
    #[arg(long)]
    pub no_stretch: bool,

    /// Score only detections accepted upstream
    #[arg(long)]
    pub accepted_only: bool,

    /// Proceed with empty ground truth if it cannot be loaded
    #[arg(long)]
    pub allow_missing_ground_truth: bool,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let cfg = config::load_config()?;

        match self.command {
            Commands::Extract { log, output, json } => run_extract(&cfg, log.as_deref(), &output, json),
            Commands::Align {
                input,
                raw,
                align,
                json,
            } => run_align(&cfg, &input, raw, &align, json),
            Commands::Analyze {
                log,
                output,
                align,
                json,
            } => run_analyze(&cfg, &log, &output, &align, json),
            Commands::Batch { patterns, json } => run_batch(&cfg, &patterns, json),
            Commands::Config => show_config(&cfg),
        }
    }
}

/// Read a log from a file or piped stdin, enforcing the size limit
fn read_log(path: Option<&Path>, limits: &InputLimits) -> Result<String> {
    let text = match path {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to read log file: {}", path.display()))?;
            limits.validate_len(meta.len())?;
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read log file: {}", path.display()))?
        }
        None => {
            if io::stdin().is_terminal() {
                anyhow::bail!("No input provided. Pass a log file or pipe to stdin");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        }
    };

    limits.validate_input(&text)?;
    Ok(text)
}

/// Pick the export path: explicit flag, else output_dir, else beside the log
fn export_path(cfg: &ResolvedConfig, log: Option<&Path>, output: &ExportArgs) -> Option<PathBuf> {
    if output.no_timeline {
        return None;
    }
    if let Some(path) = &output.timeline {
        return Some(path.clone());
    }

    let beside_log = match log {
        Some(log) => timeline_path_for(log),
        None => PathBuf::from(STDIN_TIMELINE_NAME),
    };
    match &cfg.output_dir {
        Some(dir) => Some(dir.join(beside_log.file_name().unwrap_or(STDIN_TIMELINE_NAME.as_ref()))),
        None => Some(beside_log),
    }
}

/// Extract detections and write the timeline export if requested
fn extract_log(
    cfg: &ResolvedConfig,
    log: Option<&Path>,
    output: &ExportArgs,
) -> Result<(String, Extraction)> {
    let text = read_log(log, &cfg.limits)?;
    let extraction = Extractor::new(cfg.extract_options()).extract_all(&text);

    if let Some(path) = export_path(cfg, log, output) {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        write_timeline(&path, &extraction.detections)
            .with_context(|| format!("Failed to write timeline: {}", path.display()))?;
        eprintln!("Timeline exported to: {}", path.display());
    }

    Ok((text, extraction))
}

fn run_extract(cfg: &ResolvedConfig, log: Option<&Path>, output: &ExportArgs, json: bool) -> Result<()> {
    let (text, extraction) = extract_log(cfg, log, output)?;
    let summary = ExtractionSummary::from_detections(&extraction.detections);

    if json {
        let envelope = ReportEnvelope::new(
            ExtractionPayload {
                summary: &summary,
                detections: &extraction.detections,
                sightings: &extraction.sightings,
            },
            Some(text.as_bytes()),
        );
        println!("{}", envelope.to_json()?);
    } else {
        print!(
            "{}",
            ExtractionReport {
                summary: &summary,
                detections: &extraction.detections,
                sightings: &extraction.sightings,
            }
        );
    }
    Ok(())
}

/// Ground truth from flag or config, honouring --allow-missing-ground-truth
fn resolve_ground_truth(cfg: &ResolvedConfig, args: &AlignArgs) -> Result<Vec<GroundTruthInterval>> {
    let Some(path) = args.ground_truth.as_ref().or(cfg.ground_truth.as_ref()) else {
        if args.allow_missing_ground_truth {
            warn!("No ground truth configured; every detection will be a false positive");
            return Ok(Vec::new());
        }
        anyhow::bail!("No ground truth configured. Use --ground-truth <csv> or set paths.ground_truth");
    };

    match load_ground_truth(path) {
        Ok(rows) => Ok(rows),
        Err(e) if args.allow_missing_ground_truth => {
            warn!(error = %e, "Continuing without ground truth");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Configure an aligner, load both sides and run one match pass
fn align_points(
    cfg: &ResolvedConfig,
    points: Vec<DetectionPoint>,
    args: &AlignArgs,
) -> Result<(AlignmentResults, PerformanceMetrics)> {
    let mut context = cfg.alignment_context();
    if let Some(tolerance) = args.tolerance {
        context.tolerance_seconds = tolerance;
    }
    if args.no_stretch {
        context.stretch_enabled = false;
    }
    if args.accepted_only {
        context.accepted_only = true;
    }

    let mut aligner = TemporalAligner::new(context);
    aligner.load_detections(points);
    aligner.load_ground_truth(resolve_ground_truth(cfg, args)?);
    aligner.set_video_start_time(&args.start)?;

    let results = aligner.find_temporal_matches()?;
    let metrics = aligner.analyze_performance(&results);
    info!(
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1,
        "Alignment complete"
    );
    Ok((results, metrics))
}

fn print_alignment(results: &AlignmentResults, metrics: &PerformanceMetrics, source: &[u8], json: bool) -> Result<()> {
    if json {
        let envelope = ReportEnvelope::new(AlignmentPayload { metrics, results }, Some(source));
        println!("{}", envelope.to_json()?);
    } else {
        print!("{}", AlignmentReport { results, metrics });
    }
    Ok(())
}

fn run_align(cfg: &ResolvedConfig, input: &Path, raw: bool, args: &AlignArgs, json: bool) -> Result<()> {
    let text = read_log(Some(input), &cfg.limits)?;

    let points: Vec<DetectionPoint> = if raw {
        let detections = Extractor::new(cfg.extract_options()).extract(&text);
        detections.iter().map(DetectionPoint::from).collect()
    } else {
        let entries = read_timeline(input)
            .with_context(|| format!("Failed to read timeline: {}", input.display()))?;
        entries.iter().map(DetectionPoint::from).collect()
    };

    let (results, metrics) = align_points(cfg, points, args)?;
    print_alignment(&results, &metrics, text.as_bytes(), json)
}

fn run_analyze(
    cfg: &ResolvedConfig,
    log: &Path,
    output: &ExportArgs,
    args: &AlignArgs,
    json: bool,
) -> Result<()> {
    let (text, extraction) = extract_log(cfg, Some(log), output)?;
    let points = extraction.detections.iter().map(DetectionPoint::from).collect();

    let (results, metrics) = align_points(cfg, points, args)?;

    if !json {
        let summary = ExtractionSummary::from_detections(&extraction.detections);
        print!(
            "{}",
            ExtractionReport {
                summary: &summary,
                detections: &extraction.detections,
                sightings: &extraction.sightings,
            }
        );
        println!();
    }
    print_alignment(&results, &metrics, text.as_bytes(), json)
}

/// Expand arguments that look like glob patterns; plain paths pass through
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let matches = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        let before = paths.len();
        for entry in matches {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => warn!(error = %e, "Skipping unreadable glob entry"),
            }
        }
        if paths.len() == before {
            warn!(pattern = %pattern, "Pattern matched no files");
        }
    }
    Ok(paths)
}

fn run_batch(cfg: &ResolvedConfig, patterns: &[String], json: bool) -> Result<()> {
    let paths = expand_patterns(patterns)?;
    if paths.is_empty() {
        anyhow::bail!("No log files matched");
    }

    let extractor = Extractor::new(cfg.extract_options());
    let mut batch = BatchSummary::default();
    for path in &paths {
        let source = path.display().to_string();
        match read_log(Some(path), &cfg.limits) {
            Ok(text) => {
                let detections = extractor.extract(&text);
                info!(log = %source, detections = detections.len(), "Extracted");
                batch.push(source, ExtractionSummary::from_detections(&detections));
            }
            Err(e) => {
                warn!(log = %source, error = %e, "Skipping log");
                batch.push_failure(source, format!("{:#}", e));
            }
        }
    }

    if json {
        let envelope = ReportEnvelope::new(batch.totals(), None);
        let body = serde_json::json!({
            "envelope": envelope,
            "runs": batch.runs,
            "failures": batch.failures,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", BatchReport(&batch));
    }
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("actioneval configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    print!("{}", serde_yaml::to_string(cfg).context("Failed to render configuration")?);
    Ok(())
}
