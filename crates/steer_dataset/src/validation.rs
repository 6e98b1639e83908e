//! Dataset summary and sanity checks run before training.

use crate::batch::DiskFrames;
use crate::log::{count_frames, DrivingLog, CAMERAS_PER_ROW};
use crate::types::{DatasetResult, LogSummary, ValidationOutcome, ValidationReport};

pub fn summarize_log(log: &DrivingLog) -> DatasetResult<LogSummary> {
    let frames = DiskFrames::new(&log.root);
    let mut summary = LogSummary {
        root: log.root.clone(),
        rows: log.len(),
        frames_found: count_frames(&log.frames_dir())?,
        frames_expected: log.len() * CAMERAS_PER_ROW,
        ..Default::default()
    };
    for sample in &log.samples {
        if !frames.resolve(&sample.image).is_file() {
            summary.missing_center += 1;
        }
        if sample.steering == 0.0 {
            summary.zero_steering += 1;
        } else if sample.steering < 0.0 {
            summary.left_steering += 1;
        } else {
            summary.right_steering += 1;
        }
    }
    Ok(summary)
}

pub fn validate_summary(summary: LogSummary) -> ValidationReport {
    let mut outcome = ValidationOutcome::Pass;
    let mut reasons = Vec::new();

    if summary.frames_found != summary.frames_expected {
        outcome = ValidationOutcome::Fail;
        reasons.push(format!(
            "frames: found {} expected {}",
            summary.frames_found, summary.frames_expected
        ));
    }
    if summary.missing_center > 0 {
        outcome = ValidationOutcome::Fail;
        reasons.push(format!(
            "missing center frames: {} of {}",
            summary.missing_center, summary.rows
        ));
    }
    let zero_ratio = summary.zero_steering as f32 / summary.rows.max(1) as f32;
    if zero_ratio > 0.5 {
        if outcome == ValidationOutcome::Pass {
            outcome = ValidationOutcome::Warn;
        }
        reasons.push(format!(
            "zero steering dominates: {:.1}% of rows",
            zero_ratio * 100.0
        ));
    }

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}

pub fn validate_log(log: &DrivingLog) -> DatasetResult<ValidationReport> {
    Ok(validate_summary(summarize_log(log)?))
}
