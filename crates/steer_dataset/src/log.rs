//! Reading the driving log and checking it against the frame directory.

use crate::types::{DatasetResult, DrivingSample, SteerDatasetError};
use std::fs;
use std::path::{Path, PathBuf};

pub const DRIVING_LOG_FILE: &str = "driving_log.csv";
pub const FRAMES_SUBDIR: &str = "IMG";
/// Center, left and right camera per logged row.
pub const CAMERAS_PER_ROW: usize = 3;

const CENTER_COL: usize = 0;
const STEERING_COL: usize = 3;

/// A driving log loaded from a dataset root that passed the frame-count check.
#[derive(Debug, Clone)]
pub struct DrivingLog {
    pub root: PathBuf,
    pub samples: Vec<DrivingSample>,
    pub frames_found: usize,
}

impl DrivingLog {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join(FRAMES_SUBDIR)
    }
}

/// Parse a driving log CSV. The first row is always treated as a header.
pub fn read_driving_log(path: &Path) -> DatasetResult<Vec<DrivingSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| SteerDatasetError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SteerDatasetError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |msg: String| SteerDatasetError::InvalidRow {
            path: path.to_path_buf(),
            line,
            msg,
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let center = record
            .get(CENTER_COL)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing center frame".to_string()))?;
        let steering = record
            .get(STEERING_COL)
            .ok_or_else(|| invalid(format!("expected at least {} columns", STEERING_COL + 1)))?;
        let steering: f32 = steering
            .parse()
            .map_err(|e| invalid(format!("steering {steering:?}: {e}")))?;
        if !steering.is_finite() {
            return Err(invalid(format!("steering {steering} is not finite")));
        }
        samples.push(DrivingSample::new(center, steering));
    }
    Ok(samples)
}

/// Count `*.jpg` frames directly inside `dir`.
pub fn count_frames(dir: &Path) -> DatasetResult<usize> {
    let entries = fs::read_dir(dir).map_err(|e| SteerDatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| SteerDatasetError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_jpg = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if is_jpg && path.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Every logged row owns one frame per camera; anything else means the log and
/// the frame directory are out of sync.
pub fn check_frame_count(frames_dir: &Path, rows: usize) -> DatasetResult<usize> {
    let found = count_frames(frames_dir)?;
    let expected = rows * CAMERAS_PER_ROW;
    if found != expected {
        return Err(SteerDatasetError::FrameCountMismatch {
            dir: frames_dir.to_path_buf(),
            found,
            expected,
        });
    }
    Ok(found)
}

/// Load `<root>/driving_log.csv` and verify `<root>/IMG` holds three frames per row.
pub fn load_driving_log(root: &Path) -> DatasetResult<DrivingLog> {
    let samples = read_driving_log(&root.join(DRIVING_LOG_FILE))?;
    if samples.is_empty() {
        return Err(SteerDatasetError::EmptyDataset);
    }
    let frames_found = check_frame_count(&root.join(FRAMES_SUBDIR), samples.len())?;
    tracing::info!(
        root = %root.display(),
        rows = samples.len(),
        frames = frames_found,
        "loaded driving log"
    );
    Ok(DrivingLog {
        root: root.to_path_buf(),
        samples,
        frames_found,
    })
}
