//! Core types, error definitions, and data structures for steer_dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, SteerDatasetError>;

#[derive(Debug, Error)]
pub enum SteerDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid driving log row at {path}:{line}: {msg}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        msg: String,
    },
    #[error("number of frames in {dir} does not match the log: found {found}, expected {expected}")]
    FrameCountMismatch {
        dir: PathBuf,
        found: usize,
        expected: usize,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("crop band rows {top}..{bottom} is empty for {reference} ({width}x{height})")]
    CropOutOfBounds {
        reference: String,
        top: u32,
        bottom: u32,
        width: u32,
        height: u32,
    },
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("{samples} image references but {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },
    #[error("batch size {batch_size} must be in 1..={len}")]
    BatchTooLarge { batch_size: usize, len: usize },
    #[error("invalid image shape {0}")]
    InvalidShape(String),
    #[error("{0}")]
    Other(String),
}

/// One row of the driving log reduced to what training consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingSample {
    /// Center-camera frame reference, relative to the dataset root.
    pub image: String,
    /// Steering angle (regression target).
    pub steering: f32,
}

impl DrivingSample {
    pub fn new(image: impl Into<String>, steering: f32) -> Self {
        Self {
            image: image.into(),
            steering,
        }
    }
}

/// Model input shape after preprocessing, in (height, width, channels) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageShape {
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of values in one preprocessed image.
    pub fn elements(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn validate(&self) -> DatasetResult<()> {
        if self.height == 0 || self.width == 0 {
            return Err(SteerDatasetError::InvalidShape(format!(
                "{self}: height and width must be positive"
            )));
        }
        if self.channels != 3 {
            return Err(SteerDatasetError::InvalidShape(format!(
                "{self}: frames are RGB, channels must be 3"
            )));
        }
        Ok(())
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::new(128, 128, 3)
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierMode {
    /// Shuffle every pass; zero-label discard policy active.
    Training,
    /// Fixed order, no side effects.
    Evaluation,
}

/// What each supplied batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchContents {
    #[default]
    ImagesAndLabels,
    ImagesOnly,
}

/// Channel order of decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    Bgr,
    #[default]
    Rgb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierStats {
    pub batches: usize,
    pub samples: usize,
    /// Completed passes over the supplier's sample order.
    pub passes: usize,
    /// Zero-label samples skipped by the discard policy.
    pub discarded: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSummary {
    pub root: PathBuf,
    pub rows: usize,
    pub frames_found: usize,
    pub frames_expected: usize,
    pub missing_center: usize,
    pub zero_steering: usize,
    pub left_steering: usize,
    pub right_steering: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: LogSummary,
}
