//! Driving-log loading, frame preprocessing and batch supply for steering-angle regression.
//!
//! This crate provides utilities for:
//! - Reading `driving_log.csv` and checking it against the `IMG/` frame directory
//! - Seeded train/validation splitting
//! - Frame preprocessing (channel order, road-band crop, resize, normalization)
//! - An endless batch supplier with per-pass reshuffling
//! - Debug observers that snapshot batches to disk

// Module declarations
pub mod batch;
pub mod log;
pub mod monitor;
pub mod preprocess;
pub mod splits;
pub mod types;
pub mod validation;

// Re-export public API
pub use batch::{BatchSupplier, DiskFrames, FrameSource, SteeringBatch, SupplierConfig};
pub use log::{check_frame_count, count_frames, load_driving_log, read_driving_log, DrivingLog};
pub use monitor::{BatchObserver, BatchSnapshotWriter, BatchTraceWriter};
pub use preprocess::{CropBand, FramePipeline, FramePipelineBuilder};
pub use splits::split_train_val;
pub use types::*;
pub use validation::{summarize_log, validate_log, validate_summary};

#[cfg(feature = "burn-runtime")]
pub use batch::BurnBatch;
