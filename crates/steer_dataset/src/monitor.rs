//! Debug side channels hooked onto a supplier.

use crate::batch::SteeringBatch;
use crate::types::{DatasetResult, SteerDatasetError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const BATCH_SAMPLE_FILE: &str = "Xbatch_sample.npy";
pub const LABEL_BAG_FILE: &str = "y_bag.npy";

/// Called with every assembled batch, before labels are stripped for image-only output.
pub trait BatchObserver: Send {
    fn on_batch(&mut self, batch: &SteeringBatch) -> DatasetResult<()>;
}

/// Keeps the latest batch and every label seen so far on disk for offline inspection.
#[derive(Debug)]
pub struct BatchSnapshotWriter {
    dir: PathBuf,
    label_bag: Vec<f32>,
}

impl BatchSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> DatasetResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SteerDatasetError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            label_bag: Vec::new(),
        })
    }

    pub fn batch_path(&self) -> PathBuf {
        self.dir.join(BATCH_SAMPLE_FILE)
    }

    pub fn label_bag_path(&self) -> PathBuf {
        self.dir.join(LABEL_BAG_FILE)
    }

    pub fn label_bag(&self) -> &[f32] {
        &self.label_bag
    }
}

impl BatchObserver for BatchSnapshotWriter {
    fn on_batch(&mut self, batch: &SteeringBatch) -> DatasetResult<()> {
        if let Some(labels) = &batch.labels {
            self.label_bag.extend_from_slice(labels);
        }
        write_npy_f32(&self.label_bag_path(), &[self.label_bag.len()], &self.label_bag)?;
        write_npy_f32(&self.batch_path(), &batch.dims(), &batch.images)
    }
}

/// Appends one JSON line per batch.
#[derive(Debug)]
pub struct BatchTraceWriter {
    path: PathBuf,
    file: fs::File,
    batches: u64,
    started: Instant,
    last: Instant,
}

impl BatchTraceWriter {
    pub fn create(path: impl Into<PathBuf>) -> DatasetResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SteerDatasetError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SteerDatasetError::Io {
                path: path.clone(),
                source: e,
            })?;
        let now = Instant::now();
        Ok(Self {
            path,
            file,
            batches: 0,
            started: now,
            last: now,
        })
    }

    /// Trace file named by `STEER_DATASET_TRACE`, if set.
    pub fn from_env() -> DatasetResult<Option<Self>> {
        match std::env::var("STEER_DATASET_TRACE") {
            Ok(path) if !path.trim().is_empty() => Self::create(path.trim()).map(Some),
            _ => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatchObserver for BatchTraceWriter {
    fn on_batch(&mut self, batch: &SteeringBatch) -> DatasetResult<()> {
        let mean_label = batch
            .labels
            .as_ref()
            .filter(|l| !l.is_empty())
            .map(|l| l.iter().sum::<f32>() / l.len() as f32);
        let record = serde_json::json!({
            "batch": self.batches,
            "pass": batch.pass,
            "samples": batch.len(),
            "height": batch.shape.height,
            "width": batch.shape.width,
            "mean_label": mean_label,
            "first_reference": batch.references.first(),
            "since_last_ms": self.last.elapsed().as_secs_f64() * 1000.0,
            "timestamp_ms": self.started.elapsed().as_millis() as u64,
        });
        self.last = Instant::now();
        self.batches += 1;
        writeln!(self.file, "{record}").map_err(|e| SteerDatasetError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Write a little-endian f32 array in NumPy `.npy` format (version 1.0).
pub fn write_npy_f32(path: &Path, shape: &[usize], data: &[f32]) -> DatasetResult<()> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        return Err(SteerDatasetError::Other(format!(
            "npy shape {shape:?} needs {expected} values, got {}",
            data.len()
        )));
    }
    let dims = match shape {
        [single] => format!("({single},)"),
        _ => format!(
            "({})",
            shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {dims}, }}");
    // magic (6) + version (2) + header length (2) + header, padded to 64 bytes and ending in '\n'.
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + data.len() * 4);
    out.extend_from_slice(b"\x93NUMPY");
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, out).map_err(|e| SteerDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageShape;

    fn batch(labels: Vec<f32>) -> SteeringBatch {
        let shape = ImageShape::new(2, 2, 3);
        SteeringBatch {
            images: vec![0.25; labels.len() * shape.elements()],
            references: (0..labels.len()).map(|i| format!("f{i}.jpg")).collect(),
            labels: Some(labels),
            shape,
            pass: 0,
        }
    }

    #[test]
    fn npy_header_is_aligned() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.npy");
        write_npy_f32(&path, &[2, 3], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..6], b"\x93NUMPY");
        let header_len = u16::from_le_bytes([raw[8], raw[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let header = std::str::from_utf8(&raw[10..10 + header_len]).unwrap();
        assert!(header.contains("'shape': (2, 3)"), "{header}");
        assert!(header.ends_with('\n'));
        assert_eq!(raw.len(), 10 + header_len + 6 * 4);
        let last = f32::from_le_bytes(raw[raw.len() - 4..].try_into().unwrap());
        assert_eq!(last, 5.0);
    }

    #[test]
    fn npy_one_dimensional_shape_has_trailing_comma() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("v.npy");
        write_npy_f32(&path, &[3], &[1.0, 2.0, 3.0]).unwrap();
        let raw = fs::read(&path).unwrap();
        let header = String::from_utf8_lossy(&raw[10..]);
        assert!(header.contains("'shape': (3,)"));
    }

    #[test]
    fn npy_rejects_shape_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(write_npy_f32(&tmp.path().join("x.npy"), &[4], &[1.0]).is_err());
    }

    #[test]
    fn snapshot_accumulates_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = BatchSnapshotWriter::new(tmp.path().join("monitor")).unwrap();
        writer.on_batch(&batch(vec![0.1, 0.2])).unwrap();
        writer.on_batch(&batch(vec![-0.3, 0.0])).unwrap();
        assert_eq!(writer.label_bag(), &[0.1, 0.2, -0.3, 0.0]);
        assert!(writer.batch_path().exists());
        let bag = fs::read(writer.label_bag_path()).unwrap();
        let header_len = u16::from_le_bytes([bag[8], bag[9]]) as usize;
        assert_eq!(bag.len(), 10 + header_len + 4 * 4);
    }

    #[test]
    fn trace_appends_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs/trace.jsonl");
        let mut writer = BatchTraceWriter::create(&path).unwrap();
        writer.on_batch(&batch(vec![0.5, 0.5])).unwrap();
        writer.on_batch(&batch(vec![0.0, 1.0])).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["samples"], 2);
        assert_eq!(lines[1]["batch"], 1);
        assert_eq!(lines[1]["mean_label"], 0.5);
    }
}
