//! Unbounded batch supply for training and validation.

use crate::monitor::BatchObserver;
use crate::preprocess::FramePipeline;
use crate::types::{
    BatchContents, DatasetResult, DrivingSample, ImageShape, SteerDatasetError, SupplierMode,
    SupplierStats,
};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_LOG_EVERY_SAMPLES: usize = 1000;

/// Where frames come from. References are the strings stored in the driving log.
pub trait FrameSource: Send + Sync {
    fn load(&self, reference: &str) -> DatasetResult<RgbImage>;
}

/// Frames on disk, resolved relative to the dataset root.
#[derive(Debug, Clone)]
pub struct DiskFrames {
    root: PathBuf,
}

impl DiskFrames {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.root.join(reference.trim())
    }
}

impl FrameSource for DiskFrames {
    fn load(&self, reference: &str) -> DatasetResult<RgbImage> {
        let path = self.resolve(reference);
        let img = image::open(&path).map_err(|e| SteerDatasetError::Image {
            path: path.clone(),
            source: e,
        })?;
        Ok(img.to_rgb8())
    }
}

#[derive(Debug, Clone)]
pub struct SupplierConfig {
    pub batch_size: usize,
    pub mode: SupplierMode,
    pub contents: BatchContents,
    /// Probability of skipping a zero-steering sample in training mode.
    pub discard_zero_rate: f32,
    /// Seed for shuffling and the discard policy; entropy-seeded when None.
    pub seed: Option<u64>,
    /// Decode the frames of one batch on the rayon pool.
    pub parallel_load: bool,
    pub pipeline: FramePipeline,
}

impl Default for SupplierConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            mode: SupplierMode::Training,
            contents: BatchContents::ImagesAndLabels,
            discard_zero_rate: 0.0,
            seed: None,
            parallel_load: false,
            pipeline: FramePipeline::default(),
        }
    }
}

impl SupplierConfig {
    pub fn evaluation(mut self) -> Self {
        self.mode = SupplierMode::Evaluation;
        self.discard_zero_rate = 0.0;
        self
    }

    pub fn image_shape(&self) -> ImageShape {
        self.pipeline.target
    }
}

/// One supplied batch.
#[derive(Debug, Clone)]
pub struct SteeringBatch {
    /// Preprocessed frames, `[batch, channels, height, width]`.
    pub images: Vec<f32>,
    /// Steering targets in frame order; None when the supplier yields images only.
    pub labels: Option<Vec<f32>>,
    /// Driving-log references of the frames, in order.
    pub references: Vec<String>,
    pub shape: ImageShape,
    /// Pass the batch was assembled from (0-based).
    pub pass: usize,
}

impl SteeringBatch {
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn dims(&self) -> [usize; 4] {
        [
            self.len(),
            self.shape.channels,
            self.shape.height,
            self.shape.width,
        ]
    }

    /// Values of the `index`-th frame.
    pub fn image(&self, index: usize) -> &[f32] {
        let stride = self.shape.elements();
        &self.images[index * stride..(index + 1) * stride]
    }
}

#[cfg(feature = "burn-runtime")]
pub struct BurnBatch<B: burn::tensor::backend::Backend> {
    pub images: burn::tensor::Tensor<B, 4>,
    /// `[batch, 1]` steering targets.
    pub targets: Option<burn::tensor::Tensor<B, 2>>,
}

#[cfg(feature = "burn-runtime")]
impl SteeringBatch {
    pub fn to_burn<B: burn::tensor::backend::Backend>(&self, device: &B::Device) -> BurnBatch<B> {
        use burn::tensor::{Tensor, TensorData};
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(self.images.clone(), self.dims()),
            device,
        );
        let targets = self.labels.as_ref().map(|labels| {
            Tensor::<B, 2>::from_data(TensorData::new(labels.clone(), [labels.len(), 1]), device)
        });
        BurnBatch { images, targets }
    }
}

/// Endless, single-consumer batch stream over a private copy of the samples.
///
/// A pass walks the current order once. A batch that runs past the end of the
/// pass is completed from the start of the same order; the next pass (and, in
/// training mode, the reshuffle) begins with the following batch.
pub struct BatchSupplier<S: FrameSource = DiskFrames> {
    samples: Vec<DrivingSample>,
    order: Vec<usize>,
    cursor: usize,
    cfg: SupplierConfig,
    source: S,
    rng: StdRng,
    observers: Vec<Box<dyn BatchObserver>>,
    stats: SupplierStats,
    started: Instant,
    total_load_time: Duration,
    last_log: Instant,
    last_logged_samples: usize,
    log_every_samples: Option<usize>,
}

impl BatchSupplier<DiskFrames> {
    /// Supplier over frames stored under `image_root`.
    pub fn from_disk(
        samples: &[DrivingSample],
        image_root: &Path,
        cfg: SupplierConfig,
    ) -> DatasetResult<Self> {
        Self::new(samples, DiskFrames::new(image_root), cfg)
    }
}

impl<S: FrameSource> BatchSupplier<S> {
    /// Build from index-aligned references and labels.
    pub fn create(
        references: &[String],
        labels: &[f32],
        source: S,
        cfg: SupplierConfig,
    ) -> DatasetResult<Self> {
        if references.len() != labels.len() {
            return Err(SteerDatasetError::LengthMismatch {
                samples: references.len(),
                labels: labels.len(),
            });
        }
        let samples: Vec<DrivingSample> = references
            .iter()
            .zip(labels)
            .map(|(reference, &label)| DrivingSample::new(reference.clone(), label))
            .collect();
        Self::new(&samples, source, cfg)
    }

    pub fn new(samples: &[DrivingSample], source: S, cfg: SupplierConfig) -> DatasetResult<Self> {
        if samples.is_empty() {
            return Err(SteerDatasetError::EmptyDataset);
        }
        if cfg.batch_size == 0 || cfg.batch_size > samples.len() {
            return Err(SteerDatasetError::BatchTooLarge {
                batch_size: cfg.batch_size,
                len: samples.len(),
            });
        }
        cfg.image_shape().validate()?;
        if !(0.0..=1.0).contains(&cfg.discard_zero_rate) {
            return Err(SteerDatasetError::Other(format!(
                "discard_zero_rate {} must be within [0, 1]",
                cfg.discard_zero_rate
            )));
        }

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut order: Vec<usize> = (0..samples.len()).collect();
        if cfg.mode == SupplierMode::Training {
            order.shuffle(&mut rng);
        }
        let log_every_samples = match std::env::var("STEER_DATASET_LOG_EVERY") {
            Ok(val) => {
                if val.eq_ignore_ascii_case("off") || val.trim() == "0" {
                    None
                } else {
                    val.trim().parse::<usize>().ok().filter(|v| *v > 0)
                }
            }
            Err(_) => Some(DEFAULT_LOG_EVERY_SAMPLES),
        };
        tracing::debug!(
            mode = ?cfg.mode,
            samples = samples.len(),
            batch_size = cfg.batch_size,
            pipeline = %cfg.pipeline.describe(),
            "batch supplier ready"
        );
        let now = Instant::now();
        Ok(Self {
            samples: samples.to_vec(),
            order,
            cursor: 0,
            cfg,
            source,
            rng,
            observers: Vec::new(),
            stats: SupplierStats::default(),
            started: now,
            total_load_time: Duration::ZERO,
            last_log: now,
            last_logged_samples: 0,
            log_every_samples,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn BatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.cfg.batch_size
    }

    pub fn mode(&self) -> SupplierMode {
        self.cfg.mode
    }

    pub fn stats(&self) -> SupplierStats {
        self.stats
    }

    /// Batches needed to touch every sample once.
    pub fn batches_per_pass(&self) -> usize {
        self.samples.len().div_ceil(self.cfg.batch_size)
    }

    /// Assemble the next batch. Never runs dry; errors are frame load failures.
    pub fn next_batch(&mut self) -> DatasetResult<SteeringBatch> {
        let pass = self.stats.passes;
        let (picks, wrapped) = self.pick_indices();

        let t_load = Instant::now();
        let frames = self.load_frames(&picks)?;
        self.total_load_time += t_load.elapsed();

        let stride = self.cfg.image_shape().elements();
        let mut images = Vec::with_capacity(picks.len() * stride);
        for frame in frames {
            images.extend_from_slice(&frame);
        }
        let labels: Vec<f32> = picks.iter().map(|&i| self.samples[i].steering).collect();
        let references: Vec<String> = picks
            .iter()
            .map(|&i| self.samples[i].image.clone())
            .collect();

        if wrapped || self.cursor >= self.order.len() {
            self.end_pass();
        }

        let mut batch = SteeringBatch {
            images,
            labels: Some(labels),
            references,
            shape: self.cfg.image_shape(),
            pass,
        };
        self.stats.batches += 1;
        self.stats.samples += batch.len();
        for observer in self.observers.iter_mut() {
            observer.on_batch(&batch)?;
        }
        self.maybe_log_progress();

        if self.cfg.contents == BatchContents::ImagesOnly {
            batch.labels = None;
        }
        Ok(batch)
    }

    /// Walk the order from the cursor; report whether the batch ran past the pass end.
    fn pick_indices(&mut self) -> (Vec<usize>, bool) {
        let n = self.order.len();
        let mut picks = Vec::with_capacity(self.cfg.batch_size);
        let mut wrapped = false;
        let mut consecutive_discards = 0usize;
        while picks.len() < self.cfg.batch_size {
            if self.cursor >= n {
                self.cursor = 0;
                wrapped = true;
            }
            let idx = self.order[self.cursor];
            self.cursor += 1;
            // A whole pass of discards means only zero labels remain; stop skipping.
            if consecutive_discards < n && self.should_discard(idx) {
                consecutive_discards += 1;
                self.stats.discarded += 1;
                continue;
            }
            consecutive_discards = 0;
            picks.push(idx);
        }
        (picks, wrapped)
    }

    fn should_discard(&mut self, idx: usize) -> bool {
        self.cfg.mode == SupplierMode::Training
            && self.cfg.discard_zero_rate > 0.0
            && self.samples[idx].steering == 0.0
            && self.rng.random::<f32>() < self.cfg.discard_zero_rate
    }

    fn end_pass(&mut self) {
        self.stats.passes += 1;
        self.cursor = 0;
        if self.cfg.mode == SupplierMode::Training {
            self.order.shuffle(&mut self.rng);
        }
        tracing::debug!(
            mode = ?self.cfg.mode,
            passes = self.stats.passes,
            "pass complete"
        );
    }

    fn load_frames(&self, picks: &[usize]) -> DatasetResult<Vec<Vec<f32>>> {
        let samples = &self.samples;
        let source = &self.source;
        let pipeline = &self.cfg.pipeline;
        let load_one = |idx: &usize| -> DatasetResult<Vec<f32>> {
            let reference = &samples[*idx].image;
            let img = source.load(reference)?;
            pipeline.apply(img, reference)
        };
        if self.cfg.parallel_load && picks.len() > 1 {
            picks.par_iter().map(load_one).collect()
        } else {
            picks.iter().map(load_one).collect()
        }
    }

    fn maybe_log_progress(&mut self) {
        let Some(threshold) = self.log_every_samples else {
            return;
        };
        let processed_since = self.stats.samples.saturating_sub(self.last_logged_samples);
        let should_log =
            processed_since >= threshold || self.last_log.elapsed() >= Duration::from_secs(30);
        if !should_log {
            return;
        }
        let secs = self.started.elapsed().as_secs_f32().max(0.001);
        let avg_load_ms = if self.stats.batches > 0 {
            (self.total_load_time.as_secs_f64() * 1000.0) / self.stats.batches as f64
        } else {
            0.0
        };
        tracing::info!(
            mode = ?self.cfg.mode,
            batches = self.stats.batches,
            samples = self.stats.samples,
            passes = self.stats.passes,
            discarded = self.stats.discarded,
            rate = format_args!("{:.1} img/s", self.stats.samples as f32 / secs),
            avg_load_ms = format_args!("{avg_load_ms:.2}"),
            "supplier progress"
        );
        self.last_logged_samples = self.stats.samples;
        self.last_log = Instant::now();
    }
}

impl<S: FrameSource> Iterator for BatchSupplier<S> {
    type Item = DatasetResult<SteeringBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// 160x320 frames whose red channel encodes the reference length.
    struct SyntheticFrames;

    impl FrameSource for SyntheticFrames {
        fn load(&self, reference: &str) -> DatasetResult<RgbImage> {
            if reference.starts_with("missing") {
                return Err(SteerDatasetError::Other(format!("no frame {reference}")));
            }
            let shade = (reference.len() * 10 % 256) as u8;
            Ok(RgbImage::from_pixel(320, 160, Rgb([shade, 0, 255])))
        }
    }

    fn cfg(batch_size: usize, mode: SupplierMode) -> SupplierConfig {
        SupplierConfig {
            batch_size,
            mode,
            seed: Some(13),
            pipeline: FramePipeline::builder()
                .target(ImageShape::new(8, 8, 3))
                .build(),
            ..Default::default()
        }
    }

    fn refs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("IMG/center_{i}.jpg")).collect()
    }

    #[test]
    fn evaluation_scenario_yields_log_order() {
        let references: Vec<String> = ["a.jpg", "b.jpg", "c.jpg", "d.jpg"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let labels = [0.0, 0.1, -0.1, 0.0];
        let mut supplier = BatchSupplier::create(
            &references,
            &labels,
            SyntheticFrames,
            cfg(2, SupplierMode::Evaluation),
        )
        .unwrap();

        let first = supplier.next_batch().unwrap();
        assert_eq!(first.references, vec!["a.jpg", "b.jpg"]);
        assert_eq!(first.labels, Some(vec![0.0, 0.1]));
        let second = supplier.next_batch().unwrap();
        assert_eq!(second.references, vec!["c.jpg", "d.jpg"]);
        assert_eq!(second.labels, Some(vec![-0.1, 0.0]));
        let third = supplier.next_batch().unwrap();
        assert_eq!(third.references, vec!["a.jpg", "b.jpg"]);
        assert_eq!(supplier.stats().passes, 1);
    }

    #[test]
    fn batches_have_configured_shape_and_range() {
        let mut supplier = BatchSupplier::create(
            &refs(10),
            &[0.3; 10],
            SyntheticFrames,
            cfg(4, SupplierMode::Training),
        )
        .unwrap();
        for batch in supplier.by_ref().take(5) {
            let batch = batch.unwrap();
            assert_eq!(batch.dims(), [4, 3, 8, 8]);
            assert_eq!(batch.images.len(), 4 * 3 * 8 * 8);
            assert!(batch.images.iter().all(|v| (-0.5..=0.5).contains(v)));
            assert_eq!(batch.labels.as_ref().map(Vec::len), Some(4));
        }
    }

    #[test]
    fn labels_follow_their_frames() {
        let references = refs(9);
        let labels: Vec<f32> = (0..9).map(|i| i as f32 * 0.125 - 0.5).collect();
        let mut supplier = BatchSupplier::create(
            &references,
            &labels,
            SyntheticFrames,
            cfg(4, SupplierMode::Training),
        )
        .unwrap();
        for _ in 0..6 {
            let batch = supplier.next_batch().unwrap();
            let batch_labels = batch.labels.unwrap();
            for (reference, label) in batch.references.iter().zip(batch_labels) {
                let idx = references.iter().position(|r| r == reference).unwrap();
                assert_eq!(label, labels[idx]);
            }
        }
    }

    #[test]
    fn one_pass_covers_every_sample() {
        let references = refs(10);
        let mut supplier = BatchSupplier::create(
            &references,
            &[0.0; 10],
            SyntheticFrames,
            cfg(3, SupplierMode::Training),
        )
        .unwrap();
        let mut seen = HashSet::new();
        for _ in 0..supplier.batches_per_pass() {
            seen.extend(supplier.next_batch().unwrap().references);
        }
        assert_eq!(seen.len(), 10);
        assert_eq!(supplier.stats().passes, 1);
    }

    #[test]
    fn wrapped_batch_is_completed_from_the_same_order() {
        let references = refs(5);
        let mut supplier = BatchSupplier::create(
            &references,
            &[0.1; 5],
            SyntheticFrames,
            cfg(2, SupplierMode::Evaluation),
        )
        .unwrap();
        let pulls: Vec<Vec<String>> = (0..4)
            .map(|_| supplier.next_batch().unwrap().references)
            .collect();
        assert_eq!(pulls[2], vec![references[4].clone(), references[0].clone()]);
        assert_eq!(pulls[3], vec![references[0].clone(), references[1].clone()]);
    }

    #[test]
    fn training_reshuffles_between_passes_only() {
        let references = refs(12);
        let mut supplier = BatchSupplier::create(
            &references,
            &[0.2; 12],
            SyntheticFrames,
            cfg(4, SupplierMode::Training),
        )
        .unwrap();
        let mut passes: Vec<Vec<String>> = Vec::new();
        for _ in 0..4 {
            let mut pass = Vec::new();
            for _ in 0..3 {
                let batch = supplier.next_batch().unwrap();
                assert_eq!(batch.pass, passes.len());
                pass.extend(batch.references);
            }
            let mut sorted = pass.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), 12, "each pass is a permutation");
            passes.push(pass);
        }
        assert!(
            passes.windows(2).any(|w| w[0] != w[1]),
            "order should change between passes"
        );
    }

    #[test]
    fn training_shuffles_before_first_pass() {
        let references = refs(16);
        let first_pass = |mode: SupplierMode| -> Vec<String> {
            let mut supplier =
                BatchSupplier::create(&references, &[0.1; 16], SyntheticFrames, cfg(4, mode))
                    .unwrap();
            (0..4)
                .flat_map(|_| supplier.next_batch().unwrap().references)
                .collect()
        };
        let training = first_pass(SupplierMode::Training);
        assert_ne!(training, references);
        let mut sorted = training.clone();
        sorted.sort();
        let mut expected = references.clone();
        expected.sort();
        assert_eq!(sorted, expected);
        assert_eq!(first_pass(SupplierMode::Evaluation), references);
    }

    #[test]
    fn evaluation_never_reorders() {
        let references = refs(6);
        let mut supplier = BatchSupplier::create(
            &references,
            &[0.0; 6],
            SyntheticFrames,
            SupplierConfig {
                discard_zero_rate: 1.0,
                ..cfg(3, SupplierMode::Evaluation)
            },
        )
        .unwrap();
        for _ in 0..3 {
            let a = supplier.next_batch().unwrap().references;
            let b = supplier.next_batch().unwrap().references;
            assert_eq!(a, references[..3].to_vec());
            assert_eq!(b, references[3..].to_vec());
        }
        assert_eq!(supplier.stats().discarded, 0);
    }

    #[test]
    fn discard_policy_skips_zero_labels() {
        let references = refs(8);
        let labels = [0.0, 0.4, 0.0, -0.4, 0.0, 0.2, 0.0, -0.2];
        let mut supplier = BatchSupplier::create(
            &references,
            &labels,
            SyntheticFrames,
            SupplierConfig {
                discard_zero_rate: 1.0,
                ..cfg(2, SupplierMode::Training)
            },
        )
        .unwrap();
        for _ in 0..8 {
            let batch = supplier.next_batch().unwrap();
            assert!(batch.labels.unwrap().iter().all(|v| *v != 0.0));
        }
        assert!(supplier.stats().discarded > 0);
    }

    #[test]
    fn discard_policy_gives_up_on_all_zero_data() {
        let mut supplier = BatchSupplier::create(
            &refs(4),
            &[0.0; 4],
            SyntheticFrames,
            SupplierConfig {
                discard_zero_rate: 1.0,
                ..cfg(2, SupplierMode::Training)
            },
        )
        .unwrap();
        let batch = supplier.next_batch().unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn images_only_drops_labels() {
        let mut supplier = BatchSupplier::create(
            &refs(4),
            &[0.5; 4],
            SyntheticFrames,
            SupplierConfig {
                contents: BatchContents::ImagesOnly,
                ..cfg(2, SupplierMode::Evaluation)
            },
        )
        .unwrap();
        let batch = supplier.next_batch().unwrap();
        assert!(batch.labels.is_none());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn rejects_invalid_construction() {
        let err = BatchSupplier::create(
            &refs(3),
            &[0.0; 2],
            SyntheticFrames,
            cfg(1, SupplierMode::Evaluation),
        );
        assert!(matches!(err, Err(SteerDatasetError::LengthMismatch { .. })));

        let err = BatchSupplier::create(
            &refs(3),
            &[0.0; 3],
            SyntheticFrames,
            cfg(4, SupplierMode::Evaluation),
        );
        assert!(matches!(
            err,
            Err(SteerDatasetError::BatchTooLarge {
                batch_size: 4,
                len: 3
            })
        ));

        let err = BatchSupplier::create(&[], &[], SyntheticFrames, cfg(1, SupplierMode::Training));
        assert!(matches!(err, Err(SteerDatasetError::EmptyDataset)));

        let mut bad_shape = cfg(1, SupplierMode::Training);
        bad_shape.pipeline.target = ImageShape::new(8, 8, 1);
        let err = BatchSupplier::create(&refs(2), &[0.0; 2], SyntheticFrames, bad_shape);
        assert!(matches!(err, Err(SteerDatasetError::InvalidShape(_))));
    }

    #[test]
    fn load_failures_propagate() {
        let references = vec!["IMG/ok.jpg".to_string(), "missing.jpg".to_string()];
        let mut supplier = BatchSupplier::create(
            &references,
            &[0.0, 0.0],
            SyntheticFrames,
            cfg(2, SupplierMode::Evaluation),
        )
        .unwrap();
        assert!(supplier.next_batch().is_err());
    }

    #[test]
    fn parallel_load_preserves_order() {
        let references = refs(6);
        let sequential: Vec<SteeringBatch> = BatchSupplier::create(
            &references,
            &[0.1; 6],
            SyntheticFrames,
            cfg(3, SupplierMode::Evaluation),
        )
        .unwrap()
        .take(2)
        .collect::<DatasetResult<_>>()
        .unwrap();
        let parallel: Vec<SteeringBatch> = BatchSupplier::create(
            &references,
            &[0.1; 6],
            SyntheticFrames,
            SupplierConfig {
                parallel_load: true,
                ..cfg(3, SupplierMode::Evaluation)
            },
        )
        .unwrap()
        .take(2)
        .collect::<DatasetResult<_>>()
        .unwrap();
        for (a, b) in sequential.iter().zip(&parallel) {
            assert_eq!(a.references, b.references);
            assert_eq!(a.images, b.images);
        }
    }

    #[test]
    fn observers_see_labels_even_when_images_only() {
        struct Collect(Arc<Mutex<Vec<f32>>>);
        impl BatchObserver for Collect {
            fn on_batch(&mut self, batch: &SteeringBatch) -> DatasetResult<()> {
                if let Some(labels) = &batch.labels {
                    self.0.lock().unwrap().extend_from_slice(labels);
                }
                Ok(())
            }
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut supplier = BatchSupplier::create(
            &refs(4),
            &[0.1, 0.2, 0.3, 0.4],
            SyntheticFrames,
            SupplierConfig {
                contents: BatchContents::ImagesOnly,
                ..cfg(2, SupplierMode::Evaluation)
            },
        )
        .unwrap()
        .with_observer(Box::new(Collect(seen.clone())));
        supplier.next_batch().unwrap();
        supplier.next_batch().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn disk_frames_trim_references() {
        let frames = DiskFrames::new("/data");
        assert_eq!(
            frames.resolve(" IMG/left_1.jpg"),
            PathBuf::from("/data/IMG/left_1.jpg")
        );
    }
}
