use burn::backend::Autodiff;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::fs;
use std::path::{Path, PathBuf};
use steer_dataset::{
    load_driving_log, split_train_val, validate_log, BatchSnapshotWriter, BatchSupplier,
    BatchTraceWriter, DiskFrames, ImageShape, SupplierMode, ValidationOutcome,
};

use crate::callbacks::{BestCheckpoint, EarlyStopping, EpochAction, EpochMetrics};
use crate::config::{FrameOrder, TrainConfig};
use crate::history::TrainingHistory;
use crate::{SteeringNet, SteeringNetConfig, TrainBackend};
use clap::{Parser, ValueEnum};

pub const BEST_CHECKPOINT_FILE: &str = "best_model.bin";
pub const FINAL_CHECKPOINT_FILE: &str = "model.bin";
pub const TOPOLOGY_FILE: &str = "model.json";
pub const HISTORY_FILE: &str = "train_history.json";

pub fn load_steering_net_from_checkpoint<P: AsRef<Path>>(
    path: P,
    cfg: SteeringNetConfig,
    device: &<TrainBackend as Backend>::Device,
) -> Result<SteeringNet<TrainBackend>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    SteeringNet::<TrainBackend>::new(cfg, device).load_file(path.as_ref(), &recorder, device)
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "train",
    about = "Train the steering-angle regressor on a recorded driving log"
)]
pub struct TrainArgs {
    /// TOML config file (defaults to $STEER_TRAIN_CONFIG, then ./steer-train.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
    /// Dataset root containing driving_log.csv and IMG/.
    #[arg(long)]
    pub data_root: Option<PathBuf>,
    /// Directory for checkpoints, topology and history.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Fraction of rows held out for validation.
    #[arg(long)]
    pub val_ratio: Option<f32>,
    /// Seed for the split and batch shuffling.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Channel order of the decoded frames.
    #[arg(long, value_enum)]
    pub frame_order: Option<FrameOrder>,
    /// Model input height.
    #[arg(long)]
    pub height: Option<usize>,
    /// Model input width.
    #[arg(long)]
    pub width: Option<usize>,
    /// Batch size.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Number of epochs.
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Training batches per epoch (defaults to the batch size).
    #[arg(long)]
    pub steps_per_epoch: Option<usize>,
    /// Learning rate.
    #[arg(long)]
    pub lr: Option<f32>,
    /// Epochs without improvement before stopping.
    #[arg(long)]
    pub patience: Option<usize>,
    /// Minimum loss decrease that counts as improvement.
    #[arg(long)]
    pub min_delta: Option<f32>,
    /// Probability of skipping zero-steering rows while training.
    #[arg(long)]
    pub discard_zero_rate: Option<f32>,
    /// Write Xbatch_sample.npy / y_bag.npy here after every training batch.
    #[arg(long)]
    pub monitor_dir: Option<PathBuf>,
    /// Append one JSON line per training batch to this file.
    #[arg(long)]
    pub trace: Option<PathBuf>,
    /// Decode the frames of each batch on the rayon pool.
    #[arg(long)]
    pub parallel_load: bool,
    /// Check the dataset and exit without training.
    #[arg(long)]
    pub validate_only: bool,
}

impl TrainArgs {
    /// Layer command-line overrides on top of `cfg`.
    pub fn apply(&self, cfg: &mut TrainConfig) {
        if let Some(root) = &self.data_root {
            cfg.data_root = root.clone();
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        cfg.val_ratio = self.val_ratio.unwrap_or(cfg.val_ratio);
        cfg.seed = self.seed.unwrap_or(cfg.seed);
        cfg.frame_order = self.frame_order.unwrap_or(cfg.frame_order);
        cfg.shape = ImageShape::new(
            self.height.unwrap_or(cfg.shape.height),
            self.width.unwrap_or(cfg.shape.width),
            cfg.shape.channels,
        );
        cfg.batch_size = self.batch_size.unwrap_or(cfg.batch_size);
        cfg.epochs = self.epochs.unwrap_or(cfg.epochs);
        cfg.steps_per_epoch = self.steps_per_epoch.or(cfg.steps_per_epoch);
        cfg.lr = self.lr.unwrap_or(cfg.lr);
        cfg.patience = self.patience.unwrap_or(cfg.patience);
        cfg.min_delta = self.min_delta.unwrap_or(cfg.min_delta);
        cfg.discard_zero_rate = self.discard_zero_rate.unwrap_or(cfg.discard_zero_rate);
        if self.monitor_dir.is_some() {
            cfg.monitor_dir = self.monitor_dir.clone();
        }
        if self.trace.is_some() {
            cfg.trace_path = self.trace.clone();
        }
        if self.parallel_load {
            cfg.parallel_load = true;
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub output_dir: PathBuf,
    pub history: TrainingHistory,
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<Option<TrainReport>> {
    check_backend(args.backend.unwrap_or_else(compiled_backend))?;

    let mut cfg = TrainConfig::load(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let log = load_driving_log(&cfg.data_root).map_err(|e| {
        anyhow::anyhow!(
            "failed to load driving log under {}: {e}",
            cfg.data_root.display()
        )
    })?;
    let report = validate_log(&log)?;
    for reason in &report.reasons {
        tracing::warn!(outcome = report.outcome.as_str(), "{reason}");
    }
    tracing::info!(
        outcome = report.outcome.as_str(),
        rows = report.summary.rows,
        zero = report.summary.zero_steering,
        left = report.summary.left_steering,
        right = report.summary.right_steering,
        "dataset check"
    );
    if report.outcome == ValidationOutcome::Fail {
        anyhow::bail!(
            "dataset under {} failed validation: {}",
            cfg.data_root.display(),
            report.reasons.join("; ")
        );
    }
    if args.validate_only {
        return Ok(None);
    }

    let report = train_on_log(&cfg, log.samples)?;
    Ok(Some(report))
}

type ADBackend = Autodiff<TrainBackend>;

/// Split, train with early stopping, and write every artifact to `cfg.output_dir`.
pub fn train_on_log(
    cfg: &TrainConfig,
    samples: Vec<steer_dataset::DrivingSample>,
) -> anyhow::Result<TrainReport> {
    fs::create_dir_all(&cfg.output_dir)?;
    let (train, val) = split_train_val(samples, cfg.val_ratio, cfg.seed);
    tracing::info!(train = train.len(), val = val.len(), "split driving log");
    if train.is_empty() {
        anyhow::bail!("no training rows left after holding out validation");
    }

    let mut train_supplier = BatchSupplier::new(
        &train,
        DiskFrames::new(&cfg.data_root),
        cfg.supplier(SupplierMode::Training),
    )?;
    if let Some(dir) = &cfg.monitor_dir {
        train_supplier = train_supplier.with_observer(Box::new(BatchSnapshotWriter::new(dir)?));
    }
    let trace = match &cfg.trace_path {
        Some(path) => Some(BatchTraceWriter::create(path)?),
        None => BatchTraceWriter::from_env()?,
    };
    if let Some(trace) = trace {
        tracing::info!(path = %trace.path().display(), "tracing training batches");
        train_supplier = train_supplier.with_observer(Box::new(trace));
    }

    let validation_steps = val.len() / cfg.batch_size;
    let mut val_supplier = if validation_steps == 0 {
        tracing::warn!(
            val = val.len(),
            batch_size = cfg.batch_size,
            "validation set smaller than one batch; skipping validation"
        );
        None
    } else {
        Some(BatchSupplier::new(
            &val,
            DiskFrames::new(&cfg.data_root),
            cfg.supplier(SupplierMode::Evaluation),
        )?)
    };

    let device = <ADBackend as Backend>::Device::default();
    let mut model = SteeringNet::<ADBackend>::new(cfg.model(), &device);
    tracing::info!("model summary\n{}", model.topology().render());
    let mut optim = SgdConfig::new().init();
    let mse = MseLoss::new();

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let best_path = cfg.output_dir.join(BEST_CHECKPOINT_FILE);
    let mut early_stop = EarlyStopping::new(cfg.patience, cfg.min_delta);
    let mut best = BestCheckpoint::new();
    let mut history = TrainingHistory::default();
    let steps = cfg.steps_per_epoch();

    for epoch in 0..cfg.epochs {
        let mut losses = Vec::with_capacity(steps);
        for _ in 0..steps {
            let batch = train_supplier.next_batch()?.to_burn::<ADBackend>(&device);
            let targets = batch
                .targets
                .ok_or_else(|| anyhow::anyhow!("training batch carries no labels"))?;
            let preds = model.forward(batch.images);
            let loss = mse.forward(preds, targets, Reduction::Mean);
            let loss_detached = loss.clone().detach();
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr as f64, model, grads);
            losses.push(scalar(loss_detached)?);
        }
        let loss = mean(&losses);

        let val_loss = match val_supplier.as_mut() {
            Some(supplier) => {
                let eval_model = model.valid();
                let mut val_losses = Vec::with_capacity(validation_steps);
                for _ in 0..validation_steps {
                    let batch = supplier.next_batch()?.to_burn::<TrainBackend>(&device);
                    let targets = batch
                        .targets
                        .ok_or_else(|| anyhow::anyhow!("validation batch carries no labels"))?;
                    let preds = eval_model.forward(batch.images);
                    val_losses.push(scalar(mse.forward(preds, targets, Reduction::Mean))?);
                }
                Some(mean(&val_losses))
            }
            None => None,
        };

        let metrics = EpochMetrics {
            epoch,
            loss,
            val_loss,
        };
        history.record(&metrics);
        tracing::info!(
            epoch,
            loss = format_args!("{loss:.4}"),
            val_loss = ?val_loss,
            "epoch complete"
        );

        if best.improved(&metrics) {
            model
                .clone()
                .save_file(&best_path, &recorder)
                .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))?;
            tracing::info!(
                epoch,
                loss = metrics.monitored(),
                path = %best_path.display(),
                "saved best checkpoint"
            );
        }
        if early_stop.on_epoch_end(&metrics) == EpochAction::Stop {
            history.stopped_early = true;
            break;
        }
    }
    history.best_epoch = best.best_epoch();

    let final_path = cfg.output_dir.join(FINAL_CHECKPOINT_FILE);
    model
        .clone()
        .save_file(&final_path, &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))?;
    fs::write(
        cfg.output_dir.join(TOPOLOGY_FILE),
        serde_json::to_string_pretty(&model.topology())?,
    )?;
    history.save(&cfg.output_dir.join(HISTORY_FILE))?;

    let stats = train_supplier.stats();
    tracing::info!(
        epochs = history.epochs(),
        stopped_early = history.stopped_early,
        batches = stats.batches,
        passes = stats.passes,
        discarded = stats.discarded,
        output = %cfg.output_dir.display(),
        "training finished"
    );
    Ok(TrainReport {
        output_dir: cfg.output_dir.clone(),
        history,
    })
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> anyhow::Result<f32> {
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read loss tensor: {e:?}"))?;
    values
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("loss tensor is empty"))
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Backend `TrainBackend` resolves to in this build.
pub fn compiled_backend() -> BackendKind {
    if cfg!(feature = "backend-wgpu") {
        BackendKind::Wgpu
    } else {
        BackendKind::NdArray
    }
}

/// Reject a `--backend` this binary cannot train on.
pub fn check_backend(requested: BackendKind) -> anyhow::Result<()> {
    match (requested, compiled_backend()) {
        (BackendKind::Wgpu, BackendKind::NdArray) => anyhow::bail!(
            "--backend wgpu needs a train binary built with the backend-wgpu feature"
        ),
        (BackendKind::NdArray, BackendKind::Wgpu) => {
            tracing::warn!("--backend ndarray ignored; this train binary runs on wgpu");
        }
        _ => {}
    }
    Ok(())
}
