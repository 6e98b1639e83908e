use std::path::{Path, PathBuf};

use clap::ValueEnum;
use models::SteeringNetConfig;
use serde::Deserialize;
use steer_dataset::{ChannelOrder, FramePipeline, ImageShape, SupplierConfig, SupplierMode};

pub const DEFAULT_CONFIG_NAME: &str = "steer-train.toml";
pub const CONFIG_ENV: &str = "STEER_TRAIN_CONFIG";

/// Channel order of the decoded frames as named on the command line and in the config file.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameOrder {
    Rgb,
    Bgr,
}

impl From<FrameOrder> for ChannelOrder {
    fn from(order: FrameOrder) -> Self {
        match order {
            FrameOrder::Rgb => ChannelOrder::Rgb,
            FrameOrder::Bgr => ChannelOrder::Bgr,
        }
    }
}

/// Fully resolved training settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub data_root: PathBuf,
    pub output_dir: PathBuf,
    pub val_ratio: f32,
    pub seed: u64,
    pub frame_order: FrameOrder,
    pub parallel_load: bool,
    pub shape: ImageShape,
    pub batch_size: usize,
    pub epochs: usize,
    /// Batches per epoch; `batch_size` when unset.
    pub steps_per_epoch: Option<usize>,
    pub lr: f32,
    pub patience: usize,
    pub min_delta: f32,
    pub discard_zero_rate: f32,
    pub monitor_dir: Option<PathBuf>,
    pub trace_path: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            val_ratio: 0.2,
            seed: 13,
            frame_order: FrameOrder::Rgb,
            parallel_load: false,
            shape: ImageShape::new(128, 128, 3),
            batch_size: 32,
            epochs: 2,
            steps_per_epoch: None,
            lr: 0.01,
            patience: 15,
            min_delta: 0.0,
            discard_zero_rate: 0.0,
            monitor_dir: None,
            trace_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrainConfigFile {
    data: Option<DataSection>,
    model: Option<ModelSection>,
    train: Option<TrainSection>,
    debug: Option<DebugSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DataSection {
    root: Option<String>,
    val_ratio: Option<f32>,
    seed: Option<u64>,
    frame_order: Option<FrameOrder>,
    parallel_load: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelSection {
    height: Option<usize>,
    width: Option<usize>,
    channels: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrainSection {
    output_dir: Option<String>,
    batch_size: Option<usize>,
    epochs: Option<usize>,
    steps_per_epoch: Option<usize>,
    lr: Option<f32>,
    patience: Option<usize>,
    min_delta: Option<f32>,
    discard_zero_rate: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DebugSection {
    monitor_dir: Option<String>,
    trace: Option<String>,
}

impl TrainConfig {
    /// Resolve the config file: `explicit`, then `$STEER_TRAIN_CONFIG`, then
    /// `steer-train.toml` in the working directory if present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Self::from_path(&expand_path(path.trim()));
            }
        }
        let default_path = Path::new(DEFAULT_CONFIG_NAME);
        if default_path.exists() {
            return Self::from_path(default_path);
        }
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let cfg = Self::from_toml(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded training config");
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let file: TrainConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: TrainConfigFile) -> Self {
        let mut cfg = Self::default();
        if let Some(data) = file.data {
            if let Some(root) = data.root {
                cfg.data_root = expand_path(&root);
            }
            cfg.val_ratio = data.val_ratio.unwrap_or(cfg.val_ratio);
            cfg.seed = data.seed.unwrap_or(cfg.seed);
            cfg.frame_order = data.frame_order.unwrap_or(cfg.frame_order);
            cfg.parallel_load = data.parallel_load.unwrap_or(cfg.parallel_load);
        }
        if let Some(model) = file.model {
            cfg.shape = ImageShape::new(
                model.height.unwrap_or(cfg.shape.height),
                model.width.unwrap_or(cfg.shape.width),
                model.channels.unwrap_or(cfg.shape.channels),
            );
        }
        if let Some(train) = file.train {
            if let Some(dir) = train.output_dir {
                cfg.output_dir = expand_path(&dir);
            }
            cfg.batch_size = train.batch_size.unwrap_or(cfg.batch_size);
            cfg.epochs = train.epochs.unwrap_or(cfg.epochs);
            cfg.steps_per_epoch = train.steps_per_epoch.or(cfg.steps_per_epoch);
            cfg.lr = train.lr.unwrap_or(cfg.lr);
            cfg.patience = train.patience.unwrap_or(cfg.patience);
            cfg.min_delta = train.min_delta.unwrap_or(cfg.min_delta);
            cfg.discard_zero_rate = train.discard_zero_rate.unwrap_or(cfg.discard_zero_rate);
        }
        if let Some(debug) = file.debug {
            cfg.monitor_dir = debug.monitor_dir.map(|v| expand_path(&v));
            cfg.trace_path = debug.trace.map(|v| expand_path(&v));
        }
        cfg
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..1.0).contains(&self.val_ratio) {
            anyhow::bail!("val_ratio {} must be in [0, 1)", self.val_ratio);
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        if self.epochs == 0 {
            anyhow::bail!("epochs must be positive");
        }
        if self.steps_per_epoch == Some(0) {
            anyhow::bail!("steps_per_epoch must be positive");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            anyhow::bail!("lr {} must be positive", self.lr);
        }
        self.shape
            .validate()
            .map_err(|e| anyhow::anyhow!("model input: {e}"))?;
        self.model()
            .check()
            .map_err(|e| anyhow::anyhow!("model: {e}"))?;
        Ok(())
    }

    pub fn steps_per_epoch(&self) -> usize {
        self.steps_per_epoch.unwrap_or(self.batch_size)
    }

    pub fn model(&self) -> SteeringNetConfig {
        SteeringNetConfig::default().with_input(
            self.shape.height,
            self.shape.width,
            self.shape.channels,
        )
    }

    pub fn supplier(&self, mode: SupplierMode) -> SupplierConfig {
        let pipeline = FramePipeline::builder()
            .target(self.shape)
            .source_order(self.frame_order.into())
            .build();
        let cfg = SupplierConfig {
            batch_size: self.batch_size,
            mode,
            discard_zero_rate: self.discard_zero_rate,
            seed: Some(self.seed),
            parallel_load: self.parallel_load,
            pipeline,
            ..Default::default()
        };
        match mode {
            SupplierMode::Training => cfg,
            SupplierMode::Evaluation => cfg.evaluation(),
        }
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

/// Substitute `${VAR}` with the environment value; unknown variables are left as written.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
