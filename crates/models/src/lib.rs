//! Burn models for steering-angle regression.
//!
//! `SteeringNet` maps a preprocessed camera frame `[B, 3, H, W]` to one steering
//! value per frame `[B, 1]`:
//! conv (valid) -> relu -> max-pool -> flatten -> dense + relu -> dense.
//!
//! These are pure Burn Modules; data loading and the training loop live in the
//! `steer_dataset` and `training` crates.

use burn::module::{Ignored, Module};
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringNetConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    /// Output channels of the convolution.
    pub filters: usize,
    /// Square convolution kernel side.
    pub kernel: usize,
    /// Square max-pool window, also used as the stride.
    pub pool: usize,
    pub hidden: usize,
}

impl Default for SteeringNetConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            channels: 3,
            filters: 8,
            kernel: 5,
            pool: 2,
            hidden: 128,
        }
    }
}

impl SteeringNetConfig {
    pub fn with_input(mut self, height: usize, width: usize, channels: usize) -> Self {
        self.height = height;
        self.width = width;
        self.channels = channels;
        self
    }

    /// Spatial size after the valid convolution, `(height, width)`.
    pub fn conv_output(&self) -> (usize, usize) {
        (
            (self.height + 1).saturating_sub(self.kernel),
            (self.width + 1).saturating_sub(self.kernel),
        )
    }

    /// Spatial size after pooling, `(height, width)`.
    pub fn pool_output(&self) -> (usize, usize) {
        let (h, w) = self.conv_output();
        let pool = self.pool.max(1);
        (h / pool, w / pool)
    }

    /// Width of the flattened feature vector fed to the dense head.
    pub fn flattened_features(&self) -> usize {
        let (h, w) = self.pool_output();
        h * w * self.filters
    }

    /// Reject configurations whose feature map collapses to nothing.
    pub fn check(&self) -> Result<(), String> {
        if self.channels == 0 || self.filters == 0 || self.hidden == 0 {
            return Err(format!("channels, filters and hidden must be positive: {self:?}"));
        }
        if self.kernel == 0 || self.pool == 0 {
            return Err(format!("kernel and pool must be positive: {self:?}"));
        }
        if self.flattened_features() == 0 {
            return Err(format!(
                "input {}x{} is too small for kernel {} and pool {}",
                self.height, self.width, self.kernel, self.pool
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Module)]
pub struct SteeringNet<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    dense: nn::Linear<B>,
    head: nn::Linear<B>,
    config: Ignored<SteeringNetConfig>,
}

impl<B: Backend> SteeringNet<B> {
    pub fn new(cfg: SteeringNetConfig, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([cfg.channels, cfg.filters], [cfg.kernel, cfg.kernel])
            .with_padding(PaddingConfig2d::Valid)
            .init(device);
        let pool = MaxPool2dConfig::new([cfg.pool, cfg.pool])
            .with_strides([cfg.pool, cfg.pool])
            .init();
        let dense = nn::LinearConfig::new(cfg.flattened_features(), cfg.hidden).init(device);
        let head = nn::LinearConfig::new(cfg.hidden, 1).init(device);
        Self {
            conv,
            pool,
            dense,
            head,
            config: Ignored(cfg),
        }
    }

    pub fn config(&self) -> SteeringNetConfig {
        self.config.0
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch = images.dims()[0];
        let x = relu(self.conv.forward(images));
        let x = self.pool.forward(x);
        let x = x.reshape([batch, self.config.0.flattened_features()]);
        let x = relu(self.dense.forward(x));
        self.head.forward(x)
    }

    pub fn topology(&self) -> ModelTopology {
        ModelTopology::of(self.config.0)
    }
}

/// One layer of the printed/serialized model summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub name: String,
    /// Per-sample output shape, channel-first for spatial layers.
    pub output_shape: Vec<usize>,
    pub params: usize,
}

/// Architecture description written next to the weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTopology {
    pub model: String,
    pub config: SteeringNetConfig,
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
}

impl ModelTopology {
    pub fn of(cfg: SteeringNetConfig) -> Self {
        let (conv_h, conv_w) = cfg.conv_output();
        let (pool_h, pool_w) = cfg.pool_output();
        let flat = cfg.flattened_features();
        let layer = |name: &str, output_shape: Vec<usize>, params: usize| LayerSummary {
            name: name.to_string(),
            output_shape,
            params,
        };
        let layers = vec![
            layer(
                "conv",
                vec![cfg.filters, conv_h, conv_w],
                cfg.filters * cfg.channels * cfg.kernel * cfg.kernel + cfg.filters,
            ),
            layer("relu", vec![cfg.filters, conv_h, conv_w], 0),
            layer("max_pool", vec![cfg.filters, pool_h, pool_w], 0),
            layer("flatten", vec![flat], 0),
            layer("dense", vec![cfg.hidden], flat * cfg.hidden + cfg.hidden),
            layer("relu", vec![cfg.hidden], 0),
            layer("head", vec![1], cfg.hidden + 1),
        ];
        let total_params = layers.iter().map(|l| l.params).sum();
        Self {
            model: "SteeringNet".to_string(),
            config: cfg,
            layers,
            total_params,
        }
    }

    /// Human-readable table, one layer per line.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} input={}x{}x{}\n",
            self.model, self.config.height, self.config.width, self.config.channels
        );
        for layer in &self.layers {
            out.push_str(&format!(
                "  {:<10} {:<18} {:>10}\n",
                layer.name,
                format!("{:?}", layer.output_shape),
                layer.params
            ));
        }
        out.push_str(&format!("  total params: {}\n", self.total_params));
        out
    }
}

pub mod prelude {
    pub use super::{LayerSummary, ModelTopology, SteeringNet, SteeringNetConfig};
}
