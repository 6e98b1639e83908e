#![recursion_limit = "256"]

pub mod callbacks;
pub mod config;
pub mod history;
pub mod util;

pub use callbacks::{BestCheckpoint, EarlyStopping, EpochAction, EpochMetrics};
pub use config::{FrameOrder, TrainConfig};
pub use history::TrainingHistory;
pub use models::{ModelTopology, SteeringNet, SteeringNetConfig};
pub use util::{load_steering_net_from_checkpoint, run_train, train_on_log, TrainArgs, TrainReport};
/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
