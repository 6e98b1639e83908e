use crate::callbacks::EpochMetrics;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-epoch losses written to `train_history.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f32>,
    /// Empty when validation was skipped.
    pub val_loss: Vec<f32>,
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn record(&mut self, metrics: &EpochMetrics) {
        self.loss.push(metrics.loss);
        if let Some(val) = metrics.val_loss {
            self.val_loss.push(val);
        }
    }

    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow::anyhow!("failed to write history {}: {e}", path.display()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read history {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
