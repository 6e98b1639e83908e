//! Epoch-end decisions: early stopping and best-checkpoint tracking.

/// Losses observed at the end of one epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
}

impl EpochMetrics {
    /// Validation loss when available, training loss otherwise.
    pub fn monitored(&self) -> f32 {
        self.val_loss.unwrap_or(self.loss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochAction {
    Continue,
    Stop,
}

/// Stop when the monitored loss has not improved by more than `min_delta`
/// for `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best_loss: f32,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: f32::INFINITY,
            epochs_without_improvement: 0,
        }
    }

    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> EpochAction {
        let loss = metrics.monitored();
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
        }
        if self.epochs_without_improvement >= self.patience {
            tracing::info!(
                epoch = metrics.epoch,
                patience = self.patience,
                best_loss = self.best_loss,
                "early stopping: no improvement"
            );
            EpochAction::Stop
        } else {
            EpochAction::Continue
        }
    }
}

/// Remembers the lowest monitored loss so the caller saves only improvements.
#[derive(Debug, Clone)]
pub struct BestCheckpoint {
    best: Option<(usize, f32)>,
}

impl Default for BestCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl BestCheckpoint {
    pub fn new() -> Self {
        Self { best: None }
    }

    /// True when `metrics` beats every earlier epoch.
    pub fn improved(&mut self, metrics: &EpochMetrics) -> bool {
        let loss = metrics.monitored();
        match self.best {
            Some((_, best)) if loss >= best => false,
            _ if loss.is_nan() => false,
            _ => {
                self.best = Some((metrics.epoch, loss));
                true
            }
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best.map(|(epoch, _)| epoch)
    }

    pub fn best_loss(&self) -> Option<f32> {
        self.best.map(|(_, loss)| loss)
    }
}
