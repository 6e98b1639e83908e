//! Seeded train/validation partitioning.

use crate::types::DrivingSample;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `samples` with `seed` and hold out the last `ceil(n * val_ratio)` as validation.
///
/// `val_ratio` is clamped to `[0, 1]`. The same seed always yields the same partition.
pub fn split_train_val(
    mut samples: Vec<DrivingSample>,
    val_ratio: f32,
    seed: u64,
) -> (Vec<DrivingSample>, Vec<DrivingSample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    // Ratio in parts per million, so 0.2f32 is exactly 200_000 and the ceiling is integer math.
    let ppm = (val_ratio.clamp(0.0, 1.0) as f64 * 1e6).round() as u128;
    let val_len = ((samples.len() as u128 * ppm).div_ceil(1_000_000) as usize).min(samples.len());
    let val = samples.split_off(samples.len() - val_len);
    (samples, val)
}
