//! Batches of trajectory windows sampled for training.
use ndarray::Array3;

/// A batch of `n` trajectory windows of length `L` (the buffer's lookback).
///
/// `actions` and `rewards` carry one extra leading timestep: index 0 of the
/// second axis is a zero-padding slot, so that a previous action and reward
/// are defined even at the first step of a window. Sequence models that
/// condition on the previous action read index `t` of `actions` together with
/// index `t` of `observations`.
#[derive(Clone, Debug)]
pub struct SequenceBatch {
    /// Observation histories, of shape `[n, L, obs_dim]`.
    pub observations: Array3<f32>,

    /// One-step-ahead observation histories, of shape `[n, L, obs_dim]`,
    /// aligned index-for-index with `observations`.
    pub next_observations: Array3<f32>,

    /// Action histories, of shape `[n, L + 1, act_dim]`.
    pub actions: Array3<f32>,

    /// Reward histories, of shape `[n, L + 1, 1]`.
    pub rewards: Array3<f32>,

    /// Terminal flags, of shape `[n, L, 1]`.
    pub terminals: Array3<u8>,

    /// Validity masks, of shape `[n, L, 1]`. A `1` marks a real in-episode
    /// timestep, a `0` marks tail padding where the episode ended before
    /// filling the window.
    pub masks: Array3<u8>,
}

impl SequenceBatch {
    /// The number of windows in the batch.
    pub fn len(&self) -> usize {
        self.observations.shape()[0]
    }

    /// Returns `true` if the batch holds no windows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
