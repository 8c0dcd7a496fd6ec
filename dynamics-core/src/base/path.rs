//! Episode data ingested by replay buffers.
use anyhow::Result;
use ndarray::{Array1, Array2};

use crate::error::BufferError;

/// One episode of environment interaction, from reset to termination or
/// truncation.
///
/// All per-timestep arrays cover `T` steps, except `observations`, which has
/// one extra row: its last row is the next-observation of the final step.
#[derive(Clone, Debug)]
pub struct Path {
    /// Observations, of shape `[T + 1, obs_dim]`.
    pub observations: Array2<f32>,

    /// Actions, of shape `[T, act_dim]`.
    pub actions: Array2<f32>,

    /// Rewards, of shape `[T, 1]`.
    pub rewards: Array2<f32>,

    /// Terminal flags, of shape `[T, 1]`.
    pub terminals: Array2<u8>,

    /// Optional validity mask, of shape `[T, 1]`. A `0` marks a timestep that
    /// is padding inside a padded container; real data never follows padding.
    pub masks: Option<Array2<u8>>,
}

impl Path {
    /// The number of transitions `T` in the episode container.
    pub fn horizon(&self) -> usize {
        self.actions.nrows()
    }

    /// The true episode length: the index of the first zero in the mask, or
    /// the full horizon when no mask is supplied or the mask has no zero.
    pub fn true_length(&self) -> usize {
        match &self.masks {
            Some(masks) => masks
                .iter()
                .position(|&m| m == 0)
                .unwrap_or_else(|| self.horizon()),
            None => self.horizon(),
        }
    }

    /// Checks the arrays against each other and the given feature dimensions.
    pub(crate) fn check_shapes(&self, obs_dim: usize, act_dim: usize) -> Result<()> {
        let horizon = self.horizon();
        let err = |msg: String| Err(BufferError::PathShape(msg).into());

        if self.observations.dim() != (horizon + 1, obs_dim) {
            return err(format!(
                "expected observations of shape [{}, {}], got {:?}",
                horizon + 1,
                obs_dim,
                self.observations.dim()
            ));
        }
        if self.actions.ncols() != act_dim {
            return err(format!(
                "expected actions of dimension {}, got {}",
                act_dim,
                self.actions.ncols()
            ));
        }
        if self.rewards.dim() != (horizon, 1) {
            return err(format!(
                "expected rewards of shape [{}, 1], got {:?}",
                horizon,
                self.rewards.dim()
            ));
        }
        if self.terminals.dim() != (horizon, 1) {
            return err(format!(
                "expected terminals of shape [{}, 1], got {:?}",
                horizon,
                self.terminals.dim()
            ));
        }
        if let Some(masks) = &self.masks {
            if masks.dim() != (horizon, 1) {
                return err(format!(
                    "expected masks of shape [{}, 1], got {:?}",
                    horizon,
                    masks.dim()
                ));
            }
        }
        Ok(())
    }
}

/// A single transition tuple.
///
/// Sequential buffers reject single transitions; this type exists so the
/// [`ReplayBuffer`](crate::ReplayBuffer) interface can express the operation.
#[derive(Clone, Debug)]
pub struct Step {
    /// Observation before the step.
    pub obs: Array1<f32>,

    /// Observation after the step.
    pub next_obs: Array1<f32>,

    /// Action taken.
    pub act: Array1<f32>,

    /// Reward received.
    pub reward: f32,

    /// Whether the episode terminated at this step.
    pub is_terminal: bool,
}
