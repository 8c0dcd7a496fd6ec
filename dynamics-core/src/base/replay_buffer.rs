//! Replay buffer interface.
use anyhow::Result;
use ndarray::Array2;

use super::{Path, Step};

/// Interface for buffers that store experiences and generate training batches.
///
/// Construction is left to the implementing types, since online buffers are
/// built from a configuration while offline buffers are built from a dataset.
///
/// Callers are expected to serialize ingestion and sampling on one thread;
/// the buffer performs no locking of its own.
pub trait ReplayBuffer {
    /// The type of batch generated for training.
    type Batch;

    /// Resets the buffer to its empty state, zeroing all storage.
    fn clear(&mut self);

    /// Ingests episodes taken in the environment.
    ///
    /// A single episode is ingested as a one-element slice.
    ///
    /// # Errors
    ///
    /// Fails if an episode's arrays disagree with each other or with the
    /// buffer's feature dimensions. Shapes are validated before any write, so
    /// a failed call leaves the buffer unchanged.
    fn add_paths(&mut self, paths: &[Path]) -> Result<()>;

    /// Inserts a single transition.
    ///
    /// # Errors
    ///
    /// Implementations that store windowed sequences fail unconditionally:
    /// one step cannot be windowed without its surrounding context.
    fn add_step(&mut self, step: &Step) -> Result<()>;

    /// Draws `num_samples` experiences uniformly at random, with replacement.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is empty.
    fn sample_batch(&mut self, num_samples: usize) -> Result<Self::Batch>;

    /// Draws `num_samples` start states for seeding rollouts, as an array of
    /// shape `[num_samples, obs_dim]`.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is empty.
    fn sample_starts(&mut self, num_samples: usize) -> Result<Array2<f32>>;

    /// Returns the current number of stored experiences.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experiences.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
