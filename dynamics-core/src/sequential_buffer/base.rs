//! Online sequential replay buffer.
use anyhow::Result;
use log::trace;
use ndarray::{s, Array2, Array3, Axis};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use super::{SequenceBatch, SequentialBufferConfig};
use crate::{error::BufferError, Path, ReplayBuffer, Step};

/// A fixed-capacity circular store of overlapping trajectory windows.
///
/// Each ingested episode is split into every sliding window of `lookback`
/// timesteps (or a single zero-padded window when the episode is shorter),
/// and each window occupies one slot of the circular storage. Once
/// `capacity` windows have been written, the oldest window is silently
/// overwritten by the next write.
///
/// Storage slots are owned exclusively by the buffer and rewritten in place;
/// sampling copies the selected slots into a fresh [`SequenceBatch`].
#[derive(Debug)]
pub struct SequentialReplayBuffer {
    obs_dim: usize,
    act_dim: usize,
    capacity: usize,
    lookback: usize,
    top: usize,
    size: usize,
    observations: Array3<f32>,
    next_observations: Array3<f32>,
    actions: Array3<f32>,
    rewards: Array3<f32>,
    terminals: Array3<u8>,
    masks: Array3<u8>,
    rng: StdRng,
}

impl SequentialReplayBuffer {
    /// Builds an empty buffer from the given configuration.
    pub fn build(config: &SequentialBufferConfig) -> Self {
        let (capacity, lookback) = (config.capacity, config.lookback);
        let (obs_dim, act_dim) = (config.obs_dim, config.act_dim);

        Self {
            obs_dim,
            act_dim,
            capacity,
            lookback,
            top: 0,
            size: 0,
            observations: Array3::zeros((capacity, lookback, obs_dim)),
            next_observations: Array3::zeros((capacity, lookback, obs_dim)),
            // actions and rewards carry one extra leading timestep: when
            // encoding the first step of a window there is no previous
            // action or reward, so index 0 stays a zero slot.
            actions: Array3::zeros((capacity, lookback + 1, act_dim)),
            rewards: Array3::zeros((capacity, lookback + 1, 1)),
            terminals: Array3::zeros((capacity, lookback, 1)),
            masks: Array3::zeros((capacity, lookback, 1)),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// The configured window length.
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// The maximum number of windows the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The observation dimension.
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// The action dimension.
    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    /// Splits one episode into its sliding windows and writes each in turn.
    fn add_path(&mut self, path: &Path) -> Result<()> {
        path.check_shapes(self.obs_dim, self.act_dim)?;

        let horizon = path.horizon();
        let obs = path.observations.slice(s![..horizon, ..]);
        let next_obs = path.observations.slice(s![1.., ..]);
        let length = path.true_length();

        // One window per start offset; episodes shorter than the lookback
        // yield exactly one zero-padded window.
        let num_windows = length.saturating_sub(self.lookback) + 1;
        for start in 0..num_windows {
            let end = (start + self.lookback).min(start + length);
            let n = end - start;
            let top = self.top;

            self.observations.index_axis_mut(Axis(0), top).fill(0.);
            self.next_observations.index_axis_mut(Axis(0), top).fill(0.);
            self.actions.index_axis_mut(Axis(0), top).fill(0.);
            self.rewards.index_axis_mut(Axis(0), top).fill(0.);
            self.terminals.index_axis_mut(Axis(0), top).fill(0);
            self.masks.index_axis_mut(Axis(0), top).fill(0);

            self.observations
                .slice_mut(s![top, ..n, ..])
                .assign(&obs.slice(s![start..end, ..]));
            self.next_observations
                .slice_mut(s![top, ..n, ..])
                .assign(&next_obs.slice(s![start..end, ..]));
            self.actions
                .slice_mut(s![top, 1..n + 1, ..])
                .assign(&path.actions.slice(s![start..end, ..]));
            self.rewards
                .slice_mut(s![top, 1..n + 1, ..])
                .assign(&path.rewards.slice(s![start..end, ..]));
            self.terminals
                .slice_mut(s![top, ..n, ..])
                .assign(&path.terminals.slice(s![start..end, ..]));
            match &path.masks {
                Some(masks) => self
                    .masks
                    .slice_mut(s![top, ..n, ..])
                    .assign(&masks.slice(s![start..end, ..])),
                None => self.masks.slice_mut(s![top, ..n, ..]).fill(1),
            }

            self.advance();
        }

        trace!(
            "Windowed a path of length {} into {} windows",
            length,
            num_windows
        );

        Ok(())
    }

    /// Copies the windows at the given storage indices into a batch.
    pub(crate) fn gather(&self, ixs: &[usize]) -> SequenceBatch {
        SequenceBatch {
            observations: self.observations.select(Axis(0), ixs),
            next_observations: self.next_observations.select(Axis(0), ixs),
            actions: self.actions.select(Axis(0), ixs),
            rewards: self.rewards.select(Axis(0), ixs),
            terminals: self.terminals.select(Axis(0), ixs),
            masks: self.masks.select(Axis(0), ixs),
        }
    }

    /// Draws `n` indices uniformly at random, with replacement, from
    /// `[0, upper)`.
    pub(crate) fn draw(&mut self, upper: usize, n: usize) -> Vec<usize> {
        (0..n)
            .map(|_| (self.rng.next_u32() as usize) % upper)
            .collect()
    }

    fn advance(&mut self) {
        self.top = (self.top + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
    }
}

impl ReplayBuffer for SequentialReplayBuffer {
    type Batch = SequenceBatch;

    fn clear(&mut self) {
        self.observations.fill(0.);
        self.next_observations.fill(0.);
        self.actions.fill(0.);
        self.rewards.fill(0.);
        self.terminals.fill(0);
        self.masks.fill(0);
        self.top = 0;
        self.size = 0;
    }

    fn add_paths(&mut self, paths: &[Path]) -> Result<()> {
        for path in paths {
            self.add_path(path)?;
        }
        Ok(())
    }

    fn add_step(&mut self, _step: &Step) -> Result<()> {
        Err(BufferError::StepInsertionUnsupported.into())
    }

    fn sample_batch(&mut self, num_samples: usize) -> Result<SequenceBatch> {
        if self.size == 0 {
            return Err(BufferError::EmptyBuffer.into());
        }
        let ixs = self.draw(self.size, num_samples);
        Ok(self.gather(&ixs))
    }

    /// Returns the first observation of `num_samples` randomly sampled
    /// windows.
    ///
    /// This is an approximation: only window-initial observations are
    /// reachable, so states that appear strictly mid-window cannot be
    /// returned. The offline buffer overrides this with an unbiased draw
    /// over true episode starts.
    fn sample_starts(&mut self, num_samples: usize) -> Result<Array2<f32>> {
        if self.size == 0 {
            return Err(BufferError::EmptyBuffer.into());
        }
        let ixs = self.draw(self.size, num_samples);
        Ok(self
            .observations
            .select(Axis(0), &ixs)
            .index_axis_move(Axis(1), 0))
    }

    fn len(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn config(obs_dim: usize, act_dim: usize, capacity: usize, lookback: usize) -> SequentialBufferConfig {
        SequentialBufferConfig::default()
            .obs_dim(obs_dim)
            .act_dim(act_dim)
            .capacity(capacity)
            .lookback(lookback)
    }

    /// A path whose observation at step `t` is `offset + t` in every
    /// dimension and whose action at step `t` is `offset + t + 0.5`.
    fn make_path(horizon: usize, obs_dim: usize, act_dim: usize, offset: f32) -> Path {
        let observations = Array2::from_shape_fn((horizon + 1, obs_dim), |(t, _)| offset + t as f32);
        let actions = Array2::from_shape_fn((horizon, act_dim), |(t, _)| offset + t as f32 + 0.5);
        let rewards = Array2::from_shape_fn((horizon, 1), |(t, _)| offset + t as f32);
        let terminals = Array2::zeros((horizon, 1));
        Path {
            observations,
            actions,
            rewards,
            terminals,
            masks: None,
        }
    }

    #[test]
    fn test_window_coverage() {
        let (horizon, lookback) = (10, 4);
        let mut buffer = SequentialReplayBuffer::build(&config(3, 2, 100, lookback));
        buffer.add_paths(&[make_path(horizon, 3, 2, 0.)]).unwrap();

        // Every sliding window of size `lookback`.
        assert_eq!(buffer.len(), horizon - lookback + 1);

        let ixs: Vec<usize> = (0..buffer.len()).collect();
        let windows = buffer.gather(&ixs);
        for w in 0..buffer.len() {
            // Window w starts at offset w into the episode.
            assert_eq!(windows.observations[[w, 0, 0]], w as f32);
            assert_eq!(windows.next_observations[[w, 0, 0]], (w + 1) as f32);
            assert_eq!(windows.observations[[w, lookback - 1, 0]], (w + lookback - 1) as f32);
            for t in 0..lookback {
                assert_eq!(windows.masks[[w, t, 0]], 1);
            }
        }
    }

    #[test]
    fn test_leading_padding_slot() {
        let lookback = 4;
        let mut buffer = SequentialReplayBuffer::build(&config(2, 2, 100, lookback));
        buffer.add_paths(&[make_path(8, 2, 2, 10.)]).unwrap();

        let ixs: Vec<usize> = (0..buffer.len()).collect();
        let windows = buffer.gather(&ixs);
        for w in 0..buffer.len() {
            // Index 0 of actions and rewards is the previous-step padding
            // slot; real data starts at index 1.
            assert_eq!(windows.actions[[w, 0, 0]], 0.);
            assert_eq!(windows.rewards[[w, 0, 0]], 0.);
            for t in 0..lookback {
                assert_eq!(windows.actions[[w, t + 1, 0]], 10. + (w + t) as f32 + 0.5);
                assert_eq!(windows.rewards[[w, t + 1, 0]], 10. + (w + t) as f32);
            }
        }
    }

    #[test]
    fn test_short_episode_padding() {
        let (horizon, lookback) = (3, 5);
        let mut buffer = SequentialReplayBuffer::build(&config(2, 1, 100, lookback));
        buffer.add_paths(&[make_path(horizon, 2, 1, 0.)]).unwrap();

        // A single, partially padded window.
        assert_eq!(buffer.len(), 1);

        let window = buffer.gather(&[0]);
        for t in 0..horizon {
            assert_eq!(window.masks[[0, t, 0]], 1);
            assert_eq!(window.observations[[0, t, 0]], t as f32);
        }
        for t in horizon..lookback {
            assert_eq!(window.masks[[0, t, 0]], 0);
            assert_eq!(window.observations[[0, t, 0]], 0.);
            assert_eq!(window.next_observations[[0, t, 0]], 0.);
            assert_eq!(window.terminals[[0, t, 0]], 0);
        }
        assert_eq!(window.actions[[0, 0, 0]], 0.);
        for t in 0..horizon {
            assert_eq!(window.actions[[0, t + 1, 0]], t as f32 + 0.5);
        }
        for t in horizon..lookback {
            assert_eq!(window.actions[[0, t + 1, 0]], 0.);
            assert_eq!(window.rewards[[0, t + 1, 0]], 0.);
        }
    }

    #[test]
    fn test_masked_path_truncates() {
        let (horizon, lookback) = (6, 3);
        let mut path = make_path(horizon, 2, 1, 0.);
        // The container is padded beyond step 4.
        path.masks = Some(Array2::from_shape_fn((horizon, 1), |(t, _)| (t < 4) as u8));

        let mut buffer = SequentialReplayBuffer::build(&config(2, 1, 100, lookback));
        buffer.add_paths(&[path]).unwrap();

        // True length 4, so 4 - 3 + 1 windows.
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_ring_overwrite() {
        let lookback = 2;
        let mut buffer = SequentialReplayBuffer::build(&config(1, 1, 5, lookback));

        // 3 + 3 + 2 = 8 windows into a buffer of capacity 5.
        buffer.add_paths(&[make_path(4, 1, 1, 0.)]).unwrap();
        buffer.add_paths(&[make_path(4, 1, 1, 100.)]).unwrap();
        buffer.add_paths(&[make_path(3, 1, 1, 200.)]).unwrap();

        assert_eq!(buffer.len(), 5);

        // Writes 6..8 wrapped around onto slots 0..2.
        let windows = buffer.gather(&[0, 1, 2, 3, 4]);
        assert_eq!(windows.observations[[0, 0, 0]], 102.);
        assert_eq!(windows.observations[[1, 0, 0]], 200.);
        assert_eq!(windows.observations[[2, 0, 0]], 201.);
        assert_eq!(windows.observations[[3, 0, 0]], 100.);
        assert_eq!(windows.observations[[4, 0, 0]], 101.);

        // The first path's windows are unreachable.
        let batch = buffer.sample_batch(64).unwrap();
        for w in 0..batch.len() {
            assert!(batch.observations[[w, 0, 0]] >= 100.);
        }
    }

    #[test]
    fn test_sample_batch_shapes() {
        let (obs_dim, act_dim, lookback) = (3, 2, 4);
        let mut buffer = SequentialReplayBuffer::build(&config(obs_dim, act_dim, 100, lookback));
        buffer.add_paths(&[make_path(10, obs_dim, act_dim, 0.)]).unwrap();

        let batch = buffer.sample_batch(32).unwrap();
        assert_eq!(batch.len(), 32);
        assert_eq!(batch.observations.dim(), (32, lookback, obs_dim));
        assert_eq!(batch.next_observations.dim(), (32, lookback, obs_dim));
        assert_eq!(batch.actions.dim(), (32, lookback + 1, act_dim));
        assert_eq!(batch.rewards.dim(), (32, lookback + 1, 1));
        assert_eq!(batch.terminals.dim(), (32, lookback, 1));
        assert_eq!(batch.masks.dim(), (32, lookback, 1));

        // Only written slots are reachable, and every written window starts
        // with a real timestep.
        for w in 0..batch.len() {
            assert_eq!(batch.masks[[w, 0, 0]], 1);
        }
    }

    #[test]
    fn test_sample_empty_fails() {
        let mut buffer = SequentialReplayBuffer::build(&config(2, 1, 10, 3));
        let err = buffer.sample_batch(4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BufferError>(),
            Some(BufferError::EmptyBuffer)
        ));
        let err = buffer.sample_starts(4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BufferError>(),
            Some(BufferError::EmptyBuffer)
        ));
    }

    #[test]
    fn test_add_step_rejected() {
        let mut buffer = SequentialReplayBuffer::build(&config(2, 1, 10, 3));
        let step = Step {
            obs: Array1::zeros(2),
            next_obs: Array1::zeros(2),
            act: Array1::zeros(1),
            reward: 0.,
            is_terminal: false,
        };
        let err = buffer.add_step(&step).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BufferError>(),
            Some(BufferError::StepInsertionUnsupported)
        ));

        // Still rejected once the buffer holds data.
        buffer.add_paths(&[make_path(5, 2, 1, 0.)]).unwrap();
        assert!(buffer.add_step(&step).is_err());
    }

    #[test]
    fn test_sample_starts_window_initial() {
        let lookback = 3;
        let mut buffer = SequentialReplayBuffer::build(&config(1, 1, 100, lookback));
        buffer.add_paths(&[make_path(5, 1, 1, 0.)]).unwrap();

        // Window starts are offsets 0, 1, 2; nothing else is reachable.
        let starts = buffer.sample_starts(50).unwrap();
        assert_eq!(starts.dim(), (50, 1));
        for &s in starts.iter() {
            assert!(s == 0. || s == 1. || s == 2.);
        }
    }

    #[test]
    fn test_path_shape_rejected() {
        let mut buffer = SequentialReplayBuffer::build(&config(3, 2, 10, 4));
        let path = make_path(6, 3, 1, 0.);
        let err = buffer.add_paths(&[path]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BufferError>(),
            Some(BufferError::PathShape(_))
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = SequentialReplayBuffer::build(&config(2, 1, 10, 3));
        buffer.add_paths(&[make_path(6, 2, 1, 0.)]).unwrap();
        assert!(!buffer.is_empty());

        buffer.clear();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.sample_batch(1).is_err());
    }
}
