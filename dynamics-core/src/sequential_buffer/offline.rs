//! Offline construction from a flat, already-collected transition dataset.
use anyhow::Result;
use log::info;
use ndarray::{concatenate, s, Array1, Array2, Axis};

use super::{SequenceBatch, SequentialBufferConfig, SequentialReplayBuffer};
use crate::{error::BufferError, Path, ReplayBuffer, Step};

/// A flat dataset of concatenated transitions, with episode boundaries
/// discarded.
///
/// `rewards` and `terminals` are flat vectors and are reshaped to `[N, 1]`
/// columns internally.
#[derive(Clone, Debug)]
pub struct TransitionDataset {
    /// Observations, of shape `[N, obs_dim]`.
    pub observations: Array2<f32>,

    /// Next observations, of shape `[N, obs_dim]`.
    pub next_observations: Array2<f32>,

    /// Actions, of shape `[N, act_dim]`.
    pub actions: Array2<f32>,

    /// Rewards, of length `N`.
    pub rewards: Array1<f32>,

    /// Terminal flags, of length `N`.
    pub terminals: Array1<u8>,
}

impl TransitionDataset {
    fn check_shapes(&self) -> Result<()> {
        let n = self.actions.nrows();
        let err = |msg: String| Err(BufferError::DatasetShape(msg).into());

        if n == 0 {
            return err("dataset contains no transitions".into());
        }
        if self.observations.nrows() != n || self.next_observations.dim() != self.observations.dim()
        {
            return err(format!(
                "expected observations and next_observations of shape [{}, obs_dim], got {:?} and {:?}",
                n,
                self.observations.dim(),
                self.next_observations.dim()
            ));
        }
        if self.rewards.len() != n || self.terminals.len() != n {
            return err(format!(
                "expected rewards and terminals of length {}, got {} and {}",
                n,
                self.rewards.len(),
                self.terminals.len()
            ));
        }
        Ok(())
    }

    /// Reconstructs episode boundaries from the flat stream.
    ///
    /// A boundary follows transition `t` when its terminal flag is set or
    /// when `next_observations[t]` does not continue into
    /// `observations[t + 1]`. Each reconstructed episode gets its final
    /// next-observation appended to the observation block, forming the
    /// `[T + 1, obs_dim]` sequence that ingestion expects.
    fn split_into_paths(&self) -> Vec<Path> {
        let n = self.actions.nrows();
        let mut paths = Vec::new();
        let mut start = 0;
        for t in 0..n {
            let boundary = self.terminals[t] != 0
                || (t + 1 < n && self.next_observations.row(t) != self.observations.row(t + 1));
            if boundary || t + 1 == n {
                let end = t + 1;
                let observations = concatenate![
                    Axis(0),
                    self.observations.slice(s![start..end, ..]),
                    self.next_observations.slice(s![t..end, ..])
                ];
                paths.push(Path {
                    observations,
                    actions: self.actions.slice(s![start..end, ..]).to_owned(),
                    rewards: self
                        .rewards
                        .slice(s![start..end])
                        .to_owned()
                        .insert_axis(Axis(1)),
                    terminals: self
                        .terminals
                        .slice(s![start..end])
                        .to_owned()
                        .insert_axis(Axis(1)),
                    masks: None,
                });
                start = end;
            }
        }
        paths
    }
}

/// A sequential buffer built once from a flat transition dataset.
///
/// The dataset is split back into episodes, which then flow through the same
/// windowing implementation as online ingestion, so both construction paths
/// share identical invariants. The buffer additionally retains the first
/// observation of every reconstructed episode; start-state sampling draws
/// from that flat array instead of from window-initial observations, which
/// makes it unbiased where the online buffer's is approximate.
#[derive(Debug)]
pub struct SequentialOfflineReplayBuffer {
    buffer: SequentialReplayBuffer,
    starts: Array2<f32>,
}

impl SequentialOfflineReplayBuffer {
    /// Builds the buffer from a flat dataset.
    ///
    /// The capacity is the number of transitions in the dataset, which no
    /// window set extracted from it can exceed; feature dimensions are taken
    /// from the dataset shapes.
    pub fn from_dataset(data: &TransitionDataset, lookback: usize, seed: u64) -> Result<Self> {
        data.check_shapes()?;

        let config = SequentialBufferConfig::default()
            .obs_dim(data.observations.ncols())
            .act_dim(data.actions.ncols())
            .capacity(data.actions.nrows())
            .lookback(lookback)
            .seed(seed);
        let mut buffer = SequentialReplayBuffer::build(&config);

        let paths = data.split_into_paths();
        let mut starts = Array2::zeros((paths.len(), config.obs_dim));
        for (i, path) in paths.iter().enumerate() {
            starts.row_mut(i).assign(&path.observations.row(0));
        }
        buffer.add_paths(&paths)?;

        info!(
            "Reconstructed {} paths from {} transitions; stored {} windows",
            paths.len(),
            data.actions.nrows(),
            buffer.len()
        );

        Ok(Self { buffer, starts })
    }

    /// The retained episode-start observations, of shape
    /// `[num_episodes, obs_dim]`.
    pub fn starts(&self) -> &Array2<f32> {
        &self.starts
    }
}

impl ReplayBuffer for SequentialOfflineReplayBuffer {
    type Batch = SequenceBatch;

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn add_paths(&mut self, paths: &[Path]) -> Result<()> {
        self.buffer.add_paths(paths)
    }

    fn add_step(&mut self, step: &Step) -> Result<()> {
        self.buffer.add_step(step)
    }

    fn sample_batch(&mut self, num_samples: usize) -> Result<SequenceBatch> {
        self.buffer.sample_batch(num_samples)
    }

    /// Draws uniformly from the retained true episode-start observations.
    fn sample_starts(&mut self, num_samples: usize) -> Result<Array2<f32>> {
        let ixs = self.buffer.draw(self.starts.nrows(), num_samples);
        Ok(self.starts.select(Axis(0), &ixs))
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }
}
