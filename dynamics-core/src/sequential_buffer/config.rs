//! Configuration of the sequential replay buffer.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`SequentialReplayBuffer`](super::SequentialReplayBuffer).
///
/// All feature dimensions are fixed at construction; episodes ingested later
/// must match them.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SequentialBufferConfig {
    /// Dimension of the observation space.
    pub obs_dim: usize,

    /// Dimension of the action space.
    pub act_dim: usize,

    /// Maximum number of windows that can be stored. When the buffer is
    /// full, new windows replace the oldest ones.
    pub capacity: usize,

    /// Window length: how many timesteps of history each stored window holds.
    pub lookback: usize,

    /// Random seed used for sampling windows.
    pub seed: u64,
}

impl Default for SequentialBufferConfig {
    fn default() -> Self {
        Self {
            obs_dim: 1,
            act_dim: 1,
            capacity: 10000,
            lookback: 10,
            seed: 42,
        }
    }
}

impl SequentialBufferConfig {
    /// Sets the observation dimension.
    pub fn obs_dim(mut self, obs_dim: usize) -> Self {
        self.obs_dim = obs_dim;
        self
    }

    /// Sets the action dimension.
    pub fn act_dim(mut self, act_dim: usize) -> Self {
        self.act_dim = act_dim;
        self
    }

    /// Sets the capacity of the buffer in windows.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the window length.
    pub fn lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
