//! Replay buffers storing overlapping fixed-length trajectory windows.
mod base;
mod batch;
mod config;
mod offline;
pub use base::SequentialReplayBuffer;
pub use batch::SequenceBatch;
pub use config::SequentialBufferConfig;
pub use offline::{SequentialOfflineReplayBuffer, TransitionDataset};
