#![warn(missing_docs)]
//! Core library for training sequence models of environment dynamics.
//!
//! The heart of the crate is the [`SequentialReplayBuffer`], a fixed-capacity
//! circular store of overlapping, fixed-length trajectory windows extracted
//! from variable-length episodes. Sequence models consume such windows in
//! random-access batches, each carrying the observations, one-step-ahead
//! observations, previous actions and rewards, terminal flags and validity
//! masks of one window.
//!
//! Two construction paths share a single windowing implementation:
//! - [`SequentialReplayBuffer::build`] creates an empty online buffer that is
//!   filled incrementally as episodes are collected.
//! - [`SequentialOfflineReplayBuffer::from_dataset`] reconstructs episodes
//!   from a flat transition dataset and ingests them through the same path.
pub mod error;
pub mod sequential_buffer;

mod base;
pub use base::{Path, ReplayBuffer, Step};

pub use sequential_buffer::{
    SequenceBatch, SequentialBufferConfig, SequentialOfflineReplayBuffer, SequentialReplayBuffer,
    TransitionDataset,
};
