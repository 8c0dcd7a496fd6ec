//! Core traits and domain data types.
mod path;
mod replay_buffer;
pub use path::{Path, Step};
pub use replay_buffer::ReplayBuffer;
