//! Reinforcement learning agents for vizrl
//!
//! - [`Dqn`]: a small deep Q-network trained online from replayed transitions
//! - [`RandomAgent`]: uniform baseline over any action space
//!
//! The network and its optimizer are written directly on `ndarray`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod dqn;
pub mod network;
pub mod optimizer;
pub mod random;

// Re-export agents
pub use dqn::{Dqn, DqnConfig};
pub use random::RandomAgent;

// Re-export building blocks
pub use buffer::{ReplayMemory, TransitionBatch};
pub use network::{Params, QNetwork};
pub use optimizer::{Adam, AdamConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Dqn, DqnConfig, RandomAgent, ReplayMemory};
    pub use vizrl_core::prelude::*;
}
