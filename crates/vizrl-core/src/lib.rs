//! Core reinforcement learning traits and types for vizrl
//!
//! This crate provides the foundational abstractions shared by the
//! environment wrappers and the agents: action and observation spaces,
//! the environment and agent traits, transitions and the common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;
pub mod seeding;
pub mod trajectory;

// Re-export core traits and types
pub use action::{
    Action, ActionSpace, ButtonAction, DiscreteAction, DiscreteSpace, MultiDiscreteSpace,
};
pub use agent::{Agent, AgentConfig, AgentMetrics};
pub use environment::{Environment, Episode, Step, StepInfo, TrackedEnvironment};
pub use error::{RLError, Result};
pub use observation::{
    BoxObservationSpace, ImageObservation, ImageSpace, Observation, ObservationSpace,
    VectorObservation,
};
pub use reward::{round4, Reward};
pub use seeding::derive_seed;
pub use trajectory::Transition;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, Agent, Environment, Observation, ObservationSpace,
        Reward, Result, Step, StepInfo,
    };
}
