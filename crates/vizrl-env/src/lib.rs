//! Environments for vizrl
//!
//! This crate provides:
//! - the episode driver wrapping an external game engine ([`DoomEnv`])
//! - the curriculum meta-environment over all levels ([`MetaDoomEnv`])
//! - a top-down driving simulation ([`DrivingEnv`])
//!
//! The engine itself sits behind [`GameEngine`]; [`ScriptedEngine`] is a
//! deterministic implementation for tests and demos.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod curriculum;
pub mod doom;
pub mod driving;
pub mod engine;
pub mod levels;
pub mod lock;
pub mod meta;
pub mod scripted;
pub mod wrappers;

pub use curriculum::{standardize_reward, Curriculum, CurriculumConfig, LevelLocks, ScoreTracker};
pub use doom::{DoomEnv, DoomEnvConfig, DriverState, EnvMode, LevelCustomizer, GAME_VARIABLE_NAMES};
pub use driving::{DrivingConfig, DrivingEnv};
pub use engine::{EngineError, EngineFactory, EngineMode, EngineState, GameEngine, ScreenResolution};
pub use levels::{doom_action_space, LevelConfig, LevelTable, BUTTON_NAMES, NUM_ACTIONS};
pub use lock::EngineLock;
pub use meta::MetaDoomEnv;
pub use scripted::{Journal, ScriptConfig, ScriptedEngine};
pub use wrappers::TimeLimit;

// Re-export core types
pub use vizrl_core::{
    ButtonAction, DiscreteAction, Environment, ImageObservation, Step, StepInfo, VectorObservation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DoomEnv, DoomEnvConfig, DrivingEnv, EngineLock, LevelTable, MetaDoomEnv, TimeLimit,
    };
    pub use vizrl_core::prelude::*;
}
