//! Boundary to the external game engine
//!
//! The engine itself (simulation, rendering, input) lives outside this crate.
//! Everything the environments need from it goes through [`GameEngine`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use vizrl_core::RLError;

/// Errors raised by an engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine process went away during start-up or play
    #[error("engine exited unexpectedly: {0}")]
    UnexpectedExit(String),

    /// An action or state request reached an engine that is not running
    #[error("engine is not running")]
    NotRunning,

    /// Any other engine-side failure
    #[error("engine failure: {0}")]
    Failed(String),
}

impl From<EngineError> for RLError {
    fn from(err: EngineError) -> Self {
        RLError::Engine(err.to_string())
    }
}

/// Who drives the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineMode {
    /// The program sends every action
    Player,
    /// A human plays; the program only watches
    Spectator,
}

/// Screen resolution of the rendered frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenResolution {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl ScreenResolution {
    /// Colour channels per pixel (RGB24)
    pub const CHANNELS: usize = 3;

    /// Create a resolution
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of bytes in one frame
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.width * self.height * Self::CHANNELS
    }
}

impl Default for ScreenResolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// Snapshot of the running episode
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Tick number within the episode
    pub number: u64,
    /// Current frame, if the engine produced one
    pub screen_buffer: Option<Vec<u8>>,
    /// Game variables in engine order, if available
    pub game_variables: Option<Vec<f64>>,
}

/// Operations the environments use on a game engine.
///
/// Implementations wrap a real engine binding; [`crate::ScriptedEngine`] is a
/// deterministic stand-in.
pub trait GameEngine: Send + Sync {
    /// Load an engine configuration file
    fn load_config(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Point the engine at a scenario asset
    fn set_scenario_path(&mut self, path: &Path);

    /// Select a map inside the scenario
    fn set_map(&mut self, map: &str);

    /// Set the difficulty
    fn set_skill(&mut self, skill: u8);

    /// Set the rendering resolution
    fn set_screen_resolution(&mut self, resolution: ScreenResolution);

    /// Show or hide the engine window
    fn set_window_visible(&mut self, visible: bool);

    /// Select player or spectator mode
    fn set_mode(&mut self, mode: EngineMode);

    /// Pass extra command-line arguments to the engine
    fn add_game_args(&mut self, args: &str);

    /// Start the engine; must happen under the engine lock
    fn init(&mut self) -> Result<(), EngineError>;

    /// Seed the next episode
    fn set_seed(&mut self, seed: u64);

    /// Start a new episode
    fn new_episode(&mut self) -> Result<(), EngineError>;

    /// Apply one action for one tick and return the tick reward
    fn make_action(&mut self, buttons: &[i32]) -> Result<f64, EngineError>;

    /// Advance one tick with whatever the human is pressing
    fn advance_action(&mut self) -> Result<(), EngineError>;

    /// Current state, `None` once the episode is over
    fn state(&self) -> Option<EngineState>;

    /// Whether the current episode has ended
    fn is_episode_finished(&self) -> bool;

    /// Reward accumulated in the current episode
    fn total_reward(&self) -> f64;

    /// Buttons applied on the last tick
    fn last_action(&self) -> Vec<i32>;

    /// Reward of the last tick
    fn last_reward(&self) -> f64;

    /// Shut the engine down; must happen under the engine lock
    fn close(&mut self);
}

/// Builds fresh engines; a level reload discards the old engine.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn GameEngine> + Send + Sync>;
