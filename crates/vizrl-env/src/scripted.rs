//! Deterministic stand-in for the game engine
//!
//! Episodes last a fixed number of ticks and every tick pays a fixed living
//! reward plus a bonus per pressed button. Every call is appended to a shared
//! journal so callers can check what the environment asked for.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::engine::{
    EngineError, EngineFactory, EngineMode, EngineState, GameEngine, ScreenResolution,
};

/// Number of game variables reported per tick
pub const SCRIPTED_VARIABLES: usize = 22;

/// Behaviour of a [`ScriptedEngine`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Ticks per episode
    pub episode_length: u64,
    /// Reward paid every tick
    pub living_reward: f64,
    /// Reward per non-zero button
    pub reward_per_press: f64,
    /// Make `init` fail, as an engine started without the lock would
    pub fail_init: bool,
    /// Produce states without a frame
    pub blank_screen: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            episode_length: 10,
            living_reward: -1.0,
            reward_per_press: 0.5,
            fail_init: false,
            blank_screen: false,
        }
    }
}

/// Shared record of engine calls
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Scripted engine
#[derive(Debug)]
pub struct ScriptedEngine {
    config: ScriptConfig,
    journal: Journal,
    resolution: ScreenResolution,
    running: bool,
    tick: u64,
    total: f64,
    last_action: Vec<i32>,
    last_reward: f64,
}

impl ScriptedEngine {
    /// Create an engine writing to `journal`
    #[must_use]
    pub fn new(config: ScriptConfig, journal: Journal) -> Self {
        Self {
            config,
            journal,
            resolution: ScreenResolution::default(),
            running: false,
            tick: 0,
            total: 0.0,
            last_action: Vec::new(),
            last_reward: 0.0,
        }
    }

    /// Factory handing out engines that share one journal
    #[must_use]
    pub fn factory(config: ScriptConfig, journal: Journal) -> EngineFactory {
        Arc::new(move || {
            Box::new(ScriptedEngine::new(config.clone(), journal.clone())) as Box<dyn GameEngine>
        })
    }

    fn record(&self, entry: String) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(entry);
        }
    }

    fn finished(&self) -> bool {
        self.tick >= self.config.episode_length
    }

    fn tick_with(&mut self, buttons: Vec<i32>) -> Result<f64, EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }
        if self.finished() {
            return Ok(0.0);
        }
        #[allow(clippy::cast_precision_loss)]
        let pressed = buttons.iter().filter(|&&b| b != 0).count() as f64;
        let reward = self.config.living_reward + self.config.reward_per_press * pressed;
        self.tick += 1;
        self.total += reward;
        self.last_action = buttons;
        self.last_reward = reward;
        Ok(reward)
    }
}

impl GameEngine for ScriptedEngine {
    fn load_config(&mut self, path: &Path) -> Result<(), EngineError> {
        self.record(format!("load_config {}", path.display()));
        Ok(())
    }

    fn set_scenario_path(&mut self, path: &Path) {
        self.record(format!("scenario {}", path.display()));
    }

    fn set_map(&mut self, map: &str) {
        self.record(format!("map {map}"));
    }

    fn set_skill(&mut self, skill: u8) {
        self.record(format!("skill {skill}"));
    }

    fn set_screen_resolution(&mut self, resolution: ScreenResolution) {
        self.record(format!("resolution {}x{}", resolution.width, resolution.height));
        self.resolution = resolution;
    }

    fn set_window_visible(&mut self, visible: bool) {
        self.record(format!("window_visible {visible}"));
    }

    fn set_mode(&mut self, mode: EngineMode) {
        self.record(format!("mode {mode:?}"));
    }

    fn add_game_args(&mut self, args: &str) {
        self.record(format!("args {args}"));
    }

    fn init(&mut self) -> Result<(), EngineError> {
        self.record("init".to_string());
        if self.config.fail_init {
            return Err(EngineError::UnexpectedExit("engine process died during init".into()));
        }
        self.running = true;
        Ok(())
    }

    fn set_seed(&mut self, seed: u64) {
        self.record(format!("seed {seed}"));
    }

    fn new_episode(&mut self) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }
        self.record("new_episode".to_string());
        self.tick = 0;
        self.total = 0.0;
        self.last_action.clear();
        self.last_reward = 0.0;
        Ok(())
    }

    fn make_action(&mut self, buttons: &[i32]) -> Result<f64, EngineError> {
        self.tick_with(buttons.to_vec())
    }

    fn advance_action(&mut self) -> Result<(), EngineError> {
        self.tick_with(Vec::new()).map(|_| ())
    }

    fn state(&self) -> Option<EngineState> {
        if !self.running || self.finished() {
            return None;
        }
        let screen_buffer = if self.config.blank_screen {
            None
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let shade = (self.tick % 255) as u8 + 1;
            Some(vec![shade; self.resolution.frame_len()])
        };
        let mut variables = vec![0.0; SCRIPTED_VARIABLES];
        variables[4] = 100.0;
        #[allow(clippy::cast_precision_loss)]
        let kills = (self.tick / 5) as f64;
        variables[0] = kills;
        Some(EngineState {
            number: self.tick,
            screen_buffer,
            game_variables: Some(variables),
        })
    }

    fn is_episode_finished(&self) -> bool {
        self.finished()
    }

    fn total_reward(&self) -> f64 {
        self.total
    }

    fn last_action(&self) -> Vec<i32> {
        self.last_action.clone()
    }

    fn last_reward(&self) -> f64 {
        self.last_reward
    }

    fn close(&mut self) {
        self.record("close".to_string());
        self.running = false;
    }
}
