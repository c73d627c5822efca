//! Episode driver: one game engine exposed as an [`Environment`]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use vizrl_core::{
    derive_seed, round4, ActionSpace, BoxObservationSpace, ButtonAction, Environment,
    ImageObservation, ImageSpace, ObservationSpace, RLError, Result, Step, StepInfo,
};

use crate::engine::{EngineError, EngineFactory, EngineMode, GameEngine, ScreenResolution};
use crate::levels::{doom_action_space, LevelConfig, LevelTable, NUM_ACTIONS};
use crate::lock::EngineLock;

/// Names of the game variables, in the order the engine reports them
pub const GAME_VARIABLE_NAMES: [&str; 22] = [
    "KILLCOUNT",
    "ITEMCOUNT",
    "SECRETCOUNT",
    "FRAGCOUNT",
    "HEALTH",
    "ARMOR",
    "DEAD",
    "ON_GROUND",
    "ATTACK_READY",
    "ALTATTACK_READY",
    "SELECTED_WEAPON",
    "SELECTED_WEAPON_AMMO",
    "AMMO1",
    "AMMO2",
    "AMMO3",
    "AMMO4",
    "AMMO5",
    "AMMO6",
    "AMMO7",
    "AMMO8",
    "AMMO9",
    "AMMO0",
];

/// Who plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    /// An agent sends actions through `step`
    Algo,
    /// A human plays in the engine window; `step` only watches
    Human,
}

/// Lifecycle of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No engine started
    Uninitialized,
    /// Level being configured and the engine started
    Loading,
    /// Episode in progress
    Running,
    /// Episode over, waiting for a reset
    Finished,
}

/// Configures the engine in place of a level table entry.
pub trait LevelCustomizer: Send + Sync {
    /// Apply custom settings to a fresh engine
    fn customize(&self, engine: &mut dyn GameEngine) -> Result<()>;
}

/// Settings of a [`DoomEnv`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoomEnvConfig {
    /// Level to load first
    pub level: usize,
    /// Directory holding `assets/` and `scenarios/`
    pub asset_dir: PathBuf,
    /// Frame size
    pub resolution: ScreenResolution,
    /// Agent or human play
    pub mode: EnvMode,
    /// Pace of the human play loop; 0 runs it flat out
    pub human_fps: u32,
}

impl Default for DoomEnvConfig {
    fn default() -> Self {
        Self {
            level: 0,
            asset_dir: PathBuf::from("."),
            resolution: ScreenResolution::default(),
            mode: EnvMode::Algo,
            human_fps: 35,
        }
    }
}

/// Callbacks the meta-environment uses to keep its books.
pub(crate) trait EpisodeHooks: Send {
    /// An episode is about to start on `level`
    fn episode_started(&mut self, _level: usize) -> Result<()> {
        Ok(())
    }

    /// One tick of human play went by; returns `(reward, total)` to report
    fn human_tick(
        &mut self,
        _level: usize,
        _config: Option<&LevelConfig>,
        engine: &dyn GameEngine,
        _info: &mut StepInfo,
    ) -> Result<(f64, f64)> {
        Ok((engine.last_reward(), engine.total_reward()))
    }
}

/// Hooks that do nothing
pub(crate) struct NoHooks;

impl EpisodeHooks for NoHooks {}

fn missing_lock(context: &str, cause: &dyn std::fmt::Display) -> RLError {
    RLError::Config(format!(
        "{context} ({cause}). This is likely caused by a missing engine lock. \
         To run several engines side by side, create one EngineLock and hand a clone \
         to every environment [e.g. env.configure(Some(lock.clone()))]."
    ))
}

/// Game engine wrapped as an environment
pub struct DoomEnv {
    levels: LevelTable,
    level: usize,
    previous_level: Option<usize>,
    factory: EngineFactory,
    engine: Box<dyn GameEngine>,
    lock: EngineLock,
    config: DoomEnvConfig,
    state: DriverState,
    allowed_actions: Vec<usize>,
    pending_seed: u64,
    customizer: Option<Box<dyn LevelCustomizer>>,
    no_render: bool,
}

impl DoomEnv {
    /// Create a driver; nothing is started until the first reset
    pub fn new(
        levels: LevelTable,
        factory: EngineFactory,
        lock: EngineLock,
        config: DoomEnvConfig,
    ) -> Result<Self> {
        levels.validate()?;
        levels.get(config.level)?;
        let engine = factory();
        Ok(Self {
            level: config.level,
            levels,
            previous_level: None,
            factory,
            engine,
            lock,
            config,
            state: DriverState::Uninitialized,
            allowed_actions: (0..NUM_ACTIONS).collect(),
            // The first episode is always seeded.
            pending_seed: derive_seed(None),
            customizer: None,
            no_render: false,
        })
    }

    /// Replace level loading with a custom engine setup
    #[must_use]
    pub fn with_customizer(mut self, customizer: Box<dyn LevelCustomizer>) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Swap the engine lock
    pub fn configure(&mut self, lock: Option<EngineLock>) {
        if let Some(lock) = lock {
            self.lock = lock;
        }
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current level index
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Level the engine was last loaded with
    #[must_use]
    pub fn previous_level(&self) -> Option<usize> {
        self.previous_level
    }

    /// Choose the level for the next load
    pub fn set_level(&mut self, level: usize) -> Result<()> {
        self.levels.get(level)?;
        self.level = level;
        Ok(())
    }

    /// The level table
    #[must_use]
    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    /// Action indices the current level accepts
    #[must_use]
    pub fn allowed_actions(&self) -> &[usize] {
        &self.allowed_actions
    }

    /// The wrapped engine
    #[must_use]
    pub fn engine(&self) -> &dyn GameEngine {
        self.engine.as_ref()
    }

    /// Agent or human play
    #[must_use]
    pub fn mode(&self) -> EnvMode {
        self.config.mode
    }

    /// Whether the engine has been started and not closed since
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, DriverState::Running | DriverState::Finished)
    }

    /// Whether the driver suppresses rendering because the engine draws itself
    #[must_use]
    pub fn no_render(&self) -> bool {
        self.no_render
    }

    fn current_level_config(&self) -> Option<&LevelConfig> {
        if self.customizer.is_some() {
            None
        } else {
            self.levels.levels.get(self.level)
        }
    }

    /// Black frame of the configured size
    #[must_use]
    pub fn blank_frame(&self) -> ImageObservation {
        let resolution = self.config.resolution;
        ImageObservation::zeros(resolution.height, resolution.width, ScreenResolution::CHANNELS)
    }

    fn frame_from(&self, buffer: Vec<u8>) -> ImageObservation {
        let resolution = self.config.resolution;
        ImageObservation {
            data: buffer,
            height: resolution.height,
            width: resolution.width,
            channels: ScreenResolution::CHANNELS,
        }
    }

    /// Current frame, or a black frame when the episode is over
    #[must_use]
    pub fn render_frame(&self) -> ImageObservation {
        match self.engine.state().and_then(|s| s.screen_buffer) {
            Some(buffer) => self.frame_from(buffer),
            None => self.blank_frame(),
        }
    }

    /// Info map holding the level and the game variables
    #[must_use]
    pub fn game_variables(&self, variables: Option<&[f64]>) -> StepInfo {
        let mut info = StepInfo::default();
        let level = if self.customizer.is_some() {
            -1
        } else {
            i64::try_from(self.level).unwrap_or(i64::MAX)
        };
        info.insert("LEVEL", level);
        if let Some(variables) = variables {
            for (name, value) in GAME_VARIABLE_NAMES.iter().zip(variables) {
                info.insert(*name, *value);
            }
        }
        info
    }

    /// Pad or cut the action vector to full length, then keep the entries
    /// this level accepts
    fn engine_buttons(&self, mut values: Vec<i32>) -> Vec<i32> {
        if values.len() != NUM_ACTIONS {
            warn!(
                got = values.len(),
                "action list must contain {NUM_ACTIONS} items; padding with 0 or dropping extras"
            );
            values.resize(NUM_ACTIONS, 0);
        }
        if self.allowed_actions.is_empty() {
            values
        } else {
            self.allowed_actions.iter().map(|&i| values[i]).collect()
        }
    }

    fn apply_level(&mut self) -> Result<()> {
        let level = self.levels.get(self.level)?.clone();
        let assets = self.config.asset_dir.join("assets").join(&level.config);
        let scenario = self.config.asset_dir.join("scenarios").join(&level.scenario);
        self.engine.load_config(&assets)?;
        self.engine.set_scenario_path(&scenario);
        if !level.map.is_empty() {
            self.engine.set_map(&level.map);
        }
        self.engine.set_skill(level.difficulty);
        self.allowed_actions = level.actions;
        self.engine.set_screen_resolution(self.config.resolution);
        Ok(())
    }

    async fn init_engine(&mut self) -> Result<()> {
        let result = {
            let _guard = self.lock.acquire().await;
            self.engine.init()
        };
        result.map_err(|err| {
            self.state = DriverState::Uninitialized;
            missing_lock("engine exited unexpectedly", &err)
        })
    }

    /// Start an episode on the running engine
    fn start_episode(&mut self, hooks: &mut dyn EpisodeHooks) -> Result<()> {
        hooks.episode_started(self.level)?;
        if self.pending_seed > 0 {
            self.engine.set_seed(self.pending_seed);
            self.pending_seed = 0;
        }
        self.engine.new_episode()?;
        self.state = DriverState::Running;
        Ok(())
    }

    /// (Re)load the current level into a fresh engine and start an episode
    pub(crate) async fn load_level(
        &mut self,
        hooks: &mut dyn EpisodeHooks,
    ) -> Result<ImageObservation> {
        if self.is_initialized() {
            {
                let _guard = self.lock.acquire().await;
                self.engine.close();
            }
            self.engine = (self.factory)();
        }
        self.state = DriverState::Loading;

        if let Some(customizer) = &self.customizer {
            customizer.customize(self.engine.as_mut())?;
        } else {
            self.apply_level()?;
        }
        self.previous_level = Some(self.level);
        info!(level = self.level, mode = ?self.config.mode, "loading level");

        match self.config.mode {
            EnvMode::Algo => {
                self.engine.set_window_visible(false);
                self.engine.set_mode(EngineMode::Player);
                self.no_render = false;
                self.init_engine().await?;
                self.start_episode(hooks)?;
                self.first_frame()
            }
            EnvMode::Human => {
                self.engine.add_game_args("+freelook 1");
                self.engine.set_window_visible(true);
                self.engine.set_mode(EngineMode::Spectator);
                self.no_render = true;
                self.init_engine().await?;
                self.start_episode(hooks)?;
                self.play_human_mode(hooks).await?;
                Ok(self.blank_frame())
            }
        }
    }

    fn first_frame(&self) -> Result<ImageObservation> {
        self.engine
            .state()
            .and_then(|s| s.screen_buffer)
            .map(|buffer| self.frame_from(buffer))
            .ok_or_else(|| missing_lock("engine incorrectly initiated", &"no screen buffer"))
    }

    /// Start another episode on the already running engine
    pub(crate) fn restart_episode(
        &mut self,
        hooks: &mut dyn EpisodeHooks,
    ) -> Result<ImageObservation> {
        self.start_episode(hooks)?;
        self.first_frame()
    }

    pub(crate) async fn reset_with(
        &mut self,
        hooks: &mut dyn EpisodeHooks,
    ) -> Result<ImageObservation> {
        if self.is_initialized() {
            self.restart_episode(hooks)
        } else {
            self.load_level(hooks).await
        }
    }

    /// Let a human play the current episode to the end, logging every tick
    pub(crate) async fn play_human_mode(&mut self, hooks: &mut dyn EpisodeHooks) -> Result<()> {
        let delay = match self.config.human_fps {
            0 => None,
            fps => Some(Duration::from_secs(1) / fps),
        };
        while !self.engine.is_episode_finished() {
            self.engine.advance_action()?;
            let state = self.engine.state();
            let variables = state.as_ref().and_then(|s| s.game_variables.as_deref());
            let mut info = self.game_variables(variables);
            let (reward, total) = hooks.human_tick(
                self.level,
                self.current_level_config(),
                self.engine.as_ref(),
                &mut info,
            )?;
            info.insert("TOTAL_REWARD", round4(total));
            info!(
                state = state.as_ref().map_or(0, |s| s.number),
                action = ?self.engine.last_action(),
                reward,
                total_reward = total,
                variables = %serde_json::Value::Object(info.fields),
                "human tick"
            );
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
        info!("human episode done");
        Ok(())
    }

    /// Send one action to the engine
    pub async fn step_action(&mut self, action: ButtonAction) -> Result<Step<ImageObservation>> {
        let buttons = self.engine_buttons(action.0);
        let reward = match self.engine.make_action(&buttons) {
            Ok(reward) => reward,
            Err(EngineError::NotRunning) => {
                debug!("step on an engine that is not running");
                return Ok(Step::new(self.blank_frame(), 0.0, true, StepInfo::default()));
            }
            Err(err) => return Err(err.into()),
        };

        let state = self.engine.state();
        let variables = state.as_ref().and_then(|s| s.game_variables.as_deref());
        let mut info = self.game_variables(variables);
        info.insert("TOTAL_REWARD", round4(self.engine.total_reward()));

        if self.engine.is_episode_finished() {
            self.state = DriverState::Finished;
            return Ok(Step::new(self.blank_frame(), reward, true, info));
        }
        let observation = match state.and_then(|s| s.screen_buffer) {
            Some(buffer) => self.frame_from(buffer),
            None => self.blank_frame(),
        };
        Ok(Step::new(observation, reward, false, info))
    }

    /// Derive and stash the seed for the next episode start
    pub fn set_seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.pending_seed = derive_seed(seed);
        vec![self.pending_seed]
    }

    /// Shut the engine down under the engine lock
    pub async fn shutdown(&mut self) {
        {
            let _guard = self.lock.acquire().await;
            self.engine.close();
        }
        self.state = DriverState::Uninitialized;
    }
}

#[async_trait]
impl Environment for DoomEnv {
    type Observation = ImageObservation;
    type Action = ButtonAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        let resolution = self.config.resolution;
        let shape = vec![resolution.height, resolution.width, ScreenResolution::CHANNELS];
        Box::new(ImageSpace(BoxObservationSpace {
            low: 0.0,
            high: 255.0,
            shape,
        }))
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(doom_action_space())
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        let observation = self.reset_with(&mut NoHooks).await?;
        Ok((observation, StepInfo::default()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        self.step_action(action).await
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.set_seed(seed)
    }

    async fn render(&self) -> Result<()> {
        if !self.no_render {
            let frame = self.render_frame();
            debug!(height = frame.height, width = frame.width, "frame ready");
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Journal, ScriptConfig, ScriptedEngine};
    use vizrl_core::Observation;

    fn small_config() -> DoomEnvConfig {
        DoomEnvConfig {
            asset_dir: PathBuf::from("/doom"),
            resolution: ScreenResolution::new(4, 3),
            human_fps: 0,
            ..DoomEnvConfig::default()
        }
    }

    fn make_env(script: ScriptConfig, journal: &Journal) -> DoomEnv {
        DoomEnv::new(
            LevelTable::default(),
            ScriptedEngine::factory(script, journal.clone()),
            EngineLock::new(),
            small_config(),
        )
        .unwrap()
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_reset_loads_level_from_table() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        assert_eq!(env.state(), DriverState::Uninitialized);

        let (obs, _) = env.reset().await.unwrap();
        assert_eq!(obs.shape(), vec![3, 4, 3]);
        assert!(!obs.is_blank());
        assert_eq!(env.state(), DriverState::Running);
        assert_eq!(env.allowed_actions(), &[0, 10, 11]);

        let log = entries(&journal);
        assert!(log.contains(&"load_config /doom/assets/basic.cfg".to_string()));
        assert!(log.contains(&"scenario /doom/scenarios/basic.wad".to_string()));
        assert!(log.contains(&"map map01".to_string()));
        assert!(log.contains(&"skill 5".to_string()));
        assert!(log.contains(&"window_visible false".to_string()));
        assert!(log.contains(&"mode Player".to_string()));
        let init = log.iter().position(|e| e == "init").unwrap();
        let episode = log.iter().position(|e| e == "new_episode").unwrap();
        assert!(init < episode);
    }

    #[tokio::test]
    async fn test_level_without_map_skips_set_map() {
        let journal = Journal::default();
        let mut config = small_config();
        config.level = 1;
        let mut env = DoomEnv::new(
            LevelTable::default(),
            ScriptedEngine::factory(ScriptConfig::default(), journal.clone()),
            EngineLock::new(),
            config,
        )
        .unwrap();
        env.reset().await.unwrap();
        assert!(!entries(&journal).iter().any(|e| e.starts_with("map ")));
        assert!(DoomEnv::new(
            LevelTable::default(),
            ScriptedEngine::factory(ScriptConfig::default(), journal.clone()),
            EngineLock::new(),
            DoomEnvConfig { level: 42, ..small_config() },
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_step_pads_and_restricts_actions() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        env.reset().await.unwrap();

        // Short vector: ATTACK pressed, everything past index 1 padded with 0.
        let step = env.step(ButtonAction(vec![1, 1])).await.unwrap();
        assert_eq!(env.engine().last_action(), vec![1, 0, 0]);
        assert_eq!(step.reward.value(), -0.5);
        assert!(!step.done);
        assert_eq!(step.info.get_f64("LEVEL"), Some(0.0));
        assert_eq!(step.info.get_f64("HEALTH"), Some(100.0));
        assert_eq!(step.info.get_f64("TOTAL_REWARD"), Some(-0.5));

        let step = env.step(ButtonAction::pressing(NUM_ACTIONS, &[10, 11, 20])).await.unwrap();
        assert_eq!(env.engine().last_action(), vec![0, 1, 1]);
        assert_eq!(step.reward.value(), 0.0);
    }

    fn open_level_table() -> LevelTable {
        LevelTable::from_toml_str(
            r#"
            [[level]]
            name = "Open"
            config = "open.cfg"
            scenario = "open.wad"
            difficulty = 3
            actions = []
            min_score = 0.0
            target_score = 10.0
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_long_action_vector_is_truncated() {
        let journal = Journal::default();
        let mut env = DoomEnv::new(
            open_level_table(),
            ScriptedEngine::factory(ScriptConfig::default(), journal.clone()),
            EngineLock::new(),
            small_config(),
        )
        .unwrap();
        env.reset().await.unwrap();

        let mut buttons = vec![0; 50];
        buttons[42] = 1;
        buttons[47] = 1;
        env.step(ButtonAction(buttons)).await.unwrap();
        let sent = env.engine().last_action();
        assert_eq!(sent.len(), NUM_ACTIONS);
        assert_eq!(sent[42], 1);
        assert_eq!(sent.iter().filter(|&&b| b != 0).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_action_subset_forwards_every_button() {
        let journal = Journal::default();
        let mut env = DoomEnv::new(
            open_level_table(),
            ScriptedEngine::factory(ScriptConfig::default(), journal.clone()),
            EngineLock::new(),
            small_config(),
        )
        .unwrap();
        env.reset().await.unwrap();
        assert!(env.allowed_actions().is_empty());

        let step = env.step(ButtonAction::pressing(NUM_ACTIONS, &[0, 42])).await.unwrap();
        let sent = env.engine().last_action();
        assert_eq!(sent.len(), NUM_ACTIONS);
        assert_eq!(sent[0], 1);
        assert_eq!(sent[42], 1);
        assert_eq!(step.reward.value(), 0.0);
    }

    #[tokio::test]
    async fn test_first_episode_is_seeded_without_explicit_seed() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        env.reset().await.unwrap();
        env.reset().await.unwrap();
        let log = entries(&journal);
        let seeded = log.iter().filter(|e| e.starts_with("seed ")).count();
        assert_eq!(seeded, 1);
        let seed = log.iter().position(|e| e.starts_with("seed ")).unwrap();
        let episode = log.iter().position(|e| e == "new_episode").unwrap();
        assert!(seed < episode);
    }

    #[tokio::test]
    async fn test_episode_end_returns_blank_frame() {
        let journal = Journal::default();
        let script = ScriptConfig { episode_length: 2, ..ScriptConfig::default() };
        let mut env = make_env(script, &journal);
        env.reset().await.unwrap();

        env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        let last = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert!(last.done);
        assert!(last.observation.is_blank());
        assert_eq!(last.info.get_f64("TOTAL_REWARD"), Some(-2.0));
        assert!(last.info.get("HEALTH").is_none());
        assert_eq!(env.state(), DriverState::Finished);

        // Reset reuses the running engine.
        env.reset().await.unwrap();
        let inits = entries(&journal).iter().filter(|e| *e == "init").count();
        assert_eq!(inits, 1);
        assert_eq!(env.state(), DriverState::Running);
    }

    #[tokio::test]
    async fn test_step_on_stopped_engine_is_terminal() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        env.reset().await.unwrap();
        env.close().await.unwrap();
        assert_eq!(env.state(), DriverState::Uninitialized);

        let step = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert!(step.done);
        assert_eq!(step.reward.value(), 0.0);
        assert!(step.info.is_empty());
        assert!(step.observation.is_blank());
    }

    #[tokio::test]
    async fn test_init_failure_asks_for_lock() {
        let journal = Journal::default();
        let script = ScriptConfig { fail_init: true, ..ScriptConfig::default() };
        let mut env = make_env(script, &journal);
        match env.reset().await {
            Err(RLError::Config(message)) => assert!(message.contains("EngineLock")),
            other => panic!("expected a configuration error, got {other:?}"),
        }
        assert_eq!(env.state(), DriverState::Uninitialized);
    }

    #[tokio::test]
    async fn test_missing_screen_buffer_is_fatal() {
        let journal = Journal::default();
        let script = ScriptConfig { blank_screen: true, ..ScriptConfig::default() };
        let mut env = make_env(script, &journal);
        assert!(matches!(env.reset().await, Err(RLError::Config(_))));
    }

    #[tokio::test]
    async fn test_seed_applies_once() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        let seeds = env.seed(Some(7));
        assert_eq!(seeds, vec![derive_seed(Some(7))]);

        env.reset().await.unwrap();
        env.reset().await.unwrap();
        let seeded = entries(&journal).iter().filter(|e| e.starts_with("seed ")).count();
        assert_eq!(seeded, 1);
        assert!(entries(&journal).contains(&format!("seed {}", seeds[0])));
    }

    struct FixedSkill;

    impl LevelCustomizer for FixedSkill {
        fn customize(&self, engine: &mut dyn GameEngine) -> Result<()> {
            engine.set_skill(2);
            engine.set_screen_resolution(ScreenResolution::new(4, 3));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_customizer_replaces_level_table() {
        let journal = Journal::default();
        let mut env =
            make_env(ScriptConfig::default(), &journal).with_customizer(Box::new(FixedSkill));
        env.reset().await.unwrap();
        let log = entries(&journal);
        assert!(log.contains(&"skill 2".to_string()));
        assert!(!log.iter().any(|e| e.starts_with("load_config")));

        let step = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert_eq!(step.info.get_f64("LEVEL"), Some(-1.0));
        assert_eq!(env.allowed_actions().len(), NUM_ACTIONS);
    }

    #[tokio::test]
    async fn test_human_mode_plays_episode_out() {
        let journal = Journal::default();
        let script = ScriptConfig { episode_length: 3, ..ScriptConfig::default() };
        let mut env = DoomEnv::new(
            LevelTable::default(),
            ScriptedEngine::factory(script, journal.clone()),
            EngineLock::new(),
            DoomEnvConfig { mode: EnvMode::Human, ..small_config() },
        )
        .unwrap();
        let (obs, _) = env.reset().await.unwrap();
        assert!(obs.is_blank());
        assert!(env.no_render());
        assert!(env.engine().is_episode_finished());
        let log = entries(&journal);
        assert!(log.contains(&"args +freelook 1".to_string()));
        assert!(log.contains(&"mode Spectator".to_string()));
    }

    #[tokio::test]
    async fn test_shared_lock_is_kept() {
        let journal = Journal::default();
        let mut env = make_env(ScriptConfig::default(), &journal);
        let shared = EngineLock::new();
        env.configure(Some(shared.clone()));
        env.configure(None);
        assert!(env.lock.is_shared_with(&shared));
    }
}
