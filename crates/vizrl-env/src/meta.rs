//! Meta-environment: every level behind one environment, scored as a
//! curriculum
//!
//! Rewards are changes of the curriculum total, the sum over levels of the
//! rolling standardized score. Finishing an episode runs the unlock pass and
//! the next `step` moves to the unlocked level with the weakest average.

use async_trait::async_trait;
use tracing::info;

use vizrl_core::{
    round4, ActionSpace, ButtonAction, Environment, ImageObservation, ObservationSpace, RLError,
    Result, Step, StepInfo,
};

use crate::curriculum::{Curriculum, CurriculumConfig};
use crate::doom::{DoomEnv, DoomEnvConfig, EnvMode, EpisodeHooks};
use crate::engine::{EngineFactory, GameEngine};
use crate::levels::{LevelConfig, LevelTable};
use crate::lock::EngineLock;

fn curriculum_info(curriculum: &Curriculum, info: &mut StepInfo) {
    info.insert("SCORES", curriculum.scores());
    info.insert("TOTAL_REWARD", round4(curriculum.total_reward()));
    info.insert("LOCKED_LEVELS", curriculum.locks().as_slice().to_vec());
}

impl EpisodeHooks for Curriculum {
    fn episode_started(&mut self, level: usize) -> Result<()> {
        Curriculum::episode_started(self, level)
    }

    fn human_tick(
        &mut self,
        level: usize,
        config: Option<&LevelConfig>,
        engine: &dyn GameEngine,
        info: &mut StepInfo,
    ) -> Result<(f64, f64)> {
        let config = config.ok_or_else(|| {
            RLError::Environment("curriculum scoring needs a level table entry".into())
        })?;
        let previous = self.total_reward();
        let scored = self.calculate_reward(level, config, engine.total_reward(), previous)?;
        curriculum_info(self, info);
        Ok(scored)
    }
}

/// Curriculum environment over a level table
pub struct MetaDoomEnv {
    driver: DoomEnv,
    curriculum: Curriculum,
    find_new_level: bool,
}

impl MetaDoomEnv {
    /// Start on the first level with only that level unlocked
    pub fn new(
        levels: LevelTable,
        factory: EngineFactory,
        lock: EngineLock,
        env_config: DoomEnvConfig,
        curriculum_config: CurriculumConfig,
    ) -> Result<Self> {
        let driver = DoomEnv::new(levels, factory, lock, DoomEnvConfig { level: 0, ..env_config })?;
        let curriculum = Curriculum::new(driver.levels().len(), curriculum_config);
        Ok(Self {
            driver,
            curriculum,
            find_new_level: false,
        })
    }

    /// The wrapped driver
    #[must_use]
    pub fn driver(&self) -> &DoomEnv {
        &self.driver
    }

    /// Curriculum state
    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    /// Whether the next `step` will switch levels first
    #[must_use]
    pub fn is_level_change_pending(&self) -> bool {
        self.find_new_level
    }

    /// Swap the engine lock
    pub fn configure(&mut self, lock: Option<EngineLock>) {
        self.driver.configure(lock);
    }

    /// Move to `level` if it is unlocked, otherwise to the curriculum's pick,
    /// and start an episode there.
    pub async fn change_level(&mut self, level: Option<usize>) -> Result<ImageObservation> {
        if let Some(level) = level {
            self.driver.levels().get(level)?;
        }
        self.find_new_level = false;
        let target = match level {
            Some(level) if !self.curriculum.locks().is_locked(level) => level,
            _ => self.curriculum.next_level(),
        };
        if target != self.driver.level() {
            info!(from = self.driver.level(), to = target, "changing level");
        }
        self.driver.set_level(target)?;
        self.start().await
    }

    async fn start(&mut self) -> Result<ImageObservation> {
        let same_level = self.driver.previous_level() == Some(self.driver.level());
        if self.driver.is_initialized() && same_level {
            self.driver.restart_episode(&mut self.curriculum)
        } else {
            self.driver.load_level(&mut self.curriculum).await
        }
    }

    /// Step the current level and score it against the curriculum
    pub async fn step_action(&mut self, action: ButtonAction) -> Result<Step<ImageObservation>> {
        if self.find_new_level {
            self.change_level(None).await?;
        }

        let (observation, reward, done, mut info) = if self.driver.mode() == EnvMode::Human {
            self.driver.play_human_mode(&mut self.curriculum).await?;
            self.curriculum.take_new_episode();
            (self.driver.blank_frame(), 0.0, true, self.driver.game_variables(None))
        } else {
            let step = self.driver.step_action(action).await?;
            let level = self.driver.level();
            let config = self.driver.levels().get(level)?;
            let previous = self.curriculum.total_reward();
            let (mut reward, total) = self.curriculum.calculate_reward(
                level,
                config,
                self.driver.engine().total_reward(),
                previous,
            )?;
            // The first step of an episode pays out the whole total.
            if self.curriculum.take_new_episode() {
                reward = total;
            }
            (step.observation, reward, step.done, step.info)
        };

        if done {
            let unlocked = self.curriculum.unlock_levels();
            if !unlocked.is_empty() {
                info!(?unlocked, "levels unlocked");
            }
            info!(
                level = self.driver.level(),
                total = round4(self.curriculum.total_reward()),
                scores = ?self.curriculum.scores(),
                "episode finished"
            );
            self.find_new_level = true;
        }

        // LOCKED_LEVELS reflects any unlock earned by this episode.
        curriculum_info(&self.curriculum, &mut info);

        Ok(Step::new(observation, reward, done, info))
    }
}

#[async_trait]
impl Environment for MetaDoomEnv {
    type Observation = ImageObservation;
    type Action = ButtonAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.driver.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.driver.action_space()
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        if self.find_new_level {
            // The next step switches levels and starts the episode itself.
            let mut info = StepInfo::default();
            info.insert("PENDING_LEVEL_CHANGE", true);
            return Ok((self.driver.blank_frame(), info));
        }
        let observation = self.start().await?;
        Ok((observation, StepInfo::default()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        self.step_action(action).await
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.driver.set_seed(seed)
    }

    async fn render(&self) -> Result<()> {
        self.driver.render().await
    }

    async fn close(&mut self) -> Result<()> {
        self.driver.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScreenResolution;
    use crate::levels::NUM_ACTIONS;
    use crate::scripted::{Journal, ScriptConfig, ScriptedEngine};
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn env_config(mode: EnvMode) -> DoomEnvConfig {
        DoomEnvConfig {
            asset_dir: PathBuf::from("/doom"),
            resolution: ScreenResolution::new(4, 3),
            mode,
            human_fps: 0,
            ..DoomEnvConfig::default()
        }
    }

    fn make_meta(
        episode_length: u64,
        curriculum: CurriculumConfig,
        mode: EnvMode,
        journal: &Journal,
    ) -> MetaDoomEnv {
        let script = ScriptConfig { episode_length, ..ScriptConfig::default() };
        MetaDoomEnv::new(
            LevelTable::default(),
            ScriptedEngine::factory(script, journal.clone()),
            EngineLock::new(),
            env_config(mode),
            curriculum,
        )
        .unwrap()
    }

    fn count(journal: &Journal, entry: &str) -> usize {
        journal.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    #[tokio::test]
    async fn test_first_step_of_episode_pays_whole_total() {
        let journal = Journal::default();
        let mut env = make_meta(2, CurriculumConfig::default(), EnvMode::Algo, &journal);
        env.reset().await.unwrap();
        assert_eq!(env.curriculum().locks().as_slice()[..2], [false, true]);

        // Raw -1 on Basic standardizes to 968; the window holds five slots.
        let first = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert_relative_eq!(first.reward.value(), 193.6, epsilon = 1e-9);
        let last = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert!(last.done);
        assert_relative_eq!(last.reward.value(), -0.4, epsilon = 1e-9);
        assert_relative_eq!(last.info.get_f64("TOTAL_REWARD").unwrap(), 193.2);
        assert!(env.is_level_change_pending());

        // Level 0 is the only unlocked level, so the engine is reused.
        let next = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert!(!env.is_level_change_pending());
        assert_eq!(env.driver().level(), 0);
        assert_eq!(count(&journal, "init"), 1);
        assert_eq!(count(&journal, "new_episode"), 2);
        // Window is [968, 966, 0, 0, 0]: total 386.8 rather than the 193.6 delta.
        assert_relative_eq!(next.reward.value(), 386.8, epsilon = 1e-9);
        let scores = next.info.get("SCORES").unwrap().as_array().unwrap();
        assert_eq!(scores.len(), 9);
    }

    #[tokio::test]
    async fn test_reset_while_change_pending_is_a_no_op() {
        let journal = Journal::default();
        let mut env = make_meta(1, CurriculumConfig::default(), EnvMode::Algo, &journal);
        env.reset().await.unwrap();
        let step = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert!(step.done);

        let (obs, info) = env.reset().await.unwrap();
        assert!(obs.is_blank());
        assert_eq!(info.get("PENDING_LEVEL_CHANGE"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(count(&journal, "new_episode"), 1);
    }

    #[tokio::test]
    async fn test_passing_grade_unlocks_and_moves_on() {
        let journal = Journal::default();
        let config = CurriculumConfig { passing_grade: 100.0, ..CurriculumConfig::default() };
        let mut env = make_meta(1, config, EnvMode::Algo, &journal);
        env.reset().await.unwrap();

        // The info already shows the unlock earned by this episode.
        let step = env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        let locked = step.info.get("LOCKED_LEVELS").unwrap().as_array().unwrap();
        assert_eq!(locked[1], serde_json::Value::Bool(false));
        assert_eq!(locked[2], serde_json::Value::Bool(true));
        assert!(!env.curriculum().locks().is_locked(1));
        assert!(env.curriculum().locks().is_locked(2));

        // Level 1 has never been played, so its average of 0 is the lowest.
        env.step(ButtonAction::idle(NUM_ACTIONS)).await.unwrap();
        assert_eq!(env.driver().level(), 1);
        assert_eq!(count(&journal, "init"), 2);
        assert_eq!(count(&journal, "close"), 1);
    }

    #[tokio::test]
    async fn test_change_level_respects_locks() {
        let journal = Journal::default();
        let mut env = make_meta(5, CurriculumConfig::default(), EnvMode::Algo, &journal);
        env.reset().await.unwrap();

        env.change_level(Some(4)).await.unwrap();
        assert_eq!(env.driver().level(), 0);
        assert!(matches!(
            env.change_level(Some(99)).await,
            Err(RLError::UnknownLevel { index: 99, count: 9 })
        ));
    }

    #[tokio::test]
    async fn test_human_mode_scores_every_tick() {
        let journal = Journal::default();
        let mut env = make_meta(2, CurriculumConfig::default(), EnvMode::Human, &journal);
        let (obs, _) = env.reset().await.unwrap();
        assert!(obs.is_blank());
        assert_relative_eq!(env.curriculum().total_reward(), 193.2, epsilon = 1e-9);

        let step = env.step(ButtonAction::default()).await.unwrap();
        assert!(step.done);
        assert_eq!(step.reward.value(), 0.0);
        assert_eq!(step.info.get_f64("LEVEL"), Some(0.0));
        assert!(step.info.get("HEALTH").is_none());
        assert!(step.info.get("SCORES").is_some());
        assert!(env.is_level_change_pending());
    }
}
