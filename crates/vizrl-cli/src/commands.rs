// Command implementations for the vizrl binary

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use vizrl_agent::{Dqn, DqnConfig, RandomAgent};
use vizrl_core::{
    round4, Agent, ButtonAction, Environment, ImageObservation, MultiDiscreteSpace, Reward,
    TrackedEnvironment,
};
use vizrl_env::{
    doom_action_space, CurriculumConfig, DoomEnvConfig, DrivingConfig, DrivingEnv, EngineLock,
    LevelTable, MetaDoomEnv, ScriptConfig, ScriptedEngine, TimeLimit, BUTTON_NAMES,
};

/// Settings of a curriculum run
#[derive(Debug, Clone)]
pub struct CurriculumOptions {
    pub episodes: usize,
    pub max_steps: usize,
    pub episode_length: u64,
    pub seed: Option<u64>,
    pub levels: Option<PathBuf>,
}

/// Settings of a driving run
#[derive(Debug, Clone)]
pub struct DriveOptions {
    pub steps: usize,
    pub checkpoint: Option<PathBuf>,
    pub load: bool,
    pub save: bool,
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
}

/// What a curriculum run ended with
#[derive(Debug, Clone)]
pub struct CurriculumSummary {
    pub episodes: usize,
    pub total_reward: f64,
    pub scores: Vec<f64>,
    pub locked: Vec<bool>,
}

fn load_levels(path: Option<&Path>) -> Result<LevelTable> {
    match path {
        Some(path) => LevelTable::load(path)
            .with_context(|| format!("Failed to load level table from {}", path.display())),
        None => Ok(LevelTable::default()),
    }
}

pub fn show_levels(path: Option<&Path>, json: bool) -> Result<()> {
    let table = load_levels(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("🎮 {} levels", table.len());
    for (index, level) in table.levels.iter().enumerate() {
        let buttons: Vec<&str> = level
            .actions
            .iter()
            .filter_map(|&a| BUTTON_NAMES.get(a).copied())
            .collect();
        println!(
            "  [{index}] {} (skill {}, scores {}..{})",
            level.name, level.difficulty, level.min_score, level.target_score
        );
        println!("      buttons: {}", buttons.join(", "));
    }
    Ok(())
}

pub async fn run_curriculum(options: &CurriculumOptions) -> Result<CurriculumSummary> {
    let levels = load_levels(options.levels.as_deref())?;
    let script = ScriptConfig {
        episode_length: options.episode_length,
        ..ScriptConfig::default()
    };
    let journal = Arc::new(Mutex::new(Vec::new()));
    let env_config = DoomEnvConfig {
        human_fps: 0,
        ..DoomEnvConfig::default()
    };
    let meta = MetaDoomEnv::new(
        levels,
        ScriptedEngine::factory(script, journal),
        EngineLock::new(),
        env_config,
        CurriculumConfig::default(),
    )
    .context("Failed to create curriculum environment")?;

    let mut env = TrackedEnvironment::new(TimeLimit::new(meta, options.max_steps));
    env.seed(options.seed);
    let mut agent: RandomAgent<MultiDiscreteSpace, ImageObservation> =
        RandomAgent::new(doom_action_space(), options.seed);

    info!(episodes = options.episodes, "🚀 starting curriculum run");

    let mut total_reward = 0.0;
    for episode in 0..options.episodes {
        let (mut observation, _) = env.reset().await?;
        let mut reward = Reward(0.0);
        loop {
            let action: ButtonAction = agent.update(reward, &observation).await?;
            let step = env.step(action).await?;
            total_reward = step.info.get_f64("TOTAL_REWARD").unwrap_or(total_reward);
            reward = step.reward;
            observation = step.observation;
            if step.done {
                break;
            }
        }

        let steps = env.episode_info().map_or(env.step_count, |e| e.steps);
        let meta = &env.env.env;
        let curriculum = meta.curriculum();
        let scores: Vec<f64> = curriculum.scores().into_iter().map(round4).collect();
        info!(
            episode,
            level = meta.driver().level(),
            steps,
            total = round4(curriculum.total_reward()),
            ?scores,
            locks = ?curriculum.locks().as_slice(),
            "episode done"
        );
    }

    let meta = &env.env.env;
    let summary = CurriculumSummary {
        episodes: options.episodes,
        total_reward,
        scores: meta.curriculum().scores(),
        locked: meta.curriculum().locks().as_slice().to_vec(),
    };
    env.close().await?;

    info!(
        total = round4(summary.total_reward),
        unlocked = summary.locked.iter().filter(|&&l| !l).count(),
        "✅ curriculum run finished"
    );
    Ok(summary)
}

pub async fn run_drive(options: &DriveOptions) -> Result<f64> {
    let mut config = match &options.config {
        Some(path) => DqnConfig::load(path)
            .with_context(|| format!("Failed to load agent config from {}", path.display()))?,
        None => DqnConfig::default(),
    };
    if let Some(checkpoint) = &options.checkpoint {
        config.checkpoint = checkpoint.clone();
    }
    if options.seed.is_some() {
        config.seed = options.seed;
    }
    let checkpoint = config.checkpoint.clone();

    let mut agent = Dqn::new(config).context("Failed to create agent")?;
    if options.load && !agent.load(&checkpoint).await? {
        warn!(path = %checkpoint.display(), "starting from scratch");
    }

    let driving = DrivingConfig::default();
    let (width, height) = (driving.width, driving.height);
    let mut env = DrivingEnv::new(driving)?;
    // A sand bank across the direct route to the first goal
    env.paint_sand(width / 4..width / 4 + 20, height / 3..height);

    info!(steps = options.steps, "🚗 starting driving run");

    let (mut observation, _) = env.reset().await?;
    let mut reward = Reward(0.0);
    for step_index in 1..=options.steps {
        let action = agent.update(reward, &observation).await?;
        let step = env.step(action).await?;
        reward = step.reward;
        observation = step.observation;
        if step.done {
            let (fresh, _) = env.reset().await?;
            observation = fresh;
        }
        if step_index % 1000 == 0 {
            let metrics = agent.metrics();
            info!(
                step = step_index,
                score = round4(agent.score()),
                loss = ?metrics.loss,
                "training"
            );
        }
    }

    let score = agent.score();
    if options.save {
        agent
            .save(&checkpoint)
            .await
            .with_context(|| format!("Failed to save checkpoint to {}", checkpoint.display()))?;
        info!(path = %checkpoint.display(), "💾 checkpoint saved");
    }

    info!(score = round4(score), "✅ driving run finished");
    Ok(score)
}
