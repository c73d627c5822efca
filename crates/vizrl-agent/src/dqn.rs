//! Deep Q-Network (DQN) agent
//!
//! The agent is driven one tick at a time through [`Dqn::update_signal`]:
//! it stores the previous transition, picks the next action by a softmax
//! draw over temperature-scaled Q-values and, once the memory holds enough
//! transitions, takes one gradient step on a random batch.

use async_trait::async_trait;
use ndarray::{Array1, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use vizrl_core::{
    Agent, AgentConfig, AgentMetrics, DiscreteAction, RLError, Result, Reward, Transition,
    VectorObservation,
};

use crate::buffer::{ReplayMemory, TransitionBatch};
use crate::network::QNetwork;
use crate::optimizer::{Adam, AdamConfig};

/// DQN-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Length of the state vector
    pub input_size: usize,
    /// Number of discrete actions
    pub nb_action: usize,
    /// Hidden layer width
    pub hidden_size: usize,
    /// Multiplier on Q-values before the softmax
    pub temperature: f64,
    /// Learning starts once the memory holds more than this many transitions
    pub learn_start: usize,
    /// Number of recent rewards behind [`Dqn::score`]
    pub reward_window: usize,
    /// Adam moment decay rates
    pub betas: (f64, f64),
    /// Adam epsilon
    pub adam_epsilon: f64,
    /// Checkpoint file
    pub checkpoint: PathBuf,
    /// Seed for weight init, sampling and batches; entropy when absent
    pub seed: Option<u64>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            input_size: 5,
            nb_action: 3,
            hidden_size: 30,
            temperature: 100.0,
            learn_start: 100,
            reward_window: 1000,
            betas: (0.9, 0.999),
            adam_epsilon: 1e-8,
            checkpoint: PathBuf::from("last_brain.json"),
            seed: None,
        }
    }
}

impl DqnConfig {
    /// Read a configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.nb_action == 0 || self.hidden_size == 0 {
            return Err(RLError::Config("network sizes must be positive".into()));
        }
        if self.base.batch_size == 0 || self.base.batch_size > self.base.buffer_size {
            return Err(RLError::Config(format!(
                "batch size {} must be in 1..={}",
                self.base.batch_size, self.base.buffer_size
            )));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(RLError::Config(format!(
                "temperature {} must be positive",
                self.temperature
            )));
        }
        Ok(())
    }

    fn adam(&self) -> AdamConfig {
        AdamConfig {
            learning_rate: self.base.learning_rate,
            beta1: self.betas.0,
            beta2: self.betas.1,
            epsilon: self.adam_epsilon,
        }
    }
}

/// On-disk checkpoint: network weights plus optimizer state
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    model: QNetwork,
    optimizer: Adam,
}

/// DQN agent
pub struct Dqn {
    config: DqnConfig,
    model: QNetwork,
    optimizer: Adam,
    memory: ReplayMemory<Array1<f64>, usize>,
    last_state: Array1<f64>,
    last_action: usize,
    last_reward: f64,
    reward_window: VecDeque<f64>,
    rng: StdRng,
    total_steps: usize,
    train_steps: usize,
    last_loss: Option<f64>,
}

impl Dqn {
    /// Create an agent with a freshly initialized network
    pub fn new(config: DqnConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let model = QNetwork::new(
            config.input_size,
            config.hidden_size,
            config.nb_action,
            &mut rng,
        );
        let optimizer = Adam::new(config.adam(), model.params());
        Ok(Self {
            memory: ReplayMemory::new(config.base.buffer_size),
            last_state: Array1::zeros(config.input_size),
            last_action: 0,
            last_reward: 0.0,
            reward_window: VecDeque::with_capacity(config.reward_window + 1),
            rng,
            total_steps: 0,
            train_steps: 0,
            last_loss: None,
            model,
            optimizer,
            config,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// The Q-network
    #[must_use]
    pub fn model(&self) -> &QNetwork {
        &self.model
    }

    /// Transitions in memory
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Draw an action from `softmax(Q(state) * temperature)`
    pub fn select_action(&mut self, state: &ArrayView1<f64>) -> Result<usize> {
        let logits = self.model.forward_one(state)? * self.config.temperature;
        let max = logits.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let weights = logits.mapv(|l| (l - max).exp());
        let dist =
            WeightedIndex::new(weights.iter()).map_err(|e| RLError::Computation(e.to_string()))?;
        Ok(dist.sample(&mut self.rng))
    }

    /// One gradient step on `batch`; returns the loss before the step
    pub fn learn(&mut self, batch: &TransitionBatch) -> Result<f64> {
        let next_q = self.model.forward(&batch.next_states.view())?;
        let next_max =
            next_q.map_axis(Axis(1), |row| row.fold(f64::NEG_INFINITY, |a, &b| a.max(b)));
        let targets = &batch.rewards + &(next_max * self.config.base.gamma);

        let (loss, grads) = self
            .model
            .loss_and_gradients(&batch.states.view(), &batch.actions, &targets.view())?;
        self.optimizer.step(self.model.params_mut(), &grads);
        self.train_steps += 1;
        self.last_loss = Some(loss);
        Ok(loss)
    }

    /// Take the reward for the previous action and the new signal, learn,
    /// and return the next action.
    pub fn update_signal(&mut self, reward: f64, signal: &[f64]) -> Result<usize> {
        if signal.len() != self.config.input_size {
            return Err(RLError::DimensionMismatch {
                expected: self.config.input_size,
                actual: signal.len(),
            });
        }
        let new_state = Array1::from(signal.to_vec());
        self.memory.push(Transition::new(
            std::mem::replace(&mut self.last_state, new_state.clone()),
            new_state.clone(),
            self.last_action,
            self.last_reward,
        ));

        let action = self.select_action(&new_state.view())?;
        if self.memory.len() > self.config.learn_start {
            let batch_size = self.config.base.batch_size;
            if let Some(batch) = self.memory.sample_batch(batch_size, &mut self.rng)? {
                let loss = self.learn(&batch)?;
                debug!(loss, step = self.train_steps, "learned");
            }
        }

        self.last_action = action;
        self.last_reward = reward;
        self.reward_window.push_back(reward);
        if self.reward_window.len() > self.config.reward_window {
            self.reward_window.pop_front();
        }
        self.total_steps += 1;
        Ok(action)
    }

    /// Mean of recent rewards, damped by one extra slot
    #[must_use]
    pub fn score(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let slots = (self.reward_window.len() + 1) as f64;
        self.reward_window.iter().sum::<f64>() / slots
    }

    /// Write network and optimizer state to `path`
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let checkpoint = Checkpoint {
            model: self.model.clone(),
            optimizer: self.optimizer.clone(),
        };
        let json = serde_json::to_string(&checkpoint)?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), "checkpoint saved");
        Ok(())
    }

    /// Restore network and optimizer state; `Ok(false)` if `path` is missing
    pub async fn load_from(&mut self, path: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(path).await? {
            info!(path = %path.display(), "no checkpoint found...");
            return Ok(false);
        }
        info!(path = %path.display(), "=> loading checkpoint...");
        let json = tokio::fs::read_to_string(path).await?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)?;
        let model = &checkpoint.model;
        for (expected, actual) in [
            (self.config.input_size, model.input_size()),
            (self.config.hidden_size, model.hidden_size()),
            (self.config.nb_action, model.nb_action()),
        ] {
            if expected != actual {
                return Err(RLError::DimensionMismatch { expected, actual });
            }
        }
        self.model = checkpoint.model;
        self.optimizer = checkpoint.optimizer;
        info!("done !");
        Ok(true)
    }
}

#[async_trait]
impl Agent for Dqn {
    type Observation = VectorObservation;
    type Action = DiscreteAction;

    async fn update(
        &mut self,
        reward: Reward,
        observation: &Self::Observation,
    ) -> Result<Self::Action> {
        self.update_signal(reward.value(), &observation.data).map(DiscreteAction)
    }

    fn score(&self) -> f64 {
        Dqn::score(self)
    }

    async fn save(&self, path: &Path) -> Result<()> {
        self.save_to(path).await
    }

    async fn load(&mut self, path: &Path) -> Result<bool> {
        self.load_from(path).await
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = AgentMetrics {
            total_steps: self.total_steps,
            train_steps: self.train_steps,
            loss: self.last_loss,
            ..AgentMetrics::default()
        };
        metrics.custom.insert("score".into(), self.score().into());
        metrics.custom.insert("memory".into(), self.memory.len().into());
        metrics
    }
}
