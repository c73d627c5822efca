//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, Observation, Reward};

/// Configuration shared by learning agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    /// Batch size for training
    pub batch_size: usize,
    /// Buffer size for experience replay
    pub buffer_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.9,
            batch_size: 100,
            buffer_size: 100_000,
        }
    }
}

/// Core agent trait.
///
/// Agents are driven one tick at a time: the environment hands over the reward
/// earned by the previous action together with the new observation, and the
/// agent answers with its next action.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Learn from the last tick and choose the next action
    async fn update(
        &mut self,
        reward: Reward,
        observation: &Self::Observation,
    ) -> crate::Result<Self::Action>;

    /// Running score over recent rewards
    fn score(&self) -> f64 {
        0.0
    }

    /// Save the agent
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load the agent; `Ok(false)` when there is nothing to load
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<bool>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total steps taken
    pub total_steps: usize,
    /// Gradient steps performed
    pub train_steps: usize,
    /// Last training loss
    pub loss: Option<f64>,
    /// Additional metrics
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}
