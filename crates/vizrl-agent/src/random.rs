//! Random agent for baseline comparisons

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

use vizrl_core::{ActionSpace, Agent, AgentMetrics, Observation, Result, Reward};

/// Agent that samples uniformly from its action space and never learns
pub struct RandomAgent<S, O> {
    action_space: S,
    rng: StdRng,
    total_steps: usize,
    total_reward: f64,
    _observation: PhantomData<fn() -> O>,
}

impl<S, O> RandomAgent<S, O>
where
    S: ActionSpace,
{
    /// Create a new random agent; `seed` makes the draws reproducible
    pub fn new(action_space: S, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            action_space,
            rng,
            total_steps: 0,
            total_reward: 0.0,
            _observation: PhantomData,
        }
    }
}

#[async_trait]
impl<S, O> Agent for RandomAgent<S, O>
where
    S: ActionSpace + 'static,
    O: Observation + 'static,
{
    type Observation = O;
    type Action = S::Action;

    async fn update(
        &mut self,
        reward: Reward,
        _observation: &Self::Observation,
    ) -> Result<Self::Action> {
        self.total_steps += 1;
        self.total_reward += reward.value();
        Ok(self.action_space.sample_with(&mut self.rng))
    }

    fn score(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let slots = (self.total_steps + 1) as f64;
        self.total_reward / slots
    }

    async fn save(&self, path: &Path) -> Result<()> {
        // Nothing learned, nothing to write.
        debug!(path = %path.display(), "random agent has no state to save");
        Ok(())
    }

    async fn load(&mut self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.total_steps,
            ..AgentMetrics::default()
        }
    }
}
