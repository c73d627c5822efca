//! Transitions stored for experience replay

use serde::{Deserialize, Serialize};

use crate::Reward;

/// One observed transition: where the agent was, where it landed, what it
/// did and what it was paid for doing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// State before the action
    pub state: S,
    /// State after the action
    pub next_state: S,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
}

impl<S, A> Transition<S, A> {
    /// Create a new transition
    pub fn new(state: S, next_state: S, action: A, reward: impl Into<Reward>) -> Self {
        Self {
            state,
            next_state,
            action,
            reward: reward.into(),
        }
    }
}
