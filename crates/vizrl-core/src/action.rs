//! Action representations and action spaces

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action using the supplied generator
    fn sample_with(&self, rng: &mut dyn RngCore) -> Self::Action;

    /// Sample a random action from the space
    fn sample(&self) -> Self::Action {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Discrete action (e.g., for discrete action spaces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl Action for DiscreteAction {
    #[allow(clippy::cast_precision_loss)]
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }
}

/// Engine button vector: one integer per button or delta axis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonAction(pub Vec<i32>);

impl ButtonAction {
    /// An action pressing nothing
    #[must_use]
    pub fn idle(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// An action pressing exactly the listed buttons
    #[must_use]
    pub fn pressing(len: usize, buttons: &[usize]) -> Self {
        let mut values = vec![0; len];
        for &b in buttons {
            if let Some(slot) = values.get_mut(b) {
                *slot = 1;
            }
        }
        Self(values)
    }
}

impl Action for ButtonAction {
    fn to_vec(&self) -> Vec<f64> {
        self.0.iter().map(|&v| f64::from(v)).collect()
    }
}

/// Discrete action space
#[derive(Debug, Clone)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl ActionSpace for DiscreteSpace {
    type Action = DiscreteAction;

    fn sample_with(&self, rng: &mut dyn RngCore) -> Self::Action {
        DiscreteAction(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0 < self.n
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/// Integer box space: every entry has its own inclusive range
#[derive(Debug, Clone)]
pub struct MultiDiscreteSpace {
    /// Inclusive `(low, high)` per entry
    pub ranges: Vec<(i32, i32)>,
}

impl MultiDiscreteSpace {
    /// Create a new multi-discrete space
    pub fn new(ranges: Vec<(i32, i32)>) -> crate::Result<Self> {
        if let Some((low, high)) = ranges.iter().find(|(l, h)| l > h) {
            return Err(crate::RLError::InvalidAction(format!(
                "empty range {low}..={high}"
            )));
        }
        Ok(Self { ranges })
    }
}

impl ActionSpace for MultiDiscreteSpace {
    type Action = ButtonAction;

    fn sample_with(&self, rng: &mut dyn RngCore) -> Self::Action {
        ButtonAction(
            self.ranges
                .iter()
                .map(|&(low, high)| rng.gen_range(low..=high))
                .collect(),
        )
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0.len() == self.ranges.len()
            && action
                .0
                .iter()
                .zip(&self.ranges)
                .all(|(v, (l, h))| v >= l && v <= h)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.ranges.len())
    }
}
