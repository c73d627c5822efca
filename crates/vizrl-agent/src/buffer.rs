//! Experience replay memory

use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

use vizrl_core::{RLError, Result, Transition};

/// Fixed-capacity replay memory; the oldest transition goes first on overflow
#[derive(Debug, Clone)]
pub struct ReplayMemory<S, A> {
    /// Buffer storage
    buffer: VecDeque<Transition<S, A>>,
    /// Maximum capacity
    capacity: usize,
}

impl<S, A> ReplayMemory<S, A>
where
    S: Clone,
    A: Clone,
{
    /// Create a new replay memory
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Add a transition, evicting the oldest when full
    pub fn push(&mut self, transition: Transition<S, A>) {
        self.buffer.push_back(transition);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// Draw `batch_size` distinct transitions uniformly at random
    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Option<Vec<Transition<S, A>>> {
        if self.buffer.len() < batch_size {
            return None;
        }
        let batch = index::sample(rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect();
        Some(batch)
    }

    /// Get the current size of the memory
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the memory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of transitions kept
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition<S, A>> {
        self.buffer.iter()
    }

    /// Clear the memory
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Sampled transitions regrouped column by column
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// One state per row
    pub states: Array2<f64>,
    /// One next state per row
    pub next_states: Array2<f64>,
    /// Action taken in each row
    pub actions: Vec<usize>,
    /// Reward of each row
    pub rewards: Array1<f64>,
}

impl TransitionBatch {
    /// Stack transitions into batch arrays
    pub fn from_transitions(transitions: &[Transition<Array1<f64>, usize>]) -> Result<Self> {
        let dim = transitions.first().map_or(0, |t| t.state.len());
        let mut states = Vec::with_capacity(transitions.len() * dim);
        let mut next_states = Vec::with_capacity(transitions.len() * dim);
        for t in transitions {
            for row in [&t.state, &t.next_state] {
                if row.len() != dim {
                    return Err(RLError::DimensionMismatch {
                        expected: dim,
                        actual: row.len(),
                    });
                }
            }
            states.extend(t.state.iter().copied());
            next_states.extend(t.next_state.iter().copied());
        }
        let shape = (transitions.len(), dim);
        let to_batch = |data| {
            Array2::from_shape_vec(shape, data).map_err(|e| RLError::Computation(e.to_string()))
        };
        Ok(Self {
            states: to_batch(states)?,
            next_states: to_batch(next_states)?,
            actions: transitions.iter().map(|t| t.action).collect(),
            rewards: transitions.iter().map(|t| t.reward.value()).collect(),
        })
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ReplayMemory<Array1<f64>, usize> {
    /// Sample and stack a batch in one go
    pub fn sample_batch<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Option<TransitionBatch>> {
        self.sample(batch_size, rng)
            .map(|transitions| TransitionBatch::from_transitions(&transitions))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(i: usize) -> Transition<Array1<f64>, usize> {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        Transition::new(array![x, -x], array![x + 1.0, -x - 1.0], i % 3, x)
    }

    #[test]
    fn test_oldest_evicted_on_overflow() {
        let mut memory = ReplayMemory::new(3);
        for i in 0..4 {
            memory.push(transition(i));
            assert!(memory.len() <= memory.capacity());
        }
        assert_eq!(memory.len(), 3);
        let rewards: Vec<f64> = memory.iter().map(|t| t.reward.value()).collect();
        assert_eq!(rewards, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sample_is_without_replacement() {
        let mut memory = ReplayMemory::new(10);
        for i in 0..5 {
            memory.push(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(3);
        let batch = memory.sample(5, &mut rng).unwrap();
        let mut rewards: Vec<f64> = batch.iter().map(|t| t.reward.value()).collect();
        rewards.sort_by(f64::total_cmp);
        assert_eq!(rewards, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(memory.sample(6, &mut rng).is_none());
    }

    #[test]
    fn test_batch_is_columnwise() {
        let mut memory = ReplayMemory::new(10);
        for i in 0..4 {
            memory.push(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(11);
        let batch = memory.sample_batch(3, &mut rng).unwrap().unwrap();
        assert_eq!(batch.states.dim(), (3, 2));
        assert_eq!(batch.next_states.dim(), (3, 2));
        assert_eq!(batch.len(), 3);
        for row in 0..3 {
            let x = batch.rewards[row];
            assert_eq!(batch.states[[row, 0]], x);
            assert_eq!(batch.next_states[[row, 1]], -x - 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let action = x as usize % 3;
            assert_eq!(batch.actions[row], action);
        }
    }

    #[test]
    fn test_ragged_states_rejected() {
        let ragged = vec![transition(0), Transition::new(array![1.0], array![2.0], 0, 0.0)];
        assert!(matches!(
            TransitionBatch::from_transitions(&ragged),
            Err(RLError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
